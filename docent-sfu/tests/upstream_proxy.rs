//! Proxy behaviour against a scripted SFU on a loopback socket

use std::time::Duration;

use docent_sfu::{
    ConnectionState, Error, NegotiationPhase, RequestId, SfuConfig, SfuConnection, SfuEvent,
    TrickleTarget,
};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::{accept_async, tungstenite::Message};

const WAIT: Duration = Duration::from_secs(5);
const OFFER: &str = r#"{"type":"offer","sdp":"v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\n"}"#;
const CANDIDATE: &str =
    r#"{"candidate":"candidate:1 1 udp 2122260223 10.0.0.2 50000 typ host","sdpMid":"0","sdpMLineIndex":0}"#;

/// One-connection SFU stand-in; records what it receives, sends what it is told
struct FakeSfu {
    url: String,
    received: mpsc::UnboundedReceiver<Value>,
    outbound: mpsc::UnboundedSender<Message>,
}

impl FakeSfu {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received) = mpsc::unbounded_channel();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = accept_async(tcp).await.unwrap();
            let (mut sink, mut stream) = ws.split();
            loop {
                tokio::select! {
                    incoming = stream.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            let value: Value = serde_json::from_str(text.as_str()).unwrap();
                            let _ = received_tx.send(value);
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    outgoing = outbound_rx.recv() => match outgoing {
                        Some(message) => {
                            if sink.send(message).await.is_err() {
                                break;
                            }
                        }
                        // Test dropped its handle: hang up
                        None => break,
                    },
                }
            }
        });

        Self {
            url: format!("ws://{addr}"),
            received,
            outbound,
        }
    }

    fn send(&self, text: &str) {
        self.outbound.send(Message::text(text.to_string())).unwrap();
    }

    async fn next_request(&mut self) -> Value {
        timeout(WAIT, self.received.recv()).await.unwrap().unwrap()
    }
}

async fn connected(sfu: &FakeSfu) -> (SfuConnection, mpsc::UnboundedReceiver<SfuEvent>) {
    let (proxy, events) = SfuConnection::new("conn-test", SfuConfig::new(sfu.url.clone()));
    proxy.connect().await.unwrap();
    assert_eq!(proxy.state(), ConnectionState::Connected);
    (proxy, events)
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<SfuEvent>) -> SfuEvent {
    timeout(WAIT, events.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn test_join_request_reaches_sfu() {
    let mut sfu = FakeSfu::start().await;
    let (proxy, _events) = connected(&sfu).await;

    let id = proxy.join("room-1", "alice", OFFER).await.unwrap();
    assert_eq!(id, RequestId::new(1));

    let request = sfu.next_request().await;
    assert_eq!(request["id"], 1);
    assert_eq!(request["method"], "join");
    assert_eq!(request["params"]["sid"], "room-1");
    assert_eq!(request["params"]["uid"], "alice");
    assert_eq!(request["params"]["offer"]["type"], "offer");
}

#[tokio::test]
async fn test_request_ids_strictly_increase() {
    let mut sfu = FakeSfu::start().await;
    let (proxy, _events) = connected(&sfu).await;

    let mut ids = vec![proxy.join("room-1", "alice", OFFER).await.unwrap()];
    ids.push(proxy.offer(OFFER).await.unwrap());
    ids.push(proxy.answer(r#"{"type":"answer","sdp":"v=0"}"#).await.unwrap());
    ids.push(
        proxy
            .trickle(CANDIDATE, TrickleTarget::Publisher)
            .await
            .unwrap()
            .unwrap(),
    );
    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));

    let mut methods = Vec::new();
    for expected in &ids {
        let request = sfu.next_request().await;
        assert_eq!(request["id"], expected.get());
        methods.push(request["method"].as_str().unwrap().to_string());
    }
    assert_eq!(methods, vec!["join", "offer", "answer", "trickle"]);
}

#[tokio::test]
async fn test_trickle_wire_shape() {
    let mut sfu = FakeSfu::start().await;
    let (proxy, _events) = connected(&sfu).await;

    proxy
        .trickle(CANDIDATE, TrickleTarget::Publisher)
        .await
        .unwrap();

    let request = sfu.next_request().await;
    assert_eq!(request["method"], "trickle");
    assert_eq!(request["params"]["target"], 0);
    assert_eq!(request["params"]["candidate"]["sdpMid"], "0");
    assert_eq!(request["params"]["candidate"]["sdpMLineIndex"], 0);
}

#[tokio::test]
async fn test_malformed_trickle_is_skipped() {
    let mut sfu = FakeSfu::start().await;
    let (proxy, _events) = connected(&sfu).await;

    let skipped = proxy
        .trickle("{not a candidate", TrickleTarget::Publisher)
        .await
        .unwrap();
    assert!(skipped.is_none());
    assert_eq!(proxy.state(), ConnectionState::Connected);

    let id = proxy.offer(OFFER).await.unwrap();
    let request = sfu.next_request().await;
    assert_eq!(request["method"], "offer");
    assert_eq!(request["id"], id.get());
}

#[tokio::test]
async fn test_invalid_descriptions_are_rejected() {
    let sfu = FakeSfu::start().await;
    let (proxy, _events) = connected(&sfu).await;

    assert!(matches!(
        proxy.join("room-1", "alice", "v=0").await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(proxy.answer("{}").await, Err(Error::InvalidArgument(_))));
    assert_eq!(proxy.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_upstream_offer_relayed_once_and_phase_advances() {
    let sfu = FakeSfu::start().await;
    let (proxy, mut events) = connected(&sfu).await;
    assert_eq!(proxy.phase(), NegotiationPhase::AwaitingFirstOffer);

    sfu.send(r#"{"method":"offer","params":{"type":"offer","sdp":"v=0..."}}"#);

    let event = next_event(&mut events).await;
    assert_eq!(event, SfuEvent::Offer(json!({"type": "offer", "sdp": "v=0..."})));
    assert_eq!(proxy.phase(), NegotiationPhase::Active);
    assert!(timeout(Duration::from_millis(200), events.recv()).await.is_err());
}

#[tokio::test]
async fn test_candidates_flagged_until_first_offer() {
    let sfu = FakeSfu::start().await;
    let (_proxy, mut events) = connected(&sfu).await;

    sfu.send(r#"{"method":"trickle","params":{"candidate":{"candidate":"a"},"target":1}}"#);
    sfu.send(r#"{"method":"offer","params":{"type":"offer","sdp":"v=0"}}"#);
    sfu.send(r#"{"method":"trickle","params":{"candidate":{"candidate":"b"},"target":1}}"#);

    assert!(matches!(next_event(&mut events).await, SfuEvent::Candidate { fresh: true, .. }));
    assert!(matches!(next_event(&mut events).await, SfuEvent::Offer(_)));
    match next_event(&mut events).await {
        SfuEvent::Candidate { candidate, fresh } => {
            assert!(!fresh);
            assert_eq!(candidate["candidate"]["candidate"], "b");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn test_fragmented_and_batched_frames() {
    let sfu = FakeSfu::start().await;
    let (proxy, mut events) = connected(&sfu).await;

    sfu.send(r#"{"method":"trickle","par"#);
    sfu.send(r#"ams":{"target":1}}{"id":1,"result":{"type":"answer","sdp":"v=0"}}"#);

    assert!(matches!(next_event(&mut events).await, SfuEvent::Candidate { fresh: true, .. }));
    match next_event(&mut events).await {
        SfuEvent::Answer(desc) => assert_eq!(desc.sdp, "v=0"),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(proxy.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_garbage_does_not_kill_the_session() {
    let sfu = FakeSfu::start().await;
    let (proxy, mut events) = connected(&sfu).await;

    sfu.send("this is not json");
    sfu.send(r#"{"jsonrpc":"2.0"}"#);
    sfu.send(r#"{"method":"unknown","params":{}}"#);
    sfu.send(r#"{"result":{"type":"answer","sdp":"v=1"}}"#);

    match next_event(&mut events).await {
        SfuEvent::Answer(desc) => assert_eq!(desc.sdp, "v=1"),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(proxy.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_rpc_error_reported() {
    let sfu = FakeSfu::start().await;
    let (_proxy, mut events) = connected(&sfu).await;

    sfu.send(r#"{"id":4,"error":{"code":500,"message":"no such session"}}"#);

    assert_eq!(
        next_event(&mut events).await,
        SfuEvent::RequestFailed {
            id: Some(RequestId::new(4)),
            code: 500,
            message: "no such session".to_string(),
        }
    );
}

#[tokio::test]
async fn test_offer_before_connect_sends_nothing() {
    let mut sfu = FakeSfu::start().await;
    let (proxy, _events) = SfuConnection::new("conn-test", SfuConfig::new(sfu.url.clone()));

    assert!(matches!(proxy.offer(OFFER).await, Err(Error::NotConnected)));
    assert_eq!(proxy.state(), ConnectionState::Disconnected);
    assert!(sfu.received.try_recv().is_err());
}

#[tokio::test]
async fn test_second_connect_rejected() {
    let sfu = FakeSfu::start().await;
    let (proxy, _events) = connected(&sfu).await;

    assert!(matches!(proxy.connect().await, Err(Error::InvalidState(_))));
    assert_eq!(proxy.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_upstream_hangup_closes_proxy() {
    let sfu = FakeSfu::start().await;
    let (proxy, mut events) = connected(&sfu).await;

    drop(sfu);

    assert!(matches!(next_event(&mut events).await, SfuEvent::Closed { .. }));
    assert_eq!(proxy.state(), ConnectionState::Closed);
    assert!(matches!(proxy.offer(OFFER).await, Err(Error::NotConnected)));
}

#[tokio::test]
async fn test_closing_one_proxy_leaves_another_connected() {
    let first_sfu = FakeSfu::start().await;
    let mut second_sfu = FakeSfu::start().await;
    let (first, _first_events) = connected(&first_sfu).await;
    let (second, _second_events) = connected(&second_sfu).await;

    first.close().await;

    assert_eq!(first.state(), ConnectionState::Closed);
    assert_eq!(second.state(), ConnectionState::Connected);
    second.offer(OFFER).await.unwrap();
    assert_eq!(second_sfu.next_request().await["method"], "offer");
}

async fn connected_with_cap(
    sfu: &FakeSfu,
    max_message_size: usize,
) -> (SfuConnection, mpsc::UnboundedReceiver<SfuEvent>) {
    let config = SfuConfig {
        url: sfu.url.clone(),
        max_message_size,
    };
    let (proxy, events) = SfuConnection::new("conn-test", config);
    proxy.connect().await.unwrap();
    (proxy, events)
}

#[tokio::test]
async fn test_oversized_document_across_frames_is_skipped() {
    let sfu = FakeSfu::start().await;
    let (proxy, mut events) = connected_with_cap(&sfu, 64).await;

    sfu.send(r#"{"method":"trickle","params":{"pad":""#);
    sfu.send(&"x".repeat(50));
    sfu.send(r#""}}{"method":"offer","params":{"type":"offer","sdp":"v=0"}}"#);

    assert!(matches!(next_event(&mut events).await, SfuEvent::Offer(_)));
    assert_eq!(proxy.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_oversized_message_closes_link() {
    let sfu = FakeSfu::start().await;
    let (proxy, mut events) = connected_with_cap(&sfu, 64).await;

    let padded = format!(r#"{{"method":"offer","params":{{"sdp":"{}"}}}}"#, "x".repeat(100));
    sfu.send(&padded);

    assert!(matches!(next_event(&mut events).await, SfuEvent::Closed { .. }));
    assert_eq!(proxy.state(), ConnectionState::Closed);
}
