//! Shared fixtures: a scripted SFU and a hub over in-memory rooms
#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use docent_api::signaling::{ConnectionRegistry, RoomGroups, SignalingHub, StreamBindings};
use docent_core::{
    models::{EventId, NewRoom, RoomId, UserId},
    MemoryEventDirectory, MemoryRoomStore, RoomService,
};
use docent_sfu::SfuConfig;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::{net::TcpListener, sync::mpsc, time::timeout};
use tokio_tungstenite::{accept_async, tungstenite::Message};

pub const WAIT: Duration = Duration::from_secs(5);
pub const QUIET: Duration = Duration::from_millis(200);
pub const OFFER: &str = r#"{"type":"offer","sdp":"v=0\r\no=- 1 1 IN IP4 0.0.0.0\r\n"}"#;
pub const ROOM: &str = "room-1";

/// SFU stand-in accepting any number of links
///
/// Each accepted link is numbered in accept order; requests arrive tagged
/// with that number. Dropping a link's sender hangs that link up.
pub struct FakeSfu {
    pub url: String,
    pub received: mpsc::UnboundedReceiver<(usize, Value)>,
    pub links: mpsc::UnboundedReceiver<mpsc::UnboundedSender<Message>>,
}

impl FakeSfu {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (received_tx, received) = mpsc::unbounded_channel();
        let (links_tx, links) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut index = 0;
            while let Ok((tcp, _)) = listener.accept().await {
                let Ok(ws) = accept_async(tcp).await else {
                    continue;
                };
                let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
                let _ = links_tx.send(outbound);
                let received_tx = received_tx.clone();
                let link = index;
                index += 1;

                tokio::spawn(async move {
                    let (mut sink, mut stream) = ws.split();
                    loop {
                        tokio::select! {
                            incoming = stream.next() => match incoming {
                                Some(Ok(Message::Text(text))) => {
                                    let value: Value = serde_json::from_str(text.as_str()).unwrap();
                                    let _ = received_tx.send((link, value));
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
                                None => break,
                            },
                        }
                    }
                });
            }
        });

        Self {
            url: format!("ws://{addr}"),
            received,
            links,
        }
    }

    pub async fn next_link(&mut self) -> mpsc::UnboundedSender<Message> {
        timeout(WAIT, self.links.recv()).await.unwrap().unwrap()
    }

    pub async fn next_request(&mut self) -> (usize, Value) {
        timeout(WAIT, self.received.recv()).await.unwrap().unwrap()
    }
}

/// Hub whose only room belongs to an event alice and bob were accepted to
pub async fn hub(sfu_url: &str) -> Arc<SignalingHub> {
    let events = Arc::new(MemoryEventDirectory::new());
    let tour = EventId::from("night-tour");
    events.accept_participant(tour.clone(), UserId::from("alice"));
    events.accept_participant(tour.clone(), UserId::from("bob"));

    let rooms = Arc::new(RoomService::new(Arc::new(MemoryRoomStore::new()), events));
    rooms
        .create_room(NewRoom::for_event(tour).with_id(RoomId::from(ROOM)))
        .await
        .unwrap();

    Arc::new(SignalingHub::new(
        rooms,
        SfuConfig::new(sfu_url),
        ConnectionRegistry::new(),
        RoomGroups::new(),
        StreamBindings::new(),
    ))
}
