//! One client's session with the SFU
//!
//! The owning signaling connection drives the outbound side; a background
//! task reads the upstream socket, decodes documents and hands the results
//! back as [`SfuEvent`]s over a channel.

use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tokio::{net::TcpStream, sync::mpsc, task::JoinHandle};
use tokio_tungstenite::{
    connect_async_with_config,
    tungstenite::{protocol::WebSocketConfig, Message},
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, warn};

use crate::{
    config::SfuConfig,
    error::{Error, Result},
    frame::FrameAssembler,
    protocol::{
        IceCandidateInit, JoinParams, NegotiateParams, Request, SessionDescription, TrickleParams,
        UpstreamMessage, Unhandled,
    },
    types::{ConnectionState, NegotiationPhase, RequestId, TrickleTarget},
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

/// Something the SFU told us, addressed to the owning client
#[derive(Debug, Clone, PartialEq)]
pub enum SfuEvent {
    Candidate { candidate: Value, fresh: bool },
    Offer(Value),
    Answer(SessionDescription),
    RequestFailed {
        id: Option<RequestId>,
        code: i64,
        message: String,
    },
    /// The upstream link failed; the proxy is now Closed
    Closed { reason: String },
}

impl SfuEvent {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Candidate { .. } => "trickle",
            Self::Offer(_) => "offer",
            Self::Answer(_) => "answer",
            Self::RequestFailed { .. } => "error",
            Self::Closed { .. } => "closed",
        }
    }
}

/// State shared with the receive loop
struct Shared {
    label: String,
    state: Mutex<ConnectionState>,
    phase: Mutex<NegotiationPhase>,
    events: mpsc::UnboundedSender<SfuEvent>,
}

impl Shared {
    fn emit(&self, event: SfuEvent) {
        if self.events.send(event).is_err() {
            debug!(proxy = %self.label, "SFU event receiver dropped");
        }
    }

    /// Move to Closed after a transport failure; reports only the first one
    fn fail(&self, reason: String) {
        let mut state = self.state.lock();
        if *state != ConnectionState::Connected {
            return;
        }
        *state = ConnectionState::Closed;
        drop(state);

        warn!(proxy = %self.label, reason = %reason, "SFU link lost");
        self.emit(SfuEvent::Closed { reason });
    }

    fn dispatch(&self, message: UpstreamMessage) {
        match message {
            UpstreamMessage::Trickle(candidate) => {
                let fresh = *self.phase.lock() == NegotiationPhase::AwaitingFirstOffer;
                self.emit(SfuEvent::Candidate { candidate, fresh });
            }
            UpstreamMessage::Offer(params) => {
                self.emit(SfuEvent::Offer(params));
                *self.phase.lock() = NegotiationPhase::Active;
            }
            UpstreamMessage::AnswerResult(desc) => self.emit(SfuEvent::Answer(desc)),
            UpstreamMessage::RpcError { id, code, message } => {
                warn!(proxy = %self.label, request_id = ?id, code, message = %message, "SFU rejected request");
                self.emit(SfuEvent::RequestFailed { id, code, message });
            }
            UpstreamMessage::Unknown(Unhandled::Method(method)) => {
                debug!(proxy = %self.label, method = %method, "Unhandled SFU notification");
            }
            UpstreamMessage::Unknown(Unhandled::Result) => {
                debug!(proxy = %self.label, "Unhandled SFU result");
            }
        }
    }

    fn handle_frame(&self, assembler: &mut FrameAssembler, frame: &str) {
        for document in assembler.push(frame) {
            match document.and_then(UpstreamMessage::decode) {
                Ok(message) => self.dispatch(message),
                Err(e) => warn!(proxy = %self.label, error = %e, "Dropping upstream message"),
            }
        }
    }
}

async fn receive_loop(mut stream: SplitStream<WsStream>, shared: Arc<Shared>, max_message_size: usize) {
    let mut assembler = FrameAssembler::new(max_message_size);

    let reason = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => shared.handle_frame(&mut assembler, text.as_str()),
            Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                Ok(text) => shared.handle_frame(&mut assembler, text),
                Err(e) => warn!(proxy = %shared.label, error = %e, "Dropping non UTF-8 upstream frame"),
            },
            Some(Ok(Message::Close(frame))) => {
                break match frame {
                    Some(frame) => format!("SFU closed the connection: {}", frame.reason),
                    None => "SFU closed the connection".to_string(),
                };
            }
            // Ping/pong is answered by tungstenite
            Some(Ok(_)) => {}
            Some(Err(e)) => break format!("read failed: {e}"),
            None => break "stream ended".to_string(),
        }
    };

    shared.fail(reason);
}

/// Proxy for one client's session on the SFU
pub struct SfuConnection {
    config: SfuConfig,
    shared: Arc<Shared>,
    next_id: AtomicU64,
    sink: tokio::sync::Mutex<Option<WsSink>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for SfuConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SfuConnection")
            .field("label", &self.shared.label)
            .field("state", &self.state())
            .field("phase", &self.phase())
            .finish()
    }
}

impl SfuConnection {
    /// Create a disconnected proxy and the channel its events arrive on
    ///
    /// `label` only tags log lines, usually the owning connection id.
    pub fn new(label: impl Into<String>, config: SfuConfig) -> (Self, mpsc::UnboundedReceiver<SfuEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let connection = Self {
            config,
            shared: Arc::new(Shared {
                label: label.into(),
                state: Mutex::new(ConnectionState::Disconnected),
                phase: Mutex::new(NegotiationPhase::AwaitingFirstOffer),
                events,
            }),
            next_id: AtomicU64::new(1),
            sink: tokio::sync::Mutex::new(None),
            reader: Mutex::new(None),
        };
        (connection, receiver)
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    #[must_use]
    pub fn phase(&self) -> NegotiationPhase {
        *self.shared.phase.lock()
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.shared.label
    }

    /// Open the upstream link and start the receive loop
    pub async fn connect(&self) -> Result<()> {
        let state = self.state();
        if state != ConnectionState::Disconnected {
            return Err(Error::InvalidState(format!("cannot connect while {state}")));
        }

        let limit = Some(self.config.max_message_size);
        let ws_config = WebSocketConfig::default()
            .max_message_size(limit)
            .max_frame_size(limit);
        let (ws, _response) = connect_async_with_config(self.config.url.as_str(), Some(ws_config), false)
            .await
            .map_err(|e| Error::UpstreamTransport(format!("connect to {} failed: {e}", self.config.url)))?;
        let (sink, stream) = ws.split();

        let mut sink_slot = self.sink.lock().await;
        {
            let mut state = self.shared.state.lock();
            if *state != ConnectionState::Disconnected {
                return Err(Error::InvalidState(format!("cannot connect while {}", *state)));
            }
            *state = ConnectionState::Connected;
        }
        *sink_slot = Some(sink);
        drop(sink_slot);

        let handle = tokio::spawn(receive_loop(
            stream,
            Arc::clone(&self.shared),
            self.config.max_message_size,
        ));
        *self.reader.lock() = Some(handle);

        info!(proxy = %self.shared.label, url = %self.config.url, "Connected to SFU");
        Ok(())
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.state() == ConnectionState::Connected {
            Ok(())
        } else {
            Err(Error::NotConnected)
        }
    }

    /// Allocate an id and write one request; ids hit the wire in order
    async fn send_request<P: Serialize>(&self, method: &'static str, params: P) -> Result<RequestId> {
        let mut sink = self.sink.lock().await;
        self.ensure_connected()?;
        let Some(sink) = sink.as_mut() else {
            return Err(Error::NotConnected);
        };

        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        let json = serde_json::to_string(&Request { id, method, params })?;

        if let Err(e) = sink.send(Message::text(json)).await {
            let reason = format!("write failed: {e}");
            self.shared.fail(reason.clone());
            return Err(Error::UpstreamTransport(reason));
        }

        debug!(proxy = %self.shared.label, request_id = %id, method, "Sent SFU request");
        Ok(id)
    }

    /// Ask the SFU to add this client to session `room_id`
    pub async fn join(&self, room_id: &str, user_id: &str, offer: &str) -> Result<RequestId> {
        self.ensure_connected()?;
        let offer = SessionDescription::parse(offer)?;
        self.send_request(
            "join",
            JoinParams {
                sid: room_id,
                uid: user_id,
                offer,
            },
        )
        .await
    }

    pub async fn offer(&self, desc: &str) -> Result<RequestId> {
        self.ensure_connected()?;
        let desc = SessionDescription::parse(desc)?;
        self.send_request("offer", NegotiateParams { desc }).await
    }

    pub async fn answer(&self, desc: &str) -> Result<RequestId> {
        self.ensure_connected()?;
        let desc = SessionDescription::parse(desc)?;
        self.send_request("answer", NegotiateParams { desc }).await
    }

    /// Forward an ICE candidate
    ///
    /// An unparsable candidate is logged and skipped: `Ok(None)`.
    pub async fn trickle(&self, candidate: &str, target: TrickleTarget) -> Result<Option<RequestId>> {
        self.ensure_connected()?;
        let candidate = match IceCandidateInit::parse(candidate) {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(proxy = %self.shared.label, error = %e, "Skipping malformed ICE candidate");
                return Ok(None);
            }
        };
        self.send_request("trickle", TrickleParams { candidate, target })
            .await
            .map(Some)
    }

    /// Close the upstream link; safe to call more than once
    pub async fn close(&self) {
        let previous = std::mem::replace(&mut *self.shared.state.lock(), ConnectionState::Closed);

        if let Some(handle) = self.reader.lock().take() {
            handle.abort();
        }

        let sink = self.sink.lock().await.take();
        if let Some(mut sink) = sink {
            if let Err(e) = sink.close().await {
                debug!(proxy = %self.shared.label, error = %e, "SFU close handshake failed");
            }
        }

        if previous != ConnectionState::Closed {
            info!(proxy = %self.shared.label, "SFU connection closed");
        }
    }
}

impl Drop for SfuConnection {
    fn drop(&mut self) {
        if let Some(handle) = self.reader.get_mut().take() {
            handle.abort();
        }
    }
}
