pub mod backoff;
pub mod compress;
pub mod dispatcher;
pub mod heartbeat;
pub mod payload;
pub mod session;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::discovery;
use crate::error::GatewayError;
use dispatcher::Action;
use heartbeat::HeartbeatMonitor;
use payload::{close_code, opcode, GatewayPayload, Identify, Resume};
use session::SharedSession;

pub const GATEWAY_VERSION: u8 = 6;
pub const ENCODING: &str = "json";

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Lifecycle states of the logical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    AwaitingHello,
    Identifying,
    Resuming,
    Connected,
}

/// How one connection cycle ended. Drives the resumability verdict and the
/// delay before the next cycle.
#[derive(Debug)]
enum CycleEnd {
    /// Deliberate shutdown; the reconnect loop stops permanently.
    Shutdown,
    /// The transport never opened.
    ConnectFailed,
    /// Two beats elapsed without a HEARTBEAT_ACK.
    AckTimeout,
    /// The server closed the connection.
    Closed { code: Option<u16> },
    /// The transport errored or the stream ended unexpectedly.
    TransportError,
    /// RECONNECT payload: reconnect immediately, resume intended.
    Reconnect,
    /// INVALID_SESSION payload.
    InvalidSession { resumable: bool },
}

/// One poll of the three concurrent timing sources inside a cycle.
enum CycleEvent {
    Shutdown,
    Beat { acked: bool },
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
}

/// Spaces IDENTIFY sends across all reconnects of one client. RESUME is
/// never gated.
#[derive(Debug)]
struct IdentifyGate {
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl IdentifyGate {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
        }
    }

    async fn acquire(&mut self) {
        if let Some(last) = self.last_sent {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                debug!(wait_ms = wait.as_millis() as u64, "spacing identify send");
                sleep(wait).await;
            }
        }
        self.last_sent = Some(Instant::now());
    }
}

/// Handle for stopping a running client's reconnect loop. This is the only
/// way the loop ends; no payload or failed attempt ever terminates it.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: mpsc::Sender<()>,
}

impl ShutdownHandle {
    pub async fn shutdown(&self) {
        let _ = self.tx.send(()).await;
    }
}

/// Client for one logical gateway session: discovery, handshake, heartbeat
/// liveness, session resumption, and reconnect with backoff. The client is
/// the only component with external side effects; everything it sends or
/// closes goes through the cycle it currently owns.
pub struct GatewayClient {
    config: Config,
    http: reqwest::Client,
    session: SharedSession,
    identify_gate: IdentifyGate,
    state: ConnectionState,
    last_disconnect_resumable: bool,
    shutdown_tx: mpsc::Sender<()>,
    shutdown_rx: mpsc::Receiver<()>,
}

impl GatewayClient {
    pub fn new(config: Config) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let identify_gate = IdentifyGate::new(Duration::from_millis(config.identify_min_interval_ms));
        Self {
            config,
            http: reqwest::Client::new(),
            session: SharedSession::new(),
            identify_gate,
            state: ConnectionState::Disconnected,
            last_disconnect_resumable: false,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
        }
    }

    /// Shared view of the session state, readable while the client runs.
    pub fn session(&self) -> SharedSession {
        self.session.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Discovers the gateway endpoint, then runs the reconnect loop until
    /// shutdown. Only discovery exhaustion is fatal.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        let base = discovery::fetch_endpoint(&self.http, &self.config.discovery_url).await?;
        self.run(base).await;
        Ok(())
    }

    /// Runs the reconnect loop against a known endpoint, bypassing
    /// discovery.
    pub async fn run(&mut self, base: String) {
        loop {
            let end = self.run_cycle(&base).await;
            self.state = ConnectionState::Disconnected;

            let (resumable, delay) = match end {
                CycleEnd::Shutdown => {
                    info!("gateway client shut down");
                    return;
                }
                CycleEnd::ConnectFailed => {
                    let attempts = self.session.record_connect_failure().await;
                    // Not a disconnect; the previous verdict stands.
                    (self.last_disconnect_resumable, backoff::delay(attempts))
                }
                CycleEnd::AckTimeout => {
                    let attempts = self.session.record_connect_failure().await;
                    (true, backoff::delay(attempts))
                }
                CycleEnd::Closed { code } => {
                    let resumable = code.map_or(true, close_code::resumable);
                    let attempts = self.session.reconnect_attempts().await;
                    (resumable, backoff::delay(attempts))
                }
                CycleEnd::TransportError => {
                    let attempts = self.session.reconnect_attempts().await;
                    (true, backoff::delay(attempts))
                }
                CycleEnd::Reconnect => (true, Duration::ZERO),
                CycleEnd::InvalidSession { resumable } => {
                    (resumable, backoff::invalid_session_delay())
                }
            };

            self.last_disconnect_resumable = resumable;
            if !resumable {
                self.session.invalidate().await;
            }

            if !delay.is_zero() {
                debug!(delay_ms = delay.as_millis() as u64, "waiting before reconnect");
                tokio::select! {
                    _ = sleep(delay) => {}
                    _ = self.shutdown_rx.recv() => {
                        info!("gateway client shut down");
                        return;
                    }
                }
            }
        }
    }

    /// Runs one connection cycle: open the transport, pump frames and the
    /// heartbeat timer until something ends the cycle. The heartbeat timer
    /// lives in this scope, so leaving the cycle cancels it before the
    /// next cycle arms a new one.
    async fn run_cycle(&mut self, base: &str) -> CycleEnd {
        let url = format!("{base}/?v={GATEWAY_VERSION}&encoding={ENCODING}");
        self.state = ConnectionState::Connecting;
        info!(%url, "connecting to gateway");

        let (ws, _) = match timeout(self.config.connect_timeout(), connect_async(&url)).await {
            Ok(Ok(ok)) => ok,
            Ok(Err(e)) => {
                warn!(error = %e, "gateway connect failed");
                return CycleEnd::ConnectFailed;
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.connect_timeout_ms,
                    "gateway connect timed out"
                );
                return CycleEnd::ConnectFailed;
            }
        };

        self.state = ConnectionState::AwaitingHello;
        let (mut sink, mut stream): (WsSink, WsSource) = ws.split();
        let mut monitor: Option<HeartbeatMonitor> = None;

        loop {
            let event = tokio::select! {
                _ = self.shutdown_rx.recv() => CycleEvent::Shutdown,
                acked = Self::next_beat(&mut monitor) => CycleEvent::Beat { acked },
                msg = stream.next() => CycleEvent::Frame(msg),
            };

            match event {
                CycleEvent::Shutdown => {
                    let _ = sink.send(Message::Close(None)).await;
                    return CycleEnd::Shutdown;
                }
                CycleEvent::Beat { acked } => {
                    if !acked {
                        warn!("heartbeat ack not received, closing connection");
                        let frame = CloseFrame {
                            code: CloseCode::from(close_code::SESSION_TIMED_OUT),
                            reason: "heartbeat ack not received".into(),
                        };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        return CycleEnd::AckTimeout;
                    }
                    if let Err(e) = self.send_heartbeat(&mut sink).await {
                        error!(error = %e, "failed to send heartbeat");
                        return CycleEnd::TransportError;
                    }
                }
                CycleEvent::Frame(None) => {
                    warn!("gateway stream ended");
                    return CycleEnd::TransportError;
                }
                CycleEvent::Frame(Some(Err(e))) => {
                    error!(error = %e, "transport error");
                    return CycleEnd::TransportError;
                }
                CycleEvent::Frame(Some(Ok(msg))) => {
                    match self.on_frame(msg, &mut sink, &mut monitor).await {
                        Some(end) => return end,
                        None => {}
                    }
                }
            }
        }
    }

    async fn next_beat(monitor: &mut Option<HeartbeatMonitor>) -> bool {
        match monitor.as_mut() {
            Some(m) => m.beat().await,
            None => std::future::pending().await,
        }
    }

    /// Handles one inbound frame. Returns `Some` when the frame ends the
    /// cycle; decode failures only drop the frame.
    async fn on_frame(
        &mut self,
        msg: Message,
        sink: &mut WsSink,
        monitor: &mut Option<HeartbeatMonitor>,
    ) -> Option<CycleEnd> {
        let text = match msg {
            Message::Text(text) => text.to_string(),
            Message::Binary(bytes) => match compress::inflate(&bytes) {
                Ok(text) => text,
                Err(e) => {
                    error!(error = %e, "failed to inflate binary frame, dropping");
                    return None;
                }
            },
            Message::Close(frame) => {
                let code = frame.as_ref().map(|f| u16::from(f.code));
                info!(?code, "server closed connection");
                return Some(CycleEnd::Closed { code });
            }
            // tungstenite answers pings at the protocol level.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => return None,
        };

        let payload: GatewayPayload = match serde_json::from_str(&text) {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "malformed payload, dropping");
                return None;
            }
        };

        let action = self
            .session
            .with(|session| dispatcher::route(session, payload))
            .await;

        match action {
            Action::None => {}
            Action::Ack => {
                if let Some(m) = monitor.as_mut() {
                    m.acknowledge();
                }
            }
            Action::Heartbeat => {
                if let Err(e) = self.send_heartbeat(sink).await {
                    error!(error = %e, "failed to send requested heartbeat");
                    return Some(CycleEnd::TransportError);
                }
            }
            Action::Hello { heartbeat_interval } => {
                info!(heartbeat_interval, "HELLO received");
                *monitor = Some(HeartbeatMonitor::start(heartbeat_interval));
                if let Err(e) = self.send_handshake(sink).await {
                    error!(error = %e, "failed to send handshake");
                    return Some(CycleEnd::TransportError);
                }
            }
            Action::Established => {
                self.state = ConnectionState::Connected;
                let snapshot = self.session.snapshot().await;
                info!(
                    session_id = ?snapshot.session_id(),
                    seq = ?snapshot.last_sequence(),
                    "gateway session established"
                );
            }
            Action::Reconnect => {
                let _ = sink.send(Message::Close(None)).await;
                return Some(CycleEnd::Reconnect);
            }
            Action::InvalidSession { resumable } => {
                warn!(resumable, "session invalidated by server");
                let _ = sink.send(Message::Close(None)).await;
                return Some(CycleEnd::InvalidSession { resumable });
            }
        }
        None
    }

    /// Sends a heartbeat carrying the current sequence (null when unset).
    async fn send_heartbeat(
        &self,
        sink: &mut WsSink,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let seq = self.session.last_sequence().await;
        debug!(?seq, "sending heartbeat");
        let frame = serde_json::json!({ "op": opcode::HEARTBEAT, "d": seq });
        sink.send(Message::Text(frame.to_string().into())).await
    }

    /// Sends IDENTIFY or RESUME after HELLO, per the resume decision.
    async fn send_handshake(
        &mut self,
        sink: &mut WsSink,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let snapshot = self.session.snapshot().await;
        let resume = backoff::should_resume(
            self.last_disconnect_resumable,
            snapshot.session_id().is_some(),
        );

        match (resume, snapshot.session_id()) {
            (true, Some(session_id)) => {
                self.state = ConnectionState::Resuming;
                info!(session_id, seq = ?snapshot.last_sequence(), "resuming session");
                let body = Resume {
                    token: self.config.token.clone(),
                    session_id: session_id.to_string(),
                    seq: snapshot.last_sequence(),
                };
                let frame = serde_json::json!({ "op": opcode::RESUME, "d": body });
                sink.send(Message::Text(frame.to_string().into())).await
            }
            _ => {
                self.identify_gate.acquire().await;
                self.state = ConnectionState::Identifying;
                debug!("sending identify");
                let body = Identify {
                    token: self.config.token.clone(),
                    properties: self.config.identify_properties(),
                    compress: self.config.compress,
                    large_threshold: self.config.large_threshold,
                };
                let frame = serde_json::json!({ "op": opcode::IDENTIFY, "d": body });
                sink.send(Message::Text(frame.to_string().into())).await
            }
        }
    }
}
