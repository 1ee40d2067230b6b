//! WebSocket client on a background thread.

use super::{Channel, ClientMessage, ConnectionState, SyncError, SyncEvent, parse_server_frame};
use std::net::TcpStream;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::client::IntoClientRequest;
use tungstenite::http::HeaderValue;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket, connect};
use url::Url;

/// How the client retries after losing its connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Reconnection attempts after a failure before giving up.
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// How a connected session ended.
enum SessionEnd {
    /// Close was requested locally, or the handle went away.
    Closed,
    /// The connection dropped.
    Lost,
}

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// WebSocket client for native platforms.
///
/// Uses a background thread for non-blocking operation. Events are collected
/// and must be polled via `poll_events()`.
pub struct NativeWebSocket {
    state: ConnectionState,
    policy: ReconnectPolicy,
    cmd_tx: Option<Sender<WsCommand>>,
    event_rx: Option<Receiver<SyncEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected WebSocket client.
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            policy,
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Connect to the relay at `url`, presenting `token` as a bearer
    /// credential on the upgrade request.
    pub fn connect(&mut self, url: &str, token: Option<&str>) -> Result<(), SyncError> {
        if self.cmd_tx.is_some() {
            return Err(SyncError::AlreadyConnected);
        }

        let parsed = Url::parse(url).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(SyncError::InvalidUrl(format!(
                "unsupported scheme `{}`",
                parsed.scheme()
            )));
        }
        let authorization = token
            .map(|t| {
                HeaderValue::from_str(&format!("Bearer {}", t))
                    .map_err(|e| SyncError::InvalidUrl(format!("bad credential: {}", e)))
            })
            .transpose()?;

        self.state = ConnectionState::Connecting;
        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<SyncEvent>();
        let policy = self.policy;
        let url = parsed.to_string();

        let handle = thread::spawn(move || {
            run_connection(&url, authorization, policy, &cmd_rx, &event_tx);
            log::info!("WebSocket thread exiting");
        });

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);
        Ok(())
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}

impl Channel for NativeWebSocket {
    fn send(&mut self, message: &ClientMessage) -> Result<(), SyncError> {
        let text = serde_json::to_string(message)?;
        match self.cmd_tx {
            Some(ref tx) => tx
                .send(WsCommand::Send(text))
                .map_err(|e| SyncError::Send(e.to_string())),
            None => Err(SyncError::NotConnected),
        }
    }

    fn poll_events(&mut self) -> Vec<SyncEvent> {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                self.state = self.state.after(&event);
                events.push(event);
            }
        }
        events
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn open(url: &str, authorization: Option<&HeaderValue>) -> Result<Socket, tungstenite::Error> {
    let mut request = url.into_client_request()?;
    if let Some(value) = authorization {
        request.headers_mut().insert("Authorization", value.clone());
    }
    let (mut socket, response) = connect(request)?;
    log::info!("WebSocket connected, status: {}", response.status());

    // Short read timeout so the loop can interleave outgoing commands.
    if let Some(tcp) = tcp_stream(&socket) {
        let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }
    Ok(socket)
}

fn tcp_stream(socket: &Socket) -> Option<&TcpStream> {
    match socket.get_ref() {
        MaybeTlsStream::Plain(tcp) => Some(tcp),
        MaybeTlsStream::Rustls(tls) => Some(tls.get_ref()),
        _ => None,
    }
}

/// Connect, serve, and reconnect until closed or out of attempts.
fn run_connection(
    url: &str,
    authorization: Option<HeaderValue>,
    policy: ReconnectPolicy,
    cmd_rx: &Receiver<WsCommand>,
    event_tx: &Sender<SyncEvent>,
) {
    let mut retries = 0u32;
    loop {
        log::info!("WebSocket thread: connecting to {}", url);
        match open(url, authorization.as_ref()) {
            Ok(mut socket) => {
                retries = 0;
                let _ = event_tx.send(SyncEvent::Connected);
                let end = serve(&mut socket, cmd_rx, event_tx);
                let _ = event_tx.send(SyncEvent::Disconnected);
                if let SessionEnd::Closed = end {
                    return;
                }
            }
            Err(e) => log::error!("WebSocket connection failed: {}", e),
        }

        if retries >= policy.attempts {
            let _ = event_tx.send(SyncEvent::Error {
                message: format!("gave up after {} reconnection attempts", retries),
            });
            return;
        }
        retries += 1;
        let _ = event_tx.send(SyncEvent::Reconnecting { attempt: retries });
        if !wait_for_retry(cmd_rx, policy.delay) {
            return;
        }
    }
}

/// Sleep for `delay` while watching for a close request. Messages sent while
/// offline are dropped. Returns false when the client should stop.
fn wait_for_retry(cmd_rx: &Receiver<WsCommand>, delay: Duration) -> bool {
    let deadline = std::time::Instant::now() + delay;
    loop {
        let remaining = deadline.saturating_duration_since(std::time::Instant::now());
        match cmd_rx.recv_timeout(remaining) {
            Ok(WsCommand::Send(_)) => log::warn!("Dropping message sent while offline"),
            Ok(WsCommand::Close) | Err(RecvTimeoutError::Disconnected) => return false,
            Err(RecvTimeoutError::Timeout) => return true,
        }
    }
}

fn serve(
    socket: &mut Socket,
    cmd_rx: &Receiver<WsCommand>,
    event_tx: &Sender<SyncEvent>,
) -> SessionEnd {
    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("WebSocket sending {} bytes", msg.len());
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("WebSocket send error: {}", e);
                    return SessionEnd::Lost;
                }
            }
            Ok(WsCommand::Close) => {
                log::info!("WebSocket close requested");
                let _ = socket.close(None);
                return SessionEnd::Closed;
            }
            Err(TryRecvError::Disconnected) => {
                log::info!("WebSocket command channel disconnected");
                return SessionEnd::Closed;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => {
                if let Some(message) = parse_server_frame(&txt) {
                    let _ = event_tx.send(SyncEvent::Message(message));
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket received close frame");
                return SessionEnd::Lost;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("WebSocket read error: {}", e);
                return SessionEnd::Lost;
            }
        }
    }
}
