//! Companion sync — pushing settings changes to the other clock instance.
//!
//! The hour and minute trays each listen on a fixed loopback port. A change
//! made in one instance is sent to the other as a single JSON line:
//!
//! ```text
//! {"action":"syncSettings","settings":{"customColor":"#FF0000","useCustomColor":true}}
//! ```
//!
//! and acknowledged with `{"success":true}`. The receiver applies the patch
//! to its own store and does not forward it again. Last write wins.

use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::thread::JoinHandle;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::DisplayMode;
use crate::settings::SettingsPatch;

/// Loopback port the hour instance listens on.
pub const HOUR_PORT: u16 = 47631;
/// Loopback port the minute instance listens on.
pub const MINUTE_PORT: u16 = 47632;

/// Connect, read and write deadline for one sync exchange.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(2);

/// How often the accept loop checks for shutdown.
const ACCEPT_POLL: Duration = Duration::from_millis(50);

/// Longest accepted message line.
const MAX_LINE: u64 = 64 * 1024;

// ── Error type ──

/// Settings sync errors.
///
/// String payloads follow the convention **"context: details"**.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The companion is not running or not listening.
    Connect(String),
    /// The connection broke mid-exchange.
    Io(String),
    /// A message or acknowledgement could not be parsed.
    Protocol(String),
    /// The companion answered `{"success":false}`.
    Rejected,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Connect(e) => write!(f, "Companion not reachable: {e}"),
            SyncError::Io(e) => write!(f, "Sync failed: {e}"),
            SyncError::Protocol(e) => write!(f, "Invalid sync message: {e}"),
            SyncError::Rejected => write!(f, "Companion rejected the settings"),
        }
    }
}

impl std::error::Error for SyncError {}

// ── Wire format ──

/// A message between companions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum SyncMessage {
    SyncSettings { settings: SettingsPatch },
}

/// Reply to a [`SyncMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncAck {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Serialize `value` as one newline-terminated JSON line.
fn to_line<T: Serialize>(value: &T) -> Result<String, SyncError> {
    let mut line =
        serde_json::to_string(value).map_err(|e| SyncError::Protocol(format!("encode: {e}")))?;
    line.push('\n');
    Ok(line)
}

/// Parse one received message line.
pub fn decode_message(line: &str) -> Result<SyncMessage, SyncError> {
    serde_json::from_str(line.trim()).map_err(|e| SyncError::Protocol(format!("message: {e}")))
}

// ── Addressing ──

pub fn port(mode: DisplayMode) -> u16 {
    match mode {
        DisplayMode::Hour => HOUR_PORT,
        DisplayMode::Minute => MINUTE_PORT,
    }
}

/// Where the instance running `mode` listens.
pub fn listen_addr(mode: DisplayMode) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port(mode)))
}

/// Where the companion of the instance running `mode` listens.
pub fn companion_addr(mode: DisplayMode) -> SocketAddr {
    listen_addr(mode.companion())
}

// ── Sender ──

/// Send `patch` to the listener at `addr` and wait for its acknowledgement.
///
/// Failures are returned to the caller, which logs them. There is no retry.
pub fn send_to_companion(addr: SocketAddr, patch: &SettingsPatch) -> Result<(), SyncError> {
    if patch.is_empty() {
        log::debug!("[sync] nothing to send");
        return Ok(());
    }
    let line = to_line(&SyncMessage::SyncSettings {
        settings: patch.clone(),
    })?;

    let mut stream = TcpStream::connect_timeout(&addr, SYNC_TIMEOUT)
        .map_err(|e| SyncError::Connect(format!("{addr}: {e}")))?;
    let io = |e: std::io::Error| SyncError::Io(format!("{addr}: {e}"));
    stream.set_read_timeout(Some(SYNC_TIMEOUT)).map_err(io)?;
    stream.set_write_timeout(Some(SYNC_TIMEOUT)).map_err(io)?;
    stream.write_all(line.as_bytes()).map_err(io)?;
    stream.flush().map_err(io)?;

    let mut reply = String::new();
    BufReader::new(&stream)
        .take(MAX_LINE)
        .read_line(&mut reply)
        .map_err(io)?;
    if reply.trim().is_empty() {
        return Err(SyncError::Protocol(
            "acknowledgement: connection closed".into(),
        ));
    }
    let ack: SyncAck = serde_json::from_str(reply.trim())
        .map_err(|e| SyncError::Protocol(format!("acknowledgement: {e}")))?;
    if !ack.success {
        if let Some(e) = ack.error {
            log::debug!("[sync] companion said: {e}");
        }
        return Err(SyncError::Rejected);
    }
    log::debug!("[sync] settings delivered to {addr}");
    Ok(())
}

// ── Listener ──

/// Background thread accepting settings from the companion.
///
/// Each valid message is acknowledged and its patch forwarded on the channel
/// given to [`bind`](Self::bind). The thread stops on [`stop`](Self::stop),
/// on drop, or once the receiving end of the channel is gone.
pub struct SyncListener {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncListener {
    pub fn bind(addr: SocketAddr, patches: Sender<SettingsPatch>) -> Result<Self, SyncError> {
        let listener =
            TcpListener::bind(addr).map_err(|e| SyncError::Io(format!("bind {addr}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| SyncError::Io(format!("local address: {e}")))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| SyncError::Io(format!("nonblocking: {e}")))?;

        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();
        let handle = std::thread::spawn(move || accept_loop(listener, patches, flag));
        log::info!("[sync] listening on {local_addr}");

        Ok(Self {
            local_addr,
            running,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for SyncListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: TcpListener, patches: Sender<SettingsPatch>, running: Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => match handle_connection(stream, &patches) {
                Ok(true) => {}
                Ok(false) => {
                    log::debug!("[sync] receiver gone, listener exiting");
                    return;
                }
                Err(e) => log::warn!("[sync] {peer}: {e}"),
            },
            Err(e) if e.kind() == ErrorKind::WouldBlock => std::thread::sleep(ACCEPT_POLL),
            Err(e) => {
                log::warn!("[sync] accept failed: {e}");
                std::thread::sleep(ACCEPT_POLL);
            }
        }
    }
}

/// Serve one connection. Returns `Ok(false)` when the receiver has hung up.
fn handle_connection(
    stream: TcpStream,
    patches: &Sender<SettingsPatch>,
) -> Result<bool, SyncError> {
    let io = |e: std::io::Error| SyncError::Io(e.to_string());
    // Accepted sockets inherit non-blocking mode on some platforms.
    stream.set_nonblocking(false).map_err(io)?;
    stream.set_read_timeout(Some(SYNC_TIMEOUT)).map_err(io)?;
    stream.set_write_timeout(Some(SYNC_TIMEOUT)).map_err(io)?;

    let mut line = String::new();
    BufReader::new(&stream)
        .take(MAX_LINE)
        .read_line(&mut line)
        .map_err(io)?;

    let (ack, alive, result) = match decode_message(&line) {
        Ok(SyncMessage::SyncSettings { settings }) => match patches.send(settings) {
            Ok(()) => (SyncAck::ok(), true, Ok(())),
            Err(_) => (SyncAck::failed("shutting down"), false, Ok(())),
        },
        Err(e) => (SyncAck::failed(e.to_string()), true, Err(e)),
    };
    let reply = to_line(&ack)?;
    (&stream).write_all(reply.as_bytes()).map_err(io)?;
    result.map(|()| alive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(5);

    fn local() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    #[test]
    fn message_wire_format() {
        let msg = SyncMessage::SyncSettings {
            settings: SettingsPatch {
                show_leading_zero: Some(true),
                ..SettingsPatch::default()
            },
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"action":"syncSettings","settings":{"showLeadingZero":true}}"#
        );
        assert_eq!(
            serde_json::to_string(&SyncAck::ok()).unwrap(),
            r#"{"success":true}"#
        );
    }

    #[test]
    fn decode_companion_message() {
        let msg = decode_message(
            r##"{"action":"syncSettings","settings":{"use24HourFormat":true,"customColor":"#FF0000"}}"##,
        )
        .unwrap();
        let SyncMessage::SyncSettings { settings } = msg;
        assert_eq!(settings.use_24_hour_format, Some(true));
        assert_eq!(settings.custom_color.as_deref(), Some("#FF0000"));
        assert_eq!(settings.use_custom_color, None);
    }

    #[test]
    fn decode_rejects_unknown_action() {
        let err = decode_message(r#"{"action":"reboot"}"#).unwrap_err();
        assert!(matches!(err, SyncError::Protocol(_)));
        assert!(decode_message("not json").is_err());
    }

    #[test]
    fn modes_point_at_each_other() {
        assert_eq!(listen_addr(DisplayMode::Hour).port(), HOUR_PORT);
        assert_eq!(companion_addr(DisplayMode::Hour).port(), MINUTE_PORT);
        assert_eq!(companion_addr(DisplayMode::Minute).port(), HOUR_PORT);
        assert!(companion_addr(DisplayMode::Minute).ip().is_loopback());
    }

    #[test]
    fn patch_reaches_listener() {
        let (tx, rx) = mpsc::channel();
        let listener = SyncListener::bind(local(), tx).unwrap();
        let patch = SettingsPatch {
            use_custom_color: Some(true),
            custom_color: Some("#00FF00".into()),
            ..SettingsPatch::default()
        };
        send_to_companion(listener.local_addr(), &patch).unwrap();
        assert_eq!(rx.recv_timeout(WAIT).unwrap(), patch);
    }

    #[test]
    fn malformed_message_gets_failure_ack() {
        let (tx, rx) = mpsc::channel();
        let listener = SyncListener::bind(local(), tx).unwrap();
        let mut stream = TcpStream::connect(listener.local_addr()).unwrap();
        stream.write_all(b"{\"action\":\"nope\"}\n").unwrap();
        let mut reply = String::new();
        BufReader::new(&stream).read_line(&mut reply).unwrap();
        let ack: SyncAck = serde_json::from_str(reply.trim()).unwrap();
        assert!(!ack.success);
        assert!(ack.error.is_some());
        assert!(rx.try_recv().is_err());
        // The listener keeps serving.
        send_to_companion(
            listener.local_addr(),
            &SettingsPatch {
                show_leading_zero: Some(false),
                ..SettingsPatch::default()
            },
        )
        .unwrap();
        assert!(rx.recv_timeout(WAIT).is_ok());
    }

    #[test]
    fn unreachable_companion_is_connect_error() {
        let addr = TcpListener::bind(local()).unwrap().local_addr().unwrap();
        let patch = SettingsPatch {
            use_24_hour_format: Some(true),
            ..SettingsPatch::default()
        };
        let err = send_to_companion(addr, &patch).unwrap_err();
        assert!(matches!(err, SyncError::Connect(_)), "got {err:?}");
    }

    #[test]
    fn empty_patch_is_not_sent() {
        let addr = TcpListener::bind(local()).unwrap().local_addr().unwrap();
        assert_eq!(send_to_companion(addr, &SettingsPatch::default()), Ok(()));
    }

    #[test]
    fn stop_joins_thread() {
        let (tx, _rx) = mpsc::channel();
        let mut listener = SyncListener::bind(local(), tx).unwrap();
        assert!(listener.is_running());
        listener.stop();
        assert!(!listener.is_running());
    }
}
