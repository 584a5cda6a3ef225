//! WebSocket hub for live reload.
//!
//! A single hub thread owns the client list and processes messages from a
//! channel, so broadcasts and client registration never interleave:
//!
//! ```text
//! acceptor --[AddClient]--+
//!                         +--> hub thread --[broadcast]--> browsers
//! tasks ----[Reload/Css/Error/ClearError]--+
//! ```
//!
//! Notices stay pending until the task that raised them runs cleanly, and
//! are replayed to every client that connects in the meantime.

use std::net::{IpAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::message::HotReloadMessage;
use crate::{debug, log};

/// Maximum port retry attempts
const MAX_PORT_RETRIES: u16 = 10;

/// Poll interval of the client reader thread
const READ_POLL: Duration = Duration::from_millis(100);

enum HubMsg {
    AddClient(TcpStream),
    Send(HotReloadMessage),
    Error { title: String, message: String },
    ClearError { title: String },
}

/// Handle to the running reload hub. Cheap to clone.
#[derive(Clone)]
pub struct ReloadHub {
    tx: Sender<HubMsg>,
    port: u16,
}

impl ReloadHub {
    /// Bind the WebSocket listener (retrying successive ports) and spawn the
    /// acceptor, hub and reader threads.
    pub fn start(interface: IpAddr, base_port: u16) -> Result<Self> {
        let (listener, port) = try_bind_port(interface, base_port, MAX_PORT_RETRIES)?;
        if port != base_port && base_port != 0 {
            log!("reload"; "port {} in use, using {} instead", base_port, port);
        }

        let (tx, rx) = channel::unbounded();
        let clients = Arc::new(Mutex::new(Vec::new()));

        let acceptor_tx = tx.clone();
        std::thread::spawn(move || accept_loop(&listener, &acceptor_tx));

        let reader_clients = Arc::clone(&clients);
        std::thread::spawn(move || client_reader_loop(&reader_clients));

        let hub = HubState {
            clients,
            pending: Vec::new(),
        };
        std::thread::spawn(move || hub.run(&rx));

        Ok(Self { tx, port })
    }

    /// Port the WebSocket listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Tell every browser to reload the page.
    pub fn reload(&self) {
        self.send(HubMsg::Send(HotReloadMessage::Reload));
    }

    /// Tell every browser to swap the stylesheet at `target`.
    pub fn css(&self, target: impl Into<String>) {
        self.send(HubMsg::Send(HotReloadMessage::css(target)));
    }

    /// Show a notice overlay until `title` is cleared.
    pub fn error(&self, title: impl Into<String>, message: impl Into<String>) {
        self.send(HubMsg::Error {
            title: title.into(),
            message: message.into(),
        });
    }

    /// Clear the notice raised under `title`, if any.
    pub fn clear_error(&self, title: impl Into<String>) {
        self.send(HubMsg::ClearError {
            title: title.into(),
        });
    }

    fn send(&self, msg: HubMsg) {
        if self.tx.send(msg).is_err() {
            debug!("reload"; "hub thread is gone");
        }
    }
}

/// State owned by the hub thread.
struct HubState {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    /// Notices by title, in the order they were raised.
    pending: Vec<(String, String)>,
}

impl HubState {
    fn run(mut self, rx: &Receiver<HubMsg>) {
        for msg in rx.iter() {
            match msg {
                HubMsg::AddClient(stream) => self.add_client(stream),
                HubMsg::Send(msg) => self.broadcast(&msg),
                HubMsg::Error { title, message } => {
                    record_error(&mut self.pending, &title, &message);
                    self.broadcast(&HotReloadMessage::error(title, message));
                }
                HubMsg::ClearError { title } => {
                    if !remove_error(&mut self.pending, &title) {
                        continue;
                    }
                    self.broadcast(&HotReloadMessage::ClearError);
                    for (title, message) in self.pending.clone() {
                        self.broadcast(&HotReloadMessage::error(title, message));
                    }
                }
            }
        }
    }

    fn add_client(&self, stream: TcpStream) {
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                log!("reload"; "handshake failed: {}", e);
                return;
            }
        };

        let mut greeting = vec![HotReloadMessage::connected()];
        greeting.extend(
            self.pending
                .iter()
                .map(|(title, message)| HotReloadMessage::error(title, message)),
        );
        for msg in &greeting {
            if let Err(e) = ws.send(Message::Text(msg.to_json().into())) {
                debug!("reload"; "client dropped during greeting: {}", e);
                return;
            }
        }

        // Reads are polled by the reader thread.
        let _ = ws.get_ref().set_nonblocking(true);

        let mut clients = self.clients.lock();
        clients.push(ws);
        debug!("reload"; "client connected (total: {})", clients.len());
    }

    fn broadcast(&self, msg: &HotReloadMessage) {
        let mut clients = self.clients.lock();
        if clients.is_empty() {
            debug!("reload"; "no clients connected");
            return;
        }

        let frame = Message::Text(msg.to_json().into());
        clients.retain_mut(|ws| match ws.send(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client disconnected: {}", e);
                false
            }
        });
        debug!("reload"; "broadcast to {} clients", clients.len());
    }
}

/// Insert or replace the notice for `title`.
fn record_error(pending: &mut Vec<(String, String)>, title: &str, message: &str) {
    match pending.iter_mut().find(|(existing, _)| existing == title) {
        Some((_, existing)) => *existing = message.to_string(),
        None => pending.push((title.to_string(), message.to_string())),
    }
}

/// Remove the notice for `title`; returns whether one was pending.
fn remove_error(pending: &mut Vec<(String, String)>, title: &str) -> bool {
    let before = pending.len();
    pending.retain(|(existing, _)| existing != title);
    pending.len() != before
}

fn accept_loop(listener: &TcpListener, tx: &Sender<HubMsg>) {
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if tx.send(HubMsg::AddClient(stream)).is_err() {
                    break;
                }
            }
            Err(e) => {
                log!("reload"; "accept error: {}", e);
                std::thread::sleep(READ_POLL);
            }
        }
    }
}

/// Drain client frames and drop closed connections.
fn client_reader_loop(clients: &Mutex<Vec<WebSocket<TcpStream>>>) {
    loop {
        std::thread::sleep(READ_POLL);

        clients.lock().retain_mut(|ws| loop {
            match ws.read() {
                Ok(Message::Close(_)) => break false,
                Ok(_) => continue,
                Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    break true;
                }
                Err(_) => break false,
            }
        });
    }
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16, max_retries: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..max_retries {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind((interface, port)) {
            Ok(listener) => {
                let actual_port = listener.local_addr()?.port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "Failed to bind WebSocket server after {} attempts: {}",
        max_retries,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn read_json<S: std::io::Read + std::io::Write>(ws: &mut WebSocket<S>) -> serde_json::Value {
        loop {
            if let Message::Text(text) = ws.read().unwrap() {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[test]
    fn test_record_error_replaces_same_title() {
        let mut pending = Vec::new();
        record_error(&mut pending, "styles", "a");
        record_error(&mut pending, "pages", "b");
        record_error(&mut pending, "styles", "c");
        assert_eq!(
            pending,
            vec![
                ("styles".to_string(), "c".to_string()),
                ("pages".to_string(), "b".to_string())
            ]
        );
    }

    #[test]
    fn test_remove_error_reports_presence() {
        let mut pending = vec![("styles".to_string(), "a".to_string())];
        assert!(!remove_error(&mut pending, "pages"));
        assert!(remove_error(&mut pending, "styles"));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_bind_retries_next_port() {
        let (first, port) = try_bind_port(LOCALHOST, 0, 1).unwrap();
        let (_second, next) = try_bind_port(LOCALHOST, port, 3).unwrap();
        assert_ne!(next, port);
        drop(first);
    }

    #[test]
    fn test_pending_error_replayed_to_new_clients() {
        let hub = ReloadHub::start(LOCALHOST, 0).unwrap();
        let url = format!("ws://127.0.0.1:{}", hub.port());

        let (mut first, _) = tungstenite::connect(url.as_str()).unwrap();
        assert_eq!(read_json(&mut first)["type"], "connected");

        hub.error("styles", "boom");
        let msg = read_json(&mut first);
        assert_eq!(msg["type"], "error");
        assert_eq!(msg["path"], "styles");

        let (mut second, _) = tungstenite::connect(url.as_str()).unwrap();
        assert_eq!(read_json(&mut second)["type"], "connected");
        let replay = read_json(&mut second);
        assert_eq!(replay["type"], "error");
        assert_eq!(replay["error"], "boom");

        hub.clear_error("styles");
        assert_eq!(read_json(&mut first)["type"], "clear_error");

        hub.css("css/main.min.css");
        assert_eq!(read_json(&mut second)["type"], "clear_error");
        assert_eq!(read_json(&mut second)["target"], "css/main.min.css");
    }
}
