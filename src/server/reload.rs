// src/server/reload.rs

//! Live-reload broadcast over WebSocket.
//!
//! A dedicated thread accepts browser connections and hands each one to a
//! short-lived handshake thread; a second thread receives [`ReloadMessage`]s
//! over a std channel and forwards them to every client. Tasks only ever see
//! the cheap, cloneable [`ReloadHandle`].

use std::net::{TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use tungstenite::{Message, WebSocket};

/// What connected pages should do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Reload the whole page.
    #[serde(rename = "reload")]
    Full,
    /// Re-fetch stylesheets only; `paths` are the URLs that changed.
    Css { paths: Vec<String> },
}

/// Sending side of the reload channel. Disabled handles drop every message.
#[derive(Debug, Clone, Default)]
pub struct ReloadHandle {
    tx: Option<Sender<ReloadMessage>>,
}

impl ReloadHandle {
    /// A handle for runs without a dev server.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Wrap an existing channel; used by the server and by tests.
    pub fn from_sender(tx: Sender<ReloadMessage>) -> Self {
        Self { tx: Some(tx) }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn reload(&self) {
        self.send(ReloadMessage::Full);
    }

    pub fn reload_css(&self, paths: Vec<String>) {
        if !paths.is_empty() {
            self.send(ReloadMessage::Css { paths });
        }
    }

    fn send(&self, message: ReloadMessage) {
        if let Some(tx) = &self.tx {
            debug!(?message, "broadcasting reload");
            if tx.send(message).is_err() {
                debug!("reload broadcaster is gone; dropping message");
            }
        }
    }
}

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Bound on the opening handshake and on each broadcast write, so a silent or
/// stalled peer cannot hold up other clients.
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);

/// Start the WebSocket side of live reload.
///
/// Binds `preferred_port` on localhost, or any free port when it is taken.
/// Returns the handle tasks broadcast through and the port actually bound.
pub fn start_reload_server(preferred_port: u16) -> std::io::Result<(ReloadHandle, u16)> {
    let (listener, port) = reserve_port(preferred_port)?;
    let (handle, _clients) = serve(listener);
    info!(port, "live reload listening");
    Ok((handle, port))
}

fn serve(listener: TcpListener) -> (ReloadHandle, Clients) {
    let clients: Clients = Arc::new(Mutex::new(Vec::new()));
    spawn_incoming(listener, Arc::clone(&clients));
    let (tx, rx) = mpsc::channel();
    spawn_broadcaster(rx, Arc::clone(&clients));
    (ReloadHandle::from_sender(tx), clients)
}

fn reserve_port(preferred: u16) -> std::io::Result<(TcpListener, u16)> {
    let listener = match TcpListener::bind(("127.0.0.1", preferred)) {
        Ok(sock) => sock,
        Err(err) => {
            debug!(preferred, error = %err, "reload port taken; using an ephemeral port");
            TcpListener::bind(("127.0.0.1", 0))?
        }
    };

    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

fn lock(clients: &Clients) -> MutexGuard<'_, Vec<WebSocket<TcpStream>>> {
    clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn spawn_incoming(listener: TcpListener, clients: Clients) {
    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let clients = Arc::clone(&clients);
                    thread::spawn(move || handshake(stream, &clients));
                }
                Err(err) => warn!(error = %err, "reload connection failed"),
            }
        }
    });
}

fn handshake(stream: TcpStream, clients: &Clients) {
    let timeouts = stream
        .set_read_timeout(Some(SOCKET_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(SOCKET_TIMEOUT)));
    if let Err(err) = timeouts {
        warn!(error = %err, "could not configure reload socket");
        return;
    }

    match tungstenite::accept(stream) {
        Ok(socket) => {
            debug!("reload client connected");
            lock(clients).push(socket);
        }
        Err(err) => warn!(error = %err, "reload handshake failed"),
    }
}

fn spawn_broadcaster(rx: Receiver<ReloadMessage>, clients: Clients) {
    thread::spawn(move || {
        while let Ok(message) = rx.recv() {
            let payload = match serde_json::to_string(&message) {
                Ok(p) => p,
                Err(err) => {
                    warn!(error = %err, "could not encode reload message");
                    continue;
                }
            };

            let mut clients = lock(&clients);
            let before = clients.len();
            clients.retain_mut(|socket| match socket.send(Message::text(payload.clone())) {
                Ok(()) => true,
                Err(err) => {
                    debug!(error = %err, "dropping reload client");
                    false
                }
            });
            debug!(sent = clients.len(), dropped = before - clients.len(), "reload broadcast");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_encode_as_commands() {
        assert_eq!(
            serde_json::to_string(&ReloadMessage::Full).unwrap(),
            r#"{"command":"reload"}"#
        );
        assert_eq!(
            serde_json::to_string(&ReloadMessage::Css {
                paths: vec!["/styles/main.css".into()]
            })
            .unwrap(),
            r#"{"command":"css","paths":["/styles/main.css"]}"#
        );
    }

    #[test]
    fn disabled_handle_drops_messages() {
        let handle = ReloadHandle::disabled();
        assert!(!handle.is_enabled());
        handle.reload();
    }

    fn client(port: u16) -> WebSocket<TcpStream> {
        let stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let (socket, _) = tungstenite::client(format!("ws://127.0.0.1:{port}/"), stream).unwrap();
        socket
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        false
    }

    #[test]
    fn a_silent_connection_does_not_block_other_clients() {
        let (listener, port) = reserve_port(0).unwrap();
        let (handle, clients) = serve(listener);

        let _silent = TcpStream::connect(("127.0.0.1", port)).unwrap();
        let mut socket = client(port);
        assert!(wait_until(|| lock(&clients).len() == 1));

        handle.reload();
        let message = socket.read().unwrap();
        assert_eq!(message.into_text().unwrap().as_str(), r#"{"command":"reload"}"#);
    }

    #[test]
    fn a_vanished_client_is_dropped_on_broadcast() {
        let (listener, port) = reserve_port(0).unwrap();
        let (handle, clients) = serve(listener);

        let socket = client(port);
        assert!(wait_until(|| lock(&clients).len() == 1));
        drop(socket);

        assert!(wait_until(|| {
            handle.reload();
            lock(&clients).is_empty()
        }));
    }

    #[test]
    fn empty_css_reload_is_not_sent() {
        let (tx, rx) = mpsc::channel();
        let handle = ReloadHandle::from_sender(tx);
        handle.reload_css(Vec::new());
        handle.reload();
        assert_eq!(rx.try_recv().unwrap(), ReloadMessage::Full);
        assert!(rx.try_recv().is_err());
    }
}
