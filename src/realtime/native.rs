//! Background thread for the realtime channel (native only)
//!
//! `RealtimeClient` owns a worker thread that dials the websocket, reads it
//! without blocking, and redials after the reconnect delay whenever the
//! connection drops. Commands and events cross over mpsc channels.

use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};
use url::Url;
use web_time::Instant;

use super::connection::{ChannelStatus, ReconnectMachine};
use super::message::{Inbound, Outbound, ws_url};
use super::RealtimeEvent;
use crate::constants::{REALTIME_CONNECT_TIMEOUT, REALTIME_POLL_INTERVAL};
use crate::error::AppError;

type Socket = WebSocket<MaybeTlsStream<TcpStream>>;

/// Message sent to the worker thread.
enum ThreadMessage {
    /// Write a message to the socket
    Send(Outbound),
    /// Close the socket and stop the thread
    Shutdown,
}

/// Handle to the realtime worker thread.
pub struct RealtimeClient {
    request_tx: Sender<ThreadMessage>,
    event_rx: Receiver<RealtimeEvent>,
    thread_handle: Option<JoinHandle<()>>,
}

impl RealtimeClient {
    /// Connect to the `/ws` endpoint of `server_url`.
    pub fn spawn(server_url: &str) -> Result<Self, AppError> {
        Self::spawn_with(ws_url(server_url)?, ReconnectMachine::new())
    }

    /// Connect to an explicit websocket URL with a custom machine (e.g. a
    /// shorter retry delay).
    pub fn spawn_with(url: String, machine: ReconnectMachine) -> Result<Self, AppError> {
        let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
        let (event_tx, event_rx) = mpsc::channel::<RealtimeEvent>();

        let thread_handle = thread::Builder::new()
            .name("realtime".to_string())
            .spawn(move || {
                log::info!("Realtime thread started for {}", url);
                Worker::new(url, machine, request_rx, event_tx).run();
                log::info!("Realtime thread exiting");
            })?;

        Ok(Self {
            request_tx,
            event_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Queue a message. Messages sent while disconnected are dropped by the
    /// worker.
    pub fn send(&self, message: Outbound) -> Result<(), AppError> {
        self.request_tx
            .send(ThreadMessage::Send(message))
            .map_err(|_| AppError::Disconnected)
    }

    /// Take one pending event without blocking.
    pub fn try_event(&self) -> Option<RealtimeEvent> {
        match self.event_rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                log::debug!("Realtime thread disconnected");
                None
            }
        }
    }

    /// Wait up to `timeout` for the next event.
    pub fn next_event(&self, timeout: Duration) -> Option<RealtimeEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for RealtimeClient {
    fn drop(&mut self) {
        log::debug!("Shutting down realtime thread");

        let _ = self.request_tx.send(ThreadMessage::Shutdown);

        if let Some(handle) = self.thread_handle.take() {
            if let Err(e) = handle.join() {
                log::warn!("Realtime thread panicked: {:?}", e);
            }
        }
    }
}

fn set_nonblocking(socket: &mut Socket) -> std::io::Result<()> {
    match socket.get_mut() {
        MaybeTlsStream::Plain(stream) => stream.set_nonblocking(true),
        MaybeTlsStream::Rustls(stream) => stream.get_ref().set_nonblocking(true),
        _ => Ok(()),
    }
}

/// Open the TCP connection behind `url`, giving up on each resolved address
/// after `timeout`. Reads and writes time out too, so a stalled handshake
/// cannot hang the worker.
fn open_stream(url: &str, timeout: Duration) -> Result<TcpStream, AppError> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::Network(format!("No host in {}", url)))?;
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| AppError::Network(format!("No port for {}", url)))?;

    let mut last_error = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(timeout))?;
                stream.set_write_timeout(Some(timeout))?;
                return Ok(stream);
            }
            Err(e) => {
                log::debug!("Connecting to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }
    Err(match last_error {
        Some(e) => AppError::Network(e.to_string()),
        None => AppError::Network(format!("{} did not resolve", host)),
    })
}

fn connect(url: &str, timeout: Duration) -> Result<Socket, AppError> {
    let stream = open_stream(url, timeout)?;
    let (socket, _response) = tungstenite::client_tls(url, stream)
        .map_err(|e| AppError::Network(format!("Handshake failed: {}", e)))?;
    Ok(socket)
}

fn would_block(error: &tungstenite::Error) -> bool {
    matches!(error, tungstenite::Error::Io(e) if e.kind() == ErrorKind::WouldBlock)
}

/// State owned by the worker thread.
struct Worker {
    url: String,
    machine: ReconnectMachine,
    socket: Option<Socket>,
    request_rx: Receiver<ThreadMessage>,
    event_tx: Sender<RealtimeEvent>,
    /// Set once the client handle is gone
    stopped: bool,
}

impl Worker {
    fn new(
        url: String,
        machine: ReconnectMachine,
        request_rx: Receiver<ThreadMessage>,
        event_tx: Sender<RealtimeEvent>,
    ) -> Self {
        Self {
            url,
            machine,
            socket: None,
            request_rx,
            event_tx,
            stopped: false,
        }
    }

    fn run(mut self) {
        if self.machine.start() {
            self.dial();
        }

        while !self.stopped {
            match self.request_rx.recv_timeout(REALTIME_POLL_INTERVAL) {
                Ok(ThreadMessage::Send(message)) => self.send(&message),
                Ok(ThreadMessage::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    self.shutdown();
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
            }

            if self.machine.poll(Instant::now()) {
                self.dial();
            }
            self.read_available();
            self.flush();
        }
    }

    fn emit(&mut self, event: RealtimeEvent) {
        if self.event_tx.send(event).is_err() {
            log::debug!("Event receiver dropped");
            self.stopped = true;
        }
    }

    fn emit_status(&mut self) {
        let status = self.machine.status();
        self.emit(RealtimeEvent::Status(status));
    }

    fn dial(&mut self) {
        self.emit_status();
        log::debug!("Dialing {}", self.url);
        match connect(&self.url, REALTIME_CONNECT_TIMEOUT) {
            Ok(mut socket) => {
                if let Err(e) = set_nonblocking(&mut socket) {
                    self.lost(format!("Failed to configure socket: {}", e));
                    return;
                }
                self.socket = Some(socket);
                self.machine.on_open();
                self.emit_status();
            }
            Err(e) => self.lost(format!("Failed to connect to {}: {}", self.url, e)),
        }
    }

    /// Drop the socket and schedule a retry.
    fn lost(&mut self, reason: String) {
        log::warn!("{}", reason);
        self.socket = None;
        if self.machine.on_close(Instant::now()).is_some() {
            self.emit(RealtimeEvent::Error(reason));
            self.emit_status();
        }
    }

    fn send(&mut self, message: &Outbound) {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to serialize {:?}: {}", message, e);
                return;
            }
        };
        let Some(socket) = self.socket.as_mut() else {
            log::warn!("Dropping outbound message while {}", self.machine.status().label());
            return;
        };
        match socket.send(Message::text(json)) {
            Ok(()) => {}
            // Queued; written by a later flush
            Err(e) if would_block(&e) => {}
            Err(e) => self.lost(format!("Send failed: {}", e)),
        }
    }

    fn read_available(&mut self) {
        while let Some(socket) = self.socket.as_mut() {
            match socket.read() {
                Ok(Message::Text(text)) => self.handle_text(&text),
                Ok(Message::Close(frame)) => {
                    self.lost(format!("Server closed the connection: {:?}", frame));
                }
                Ok(_) => {}
                Err(e) if would_block(&e) => return,
                Err(e) => self.lost(format!("Connection lost: {}", e)),
            }
        }
    }

    fn flush(&mut self) {
        let Some(socket) = self.socket.as_mut() else {
            return;
        };
        match socket.flush() {
            Ok(()) => {}
            Err(e) if would_block(&e) => {}
            Err(e) => self.lost(format!("Flush failed: {}", e)),
        }
    }

    fn handle_text(&mut self, text: &str) {
        match Inbound::parse(text) {
            Ok(message) => self.emit(RealtimeEvent::Message(message)),
            Err(e) => log::warn!("Ignoring unrecognised realtime message: {}", e),
        }
    }

    fn shutdown(&mut self) {
        self.machine.close();
        if let Some(mut socket) = self.socket.take() {
            let _ = socket.close(None);
            let _ = socket.flush();
        }
        let _ = self.event_tx.send(RealtimeEvent::Status(ChannelStatus::Closed));
    }
}
