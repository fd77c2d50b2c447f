//! Remote link server: TCP listener + per-client state + line framing.
//!
//! Caregiver apps connect over Wi-Fi, send newline-terminated commands and
//! receive event codes and notification lines.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::time::Instant;

use anyhow::{anyhow, Context};
use calloop::generic::Generic;
use calloop::{Interest, LoopHandle, Mode, PostAction};
use tracing::{debug, error, info, warn};

use super::dispatch;
use crate::blink::ClassifiedEvent;
use crate::peripherals::{NotificationRequest, NotificationSink};
use crate::state::DeviceState;

/// Default TCP port of the remote link.
pub const DEFAULT_PORT: u16 = 45454;

/// Longest accepted command line.
const MAX_LINE_LEN: usize = 1024;

/// Maximum write buffer before dropping broadcasts (64 KiB).
const MAX_WRITE_BUFFER: usize = 65_536;

/// Default rate limit: lines per second per client.
const DEFAULT_RATE_LIMIT: u32 = 200;

/// Rate limit window duration in seconds.
const RATE_LIMIT_WINDOW_SECS: u64 = 1;

/// Per-client rate limiter.
pub struct RateLimiter {
    window_start: Instant,
    line_count: u32,
    pub max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            line_count: 0,
            max_per_second,
        }
    }

    /// Returns true if another line fits in the current window.
    fn check(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.window_start).as_secs() >= RATE_LIMIT_WINDOW_SECS {
            self.window_start = now;
            self.line_count = 1;
            true
        } else {
            self.line_count += 1;
            self.line_count <= self.max_per_second
        }
    }
}

/// Per-client connection state.
pub struct RemoteClient {
    pub stream: TcpStream,
    pub peer: Option<SocketAddr>,
    pub read_buf: Vec<u8>,
    pub write_buf: Vec<u8>,
    pub id: u64,
    pub rate_limiter: RateLimiter,
}

impl RemoteClient {
    fn new(stream: TcpStream, id: u64) -> Self {
        if let Err(e) = stream.set_nonblocking(true) {
            warn!(client_id = id, "failed to set non-blocking: {}", e);
        }
        stream.set_nodelay(true).ok();
        let peer = stream.peer_addr().ok();
        Self {
            stream,
            peer,
            read_buf: Vec::with_capacity(256),
            write_buf: Vec::new(),
            id,
            rate_limiter: RateLimiter::new(DEFAULT_RATE_LIMIT),
        }
    }

    /// Attempt to flush pending writes.
    pub fn flush_writes(&mut self) -> io::Result<()> {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "write zero")),
                Ok(n) => {
                    self.write_buf.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Queue raw bytes, dropping them if the client is not draining its
    /// socket.  Returns false when dropped.
    pub fn enqueue(&mut self, data: &str) -> bool {
        if self.write_buf.len() + data.len() > MAX_WRITE_BUFFER {
            warn!(client_id = self.id, "write buffer overflow, dropping output");
            return false;
        }
        self.write_buf.extend_from_slice(data.as_bytes());
        true
    }

    /// Queue a reply line, adding the newline.
    pub fn enqueue_line(&mut self, line: &str) -> bool {
        self.enqueue(&format!("{}\n", line))
    }

    /// Split complete lines off the read buffer.  Lines end at `\n` or `\r`;
    /// blank lines are skipped.
    pub fn extract_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(pos) = self.read_buf.iter().position(|b| *b == b'\n' || *b == b'\r') {
            let line = String::from_utf8_lossy(&self.read_buf[..pos]).trim().to_string();
            self.read_buf.drain(..=pos);
            if !line.is_empty() {
                lines.push(line);
            }
        }
        if self.read_buf.len() > MAX_LINE_LEN {
            error!(
                client_id = self.id,
                len = self.read_buf.len(),
                "line exceeds maximum length, discarding"
            );
            self.read_buf.clear();
        }
        lines
    }
}

/// Remote server state: connected clients and tracing options.  The
/// listener itself is owned by the event loop source.
pub struct RemoteServer {
    pub clients: HashMap<u64, RemoteClient>,
    next_client_id: u64,
    pub remote_trace: bool,
    pub local_addr: Option<SocketAddr>,
}

impl Default for RemoteServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteServer {
    /// Create the server state (does not bind; call `bind` after).
    pub fn new() -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            remote_trace: false,
            local_addr: None,
        }
    }

    pub fn default_listen_addr() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
    }

    /// Bind the listener and register it with calloop.  Returns the bound
    /// address.
    pub fn bind(
        addr: SocketAddr,
        loop_handle: &LoopHandle<'static, DeviceState>,
    ) -> anyhow::Result<SocketAddr> {
        let listener =
            TcpListener::bind(addr).with_context(|| format!("binding remote link on {}", addr))?;
        listener.set_nonblocking(true)?;
        let local = listener.local_addr()?;

        info!(%local, "remote link listening");

        let source = Generic::new(listener, Interest::READ, Mode::Level);
        loop_handle
            .insert_source(source, |_event, listener, state| {
                loop {
                    match listener.accept() {
                        Ok((stream, peer)) => {
                            let client_id = state.remote.next_client_id;
                            state.remote.next_client_id += 1;

                            info!(client_id, %peer, "remote client connected");

                            let client = RemoteClient::new(stream, client_id);
                            state.remote.clients.insert(client_id, client);
                        }
                        Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                        Err(e) => {
                            error!("accept error: {}", e);
                            break;
                        }
                    }
                }
                Ok(PostAction::Continue)
            })
            .map_err(|e| anyhow!("failed to register remote listener: {}", e.error))?;

        Ok(local)
    }

    /// Read from every client, run complete command lines, flush replies.
    /// Called once per event loop iteration.
    pub fn poll_clients(state: &mut DeviceState) {
        let client_ids: Vec<u64> = state.remote.clients.keys().copied().collect();
        let mut disconnected = Vec::new();

        for client_id in client_ids {
            let Some(client) = state.remote.clients.get_mut(&client_id) else {
                continue;
            };

            let mut buf = [0u8; 1024];
            let read_result = match client.stream.read(&mut buf) {
                Ok(0) => Err(io::Error::new(io::ErrorKind::ConnectionReset, "eof")),
                Ok(n) => {
                    client.read_buf.extend_from_slice(&buf[..n]);
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
                Err(e) => Err(e),
            };

            if let Err(e) = read_result {
                debug!(client_id, "client disconnected: {}", e);
                disconnected.push(client_id);
                continue;
            }

            let lines = client.extract_lines();

            for line in lines {
                let rate_ok = state
                    .remote
                    .clients
                    .get_mut(&client_id)
                    .map(|c| c.rate_limiter.check())
                    .unwrap_or(false);

                if !rate_ok {
                    warn!(client_id, "rate limit exceeded, dropping line");
                    if let Some(client) = state.remote.clients.get_mut(&client_id) {
                        client.enqueue_line("Rate limit exceeded");
                    }
                    continue;
                }

                if state.remote.remote_trace {
                    info!(client_id, "<< {}", line);
                }
                let reply = dispatch::process_command(state, &line);
                if state.remote.remote_trace {
                    info!(client_id, ">> {}", reply);
                }
                if let Some(client) = state.remote.clients.get_mut(&client_id) {
                    client.enqueue_line(&reply);
                }
            }

            if let Some(client) = state.remote.clients.get_mut(&client_id) {
                if let Err(e) = client.flush_writes() {
                    debug!(client_id, "write error: {}", e);
                    disconnected.push(client_id);
                }
            }
        }

        for id in disconnected {
            info!(client_id = id, "removing disconnected remote client");
            state.remote.clients.remove(&id);
        }
    }

    /// Queue `data` for every client.  Delivered on the next poll.
    pub fn broadcast(&mut self, data: &str) {
        if self.remote_trace {
            info!("broadcast >> {:?}", data);
        }
        for client in self.clients.values_mut() {
            client.enqueue(data);
        }
    }

    /// Send the single-character code of a classified event.
    pub fn broadcast_event(&mut self, event: ClassifiedEvent) {
        let mut code = [0u8; 4];
        self.broadcast(event.code().encode_utf8(&mut code));
    }
}

impl NotificationSink for RemoteServer {
    fn send_notification(&mut self, request: &NotificationRequest) {
        info!(
            user_id = request.user_id,
            kind = request.kind.as_str(),
            clients = self.clients.len(),
            "notification"
        );
        if self.clients.is_empty() {
            warn!(kind = request.kind.as_str(), "no remote clients, notification not delivered");
        }
        self.broadcast(&format!("{}\n", request.to_line()));
    }
}
