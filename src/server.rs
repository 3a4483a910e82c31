//! The event loop (spec §4.1): ties the Poller, registries, framer,
//! dispatcher and liveness manager together. `tick_once` runs exactly
//! one iteration and is what both `run` and the integration tests
//! drive — tests just call it directly against synthetic connections
//! instead of going through a real accept loop.

use std::io::{self, Read, Write};
use std::time::Duration;

use log::{debug, info, warn};
use mio::net::TcpListener;
use mio::{Interest, Token};

use ircd_proto::rpl;

use crate::client::{Client, Connection};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::dispatch;
use crate::errors::ServerError;
use crate::framer::{self, FramerEvent};
use crate::liveness::{self, LivenessAction};
use crate::poller::{Poller, Readiness, LISTENER_TOKEN};
use crate::registry::{ChannelRegistry, ClientId, ClientIndex};
use crate::signal;

const POLL_BUDGET: Duration = Duration::from_secs(1);

pub struct Server<C: Clock = SystemClock> {
    listener: Option<TcpListener>,
    poller: Poller,
    pub clients: ClientIndex,
    pub channels: ChannelRegistry,
    pub config: Config,
    pub server_name: String,
    ping_seq: u64,
    clock: C,
    shutdown: bool,
}

impl Server<SystemClock> {
    pub fn bind(config: Config, port: u16) -> Result<Self, ServerError> {
        let addr = format!("0.0.0.0:{port}").parse().expect("well-formed socket addr");
        let listener = TcpListener::bind(addr).map_err(|source| ServerError::Bind {
            addr: format!("0.0.0.0:{port}"),
            source,
        })?;
        Self::with_listener(config, listener, SystemClock)
    }
}

impl<C: Clock> Server<C> {
    pub fn with_listener(config: Config, mut listener: TcpListener, clock: C) -> Result<Self, ServerError> {
        let poller = Poller::new(1024).map_err(ServerError::PollerWait)?;
        poller
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)
            .map_err(ServerError::PollerRegister)?;
        let server_name = config.server.name.clone();
        Ok(Server {
            listener: Some(listener),
            poller,
            clients: ClientIndex::new(),
            channels: ChannelRegistry::new(),
            config,
            server_name,
            ping_seq: 0,
            clock,
            shutdown: false,
        })
    }

    /// Builds a server with no listening socket, for tests that add
    /// connections directly via `add_client`.
    pub fn without_listener(config: Config, clock: C) -> Result<Self, ServerError> {
        let poller = Poller::new(1024).map_err(ServerError::PollerWait)?;
        let server_name = config.server.name.clone();
        Ok(Server {
            listener: None,
            poller,
            clients: ClientIndex::new(),
            channels: ChannelRegistry::new(),
            config,
            server_name,
            ping_seq: 0,
            clock,
            shutdown: false,
        })
    }

    pub fn add_client(&mut self, socket: Box<dyn Connection>, host: String) -> io::Result<ClientId> {
        let now = self.clock.now();
        let client = Client::new(socket, host, now);
        let id = self.clients.insert(client);
        if let Some(client) = self.clients.get_mut(id) {
            self.poller
                .register(&mut *client.socket, Token(id), Interest::READABLE | Interest::WRITABLE)?;
        }
        Ok(id)
    }

    pub fn run(&mut self) -> Result<(), ServerError> {
        signal::install();
        while !self.shutdown && !signal::shutdown_requested() {
            self.tick_once()?;
        }
        info!("shutting down");
        Ok(())
    }

    pub fn tick_once(&mut self) -> Result<(), ServerError> {
        let readiness = self.poller.wait(Some(POLL_BUDGET)).map_err(ServerError::PollerWait)?;
        for r in readiness {
            self.service_readiness(r);
        }
        self.liveness_tick();
        self.flush_pending();
        self.reap();
        self.flush_pending();
        Ok(())
    }

    /// Attempts a write for every client with unflushed output, rather
    /// than waiting for a future `WRITABLE` readiness event. Replies
    /// queued mid-tick (by dispatch, by a liveness PING, or by a QUIT
    /// broadcast during `reap`) would otherwise have to wait for mio to
    /// report the socket writable again, which an edge-triggered poller
    /// is not guaranteed to do promptly for a socket that was already
    /// writable before the data was queued.
    fn flush_pending(&mut self) {
        for id in self.clients.ids() {
            let pending = self
                .clients
                .get(id)
                .map(|c| c.outbuf_offset < c.outbuf.len() || c.close_after_flush)
                .unwrap_or(false);
            if pending {
                self.service_writable(id);
            }
        }
    }

    fn service_readiness(&mut self, r: Readiness) {
        if r.token == LISTENER_TOKEN {
            if r.readable {
                self.accept_loop();
            }
            return;
        }

        let id = r.token.0;
        if r.error {
            if let Some(client) = self.clients.get_mut(id) {
                client.mark_for_removal("Connection reset");
            }
            return;
        }
        if r.readable {
            self.service_readable(id);
        }
        if r.writable {
            self.service_writable(id);
        }
    }

    fn accept_loop(&mut self) {
        loop {
            let accepted = match &mut self.listener {
                Some(listener) => listener.accept(),
                None => return,
            };
            match accepted {
                Ok((stream, addr)) => {
                    let host = addr.ip().to_string();
                    match self.add_client(Box::new(stream), host) {
                        Ok(id) => info!("accepted client {id} from {addr}"),
                        Err(e) => warn!("failed to register new connection: {e}"),
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("accept error: {e}");
                    break;
                }
            }
        }
    }

    fn service_readable(&mut self, id: ClientId) {
        let mut buf = [0u8; 4096];
        loop {
            let read = match self.clients.get_mut(id) {
                Some(client) => client.socket.read(&mut buf),
                None => return,
            };
            match read {
                Ok(0) => {
                    if let Some(client) = self.clients.get_mut(id) {
                        client.mark_for_removal("Connection closed");
                    }
                    break;
                }
                Ok(n) => {
                    let now = self.clock.now();
                    if let Some(client) = self.clients.get_mut(id) {
                        client.inbuf.extend_from_slice(&buf[..n]);
                        client.touch_liveness(now);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("read error on client {id}: {e}");
                    if let Some(client) = self.clients.get_mut(id) {
                        client.mark_for_removal("Connection reset");
                    }
                    break;
                }
            }
        }
        self.drain_lines(id);
    }

    fn drain_lines(&mut self, id: ClientId) {
        let limits = self.config.limits.clone();
        let events = match self.clients.get_mut(id) {
            Some(client) => framer::extract_lines(&mut client.inbuf, &mut client.discarding, &limits),
            None => return,
        };
        for event in events {
            if self.clients.get(id).map(|c| c.remove).unwrap_or(true) {
                break;
            }
            match event {
                FramerEvent::Line(line) => dispatch::dispatch_line(self, id, &line),
                FramerEvent::TooLong => {
                    self.reply(id, rpl::ERR_INPUTTOOLONG, &[], "Input line too long");
                }
                FramerEvent::Invalid => {
                    self.reply(id, rpl::ERR_UNKNOWNCOMMAND, &["*"], "Unknown command");
                }
            }
        }
    }

    fn service_writable(&mut self, id: ClientId) {
        loop {
            let outcome = match self.clients.get_mut(id) {
                Some(client) if client.outbuf_offset < client.outbuf.len() => {
                    Some(client.socket.write(&client.outbuf[client.outbuf_offset..]))
                }
                Some(_) => None,
                None => return,
            };

            let Some(result) = outcome else {
                if let Some(client) = self.clients.get_mut(id) {
                    client.outbuf.clear();
                    client.outbuf_offset = 0;
                    if client.close_after_flush {
                        client.remove = true;
                    }
                }
                break;
            };

            match result {
                Ok(0) => break,
                Ok(n) => {
                    if let Some(client) = self.clients.get_mut(id) {
                        client.outbuf_offset += n;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("write error on client {id}: {e}");
                    if let Some(client) = self.clients.get_mut(id) {
                        client.mark_for_removal("Connection reset");
                    }
                    break;
                }
            }
        }
    }

    fn liveness_tick(&mut self) {
        let now = self.clock.now();
        let idle = Duration::from_secs(self.config.limits.liveness_idle_secs);
        let ping_timeout = Duration::from_secs(self.config.limits.liveness_ping_timeout_secs);

        for id in self.clients.ids() {
            self.ping_seq += 1;
            let token = format!("{}-{}", self.server_name, self.ping_seq);
            let action = match self.clients.get_mut(id) {
                Some(client) if client.is_registered() => {
                    liveness::tick(client, now, idle, ping_timeout, &token)
                }
                _ => None,
            };
            match action {
                Some(LivenessAction::SendPing(token)) => {
                    self.queue_line(id, &format!("PING :{token}"));
                }
                Some(LivenessAction::Timeout) => {
                    if let Some(client) = self.clients.get_mut(id) {
                        client.mark_for_removal("Ping timeout");
                    }
                }
                None => {}
            }
        }
    }

    fn reap(&mut self) {
        let dead: Vec<ClientId> = self
            .clients
            .ids()
            .into_iter()
            .filter(|&id| self.clients.get(id).map(|c| c.remove).unwrap_or(false))
            .collect();
        for id in dead {
            self.finalize_removal(id);
        }
    }

    fn finalize_removal(&mut self, id: ClientId) {
        let Some(mut client) = self.clients.remove(id) else {
            return;
        };
        let _ = self.poller.deregister(&mut *client.socket);

        let reason = client.removal_reason.clone().unwrap_or_else(|| "Client Quit".to_string());
        let prefix = client.prefix();
        let quit_line = format!(":{prefix} QUIT :{reason}");

        let chan_names: Vec<String> = client.channels.drain().collect();
        for chan_name in &chan_names {
            let member_ids: Vec<ClientId> = match self.channels.get_mut(chan_name) {
                Some(channel) => {
                    channel.members.remove(&id);
                    channel.members.keys().copied().collect()
                }
                None => continue,
            };
            for member_id in member_ids {
                if let Some(member) = self.clients.get_mut(member_id) {
                    member.queue_line(&quit_line, self.config.limits.outbuf_soft_cap);
                }
            }
            self.channels.destroy_if_empty(chan_name);
        }

        for channel in self.channels.all_mut() {
            channel.invited.remove(&id);
        }
    }

    // --- reply helpers shared by handlers ---

    pub fn now(&self) -> std::time::Instant {
        self.clock.now()
    }

    pub fn queue_line(&mut self, id: ClientId, line: &str) {
        let cap = self.config.limits.outbuf_soft_cap;
        if let Some(client) = self.clients.get_mut(id) {
            client.queue_line(line, cap);
        }
    }

    pub fn reply(&mut self, id: ClientId, code: u16, middle: &[&str], trailing: &str) {
        let nick = self
            .clients
            .get(id)
            .map(|c| if c.nick.is_empty() { "*".to_string() } else { c.nick.clone() })
            .unwrap_or_else(|| "*".to_string());
        let mut full_middle = Vec::with_capacity(middle.len() + 1);
        full_middle.push(nick.as_str());
        full_middle.extend_from_slice(middle);
        let line = rpl::reply(&self.server_name, code, &full_middle, trailing);
        self.queue_line(id, &line);
    }

    pub fn reply_no_trailing(&mut self, id: ClientId, code: u16, middle: &[&str]) {
        let nick = self
            .clients
            .get(id)
            .map(|c| if c.nick.is_empty() { "*".to_string() } else { c.nick.clone() })
            .unwrap_or_else(|| "*".to_string());
        let mut full_middle = Vec::with_capacity(middle.len() + 1);
        full_middle.push(nick.as_str());
        full_middle.extend_from_slice(middle);
        let line = rpl::reply_no_trailing(&self.server_name, code, &full_middle);
        self.queue_line(id, &line);
    }

    pub fn close_after_flush(&mut self, id: ClientId, reason: &str) {
        if let Some(client) = self.clients.get_mut(id) {
            client.request_close_after_flush(reason);
        }
    }

    pub fn remove_now(&mut self, id: ClientId, reason: &str) {
        if let Some(client) = self.clients.get_mut(id) {
            client.mark_for_removal(reason);
        }
    }
}
