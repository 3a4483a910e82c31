//! Per-connection state (spec §3): the socket, its buffers, registration
//! progress, liveness timestamps and channel membership. `Connection`
//! abstracts the socket itself so production code drives real
//! `mio::net::TcpStream`s and tests drive `mio::net::UnixStream` pairs
//! without the engine knowing the difference.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::time::Instant;

use mio::event::Source;

/// Anything the event loop can poll, read from and write to. Blanket
/// implemented below for any type that is already `Read + Write +
/// mio::event::Source`.
pub trait Connection: Read + Write + Source {}
impl<T: Read + Write + Source> Connection for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationState {
    AwaitingPass,
    AwaitingNickUser,
    Registered,
    Quitting,
}

pub struct Client {
    pub socket: Box<dyn Connection>,
    pub state: RegistrationState,

    pub nick: String,
    pub user: String,
    pub realname: String,
    pub host: String,

    pub password_ok: bool,

    pub inbuf: Vec<u8>,
    pub outbuf: Vec<u8>,
    /// Bytes already written to the kernel from the front of `outbuf`.
    pub outbuf_offset: usize,
    /// Set once the framer has seen more than `line_max` bytes without
    /// a terminator; further bytes are discarded until the next `\n`.
    pub discarding: bool,

    pub last_recv_at: Instant,
    pub ping_sent_at: Option<Instant>,
    pub ping_token: Option<String>,

    /// Case-folded names of channels this client is a member of.
    pub channels: HashSet<String>,
    /// Case-folded names of channels this client holds a pending invite to.
    pub invited_to: HashSet<String>,

    pub close_after_flush: bool,
    pub remove: bool,
    pub removal_reason: Option<String>,

    /// True once the client has sent `CAP LS`; per spec's Open Question
    /// decision, this defers the welcome burst until `CAP END`.
    pub cap_negotiating: bool,
}

impl Client {
    pub fn new(socket: Box<dyn Connection>, host: String, now: Instant) -> Self {
        Client {
            socket,
            state: RegistrationState::AwaitingPass,
            nick: String::new(),
            user: String::new(),
            realname: String::new(),
            host,
            password_ok: false,
            inbuf: Vec::new(),
            outbuf: Vec::new(),
            outbuf_offset: 0,
            discarding: false,
            last_recv_at: now,
            ping_sent_at: None,
            ping_token: None,
            channels: HashSet::new(),
            invited_to: HashSet::new(),
            close_after_flush: false,
            remove: false,
            removal_reason: None,
            cap_negotiating: false,
        }
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    pub fn prefix(&self) -> String {
        format!("{}!{}@{}", self.nick, self.user, self.host)
    }

    /// Appends a line to outbuf, enforcing the soft send-queue cap
    /// (§4.5). Returns false (and marks the client for removal) if the
    /// cap would be exceeded.
    pub fn queue_line(&mut self, line: &str, outbuf_soft_cap: usize) -> bool {
        if self.outbuf.len() + line.len() + 2 > outbuf_soft_cap {
            self.mark_for_removal("SendQ exceeded");
            return false;
        }
        self.outbuf.extend_from_slice(line.as_bytes());
        self.outbuf.extend_from_slice(b"\r\n");
        true
    }

    pub fn mark_for_removal(&mut self, reason: &str) {
        self.remove = true;
        if self.removal_reason.is_none() {
            self.removal_reason = Some(reason.to_string());
        }
    }

    pub fn request_close_after_flush(&mut self, reason: &str) {
        self.close_after_flush = true;
        if self.removal_reason.is_none() {
            self.removal_reason = Some(reason.to_string());
        }
    }

    pub fn touch_liveness(&mut self, now: Instant) {
        self.last_recv_at = now;
        self.ping_sent_at = None;
        self.ping_token = None;
    }
}
