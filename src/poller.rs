//! Thin wrapper over `mio::Poll`: the "Platform Poller" abstraction
//! (add/modify/remove, blocking wait yielding readiness bits) that the
//! rest of the engine is written against, so the backend (epoll/kqueue/
//! IOCP, whatever mio picks) never leaks past this module.

use std::io;
use std::time::Duration;

use mio::event::Source;
use mio::{Events, Interest, Poll, Token};

pub struct Poller {
    poll: Poll,
    events: Events,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub token: Token,
    pub readable: bool,
    pub writable: bool,
    /// Error or hangup: the caller should treat the fd as dead either way.
    pub error: bool,
}

impl Poller {
    pub fn new(capacity: usize) -> io::Result<Self> {
        Ok(Poller {
            poll: Poll::new()?,
            events: Events::with_capacity(capacity),
        })
    }

    pub fn register(&self, source: &mut dyn Source, token: Token, interest: Interest) -> io::Result<()> {
        self.poll.registry().register(source, token, interest)
    }

    pub fn reregister(&self, source: &mut dyn Source, token: Token, interest: Interest) -> io::Result<()> {
        self.poll.registry().reregister(source, token, interest)
    }

    pub fn deregister(&self, source: &mut dyn Source) -> io::Result<()> {
        self.poll.registry().deregister(source)
    }

    /// Blocks until at least one fd is ready or `timeout` elapses,
    /// returning the readiness bits collected this wait.
    pub fn wait(&mut self, timeout: Option<Duration>) -> io::Result<Vec<Readiness>> {
        self.poll.poll(&mut self.events, timeout)?;
        Ok(self
            .events
            .iter()
            .map(|ev| Readiness {
                token: ev.token(),
                readable: ev.is_readable(),
                writable: ev.is_writable(),
                error: ev.is_error() || ev.is_read_closed() || ev.is_write_closed(),
            })
            .collect())
    }
}

pub const LISTENER_TOKEN: Token = Token(usize::MAX);
