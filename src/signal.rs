//! SIGINT/SIGTERM handling so the process entry point can exit 0 on a
//! normal shutdown request (§6) instead of being killed outright. Raw
//! `libc::signal` rather than a runtime, in keeping with the rest of
//! the engine having no async surface.

use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_shutdown_signal(_sig: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

pub fn install() {
    unsafe {
        libc::signal(libc::SIGINT, handle_shutdown_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, handle_shutdown_signal as libc::sighandler_t);
    }
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unrequested() {
        // Each test process only installs handlers once; just check the
        // flag's default reads false before any signal is raised.
        assert!(!SHUTDOWN_REQUESTED.swap(false, Ordering::SeqCst));
    }
}
