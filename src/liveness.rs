//! Liveness manager (spec §4.7): one tick per client per loop iteration,
//! driven by a real or synthetic clock so tests don't need to sleep.

use std::time::{Duration, Instant};

use crate::client::Client;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessAction {
    SendPing(String),
    Timeout,
}

/// Runs one liveness check against `client`. `token` is the PING token
/// to send if a ping is due; the caller is responsible for making it
/// unique (the server keeps a counter), this module just records it.
pub fn tick(
    client: &mut Client,
    now: Instant,
    idle_timeout: Duration,
    ping_timeout: Duration,
    token: &str,
) -> Option<LivenessAction> {
    if let Some(sent_at) = client.ping_sent_at {
        if now.saturating_duration_since(sent_at) > ping_timeout {
            return Some(LivenessAction::Timeout);
        }
        return None;
    }

    if now.saturating_duration_since(client.last_recv_at) > idle_timeout {
        client.ping_sent_at = Some(now);
        client.ping_token = Some(token.to_string());
        return Some(LivenessAction::SendPing(token.to_string()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RegistrationState;
    use mio::net::UnixStream;

    fn test_client() -> Client {
        let (a, _b) = UnixStream::pair().unwrap();
        let mut c = Client::new(Box::new(a), "localhost".to_string(), Instant::now());
        c.state = RegistrationState::Registered;
        c
    }

    #[test]
    fn idle_past_timeout_sends_ping() {
        let mut client = test_client();
        let now = client.last_recv_at + Duration::from_secs(61);
        let action = tick(&mut client, now, Duration::from_secs(60), Duration::from_secs(60), "tok1");
        assert_eq!(action, Some(LivenessAction::SendPing("tok1".to_string())));
        assert_eq!(client.ping_sent_at, Some(now));
    }

    #[test]
    fn not_yet_idle_does_nothing() {
        let mut client = test_client();
        let now = client.last_recv_at + Duration::from_secs(10);
        let action = tick(&mut client, now, Duration::from_secs(60), Duration::from_secs(60), "tok1");
        assert_eq!(action, None);
    }

    #[test]
    fn unanswered_ping_past_timeout_is_a_timeout() {
        let mut client = test_client();
        let sent_at = client.last_recv_at + Duration::from_secs(61);
        client.ping_sent_at = Some(sent_at);
        let now = sent_at + Duration::from_secs(61);
        let action = tick(&mut client, now, Duration::from_secs(60), Duration::from_secs(60), "tok2");
        assert_eq!(action, Some(LivenessAction::Timeout));
    }

    #[test]
    fn inbound_activity_clears_outstanding_ping() {
        let mut client = test_client();
        client.ping_sent_at = Some(client.last_recv_at);
        client.touch_liveness(client.last_recv_at + Duration::from_secs(5));
        assert!(client.ping_sent_at.is_none());
    }
}
