//! Extracts complete lines from a client's inbound byte buffer (spec
//! §4.2, §4.5). Operates on the raw buffer rather than a whole `Client`
//! so it can be unit tested without a socket.
//!
//! Two thresholds are in play and they are not the same knob: `line_max`
//! (512B, §4.2) is the protocol limit — once that many bytes have
//! accumulated without a terminator the line in progress is abandoned
//! and `ERR_INPUTTOOLONG` is queued once the next terminator recovers
//! framing. `inbuf_cap` (8KiB, §4.5) is a defensive backstop against a
//! client that never sends a terminator at all: while already
//! discarding, if the buffer would grow past it anyway, the buffer is
//! dropped outright rather than growing unbounded.

use crate::config::LimitsConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerEvent {
    Line(String),
    /// A line exceeded `line_max` bytes before (or at) its terminator.
    TooLong,
    /// A line's bytes were not valid UTF-8.
    Invalid,
}

pub fn extract_lines(inbuf: &mut Vec<u8>, discarding: &mut bool, limits: &LimitsConfig) -> Vec<FramerEvent> {
    let mut events = Vec::new();

    loop {
        if *discarding {
            match inbuf.iter().position(|&b| b == b'\n') {
                Some(nl) => {
                    inbuf.drain(..=nl);
                    *discarding = false;
                    events.push(FramerEvent::TooLong);
                    continue;
                }
                None => {
                    if inbuf.len() > limits.inbuf_cap {
                        inbuf.clear();
                    }
                    break;
                }
            }
        }

        let Some(nl) = inbuf.iter().position(|&b| b == b'\n') else {
            if inbuf.len() > limits.line_max {
                *discarding = true;
                continue;
            }
            break;
        };

        if nl >= limits.line_max {
            inbuf.drain(..=nl);
            events.push(FramerEvent::TooLong);
            continue;
        }

        let raw: Vec<u8> = inbuf.drain(..=nl).collect();
        let mut end = raw.len() - 1; // drop '\n'
        if end > 0 && raw[end - 1] == b'\r' {
            end -= 1;
        }
        match std::str::from_utf8(&raw[..end]) {
            Ok(line) if !line.is_empty() => events.push(FramerEvent::Line(line.to_string())),
            Ok(_) => {}
            Err(_) => events.push(FramerEvent::Invalid),
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> LimitsConfig {
        LimitsConfig::default()
    }

    #[test]
    fn extracts_single_crlf_line() {
        let mut inbuf = b"NICK alice\r\n".to_vec();
        let mut discarding = false;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits());
        assert_eq!(events, vec![FramerEvent::Line("NICK alice".to_string())]);
        assert!(inbuf.is_empty());
    }

    #[test]
    fn accepts_bare_lf_as_terminator() {
        let mut inbuf = b"PING :tok\n".to_vec();
        let mut discarding = false;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits());
        assert_eq!(events, vec![FramerEvent::Line("PING :tok".to_string())]);
    }

    #[test]
    fn leaves_partial_line_buffered() {
        let mut inbuf = b"NICK al".to_vec();
        let mut discarding = false;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits());
        assert!(events.is_empty());
        assert_eq!(inbuf, b"NICK al");
    }

    #[test]
    fn extracts_multiple_lines_in_one_pass() {
        let mut inbuf = b"NICK a\r\nUSER a 0 * :A\r\n".to_vec();
        let mut discarding = false;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits());
        assert_eq!(
            events,
            vec![
                FramerEvent::Line("NICK a".to_string()),
                FramerEvent::Line("USER a 0 * :A".to_string()),
            ]
        );
    }

    #[test]
    fn empty_lines_are_silently_ignored() {
        let mut inbuf = b"\r\nNICK a\r\n".to_vec();
        let mut discarding = false;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits());
        assert_eq!(events, vec![FramerEvent::Line("NICK a".to_string())]);
    }

    #[test]
    fn oversized_line_triggers_discard_then_recovers() {
        let mut limits = limits();
        limits.line_max = 16;
        let mut inbuf = b"NICK reallylongnamethatoverflows\r\nPING :x\r\n".to_vec();
        let mut discarding = false;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits);
        assert_eq!(
            events,
            vec![FramerEvent::TooLong, FramerEvent::Line("PING :x".to_string())]
        );
        assert!(!discarding);
    }

    #[test]
    fn accumulating_past_line_max_without_terminator_enters_discard_state() {
        let mut limits = limits();
        limits.line_max = 8;
        let mut inbuf = b"123456789".to_vec(); // 9 bytes, no terminator yet
        let mut discarding = false;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits);
        assert!(events.is_empty());
        assert!(discarding);
    }

    #[test]
    fn inbuf_hard_cap_drops_buffer_while_discarding_without_terminator() {
        let mut limits = limits();
        limits.line_max = 4;
        limits.inbuf_cap = 8;
        let mut inbuf = b"123456789".to_vec();
        let mut discarding = true;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits);
        assert!(events.is_empty());
        assert!(inbuf.is_empty());
    }

    #[test]
    fn invalid_utf8_line_reported() {
        let mut inbuf = vec![b'N', b'I', 0xff, b'\r', b'\n'];
        let mut discarding = false;
        let events = extract_lines(&mut inbuf, &mut discarding, &limits());
        assert_eq!(events, vec![FramerEvent::Invalid]);
    }
}
