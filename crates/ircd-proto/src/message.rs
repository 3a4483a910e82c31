//! Generic `{prefix, command, params[]}` line parser (spec grammar in
//! §4.3): one parser for every command rather than a combinator per
//! command, since the shape is uniform and dispatch handles the rest.

use thiserror::Error;

/// Hard cap on a complete line, terminator included.
pub const MAX_LINE: usize = 512;
/// At most this many parameters, trailing parameter included.
pub const MAX_PARAMS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("missing command")]
    MissingCommand,
    #[error("command token is neither letters nor three digits")]
    InvalidCommand,
    #[error("more than {MAX_PARAMS} parameters")]
    TooManyParams,
}

fn is_command_letters(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic())
}

fn is_command_numeric(s: &str) -> bool {
    s.len() == 3 && s.chars().all(|c| c.is_ascii_digit())
}

/// Parses a single line with the `\r\n`/`\n` terminator already stripped
/// by the framer. Tokenization collapses runs of spaces between
/// parameters, per spec.
pub fn parse_line(line: &str) -> Result<Message, ParseError> {
    if line.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut rest = line;

    let prefix = if let Some(stripped) = rest.strip_prefix(':') {
        let (prefix, after) = match stripped.find(' ') {
            Some(idx) => (&stripped[..idx], &stripped[idx + 1..]),
            None => (stripped, ""),
        };
        rest = after.trim_start_matches(' ');
        Some(prefix.to_string())
    } else {
        None
    };

    let command_end = rest.find(' ').unwrap_or(rest.len());
    let command = &rest[..command_end];
    if command.is_empty() {
        return Err(ParseError::MissingCommand);
    }
    if !(is_command_letters(command) || is_command_numeric(command)) {
        return Err(ParseError::InvalidCommand);
    }
    rest = rest[command_end..].trim_start_matches(' ');

    let mut params = Vec::new();
    while !rest.is_empty() {
        if params.len() >= MAX_PARAMS {
            return Err(ParseError::TooManyParams);
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing.to_string());
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(rest[..end].to_string());
        rest = rest[end..].trim_start_matches(' ');
    }

    Ok(Message {
        prefix,
        command: command.to_ascii_uppercase(),
        params,
    })
}

impl Message {
    pub fn new(command: impl Into<String>, params: Vec<String>) -> Self {
        Message {
            prefix: None,
            command: command.into(),
            params,
        }
    }

    /// Renders back to wire format, without the terminator. The last
    /// parameter gets a `:` prefix only when it needs one (empty,
    /// contains a space, or already starts with `:`), mirroring what a
    /// real client would send and keeping parse(serialize(m)) == m.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        if let Some(prefix) = &self.prefix {
            out.push(':');
            out.push_str(prefix);
            out.push(' ');
        }
        out.push_str(&self.command);
        if let Some((last, rest)) = self.params.split_last() {
            for p in rest {
                out.push(' ');
                out.push_str(p);
            }
            out.push(' ');
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                out.push(':');
            }
            out.push_str(last);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_command() {
        let m = parse_line("NICK alice").unwrap();
        assert_eq!(m.command, "NICK");
        assert_eq!(m.params, vec!["alice"]);
        assert!(m.prefix.is_none());
    }

    #[test]
    fn parses_trailing_param() {
        let m = parse_line("PRIVMSG #chan :hello there world").unwrap();
        assert_eq!(m.command, "PRIVMSG");
        assert_eq!(m.params, vec!["#chan", "hello there world"]);
    }

    #[test]
    fn parses_prefix() {
        let m = parse_line(":alice!alice@host QUIT :bye").unwrap();
        assert_eq!(m.prefix.as_deref(), Some("alice!alice@host"));
        assert_eq!(m.command, "QUIT");
        assert_eq!(m.params, vec!["bye"]);
    }

    #[test]
    fn folds_command_case() {
        let m = parse_line("nick alice").unwrap();
        assert_eq!(m.command, "NICK");
    }

    #[test]
    fn collapses_runs_of_spaces() {
        let m = parse_line("JOIN   #chan   key").unwrap();
        assert_eq!(m.params, vec!["#chan", "key"]);
    }

    #[test]
    fn numeric_command_token_accepted() {
        assert!(parse_line("001 nick :welcome").is_ok());
    }

    #[test]
    fn rejects_non_letter_non_numeric_command() {
        assert_eq!(parse_line("NI3K alice"), Err(ParseError::InvalidCommand));
    }

    #[test]
    fn rejects_empty_line() {
        assert_eq!(parse_line(""), Err(ParseError::Empty));
    }

    #[test]
    fn rejects_too_many_params() {
        let many = (0..16).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let line = format!("PRIVMSG {many}");
        assert_eq!(parse_line(&line), Err(ParseError::TooManyParams));
    }

    #[test]
    fn empty_trailing_param_is_allowed() {
        let m = parse_line("TOPIC #chan :").unwrap();
        assert_eq!(m.params, vec!["#chan", ""]);
    }

    #[test]
    fn parse_serialize_roundtrip() {
        let original = Message::new("PRIVMSG", vec!["#chan".into(), "hello there".into()]);
        let wire = original.serialize();
        let reparsed = parse_line(&wire).unwrap();
        assert_eq!(reparsed.command, original.command);
        assert_eq!(reparsed.params, original.params);
    }
}
