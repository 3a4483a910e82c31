//! Nick and channel name grammar, in the nom combinator style the rest
//! of this crate's grammar follows (see `message.rs`).

use nom::bytes::complete::take_while;
use nom::character::complete::satisfy;
use nom::combinator::{all_consuming, recognize};
use nom::multi::many0;
use nom::sequence::pair;
use nom::IResult;

const MAX_NICK_LEN: usize = 9;
const MAX_CHANNEL_LEN: usize = 50;

fn is_nick_special(c: char) -> bool {
    matches!(c, '[' | ']' | '\\' | '{' | '}' | '^' | '_' | '|' | '`')
}

fn nick_head(c: char) -> bool {
    c.is_ascii_alphabetic() || is_nick_special(c)
}

fn nick_tail(c: char) -> bool {
    c.is_ascii_alphanumeric() || is_nick_special(c) || c == '-'
}

fn nickname(input: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(nick_head), many0(satisfy(nick_tail))))(input)
}

/// Validates a candidate nick per spec: first char a letter or one of
/// `` `[]\{}^_| ``, remaining letters/digits/`` `-[]\{}^_| ``, length <= 9.
pub fn nick_is_valid(s: &str) -> bool {
    if s.is_empty() || s.chars().count() > MAX_NICK_LEN {
        return false;
    }
    all_consuming(nickname)(s).is_ok()
}

fn channel_char(c: char) -> bool {
    !c.is_ascii_control() && c != ' ' && c != ',' && c != ':'
}

fn channel_body(input: &str) -> IResult<&str, &str> {
    take_while(channel_char)(input)
}

/// Validates a candidate channel name: begins with `#` or `&`, 1-50
/// characters total excluding space, comma, control bytes and `:`.
pub fn channel_is_valid(s: &str) -> bool {
    if s.is_empty() || s.chars().count() > MAX_CHANNEL_LEN {
        return false;
    }
    let Some(rest) = s.strip_prefix('#').or_else(|| s.strip_prefix('&')) else {
        return false;
    };
    if rest.is_empty() {
        return false;
    }
    matches!(all_consuming(channel_body)(rest), Ok((_, body)) if body.len() == rest.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_nick() {
        assert!(nick_is_valid("alice"));
        assert!(nick_is_valid("Bob_"));
    }

    #[test]
    fn accepts_special_char_nick() {
        assert!(nick_is_valid("[alice]"));
        assert!(nick_is_valid("a-b-c"));
    }

    #[test]
    fn rejects_digit_leading_nick() {
        assert!(!nick_is_valid("1alice"));
    }

    #[test]
    fn rejects_overlong_nick() {
        assert!(!nick_is_valid("abcdefghij"));
    }

    #[test]
    fn rejects_empty_nick() {
        assert!(!nick_is_valid(""));
    }

    #[test]
    fn accepts_hash_and_amp_channels() {
        assert!(channel_is_valid("#general"));
        assert!(channel_is_valid("&local"));
    }

    #[test]
    fn rejects_channel_without_sigil() {
        assert!(!channel_is_valid("general"));
    }

    #[test]
    fn rejects_channel_with_space_comma_or_colon() {
        assert!(!channel_is_valid("#a b"));
        assert!(!channel_is_valid("#a,b"));
        assert!(!channel_is_valid("#a:b"));
    }

    #[test]
    fn rejects_overlong_channel() {
        let name = format!("#{}", "x".repeat(50));
        assert!(!channel_is_valid(&name));
    }
}
