//! Channel mode string grammar (`+i-k secretkey`-style tokens). The
//! handler owns validating operator privilege and applying the result
//! to a `Channel`; this module only turns the wire form into structured
//! operations and reports which flags needed an argument they didn't get.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeFlag {
    InviteOnly,
    TopicLocked,
    Moderated,
    NoExternalMessages,
    Key(String),
    UserLimit(usize),
    Operator(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeOp {
    Set(ModeFlag),
    Unset(ModeFlag),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModeParseError {
    MissingArgument(char),
    UnknownFlag(char),
}

/// Parses a modestring (e.g. `+o-l`) against its trailing arguments,
/// consuming one argument per flag that takes one in the direction
/// applied (`+k`, `+l`, `+o`/`-o`), left to right.
pub fn parse_mode_string(modestring: &str, args: &[String]) -> Result<Vec<ModeOp>, ModeParseError> {
    let mut ops = Vec::new();
    let mut adding = true;
    let mut args = args.iter();

    for c in modestring.chars() {
        match c {
            '+' => adding = true,
            '-' => adding = false,
            'i' => ops.push(toggle(adding, ModeFlag::InviteOnly)),
            't' => ops.push(toggle(adding, ModeFlag::TopicLocked)),
            'm' => ops.push(toggle(adding, ModeFlag::Moderated)),
            'n' => ops.push(toggle(adding, ModeFlag::NoExternalMessages)),
            'k' => {
                if adding {
                    let key = args.next().ok_or(ModeParseError::MissingArgument('k'))?;
                    ops.push(ModeOp::Set(ModeFlag::Key(key.clone())));
                } else {
                    ops.push(ModeOp::Unset(ModeFlag::Key(String::new())));
                }
            }
            'l' => {
                if adding {
                    let raw = args.next().ok_or(ModeParseError::MissingArgument('l'))?;
                    let limit: usize = raw.parse().map_err(|_| ModeParseError::MissingArgument('l'))?;
                    ops.push(ModeOp::Set(ModeFlag::UserLimit(limit)));
                } else {
                    ops.push(ModeOp::Unset(ModeFlag::UserLimit(0)));
                }
            }
            'o' => {
                let nick = args.next().ok_or(ModeParseError::MissingArgument('o'))?;
                ops.push(toggle(adding, ModeFlag::Operator(nick.clone())));
            }
            other => return Err(ModeParseError::UnknownFlag(other)),
        }
    }

    Ok(ops)
}

fn toggle(adding: bool, flag: ModeFlag) -> ModeOp {
    if adding {
        ModeOp::Set(flag)
    } else {
        ModeOp::Unset(flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_toggle() {
        let ops = parse_mode_string("+i", &[]).unwrap();
        assert_eq!(ops, vec![ModeOp::Set(ModeFlag::InviteOnly)]);
    }

    #[test]
    fn parses_mixed_add_remove() {
        let ops = parse_mode_string("+t-i", &[]).unwrap();
        assert_eq!(
            ops,
            vec![ModeOp::Set(ModeFlag::TopicLocked), ModeOp::Unset(ModeFlag::InviteOnly)]
        );
    }

    #[test]
    fn key_consumes_arg_only_on_set() {
        let ops = parse_mode_string("+k", &["secret".into()]).unwrap();
        assert_eq!(ops, vec![ModeOp::Set(ModeFlag::Key("secret".into()))]);

        let ops = parse_mode_string("-k", &[]).unwrap();
        assert_eq!(ops, vec![ModeOp::Unset(ModeFlag::Key(String::new()))]);
    }

    #[test]
    fn limit_consumes_arg_only_on_set() {
        let ops = parse_mode_string("+l", &["5".into()]).unwrap();
        assert_eq!(ops, vec![ModeOp::Set(ModeFlag::UserLimit(5))]);

        let ops = parse_mode_string("-l", &[]).unwrap();
        assert_eq!(ops, vec![ModeOp::Unset(ModeFlag::UserLimit(0))]);
    }

    #[test]
    fn operator_always_needs_nick_arg() {
        let ops = parse_mode_string("+o", &["bob".into()]).unwrap();
        assert_eq!(ops, vec![ModeOp::Set(ModeFlag::Operator("bob".into()))]);

        let ops = parse_mode_string("-o", &["bob".into()]).unwrap();
        assert_eq!(ops, vec![ModeOp::Unset(ModeFlag::Operator("bob".into()))]);
    }

    #[test]
    fn missing_argument_is_reported() {
        assert_eq!(parse_mode_string("+k", &[]), Err(ModeParseError::MissingArgument('k')));
        assert_eq!(parse_mode_string("+o", &[]), Err(ModeParseError::MissingArgument('o')));
    }

    #[test]
    fn unknown_flag_is_reported() {
        assert_eq!(parse_mode_string("+z", &[]), Err(ModeParseError::UnknownFlag('z')));
    }
}
