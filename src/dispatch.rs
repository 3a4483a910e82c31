//! Command dispatch (spec §4.4): one parse, one registration check,
//! one match on the upper-cased command. Handlers live under
//! `handlers/` — one module per command family.

use ircd_proto::{parse_line, rpl, Message, ParseError};

use crate::clock::Clock;
use crate::handlers;
use crate::registry::ClientId;
use crate::server::Server;

const PRE_REGISTRATION_ALLOWED: &[&str] = &["PASS", "NICK", "USER", "CAP", "QUIT", "PING", "PONG"];

pub fn dispatch_line<C: Clock>(srv: &mut Server<C>, sender: ClientId, line: &str) {
    let message = match parse_line(line) {
        Ok(message) => message,
        Err(ParseError::Empty) => return,
        Err(ParseError::MissingCommand) | Err(ParseError::InvalidCommand) => {
            srv.reply(sender, rpl::ERR_UNKNOWNCOMMAND, &["*"], "Unknown command");
            return;
        }
        Err(ParseError::TooManyParams) => {
            srv.reply(sender, rpl::ERR_NEEDMOREPARAMS, &["*"], "Too many parameters");
            return;
        }
    };
    dispatch_message(srv, sender, &message);
}

pub fn dispatch_message<C: Clock>(srv: &mut Server<C>, sender: ClientId, message: &Message) {
    let registered = srv.clients.get(sender).map(|c| c.is_registered()).unwrap_or(false);
    if !registered && !PRE_REGISTRATION_ALLOWED.contains(&message.command.as_str()) {
        srv.reply(sender, rpl::ERR_NOTREGISTERED, &[], "You have not registered");
        return;
    }

    match message.command.as_str() {
        "PASS" => handlers::registration::handle_pass(srv, sender, message),
        "NICK" => handlers::registration::handle_nick(srv, sender, message),
        "USER" => handlers::registration::handle_user(srv, sender, message),
        "CAP" => handlers::registration::handle_cap(srv, sender, message),

        "PING" => handlers::misc::handle_ping(srv, sender, message),
        "PONG" => handlers::misc::handle_pong(srv, sender, message),
        "QUIT" => handlers::misc::handle_quit(srv, sender, message),
        "MOTD" => handlers::misc::handle_motd(srv, sender),

        "JOIN" => handlers::channels::handle_join(srv, sender, message),
        "PART" => handlers::channels::handle_part(srv, sender, message),
        "TOPIC" => handlers::channels::handle_topic(srv, sender, message),
        "MODE" => handlers::channels::handle_mode(srv, sender, message),
        "KICK" => handlers::channels::handle_kick(srv, sender, message),
        "INVITE" => handlers::channels::handle_invite(srv, sender, message),
        "NAMES" => handlers::channels::handle_names(srv, sender, message),
        "LIST" => handlers::channels::handle_list(srv, sender, message),

        "PRIVMSG" => handlers::messages::handle_privmsg(srv, sender, message),
        "NOTICE" => handlers::messages::handle_notice(srv, sender, message),

        other => {
            srv.reply(sender, rpl::ERR_UNKNOWNCOMMAND, &[other], "Unknown command");
        }
    }
}
