//! PRIVMSG/NOTICE (spec §4.4): target is either a nick or a channel
//! name, resolved independently per comma-separated target.

use ircd_proto::{rpl, Message};

use crate::clock::Clock;
use crate::registry::ClientId;
use crate::server::Server;

pub fn handle_privmsg<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    dispatch_message(srv, id, msg, true);
}

pub fn handle_notice<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    dispatch_message(srv, id, msg, false);
}

/// NOTICE must never generate an automatic reply, even on error
/// (that's the entire point of the command), so `is_privmsg` gates
/// every error reply in here.
fn dispatch_message<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message, is_privmsg: bool) {
    let Some(targets) = msg.params.first().cloned() else {
        if is_privmsg {
            srv.reply(id, rpl::ERR_NORECIPIENT, &[], "No recipient given");
        }
        return;
    };
    let Some(text) = msg.params.get(1).cloned() else {
        if is_privmsg {
            srv.reply(id, rpl::ERR_NOTEXTTOSEND, &[], "No text to send");
        }
        return;
    };

    for target in targets.split(',') {
        if target.starts_with('#') || target.starts_with('&') {
            send_to_channel(srv, id, target, &text, is_privmsg);
        } else {
            send_to_nick(srv, id, target, &text, is_privmsg);
        }
    }
}

fn send_to_channel<C: Clock>(srv: &mut Server<C>, id: ClientId, channel_name: &str, text: &str, is_privmsg: bool) {
    let Some(channel) = srv.channels.get(channel_name) else {
        if is_privmsg {
            srv.reply(id, rpl::ERR_NOSUCHCHANNEL, &[channel_name], "No such channel");
        }
        return;
    };

    let is_member = channel.is_member(id);
    if channel.modes.no_external_messages && !is_member {
        if is_privmsg {
            srv.reply(id, rpl::ERR_CANNOTSENDTOCHAN, &[channel_name], "Cannot send to channel");
        }
        return;
    }
    if channel.modes.moderated && !channel.is_operator(id) {
        if is_privmsg {
            srv.reply(id, rpl::ERR_CANNOTSENDTOCHAN, &[channel_name], "Cannot send to channel");
        }
        return;
    }

    let command = if is_privmsg { "PRIVMSG" } else { "NOTICE" };
    let prefix = srv.clients.get(id).map(|c| c.prefix()).unwrap_or_default();
    let line = format!(":{prefix} {command} {channel_name} :{text}");
    super::broadcast_to_channel(srv, channel_name, Some(id), &line);
}

fn send_to_nick<C: Clock>(srv: &mut Server<C>, id: ClientId, nick: &str, text: &str, is_privmsg: bool) {
    let Some(target_id) = srv.clients.find_by_nick(nick) else {
        if is_privmsg {
            srv.reply(id, rpl::ERR_NOSUCHNICK, &[nick], "No such nick");
        }
        return;
    };

    let command = if is_privmsg { "PRIVMSG" } else { "NOTICE" };
    let prefix = srv.clients.get(id).map(|c| c.prefix()).unwrap_or_default();
    let line = format!(":{prefix} {command} {nick} :{text}");
    srv.queue_line(target_id, &line);
}
