//! PASS/NICK/USER/CAP and the registration state machine (spec §4.4).

use ircd_proto::{rpl, validate, Message};

use crate::client::RegistrationState;
use crate::clock::Clock;
use crate::handlers::broadcast_to_self_and_channels;
use crate::registry::ClientId;
use crate::server::Server;

pub fn handle_pass<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    if srv.clients.get(id).map(|c| c.state) != Some(RegistrationState::AwaitingPass) {
        srv.reply(id, rpl::ERR_ALREADYREGISTERED, &[], "You may not reregister");
        return;
    }
    let Some(given) = msg.params.first() else {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["PASS"], "Not enough parameters");
        return;
    };

    let ok = match &srv.config.network.password {
        Some(expected) => given == expected,
        None => true,
    };
    if !ok {
        srv.reply(id, rpl::ERR_PASSWDMISMATCH, &[], "Password incorrect");
        srv.close_after_flush(id, "Password incorrect");
        return;
    }
    if let Some(client) = srv.clients.get_mut(id) {
        client.password_ok = true;
        client.state = RegistrationState::AwaitingNickUser;
    }
    // NICK/USER are pre-registration-allowed too, so a client may have
    // sent either or both before PASS; recheck readiness now that the
    // state has advanced instead of waiting for a NICK/USER that may
    // never come again.
    maybe_complete_registration(srv, id);
}

pub fn handle_nick<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let Some(new_nick) = msg.params.first() else {
        srv.reply(id, rpl::ERR_NONICKNAMEGIVEN, &[], "No nickname given");
        return;
    };

    if !validate::nick_is_valid(new_nick) {
        srv.reply(id, rpl::ERR_ERRONEUSNICKNAME, &[new_nick.as_str()], "Erroneous nickname");
        return;
    }
    if srv
        .clients
        .find_by_nick(new_nick)
        .map(|existing| existing != id)
        .unwrap_or(false)
    {
        srv.reply(
            id,
            rpl::ERR_NICKNAMEINUSE,
            &[new_nick.as_str()],
            "Nickname is already in use",
        );
        return;
    }

    maybe_promote_from_awaiting_pass(srv, id);

    let was_registered = srv.clients.get(id).map(|c| c.is_registered()).unwrap_or(false);
    let old_prefix = srv.clients.get(id).map(|c| c.prefix());

    srv.clients.set_nick(id, new_nick);

    if was_registered {
        if let Some(old_prefix) = old_prefix {
            let line = format!(":{old_prefix} NICK :{new_nick}");
            broadcast_to_self_and_channels(srv, id, &line);
        }
    } else {
        maybe_complete_registration(srv, id);
    }
}

pub fn handle_user<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    if srv.clients.get(id).map(|c| c.is_registered()).unwrap_or(false) {
        srv.reply(id, rpl::ERR_ALREADYREGISTERED, &[], "You may not reregister");
        return;
    }
    if msg.params.len() < 4 {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["USER"], "Not enough parameters");
        return;
    }

    maybe_promote_from_awaiting_pass(srv, id);

    let user = msg.params[0].clone();
    let realname = msg.params[3].clone();
    if let Some(client) = srv.clients.get_mut(id) {
        client.user = user;
        client.realname = realname;
    }

    maybe_complete_registration(srv, id);
}

pub fn handle_cap<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let subcommand = msg.params.first().map(|s| s.to_ascii_uppercase()).unwrap_or_default();
    match subcommand.as_str() {
        "LS" => {
            if let Some(client) = srv.clients.get_mut(id) {
                client.cap_negotiating = true;
            }
            srv.queue_line(id, &format!(":{} CAP * LS :", srv.server_name));
        }
        "LIST" => {
            srv.queue_line(id, &format!(":{} CAP * LIST :", srv.server_name));
        }
        "REQ" => {
            srv.queue_line(id, &format!(":{} CAP * NAK :", srv.server_name));
        }
        "END" => {
            if let Some(client) = srv.clients.get_mut(id) {
                client.cap_negotiating = false;
            }
            maybe_complete_registration(srv, id);
        }
        _ => {}
    }
}

fn maybe_promote_from_awaiting_pass<C: Clock>(srv: &mut Server<C>, id: ClientId) {
    let should_promote = srv
        .clients
        .get(id)
        .map(|c| c.state == RegistrationState::AwaitingPass && srv.config.network.password.is_none())
        .unwrap_or(false);
    if should_promote {
        if let Some(client) = srv.clients.get_mut(id) {
            client.state = RegistrationState::AwaitingNickUser;
        }
    }
}

fn maybe_complete_registration<C: Clock>(srv: &mut Server<C>, id: ClientId) {
    let ready = srv
        .clients
        .get(id)
        .map(|c| {
            c.state == RegistrationState::AwaitingNickUser
                && !c.nick.is_empty()
                && !c.user.is_empty()
                && !c.cap_negotiating
        })
        .unwrap_or(false);
    if !ready {
        return;
    }

    if let Some(client) = srv.clients.get_mut(id) {
        client.state = RegistrationState::Registered;
    }
    send_welcome_burst(srv, id);
}

fn send_welcome_burst<C: Clock>(srv: &mut Server<C>, id: ClientId) {
    let nick = srv.clients.get(id).map(|c| c.nick.clone()).unwrap_or_default();
    let server_name = srv.server_name.clone();

    srv.reply(
        id,
        rpl::RPL_WELCOME,
        &[],
        &format!("Welcome to the Internet Relay Network {nick}"),
    );
    srv.reply(
        id,
        rpl::RPL_YOURHOST,
        &[],
        &format!("Your host is {server_name}, running version 1.0"),
    );
    srv.reply(id, rpl::RPL_CREATED, &[], "This server was started recently");
    srv.reply_no_trailing(id, rpl::RPL_MYINFO, &[&server_name, "1.0", "o", "itmnlko"]);

    super::misc::send_motd(srv, id);
}
