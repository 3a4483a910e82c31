//! PING/PONG, QUIT and MOTD (spec §4.4).

use ircd_proto::{rpl, Message};

use crate::clock::Clock;
use crate::registry::ClientId;
use crate::server::Server;

pub fn handle_ping<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let Some(token) = msg.params.first() else {
        srv.reply(id, rpl::ERR_NOORIGIN, &[], "No origin specified");
        return;
    };
    let server_name = srv.server_name.clone();
    srv.queue_line(id, &format!(":{server_name} PONG {server_name} :{token}"));
}

pub fn handle_pong<C: Clock>(srv: &mut Server<C>, id: ClientId, _msg: &Message) {
    let now = srv.now();
    if let Some(client) = srv.clients.get_mut(id) {
        client.touch_liveness(now);
    }
}

pub fn handle_quit<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let reason = msg.params.first().cloned().unwrap_or_else(|| "Client Quit".to_string());
    srv.close_after_flush(id, &reason);
}

pub fn handle_motd<C: Clock>(srv: &mut Server<C>, id: ClientId) {
    send_motd(srv, id);
}

pub fn send_motd<C: Clock>(srv: &mut Server<C>, id: ClientId) {
    if srv.config.server.motd.is_empty() {
        srv.reply(id, rpl::ERR_NOMOTD, &[], "MOTD File is missing");
        return;
    }
    let server_name = srv.server_name.clone();
    srv.reply(id, rpl::RPL_MOTDSTART, &[], &format!("- {server_name} Message of the day -"));
    let lines = srv.config.server.motd.clone();
    for line in &lines {
        srv.reply(id, rpl::RPL_MOTD, &[], &format!("- {line}"));
    }
    srv.reply(id, rpl::RPL_ENDOFMOTD, &[], "End of MOTD command");
}
