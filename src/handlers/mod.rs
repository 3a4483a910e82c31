//! One module per command family (spec §4.4's handler table), plus the
//! small broadcast helpers they all share.

pub mod channels;
pub mod messages;
pub mod misc;
pub mod registration;

use std::collections::HashSet;

use crate::clock::Clock;
use crate::registry::ClientId;
use crate::server::Server;

/// Sends `line` to every current member of `channel_name`, optionally
/// excluding one client (PRIVMSG/NOTICE exclude the sender; JOIN/PART/
/// KICK/MODE/TOPIC echoes do not).
pub(crate) fn broadcast_to_channel<C: Clock>(
    srv: &mut Server<C>,
    channel_name: &str,
    exclude: Option<ClientId>,
    line: &str,
) {
    let recipients: Vec<ClientId> = match srv.channels.get(channel_name) {
        Some(channel) => channel
            .members
            .keys()
            .copied()
            .filter(|&id| Some(id) != exclude)
            .collect(),
        None => return,
    };
    for id in recipients {
        srv.queue_line(id, line);
    }
}

/// Sends `line` to `sender` plus every distinct member across all
/// channels `sender` belongs to, deduplicated (used for the NICK echo,
/// which spec says goes "to self and all channels the user is in").
pub(crate) fn broadcast_to_self_and_channels<C: Clock>(srv: &mut Server<C>, sender: ClientId, line: &str) {
    let mut recipients: HashSet<ClientId> = HashSet::new();
    recipients.insert(sender);
    if let Some(client) = srv.clients.get(sender) {
        for chan_name in client.channels.iter() {
            if let Some(channel) = srv.channels.get(chan_name) {
                recipients.extend(channel.members.keys().copied());
            }
        }
    }
    for id in recipients {
        srv.queue_line(id, line);
    }
}
