//! JOIN/PART/TOPIC/MODE/KICK/INVITE plus the supplemental standalone
//! NAMES/LIST (spec §4.4, SPEC_FULL supplemental features).

use ircd_proto::mode::{self, ModeFlag, ModeOp, ModeParseError};
use ircd_proto::{casefold, rpl, validate, Message};

use crate::channel::ChannelModes;
use crate::clock::Clock;
use crate::registry::ClientId;
use crate::server::Server;

const MAX_CHANNELS_PER_CLIENT: usize = 20;

pub fn handle_join<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let Some(chan_list) = msg.params.first() else {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["JOIN"], "Not enough parameters");
        return;
    };
    let channel_names: Vec<&str> = chan_list.split(',').collect();
    let keys: Vec<&str> = msg.params.get(1).map(|k| k.split(',').collect()).unwrap_or_default();
    if !keys.is_empty() && keys.len() != channel_names.len() {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["JOIN"], "Not enough parameters");
        return;
    }

    for (i, &name) in channel_names.iter().enumerate() {
        let key = keys.get(i).copied();
        join_one_channel(srv, id, name, key);
    }
}

fn join_one_channel<C: Clock>(srv: &mut Server<C>, id: ClientId, name: &str, key: Option<&str>) {
    if !validate::channel_is_valid(name) {
        srv.reply(id, rpl::ERR_NOSUCHCHANNEL, &[name], "No such channel");
        return;
    }
    let casefolded = casefold(name);
    if srv.clients.get(id).map(|c| c.channels.contains(&casefolded)).unwrap_or(false) {
        return;
    }
    if srv
        .clients
        .get(id)
        .map(|c| c.channels.len() >= MAX_CHANNELS_PER_CLIENT)
        .unwrap_or(false)
    {
        srv.reply(id, rpl::ERR_TOOMANYCHANNELS, &[name], "You have joined too many channels");
        return;
    }

    let exists = srv.channels.get(name).is_some();
    if exists {
        let already_invited = srv.channels.get(name).map(|c| c.invited.contains(&id)).unwrap_or(false);
        let invite_only = srv.channels.get(name).map(|c| c.modes.invite_only).unwrap_or(false);
        if invite_only && !already_invited {
            srv.reply(id, rpl::ERR_INVITEONLYCHAN, &[name], "Cannot join channel (+i)");
            return;
        }

        let key_ok = match srv.channels.get(name).and_then(|c| c.modes.key.clone()) {
            Some(expected) => key == Some(expected.as_str()),
            None => true,
        };
        if !key_ok {
            srv.reply(id, rpl::ERR_BADCHANNELKEY, &[name], "Cannot join channel (+k)");
            return;
        }

        let full = srv.channels.get(name).map(|c| c.is_full()).unwrap_or(false);
        if full {
            srv.reply(id, rpl::ERR_CHANNELISFULL, &[name], "Cannot join channel (+l)");
            return;
        }

        if let Some(channel) = srv.channels.get_mut(name) {
            channel.members.insert(id, false);
            channel.invited.remove(&id);
        }
    } else {
        srv.channels.get_or_create(name, id);
    }

    if let Some(client) = srv.clients.get_mut(id) {
        client.channels.insert(casefolded);
    }

    let prefix = srv.clients.get(id).map(|c| c.prefix()).unwrap_or_default();
    let join_line = format!(":{prefix} JOIN :{name}");
    super::broadcast_to_channel(srv, name, None, &join_line);

    send_topic_reply(srv, id, name);
    send_names_reply(srv, id, name);
}

pub fn handle_part<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let Some(chan_list) = msg.params.first().cloned() else {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["PART"], "Not enough parameters");
        return;
    };
    let reason = msg.params.get(1).cloned();
    for name in chan_list.split(',') {
        part_one_channel(srv, id, name, reason.as_deref());
    }
}

fn part_one_channel<C: Clock>(srv: &mut Server<C>, id: ClientId, name: &str, reason: Option<&str>) {
    if srv.channels.get(name).is_none() {
        srv.reply(id, rpl::ERR_NOSUCHCHANNEL, &[name], "No such channel");
        return;
    }
    if !srv.channels.get(name).map(|c| c.is_member(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_NOTONCHANNEL, &[name], "You're not on that channel");
        return;
    }

    let prefix = srv.clients.get(id).map(|c| c.prefix()).unwrap_or_default();
    let line = match reason {
        Some(reason) => format!(":{prefix} PART {name} :{reason}"),
        None => format!(":{prefix} PART {name}"),
    };
    super::broadcast_to_channel(srv, name, None, &line);

    if let Some(channel) = srv.channels.get_mut(name) {
        channel.members.remove(&id);
    }
    if let Some(client) = srv.clients.get_mut(id) {
        client.channels.remove(&casefold(name));
    }
    srv.channels.destroy_if_empty(name);
}

pub fn handle_topic<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let Some(name) = msg.params.first().cloned() else {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["TOPIC"], "Not enough parameters");
        return;
    };
    if srv.channels.get(&name).is_none() {
        srv.reply(id, rpl::ERR_NOSUCHCHANNEL, &[name.as_str()], "No such channel");
        return;
    }
    if !srv.channels.get(&name).map(|c| c.is_member(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_NOTONCHANNEL, &[name.as_str()], "You're not on that channel");
        return;
    }

    let Some(new_topic) = msg.params.get(1).cloned() else {
        send_topic_reply(srv, id, &name);
        return;
    };

    let locked = srv.channels.get(&name).map(|c| c.modes.topic_locked).unwrap_or(false);
    if locked && !srv.channels.get(&name).map(|c| c.is_operator(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_CHANOPRIVSNEEDED, &[name.as_str()], "You're not channel operator");
        return;
    }

    let now = srv.now();
    let nick = srv.clients.get(id).map(|c| c.nick.clone()).unwrap_or_default();
    if let Some(channel) = srv.channels.get_mut(&name) {
        channel.topic = new_topic.clone();
        channel.topic_set_by = Some(nick);
        channel.topic_set_at = Some(now);
    }

    let prefix = srv.clients.get(id).map(|c| c.prefix()).unwrap_or_default();
    let line = format!(":{prefix} TOPIC {name} :{new_topic}");
    super::broadcast_to_channel(srv, &name, None, &line);
}

pub fn handle_mode<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let Some(target) = msg.params.first().cloned() else {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["MODE"], "Not enough parameters");
        return;
    };

    if !(target.starts_with('#') || target.starts_with('&')) {
        handle_user_mode(srv, id, &target);
        return;
    }

    if srv.channels.get(&target).is_none() {
        srv.reply(id, rpl::ERR_NOSUCHCHANNEL, &[target.as_str()], "No such channel");
        return;
    }
    if !srv.channels.get(&target).map(|c| c.is_member(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_NOTONCHANNEL, &[target.as_str()], "You're not on that channel");
        return;
    }

    let Some(modestring) = msg.params.get(1).cloned() else {
        let mode_str = srv.channels.get(&target).map(|c| c.mode_string()).unwrap_or_default();
        srv.reply_no_trailing(id, rpl::RPL_CHANNELMODEIS, &[target.as_str(), &mode_str]);
        return;
    };

    if !srv.channels.get(&target).map(|c| c.is_operator(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_CHANOPRIVSNEEDED, &[target.as_str()], "You're not channel operator");
        return;
    }

    let args: Vec<String> = msg.params.iter().skip(2).cloned().collect();
    let ops = match mode::parse_mode_string(&modestring, &args) {
        Ok(ops) => ops,
        Err(ModeParseError::MissingArgument(_)) => {
            srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["MODE"], "Not enough parameters");
            return;
        }
        Err(ModeParseError::UnknownFlag(flag)) => {
            srv.reply(id, rpl::ERR_UNKNOWNMODE, &[flag.to_string().as_str()], "is unknown mode char to me");
            return;
        }
    };

    apply_mode_ops(srv, id, &target, ops);
}

fn handle_user_mode<C: Clock>(srv: &mut Server<C>, id: ClientId, target: &str) {
    let is_self = srv.clients.get(id).map(|c| c.nick.eq_ignore_ascii_case(target)).unwrap_or(false);
    if !is_self {
        srv.reply(id, rpl::ERR_NOSUCHNICK, &[target], "No such nick");
        return;
    }
    // No persistent user modes are modeled; the query always reports none set.
    srv.reply_no_trailing(id, rpl::RPL_UMODEIS, &["+"]);
}

fn apply_mode_ops<C: Clock>(srv: &mut Server<C>, id: ClientId, channel_name: &str, ops: Vec<ModeOp>) {
    let mut echo = Vec::new();

    for op in ops {
        match op {
            ModeOp::Set(ModeFlag::InviteOnly) => {
                set_modes(srv, channel_name, |m| m.invite_only = true);
                echo.push("+i".to_string());
            }
            ModeOp::Unset(ModeFlag::InviteOnly) => {
                set_modes(srv, channel_name, |m| m.invite_only = false);
                echo.push("-i".to_string());
            }
            ModeOp::Set(ModeFlag::TopicLocked) => {
                set_modes(srv, channel_name, |m| m.topic_locked = true);
                echo.push("+t".to_string());
            }
            ModeOp::Unset(ModeFlag::TopicLocked) => {
                set_modes(srv, channel_name, |m| m.topic_locked = false);
                echo.push("-t".to_string());
            }
            ModeOp::Set(ModeFlag::Moderated) => {
                set_modes(srv, channel_name, |m| m.moderated = true);
                echo.push("+m".to_string());
            }
            ModeOp::Unset(ModeFlag::Moderated) => {
                set_modes(srv, channel_name, |m| m.moderated = false);
                echo.push("-m".to_string());
            }
            ModeOp::Set(ModeFlag::NoExternalMessages) => {
                set_modes(srv, channel_name, |m| m.no_external_messages = true);
                echo.push("+n".to_string());
            }
            ModeOp::Unset(ModeFlag::NoExternalMessages) => {
                set_modes(srv, channel_name, |m| m.no_external_messages = false);
                echo.push("-n".to_string());
            }
            ModeOp::Set(ModeFlag::Key(key)) => {
                echo.push(format!("+k {key}"));
                set_modes(srv, channel_name, |m| m.key = Some(key));
            }
            ModeOp::Unset(ModeFlag::Key(_)) => {
                set_modes(srv, channel_name, |m| m.key = None);
                echo.push("-k".to_string());
            }
            ModeOp::Set(ModeFlag::UserLimit(limit)) => {
                echo.push(format!("+l {limit}"));
                set_modes(srv, channel_name, move |m| m.user_limit = Some(limit));
            }
            ModeOp::Unset(ModeFlag::UserLimit(_)) => {
                set_modes(srv, channel_name, |m| m.user_limit = None);
                echo.push("-l".to_string());
            }
            ModeOp::Set(ModeFlag::Operator(nick)) => {
                if grant_operator(srv, channel_name, &nick, true) {
                    echo.push(format!("+o {nick}"));
                } else {
                    srv.reply(id, rpl::ERR_USERNOTINCHANNEL, &[&nick, channel_name], "They aren't on that channel");
                }
            }
            ModeOp::Unset(ModeFlag::Operator(nick)) => {
                if grant_operator(srv, channel_name, &nick, false) {
                    echo.push(format!("-o {nick}"));
                } else {
                    srv.reply(id, rpl::ERR_USERNOTINCHANNEL, &[&nick, channel_name], "They aren't on that channel");
                }
            }
        }
    }

    if !echo.is_empty() {
        let prefix = srv.clients.get(id).map(|c| c.prefix()).unwrap_or_default();
        let line = format!(":{prefix} MODE {channel_name} {}", echo.join(" "));
        super::broadcast_to_channel(srv, channel_name, None, &line);
    }
}

fn set_modes<C: Clock>(srv: &mut Server<C>, channel_name: &str, f: impl FnOnce(&mut ChannelModes)) {
    if let Some(channel) = srv.channels.get_mut(channel_name) {
        f(&mut channel.modes);
    }
}

fn grant_operator<C: Clock>(srv: &mut Server<C>, channel_name: &str, nick: &str, grant: bool) -> bool {
    let Some(target_id) = srv.clients.find_by_nick(nick) else {
        return false;
    };
    match srv.channels.get_mut(channel_name) {
        Some(channel) if channel.members.contains_key(&target_id) => {
            channel.members.insert(target_id, grant);
            true
        }
        _ => false,
    }
}

pub fn handle_kick<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let (Some(channel_name), Some(target_nick)) = (msg.params.first().cloned(), msg.params.get(1).cloned()) else {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["KICK"], "Not enough parameters");
        return;
    };
    let reason = msg.params.get(2).cloned().unwrap_or_else(|| target_nick.clone());

    if srv.channels.get(&channel_name).is_none() {
        srv.reply(id, rpl::ERR_NOSUCHCHANNEL, &[channel_name.as_str()], "No such channel");
        return;
    }
    if !srv.channels.get(&channel_name).map(|c| c.is_member(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_NOTONCHANNEL, &[channel_name.as_str()], "You're not on that channel");
        return;
    }
    if !srv.channels.get(&channel_name).map(|c| c.is_operator(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_CHANOPRIVSNEEDED, &[channel_name.as_str()], "You're not channel operator");
        return;
    }

    let Some(target_id) = srv.clients.find_by_nick(&target_nick) else {
        srv.reply(
            id,
            rpl::ERR_USERNOTINCHANNEL,
            &[target_nick.as_str(), channel_name.as_str()],
            "They aren't on that channel",
        );
        return;
    };
    if !srv.channels.get(&channel_name).map(|c| c.is_member(target_id)).unwrap_or(false) {
        srv.reply(
            id,
            rpl::ERR_USERNOTINCHANNEL,
            &[target_nick.as_str(), channel_name.as_str()],
            "They aren't on that channel",
        );
        return;
    }

    let prefix = srv.clients.get(id).map(|c| c.prefix()).unwrap_or_default();
    let line = format!(":{prefix} KICK {channel_name} {target_nick} :{reason}");
    super::broadcast_to_channel(srv, &channel_name, None, &line);

    if let Some(channel) = srv.channels.get_mut(&channel_name) {
        channel.members.remove(&target_id);
    }
    if let Some(target_client) = srv.clients.get_mut(target_id) {
        target_client.channels.remove(&casefold(&channel_name));
    }
    srv.channels.destroy_if_empty(&channel_name);
}

pub fn handle_invite<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    let (Some(target_nick), Some(channel_name)) = (msg.params.first().cloned(), msg.params.get(1).cloned()) else {
        srv.reply(id, rpl::ERR_NEEDMOREPARAMS, &["INVITE"], "Not enough parameters");
        return;
    };

    let Some(target_id) = srv.clients.find_by_nick(&target_nick) else {
        srv.reply(id, rpl::ERR_NOSUCHNICK, &[target_nick.as_str()], "No such nick");
        return;
    };
    if srv.channels.get(&channel_name).is_none() {
        srv.reply(id, rpl::ERR_NOSUCHCHANNEL, &[channel_name.as_str()], "No such channel");
        return;
    }
    if !srv.channels.get(&channel_name).map(|c| c.is_member(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_NOTONCHANNEL, &[channel_name.as_str()], "You're not on that channel");
        return;
    }
    let invite_only = srv.channels.get(&channel_name).map(|c| c.modes.invite_only).unwrap_or(false);
    if invite_only && !srv.channels.get(&channel_name).map(|c| c.is_operator(id)).unwrap_or(false) {
        srv.reply(id, rpl::ERR_CHANOPRIVSNEEDED, &[channel_name.as_str()], "You're not channel operator");
        return;
    }
    if srv.channels.get(&channel_name).map(|c| c.is_member(target_id)).unwrap_or(false) {
        srv.reply(
            id,
            rpl::ERR_USERONCHANNEL,
            &[target_nick.as_str(), channel_name.as_str()],
            "is already on channel",
        );
        return;
    }

    if let Some(channel) = srv.channels.get_mut(&channel_name) {
        channel.invited.insert(target_id);
    }
    if let Some(target_client) = srv.clients.get_mut(target_id) {
        target_client.invited_to.insert(casefold(&channel_name));
    }

    srv.reply_no_trailing(id, rpl::RPL_INVITING, &[target_nick.as_str(), channel_name.as_str()]);

    let prefix = srv.clients.get(id).map(|c| c.prefix()).unwrap_or_default();
    srv.queue_line(target_id, &format!(":{prefix} INVITE {target_nick} :{channel_name}"));
}

pub fn handle_names<C: Clock>(srv: &mut Server<C>, id: ClientId, msg: &Message) {
    match msg.params.first().cloned() {
        Some(list) => {
            for name in list.split(',') {
                if srv.channels.get(name).is_some() {
                    send_names_reply(srv, id, name);
                }
            }
        }
        None => {
            let names: Vec<String> = srv.channels.all().map(|c| c.name.clone()).collect();
            for name in &names {
                send_names_reply(srv, id, name);
            }
        }
    }
}

pub fn handle_list<C: Clock>(srv: &mut Server<C>, id: ClientId, _msg: &Message) {
    let rows: Vec<(String, usize, String)> = srv
        .channels
        .all()
        .map(|c| (c.name.clone(), c.members.len(), c.topic.clone()))
        .collect();
    for (name, count, topic) in rows {
        srv.reply(id, rpl::RPL_LIST, &[&name, &count.to_string()], &topic);
    }
    srv.reply(id, rpl::RPL_LISTEND, &[], "End of /LIST");
}

fn send_topic_reply<C: Clock>(srv: &mut Server<C>, id: ClientId, name: &str) {
    let topic = srv.channels.get(name).map(|c| c.topic.clone()).unwrap_or_default();
    if topic.is_empty() {
        srv.reply(id, rpl::RPL_NOTOPIC, &[name], "No topic is set");
    } else {
        srv.reply(id, rpl::RPL_TOPIC, &[name], &topic);
    }
}

fn send_names_reply<C: Clock>(srv: &mut Server<C>, id: ClientId, name: &str) {
    let Some(entries) = srv.channels.get(name).map(|channel| {
        channel
            .members
            .iter()
            .filter_map(|(&member_id, &is_op)| {
                srv.clients.get(member_id).map(|m| {
                    if is_op {
                        format!("@{}", m.nick)
                    } else {
                        m.nick.clone()
                    }
                })
            })
            .collect::<Vec<_>>()
    }) else {
        return;
    };
    let names_line = entries.join(" ");
    srv.reply(id, rpl::RPL_NAMREPLY, &["=", name], &names_line);
    srv.reply(id, rpl::RPL_ENDOFNAMES, &[name], "End of /NAMES list");
}
