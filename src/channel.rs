//! Channel data model (spec §3): membership with per-member operator
//! flag, topic, modes and the invite allow-list used when `+i` is set.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::registry::ClientId;

#[derive(Debug, Clone, Default)]
pub struct ChannelModes {
    pub invite_only: bool,
    pub topic_locked: bool,
    pub moderated: bool,
    pub no_external_messages: bool,
    pub key: Option<String>,
    pub user_limit: Option<usize>,
}

pub struct Channel {
    pub name: String,
    pub topic: String,
    pub topic_set_by: Option<String>,
    pub topic_set_at: Option<Instant>,
    /// client id -> is_operator
    pub members: HashMap<ClientId, bool>,
    pub modes: ChannelModes,
    pub invited: HashSet<ClientId>,
}

impl Channel {
    /// A channel is created by the JOIN that names it; the creator is
    /// its initial (and, at creation, only) operator.
    pub fn new(name: impl Into<String>, creator: ClientId) -> Self {
        let mut members = HashMap::new();
        members.insert(creator, true);
        Channel {
            name: name.into(),
            topic: String::new(),
            topic_set_by: None,
            topic_set_at: None,
            members,
            modes: ChannelModes::default(),
            invited: HashSet::new(),
        }
    }

    pub fn is_member(&self, id: ClientId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn is_operator(&self, id: ClientId) -> bool {
        self.members.get(&id).copied().unwrap_or(false)
    }

    pub fn is_full(&self) -> bool {
        matches!(self.modes.user_limit, Some(limit) if self.members.len() >= limit)
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn mode_string(&self) -> String {
        let mut flags = String::from("+");
        if self.modes.invite_only {
            flags.push('i');
        }
        if self.modes.topic_locked {
            flags.push('t');
        }
        if self.modes.moderated {
            flags.push('m');
        }
        if self.modes.no_external_messages {
            flags.push('n');
        }
        if self.modes.key.is_some() {
            flags.push('k');
        }
        if self.modes.user_limit.is_some() {
            flags.push('l');
        }
        flags
    }
}
