//! `ClientIndex` (fd/token -> Client, nick -> Client) and
//! `ChannelRegistry` (name -> Channel), both authoritative and both
//! keyed case-insensitively (spec §3, §4.6). Clients never hold
//! references across dispatch boundaries; handlers look everything up
//! through these registries each call.

use std::collections::HashMap;

use slab::Slab;

use ircd_proto::casefold;

use crate::channel::Channel;
use crate::client::Client;

/// A client's identity for the lifetime of its connection: also used
/// as the `mio::Token` value for its socket.
pub type ClientId = usize;

#[derive(Default)]
pub struct ClientIndex {
    clients: Slab<Client>,
    nicks: HashMap<String, ClientId>,
}

impl ClientIndex {
    pub fn new() -> Self {
        ClientIndex {
            clients: Slab::new(),
            nicks: HashMap::new(),
        }
    }

    pub fn insert(&mut self, client: Client) -> ClientId {
        self.clients.insert(client)
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(id)
    }

    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        if !self.clients.contains(id) {
            return None;
        }
        let client = self.clients.remove(id);
        if !client.nick.is_empty() {
            self.nicks.remove(&casefold(&client.nick));
        }
        Some(client)
    }

    pub fn ids(&self) -> Vec<ClientId> {
        self.clients.iter().map(|(id, _)| id).collect()
    }

    pub fn find_by_nick(&self, nick: &str) -> Option<ClientId> {
        self.nicks.get(&casefold(nick)).copied()
    }

    pub fn nick_in_use(&self, nick: &str) -> bool {
        self.nicks.contains_key(&casefold(nick))
    }

    /// Atomically updates the nick index. Caller must have already
    /// confirmed the new nick is free (`433` is emitted before any
    /// state mutates).
    pub fn set_nick(&mut self, id: ClientId, new_nick: &str) {
        if let Some(client) = self.clients.get(id) {
            if !client.nick.is_empty() {
                self.nicks.remove(&casefold(&client.nick));
            }
        }
        self.nicks.insert(casefold(new_nick), id);
        if let Some(client) = self.clients.get_mut(id) {
            client.nick = new_nick.to_string();
        }
    }
}

#[derive(Default)]
pub struct ChannelRegistry {
    channels: HashMap<String, Channel>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        ChannelRegistry {
            channels: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&casefold(name))
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&casefold(name))
    }

    pub fn get_or_create(&mut self, name: &str, creator: ClientId) -> (&mut Channel, bool) {
        let key = casefold(name);
        let created = !self.channels.contains_key(&key);
        let channel = self
            .channels
            .entry(key)
            .or_insert_with(|| Channel::new(name, creator));
        (channel, created)
    }

    /// Removes the channel if it is now empty, per spec's destroy-on-empty
    /// invariant. Call after any membership removal.
    pub fn destroy_if_empty(&mut self, name: &str) {
        let key = casefold(name);
        if matches!(self.channels.get(&key), Some(channel) if channel.is_empty()) {
            self.channels.remove(&key);
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.values_mut()
    }
}
