//! The local view of who else is in the room.

use std::collections::HashMap;

use diceroom_protocol::{Player, PlayerId};

/// Peers keyed by player id.
///
/// Announcements can arrive more than once (a peer's JOIN and its reply
/// to ours may cross), so [`upsert`](Self::upsert) is idempotent and
/// reports whether the id was new *before* touching the map. Callers key
/// notifications and elections off that flag.
#[derive(Debug, Clone, Default)]
pub struct PeerMap {
    peers: HashMap<PlayerId, Player>,
}

impl PeerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or refreshes `player`. Returns `true` if the id was unknown.
    pub fn upsert(&mut self, player: Player) -> bool {
        let is_new = !self.peers.contains_key(&player.id);
        self.peers.insert(player.id.clone(), player);
        is_new
    }

    /// Removes a peer, returning its last known record.
    pub fn remove(&mut self, id: &PlayerId) -> Option<Player> {
        self.peers.remove(id)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.peers.get(id)
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Known peer ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = &PlayerId> {
        self.peers.keys()
    }

    /// Known peers sorted by id.
    pub fn players(&self) -> Vec<Player> {
        let mut players: Vec<Player> = self.peers.values().cloned().collect();
        players.sort_by(|a, b| a.id.cmp(&b.id));
        players
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }
}
