//! Remote participants in the room.
use std::collections::BTreeSet;

use crate::message::RosterMessage;

/// Ids of the other participants, derived only from roster broadcasts.
///
/// The local participant never appears in its own roster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PeerRoster {
    local_id: String,
    peers: BTreeSet<String>,
}

impl PeerRoster {
    pub fn new(local_id: impl Into<String>) -> Self {
        Self {
            local_id: local_id.into(),
            peers: BTreeSet::new(),
        }
    }

    pub fn apply(&mut self, message: &RosterMessage) {
        match message {
            RosterMessage::RoomState { players } => {
                self.peers = players
                    .iter()
                    .map(|entry| entry.id())
                    .filter(|id| *id != self.local_id)
                    .map(str::to_owned)
                    .collect();
            }
            RosterMessage::PlayerJoined { player_id } => {
                if *player_id != self.local_id {
                    self.peers.insert(player_id.clone());
                }
            }
            RosterMessage::PlayerLeft { player_id } => {
                self.peers.remove(player_id);
            }
        }
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.peers.contains(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.peers.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::RosterEntry;

    #[test]
    fn snapshot_replaces_and_excludes_self() {
        let mut roster = PeerRoster::new("ada");
        roster.apply(&RosterMessage::PlayerJoined {
            player_id: "zed".into(),
        });
        roster.apply(&RosterMessage::RoomState {
            players: vec![RosterEntry::Id("ada".into()), RosterEntry::Id("bob".into())],
        });

        assert_eq!(roster.ids().collect::<Vec<_>>(), ["bob"]);
    }

    #[test]
    fn join_and_leave_update_membership() {
        let mut roster = PeerRoster::new("ada");
        roster.apply(&RosterMessage::PlayerJoined {
            player_id: "bob".into(),
        });
        roster.apply(&RosterMessage::PlayerJoined {
            player_id: "ada".into(),
        });
        assert_eq!(roster.len(), 1);

        roster.apply(&RosterMessage::PlayerLeft {
            player_id: "bob".into(),
        });
        assert!(roster.is_empty());
    }
}
