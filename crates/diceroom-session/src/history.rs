//! Local roll history and roll drafts.

use std::collections::VecDeque;

use diceroom_protocol::{Player, RollRecord};
use serde_json::{Map, Value};

// ---------------------------------------------------------------------------
// RollDraft
// ---------------------------------------------------------------------------

/// A finished roll from the dice engine, before it is stamped with who
/// rolled it and when.
///
/// `details` holds the roll-type-specific values (`rollType`, `dice`,
/// `modifier`, ...) and is carried opaquely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RollDraft {
    pub details: Map<String, Value>,
    pub total: i64,
    pub result_text: String,
    /// Kept in the roller's own history but never broadcast or shared.
    pub private: bool,
}

impl RollDraft {
    pub fn new(total: i64, result_text: impl Into<String>) -> Self {
        Self {
            total,
            result_text: result_text.into(),
            ..Self::default()
        }
    }

    /// Adds one roll-type-specific field.
    pub fn with_detail(
        mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Marks the roll private.
    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub(crate) fn stamp(self, roller: &Player, timestamp: u64) -> RollRecord {
        RollRecord {
            details: self.details,
            total: self.total,
            result_text: self.result_text,
            player_id: roller.id.clone(),
            player_name: roller.display_name.clone(),
            timestamp,
            private: self.private,
        }
    }
}

// ---------------------------------------------------------------------------
// RollHistory
// ---------------------------------------------------------------------------

/// Bounded roll history, most recent first.
#[derive(Debug, Clone)]
pub struct RollHistory {
    limit: usize,
    rolls: VecDeque<RollRecord>,
}

impl RollHistory {
    /// Creates an empty history holding at most `limit` rolls (min. 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            rolls: VecDeque::with_capacity(limit),
        }
    }

    /// Adds a roll at the front, evicting the oldest past the limit.
    pub fn push(&mut self, roll: RollRecord) {
        self.rolls.push_front(roll);
        self.rolls.truncate(self.limit);
    }

    /// Merges a shared history into this one.
    ///
    /// Rolls already held (same player and timestamp) and private rolls
    /// are skipped. The result is re-sorted newest first and truncated.
    /// Returns the rolls that were added and survived truncation.
    pub fn merge(&mut self, incoming: Vec<RollRecord>) -> Vec<RollRecord> {
        let mut added = Vec::new();
        for roll in incoming {
            if !roll.is_shareable() || self.contains(&roll) {
                continue;
            }
            if added.iter().any(|r: &RollRecord| same_roll(r, &roll)) {
                continue;
            }
            added.push(roll);
        }
        if added.is_empty() {
            return added;
        }

        self.rolls.extend(added.iter().cloned());
        self.rolls
            .make_contiguous()
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.rolls.truncate(self.limit);

        added.retain(|roll| self.contains(roll));
        added.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        added
    }

    /// The rolls that may be sent to peers, most recent first.
    pub fn shareable(&self) -> Vec<RollRecord> {
        self.rolls
            .iter()
            .filter(|r| r.is_shareable())
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RollRecord> {
        self.rolls.iter()
    }

    pub fn to_vec(&self) -> Vec<RollRecord> {
        self.rolls.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&RollRecord> {
        self.rolls.front()
    }

    pub fn len(&self) -> usize {
        self.rolls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rolls.is_empty()
    }

    pub fn clear(&mut self) {
        self.rolls.clear();
    }

    fn contains(&self, roll: &RollRecord) -> bool {
        self.rolls.iter().any(|r| same_roll(r, roll))
    }
}

fn same_roll(a: &RollRecord, b: &RollRecord) -> bool {
    a.player_id == b.player_id && a.timestamp == b.timestamp
}

#[cfg(test)]
mod tests {
    use diceroom_protocol::PlayerId;

    use super::*;

    fn roller(id: &str) -> Player {
        Player {
            id: PlayerId::from(id),
            display_name: format!("P-{id}"),
            joined_at: 0,
            last_seen: 0,
            active: true,
        }
    }

    fn roll(id: &str, timestamp: u64) -> RollRecord {
        RollDraft::new(timestamp as i64, timestamp.to_string())
            .stamp(&roller(id), timestamp)
    }

    fn timestamps(history: &RollHistory) -> Vec<u64> {
        history.iter().map(|r| r.timestamp).collect()
    }

    #[test]
    fn test_draft_stamp_copies_identity() {
        let record = RollDraft::new(20, "20")
            .with_detail("rollType", "d20")
            .with_detail("dice", vec![17, 3])
            .stamp(&roller("aaa"), 99);

        assert_eq!(record.player_id, PlayerId::from("aaa"));
        assert_eq!(record.player_name, "P-aaa");
        assert_eq!(record.timestamp, 99);
        assert_eq!(record.details["rollType"], "d20");
        assert!(record.is_shareable());
    }

    #[test]
    fn test_push_is_most_recent_first_and_bounded() {
        let mut history = RollHistory::new(3);
        for t in 1..=5 {
            history.push(roll("aaa", t));
        }
        assert_eq!(timestamps(&history), vec![5, 4, 3]);
        assert_eq!(history.latest().unwrap().timestamp, 5);
    }

    #[test]
    fn test_shareable_filters_private() {
        let mut history = RollHistory::new(10);
        history.push(roll("aaa", 1));
        history.push(
            RollDraft::new(4, "4").private().stamp(&roller("aaa"), 2),
        );
        history.push(roll("aaa", 3));

        assert_eq!(history.len(), 3);
        let shared: Vec<u64> =
            history.shareable().iter().map(|r| r.timestamp).collect();
        assert_eq!(shared, vec![3, 1]);
    }

    #[test]
    fn test_merge_skips_known_rolls_and_sorts() {
        let mut history = RollHistory::new(10);
        history.push(roll("aaa", 10));
        history.push(roll("bbb", 30));

        let added = history.merge(vec![
            roll("bbb", 30),
            roll("ccc", 20),
            roll("ccc", 40),
            roll("ccc", 40),
        ]);

        let added: Vec<u64> = added.iter().map(|r| r.timestamp).collect();
        assert_eq!(added, vec![40, 20]);
        assert_eq!(timestamps(&history), vec![40, 30, 20, 10]);
    }

    #[test]
    fn test_merge_drops_private_and_respects_limit() {
        let mut history = RollHistory::new(2);
        history.push(roll("aaa", 50));

        let mut hidden = roll("bbb", 60);
        hidden.private = true;
        let added = history.merge(vec![hidden, roll("bbb", 40), roll("bbb", 5)]);

        assert_eq!(timestamps(&history), vec![50, 40]);
        let added: Vec<u64> = added.iter().map(|r| r.timestamp).collect();
        assert_eq!(added, vec![40]);
    }

    #[test]
    fn test_zero_limit_keeps_one() {
        let mut history = RollHistory::new(0);
        history.push(roll("aaa", 1));
        history.push(roll("aaa", 2));
        assert_eq!(timestamps(&history), vec![2]);
    }
}
