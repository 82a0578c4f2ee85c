//! Core protocol types for Diceroom's wire format.
//!
//! Every frame on a room connection is one JSON object holding one
//! [`RoomMessage`]. The relay forwards frames without looking inside, so
//! these types are a contract between *clients*; the relay only needs to
//! recognise [`RoomMessage::Ping`].

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's opaque identifier.
///
/// Generated by the client once per session and reused across
/// reconnects, so peers recognise a returning player. Ordering is plain
/// string ordering; the history-keeper election relies on it.
///
/// `#[serde(transparent)]` keeps it a bare JSON string on the wire.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The canonical key of a room: the compact code, or an uppercase legacy
/// code.
///
/// Never sent inside messages; it only appears in the connection URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A participant as announced to the other clients in a room.
///
/// Timestamps are Unix milliseconds from the announcing client's clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    /// At most 20 characters, HTML stripped, by the time it is announced.
    pub display_name: String,
    pub joined_at: u64,
    pub last_seen: u64,
    pub active: bool,
}

// ---------------------------------------------------------------------------
// RollRecord
// ---------------------------------------------------------------------------

/// One completed roll.
///
/// The dice values depend on the kind of roll and are produced by the
/// dice engine, which this crate knows nothing about; they are kept as
/// extra JSON fields flattened into the record next to the common ones:
///
/// ```json
/// { "rollType": "d20", "dice": [17], "modifier": 3,
///   "total": 20, "resultText": "20", "playerId": "…",
///   "playerName": "Ada", "timestamp": 1700000000000 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollRecord {
    /// Roll-type-specific dice values.
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,

    pub total: i64,
    pub result_text: String,
    pub player_id: PlayerId,
    pub player_name: String,
    pub timestamp: u64,

    /// A hidden roll kept only in the roller's own history. Never
    /// broadcast and never shared, so it is omitted from JSON when false.
    #[serde(default, skip_serializing_if = "is_false")]
    pub private: bool,
}

impl RollRecord {
    /// Returns `true` if the roll may leave the roller's machine.
    pub fn is_shareable(&self) -> bool {
        !self.private
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

// ---------------------------------------------------------------------------
// RoomMessage
// ---------------------------------------------------------------------------

/// Every message clients exchange through a room relay.
///
/// Internally tagged with SCREAMING_SNAKE_CASE names and camelCase
/// fields:
///
/// ```text
/// {"type":"JOIN_ANNOUNCEMENT","player":{…}}
/// {"type":"LEAVE_ANNOUNCEMENT","playerId":"…"}
/// {"type":"PING"}
/// ```
///
/// There are no sequence numbers or acknowledgements; delivery is only
/// as ordered as a single WebSocket connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum RoomMessage {
    /// "I just connected." Sent once per successful open.
    JoinAnnouncement { player: Player },

    /// "I was already here." Reply to a first-time announcement.
    PlayerResponse { player: Player },

    /// "I'm leaving." Sent on explicit disconnect and page teardown.
    LeaveAnnouncement { player_id: PlayerId },

    /// A new roll from the sender.
    Roll { roll: RollRecord },

    /// The history keeper's shareable history, most recent first.
    HistoryShare { rolls: Vec<RollRecord> },

    /// Heartbeat probe.
    Ping,

    /// Heartbeat answer.
    Pong,
}

impl RoomMessage {
    /// The wire tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::JoinAnnouncement { .. } => "JOIN_ANNOUNCEMENT",
            Self::PlayerResponse { .. } => "PLAYER_RESPONSE",
            Self::LeaveAnnouncement { .. } => "LEAVE_ANNOUNCEMENT",
            Self::Roll { .. } => "ROLL",
            Self::HistoryShare { .. } => "HISTORY_SHARE",
            Self::Ping => "PING",
            Self::Pong => "PONG",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The JSON shapes are shared with browser clients, so these tests pin
    //! the exact field and tag names.

    use serde_json::json;

    use super::*;

    fn player() -> Player {
        Player {
            id: PlayerId::from("aaa11111"),
            display_name: "Ada".into(),
            joined_at: 1_000,
            last_seen: 2_000,
            active: true,
        }
    }

    fn roll(private: bool) -> RollRecord {
        let mut details = serde_json::Map::new();
        details.insert("rollType".into(), json!("d20"));
        details.insert("dice".into(), json!([17]));
        RollRecord {
            details,
            total: 17,
            result_text: "17".into(),
            player_id: PlayerId::from("aaa11111"),
            player_name: "Ada".into(),
            timestamp: 1_700_000_000_000,
            private,
        }
    }

    #[test]
    fn test_player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::from("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }

    #[test]
    fn test_player_ids_sort_as_strings() {
        let mut ids = vec![
            PlayerId::from("bbb22222"),
            PlayerId::from("aaa11111"),
            PlayerId::from("aab"),
        ];
        ids.sort();
        assert_eq!(ids[0].as_str(), "aaa11111");
        assert_eq!(ids[1].as_str(), "aab");
    }

    #[test]
    fn test_room_id_display() {
        assert_eq!(RoomId("8QR".into()).to_string(), "room-8QR");
    }

    #[test]
    fn test_player_uses_camel_case_fields() {
        let value = serde_json::to_value(player()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "aaa11111",
                "displayName": "Ada",
                "joinedAt": 1000,
                "lastSeen": 2000,
                "active": true,
            })
        );
    }

    #[test]
    fn test_roll_record_flattens_dice_details() {
        let value = serde_json::to_value(roll(false)).unwrap();
        assert_eq!(value["rollType"], "d20");
        assert_eq!(value["dice"], json!([17]));
        assert_eq!(value["total"], 17);
        assert_eq!(value["resultText"], "17");
        assert_eq!(value["playerId"], "aaa11111");
        assert_eq!(value["playerName"], "Ada");
        assert!(value.get("details").is_none());
        assert!(value.get("private").is_none());
    }

    #[test]
    fn test_roll_record_keeps_unknown_fields_when_parsed() {
        let raw = json!({
            "rollType": "advantage",
            "dice1": 4,
            "dice2": 19,
            "total": 19,
            "resultText": "19 (advantage)",
            "playerId": "bbb22222",
            "playerName": "Bo",
            "timestamp": 5,
        });
        let parsed: RollRecord = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(parsed.details.len(), 3);
        assert!(!parsed.private);
        assert_eq!(serde_json::to_value(&parsed).unwrap(), raw);
    }

    #[test]
    fn test_private_flag_serializes_only_when_set() {
        let value = serde_json::to_value(roll(true)).unwrap();
        assert_eq!(value["private"], true);
        assert!(!roll(true).is_shareable());
        assert!(roll(false).is_shareable());
    }

    #[test]
    fn test_join_announcement_json_format() {
        let msg = RoomMessage::JoinAnnouncement { player: player() };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "JOIN_ANNOUNCEMENT");
        assert_eq!(value["player"]["displayName"], "Ada");
    }

    #[test]
    fn test_leave_announcement_uses_camel_case_player_id() {
        let msg = RoomMessage::LeaveAnnouncement {
            player_id: PlayerId::from("aaa11111"),
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"type": "LEAVE_ANNOUNCEMENT", "playerId": "aaa11111"})
        );
    }

    #[test]
    fn test_ping_and_pong_are_bare_tags() {
        assert_eq!(
            serde_json::to_value(RoomMessage::Ping).unwrap(),
            json!({"type": "PING"})
        );
        let pong: RoomMessage =
            serde_json::from_str(r#"{"type":"PONG"}"#).unwrap();
        assert_eq!(pong, RoomMessage::Pong);
    }

    #[test]
    fn test_history_share_round_trip() {
        let msg = RoomMessage::HistoryShare {
            rolls: vec![roll(false), roll(false)],
        };
        let text = serde_json::to_string(&msg).unwrap();
        let decoded: RoomMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, msg);
        assert_eq!(decoded.kind(), "HISTORY_SHARE");
    }

    #[test]
    fn test_decode_unknown_type_returns_error() {
        let result: Result<RoomMessage, _> =
            serde_json::from_str(r#"{"type": "CHAT", "text": "hi"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_missing_fields_returns_error() {
        let result: Result<RoomMessage, _> =
            serde_json::from_str(r#"{"type": "ROLL"}"#);
        assert!(result.is_err());
    }
}
