//! Request-path validation for relay connections.

use diceroom_names::RoomIdentifier;
use diceroom_protocol::RoomId;

use crate::RelayError;

/// Every relay endpoint lives under this prefix.
pub const ROOM_PATH_PREFIX: &str = "/api/room/";

/// Extracts the canonical room from a `/api/room/{id}` request path.
///
/// `{id}` may be a compact code (any case, confusables allowed), a
/// friendly name or a legacy 6-character code; all spellings of one room
/// map to the same [`RoomId`].
pub fn room_from_path(path: &str) -> Result<RoomId, RelayError> {
    let id = path
        .strip_prefix(ROOM_PATH_PREFIX)
        .filter(|id| !id.is_empty() && !id.contains('/'))
        .ok_or(RelayError::InvalidSessionUrl)?;

    let identifier =
        RoomIdentifier::parse(id).map_err(RelayError::InvalidSessionId)?;
    Ok(RoomId(identifier.canonical()))
}

#[cfg(test)]
mod tests {
    use diceroom_names::encode;

    use super::*;

    #[test]
    fn test_room_from_path_accepts_compact_code_in_any_case() {
        let code = encode("brave", "dragon").unwrap();
        let upper = room_from_path(&format!("/api/room/{code}")).unwrap();
        let lower =
            room_from_path(&format!("/api/room/{}", code.to_lowercase()))
                .unwrap();
        assert_eq!(upper, RoomId(code.clone()));
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_room_from_path_friendly_name_maps_to_code() {
        let code = encode("brave", "dragon").unwrap();
        let room = room_from_path("/api/room/brave-dragon").unwrap();
        assert_eq!(room, RoomId(code));
    }

    #[test]
    fn test_room_from_path_accepts_legacy_code() {
        let room = room_from_path("/api/room/ab12cd").unwrap();
        assert_eq!(room, RoomId("AB12CD".into()));
    }

    #[test]
    fn test_room_from_path_wrong_shape_is_invalid_url() {
        for path in ["/", "/api/room/", "/api/rooms/ABC", "/api/room/ABC/x"] {
            let err = room_from_path(path).unwrap_err();
            assert!(
                matches!(err, RelayError::InvalidSessionUrl),
                "{path}: {err:?}"
            );
            assert_eq!(err.to_string(), "Invalid session URL");
        }
    }

    #[test]
    fn test_room_from_path_bad_id_is_invalid_format() {
        for path in ["/api/room/ABCD", "/api/room/a_b", "/api/room/ZZZ"] {
            let err = room_from_path(path).unwrap_err();
            assert!(
                matches!(err, RelayError::InvalidSessionId(_)),
                "{path}: {err:?}"
            );
            assert_eq!(err.to_string(), "Invalid session ID format");
        }
    }
}
