//! Local identity: player ids, display names and the clock.

use std::time::{SystemTime, UNIX_EPOCH};

use diceroom_protocol::PlayerId;
use rand::Rng;

/// Longest display name announced to peers, in characters.
pub const MAX_DISPLAY_NAME_CHARS: usize = 20;

/// Used when sanitizing leaves nothing.
pub const DEFAULT_DISPLAY_NAME: &str = "Player";

/// Generates a random 16-character hex player id (64 bits of entropy).
pub fn generate_player_id() -> PlayerId {
    let bytes: [u8; 8] = rand::rng().random();
    PlayerId(bytes.iter().map(|b| format!("{b:02x}")).collect())
}

/// Makes a user-supplied name safe to show on other clients: HTML tags
/// removed, whitespace trimmed, at most [`MAX_DISPLAY_NAME_CHARS`].
pub fn sanitize_display_name(raw: &str) -> String {
    let stripped = strip_tags(raw);
    let name: String = stripped
        .trim()
        .chars()
        .take(MAX_DISPLAY_NAME_CHARS)
        .collect();
    let name = name.trim_end();
    if name.is_empty() {
        DEFAULT_DISPLAY_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Removes every complete `<...>` run. A `<` with no closing `>` is
/// left alone.
fn strip_tags(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('<') {
        let Some(len) = rest[start..].find('>') else {
            break;
        };
        out.push_str(&rest[..start]);
        rest = &rest[start + len + 1..];
    }
    out.push_str(rest);
    out
}

/// Wall-clock source for timestamps, in Unix milliseconds.
pub trait Clock: Send + 'static {
    fn now_millis(&self) -> u64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0)
    }
}
