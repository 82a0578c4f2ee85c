//! History-keeper election.
//!
//! The relay stores nothing, so a newcomer's missing history has to come
//! from a peer. Exactly one peer should send it: none leaves the newcomer
//! blank, several flood it with duplicates.
//!
//! Every existing peer evaluates the same rule on its own peer map when a
//! newcomer announces itself:
//!
//! 1. take every known peer id, *minus the newcomer*,
//! 2. add the local id,
//! 3. deduplicate and sort ascending,
//! 4. the first id is the keeper.
//!
//! Once peer maps have converged every peer computes the same set, so
//! exactly one of them elects itself. No extra messages are exchanged.

use std::collections::BTreeSet;

use diceroom_protocol::PlayerId;

/// Returns the keeper among `local` and `known`, ignoring `joining`.
pub fn history_keeper<'a>(
    local: &'a PlayerId,
    known: impl IntoIterator<Item = &'a PlayerId>,
    joining: &PlayerId,
) -> &'a PlayerId {
    let candidates: BTreeSet<&PlayerId> = known
        .into_iter()
        .filter(|id| *id != joining)
        .chain(std::iter::once(local))
        .collect();
    candidates.first().copied().unwrap_or(local)
}

/// Returns `true` if `local` is the keeper for `joining`.
pub fn is_history_keeper<'a>(
    local: &'a PlayerId,
    known: impl IntoIterator<Item = &'a PlayerId>,
    joining: &PlayerId,
) -> bool {
    history_keeper(local, known, joining) == local
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<PlayerId> {
        raw.iter().map(|s| PlayerId::from(*s)).collect()
    }

    /// Every existing peer knows all the others plus the newcomer.
    fn keepers(existing: &[PlayerId], joining: &PlayerId) -> Vec<PlayerId> {
        existing
            .iter()
            .filter(|local| {
                let known: Vec<&PlayerId> = existing
                    .iter()
                    .filter(|id| id != local)
                    .chain(std::iter::once(joining))
                    .collect();
                is_history_keeper(local, known, joining)
            })
            .cloned()
            .collect()
    }

    #[test]
    fn test_two_peers_earlier_id_keeps() {
        let a = PlayerId::from("aaa11111");
        let b = PlayerId::from("bbb22222");
        // A already in the room sees B join.
        assert!(is_history_keeper(&a, [&b], &b));
    }

    #[test]
    fn test_lower_peer_than_local_wins() {
        let a = PlayerId::from("aaa11111");
        let b = PlayerId::from("bbb22222");
        let c = PlayerId::from("ccc33333");
        assert!(!is_history_keeper(&b, [&a, &c], &c));
        assert_eq!(history_keeper(&b, [&a, &c], &c), &a);
    }

    #[test]
    fn test_joining_peer_never_counts_even_if_lowest() {
        let a = PlayerId::from("aaa11111");
        let b = PlayerId::from("bbb22222");
        let c = PlayerId::from("ccc33333");
        assert!(is_history_keeper(&b, [&a, &c], &a));
    }

    #[test]
    fn test_alone_is_keeper() {
        let a = PlayerId::from("aaa11111");
        assert!(is_history_keeper(&a, [], &PlayerId::from("zzz")));
    }

    #[test]
    fn test_duplicate_known_ids_are_harmless() {
        let a = PlayerId::from("aaa11111");
        let b = PlayerId::from("bbb22222");
        assert!(is_history_keeper(&a, [&b, &b, &a], &b));
    }

    #[test]
    fn test_exactly_one_keeper_for_any_room_size() {
        let pool = ids(&[
            "f00d0001", "0badc0de", "aaa11111", "bbb22222", "7e57e57e",
            "cafe0000", "123abc45", "deadbeef",
        ]);
        for n in 1..pool.len() {
            let existing = &pool[..n];
            for joining in &pool[n..] {
                let elected = keepers(existing, joining);
                assert_eq!(elected.len(), 1, "n={n} joining={joining}");
                assert_eq!(&elected[0], existing.iter().min().unwrap());
            }
        }
    }

    #[test]
    fn test_keeper_independent_of_join_order() {
        let mut existing = ids(&["c3", "a1", "b2", "e5", "d4"]);
        let joining = PlayerId::from("00");
        let expected = keepers(&existing, &joining);
        for _ in 0..existing.len() {
            existing.rotate_left(1);
            assert_eq!(keepers(&existing, &joining), expected);
        }
        existing.reverse();
        assert_eq!(keepers(&existing, &joining), expected);
    }
}
