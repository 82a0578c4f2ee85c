//! Random room names for newly created rooms.

use rand::Rng;

use crate::codec::{NameForm, RoomName};
use crate::words::WORDS_PER_LIST;

/// Default chance that a generated name is *subject-subject*.
pub const DEFAULT_SUBJECT_PAIR_PROBABILITY: f64 = 0.25;

/// Picks a random valid name using `rng`.
///
/// `subject_pair_probability` is clamped to `0.0..=1.0`.
pub fn random_name<R: Rng + ?Sized>(
    rng: &mut R,
    subject_pair_probability: f64,
) -> RoomName {
    let subject_pair = rng.random_bool(subject_pair_probability.clamp(0.0, 1.0));
    let second = rng.random_range(0..WORDS_PER_LIST);

    if subject_pair {
        // Draw from the 79 other subjects so the pair is never a duplicate.
        let mut first = rng.random_range(0..WORDS_PER_LIST - 1);
        if first >= second {
            first += 1;
        }
        RoomName::from_indices(NameForm::SubjectPair, first, second)
    } else {
        let first = rng.random_range(0..WORDS_PER_LIST);
        RoomName::from_indices(NameForm::ModifierSubject, first, second)
    }
}

/// Picks a random name with the thread-local RNG and the default form mix.
pub fn generate_room_name() -> RoomName {
    random_name(&mut rand::rng(), DEFAULT_SUBJECT_PAIR_PROBABILITY)
}
