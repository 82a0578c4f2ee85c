//! Bijective mapping between two-word room names and 3-character codes.
//!
//! A name is either *modifier-subject* (`brave-dragon`) or
//! *subject-subject* (`wizard-dragon`). Each form addresses an
//! `80 × 80` grid of word pairs, so a name fits in a 14-bit index plus a
//! 1-bit form tag:
//!
//! ```text
//!   bit 14      bits 13..0
//! ┌─────────┬──────────────────────────┐
//! │  form   │ first * 80 + second      │   15 bits = 3 base-32 digits
//! └─────────┴──────────────────────────┘
//! ```
//!
//! The digits use the Crockford alphabet, which leaves out `I`, `L`, `O`
//! and `U`. Decoding maps the look-alikes back (`O` → `0`, `I`/`L` → `1`)
//! so a code read aloud or copied by hand still resolves.

use std::fmt;

use crate::words::{MODIFIERS, SUBJECTS, WORDS_PER_LIST, modifier_index, subject_index};
use crate::NameError;

/// Number of characters in a compact room code.
pub const CODE_LENGTH: usize = 3;

/// The base-32 digit alphabet, in digit order.
pub const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

const BITS_PER_DIGIT: u32 = 5;
const FORM_SHIFT: u32 = 14;
const INDEX_MASK: u32 = (1 << FORM_SHIFT) - 1;
const PAIR_COUNT: u32 = (WORDS_PER_LIST * WORDS_PER_LIST) as u32;

/// Which vocabulary the first word of a name comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameForm {
    /// `modifier-subject`, form tag 0.
    ModifierSubject,
    /// `subject-subject` with two different subjects, form tag 1.
    SubjectPair,
}

impl NameForm {
    fn tag(self) -> u32 {
        match self {
            Self::ModifierSubject => 0,
            Self::SubjectPair => 1,
        }
    }
}

/// A validated two-word room name.
///
/// Only constructible from words that encode, so [`RoomName::code`] is
/// infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomName {
    form: NameForm,
    first: usize,
    second: usize,
}

impl RoomName {
    /// Validates a word pair.
    ///
    /// `second` must be a subject. `first` is tried as a modifier, then as
    /// a subject; a subject-subject pair must use two different subjects.
    pub fn new(first: &str, second: &str) -> Result<Self, NameError> {
        let second_idx = subject_index(second)
            .ok_or_else(|| NameError::UnknownWord(second.to_string()))?;

        if let Some(first_idx) = modifier_index(first) {
            return Ok(Self {
                form: NameForm::ModifierSubject,
                first: first_idx,
                second: second_idx,
            });
        }

        match subject_index(first) {
            Some(first_idx) if first_idx == second_idx => {
                Err(NameError::DuplicatePair(first.to_string()))
            }
            Some(first_idx) => Ok(Self {
                form: NameForm::SubjectPair,
                first: first_idx,
                second: second_idx,
            }),
            None => Err(NameError::UnknownWord(first.to_string())),
        }
    }

    /// Builds a name from list indices already known to be valid for
    /// `form`.
    pub(crate) fn from_indices(form: NameForm, first: usize, second: usize) -> Self {
        debug_assert!(first < WORDS_PER_LIST && second < WORDS_PER_LIST);
        debug_assert!(form == NameForm::ModifierSubject || first != second);
        Self { form, first, second }
    }

    /// Parses the hyphenated display form, `word-word`.
    pub fn parse(name: &str) -> Result<Self, NameError> {
        let (first, second) = name
            .trim()
            .split_once('-')
            .ok_or_else(|| NameError::MalformedName(name.to_string()))?;
        let is_word =
            |w: &str| !w.is_empty() && w.chars().all(|c| c.is_ascii_lowercase());
        if !is_word(first) || !is_word(second) {
            return Err(NameError::MalformedName(name.to_string()));
        }
        Self::new(first, second)
    }

    /// The name's form.
    pub fn form(&self) -> NameForm {
        self.form
    }

    /// The first word.
    pub fn first(&self) -> &'static str {
        match self.form {
            NameForm::ModifierSubject => MODIFIERS[self.first],
            NameForm::SubjectPair => SUBJECTS[self.first],
        }
    }

    /// The second word (always a subject).
    pub fn second(&self) -> &'static str {
        SUBJECTS[self.second]
    }

    /// Packs the name into its compact code.
    pub fn code(&self) -> String {
        let index = (self.first * WORDS_PER_LIST + self.second) as u32;
        let packed = (self.form.tag() << FORM_SHIFT) | index;

        (0..CODE_LENGTH)
            .rev()
            .map(|digit| {
                let value = (packed >> (digit as u32 * BITS_PER_DIGIT)) & 0x1f;
                ALPHABET[value as usize] as char
            })
            .collect()
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first(), self.second())
    }
}

/// Encodes a word pair into its 3-character code.
///
/// # Errors
/// [`NameError::UnknownWord`] for a word outside the applicable list and
/// [`NameError::DuplicatePair`] for a subject repeated twice.
pub fn encode(first: &str, second: &str) -> Result<String, NameError> {
    RoomName::new(first, second).map(|name| name.code())
}

/// Decodes a code back into its word pair.
///
/// Input is normalized first (see [`normalize`]), so `b0z`, `BOZ` and
/// `B0Z` all decode alike.
pub fn decode(code: &str) -> Result<RoomName, NameError> {
    let normalized = normalize(code);
    let length = normalized.chars().count();
    if length != CODE_LENGTH {
        return Err(NameError::InvalidLength {
            expected: CODE_LENGTH,
            actual: length,
        });
    }

    let mut packed: u32 = 0;
    for c in normalized.chars() {
        let digit = ALPHABET
            .iter()
            .position(|a| *a as char == c)
            .ok_or(NameError::InvalidCharacter(c))?;
        packed = (packed << BITS_PER_DIGIT) | digit as u32;
    }

    let index = packed & INDEX_MASK;
    if index >= PAIR_COUNT {
        return Err(NameError::IndexOutOfRange(index));
    }
    let first = (index as usize) / WORDS_PER_LIST;
    let second = (index as usize) % WORDS_PER_LIST;

    if packed >> FORM_SHIFT == 0 {
        Ok(RoomName {
            form: NameForm::ModifierSubject,
            first,
            second,
        })
    } else if first == second {
        // Encoding never produces this, so accepting it would give the
        // same room two names.
        Err(NameError::DuplicatePair(SUBJECTS[first].to_string()))
    } else {
        Ok(RoomName {
            form: NameForm::SubjectPair,
            first,
            second,
        })
    }
}

/// Uppercases a code and replaces confusable characters with the digit
/// they stand for. Characters with no mapping pass through unchanged and
/// are rejected later by [`decode`].
pub fn normalize(code: &str) -> String {
    code.trim()
        .chars()
        .map(|c| match c.to_ascii_uppercase() {
            'O' => '0',
            'I' | 'L' => '1',
            other => other,
        })
        .collect()
}

/// Converts `word-word` to its code, or returns `name` unchanged if it
/// does not encode.
pub fn code_for(name: &str) -> String {
    match RoomName::parse(name) {
        Ok(parsed) => parsed.code(),
        Err(_) => name.to_string(),
    }
}

/// Converts a code to `word-word`, or returns `code` unchanged if it does
/// not decode.
pub fn display_name_for(code: &str) -> String {
    match decode(code) {
        Ok(name) => name.to_string(),
        Err(_) => code.to_string(),
    }
}
