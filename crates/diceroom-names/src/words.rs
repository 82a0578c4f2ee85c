//! The two fixed vocabularies that room names are built from.
//!
//! Both lists hold exactly [`WORDS_PER_LIST`] lowercase ASCII words and are
//! disjoint, so a word's list membership alone decides which half of a name
//! it can occupy. The order of each list is part of the wire format: a
//! compact code stores list indices, so reordering or replacing a word
//! silently renames every existing room.

/// Number of words in each list.
pub const WORDS_PER_LIST: usize = 80;

/// Words allowed in the first position of a *modifier-subject* name.
pub const MODIFIERS: [&str; WORDS_PER_LIST] = [
    "brave", "swift", "clever", "mighty", "silent", "golden", "silver",
    "crimson", "azure", "amber", "ancient", "arcane", "bold", "bright",
    "calm", "cosmic", "cunning", "daring", "dusky", "eager", "elder",
    "emerald", "fabled", "fierce", "fiery", "frosty", "gentle", "gilded",
    "glowing", "grand", "grim", "happy", "hidden", "hollow", "humble", "icy",
    "iron", "jade", "jolly", "keen", "lively", "lonely", "lucky", "lunar",
    "magic", "merry", "misty", "noble", "odd", "proud", "quick", "quiet",
    "radiant", "rapid", "royal", "rusty", "sacred", "scarlet", "shady",
    "shiny", "sly", "solar", "stormy", "sturdy", "sunny", "tiny", "valiant",
    "velvet", "vivid", "wandering", "wild", "wise", "witty", "wooden",
    "young", "zealous", "stony", "restless", "curious", "mystic",
];

/// Words allowed in the second position of every name, and in both
/// positions of a *subject-subject* name.
pub const SUBJECTS: [&str; WORDS_PER_LIST] = [
    "dragon", "wizard", "goblin", "knight", "rogue", "bard", "cleric",
    "druid", "paladin", "ranger", "monk", "warlock", "sorcerer", "barbarian",
    "fighter", "dwarf", "elf", "gnome", "halfling", "orc", "troll", "ogre",
    "giant", "griffin", "phoenix", "hydra", "kraken", "unicorn", "pegasus",
    "basilisk", "chimera", "wyvern", "golem", "lich", "vampire", "werewolf",
    "ghost", "wraith", "specter", "banshee", "imp", "sprite", "pixie",
    "fairy", "nymph", "dryad", "centaur", "minotaur", "cyclops", "harpy",
    "sphinx", "manticore", "owlbear", "beholder", "mimic", "kobold", "gnoll",
    "hobgoblin", "bugbear", "treant", "yeti", "raven", "wolf", "bear",
    "falcon", "serpent", "tiger", "lion", "badger", "fox", "hawk", "owl",
    "stag", "boar", "toad", "spider", "beetle", "otter", "heron", "moth",
];

/// Returns the index of `word` in the modifier list.
pub fn modifier_index(word: &str) -> Option<usize> {
    MODIFIERS.iter().position(|w| *w == word)
}

/// Returns the index of `word` in the subject list.
pub fn subject_index(word: &str) -> Option<usize> {
    SUBJECTS.iter().position(|w| *w == word)
}
