//! Required-character collection for atlas generation
//!
//! The character set for a font group is the union, across every known
//! localized string in the group's languages, of the string's characters
//! as authored plus the Unicode uppercase and lowercase expansions of
//! each (scripts case-fold differently, so both are tried), plus a fixed
//! always-include set. A `char` is already a full code point, so no
//! surrogate handling is needed here.

use std::collections::{BTreeMap, BTreeSet};

/// Currency symbols included in every atlas regardless of content.
pub const CURRENCY_SYMBOLS: &str = "$\u{00a2}\u{00a3}\u{00a4}\u{00a5}\u{20a9}\u{20ac}\u{20b9}\u{20bd}\u{20ba}";

/// Characters a font group must cover.
#[derive(Debug, Clone, Default)]
pub struct RequiredChars {
    chars: BTreeSet<char>,
    /// First identifier that demanded each character, for diagnostics.
    owners: BTreeMap<char, String>,
}

impl RequiredChars {
    /// Start from the always-include set: printable ASCII plus common
    /// currency symbols, owned by no identifier.
    pub fn new() -> Self {
        let mut set = Self::default();
        for c in ('\u{20}'..='\u{7e}').chain(CURRENCY_SYMBOLS.chars()) {
            set.chars.insert(c);
        }
        set
    }

    /// Add one localized string, expanding each character through its
    /// uppercase and lowercase variants.
    pub fn add_text(&mut self, identity: &str, text: &str) {
        for c in text.chars() {
            self.insert(c, identity);
            for upper in c.to_uppercase() {
                self.insert(upper, identity);
            }
            for lower in c.to_lowercase() {
                self.insert(lower, identity);
            }
        }
    }

    /// Add a single character with no owning identifier.
    pub fn add_char(&mut self, c: char) {
        self.chars.insert(c);
    }

    /// Add one character attributed to an identifier, without case
    /// expansion. The first owner of a character wins.
    pub fn add_owned_char(&mut self, c: char, identity: &str) {
        self.insert(c, identity);
    }

    fn insert(&mut self, c: char, identity: &str) {
        if self.chars.insert(c) {
            self.owners.insert(c, identity.to_string());
        }
    }

    /// All required characters, ordered by code point.
    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.chars.iter().copied()
    }

    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Identifier that first required a character, if any did (the
    /// always-include set has no owner).
    pub fn owner(&self, c: char) -> Option<&str> {
        self.owners.get(&c).map(String::as_str)
    }
}
