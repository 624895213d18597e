//! Locale-specific ordering of topic titles and categories

use std::cmp::Ordering;
use std::collections::HashMap;

/// Rank given to letters outside the alphabet, before adding the code point
const UNKNOWN_LETTER_BASE: u32 = 1000;

/// Orders strings by a per-character sort key
pub trait Collation: Send + Sync {
    /// Sort key of a string; compared lexicographically
    fn sort_key(&self, text: &str) -> Vec<u32>;

    fn compare(&self, a: &str, b: &str) -> Ordering {
        self.sort_key(a).cmp(&self.sort_key(b))
    }
}

/// Collation by position in a fixed lowercase alphabet
///
/// Text is lowercased; letters in the alphabet rank by position, other letters
/// rank after every alphabet letter by code point, and non-letters are ignored.
#[derive(Debug, Clone)]
pub struct AlphabetCollation {
    ranks: HashMap<char, u32>,
}

impl AlphabetCollation {
    pub fn new(alphabet: &str) -> Self {
        let ranks = alphabet
            .chars()
            .flat_map(char::to_lowercase)
            .zip(0u32..)
            .collect();
        Self { ranks }
    }

    /// Polish alphabet order
    pub fn polish() -> Self {
        Self::new(super::POLISH_ALPHABET)
    }
}

impl Collation for AlphabetCollation {
    fn sort_key(&self, text: &str) -> Vec<u32> {
        text.chars()
            .flat_map(char::to_lowercase)
            .filter(|c| c.is_alphabetic())
            .map(|c| {
                self.ranks
                    .get(&c)
                    .copied()
                    .unwrap_or(UNKNOWN_LETTER_BASE + c as u32)
            })
            .collect()
    }
}
