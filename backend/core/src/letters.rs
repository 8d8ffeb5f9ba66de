//! Letter multiset codec.
//!
//! Text is normalized by dropping literal spaces and folding to upper case, then
//! tallied into a [`LetterCount`]. The same codec feeds the extraction gateway and the
//! client-side sentence validator, so both sides agree on what a "letter" is.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::SignError;

/// Character-frequency mapping. Every key is one character and every count is at
/// least 1. Iteration follows first-seen order; equality ignores order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IndexMap<String, u32>")]
pub struct LetterCount(IndexMap<char, u32>);

impl LetterCount {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count of `token`, or 0 when it never appeared.
    pub fn get(&self, token: char) -> u32 {
        self.0.get(&token).copied().unwrap_or(0)
    }

    pub fn contains(&self, token: char) -> bool {
        self.0.contains_key(&token)
    }

    /// Number of distinct characters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.0.values().map(|&n| u64::from(n)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, u32)> + '_ {
        self.0.iter().map(|(&c, &n)| (c, n))
    }

    /// Record one more occurrence of `token`.
    pub fn add(&mut self, token: char) {
        *self.0.entry(token).or_insert(0) += 1;
    }

    /// Keys repeated by their counts, in insertion order.
    pub fn to_letter_string(&self) -> String {
        self.iter()
            .flat_map(|(c, n)| std::iter::repeat(c).take(n as usize))
            .collect()
    }
}

impl fmt::Display for LetterCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (c, n) in self.iter() {
            if !first {
                f.write_str(" ")?;
            }
            write!(f, "{c}x{n}")?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for LetterCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl TryFrom<IndexMap<String, u32>> for LetterCount {
    type Error = SignError;

    fn try_from(raw: IndexMap<String, u32>) -> Result<Self, Self::Error> {
        let mut map = IndexMap::with_capacity(raw.len());
        for (key, count) in raw {
            let mut chars = key.chars();
            let token = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(SignError::InvalidLetterKey(key)),
            };
            if count == 0 {
                continue;
            }
            *map.entry(token).or_insert(0) += count;
        }
        Ok(Self(map))
    }
}

impl FromIterator<char> for LetterCount {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        let mut letters = Self::new();
        for c in iter {
            letters.add(c);
        }
        letters
    }
}

/// Strip literal spaces and fold to upper case. Other whitespace, digits and
/// punctuation pass through untouched.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|&c| c != ' ')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Tally the normalized characters of `text`. Keys keep the order in which they
/// first appear; they are never sorted.
pub fn tally(text: &str) -> LetterCount {
    normalize(text).chars().collect()
}
