//! Sentence validator: decides whether a candidate sentence fits inside the
//! letters found in the source image.

use serde::{Deserialize, Serialize};

use crate::letters::{tally, LetterCount};

/// A candidate sentence paired with its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub sentence: String,
    pub valid: bool,
}

impl Verdict {
    pub fn judge(sentence: impl Into<String>, reference: &LetterCount) -> Self {
        let sentence = sentence.into();
        let valid = is_valid(&sentence, reference);
        Self { sentence, valid }
    }
}

/// Why a sentence failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The sentence uses a letter the source never had.
    Unknown { token: char, used: u32 },
    /// The sentence uses a letter more often than the source allows.
    Overused { token: char, used: u32, available: u32 },
}

/// Every violation in `sentence`, in the order its letters first appear.
pub fn check(sentence: &str, reference: &LetterCount) -> Vec<Violation> {
    tally(sentence)
        .iter()
        .filter_map(|(token, used)| {
            if !reference.contains(token) {
                Some(Violation::Unknown { token, used })
            } else {
                let available = reference.get(token);
                (used > available).then_some(Violation::Overused {
                    token,
                    used,
                    available,
                })
            }
        })
        .collect()
}

/// True when the sentence's letters form a sub-multiset of `reference`.
/// Unused reference letters are fine.
pub fn is_valid(sentence: &str, reference: &LetterCount) -> bool {
    check(sentence, reference).is_empty()
}

/// Judge every sentence, keeping the order they were given in.
pub fn annotate<I, S>(sentences: I, reference: &LetterCount) -> Vec<Verdict>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    sentences
        .into_iter()
        .map(|s| Verdict::judge(s, reference))
        .collect()
}
