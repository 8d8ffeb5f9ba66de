use thiserror::Error;

/// Top-level error type for signshuffle core types.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("letter keys must be a single character, got {0:?}")]
    InvalidLetterKey(String),
}
