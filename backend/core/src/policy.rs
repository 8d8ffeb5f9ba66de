//! Upload acceptance rules.
//!
//! The client checks a file against [`UploadPolicy`] before submitting it and the
//! extraction gateway re-checks the decoded payload against the same policy. Both
//! sides must build their policy from the same limits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MIME types the extraction gateway accepts.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png"];

/// Largest request body the synchronous transport carries.
pub const DEFAULT_TRANSPORT_LIMIT_BYTES: usize = 4_500_000;

/// Largest inline image the oracle accepts without streaming.
pub const DEFAULT_ORACLE_LIMIT_BYTES: usize = 20_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("Unsupported file type")]
    UnsupportedType(String),

    #[error("File too large")]
    TooLarge { size: usize, limit: usize },

    #[error("Select exactly one image")]
    WrongFileCount(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPolicy {
    pub transport_limit_bytes: usize,
    pub oracle_limit_bytes: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            transport_limit_bytes: DEFAULT_TRANSPORT_LIMIT_BYTES,
            oracle_limit_bytes: DEFAULT_ORACLE_LIMIT_BYTES,
        }
    }
}

impl UploadPolicy {
    pub fn new(transport_limit_bytes: usize, oracle_limit_bytes: usize) -> Self {
        Self {
            transport_limit_bytes,
            oracle_limit_bytes,
        }
    }

    /// The binding limit: whichever of the two ceilings is smaller.
    pub fn max_bytes(&self) -> usize {
        self.transport_limit_bytes.min(self.oracle_limit_bytes)
    }

    pub fn accepts_type(mime_type: &str) -> bool {
        ACCEPTED_MIME_TYPES.contains(&mime_type)
    }

    /// A payload passes when its decoded size is strictly below [`Self::max_bytes`].
    pub fn check_size(&self, size: usize) -> Result<(), PolicyViolation> {
        let limit = self.max_bytes();
        if size >= limit {
            return Err(PolicyViolation::TooLarge { size, limit });
        }
        Ok(())
    }

    pub fn check_type(&self, mime_type: &str) -> Result<(), PolicyViolation> {
        if !Self::accepts_type(mime_type) {
            return Err(PolicyViolation::UnsupportedType(mime_type.to_string()));
        }
        Ok(())
    }

    pub fn check(&self, mime_type: &str, size: usize) -> Result<(), PolicyViolation> {
        self.check_type(mime_type)?;
        self.check_size(size)
    }

    pub fn check_count(&self, count: usize) -> Result<(), PolicyViolation> {
        if count != 1 {
            return Err(PolicyViolation::WrongFileCount(count));
        }
        Ok(())
    }
}
