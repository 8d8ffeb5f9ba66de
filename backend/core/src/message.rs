use serde::{Deserialize, Serialize};

use crate::letters::LetterCount;

/// Body of `POST /api/get-letters`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub filetype: String,
    /// Data-URL style payload, e.g. `data:image/png;base64,iVBOR...`.
    pub filedata: String,
}

impl ExtractRequest {
    /// The base64 part of `filedata`: everything after the first comma, or the
    /// whole string when there is no comma.
    pub fn payload(&self) -> &str {
        match self.filedata.find(',') {
            Some(idx) => &self.filedata[idx + 1..],
            None => &self.filedata,
        }
    }
}

/// Body of `POST /api/get-sentences`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub letters: LetterCount,
}
