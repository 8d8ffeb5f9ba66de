//! Log Redaction Layer
//!
//! Scrubs oracle API keys and inline base64 image data from strings prior to logging.

use regex::Regex;
use std::sync::LazyLock;

static GOOGLE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AIza[0-9A-Za-z_\-]{35}").unwrap());
static KEY_PARAM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&]key=)[^&\s]+").unwrap());
static DATA_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(data:[\w/+.\-]+;base64,)[A-Za-z0-9+/=]{16,}").unwrap());

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = KEY_PARAM_RE.replace_all(input, "${1}[REDACTED_KEY]");
    let redacted = GOOGLE_KEY_RE.replace_all(&redacted, "[REDACTED_KEY]");
    DATA_URL_RE
        .replace_all(&redacted, "${1}[IMAGE_DATA]")
        .into_owned()
}
