//! Structured logging for signshuffle.
//!
//! Console output, optional daily-rolling NDJSON files, and redaction of API keys and
//! inline image payloads before they are logged.

pub mod logger;
pub mod redact;

pub use logger::init_logger;
pub use redact::redact_sensitive_data;
