//! Config validation with user-friendly error messages.

use crate::schema::SignShuffleConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Emit every finding through `tracing`.
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &SignShuffleConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_oracle(config, &mut report);
    validate_upload(config, &mut report);
    validate_client(config, &mut report);
    report
}

fn validate_server(config: &SignShuffleConfig, report: &mut ValidationReport) {
    if config.server.port == 0 {
        report.error("server.port", "port must be > 0");
    } else if config.server.port < 1024 {
        report.warn(
            "server.port",
            format!(
                "Port {} requires elevated privileges; consider using a port >= 1024",
                config.server.port
            ),
        );
    }
    if config.server.bind_address.trim().is_empty() {
        report.error("server.bind_address", "bind address cannot be empty");
    }
}

fn validate_oracle(config: &SignShuffleConfig, report: &mut ValidationReport) {
    let oracle = &config.oracle;
    if oracle.api_key.as_deref().map(str::is_empty).unwrap_or(true) {
        report.warn("oracle.api_key", "No oracle API key configured; set GEMINI_API_KEY");
    }
    if oracle.model.trim().is_empty() {
        report.error("oracle.model", "model cannot be empty");
    }
    if !(0.0..=2.0).contains(&oracle.temperature) {
        report.error("oracle.temperature", "temperature must be between 0.0 and 2.0");
    }
}

fn validate_upload(config: &SignShuffleConfig, report: &mut ValidationReport) {
    if config.upload.transport_limit_bytes == 0 {
        report.error("upload.transport_limit_bytes", "limit must be > 0");
    }
    if config.upload.oracle_limit_bytes == 0 {
        report.error("upload.oracle_limit_bytes", "limit must be > 0");
    }
}

fn validate_client(config: &SignShuffleConfig, report: &mut ValidationReport) {
    let client = &config.client;
    if !client.gateway_url.starts_with("http://") && !client.gateway_url.starts_with("https://") {
        report.error("client.gateway_url", "gateway URL must start with http:// or https://");
    }
    if client.progress_tick_ms == 0 {
        report.error("client.progress_tick_ms", "tick must be >= 1ms");
    }
    if client.progress_duration_ms < client.progress_tick_ms {
        report.warn(
            "client.progress_duration_ms",
            "duration shorter than one tick; progress will jump straight to the end",
        );
    }
}
