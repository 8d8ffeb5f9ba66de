//! `signshuffle-config`: runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, oracle, upload limits, client, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - `SIGNSHUFFLE_*` environment overrides
//! - Validation report

pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use env::{apply_env_overrides, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, parse_config};
pub use schema::{
    ClientConfig, LoggingConfig, OracleConfig, ServerConfig, SignShuffleConfig, UploadConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Load a config file, apply env overrides, and validate.
///
/// This is the main entry point for loading a config at runtime. The report is
/// returned rather than logged because the logger itself is configured from the
/// result; callers decide whether errors are fatal.
pub async fn load_and_prepare(path: &Path) -> Result<(SignShuffleConfig, ValidationReport)> {
    let config = load_config(path).await?;
    let config = apply_env_overrides(config);
    let report = validate(&config);
    Ok((config, report))
}
