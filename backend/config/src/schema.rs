//! Typed configuration schema.
//!
//! Every section carries `#[serde(default)]`, so a partial YAML file (or none at
//! all) yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use signshuffle_core::policy::{
    UploadPolicy, DEFAULT_ORACLE_LIMIT_BYTES, DEFAULT_TRANSPORT_LIMIT_BYTES,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignShuffleConfig {
    pub server: ServerConfig,
    pub oracle: OracleConfig,
    pub upload: UploadConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-1.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 1.0,
        }
    }
}

// Debug output masks `api_key`.
impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub transport_limit_bytes: usize,
    pub oracle_limit_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            transport_limit_bytes: DEFAULT_TRANSPORT_LIMIT_BYTES,
            oracle_limit_bytes: DEFAULT_ORACLE_LIMIT_BYTES,
        }
    }
}

impl UploadConfig {
    /// The policy both the client pre-check and the gateway re-check use.
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.transport_limit_bytes, self.oracle_limit_bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub gateway_url: String,
    /// Nominal duration of each progress segment.
    pub progress_duration_ms: u64,
    pub progress_tick_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8080".to_string(),
            progress_duration_ms: 3_000,
            progress_tick_ms: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, NDJSON logs are also written here with daily rotation.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg: SignShuffleConfig = serde_yaml::from_str("server:\n  port: 9000\n").unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.bind_address, "0.0.0.0");
        assert_eq!(cfg.client.progress_duration_ms, 3_000);
    }

    #[test]
    fn debug_hides_api_key() {
        let oracle = OracleConfig {
            api_key: Some("AIza-secret".into()),
            ..Default::default()
        };
        let printed = format!("{oracle:?}");
        assert!(!printed.contains("AIza-secret"));
    }

    #[test]
    fn upload_policy_uses_both_limits() {
        let upload = UploadConfig {
            transport_limit_bytes: 30_000_000,
            oracle_limit_bytes: 20_000_000,
        };
        assert_eq!(upload.policy().max_bytes(), 20_000_000);
    }
}
