//! Environment handling for config values.
//!
//! String leaves may reference variables as `${VAR_NAME}` (upper-case names only);
//! they are resolved at load time. Selected settings can also be overridden by plain
//! environment variables after the file is parsed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::SignShuffleConfig;

static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value, MissingEnvVarError> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references using a provided map.
pub fn resolve_env_vars_with(
    value: &Value,
    env: &HashMap<String, String>,
) -> Result<Value, MissingEnvVarError> {
    substitute_value(value, env, "")
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_string(s, env, path).map(Value::String),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let child = if path.is_empty() {
                    k.clone()
                } else {
                    format!("{path}.{k}")
                };
                out.insert(k.clone(), substitute_value(v, env, &child)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for caps in ENV_VAR_PATTERN.captures_iter(s) {
        let Some(whole) = caps.get(0) else { continue };
        let var_name = &caps[1];
        let value = env
            .get(var_name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MissingEnvVarError {
                var_name: var_name.to_string(),
                config_path: path.to_string(),
            })?;
        out.push_str(&s[last..whole.start()]);
        out.push_str(value);
        last = whole.end();
    }
    out.push_str(&s[last..]);
    Ok(out)
}

/// Apply `SIGNSHUFFLE_*` and `GEMINI_API_KEY` overrides from the process environment.
pub fn apply_env_overrides(config: SignShuffleConfig) -> SignShuffleConfig {
    apply_env_overrides_with(config, |name| std::env::var(name).ok())
}

/// Apply overrides using a custom lookup. Unparseable numeric values are ignored
/// with a warning.
pub fn apply_env_overrides_with(
    mut config: SignShuffleConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> SignShuffleConfig {
    if let Some(bind) = lookup("SIGNSHUFFLE_BIND") {
        config.server.bind_address = bind;
    }
    if let Some(port) = lookup("SIGNSHUFFLE_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid SIGNSHUFFLE_PORT"),
        }
    }
    if let Some(url) = lookup("SIGNSHUFFLE_GATEWAY_URL") {
        config.client.gateway_url = url;
    }
    if let Some(model) = lookup("SIGNSHUFFLE_MODEL") {
        config.oracle.model = model;
    }
    if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.is_empty()) {
        config.oracle.api_key = Some(key);
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn substitutes_nested_var() {
        let v = json!({"oracle": {"api_key": "${GEMINI_API_KEY}"}});
        let result = resolve_env_vars_with(&v, &env(&[("GEMINI_API_KEY", "AIza-abc")])).unwrap();
        assert_eq!(result["oracle"]["api_key"], "AIza-abc");
    }

    #[test]
    fn substitutes_inside_larger_string() {
        let v = json!({"url": "http://${HOST}:${PORT}/api"});
        let result =
            resolve_env_vars_with(&v, &env(&[("HOST", "localhost"), ("PORT", "9000")])).unwrap();
        assert_eq!(result["url"], "http://localhost:9000/api");
    }

    #[test]
    fn missing_var_names_path() {
        let v = json!({"oracle": {"api_key": "${NOPE}"}});
        let err = resolve_env_vars_with(&v, &HashMap::new()).unwrap_err();
        assert_eq!(err.var_name, "NOPE");
        assert_eq!(err.config_path, "oracle.api_key");
    }

    #[test]
    fn lower_case_references_are_left_alone() {
        let v = json!({"note": "${not_a_var}"});
        let result = resolve_env_vars_with(&v, &HashMap::new()).unwrap();
        assert_eq!(result["note"], "${not_a_var}");
    }

    #[test]
    fn overrides_apply_and_bad_port_is_ignored() {
        let vars = env(&[
            ("SIGNSHUFFLE_PORT", "not-a-port"),
            ("SIGNSHUFFLE_GATEWAY_URL", "http://gw:1234"),
            ("GEMINI_API_KEY", "AIza-xyz"),
        ]);
        let cfg = apply_env_overrides_with(SignShuffleConfig::default(), |k| vars.get(k).cloned());
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.client.gateway_url, "http://gw:1234");
        assert_eq!(cfg.oracle.api_key.as_deref(), Some("AIza-xyz"));
    }
}
