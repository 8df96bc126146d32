//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SagittaSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `SAGITTA_*` environment overrides
//! 4. Validate
//!
//! Deep merge rules: objects merge per key, arrays and primitives are
//! replaced, `null` in the file keeps the default.

use std::path::{Path, PathBuf};

use sagitta_core::logging::LogFormat;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::SagittaSettings;

/// Env var naming an alternative settings file.
pub const SETTINGS_PATH_ENV: &str = "SAGITTA_SETTINGS";

/// Resolve the settings file path.
///
/// `SAGITTA_SETTINGS` wins; otherwise `~/.sagitta/settings.json`.
pub fn settings_path() -> PathBuf {
    if let Some(path) = std::env::var_os(SETTINGS_PATH_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".sagitta").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<SagittaSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults; an unreadable or malformed file is an error.
pub fn load_settings_from_path(path: &Path) -> Result<SagittaSettings> {
    let mut settings = read_layered(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn read_layered(path: &Path) -> Result<SagittaSettings> {
    let defaults = serde_json::to_value(SagittaSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of `source` over `target`.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `SAGITTA_*` overrides from the process environment.
pub fn apply_env_overrides(settings: &mut SagittaSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply `SAGITTA_*` overrides using `lookup` as the variable source.
///
/// Values that fail to parse or fall outside their range are ignored with a
/// warning, keeping the file/default value.
pub fn apply_overrides_from<F>(settings: &mut SagittaSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup };

    // ── Socket ──────────────────────────────────────────────────────
    if let Some(v) = env.u32_in("SAGITTA_RECONNECT_ATTEMPTS", 0, 1_000) {
        settings.socket.reconnect_attempts = v;
    }
    if let Some(v) = env.u64_in("SAGITTA_RECONNECT_INTERVAL_MS", 10, 600_000) {
        settings.socket.reconnect_interval_ms = v;
    }
    if let Some(v) = env.u64_in("SAGITTA_HEARTBEAT_INTERVAL_MS", 1_000, 600_000) {
        settings.socket.heartbeat_interval_ms = v;
    }
    if let Some(v) = env.string("SAGITTA_PROTOCOLS") {
        settings.socket.protocols = parse_list(&v);
    }

    // ── Chat ────────────────────────────────────────────────────────
    if let Some(v) = env.string("SAGITTA_WS_URL") {
        settings.chat.base_ws_url = v;
    }
    if let Some(v) = env.string("SAGITTA_SESSION_TYPE") {
        settings.chat.session_type = v;
    }
    if let Some(v) = env.string("SAGITTA_ASSISTANT_NAME") {
        settings.chat.assistant_name = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("SAGITTA_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("SAGITTA_LOG_FORMAT") {
        match LogFormat::parse(&v) {
            Some(format) => settings.logging.format = format,
            None => warn!(key = "SAGITTA_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

/// Reject values that would make the client unusable.
pub fn validate(settings: &SagittaSettings) -> Result<()> {
    if settings.socket.heartbeat_interval_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "socket.heartbeatIntervalMs must be greater than 0".into(),
        ));
    }
    if settings.socket.reconnect_interval_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "socket.reconnectIntervalMs must be greater than 0".into(),
        ));
    }
    if settings.chat.base_ws_url.trim().is_empty() {
        return Err(SettingsError::InvalidValue("chat.baseWsUrl is empty".into()));
    }
    Ok(())
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a `u32` within `[min, max]`.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u64` within `[min, max]`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn u32_in(&self, name: &str, min: u32, max: u32) -> Option<u32> {
        let val = (self.lookup)(name)?;
        let parsed = parse_u32_range(&val, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %val, "invalid u32 env var, ignoring");
        }
        parsed
    }

    fn u64_in(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        let val = (self.lookup)(name)?;
        let parsed = parse_u64_range(&val, min, max);
        if parsed.is_none() {
            warn!(key = name, value = %val, "invalid u64 env var, ignoring");
        }
        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override_keeps_siblings() {
        let target = serde_json::json!({"socket": {"reconnectAttempts": 5, "protocols": []}});
        let source = serde_json::json!({"socket": {"reconnectAttempts": 1}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["socket"]["reconnectAttempts"], 1);
        assert_eq!(merged["socket"]["protocols"], serde_json::json!([]));
    }

    #[test]
    fn merge_array_replaces() {
        let target = serde_json::json!({"protocols": ["a", "b"]});
        let source = serde_json::json!({"protocols": ["c"]});
        assert_eq!(deep_merge(target, source)["protocols"], serde_json::json!(["c"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"a": null});
        assert_eq!(deep_merge(target, source)["a"], 1);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let settings = read_layered(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.socket.reconnect_attempts, 5);
    }

    #[test]
    fn partial_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"socket": {"reconnectAttempts": 3, "protocols": ["chat.v1"]}, "chat": {"baseWsUrl": "wss://chat.example"}}"#,
        )
        .unwrap();

        let settings = read_layered(&path).unwrap();
        assert_eq!(settings.socket.reconnect_attempts, 3);
        assert_eq!(settings.socket.protocols, vec!["chat.v1".to_string()]);
        assert_eq!(settings.socket.heartbeat_interval_ms, 30_000);
        assert_eq!(settings.chat.base_ws_url, "wss://chat.example");
        assert_eq!(settings.chat.session_type, "default");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not json").unwrap();
        assert_matches!(read_layered(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn wrong_type_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"socket": {"reconnectAttempts": "many"}}"#).unwrap();
        assert_matches!(read_layered(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn zero_heartbeat_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"socket": {"heartbeatIntervalMs": 0}}"#).unwrap();
        let settings = read_layered(&path).unwrap();
        assert_matches!(validate(&settings), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn defaults_pass_validation() {
        validate(&SagittaSettings::default()).unwrap();
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = SagittaSettings::default();
        apply_overrides_from(
            &mut settings,
            env_of(&[
                ("SAGITTA_RECONNECT_ATTEMPTS", "3"),
                ("SAGITTA_RECONNECT_INTERVAL_MS", "1000"),
                ("SAGITTA_HEARTBEAT_INTERVAL_MS", "15000"),
                ("SAGITTA_PROTOCOLS", "chat.v1, chat.v2,,"),
                ("SAGITTA_WS_URL", "wss://example.test"),
                ("SAGITTA_LOG_LEVEL", "debug"),
                ("SAGITTA_LOG_FORMAT", "json"),
            ]),
        );
        assert_eq!(settings.socket.reconnect_attempts, 3);
        assert_eq!(settings.socket.reconnect_interval_ms, 1_000);
        assert_eq!(settings.socket.heartbeat_interval_ms, 15_000);
        assert_eq!(settings.socket.protocols, vec!["chat.v1", "chat.v2"]);
        assert_eq!(settings.chat.base_ws_url, "wss://example.test");
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = SagittaSettings::default();
        apply_overrides_from(
            &mut settings,
            env_of(&[
                ("SAGITTA_RECONNECT_ATTEMPTS", "lots"),
                ("SAGITTA_HEARTBEAT_INTERVAL_MS", "5"),
                ("SAGITTA_LOG_FORMAT", "xml"),
                ("SAGITTA_WS_URL", ""),
            ]),
        );
        assert_eq!(settings.socket.reconnect_attempts, 5);
        assert_eq!(settings.socket.heartbeat_interval_ms, 30_000);
        assert_eq!(settings.logging.format, LogFormat::Compact);
        assert_eq!(settings.chat.base_ws_url, "ws://127.0.0.1:8000");
    }

    #[test]
    fn zero_reconnect_attempts_is_allowed() {
        let mut settings = SagittaSettings::default();
        apply_overrides_from(&mut settings, env_of(&[("SAGITTA_RECONNECT_ATTEMPTS", "0")]));
        assert_eq!(settings.socket.reconnect_attempts, 0);
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u32_range("7", 0, 10), Some(7));
        assert_eq!(parse_u32_range("11", 0, 10), None);
        assert_eq!(parse_u64_range(" 3000 ", 10, 600_000), Some(3_000));
        assert_eq!(parse_u64_range("9", 10, 600_000), None);
        assert_eq!(parse_u64_range("-1", 0, 10), None);
    }

    #[test]
    fn parse_list_trims_and_skips_empty() {
        assert_eq!(parse_list(" a ,b,, c"), vec!["a", "b", "c"]);
        assert!(parse_list("").is_empty());
    }
}
