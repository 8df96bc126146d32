//! # sagitta-settings
//!
//! Configuration for the Sagitta messaging client, loaded from three layers
//! (lowest to highest priority):
//! 1. **Compiled defaults** — [`SagittaSettings::default()`]
//! 2. **User file** — `~/.sagitta/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `SAGITTA_*` overrides
//!
//! ```no_run
//! use sagitta_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("reconnect attempts: {}", settings.socket.reconnect_attempts);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings, load_settings_from_path,
    settings_path,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<SagittaSettings> = OnceLock::new();

/// Global settings, loaded on first access.
///
/// Falls back to compiled defaults when the settings file cannot be read or
/// parsed.
pub fn get_settings() -> &'static SagittaSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            SagittaSettings::default()
        })
    })
}

/// Install `settings` as the global value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: SagittaSettings) -> std::result::Result<(), SagittaSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_client_defaults() {
        let settings = SagittaSettings::default();
        assert_eq!(settings.socket.reconnect_attempts, 5);
        assert_eq!(settings.socket.reconnect_interval_ms, 3_000);
        assert_eq!(settings.socket.heartbeat_interval_ms, 30_000);
        assert!(settings.socket.protocols.is_empty());
        assert_eq!(settings.chat.session_type, "default");
        assert_eq!(settings.logging.level, "warn");
    }

    #[test]
    fn re_exports_work() {
        let merged = deep_merge(serde_json::json!({"a": 1}), serde_json::json!({"b": 2}));
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
        let _ = settings_path();
    }
}
