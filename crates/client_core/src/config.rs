use std::{collections::HashMap, fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_SETTINGS_FILE: &str = "tutorial.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSettings {
    pub api_base: String,
    pub request_timeout_secs: u64,
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            request_timeout_secs: 30,
            log_filter: "info".into(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Defaults, then `tutorial.toml` in the working directory, then the process
/// environment.
pub fn load_settings() -> ClientSettings {
    let mut settings = ClientSettings::default();
    if let Ok(raw) = fs::read_to_string(DEFAULT_SETTINGS_FILE) {
        apply_file_settings(&mut settings, &raw);
    }
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Like [`load_settings`] but with an explicit file that must exist.
pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
    let mut settings = ClientSettings::default();
    apply_file_settings(&mut settings, &raw);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    Ok(settings)
}

fn apply_file_settings(settings: &mut ClientSettings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("config: ignoring unparsable settings file");
        return;
    };

    if let Some(v) = file_cfg.get("api_base").and_then(|v| v.as_str()) {
        settings.api_base = normalize_api_base(v);
    }
    if let Some(v) = file_cfg.get("request_timeout_secs").and_then(|v| v.as_integer()) {
        if let Ok(secs) = u64::try_from(v) {
            settings.request_timeout_secs = secs;
        }
    }
    if let Some(v) = file_cfg.get("log_filter").and_then(|v| v.as_str()) {
        settings.log_filter = v.to_string();
    }
}

pub(crate) fn apply_env_overrides(
    settings: &mut ClientSettings,
    env: impl Fn(&str) -> Option<String>,
) {
    if let Some(v) = env("CQ_TUTORIAL_API_BASE") {
        settings.api_base = normalize_api_base(&v);
    }
    if let Some(v) = env("APP__API_BASE") {
        settings.api_base = normalize_api_base(&v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.trim().parse::<u64>() {
            settings.request_timeout_secs = parsed;
        }
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

pub fn normalize_api_base(raw_api_base: &str) -> String {
    let raw_api_base = raw_api_base.trim().trim_end_matches('/');

    if raw_api_base.is_empty() {
        return ClientSettings::default().api_base;
    }

    if raw_api_base.contains("://") {
        return raw_api_base.to_string();
    }

    format!("http://{raw_api_base}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
