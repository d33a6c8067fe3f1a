use std::{collections::HashMap, fs, path::Path, str::FromStr, time::Duration};

use client_core::Locale;
use tracing::warn;

pub const CONFIG_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub locale: Locale,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:5000".into(),
            locale: Locale::Ru,
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(CONFIG_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then the config file, then environment variables.
pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("server_url").and_then(toml::Value::as_str) {
                    settings.server_url = v.to_string();
                }
                if let Some(v) = file_cfg.get("locale").and_then(toml::Value::as_str) {
                    apply_locale(&mut settings, v);
                }
                if let Some(v) = file_cfg
                    .get("request_timeout_secs")
                    .and_then(toml::Value::as_integer)
                {
                    settings.request_timeout_secs = u64::try_from(v).ok();
                }
            }
            Err(err) => warn!(path = %path.display(), error = %err, "ignoring unreadable config file"),
        }
    }

    if let Some(v) = env("TRUCK_COUNTER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = env("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = env("APP__LOCALE") {
        apply_locale(&mut settings, &v);
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_secs = Some(parsed);
        }
    }

    settings
}

fn apply_locale(settings: &mut Settings, raw: &str) {
    match Locale::from_str(raw) {
        Ok(locale) => settings.locale = locale,
        Err(err) => warn!(error = %err, "keeping locale {:?}", settings.locale),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
