//! Optional config file loading. Search order: ./skynovels.toml, then
//! $XDG_CONFIG_HOME/skynovels/config.toml (or ~/.config/skynovels/config.toml).

use crate::provider::ProviderSettings;
use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Default output directory for `dump` when -o is not set. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Delay in seconds between requests.
    pub request_delay_secs: Option<u64>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Site URL; also sent as referer.
    pub main_url: Option<String>,
    /// API root, e.g. https://api.skynovels.net/api.
    pub api_base: Option<String>,
    /// Chapter list query strings, tried in order (e.g. ["page=1&limit=5000", "page=1"]).
    pub chapter_endpoints: Option<Vec<String>>,
    /// CSS selectors for chapter content, tried in order.
    pub content_selectors: Option<Vec<String>>,
}

impl Config {
    /// Provider settings with this config's overrides applied on top of the defaults.
    /// Empty lists are ignored so a stray `[]` cannot disable a fallback chain.
    pub fn provider_settings(&self) -> ProviderSettings {
        let defaults = ProviderSettings::default();
        let trim_slash = |s: &String| s.trim_end_matches('/').to_string();
        ProviderSettings {
            main_url: self
                .main_url
                .as_ref()
                .map(trim_slash)
                .unwrap_or(defaults.main_url),
            api_base: self
                .api_base
                .as_ref()
                .map(trim_slash)
                .unwrap_or(defaults.api_base),
            chapter_endpoints: self
                .chapter_endpoints
                .clone()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.chapter_endpoints),
            content_selectors: self
                .content_selectors
                .clone()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.content_selectors),
        }
    }
}

/// Search order: (1) ./skynovels.toml, (2) $XDG_CONFIG_HOME/skynovels/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("skynovels.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("skynovels").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "loaded config");
            return Ok(Some(config));
        }
    }
    Ok(None)
}
