use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// URL of the page hosting the controller. The message origin and the
    /// OAuth redirect URI are both derived from it.
    #[serde(default = "default_host_url")]
    pub host_url: String,
    #[serde(default = "default_accounts_url")]
    pub accounts_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_poll_spacing_ms")]
    pub poll_spacing_ms: u64,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    #[serde(default = "default_overlay_fade_ms")]
    pub overlay_fade_ms: u64,
    #[serde(default = "default_haptic_ms")]
    pub haptic_ms: u64,
    #[serde(default)]
    pub background_link: Option<String>,
}

fn default_client_id() -> String {
    "282dc0486ba74b6d8a9acde0fee407f4".to_string()
}

fn default_scope() -> String {
    "user-modify-playback-state user-read-playback-state".to_string()
}

fn default_host_url() -> String {
    "http://localhost:5173/index.html".to_string()
}

fn default_accounts_url() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_api_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_poll_spacing_ms() -> u64 {
    4500
}

fn default_settle_delay_ms() -> u64 {
    300
}

fn default_overlay_fade_ms() -> u64 {
    210
}

fn default_haptic_ms() -> u64 {
    300
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            scope: default_scope(),
            host_url: default_host_url(),
            accounts_url: default_accounts_url(),
            api_url: default_api_url(),
            poll_spacing_ms: default_poll_spacing_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            overlay_fade_ms: default_overlay_fade_ms(),
            haptic_ms: default_haptic_ms(),
            background_link: None,
        }
    }
}

impl AppConfig {
    pub fn config_dir() -> AppResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot find home directory".into()))?;
        Ok(home.join(".playerify"))
    }

    pub fn config_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn load() -> AppResult<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Err(AppError::Config("Config file not found".into()));
        }
        let content = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load the saved config, falling back to (and persisting) the defaults.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config: {}. Using defaults.", e);
            let config = Self::default();
            if let Err(save_err) = config.save() {
                log::error!("Failed to save default config: {}", save_err);
            }
            config
        })
    }

    pub fn save(&self) -> AppResult<()> {
        let dir = Self::config_dir()?;
        std::fs::create_dir_all(&dir)?;
        let path = Self::config_path()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Replace the public client id with a user-registered one. Not saved.
    pub fn apply_custom_client_id(&mut self, client_id: &str) -> AppResult<()> {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            return Err(AppError::Config("Client ID cannot be empty".into()));
        }
        self.client_id = client_id.to_string();
        Ok(())
    }

    fn host(&self) -> AppResult<Url> {
        Url::parse(&self.host_url)
            .map_err(|e| AppError::Config(format!("Invalid host URL {}: {}", self.host_url, e)))
    }

    /// Origin (`scheme://host[:port]`) cross-window messages must come from.
    pub fn host_origin(&self) -> AppResult<String> {
        Ok(self.host()?.origin().ascii_serialization())
    }

    /// `oauth.html` next to the host page.
    pub fn redirect_uri(&self) -> AppResult<String> {
        let redirect = self
            .host()?
            .join("oauth.html")
            .map_err(|e| AppError::Config(e.to_string()))?;
        Ok(redirect.to_string())
    }

    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url.trim_end_matches('/'))
    }

    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url.trim_end_matches('/'))
    }

    pub fn poll_spacing(&self) -> Duration {
        Duration::from_millis(self.poll_spacing_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn overlay_fade(&self) -> Duration {
        Duration::from_millis(self.overlay_fade_ms)
    }
}
