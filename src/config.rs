use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};

const DEFAULT_STOREFRONT: &str = "us";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub spotify: SpotifyConfig,
    pub apple_music: AppleMusicConfig,
}

/// Destination account and playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Account identifier, used to key the token cache
    pub username: String,
    pub playlist_id: String,
}

/// Source playlist and developer key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppleMusicConfig {
    pub playlist_id: String,
    pub secret_key_path: String,
    pub key_id: String,
    pub team_id: String,
    #[serde(default = "default_storefront")]
    pub storefront: String,
}

fn default_storefront() -> String {
    DEFAULT_STOREFRONT.to_string()
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration key `{0}`")]
    MissingKey(&'static str),
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context(format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Read `SPOTIFY_*` and `APPLE_*` variables, as set directly or through `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingKey(key))
        };

        Ok(Config {
            spotify: SpotifyConfig {
                client_id: required("SPOTIFY_CLIENT_ID")?,
                client_secret: required("SPOTIFY_CLIENT_SECRET")?,
                redirect_uri: required("SPOTIFY_REDIRECT_URI")?,
                username: required("SPOTIFY_USERNAME")?,
                playlist_id: required("SPOTIFY_PLAYLIST_ID")?,
            },
            apple_music: AppleMusicConfig {
                playlist_id: required("APPLE_PLAYLIST_ID")?,
                secret_key_path: required("APPLE_SECRET_KEY_PATH")?,
                key_id: required("APPLE_KEY_ID")?,
                team_id: required("APPLE_TEAM_ID")?,
                storefront: lookup("APPLE_STOREFRONT")
                    .filter(|value| !value.trim().is_empty())
                    .unwrap_or_else(default_storefront),
            },
        })
    }

    /// Get the default config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|path| path.join("playlist-sync").join("config.toml"))
    }

    /// Use `explicit` if given, else the default file if it exists, else the environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => {
                tracing::debug!("No config file found, reading configuration from environment");
                Ok(Self::from_env()?)
            }
        }
    }

    /// Write a template config file, unless one exists. Returns its path.
    pub fn create_default() -> Result<PathBuf> {
        let path = Self::config_path().ok_or(eyre!("No config directory on this platform"))?;
        Self::write_template(&path)?;
        Ok(path)
    }

    fn write_template(path: &Path) -> Result<()> {
        if path.exists() {
            tracing::info!("Config file already exists at {}", path.display());
            return Ok(());
        }

        let template = Config {
            spotify: SpotifyConfig {
                client_id: "your-spotify-client-id".into(),
                client_secret: "your-spotify-client-secret".into(),
                redirect_uri: "http://127.0.0.1:8888/callback".into(),
                username: "your-spotify-username".into(),
                playlist_id: "destination-playlist-id".into(),
            },
            apple_music: AppleMusicConfig {
                playlist_id: "pl.source-playlist-id".into(),
                secret_key_path: "~/.config/playlist-sync/AuthKey.p8".into(),
                key_id: "your-key-id".into(),
                team_id: "your-team-id".into(),
                storefront: default_storefront(),
            },
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }
        std::fs::write(path, toml::to_string_pretty(&template)?)
            .context(format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Expand ~ to home directory
    fn expand_path(path: &str) -> PathBuf {
        if let Some(rest) = path.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return home.join(rest);
        }
        PathBuf::from(path)
    }

    /// Get expanded path of the Apple Music private key
    pub fn secret_key_path(&self) -> PathBuf {
        Self::expand_path(&self.apple_music.secret_key_path)
    }
}
