use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};

use crate::spotify_rs::types::SpotifyTokenResponse;

/// Tokens this close to expiry are treated as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A Spotify token as stored on disk between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix timestamp (seconds)
    pub expires_at: i64,
    #[serde(default)]
    pub scope: String,
}

impl CachedToken {
    /// `previous_refresh_token` is kept when a refresh response omits a new one.
    pub fn from_response(
        response: SpotifyTokenResponse,
        now: i64,
        previous_refresh_token: Option<&str>,
    ) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .or_else(|| previous_refresh_token.map(str::to_string)),
            expires_at: now + response.expires_in as i64,
            scope: response.scope,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now + EXPIRY_MARGIN_SECS >= self.expires_at
    }
}

/// JSON file holding one account's token.
pub struct TokenCache {
    path: PathBuf,
}

impl TokenCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<cache dir>/playlist-sync/spotify-token-<account>.json`
    pub fn for_account(account: &str) -> Option<Self> {
        dirs::cache_dir().map(|dir| {
            Self::new(
                dir.join("playlist-sync")
                    .join(format!("spotify-token-{}.json", account)),
            )
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when nothing has been cached yet.
    pub fn load(&self) -> Result<Option<CachedToken>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .wrap_err_with(|| format!("Failed to read token cache: {}", self.path.display()))?;
        let token = serde_json::from_str(&contents)
            .wrap_err_with(|| format!("Failed to parse token cache: {}", self.path.display()))?;
        Ok(Some(token))
    }

    pub fn store(&self, token: &CachedToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).wrap_err_with(|| {
                format!("Failed to create token cache directory: {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, contents)
            .wrap_err_with(|| format!("Failed to write token cache: {}", self.path.display()))?;
        Ok(())
    }
}
