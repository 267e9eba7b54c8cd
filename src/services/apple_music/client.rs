use std::path::PathBuf;

use color_eyre::eyre::{Result, WrapErr};
use reqwest::Client;
use tokio::sync::OnceCell;
use url::Url;

use crate::apple_music::{APPLE_MUSIC_API_URL, developer_token_from_file, get_playlist_tracks_page};
use crate::config::Config;
use crate::ports::source::SourceCatalog;

/// What is needed to mint an Apple Music developer token.
#[derive(Debug, Clone)]
pub struct AppleMusicCredentials {
    pub secret_key_path: PathBuf,
    pub key_id: String,
    pub team_id: String,
}

impl AppleMusicCredentials {
    pub fn from_config(config: &Config) -> Self {
        Self {
            secret_key_path: config.secret_key_path(),
            key_id: config.apple_music.key_id.clone(),
            team_id: config.apple_music.team_id.clone(),
        }
    }
}

pub struct AppleMusicHttpAdapter {
    client: Client,
    base_url: Url,
    storefront: String,
    credentials: AppleMusicCredentials,
    // Signed on first use so key problems surface as fetch failures
    developer_token: OnceCell<String>,
}

impl AppleMusicHttpAdapter {
    pub fn new(credentials: AppleMusicCredentials, storefront: String) -> Result<Self> {
        Ok(Self {
            client: Client::new(),
            base_url: Url::parse(APPLE_MUSIC_API_URL)?,
            storefront,
            credentials,
            developer_token: OnceCell::new(),
        })
    }

    async fn developer_token(&self) -> Result<&str> {
        let token = self
            .developer_token
            .get_or_try_init(|| async {
                developer_token_from_file(
                    &self.credentials.secret_key_path,
                    &self.credentials.key_id,
                    &self.credentials.team_id,
                )
                .wrap_err("Failed to create Apple Music developer token")
            })
            .await?;
        Ok(token.as_str())
    }
}

#[async_trait::async_trait]
impl SourceCatalog for AppleMusicHttpAdapter {
    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<serde_json::Value>> {
        let token = self.developer_token().await?;
        let page = get_playlist_tracks_page(
            &self.client,
            &self.base_url,
            token,
            &self.storefront,
            playlist_id,
            limit,
            offset,
        )
        .await?;
        tracing::debug!(
            offset,
            len = page.data.len(),
            has_next = page.next.is_some(),
            "Received Apple Music page"
        );
        Ok(page.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_key_fails_the_page_request() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = AppleMusicHttpAdapter::new(
            AppleMusicCredentials {
                secret_key_path: dir.path().join("AuthKey_missing.p8"),
                key_id: "KEY".into(),
                team_id: "TEAM".into(),
            },
            "us".into(),
        )
        .unwrap();

        let error = adapter
            .playlist_tracks_page("pl.source", 100, 0)
            .await
            .unwrap_err();

        assert!(format!("{error:#}").contains("developer token"));
    }
}
