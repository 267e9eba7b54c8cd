use color_eyre::Result;
use color_eyre::eyre::{WrapErr, eyre};
use reqwest::{RequestBuilder, Response};
use url::Url;

use crate::spotify_rs::types::{
    PlaylistItemsBody, SpotifySearchResponse, SpotifyTrack, SpotifyUser,
};

pub const SPOTIFY_API_URL: &str = "https://api.spotify.com/v1/";

/// Spotify API client
pub struct SpotifyClient {
    access_token: String,
    client: reqwest::Client,
    base_url: Url,
}

impl SpotifyClient {
    pub fn new(access_token: String) -> Result<Self> {
        Ok(Self {
            access_token,
            client: reqwest::Client::new(),
            base_url: Url::parse(SPOTIFY_API_URL)?,
        })
    }

    /// Only bearer auth is added; the transport's default timeout applies.
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.access_token)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .wrap_err("Failed to send Spotify request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error text".to_string());
            return Err(eyre!("Spotify API returned {}: {}", status, body));
        }

        Ok(response)
    }

    /// Get the current user's profile
    pub async fn get_current_user(&self) -> Result<SpotifyUser> {
        let url = self.base_url.join("me")?;
        let user = self
            .send(self.client.get(url))
            .await?
            .json()
            .await
            .wrap_err("Failed to deserialize Spotify user profile")?;
        Ok(user)
    }

    /// Search the catalog for tracks
    pub async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<SpotifyTrack>> {
        let mut url = self.base_url.join("search")?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("type", "track")
            .append_pair("limit", &limit.to_string());

        let response: SpotifySearchResponse = self
            .send(self.client.get(url))
            .await?
            .json()
            .await
            .wrap_err("Failed to deserialize Spotify search response")?;
        Ok(response.tracks.items)
    }

    /// Replace all items of a playlist. An empty list clears it.
    pub async fn replace_playlist_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        let url = self.playlist_tracks_url(playlist_id)?;
        self.send(self.client.put(url).json(&PlaylistItemsBody { uris }))
            .await?;
        Ok(())
    }

    /// Append items to a playlist (at most 100 per request)
    pub async fn add_playlist_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        let url = self.playlist_tracks_url(playlist_id)?;
        self.send(self.client.post(url).json(&PlaylistItemsBody { uris }))
            .await?;
        Ok(())
    }

    fn playlist_tracks_url(&self, playlist_id: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!(
            "playlists/{}/tracks",
            urlencoding::encode(playlist_id)
        ))?)
    }
}
