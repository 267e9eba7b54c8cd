use color_eyre::eyre::{Result, WrapErr, eyre};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

pub const APPLE_MUSIC_API_URL: &str = "https://api.music.apple.com/v1/";

/// Envelope of Apple Music list endpoints.
///
/// Notes
/// - Resources are kept as raw JSON; callers pick out the attributes they need.
/// - `next` is only present when more pages exist, and not every endpoint sets it.
#[derive(Debug, Clone, Deserialize)]
pub struct AppleMusicResponse {
    #[serde(default)]
    pub data: Vec<serde_json::Value>,

    #[serde(default)]
    pub next: Option<String>,
}

/// Fetch one page of a catalog playlist's tracks.
///
/// Endpoint
/// - `GET /catalog/{storefront}/playlists/{id}/tracks?limit={limit}&offset={offset}`
///
/// Pagination
/// - `limit` is capped at 100 by Apple.
pub async fn get_playlist_tracks_page(
    client: &Client,
    base_url: &Url,
    developer_token: &str,
    storefront: &str,
    playlist_id: &str,
    limit: u32,
    offset: u32,
) -> Result<AppleMusicResponse> {
    let mut url = base_url.join(&format!(
        "catalog/{}/playlists/{}/tracks",
        urlencoding::encode(storefront),
        urlencoding::encode(playlist_id)
    ))?;
    url.query_pairs_mut()
        .append_pair("limit", &limit.to_string())
        .append_pair("offset", &offset.to_string());

    tracing::debug!(%url, "Requesting Apple Music playlist page");

    let response = client
        .get(url)
        .bearer_auth(developer_token)
        .header("Accept", "application/json")
        .send()
        .await
        .wrap_err("Failed to send Apple Music request")?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to get error text".to_string());
        return Err(eyre!("Apple Music API returned {}: {}", status, body));
    }

    response
        .json::<AppleMusicResponse>()
        .await
        .wrap_err("Failed to deserialize Apple Music playlist tracks page")
}
