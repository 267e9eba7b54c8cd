use serde::{Deserialize, Serialize};

/// Spotify OAuth token response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

/// Spotify user profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Track object as returned by search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SpotifyArtist>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyArtist {
    pub name: String,
}

/// Response of `GET /search?type=track`
#[derive(Debug, Clone, Deserialize)]
pub struct SpotifySearchResponse {
    pub tracks: SpotifyPage<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyPage<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Body of the playlist items endpoints
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistItemsBody<'a> {
    pub uris: &'a [String],
}

/// Response for authentication initiation
#[derive(Debug, Clone)]
pub struct SpotifyAuthResponse {
    pub auth_url: String,
    pub state: String,
}
