use color_eyre::eyre::Result;

use crate::ports::destination::{DestinationCatalog, DestinationTrack, DestinationUser};
use crate::spotify_rs::client::SpotifyClient;
use crate::spotify_rs::types::SpotifyTrack;

/// Spotify wants `spotify:track:<id>` URIs in playlist item requests.
pub fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

fn track_uris(track_ids: &[String]) -> Vec<String> {
    track_ids.iter().map(|id| track_uri(id)).collect()
}

/// Search hits credit the first listed artist. Hits without any artist are dropped.
fn destination_track(track: SpotifyTrack) -> Option<DestinationTrack> {
    let artist = track.artists.into_iter().next()?.name;
    Some(DestinationTrack {
        id: track.id,
        name: track.name,
        artist,
    })
}

pub struct SpotifyHttpAdapter {
    client: SpotifyClient,
}

impl SpotifyHttpAdapter {
    pub fn new(client: SpotifyClient) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl DestinationCatalog for SpotifyHttpAdapter {
    async fn current_user(&self) -> Result<DestinationUser> {
        let user = self.client.get_current_user().await?;
        Ok(DestinationUser {
            id: user.id,
            display_name: user.display_name,
        })
    }

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<DestinationTrack>> {
        let tracks = self.client.search_tracks(query, limit).await?;
        Ok(tracks.into_iter().filter_map(destination_track).collect())
    }

    async fn replace_playlist_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        self.client
            .replace_playlist_tracks(playlist_id, &track_uris(track_ids))
            .await
    }

    async fn add_playlist_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        self.client
            .add_playlist_tracks(playlist_id, &track_uris(track_ids))
            .await
    }
}
