use tracing::instrument;

use crate::ports::destination::DestinationCatalog;
use crate::services::sync::BoxError;
use crate::services::sync::types::MatchedTrack;

/// Maximum number of tracks the destination accepts in one add call.
pub const MAX_BATCH_SIZE: usize = 100;

/// Errors while writing the destination playlist.
///
/// Batches written before the failure are not rolled back, so after an `Append` error the
/// playlist holds only the first `written` tracks.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("failed to clear destination playlist {playlist_id}")]
    Clear {
        playlist_id: String,
        #[source]
        source: BoxError,
    },
    #[error(
        "failed to add batch {batch} of {batches} to destination playlist {playlist_id} ({written} tracks were already written)"
    )]
    Append {
        playlist_id: String,
        batch: usize,
        batches: usize,
        written: usize,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    NothingToSync,
    Updated { tracks: usize, batches: usize },
}

/// Sorts by artist name, case-insensitively. Equal artists keep their relative order.
pub fn sort_by_artist(tracks: &[MatchedTrack]) -> Vec<MatchedTrack> {
    let mut sorted = tracks.to_vec();
    sorted.sort_by_cached_key(|track| track.artist.to_lowercase());
    sorted
}

/// Makes the destination playlist hold exactly the matched tracks, sorted by artist.
pub struct PlaylistReconciler<'a, D: DestinationCatalog> {
    destination: &'a D,
}

impl<'a, D: DestinationCatalog> PlaylistReconciler<'a, D> {
    pub fn new(destination: &'a D) -> Self {
        Self { destination }
    }

    /// Clear `playlist_id` and append `tracks` sorted by artist in batches of
    /// `MAX_BATCH_SIZE`.
    ///
    /// An empty `tracks` leaves the playlist untouched.
    #[instrument(skip(self, tracks), fields(tracks = tracks.len()))]
    pub async fn reconcile(
        &self,
        playlist_id: &str,
        tracks: &[MatchedTrack],
    ) -> Result<ReconcileOutcome, UpdateError> {
        if tracks.is_empty() {
            tracing::info!("No matched tracks, leaving destination playlist untouched");
            return Ok(ReconcileOutcome::NothingToSync);
        }

        let track_ids: Vec<String> = sort_by_artist(tracks)
            .into_iter()
            .map(|track| track.id)
            .collect();

        self.destination
            .replace_playlist_items(playlist_id, &[])
            .await
            .map_err(|error| UpdateError::Clear {
                playlist_id: playlist_id.to_string(),
                source: error.into(),
            })?;
        tracing::debug!("Cleared destination playlist");

        let batches = track_ids.len().div_ceil(MAX_BATCH_SIZE);
        let mut written = 0;

        for (index, chunk) in track_ids.chunks(MAX_BATCH_SIZE).enumerate() {
            self.destination
                .add_playlist_items(playlist_id, chunk)
                .await
                .map_err(|error| UpdateError::Append {
                    playlist_id: playlist_id.to_string(),
                    batch: index + 1,
                    batches,
                    written,
                    source: error.into(),
                })?;
            written += chunk.len();
            tracing::debug!(batch = index + 1, batches, written, "Added batch");
        }

        tracing::info!(written, batches, "Destination playlist updated");
        Ok(ReconcileOutcome::Updated {
            tracks: written,
            batches,
        })
    }
}
