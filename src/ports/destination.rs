use color_eyre::eyre::Result;

/// The account the destination session is signed in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationUser {
    pub id: String,
    pub display_name: Option<String>,
}

/// Decoupled representation of a destination search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationTrack {
    pub id: String,
    pub name: String,
    pub artist: String,
}

/// Port trait wrapping the destination API capabilities used by the sync core.
///
/// Implementations live in `services::spotify::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DestinationCatalog: Send + Sync {
    async fn current_user(&self) -> Result<DestinationUser>;

    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<DestinationTrack>>;

    /// Replaces the whole playlist with `track_ids`. An empty slice clears it.
    async fn replace_playlist_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    async fn add_playlist_items(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;
}
