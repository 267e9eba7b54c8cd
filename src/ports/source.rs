use color_eyre::eyre::Result;

/// Port trait wrapping the source catalog API used to read a playlist.
///
/// Records are returned raw so that malformed entries can be skipped one by one
/// instead of failing the whole page.
///
/// Implementations live in `services::apple_music::client` (production) or test mocks.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn playlist_tracks_page(
        &self,
        playlist_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<serde_json::Value>>;
}
