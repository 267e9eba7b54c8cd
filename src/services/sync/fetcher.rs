use std::time::Duration;

use tracing::instrument;

use crate::ports::source::SourceCatalog;
use crate::services::sync::BoxError;
use crate::services::sync::types::SourceTrack;

/// Maximum number of entries the source API returns per page.
pub const PAGE_SIZE: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("source playlist {playlist_id} has no usable tracks")]
    Empty { playlist_id: String },
    #[error("failed to fetch page at offset {offset} of source playlist {playlist_id}")]
    Source {
        playlist_id: String,
        offset: u32,
        #[source]
        source: BoxError,
    },
}

/// Reads every track of a source playlist, page by page.
pub struct SourceCatalogFetcher<'a, S: SourceCatalog> {
    source: &'a S,
    page_delay: Duration,
}

impl<'a, S: SourceCatalog> SourceCatalogFetcher<'a, S> {
    pub fn new(source: &'a S, page_delay: Duration) -> Self {
        Self { source, page_delay }
    }

    /// Fetch all usable tracks of `playlist_id`.
    ///
    /// Pagination strategy
    /// - Pages of `PAGE_SIZE` are requested at offsets 0, 100, 200, ...
    /// - A page shorter than `PAGE_SIZE` is the last one. Malformed records still count
    ///   toward the page length, they are only left out of the result.
    /// - Any failed page fails the whole fetch; nothing partial is returned.
    #[instrument(skip(self))]
    pub async fn fetch(&self, playlist_id: &str) -> Result<Vec<SourceTrack>, FetchError> {
        let mut tracks: Vec<SourceTrack> = Vec::new();
        let mut offset: u32 = 0;

        loop {
            let page = self
                .source
                .playlist_tracks_page(playlist_id, PAGE_SIZE, offset)
                .await
                .map_err(|error| FetchError::Source {
                    playlist_id: playlist_id.to_string(),
                    offset,
                    source: error.into(),
                })?;

            let before = tracks.len();
            tracks.extend(page.iter().filter_map(SourceTrack::from_record));

            let skipped = page.len() - (tracks.len() - before);
            if skipped > 0 {
                tracing::warn!(offset, skipped, "Skipped malformed source records");
            }

            if page.len() < PAGE_SIZE as usize {
                tracing::debug!(offset, page_len = page.len(), "Reached the end of the playlist");
                break;
            }

            offset += PAGE_SIZE;
            tracing::debug!(fetched = tracks.len(), "Fetched page, requesting the next one");

            tokio::time::sleep(self.page_delay).await;
        }

        if tracks.is_empty() {
            return Err(FetchError::Empty {
                playlist_id: playlist_id.to_string(),
            });
        }

        tracing::info!(total = tracks.len(), "Fetched source playlist");
        Ok(tracks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::source::MockSourceCatalog;
    use color_eyre::eyre::eyre;
    use mockall::Sequence;
    use serde_json::{Value, json};

    fn record(n: usize) -> Value {
        json!({
            "id": format!("i.{n}"),
            "type": "songs",
            "attributes": { "artistName": format!("Artist {n}"), "name": format!("Song {n}") }
        })
    }

    fn page(range: std::ops::Range<usize>) -> Vec<Value> {
        range.map(record).collect()
    }

    fn expect_page(
        source: &mut MockSourceCatalog,
        seq: &mut Sequence,
        expected_offset: u32,
        items: Vec<Value>,
    ) {
        source
            .expect_playlist_tracks_page()
            .withf(move |playlist_id, limit, offset| {
                playlist_id == "pl.source" && *limit == PAGE_SIZE && *offset == expected_offset
            })
            .times(1)
            .in_sequence(seq)
            .returning(move |_, _, _| Ok(items.clone()));
    }

    #[tokio::test]
    async fn test_fetch_pages_until_short_page() {
        let mut source = MockSourceCatalog::new();
        let mut seq = Sequence::new();
        expect_page(&mut source, &mut seq, 0, page(0..100));
        expect_page(&mut source, &mut seq, 100, page(100..200));
        expect_page(&mut source, &mut seq, 200, page(200..250));

        let fetcher = SourceCatalogFetcher::new(&source, Duration::ZERO);
        let tracks = fetcher.fetch("pl.source").await.unwrap();

        assert_eq!(tracks.len(), 250);
        assert_eq!(tracks[0], SourceTrack::new("Artist 0", "Song 0"));
        assert_eq!(tracks[249], SourceTrack::new("Artist 249", "Song 249"));
    }

    #[tokio::test]
    async fn test_fetch_exact_multiple_needs_empty_final_page() {
        let mut source = MockSourceCatalog::new();
        let mut seq = Sequence::new();
        expect_page(&mut source, &mut seq, 0, page(0..100));
        expect_page(&mut source, &mut seq, 100, page(100..200));
        expect_page(&mut source, &mut seq, 200, Vec::new());

        let fetcher = SourceCatalogFetcher::new(&source, Duration::ZERO);
        let tracks = fetcher.fetch("pl.source").await.unwrap();

        assert_eq!(tracks.len(), 200);
    }

    #[tokio::test]
    async fn test_fetch_skips_malformed_without_ending_early() {
        let mut first = page(0..97);
        first.push(json!({ "id": "broken-1" }));
        first.push(json!({ "attributes": { "name": "No Artist" } }));
        first.push(json!({ "attributes": { "artistName": "No Title" } }));
        assert_eq!(first.len(), 100);

        let mut source = MockSourceCatalog::new();
        let mut seq = Sequence::new();
        expect_page(&mut source, &mut seq, 0, first);
        expect_page(&mut source, &mut seq, 100, page(100..110));

        let fetcher = SourceCatalogFetcher::new(&source, Duration::ZERO);
        let tracks = fetcher.fetch("pl.source").await.unwrap();

        assert_eq!(tracks.len(), 107);
        assert!(tracks.iter().all(|t| t.artist != "No Title"));
    }

    #[tokio::test]
    async fn test_fetch_empty_playlist() {
        let mut source = MockSourceCatalog::new();
        let mut seq = Sequence::new();
        expect_page(&mut source, &mut seq, 0, vec![json!({ "id": "broken" })]);

        let fetcher = SourceCatalogFetcher::new(&source, Duration::ZERO);
        let error = fetcher.fetch("pl.source").await.unwrap_err();

        assert!(matches!(error, FetchError::Empty { .. }));
    }

    #[tokio::test]
    async fn test_fetch_failure_returns_no_partial_result() {
        let mut source = MockSourceCatalog::new();
        let mut seq = Sequence::new();
        expect_page(&mut source, &mut seq, 0, page(0..100));
        source
            .expect_playlist_tracks_page()
            .withf(|_, _, offset| *offset == 100)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _, _| Err(eyre!("401 Unauthorized")));

        let fetcher = SourceCatalogFetcher::new(&source, Duration::ZERO);
        let error = fetcher.fetch("pl.source").await.unwrap_err();

        match error {
            FetchError::Source { offset, source, .. } => {
                assert_eq!(offset, 100);
                assert!(source.to_string().contains("401"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
