use std::sync::LazyLock;
use std::time::Duration;

use color_eyre::eyre::Result;
use regex::Regex;
use tracing::instrument;

use crate::ports::destination::{DestinationCatalog, DestinationTrack};
use crate::services::sync::types::{
    MatchResult, MatchedTrack, SourceTrack, UnmatchedReason, UnmatchedTrack,
};

// "(feat. X)", "(Remastered 2011)", "[Live]" and the whitespace before them
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^)]*\)|\s*\[[^\]]*\]").expect("static regex is valid"));

/// Strips every parenthetical and bracketed span from a title and trims the rest.
///
/// A title without such spans comes back unchanged.
pub fn clean_title(title: &str) -> String {
    BRACKETED.replace_all(title, "").trim().to_string()
}

/// Field-filtered search query for a title by an artist.
pub fn search_query(artist: &str, title: &str) -> String {
    format!("track:{} artist:{}", title, artist)
}

/// Resolves source tracks to destination tracks, one lookup at a time.
pub struct TrackMatcher<'a, D: DestinationCatalog> {
    destination: &'a D,
    lookup_delay: Duration,
}

impl<'a, D: DestinationCatalog> TrackMatcher<'a, D> {
    pub fn new(destination: &'a D, lookup_delay: Duration) -> Self {
        Self {
            destination,
            lookup_delay,
        }
    }

    /// Match every track in order, pausing between lookups.
    ///
    /// `on_result` is called after each lookup with its 1-based position.
    pub async fn match_all<F>(&self, tracks: &[SourceTrack], mut on_result: F) -> Vec<MatchResult>
    where
        F: FnMut(usize, &SourceTrack, &MatchResult),
    {
        let mut results = Vec::with_capacity(tracks.len());

        for (index, track) in tracks.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.lookup_delay).await;
            }
            let result = self.match_track(track).await;
            on_result(index + 1, track, &result);
            results.push(result);
        }

        results
    }

    /// Search for `track`, first as listed and then with a cleaned title.
    ///
    /// Never fails: a search error is reported as an unmatched track.
    #[instrument(skip(self), fields(artist = %track.artist, title = %track.title))]
    pub async fn match_track(&self, track: &SourceTrack) -> MatchResult {
        match self.resolve(track).await {
            Ok(Some(found)) => {
                tracing::debug!(id = %found.id, "Found destination track");
                MatchResult::Matched(MatchedTrack {
                    id: found.id,
                    artist: found.artist,
                    title: found.name,
                })
            }
            Ok(None) => {
                tracing::debug!("No destination track found");
                MatchResult::Unmatched(UnmatchedTrack {
                    artist: track.artist.clone(),
                    title: track.title.clone(),
                    reason: UnmatchedReason::NotFound,
                })
            }
            Err(error) => {
                tracing::warn!("Search failed: {error:#}");
                MatchResult::Unmatched(UnmatchedTrack {
                    artist: track.artist.clone(),
                    title: track.title.clone(),
                    reason: UnmatchedReason::SearchError(format!("{error:#}")),
                })
            }
        }
    }

    async fn resolve(&self, track: &SourceTrack) -> Result<Option<DestinationTrack>> {
        if let Some(found) = self.search_best(&track.artist, &track.title).await? {
            return Ok(Some(found));
        }

        // An all-bracket title cleans to "" and still gets the artist-only retry.
        let cleaned = clean_title(&track.title);
        if cleaned == track.title {
            return Ok(None);
        }

        tracing::debug!(cleaned = %cleaned, "Retrying with cleaned title");
        self.search_best(&track.artist, &cleaned).await
    }

    async fn search_best(&self, artist: &str, title: &str) -> Result<Option<DestinationTrack>> {
        let results = self
            .destination
            .search_tracks(&search_query(artist, title), 1)
            .await?;
        Ok(results.into_iter().next())
    }
}
