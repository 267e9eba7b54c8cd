use std::fmt;

use serde_json::Value;

use crate::services::sync::orchestrator::AbortReason;

/// A track as listed in the source playlist. Identity is structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTrack {
    pub artist: String,
    pub title: String,
}

impl SourceTrack {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }

    /// Reads `attributes.artistName` and `attributes.name` from a raw source record.
    ///
    /// Returns `None` for anything that does not carry both as strings.
    pub fn from_record(record: &Value) -> Option<Self> {
        let attributes = record.get("attributes")?;
        let artist = attributes.get("artistName")?.as_str()?;
        let title = attributes.get("name")?.as_str()?;
        Some(Self::new(artist, title))
    }
}

/// A track resolved on the destination service, named the way the destination names it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedTrack {
    pub id: String,
    pub artist: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnmatchedReason {
    NotFound,
    SearchError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmatchedTrack {
    pub artist: String,
    pub title: String,
    pub reason: UnmatchedReason,
}

impl fmt::Display for UnmatchedTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)?;
        if let UnmatchedReason::SearchError(_) = self.reason {
            write!(f, " (Error during search)")?;
        }
        Ok(())
    }
}

/// Per-track outcome of a destination lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Matched(MatchedTrack),
    Unmatched(UnmatchedTrack),
}

/// Matched and unmatched tracks of one run, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub matched: Vec<MatchedTrack>,
    pub unmatched: Vec<UnmatchedTrack>,
}

impl SyncReport {
    pub fn push(&mut self, result: MatchResult) {
        match result {
            MatchResult::Matched(track) => self.matched.push(track),
            MatchResult::Unmatched(track) => self.unmatched.push(track),
        }
    }
}

impl FromIterator<MatchResult> for SyncReport {
    fn from_iter<I: IntoIterator<Item = MatchResult>>(iter: I) -> Self {
        let mut report = SyncReport::default();
        for result in iter {
            report.push(result);
        }
        report
    }
}

/// How a sync run ended.
#[derive(Debug)]
pub enum SyncOutcome {
    Done { report: SyncReport },
    /// Review shown, nothing written.
    DryRun { report: SyncReport },
    Aborted(AbortReason),
}
