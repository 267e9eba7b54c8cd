use std::time::Duration;

use tracing::instrument;

use crate::ports::console::Console;
use crate::ports::destination::DestinationCatalog;
use crate::ports::source::SourceCatalog;
use crate::services::sync::BoxError;
use crate::services::sync::fetcher::{FetchError, SourceCatalogFetcher};
use crate::services::sync::matcher::TrackMatcher;
use crate::services::sync::reconciler::{PlaylistReconciler, UpdateError, sort_by_artist};
use crate::services::sync::types::{MatchResult, SyncOutcome, SyncReport};

const BANNER_WIDTH: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("identity check against the destination service failed")]
    IdentityCheck(#[source] BoxError),
}

/// How the destructive write step gets its go-ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    /// Ask on the console; only `y` proceeds.
    Prompt,
    /// Treated as an affirmative answer given up front.
    AssumeYes,
    /// Show the review and stop before asking.
    DryRun,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub source_playlist_id: String,
    pub destination_playlist_id: String,
    pub page_delay: Duration,
    pub lookup_delay: Duration,
    pub confirmation: Confirmation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Authenticating,
    Fetching,
    Matching,
    AwaitingConfirmation,
    Reconciling,
    Done,
    Aborted,
}

#[derive(Debug, thiserror::Error)]
pub enum AbortReason {
    #[error("Could not authenticate with the destination service. Please check your credentials.")]
    Authentication(#[from] AuthError),
    #[error("No usable tracks were found in the source playlist. Nothing to sync.")]
    NothingFetched,
    #[error("Could not fetch the source playlist.")]
    Fetch(#[source] FetchError),
    #[error("No tracks to sync. Exiting.")]
    NoMatches,
    #[error("Sync cancelled by user.")]
    Cancelled,
    #[error("{}", update_abort_message(.0))]
    Update(#[from] UpdateError),
}

impl AbortReason {
    /// Whether the run ended because something failed, as opposed to a clean stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AbortReason::Authentication(_) | AbortReason::Fetch(_) | AbortReason::Update(_)
        )
    }
}

impl From<FetchError> for AbortReason {
    fn from(error: FetchError) -> Self {
        match error {
            FetchError::Empty { .. } => AbortReason::NothingFetched,
            error => AbortReason::Fetch(error),
        }
    }
}

fn update_abort_message(error: &UpdateError) -> &'static str {
    match error {
        UpdateError::Clear { .. } => {
            "Error updating the destination playlist. It could not be cleared and no tracks were written."
        }
        UpdateError::Append { .. } => {
            "Error updating the destination playlist. Batches already written were kept, so the playlist may be incomplete; run the sync again to restore it."
        }
    }
}

/// Runs one source to destination sync from identity check to playlist write.
pub struct SyncOrchestrator<'a, S, D, C>
where
    S: SourceCatalog,
    D: DestinationCatalog,
    C: Console,
{
    source: &'a S,
    destination: &'a D,
    console: &'a C,
    settings: SyncSettings,
}

impl<'a, S, D, C> SyncOrchestrator<'a, S, D, C>
where
    S: SourceCatalog,
    D: DestinationCatalog,
    C: Console,
{
    pub fn new(source: &'a S, destination: &'a D, console: &'a C, settings: SyncSettings) -> Self {
        Self {
            source,
            destination,
            console,
            settings,
        }
    }

    #[instrument(
        skip(self),
        fields(
            source = %self.settings.source_playlist_id,
            destination = %self.settings.destination_playlist_id
        )
    )]
    pub async fn run(&self) -> SyncOutcome {
        match self.drive().await {
            Ok(outcome) => {
                self.enter(SyncState::Done);
                outcome
            }
            Err(reason) => {
                self.enter(SyncState::Aborted);
                self.report_abort(&reason);
                SyncOutcome::Aborted(reason)
            }
        }
    }

    async fn drive(&self) -> Result<SyncOutcome, AbortReason> {
        self.enter(SyncState::Authenticating);
        let user = self
            .destination
            .current_user()
            .await
            .map_err(|error| AuthError::IdentityCheck(error.into()))?;
        tracing::info!(user = %user.id, "Destination identity verified");
        self.console.line(&format!(
            "-> Signed in to the destination service as {}",
            user.display_name.as_deref().unwrap_or(&user.id)
        ));

        self.enter(SyncState::Fetching);
        self.console
            .line("-> Fetching all tracks from the source playlist...");
        let tracks = SourceCatalogFetcher::new(self.source, self.settings.page_delay)
            .fetch(&self.settings.source_playlist_id)
            .await?;
        self.console.line(&format!(
            "-> Found a total of {} tracks in the source playlist.",
            tracks.len()
        ));

        self.enter(SyncState::Matching);
        self.console
            .line("-> Searching for tracks on the destination service...");
        let total = tracks.len();
        let results = TrackMatcher::new(self.destination, self.settings.lookup_delay)
            .match_all(&tracks, |position, track, result| {
                self.console.line(&format!(
                    "  ({position}/{total}) '{}' by '{}'",
                    track.title, track.artist
                ));
                match result {
                    MatchResult::Matched(found) => self.console.line(&format!(
                        "  > Found: '{}' by '{}'",
                        found.title, found.artist
                    )),
                    MatchResult::Unmatched(missing) => {
                        self.console.line(&format!("  > Not found: {missing}"))
                    }
                }
            })
            .await;
        let report: SyncReport = results.into_iter().collect();
        self.console.line("-> Search complete.");

        self.enter(SyncState::AwaitingConfirmation);
        self.present_review(&report);

        if report.matched.is_empty() {
            return Err(AbortReason::NoMatches);
        }

        if !self.confirmed()? {
            return Ok(SyncOutcome::DryRun { report });
        }

        self.enter(SyncState::Reconciling);
        self.console.line("-> Updating the destination playlist...");
        let outcome = PlaylistReconciler::new(self.destination)
            .reconcile(&self.settings.destination_playlist_id, &report.matched)
            .await?;
        tracing::debug!(?outcome, "Reconciled destination playlist");
        self.console.line(&format!(
            "Success! {} tracks were written to the destination playlist, sorted by artist.",
            report.matched.len()
        ));

        Ok(SyncOutcome::Done { report })
    }

    /// `Ok(false)` means a dry run, which ends the run without writing.
    fn confirmed(&self) -> Result<bool, AbortReason> {
        match self.settings.confirmation {
            Confirmation::DryRun => {
                self.console
                    .line("Dry run: the destination playlist was not changed.");
                Ok(false)
            }
            Confirmation::AssumeYes => Ok(true),
            Confirmation::Prompt => {
                let answer = self
                    .console
                    .confirm("Do you want to proceed with updating the destination playlist? (y/n)");
                match answer {
                    Ok(true) => Ok(true),
                    Ok(false) => Err(AbortReason::Cancelled),
                    Err(error) => {
                        tracing::warn!("Failed to read confirmation: {error:#}");
                        Err(AbortReason::Cancelled)
                    }
                }
            }
        }
    }

    fn present_review(&self, report: &SyncReport) {
        let rule = "=".repeat(BANNER_WIDTH);
        self.console.line("");
        self.console.line(&rule);
        self.console.line(&format!("{:^BANNER_WIDTH$}", "SYNC REVIEW"));
        self.console.line(&rule);

        if !report.unmatched.is_empty() {
            self.console.line("");
            self.console
                .line("The following songs could not be found on the destination service:");
            for missing in &report.unmatched {
                self.console.line(&format!("  - {missing}"));
            }
        }

        if !report.matched.is_empty() {
            self.console.line("");
            self.console
                .line("The following songs will be synced to the destination playlist, sorted by artist:");
            for track in sort_by_artist(&report.matched) {
                self.console
                    .line(&format!("  - {} - {}", track.artist, track.title));
            }
        }

        self.console.line(&rule);
    }

    fn report_abort(&self, reason: &AbortReason) {
        let mut message = reason.to_string();
        let mut cause: Option<&dyn std::error::Error> = std::error::Error::source(reason);
        while let Some(error) = cause {
            message.push_str(&format!("\n  caused by: {error}"));
            cause = error.source();
        }

        if reason.is_fatal() {
            tracing::error!("Sync aborted: {message}");
        } else {
            tracing::info!("Sync stopped: {message}");
        }
        self.console.line(&message);
    }

    fn enter(&self, state: SyncState) {
        tracing::debug!(?state, "Sync state");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::ports::console::MockConsole;
    use crate::ports::destination::{DestinationTrack, DestinationUser, MockDestinationCatalog};
    use crate::ports::source::MockSourceCatalog;
    use color_eyre::eyre::eyre;
    use serde_json::{Value, json};

    fn settings(confirmation: Confirmation) -> SyncSettings {
        SyncSettings {
            source_playlist_id: "pl.source".into(),
            destination_playlist_id: "dest".into(),
            page_delay: Duration::ZERO,
            lookup_delay: Duration::ZERO,
            confirmation,
        }
    }

    fn record(artist: &str, title: &str) -> Value {
        json!({ "attributes": { "artistName": artist, "name": title } })
    }

    fn source_with(records: Vec<Value>) -> MockSourceCatalog {
        let mut source = MockSourceCatalog::new();
        source
            .expect_playlist_tracks_page()
            .times(1)
            .returning(move |_, _, _| Ok(records.clone()));
        source
    }

    /// Destination that knows every searched title except "Unknown".
    fn destination() -> MockDestinationCatalog {
        let mut destination = MockDestinationCatalog::new();
        destination.expect_current_user().returning(|| {
            Ok(DestinationUser {
                id: "user1".into(),
                display_name: Some("User One".into()),
            })
        });
        destination.expect_search_tracks().returning(|query, _| {
            if query.contains("Unknown") {
                return Ok(Vec::new());
            }
            let title = query
                .trim_start_matches("track:")
                .split(" artist:")
                .next()
                .unwrap_or_default();
            let artist = query.split(" artist:").nth(1).unwrap_or_default();
            Ok(vec![DestinationTrack {
                id: format!("id-{title}"),
                name: title.to_string(),
                artist: artist.to_string(),
            }])
        });
        destination
    }

    fn console(answer: Option<bool>) -> (MockConsole, Arc<Mutex<Vec<String>>>) {
        let lines: Arc<Mutex<Vec<String>>> = Arc::default();
        let recorded = lines.clone();

        let mut console = MockConsole::new();
        console
            .expect_line()
            .returning(move |text| recorded.lock().unwrap().push(text.to_string()));
        match answer {
            Some(answer) => {
                console
                    .expect_confirm()
                    .times(1)
                    .returning(move |_| Ok(answer));
            }
            None => {
                console.expect_confirm().never();
            }
        }
        console.expect_ask().never();
        (console, lines)
    }

    #[tokio::test]
    async fn test_confirmed_run_writes_sorted_playlist() {
        let source = source_with(vec![
            record("Zeta", "Last"),
            record("Nobody", "Unknown"),
            record("alpha", "First"),
        ]);
        let mut destination = destination();
        destination
            .expect_replace_playlist_items()
            .withf(|playlist_id, ids| playlist_id == "dest" && ids.is_empty())
            .times(1)
            .returning(|_, _| Ok(()));
        destination
            .expect_add_playlist_items()
            .withf(|playlist_id, ids| {
                playlist_id == "dest" && ids == ["id-First".to_string(), "id-Last".to_string()]
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let (console, lines) = console(Some(true));

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));
        let outcome = orchestrator.run().await;

        match outcome {
            SyncOutcome::Done { report } => {
                assert_eq!(report.matched.len(), 2);
                assert_eq!(report.unmatched.len(), 1);
                assert_eq!(report.unmatched[0].to_string(), "Nobody - Unknown");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        let lines = lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("SYNC REVIEW")));
        assert!(lines.iter().any(|l| l == "  - Nobody - Unknown"));
        let first = lines.iter().position(|l| l == "  - alpha - First").unwrap();
        let last = lines.iter().position(|l| l == "  - Zeta - Last").unwrap();
        assert!(first < last);
    }

    #[tokio::test]
    async fn test_declined_confirmation_never_writes() {
        let source = source_with(vec![record("Artist", "Song")]);
        let mut destination = destination();
        destination.expect_replace_playlist_items().never();
        destination.expect_add_playlist_items().never();
        let (console, lines) = console(Some(false));

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));
        let outcome = orchestrator.run().await;

        assert!(matches!(
            outcome,
            SyncOutcome::Aborted(AbortReason::Cancelled)
        ));
        assert!(
            lines
                .lock()
                .unwrap()
                .iter()
                .any(|l| l == "Sync cancelled by user.")
        );
    }

    #[tokio::test]
    async fn test_unreadable_confirmation_cancels() {
        let source = source_with(vec![record("Artist", "Song")]);
        let mut destination = destination();
        destination.expect_replace_playlist_items().never();
        destination.expect_add_playlist_items().never();
        let mut console = MockConsole::new();
        console.expect_line().returning(|_| ());
        console
            .expect_confirm()
            .times(1)
            .returning(|_| Err(eyre!("not a terminal")));

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));

        assert!(matches!(
            orchestrator.run().await,
            SyncOutcome::Aborted(AbortReason::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_before_fetching() {
        let mut source = MockSourceCatalog::new();
        source.expect_playlist_tracks_page().never();
        let mut destination = MockDestinationCatalog::new();
        destination
            .expect_current_user()
            .times(1)
            .returning(|| Err(eyre!("401 Unauthorized")));
        destination.expect_search_tracks().never();
        destination.expect_replace_playlist_items().never();
        destination.expect_add_playlist_items().never();
        let (console, _) = console(None);

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));
        let outcome = orchestrator.run().await;

        match outcome {
            SyncOutcome::Aborted(reason) => {
                assert!(matches!(reason, AbortReason::Authentication(_)));
                assert!(reason.is_fatal());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_source_aborts_cleanly() {
        let source = source_with(Vec::new());
        let mut destination = destination();
        destination.expect_search_tracks().never();
        let (console, _) = console(None);

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));

        match orchestrator.run().await {
            SyncOutcome::Aborted(reason) => {
                assert!(matches!(reason, AbortReason::NothingFetched));
                assert!(!reason.is_fatal());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_is_fatal() {
        let mut source = MockSourceCatalog::new();
        source
            .expect_playlist_tracks_page()
            .returning(|_, _, _| Err(eyre!("connection refused")));
        let mut destination = destination();
        destination.expect_search_tracks().never();
        let (console, lines) = console(None);

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));

        match orchestrator.run().await {
            SyncOutcome::Aborted(reason) => {
                assert!(matches!(reason, AbortReason::Fetch(_)));
                assert!(reason.is_fatal());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(
            lines
                .lock()
                .unwrap()
                .iter()
                .any(|l| l.contains("caused by: connection refused"))
        );
    }

    #[tokio::test]
    async fn test_no_matches_reports_then_aborts() {
        let source = source_with(vec![record("A", "Unknown"), record("B", "Unknown (Live)")]);
        let mut destination = destination();
        destination.expect_replace_playlist_items().never();
        destination.expect_add_playlist_items().never();
        let (console, lines) = console(None);

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));

        assert!(matches!(
            orchestrator.run().await,
            SyncOutcome::Aborted(AbortReason::NoMatches)
        ));
        let lines = lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("SYNC REVIEW")));
        assert!(lines.iter().any(|l| l == "  - B - Unknown (Live)"));
    }

    #[tokio::test]
    async fn test_dry_run_never_prompts_or_writes() {
        let source = source_with(vec![record("Artist", "Song")]);
        let mut destination = destination();
        destination.expect_replace_playlist_items().never();
        destination.expect_add_playlist_items().never();
        let (console, _) = console(None);

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::DryRun));

        match orchestrator.run().await {
            SyncOutcome::DryRun { report } => assert_eq!(report.matched.len(), 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_assume_yes_writes_without_prompt() {
        let source = source_with(vec![record("Artist", "Song")]);
        let mut destination = destination();
        destination
            .expect_replace_playlist_items()
            .times(1)
            .returning(|_, _| Ok(()));
        destination
            .expect_add_playlist_items()
            .times(1)
            .returning(|_, _| Ok(()));
        let (console, _) = console(None);

        let orchestrator = SyncOrchestrator::new(
            &source,
            &destination,
            &console,
            settings(Confirmation::AssumeYes),
        );

        assert!(matches!(
            orchestrator.run().await,
            SyncOutcome::Done { .. }
        ));
    }

    #[tokio::test]
    async fn test_update_failure_is_reported_as_partial_write() {
        let source = source_with(vec![record("Artist", "Song")]);
        let mut destination = destination();
        destination
            .expect_replace_playlist_items()
            .times(1)
            .returning(|_, _| Ok(()));
        destination
            .expect_add_playlist_items()
            .times(1)
            .returning(|_, _| Err(eyre!("500 Internal Server Error")));
        let (console, lines) = console(Some(true));

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));

        match orchestrator.run().await {
            SyncOutcome::Aborted(reason) => {
                assert!(matches!(reason, AbortReason::Update(UpdateError::Append { .. })));
                assert!(reason.is_fatal());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(
            lines
                .lock()
                .unwrap()
                .iter()
                .any(|l| l.contains("may be incomplete"))
        );
    }

    #[tokio::test]
    async fn test_clear_failure_does_not_claim_partial_write() {
        let source = source_with(vec![record("Artist", "Song")]);
        let mut destination = destination();
        destination
            .expect_replace_playlist_items()
            .times(1)
            .returning(|_, _| Err(eyre!("403 Forbidden")));
        destination.expect_add_playlist_items().never();
        let (console, lines) = console(Some(true));

        let orchestrator =
            SyncOrchestrator::new(&source, &destination, &console, settings(Confirmation::Prompt));

        match orchestrator.run().await {
            SyncOutcome::Aborted(reason) => {
                assert!(matches!(reason, AbortReason::Update(UpdateError::Clear { .. })));
                assert!(reason.is_fatal());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let lines = lines.lock().unwrap();
        assert!(lines.iter().any(|l| l.contains("could not be cleared")));
        assert!(!lines.iter().any(|l| l.contains("may be incomplete")));
    }
}
