use thiserror::Error;
use tokio::sync::mpsc;
use tracing::Instrument;

use crate::config::{AnalysisSettings, MatchFailurePolicy, Settings};
use crate::core::extractor::{BattleExtractor, ExtractorError, OffenseExtractor};
use crate::core::progress::{self, match_progress};
use crate::core::OutcomeTally;
use crate::models::{AnalysisResult, StreamEvent};
use crate::services::endings::{EndingsResolver, ResolveError};
use crate::services::fetcher::{FetchError, PageFetcher, RenderClient};
use crate::services::site::SiteUrls;

/// Ways an analysis run can end early
///
/// The `Display` text of each reportable variant is the message sent to the client.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Player ID cannot be empty")]
    EmptyPlayerId,

    #[error("Failed to fetch match endings")]
    EndingsFetch(#[source] ResolveError),

    #[error("No matches found")]
    NoMatches,

    #[error("Failed to fetch match details")]
    MatchFetch {
        ending: String,
        #[source]
        source: FetchError,
    },

    #[error("Client disconnected")]
    Disconnected,
}

impl AnalysisError {
    /// Whether the client should receive a terminal error event
    pub fn is_reportable(&self) -> bool {
        !matches!(self, AnalysisError::Disconnected)
    }
}

/// Drives one analysis: resolve endings, scrape each match, count, report
///
/// Progress and the terminal event are pushed into an mpsc channel as the
/// work proceeds. All fetches run one after another.
#[derive(Debug)]
pub struct Analyzer<F, X = OffenseExtractor> {
    fetcher: F,
    extractor: X,
    resolver: EndingsResolver,
    site: SiteUrls,
    top_limit: usize,
    failure_policy: MatchFailurePolicy,
}

impl Analyzer<RenderClient, OffenseExtractor> {
    /// Build the production analyzer from loaded settings
    pub fn from_settings(settings: &Settings) -> Result<Self, ExtractorError> {
        Self::new(
            RenderClient::new(&settings.fetcher),
            OffenseExtractor::new(&settings.selectors)?,
            SiteUrls::new(settings.upstream.base_url.clone()),
            &settings.analysis,
            &settings.selectors,
        )
    }
}

impl<F: PageFetcher, X: BattleExtractor> Analyzer<F, X> {
    pub fn new(
        fetcher: F,
        extractor: X,
        site: SiteUrls,
        analysis: &AnalysisSettings,
        rules: &crate::core::SelectorRules,
    ) -> Result<Self, ExtractorError> {
        Ok(Self {
            fetcher,
            extractor,
            resolver: EndingsResolver::new(rules, analysis.max_matches)?,
            site,
            top_limit: analysis.top_limit,
            failure_policy: analysis.match_failure_policy,
        })
    }

    pub fn site(&self) -> &SiteUrls {
        &self.site
    }

    /// Run the pipeline for `player_id`, streaming events into `events`
    ///
    /// Exactly one terminal event is sent unless the receiver goes away first,
    /// in which case the run stops at the next send.
    pub async fn run(
        &self,
        player_id: &str,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<AnalysisResult, AnalysisError> {
        let player_id = player_id.trim();
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("analysis", %run_id, player_id);

        async move {
            let outcome = self.analyze(player_id, events).await;

            let terminal = match &outcome {
                Ok(result) => {
                    tracing::info!(
                        "Analysis complete: {} win labels, {} loss labels",
                        result.wins.len(),
                        result.losses.len()
                    );
                    Some(StreamEvent::completed(result.clone()))
                }
                Err(e) if e.is_reportable() => {
                    tracing::warn!("Analysis failed: {}", error_chain(e));
                    Some(StreamEvent::failed(e.to_string()))
                }
                Err(_) => {
                    tracing::debug!("Client went away, analysis abandoned");
                    None
                }
            };

            if let Some(event) = terminal {
                send(events, event).await?;
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn analyze(
        &self,
        player_id: &str,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<AnalysisResult, AnalysisError> {
        if player_id.is_empty() {
            return Err(AnalysisError::EmptyPlayerId);
        }

        send(events, StreamEvent::progress(progress::STARTED)).await?;

        let endings = self
            .resolver
            .resolve(&self.fetcher, &self.site, player_id)
            .await
            .map_err(AnalysisError::EndingsFetch)?;

        if endings.is_empty() {
            return Err(AnalysisError::NoMatches);
        }

        send(events, StreamEvent::progress(progress::ENDINGS_RESOLVED)).await?;

        let total = endings.len();
        let mut tally = OutcomeTally::new();

        for (i, ending) in endings.iter().enumerate() {
            let url = self.site.match_detail(player_id, ending);
            let html = match self.fetcher.fetch(&url).await {
                Ok(html) => html,
                Err(source) => match self.failure_policy {
                    MatchFailurePolicy::BestEffort => {
                        tracing::warn!("Skipping match {}: {}", ending, source);
                        String::new()
                    }
                    MatchFailurePolicy::FailFast => {
                        return Err(AnalysisError::MatchFetch {
                            ending: ending.clone(),
                            source,
                        });
                    }
                },
            };

            let battles = self.extractor.extract(&html);
            tracing::debug!(
                "Match {}/{} ({}): {} wins, {} losses",
                i + 1,
                total,
                ending,
                battles.wins.len(),
                battles.losses.len()
            );
            tally.accumulate(&battles);

            send(events, StreamEvent::progress(match_progress(i, total))).await?;
        }

        tracing::debug!("Tallied {} of {} matches", tally.matches(), total);
        let result = tally.finalize(self.top_limit);
        send(events, StreamEvent::progress(progress::FINISHED)).await?;

        Ok(result)
    }
}

async fn send(events: &mpsc::Sender<StreamEvent>, event: StreamEvent) -> Result<(), AnalysisError> {
    events
        .send(event)
        .await
        .map_err(|_| AnalysisError::Disconnected)
}

fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SelectorRules;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const BASE: &str = "https://site.test";

    /// Serves canned pages; URLs without a page fail
    #[derive(Default)]
    struct StubFetcher {
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        fn with_page(mut self, url: &str, html: &str) -> Self {
            self.pages.insert(url.to_string(), html.to_string());
            self
        }
    }

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 500,
            })
        }
    }

    fn history(player: &str, endings: &[&str]) -> String {
        endings
            .iter()
            .map(|e| {
                format!(
                    r#"<a class="d-block brighten-on-hover text-white" href="/p/{}/gac-history/{}/">r</a>"#,
                    player, e
                )
            })
            .collect()
    }

    fn match_page(wins: &[&str], losses: &[&str]) -> String {
        let row = |outcome: &str, label: &str| {
            format!(
                r#"<div class="paper mt-2 {}"><div class="d-flex col-gap-2 align-items-center justify-content-md-center justify-content-lg-start"><div>vs</div><div>{}</div></div></div>"#,
                outcome, label
            )
        };
        let wrappers: String = wins
            .iter()
            .map(|w| row("paper--positive", w))
            .chain(losses.iter().map(|l| row("paper--negative", l)))
            .collect();
        format!(r#"<div id="battles-attack">{}</div>"#, wrappers)
    }

    fn analyzer(fetcher: StubFetcher, policy: MatchFailurePolicy) -> Analyzer<StubFetcher> {
        let analysis = AnalysisSettings {
            match_failure_policy: policy,
            ..AnalysisSettings::default()
        };
        Analyzer::new(
            fetcher,
            OffenseExtractor::default(),
            SiteUrls::new(BASE),
            &analysis,
            &SelectorRules::default(),
        )
        .unwrap()
    }

    async fn collect(analyzer: &Analyzer<StubFetcher>, player: &str) -> Vec<StreamEvent> {
        let (tx, mut rx) = mpsc::channel(64);
        let _ = analyzer.run(player, &tx).await;
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn progress_values(events: &[StreamEvent]) -> Vec<u8> {
        events.iter().filter_map(StreamEvent::as_progress).collect()
    }

    #[tokio::test]
    async fn test_empty_player_id_single_event() {
        let analyzer = analyzer(StubFetcher::default(), MatchFailurePolicy::BestEffort);
        let events = collect(&analyzer, "   ").await;

        assert_eq!(events, vec![StreamEvent::failed("Player ID cannot be empty")]);
        assert!(analyzer.fetcher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_endings_fetch_failure() {
        let analyzer = analyzer(StubFetcher::default(), MatchFailurePolicy::BestEffort);
        let events = collect(&analyzer, "12345").await;

        assert_eq!(events, vec![
            StreamEvent::progress(5),
            StreamEvent::failed("Failed to fetch match endings"),
        ]);
    }

    #[tokio::test]
    async fn test_no_matches() {
        let fetcher = StubFetcher::default()
            .with_page(&format!("{}/p/12345/gac-history/", BASE), "<html></html>");
        let analyzer = analyzer(fetcher, MatchFailurePolicy::BestEffort);
        let events = collect(&analyzer, "12345").await;

        assert_eq!(events, vec![
            StreamEvent::progress(5),
            StreamEvent::failed("No matches found"),
        ]);
    }

    #[tokio::test]
    async fn test_full_run_event_sequence() {
        let fetcher = StubFetcher::default()
            .with_page(&format!("{}/p/7/gac-history/", BASE), &history("7", &["a", "b", "c"]))
            .with_page(&format!("{}/p/7/gac-history/a/", BASE), &match_page(&["Rex"], &["Jango"]))
            .with_page(&format!("{}/p/7/gac-history/b/", BASE), &match_page(&["Rex", "Rey"], &[]))
            .with_page(&format!("{}/p/7/gac-history/c/", BASE), &match_page(&[], &["Jango"]));
        let analyzer = analyzer(fetcher, MatchFailurePolicy::BestEffort);
        let events = collect(&analyzer, "7").await;

        assert_eq!(progress_values(&events), vec![5, 15, 41, 68, 95, 100]);
        assert_eq!(events.iter().filter(|e| e.is_done()).count(), 1);
        match events.last().unwrap() {
            StreamEvent::Completed { wins, losses, .. } => {
                assert_eq!(wins.0, vec![("Rex".to_string(), 2), ("Rey".to_string(), 1)]);
                assert_eq!(losses.0, vec![("Jango".to_string(), 2)]);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_best_effort_skips_failed_match() {
        let fetcher = StubFetcher::default()
            .with_page(&format!("{}/p/7/gac-history/", BASE), &history("7", &["a", "gone"]))
            .with_page(&format!("{}/p/7/gac-history/a/", BASE), &match_page(&["Rex"], &[]));
        let analyzer = analyzer(fetcher, MatchFailurePolicy::BestEffort);
        let events = collect(&analyzer, "7").await;

        assert_eq!(progress_values(&events), vec![5, 15, 55, 95, 100]);
        assert!(matches!(events.last(), Some(StreamEvent::Completed { .. })));
    }

    #[tokio::test]
    async fn test_fail_fast_stops_on_failed_match() {
        let fetcher = StubFetcher::default()
            .with_page(&format!("{}/p/7/gac-history/", BASE), &history("7", &["gone", "a"]))
            .with_page(&format!("{}/p/7/gac-history/a/", BASE), &match_page(&["Rex"], &[]));
        let analyzer = analyzer(fetcher, MatchFailurePolicy::FailFast);
        let events = collect(&analyzer, "7").await;

        assert_eq!(events, vec![
            StreamEvent::progress(5),
            StreamEvent::progress(15),
            StreamEvent::failed("Failed to fetch match details"),
        ]);
    }

    #[tokio::test]
    async fn test_disconnect_stops_fetching() {
        let fetcher = StubFetcher::default()
            .with_page(&format!("{}/p/7/gac-history/", BASE), &history("7", &["a"]));
        let analyzer = analyzer(fetcher, MatchFailurePolicy::BestEffort);

        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let outcome = analyzer.run("7", &tx).await;

        assert!(matches!(outcome, Err(AnalysisError::Disconnected)));
        assert!(analyzer.fetcher.calls.lock().unwrap().is_empty());
    }
}
