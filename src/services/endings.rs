use scraper::Selector;
use thiserror::Error;

use crate::core::endings::parse_endings;
use crate::core::extractor::{compile_selector, ExtractorError, SelectorRules};
use crate::services::fetcher::{FetchError, PageFetcher};
use crate::services::site::SiteUrls;

/// Errors raised while resolving match endings
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to fetch history page: {0}")]
    Fetch(#[from] FetchError),
}

/// Finds the most recent match endings of a player
#[derive(Debug, Clone)]
pub struct EndingsResolver {
    anchor: Selector,
    max_matches: usize,
}

impl EndingsResolver {
    pub fn new(rules: &SelectorRules, max_matches: usize) -> Result<Self, ExtractorError> {
        Ok(Self {
            anchor: compile_selector("endings_anchor", &rules.endings_anchor)?,
            max_matches,
        })
    }

    /// Fetch the history index and return at most `max_matches` endings
    ///
    /// An empty vector means the page loaded but listed no matches.
    pub async fn resolve<F: PageFetcher>(
        &self,
        fetcher: &F,
        site: &SiteUrls,
        player_id: &str,
    ) -> Result<Vec<String>, ResolveError> {
        let url = site.history_index(player_id);
        let html = fetcher.fetch(&url).await?;

        let endings = parse_endings(&html, &self.anchor, player_id, self.max_matches);
        tracing::debug!("Resolved {} match endings for {}", endings.len(), player_id);

        Ok(endings)
    }
}
