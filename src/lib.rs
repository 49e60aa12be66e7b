//! GAC Scout - streams offense counters from a player's recent GAC matches
//!
//! This library scrapes a player's Grand Arena Championship history pages,
//! extracts the opponents of each offense battle and counts the squads the
//! player most often beats or loses to, reporting progress as it goes.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{BattleExtractor, OffenseExtractor, OutcomeTally, SelectorRules};
pub use models::{AnalysisResult, ExtractedBattles, RankedCounts, StreamEvent};
pub use services::{Analyzer, PageFetcher, RenderClient, SiteUrls};
