// Core scraping and counting exports
pub mod aggregator;
pub mod endings;
pub mod extractor;
pub mod progress;

pub use aggregator::{FrequencyMap, OutcomeTally};
pub use endings::{ending_from_href, parse_endings};
pub use extractor::{BattleExtractor, ExtractorError, OffenseExtractor, SelectorRules};
pub use progress::match_progress;
