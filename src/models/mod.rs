// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{AnalysisResult, BattleOutcome, ExtractedBattles, RankedCounts};
pub use requests::AnalyzeQuery;
pub use responses::{ErrorResponse, HealthResponse, StreamEvent};
