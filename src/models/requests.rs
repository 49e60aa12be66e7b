use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query string of `GET /analyze`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnalyzeQuery {
    #[validate(length(min = 1))]
    #[serde(default, alias = "playerId")]
    pub player_id: String,
}

impl AnalyzeQuery {
    /// Player id with surrounding whitespace removed
    pub fn normalized(&self) -> Self {
        Self {
            player_id: self.player_id.trim().to_string(),
        }
    }
}
