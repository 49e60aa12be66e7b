use serde::{Deserialize, Serialize};
use crate::models::domain::{AnalysisResult, RankedCounts};

/// One server-sent event of the `/analyze` stream
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamEvent {
    Progress {
        progress: u8,
    },
    Failed {
        done: bool,
        error: String,
    },
    Completed {
        done: bool,
        wins: RankedCounts,
        losses: RankedCounts,
    },
}

impl StreamEvent {
    pub fn progress(percent: u8) -> Self {
        StreamEvent::Progress { progress: percent.min(100) }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        StreamEvent::Failed {
            done: true,
            error: message.into(),
        }
    }

    pub fn completed(result: AnalysisResult) -> Self {
        StreamEvent::Completed {
            done: true,
            wins: result.wins,
            losses: result.losses,
        }
    }

    /// Terminal events close the stream
    pub fn is_done(&self) -> bool {
        !matches!(self, StreamEvent::Progress { .. })
    }

    pub fn as_progress(&self) -> Option<u8> {
        match self {
            StreamEvent::Progress { progress } => Some(*progress),
            _ => None,
        }
    }

    /// Encode as an SSE frame: `data: <json>\n\n`
    pub fn to_sse_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
