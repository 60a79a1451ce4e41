//! Source health report returned by `GET /health`.

use serde::{Deserialize, Serialize};

/// Health classification of a single upstream source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No successful fetch has happened yet.
    Unknown,
    Healthy,
    /// One or two consecutive failures.
    Degraded,
    /// Three or more consecutive failures.
    Down,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
        };
        f.write_str(s)
    }
}

/// Per-source entry in the health report. Ages are in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealthReport {
    pub source: String,
    pub status: HealthStatus,
    pub last_success_ago: Option<i64>,
    pub last_error_ago: Option<i64>,
    pub last_error: Option<String>,
    pub consecutive_fails: u32,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub version: String,
    pub sources: Vec<SourceHealthReport>,
}
