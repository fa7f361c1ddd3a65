use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Research scan depth, controlling backend synthesis effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Depth {
    Low,
    Medium,
    High,
}

impl Depth {
    /// Parse user input. Case-insensitive; returns None for anything
    /// outside the three accepted keywords.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Depth::Low),
            "medium" => Some(Depth::Medium),
            "high" => Some(Depth::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Depth::Low => "low",
            Depth::Medium => "medium",
            Depth::High => "high",
        }
    }
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier correlating an in-flight request with its response.
/// Responses whose id no longer matches the loading phase are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The currently displayed summary and the parameters it was generated with.
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub topic: String,
    pub depth: Depth,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Request lifecycle phase: Idle → Loading → Success/Error. A new
/// submission from any phase resets to Loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading { request: RequestId },
    Success,
    Error { message: String },
}

/// What the user last submitted, kept so /retry can re-invoke it with the
/// same parameters.
#[derive(Debug, Clone)]
pub enum Submission {
    Fresh { topic: String, depth: Depth },
    Cached { topic: String, depth: Depth },
}

/// Session state owned by the engine: current query parameters, the active
/// result, and the request phase. Passed down explicitly, never global.
#[derive(Debug)]
pub struct SessionState {
    pub depth: Depth,
    pub phase: Phase,
    pub result: Option<SessionResult>,
    pub last_submission: Option<Submission>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            depth: Depth::Medium,
            phase: Phase::Idle,
            result: None,
            last_submission: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
