use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Transport failure while retrieving a published artifact.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request for {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path}: HTTP {status}")]
    Status { path: String, status: u16 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Client errors (4xx) will not change on retry, except rate limiting.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Client(_) | FetchError::Io { .. } => false,
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => {
                *status == 429 || !(400..500).contains(status)
            }
        }
    }
}

/// Malformed artifact content.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{artifact}: invalid CSV: {source}")]
    Csv {
        artifact: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{artifact}: invalid JSON: {source}")]
    Json {
        artifact: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{artifact}: missing column {column:?}")]
    MissingColumn {
        artifact: &'static str,
        column: &'static str,
    },

    #[error("{artifact} line {line}: {detail}")]
    Row {
        artifact: &'static str,
        line: u64,
        detail: String,
    },

    #[error("{artifact}: {detail}")]
    Invalid {
        artifact: &'static str,
        detail: String,
    },
}

/// Structural violations in an otherwise well-formed artifact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("history must contain at least one record")]
    EmptyHistory,

    #[error("duplicate calculation date {0}")]
    DuplicateDate(NaiveDate),

    #[error("calculation date {0} is out of order")]
    OutOfOrder(NaiveDate),

    #[error("rank {0} is outside 1..=10")]
    RankOutOfRange(i32),

    #[error("duplicate rank {0}")]
    DuplicateRank(i32),

    #[error("missing rank {0}")]
    RankGap(i32),

    #[error("alpha score {score} at rank {rank} exceeds {previous} at rank {}", .rank - 1)]
    ScoreOrderViolation { rank: i32, score: f64, previous: f64 },
}

/// The field a snapshot disagrees on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyKind {
    CalculationDate,
    TargetDate,
    MarketRegime,
    Action,
    LastUpdated,
    Shibor2w,
    Rsi5,
}

impl fmt::Display for ConsistencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConsistencyKind::CalculationDate => "calculation_date",
            ConsistencyKind::TargetDate => "target_date",
            ConsistencyKind::MarketRegime => "market_regime",
            ConsistencyKind::Action => "action",
            ConsistencyKind::LastUpdated => "last_updated",
            ConsistencyKind::Shibor2w => "shibor_2w",
            ConsistencyKind::Rsi5 => "rsi_5",
        };
        f.write_str(s)
    }
}

/// Snapshot disagrees with the history log (or with itself).
///
/// Carries both sides so the caller can choose which source to trust.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("snapshot {kind} mismatch: expected {expected}, got {actual}")]
pub struct ConsistencyError {
    pub kind: ConsistencyKind,
    pub expected: String,
    pub actual: String,
}

impl ConsistencyError {
    pub fn new(kind: ConsistencyKind, expected: impl fmt::Display, actual: impl fmt::Display) -> Self {
        Self {
            kind,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("regime timeline has no records")]
pub struct EmptyTimelineError;

/// Anything that can stop a board from loading.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
