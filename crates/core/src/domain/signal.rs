use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const TOP_N: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeBucket {
    Small,
    Mid,
    Large,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityBucket {
    Low,
    Medium,
    High,
}

impl SizeBucket {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Some(SizeBucket::Small),
            "mid" => Some(SizeBucket::Mid),
            "large" => Some(SizeBucket::Large),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SizeBucket::Small => "Small",
            SizeBucket::Mid => "Mid",
            SizeBucket::Large => "Large",
        }
    }
}

impl LiquidityBucket {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(LiquidityBucket::Low),
            "medium" => Some(LiquidityBucket::Medium),
            "high" => Some(LiquidityBucket::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LiquidityBucket::Low => "Low",
            LiquidityBucket::Medium => "Medium",
            LiquidityBucket::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSignal {
    pub rank: i32,
    pub symbol: String,
    pub alpha_score: f64,
    /// Percent units: `2.35` means 2.35%.
    pub return_1d: f64,
    pub momentum_20d: f64,
    pub size_bucket: SizeBucket,
    pub liquidity_bucket: LiquidityBucket,
}

/// Validated top-N list, held in rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedSignalTable {
    signals: Vec<RankedSignal>,
}

impl RankedSignalTable {
    /// Rows may arrive in any order. Ranks must be exactly 1..=10 and alpha scores must not
    /// increase with rank (ties are fine).
    pub fn load(rows: Vec<RankedSignal>) -> Result<Self, ValidationError> {
        let mut seen_ranks = BTreeSet::<i32>::new();
        for row in &rows {
            if !(1..=TOP_N).contains(&row.rank) {
                return Err(ValidationError::RankOutOfRange(row.rank));
            }
            if !seen_ranks.insert(row.rank) {
                return Err(ValidationError::DuplicateRank(row.rank));
            }
        }

        // Unique and in range, so no gap also means exactly TOP_N rows.
        for rank in 1..=TOP_N {
            if !seen_ranks.contains(&rank) {
                return Err(ValidationError::RankGap(rank));
            }
        }

        let mut signals = rows;
        signals.sort_by_key(|s| s.rank);

        for pair in signals.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            if cur.alpha_score > prev.alpha_score {
                return Err(ValidationError::ScoreOrderViolation {
                    rank: cur.rank,
                    score: cur.alpha_score,
                    previous: prev.alpha_score,
                });
            }
        }

        Ok(Self { signals })
    }

    pub fn signals(&self) -> &[RankedSignal] {
        &self.signals
    }

    /// The first `limit` rows, for views that only show a teaser of the list.
    pub fn preview(&self, limit: usize) -> &[RankedSignal] {
        &self.signals[..limit.min(self.signals.len())]
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.signals.iter().map(|s| s.symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
