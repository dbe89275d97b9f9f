use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the append-only regime history, keyed by calculation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub calculation_date: NaiveDate,
    pub shibor_2w: f64,
    /// Daily percentage change. Published without a documented range or sign convention.
    pub change_pct: f64,
    pub rsi5: f64,
    pub risk_on: bool,
}
