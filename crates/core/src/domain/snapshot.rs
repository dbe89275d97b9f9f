use crate::domain::regime::{Action, MarketRegime};
use crate::error::{ConsistencyError, ConsistencyKind};
use crate::time::calendar::target_date_for;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// The single latest regime decision, published for immediate display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub calculation_date: NaiveDate,
    pub target_date: NaiveDate,
    pub market_regime: MarketRegime,
    pub action: Action,
    pub shibor_2w: f64,
    pub rsi5: f64,
    pub signal_strength: String,
    pub last_updated: NaiveDateTime,
}

impl Snapshot {
    /// Checks the snapshot against itself, without looking at history.
    pub fn validate(&self) -> Result<(), ConsistencyError> {
        let expected_target = target_date_for(self.calculation_date);
        if self.target_date != expected_target {
            return Err(ConsistencyError::new(
                ConsistencyKind::TargetDate,
                expected_target,
                self.target_date,
            ));
        }

        let expected_action = self.market_regime.action();
        if self.action != expected_action {
            return Err(ConsistencyError::new(
                ConsistencyKind::Action,
                expected_action,
                self.action,
            ));
        }

        if self.last_updated.date() < self.calculation_date {
            return Err(ConsistencyError::new(
                ConsistencyKind::LastUpdated,
                format!(">= {}", self.calculation_date),
                self.last_updated.format("%Y-%m-%d %H:%M"),
            ));
        }

        Ok(())
    }
}
