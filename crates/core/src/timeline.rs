use crate::domain::history::HistoryRecord;
use crate::domain::regime::{Action, MarketRegime};
use crate::domain::snapshot::Snapshot;
use crate::error::{ConsistencyError, ConsistencyKind, EmptyTimelineError, ValidationError};
use crate::time::calendar;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;

/// Default tolerance for comparing snapshot indicators against history.
pub const VALUE_TOLERANCE: f64 = 1e-6;

/// Ordered, validated regime history.
///
/// Immutable once loaded: a newer publication is loaded into a new timeline that replaces this one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegimeTimeline {
    records: Vec<HistoryRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistoryStats {
    pub risk_on_days: usize,
    pub risk_off_days: usize,
    pub total_days: usize,
}

impl RegimeTimeline {
    /// Unsorted input is reordered by calculation date. Records sharing a date are rejected,
    /// never merged.
    pub fn load(records: Vec<HistoryRecord>) -> Result<Self, ValidationError> {
        if records.is_empty() {
            return Err(ValidationError::EmptyHistory);
        }

        let mut records = records;
        let sorted = records
            .windows(2)
            .all(|w| w[0].calculation_date <= w[1].calculation_date);
        if !sorted {
            tracing::warn!(
                records = records.len(),
                "regime history is not in date order; sorting"
            );
            records.sort_by_key(|r| r.calculation_date);
        }

        for pair in records.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            match prev.calculation_date.cmp(&cur.calculation_date) {
                Ordering::Less => {}
                Ordering::Equal => return Err(ValidationError::DuplicateDate(cur.calculation_date)),
                Ordering::Greater => return Err(ValidationError::OutOfOrder(cur.calculation_date)),
            }
        }

        Ok(Self { records })
    }

    pub fn latest(&self) -> Result<&HistoryRecord, EmptyTimelineError> {
        self.records.last().ok_or(EmptyTimelineError)
    }

    pub fn target_date_for(calculation_date: NaiveDate) -> NaiveDate {
        calendar::target_date_for(calculation_date)
    }

    pub fn regime_label_for(record: &HistoryRecord) -> (MarketRegime, Action) {
        let regime = MarketRegime::from_risk_on(record.risk_on);
        (regime, regime.action())
    }

    pub fn latest_target_date(&self) -> Result<NaiveDate, EmptyTimelineError> {
        Ok(Self::target_date_for(self.latest()?.calculation_date))
    }

    /// Checks the snapshot against the latest history record.
    ///
    /// Fields are compared in order (calculation date, target date, regime, action) and the
    /// first divergence is returned. Neither source is preferred; the caller decides.
    pub fn reconcile(&self, snapshot: &Snapshot) -> Result<&Self, ConsistencyError> {
        let latest = self.latest().map_err(|_| {
            ConsistencyError::new(
                ConsistencyKind::CalculationDate,
                "<empty history>",
                snapshot.calculation_date,
            )
        })?;

        if snapshot.calculation_date != latest.calculation_date {
            return Err(ConsistencyError::new(
                ConsistencyKind::CalculationDate,
                latest.calculation_date,
                snapshot.calculation_date,
            ));
        }

        let expected_target = Self::target_date_for(snapshot.calculation_date);
        if snapshot.target_date != expected_target {
            return Err(ConsistencyError::new(
                ConsistencyKind::TargetDate,
                expected_target,
                snapshot.target_date,
            ));
        }

        let (regime, action) = Self::regime_label_for(latest);
        if snapshot.market_regime != regime {
            return Err(ConsistencyError::new(
                ConsistencyKind::MarketRegime,
                regime,
                snapshot.market_regime,
            ));
        }
        if snapshot.action != action {
            return Err(ConsistencyError::new(
                ConsistencyKind::Action,
                action,
                snapshot.action,
            ));
        }

        Ok(self)
    }

    /// Advisory: snapshot indicators should repeat the latest history row.
    pub fn reconcile_values(
        &self,
        snapshot: &Snapshot,
        tolerance: f64,
    ) -> Result<(), ConsistencyError> {
        let Some(record) = self.get(snapshot.calculation_date) else {
            return Err(ConsistencyError::new(
                ConsistencyKind::CalculationDate,
                "a history record for the snapshot date",
                snapshot.calculation_date,
            ));
        };

        if (record.shibor_2w - snapshot.shibor_2w).abs() > tolerance {
            return Err(ConsistencyError::new(
                ConsistencyKind::Shibor2w,
                record.shibor_2w,
                snapshot.shibor_2w,
            ));
        }
        if (record.rsi5 - snapshot.rsi5).abs() > tolerance {
            return Err(ConsistencyError::new(
                ConsistencyKind::Rsi5,
                record.rsi5,
                snapshot.rsi5,
            ));
        }

        Ok(())
    }

    pub fn get(&self, calculation_date: NaiveDate) -> Option<&HistoryRecord> {
        self.records
            .binary_search_by_key(&calculation_date, |r| r.calculation_date)
            .ok()
            .map(|idx| &self.records[idx])
    }

    pub fn records(&self) -> &[HistoryRecord] {
        &self.records
    }

    /// The last `n` records, newest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &HistoryRecord> {
        self.records.iter().rev().take(n)
    }

    pub fn stats(&self, window: usize) -> HistoryStats {
        HistoryStats::from_records(self.recent(window))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl HistoryStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a HistoryRecord>) -> Self {
        let mut stats = HistoryStats {
            risk_on_days: 0,
            risk_off_days: 0,
            total_days: 0,
        };
        for r in records {
            stats.total_days += 1;
            if r.risk_on {
                stats.risk_on_days += 1;
            } else {
                stats.risk_off_days += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    pub(crate) fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    pub(crate) fn record(date: NaiveDate, risk_on: bool) -> HistoryRecord {
        HistoryRecord {
            calculation_date: date,
            shibor_2w: 1.512,
            change_pct: -1.34,
            rsi5: 38.4,
            risk_on,
        }
    }

    fn published_at(date: NaiveDate) -> NaiveDateTime {
        date.and_hms_opt(18, 30, 0).unwrap()
    }

    pub(crate) fn snapshot_for(date: NaiveDate, regime: MarketRegime) -> Snapshot {
        Snapshot {
            calculation_date: date,
            target_date: calendar::target_date_for(date),
            market_regime: regime,
            action: regime.action(),
            shibor_2w: 1.512,
            rsi5: 38.4,
            signal_strength: "Moderate".to_string(),
            last_updated: published_at(date),
        }
    }

    fn timeline() -> RegimeTimeline {
        RegimeTimeline::load(vec![
            record(d(2025, 11, 17), false),
            record(d(2026, 2, 9), false),
        ])
        .unwrap()
    }

    #[test]
    fn latest_is_max_calculation_date() {
        let t = timeline();
        assert_eq!(t.latest().unwrap().calculation_date, d(2026, 2, 9));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            RegimeTimeline::load(Vec::new()),
            Err(ValidationError::EmptyHistory)
        );
    }

    #[test]
    fn unloaded_timeline_has_no_latest() {
        assert_eq!(RegimeTimeline::default().latest(), Err(EmptyTimelineError));
    }

    #[test]
    fn duplicate_dates_fail() {
        let res = RegimeTimeline::load(vec![
            record(d(2026, 2, 6), true),
            record(d(2026, 2, 9), false),
            record(d(2026, 2, 9), true),
        ]);
        assert_eq!(res, Err(ValidationError::DuplicateDate(d(2026, 2, 9))));
    }

    #[test]
    fn duplicates_are_caught_after_sorting() {
        let res = RegimeTimeline::load(vec![
            record(d(2026, 2, 9), false),
            record(d(2026, 2, 6), true),
            record(d(2026, 2, 9), true),
        ]);
        assert_eq!(res, Err(ValidationError::DuplicateDate(d(2026, 2, 9))));
    }

    #[test]
    fn unsorted_input_is_reordered() {
        let t = RegimeTimeline::load(vec![
            record(d(2026, 2, 9), false),
            record(d(2025, 11, 17), true),
            record(d(2026, 2, 6), true),
        ])
        .unwrap();
        let dates: Vec<_> = t.records().iter().map(|r| r.calculation_date).collect();
        assert_eq!(dates, vec![d(2025, 11, 17), d(2026, 2, 6), d(2026, 2, 9)]);
        assert_eq!(t.latest().unwrap().calculation_date, d(2026, 2, 9));
    }

    #[test]
    fn labels_are_total_over_the_flag() {
        let off = RegimeTimeline::regime_label_for(&record(d(2026, 2, 9), false));
        let on = RegimeTimeline::regime_label_for(&record(d(2026, 2, 9), true));
        assert_eq!(off, (MarketRegime::RiskOff, Action::Defensive));
        assert_eq!(on, (MarketRegime::RiskOn, Action::Offensive));
    }

    #[test]
    fn target_date_for_crosses_boundaries() {
        assert_eq!(RegimeTimeline::target_date_for(d(2026, 1, 31)), d(2026, 2, 1));
        assert_eq!(RegimeTimeline::target_date_for(d(2025, 12, 31)), d(2026, 1, 1));
        assert_eq!(timeline().latest_target_date().unwrap(), d(2026, 2, 10));
    }

    #[test]
    fn reconcile_accepts_matching_snapshot() {
        let t = timeline();
        let snapshot = snapshot_for(d(2026, 2, 9), MarketRegime::RiskOff);
        assert_eq!(snapshot.target_date, d(2026, 2, 10));
        assert!(t.reconcile(&snapshot).is_ok());
    }

    #[test]
    fn reconcile_rejects_two_day_offset() {
        let t = timeline();
        let mut snapshot = snapshot_for(d(2026, 2, 9), MarketRegime::RiskOff);
        snapshot.target_date = d(2026, 2, 11);
        let err = t.reconcile(&snapshot).unwrap_err();
        assert_eq!(err.kind, ConsistencyKind::TargetDate);
        assert_eq!(err.expected, "2026-02-10");
        assert_eq!(err.actual, "2026-02-11");
    }

    #[test]
    fn reconcile_rejects_stale_snapshot() {
        let t = timeline();
        let snapshot = snapshot_for(d(2025, 11, 17), MarketRegime::RiskOff);
        let err = t.reconcile(&snapshot).unwrap_err();
        assert_eq!(err.kind, ConsistencyKind::CalculationDate);
    }

    #[test]
    fn reconcile_rejects_flipped_regime() {
        let t = timeline();
        let snapshot = snapshot_for(d(2026, 2, 9), MarketRegime::RiskOn);
        let err = t.reconcile(&snapshot).unwrap_err();
        assert_eq!(err.kind, ConsistencyKind::MarketRegime);
        assert_eq!(err.expected, "Risk Off");
    }

    #[test]
    fn reconcile_rejects_mismatched_action() {
        let t = timeline();
        let mut snapshot = snapshot_for(d(2026, 2, 9), MarketRegime::RiskOff);
        snapshot.action = Action::Offensive;
        assert_eq!(
            t.reconcile(&snapshot).unwrap_err().kind,
            ConsistencyKind::Action
        );
    }

    #[test]
    fn reconcile_values_flags_indicator_drift() {
        let t = timeline();
        let mut snapshot = snapshot_for(d(2026, 2, 9), MarketRegime::RiskOff);
        assert!(t.reconcile_values(&snapshot, VALUE_TOLERANCE).is_ok());

        snapshot.rsi5 = 40.0;
        let err = t.reconcile_values(&snapshot, VALUE_TOLERANCE).unwrap_err();
        assert_eq!(err.kind, ConsistencyKind::Rsi5);
    }

    #[test]
    fn recent_is_newest_first_and_stats_count_the_window() {
        let t = RegimeTimeline::load(vec![
            record(d(2026, 2, 4), true),
            record(d(2026, 2, 5), true),
            record(d(2026, 2, 6), false),
            record(d(2026, 2, 9), false),
        ])
        .unwrap();

        let dates: Vec<_> = t.recent(2).map(|r| r.calculation_date).collect();
        assert_eq!(dates, vec![d(2026, 2, 9), d(2026, 2, 6)]);

        assert_eq!(
            t.stats(3),
            HistoryStats {
                risk_on_days: 1,
                risk_off_days: 2,
                total_days: 3,
            }
        );
        assert_eq!(t.stats(30).total_days, 4);
    }

    #[test]
    fn get_finds_exact_dates_only() {
        let t = timeline();
        assert!(t.get(d(2025, 11, 17)).is_some());
        assert!(t.get(d(2025, 11, 18)).is_none());
    }
}
