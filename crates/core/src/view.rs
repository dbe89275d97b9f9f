//! Display-ready view models. Renderers consume these and do no date or label logic of their own.

use crate::domain::history::HistoryRecord;
use crate::domain::regime::{Action, MarketRegime};
use crate::domain::signal::RankedSignal;
use crate::domain::snapshot::Snapshot;
use crate::timeline::{HistoryStats, RegimeTimeline};
use chrono::NaiveDate;
use serde::Serialize;

const MISSING: &str = "—";
const SYMBOL_WIDTH: usize = 6;

/// `+1.23%`, `-0.50%`, `0.00%`. Non-finite values render as a dash.
pub fn format_percent(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    let sign = if value > 0.0 { "+" } else { "" };
    format!("{sign}{value:.decimals$}%")
}

pub fn format_score(value: f64) -> String {
    if !value.is_finite() {
        return MISSING.to_string();
    }
    format!("{value:.2}")
}

/// Exchange codes are six digits; CSV round-trips through spreadsheets drop leading zeros.
pub fn pad_symbol(symbol: &str) -> String {
    format!("{:0>width$}", symbol.trim(), width = SYMBOL_WIDTH)
}

pub fn chart_symbol(symbol: &str) -> String {
    let code = pad_symbol(symbol);
    let szse = ["000", "001", "002", "003", "300", "301"];
    let exchange = if szse.iter().any(|p| code.starts_with(p)) {
        "SZSE"
    } else {
        // 600/601/603/605/688 and anything unrecognised.
        "SSE"
    };
    format!("{exchange}:{code}")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegimeCard {
    pub regime: MarketRegime,
    pub action: Action,
    /// The date the decision applies to (T+1). This is the date shown to users.
    pub display_date: NaiveDate,
    pub calculation_date: NaiveDate,
    pub shibor_2w: String,
    pub rsi5: String,
    pub signal_strength: Option<String>,
    pub updated: Option<String>,
}

impl RegimeCard {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            regime: snapshot.market_regime,
            action: snapshot.action,
            display_date: snapshot.target_date,
            calculation_date: snapshot.calculation_date,
            shibor_2w: format_shibor(snapshot.shibor_2w),
            rsi5: format_rsi(snapshot.rsi5),
            signal_strength: Some(snapshot.signal_strength.clone()),
            updated: Some(snapshot.last_updated.format("%Y-%m-%d").to_string()),
        }
    }

    /// Builds the card from history alone, for when the snapshot is not trusted.
    pub fn from_record(record: &HistoryRecord) -> Self {
        let (regime, action) = RegimeTimeline::regime_label_for(record);
        Self {
            regime,
            action,
            display_date: RegimeTimeline::target_date_for(record.calculation_date),
            calculation_date: record.calculation_date,
            shibor_2w: format_shibor(record.shibor_2w),
            rsi5: format_rsi(record.rsi5),
            signal_strength: None,
            updated: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryRowView {
    pub calculation_date: NaiveDate,
    pub target_date: NaiveDate,
    pub regime: MarketRegime,
    pub rsi5: String,
    pub shibor_2w: String,
    pub change: String,
    pub change_positive: bool,
}

impl From<&HistoryRecord> for HistoryRowView {
    fn from(r: &HistoryRecord) -> Self {
        let change = if r.change_pct.is_finite() {
            format!("{:+.1}%", r.change_pct)
        } else {
            MISSING.to_string()
        };
        Self {
            calculation_date: r.calculation_date,
            target_date: RegimeTimeline::target_date_for(r.calculation_date),
            regime: MarketRegime::from_risk_on(r.risk_on),
            rsi5: format_rsi(r.rsi5),
            shibor_2w: format_shibor(r.shibor_2w),
            change,
            change_positive: r.change_pct > 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    /// Newest first.
    pub rows: Vec<HistoryRowView>,
    pub stats: HistoryStats,
    pub current: Option<MarketRegime>,
}

impl HistoryView {
    pub fn build(timeline: &RegimeTimeline, window: usize) -> Self {
        let rows: Vec<HistoryRowView> = timeline.recent(window).map(HistoryRowView::from).collect();
        Self {
            rows,
            stats: timeline.stats(window),
            current: timeline
                .latest()
                .ok()
                .map(|r| MarketRegime::from_risk_on(r.risk_on)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRowView {
    pub rank: i32,
    pub symbol: String,
    pub chart_symbol: String,
    pub alpha_score: String,
    pub return_1d: String,
    pub return_1d_positive: bool,
    pub momentum_20d: String,
    pub momentum_20d_positive: bool,
    pub size: &'static str,
    pub liquidity: &'static str,
}

impl From<&RankedSignal> for SignalRowView {
    fn from(s: &RankedSignal) -> Self {
        Self {
            rank: s.rank,
            symbol: pad_symbol(&s.symbol),
            chart_symbol: chart_symbol(&s.symbol),
            alpha_score: format_score(s.alpha_score),
            return_1d: format_percent(s.return_1d, 2),
            return_1d_positive: s.return_1d > 0.0,
            momentum_20d: format_percent(s.momentum_20d, 2),
            momentum_20d_positive: s.momentum_20d > 0.0,
            size: s.size_bucket.as_str(),
            liquidity: s.liquidity_bucket.as_str(),
        }
    }
}

fn format_shibor(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.3}%")
    } else {
        MISSING.to_string()
    }
}

fn format_rsi(v: f64) -> String {
    if v.is_finite() {
        format!("{v:.1}")
    } else {
        MISSING.to_string()
    }
}
