//! Wire shapes of the three published artifacts and their conversion into domain types.
//!
//! Parsing only rejects malformed content. Structural rules (rank gaps, duplicate dates) and
//! cross-artifact consistency are checked by the timeline and signal table.

use crate::domain::history::HistoryRecord;
use crate::domain::regime::{Action, MarketRegime};
use crate::domain::signal::{LiquidityBucket, RankedSignal, SizeBucket};
use crate::domain::snapshot::Snapshot;
use crate::error::ParseError;
use crate::time::calendar::{parse_date, parse_timestamp};
use csv::StringRecord;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_ARTIFACT: &str = "regime_snapshot.json";
pub const TOP10_ARTIFACT: &str = "web_top10.csv";
pub const HISTORY_ARTIFACT: &str = "regime_history.csv";

const HISTORY_COLUMNS: [&str; 5] = ["date", "shibor_2w", "涨跌", "rsi_5", "risk_on"];
const TOP10_COLUMNS: [&str; 7] = [
    "Rank",
    "Symbol",
    "Alpha Score",
    "1D Return",
    "20D Momentum",
    "Size",
    "Liquidity",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub target_date: String,
    pub calculation_date: String,
    pub market_regime: String,
    pub action: String,
    pub shibor_2w: f64,
    pub rsi_5: f64,
    pub signal_strength: String,
    pub last_updated: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryCsvRow {
    pub date: String,
    pub shibor_2w: f64,
    #[serde(rename = "涨跌")]
    pub change_pct: f64,
    pub rsi_5: f64,
    pub risk_on: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Top10CsvRow {
    #[serde(rename = "Rank")]
    pub rank: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Alpha Score")]
    pub alpha_score: f64,
    #[serde(rename = "1D Return")]
    pub return_1d: String,
    #[serde(rename = "20D Momentum")]
    pub momentum_20d: String,
    #[serde(rename = "Size")]
    pub size: String,
    #[serde(rename = "Liquidity")]
    pub liquidity: String,
}

impl SnapshotDocument {
    pub fn validate_and_into_snapshot(self) -> Result<Snapshot, ParseError> {
        let invalid = |detail: String| ParseError::Invalid {
            artifact: SNAPSHOT_ARTIFACT,
            detail,
        };

        let calculation_date = parse_date(&self.calculation_date).map_err(|e| {
            invalid(format!("calculation_date {:?}: {e}", self.calculation_date))
        })?;
        let target_date = parse_date(&self.target_date)
            .map_err(|e| invalid(format!("target_date {:?}: {e}", self.target_date)))?;
        let last_updated = parse_timestamp(&self.last_updated)
            .map_err(|e| invalid(format!("last_updated {:?}: {e}", self.last_updated)))?;
        let market_regime = MarketRegime::parse(&self.market_regime)
            .ok_or_else(|| invalid(format!("unknown market_regime {:?}", self.market_regime)))?;
        let action = Action::parse(&self.action)
            .ok_or_else(|| invalid(format!("unknown action {:?}", self.action)))?;

        if !self.shibor_2w.is_finite() || !self.rsi_5.is_finite() {
            return Err(invalid("shibor_2w and rsi_5 must be finite".to_string()));
        }

        Ok(Snapshot {
            calculation_date,
            target_date,
            market_regime,
            action,
            shibor_2w: self.shibor_2w,
            rsi5: self.rsi_5,
            signal_strength: self.signal_strength.trim().to_string(),
            last_updated,
        })
    }
}

impl HistoryCsvRow {
    pub fn validate_and_into_record(self, line: u64) -> Result<HistoryRecord, ParseError> {
        let row_err = |detail: String| ParseError::Row {
            artifact: HISTORY_ARTIFACT,
            line,
            detail,
        };

        let calculation_date =
            parse_date(&self.date).map_err(|e| row_err(format!("date {:?}: {e}", self.date)))?;

        let risk_on = match self.risk_on.trim() {
            "1" => true,
            "0" => false,
            other => return Err(row_err(format!("risk_on must be 0 or 1 (got {other:?})"))),
        };

        for (name, v) in [("shibor_2w", self.shibor_2w), ("rsi_5", self.rsi_5)] {
            if !v.is_finite() {
                return Err(row_err(format!("{name} must be finite")));
            }
        }

        Ok(HistoryRecord {
            calculation_date,
            shibor_2w: self.shibor_2w,
            change_pct: self.change_pct,
            rsi5: self.rsi_5,
            risk_on,
        })
    }
}

impl Top10CsvRow {
    pub fn validate_and_into_signal(self, line: u64) -> Result<RankedSignal, ParseError> {
        let row_err = |detail: String| ParseError::Row {
            artifact: TOP10_ARTIFACT,
            line,
            detail,
        };

        let rank = parse_rank(&self.rank)
            .ok_or_else(|| row_err(format!("Rank {:?} is not an integer", self.rank)))?;

        let symbol = self.symbol.trim().to_string();
        if symbol.is_empty() {
            return Err(row_err("Symbol must be non-empty".to_string()));
        }

        if !self.alpha_score.is_finite() {
            return Err(row_err("Alpha Score must be finite".to_string()));
        }

        let return_1d = parse_percent(&self.return_1d)
            .ok_or_else(|| row_err(format!("1D Return {:?} is not a percentage", self.return_1d)))?;
        let momentum_20d = parse_percent(&self.momentum_20d).ok_or_else(|| {
            row_err(format!(
                "20D Momentum {:?} is not a percentage",
                self.momentum_20d
            ))
        })?;

        let size_bucket = SizeBucket::parse(&self.size)
            .ok_or_else(|| row_err(format!("unknown Size {:?}", self.size)))?;
        let liquidity_bucket = LiquidityBucket::parse(&self.liquidity)
            .ok_or_else(|| row_err(format!("unknown Liquidity {:?}", self.liquidity)))?;

        Ok(RankedSignal {
            rank,
            symbol,
            alpha_score: self.alpha_score,
            return_1d,
            momentum_20d,
            size_bucket,
            liquidity_bucket,
        })
    }
}

pub fn parse_snapshot_json(text: &str) -> Result<Snapshot, ParseError> {
    let doc = serde_json::from_str::<SnapshotDocument>(text).map_err(|source| ParseError::Json {
        artifact: SNAPSHOT_ARTIFACT,
        source,
    })?;
    doc.validate_and_into_snapshot()
}

pub fn parse_history_csv(text: &str) -> Result<Vec<HistoryRecord>, ParseError> {
    read_rows(text, HISTORY_ARTIFACT, &HISTORY_COLUMNS, |row: HistoryCsvRow, line| {
        row.validate_and_into_record(line)
    })
}

pub fn parse_top10_csv(text: &str) -> Result<Vec<RankedSignal>, ParseError> {
    read_rows(text, TOP10_ARTIFACT, &TOP10_COLUMNS, |row: Top10CsvRow, line| {
        row.validate_and_into_signal(line)
    })
}

/// Accepts `"2.35%"`, `"+2.35%"`, `"-0.4"` and plain numbers. Values are in percent units.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let s = raw.trim();
    let s = s.strip_suffix('%').unwrap_or(s).trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// Spreadsheet exports sometimes write integer columns as "3.0".
fn parse_rank(raw: &str) -> Option<i32> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<i32>() {
        return Some(n);
    }
    let f = s.parse::<f64>().ok()?;
    (f.fract() == 0.0 && f.abs() <= i32::MAX as f64).then_some(f as i32)
}

fn read_rows<R, T>(
    text: &str,
    artifact: &'static str,
    required: &[&'static str],
    convert: impl Fn(R, u64) -> Result<T, ParseError>,
) -> Result<Vec<T>, ParseError>
where
    R: serde::de::DeserializeOwned,
{
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|source| ParseError::Csv { artifact, source })?
        .clone();
    ensure_columns(artifact, &headers, required)?;

    let mut out = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|source| ParseError::Csv { artifact, source })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row = record
            .deserialize::<R>(Some(&headers))
            .map_err(|e| ParseError::Row {
                artifact,
                line,
                detail: e.to_string(),
            })?;
        out.push(convert(row, line)?);
    }

    Ok(out)
}

fn ensure_columns(
    artifact: &'static str,
    headers: &StringRecord,
    required: &[&'static str],
) -> Result<(), ParseError> {
    for &column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(ParseError::MissingColumn { artifact, column });
        }
    }
    Ok(())
}
