use crate::domain::contract::{
    parse_history_csv, parse_snapshot_json, parse_top10_csv, HISTORY_ARTIFACT, SNAPSHOT_ARTIFACT,
    TOP10_ARTIFACT,
};
use crate::domain::history::HistoryRecord;
use crate::domain::signal::RankedSignalTable;
use crate::domain::snapshot::Snapshot;
use crate::error::{BoardError, ConsistencyError, EmptyTimelineError};
use crate::ingest::decode::decode_text;
use crate::ingest::fetcher::ArtifactFetcher;
use crate::timeline::{RegimeTimeline, VALUE_TOLERANCE};
use chrono::{DateTime, Utc};

/// One complete, validated publication: history, snapshot and top-10 table.
///
/// A board is never mutated. Reloading produces a new board that replaces the old one.
#[derive(Debug, Clone)]
pub struct RegimeBoard {
    pub timeline: RegimeTimeline,
    pub snapshot: Snapshot,
    pub signals: RankedSignalTable,
    /// Structural disagreement between snapshot and history, if any.
    pub consistency: Option<ConsistencyError>,
    /// Indicator drift between snapshot and history, if any.
    pub value_drift: Option<ConsistencyError>,
    pub loaded_at: DateTime<Utc>,
}

impl RegimeBoard {
    pub fn assemble(
        timeline: RegimeTimeline,
        snapshot: Snapshot,
        signals: RankedSignalTable,
    ) -> Self {
        // History decides the blamed field; once it agrees, only the snapshot's own publication
        // stamp is left to check.
        let consistency = timeline
            .reconcile(&snapshot)
            .map(|_| ())
            .and_then(|()| snapshot.validate())
            .err();
        let value_drift = timeline
            .reconcile_values(&snapshot, VALUE_TOLERANCE)
            .err();

        Self {
            timeline,
            snapshot,
            signals,
            consistency,
            value_drift,
            loaded_at: Utc::now(),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.consistency.is_none()
    }

    pub fn latest_record(&self) -> Result<&HistoryRecord, EmptyTimelineError> {
        self.timeline.latest()
    }
}

/// Fetches all three artifacts, then parses and validates them.
///
/// Fetch, parse and validation failures abort the load. A snapshot that disagrees with history
/// does not: the board is returned with `consistency` set and the caller picks a source.
pub async fn load_board(fetcher: &dyn ArtifactFetcher) -> Result<RegimeBoard, BoardError> {
    let (history_bytes, snapshot_bytes, top10_bytes) = tokio::try_join!(
        fetcher.fetch(HISTORY_ARTIFACT),
        fetcher.fetch(SNAPSHOT_ARTIFACT),
        fetcher.fetch(TOP10_ARTIFACT),
    )?;

    let history_text = decode_text(HISTORY_ARTIFACT, &history_bytes)?;
    let snapshot_text = decode_text(SNAPSHOT_ARTIFACT, &snapshot_bytes)?;
    let top10_text = decode_text(TOP10_ARTIFACT, &top10_bytes)?;

    let timeline = RegimeTimeline::load(parse_history_csv(&history_text)?)?;
    let snapshot = parse_snapshot_json(&snapshot_text)?;
    let signals = RankedSignalTable::load(parse_top10_csv(&top10_text)?)?;

    let board = RegimeBoard::assemble(timeline, snapshot, signals);

    match &board.consistency {
        None => tracing::info!(
            source = fetcher.source_name(),
            calculation_date = %board.snapshot.calculation_date,
            target_date = %board.snapshot.target_date,
            regime = %board.snapshot.market_regime,
            history_len = board.timeline.len(),
            "regime board loaded"
        ),
        Some(err) => tracing::warn!(
            source = fetcher.source_name(),
            kind = %err.kind,
            expected = %err.expected,
            actual = %err.actual,
            "regime board loaded; snapshot disagrees with history"
        ),
    }
    if let Some(drift) = &board.value_drift {
        tracing::warn!(kind = %drift.kind, expected = %drift.expected, actual = %drift.actual, "snapshot indicators drift from history");
    }

    Ok(board)
}
