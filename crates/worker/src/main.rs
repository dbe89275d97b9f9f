use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use regimeboard_core::board::{load_board, RegimeBoard};
use regimeboard_core::domain::regime::{Action, MarketRegime};
use regimeboard_core::error::ConsistencyError;
use regimeboard_core::ingest::fetcher::{ArtifactFetcher, LocalDirFetcher};
use regimeboard_core::timeline::{HistoryStats, RegimeTimeline};

/// Fetches the published regime artifacts once, validates them, and prints a JSON report.
#[derive(Debug, Parser)]
#[command(name = "regimeboard_worker")]
struct Args {
    /// Read artifacts from this directory instead of CONTENT_BASE_URL / CONTENT_DIR.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Also fail when snapshot indicators (shibor_2w, rsi_5) drift from the history row.
    #[arg(long)]
    strict_values: bool,
}

#[derive(Debug, Serialize)]
struct BoardReport {
    source: &'static str,
    calculation_date: chrono::NaiveDate,
    target_date: chrono::NaiveDate,
    expected_target_date: chrono::NaiveDate,
    market_regime: MarketRegime,
    action: Action,
    signal_strength: String,
    history_len: usize,
    history_stats: HistoryStats,
    signals_len: usize,
    consistency: Option<ConsistencyError>,
    value_drift: Option<ConsistencyError>,
}

impl BoardReport {
    fn new(source: &'static str, board: &RegimeBoard, window: usize) -> Self {
        Self {
            source,
            calculation_date: board.snapshot.calculation_date,
            target_date: board.snapshot.target_date,
            expected_target_date: RegimeTimeline::target_date_for(board.snapshot.calculation_date),
            market_regime: board.snapshot.market_regime,
            action: board.snapshot.action,
            signal_strength: board.snapshot.signal_strength.clone(),
            history_len: board.timeline.len(),
            history_stats: board.timeline.stats(window),
            signals_len: board.signals.len(),
            consistency: board.consistency.clone(),
            value_drift: board.value_drift.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = regimeboard_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let fetcher: Arc<dyn ArtifactFetcher> = match &args.dir {
        Some(dir) => Arc::new(LocalDirFetcher::new(dir)),
        None => regimeboard_core::ingest::fetcher_from_settings(&settings)?,
    };

    let board = match load_board(fetcher.as_ref()).await {
        Ok(board) => board,
        Err(e) => {
            let err = anyhow::Error::new(e);
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(error = %err, "failed to load published artifacts");
            return Err(err);
        }
    };

    let report = BoardReport::new(fetcher.source_name(), &board, settings.history_window);
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(err) = &board.consistency {
        anyhow::bail!("snapshot is inconsistent with history: {err}");
    }
    if args.strict_values {
        if let Some(err) = &board.value_drift {
            anyhow::bail!("snapshot indicators drift from history: {err}");
        }
    }

    tracing::info!(
        calculation_date = %board.snapshot.calculation_date,
        target_date = %board.snapshot.target_date,
        "publication is consistent"
    );
    Ok(())
}

fn init_sentry(settings: &regimeboard_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
