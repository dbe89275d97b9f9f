use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use regimeboard_core::board::{load_board, RegimeBoard};
use regimeboard_core::domain::regime::MarketRegime;
use regimeboard_core::error::ConsistencyError;
use regimeboard_core::ingest::fetcher::ArtifactFetcher;
use regimeboard_core::view::{HistoryView, RegimeCard, SignalRowView};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = regimeboard_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let fetcher = regimeboard_core::ingest::fetcher_from_settings(&settings)?;

    let state = AppState {
        board: Arc::new(RwLock::new(None)),
        history_window: settings.history_window,
    };

    // Serve immediately; endpoints answer 503 until the first load lands.
    tokio::spawn(refresh_loop(
        fetcher,
        state.board.clone(),
        Duration::from_secs(settings.board_refresh_secs.max(1)),
    ));

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/regime/card", get(get_regime_card))
        .route("/regime/history", get(get_regime_history))
        .route("/signals", get(get_signals))
        .route("/board/status", get(get_board_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    board: Arc<RwLock<Option<Arc<RegimeBoard>>>>,
    history_window: usize,
}

impl AppState {
    async fn current(&self) -> Result<Arc<RegimeBoard>, StatusCode> {
        self.board
            .read()
            .await
            .clone()
            .ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }
}

async fn refresh_loop(
    fetcher: Arc<dyn ArtifactFetcher>,
    slot: Arc<RwLock<Option<Arc<RegimeBoard>>>>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        match load_board(fetcher.as_ref()).await {
            Ok(board) => {
                // Whole-value swap; readers holding the previous Arc keep a consistent view.
                *slot.write().await = Some(Arc::new(board));
            }
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "board reload failed; keeping previous board");
            }
        }
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct LimitParams {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ApiRegimeCard {
    /// "snapshot" when the snapshot reconciles with history, otherwise "history".
    source: &'static str,
    consistent: bool,
    card: RegimeCard,
}

// A snapshot that disagrees with history is not shown; the append-only history is the
// authoritative record and the card is rebuilt from its latest row.
async fn get_regime_card(
    State(state): State<AppState>,
) -> Result<Json<ApiRegimeCard>, StatusCode> {
    let board = state.current().await?;

    if board.is_consistent() {
        return Ok(Json(ApiRegimeCard {
            source: "snapshot",
            consistent: true,
            card: RegimeCard::from_snapshot(&board.snapshot),
        }));
    }

    let latest = board
        .latest_record()
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;
    Ok(Json(ApiRegimeCard {
        source: "history",
        consistent: false,
        card: RegimeCard::from_record(latest),
    }))
}

async fn get_regime_history(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<HistoryView>, StatusCode> {
    let board = state.current().await?;
    let window = params.limit.unwrap_or(state.history_window);
    if window == 0 {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(HistoryView::build(&board.timeline, window)))
}

#[derive(Debug, Serialize)]
struct ApiSignals {
    calculation_date: NaiveDate,
    target_date: NaiveDate,
    total: usize,
    items: Vec<SignalRowView>,
}

async fn get_signals(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> Result<Json<ApiSignals>, StatusCode> {
    let board = state.current().await?;
    let rows = match params.limit {
        Some(limit) => board.signals.preview(limit),
        None => board.signals.signals(),
    };

    Ok(Json(ApiSignals {
        calculation_date: board.snapshot.calculation_date,
        target_date: board.snapshot.target_date,
        total: board.signals.len(),
        items: rows.iter().map(SignalRowView::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
struct ApiBoardStatus {
    loaded_at: DateTime<Utc>,
    history_len: usize,
    latest_calculation_date: Option<NaiveDate>,
    snapshot_calculation_date: NaiveDate,
    snapshot_target_date: NaiveDate,
    regime: MarketRegime,
    consistency: Option<ConsistencyError>,
    value_drift: Option<ConsistencyError>,
}

async fn get_board_status(
    State(state): State<AppState>,
) -> Result<Json<ApiBoardStatus>, StatusCode> {
    let board = state.current().await?;
    Ok(Json(ApiBoardStatus {
        loaded_at: board.loaded_at,
        history_len: board.timeline.len(),
        latest_calculation_date: board.latest_record().ok().map(|r| r.calculation_date),
        snapshot_calculation_date: board.snapshot.calculation_date,
        snapshot_target_date: board.snapshot.target_date,
        regime: board.snapshot.market_regime,
        consistency: board.consistency.clone(),
        value_drift: board.value_drift.clone(),
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
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
