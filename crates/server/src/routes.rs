//! HTTP routes for the reader role
//!
//! Every handler checks one connection out of the pool, runs a single read
//! query and hands the connection back when the repository call returns,
//! including on the not-found and error paths.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use persistence::repository::{SignalRecord, SignalRepository, WhaleRepository};
use persistence::{Database, DbError};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{debug, error, warn};

use crate::views;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub operator: Arc<str>,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Signal not found")]
    SignalNotFound,

    #[error(transparent)]
    Store(#[from] DbError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::SignalNotFound => StatusCode::NOT_FOUND,
            ApiError::Store(DbError::StorageUnavailable { .. })
            | ApiError::Store(DbError::LockTimeout(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match status {
            StatusCode::NOT_FOUND => {}
            StatusCode::SERVICE_UNAVAILABLE => warn!(error = %self, "Store busy or unavailable"),
            _ => error!(error = %self, "Request failed"),
        }

        (status, self.to_string()).into_response()
    }
}

/// Fixed payload for `/api/bankroll`.
///
/// This is a stub: nothing here is read from the store or a wallet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BankrollStatus {
    pub balance: f64,
    pub profit_today: f64,
    pub status: &'static str,
    pub signals_today: u32,
    pub last_update: &'static str,
}

impl BankrollStatus {
    pub fn fixture() -> Self {
        Self {
            balance: 14.80,
            profit_today: 3.55,
            status: "ACTIVE_TRADING",
            signals_today: 7,
            last_update: "2026-02-14 22:45 EST",
        }
    }
}

/// Static assets next to the executable, falling back to `./static`
pub fn static_dir() -> PathBuf {
    let exe_path = std::env::current_exe().unwrap_or_default();
    let exe_dir = exe_path.parent().unwrap_or(std::path::Path::new("."));
    let bundled = exe_dir.join("static");
    if bundled.exists() {
        bundled
    } else {
        PathBuf::from("static")
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/signals", get(api_signals))
        .route("/bankroll", get(api_bankroll))
        .route("/health", get(api_health));

    Router::new()
        .route("/", get(index))
        .route("/whales", get(whale_page))
        .route("/signal/:signal_id", get(signal_detail))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(static_dir()))
        .with_state(state)
        .layer(cors)
}

// ============================================================================
// Pages
// ============================================================================

async fn index(State(state): State<AppState>) -> Html<String> {
    Html(views::index_page(&state.operator))
}

async fn whale_page(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let whales = WhaleRepository::new(state.db.pool())
        .list_by_profit()
        .await?;
    Ok(Html(views::whales_page(&whales)))
}

async fn signal_detail(
    State(state): State<AppState>,
    Path(signal_id): Path<String>,
) -> Result<Html<String>, ApiError> {
    let signal = SignalRepository::new(state.db.pool())
        .get_by_id(&signal_id)
        .await?
        .ok_or_else(|| {
            debug!(id = %signal_id, "Signal not found");
            ApiError::SignalNotFound
        })?;
    Ok(Html(views::signal_page(&signal)))
}

// ============================================================================
// JSON API
// ============================================================================

async fn api_signals(State(state): State<AppState>) -> Result<Json<Vec<SignalRecord>>, ApiError> {
    let signals = SignalRepository::new(state.db.pool())
        .list_recent()
        .await?;
    Ok(Json(signals))
}

async fn api_bankroll() -> Json<BankrollStatus> {
    Json(BankrollStatus::fixture())
}

async fn api_health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let signals = SignalRepository::new(state.db.pool()).count().await?;
    let whales = WhaleRepository::new(state.db.pool()).count().await?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": crate::APP_VERSION,
        "signals": signals,
        "whales": whales,
        "checked_at": chrono::Utc::now().to_rfc3339(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use persistence::RetryPolicy;
    use refresher::{inject_signal, sync_whales, urgent_signal, SignalBatch, SignalRefresher, WhaleBatch};
    use tower::util::ServiceExt;

    async fn seeded_state() -> AppState {
        let db = Database::in_memory().await.unwrap();
        db.init_signals().await.unwrap();
        SignalRefresher::new(db.pool_clone(), SignalBatch::curated())
            .run_cycle()
            .await
            .unwrap();
        sync_whales(&db, &WhaleBatch::curated(), RetryPolicy::default())
            .await
            .unwrap();
        state_for(db)
    }

    fn state_for(db: Database) -> AppState {
        AppState {
            db: Arc::new(db),
            operator: Arc::from("NICO_2028"),
        }
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_index_page() {
        let (status, body) = get(seeded_state().await, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("NICO_2028"));
    }

    #[tokio::test]
    async fn test_api_signals_returns_the_refreshed_batch() {
        let (status, body) = get(seeded_state().await, "/api/signals").await;
        assert_eq!(status, StatusCode::OK);

        let signals: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        assert_eq!(signals.len(), 7);

        let mut ids: Vec<&str> = signals.iter().map(|s| s["id"].as_str().unwrap()).collect();
        ids.sort();
        let mut expected: Vec<String> = SignalBatch::curated()
            .records()
            .iter()
            .map(|r| r.id.clone())
            .collect();
        expected.sort();
        assert_eq!(ids, expected);

        // Every column is present, including the server-assigned timestamp
        for key in [
            "id", "category", "market", "url", "recommendation", "analysis", "confidence",
            "bet_amount", "est_profit", "char_name", "char_class", "rarity", "timestamp",
        ] {
            assert!(signals[0].get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_api_signals_newest_first() {
        let state = seeded_state().await;
        sqlx_set_timestamp(&state, "sig_macro_1", "2099-12-31 23:59:59").await;
        sqlx_set_timestamp(&state, "sig_arb_1", "2000-01-01 00:00:00").await;

        let (_, body) = get(state, "/api/signals").await;
        let signals: Vec<serde_json::Value> = serde_json::from_str(&body).unwrap();
        let timestamps: Vec<&str> = signals
            .iter()
            .map(|s| s["timestamp"].as_str().unwrap())
            .collect();
        let mut sorted = timestamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(timestamps, sorted);
        assert_eq!(signals[0]["id"], "sig_macro_1");
        assert_eq!(signals[6]["id"], "sig_arb_1");
    }

    async fn sqlx_set_timestamp(state: &AppState, id: &str, ts: &str) {
        let result = sqlx::query("UPDATE signals SET timestamp = ?1 WHERE id = ?2")
            .bind(ts)
            .bind(id)
            .execute(state.db.pool())
            .await
            .unwrap();
        assert_eq!(result.rows_affected(), 1);
    }

    #[tokio::test]
    async fn test_signal_detail_found() {
        let (status, body) = get(seeded_state().await, "/signal/sig_arb_1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Ukraine Ceasefire by April"));
        assert!(body.contains("BUY POLY / SELL KALSHI"));
    }

    #[tokio::test]
    async fn test_signal_detail_not_found_is_404() {
        let (status, body) = get(seeded_state().await, "/signal/sig_does_not_exist").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, "Signal not found");
    }

    #[tokio::test]
    async fn test_injected_signal_is_served() {
        let state = seeded_state().await;
        inject_signal(state.db.pool(), &urgent_signal(), RetryPolicy::default())
            .await
            .unwrap();

        let (status, body) = get(state, "/signal/sig_99").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("US Gov Shutdown by Feb 14?"));
    }

    #[tokio::test]
    async fn test_whales_ordered_by_profit_desc() {
        let (status, body) = get(seeded_state().await, "/whales").await;
        assert_eq!(status, StatusCode::OK);

        let positions: Vec<usize> = ["WHALE_ONE", "MACRO_GOD", "FED_INSIDER", "POLITICAL_SNIPER"]
            .iter()
            .map(|alias| body.find(alias).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(body.contains("$2450000.00"));
    }

    #[tokio::test]
    async fn test_bankroll_is_static_and_needs_no_store() {
        // No schema at all: the stub must not touch the store
        let db = Database::in_memory().await.unwrap();
        let (status, body) = get(state_for(db), "/api/bankroll").await;
        assert_eq!(status, StatusCode::OK);

        let bankroll: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(
            bankroll,
            serde_json::json!({
                "balance": 14.80,
                "profit_today": 3.55,
                "status": "ACTIVE_TRADING",
                "signals_today": 7,
                "last_update": "2026-02-14 22:45 EST",
            })
        );
    }

    #[tokio::test]
    async fn test_missing_tables_are_server_errors_not_panics() {
        let db = Database::in_memory().await.unwrap();
        let (status, _) = get(state_for(db), "/api/signals").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_health_reports_counts() {
        let (status, body) = get(seeded_state().await, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        let health: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["signals"], 7);
        assert_eq!(health["whales"], 4);
    }

    #[test]
    fn test_store_errors_map_to_status_codes() {
        let locked = ApiError::Store(DbError::LockTimeout("database is locked".into()));
        assert_eq!(locked.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

        let unavailable = ApiError::Store(DbError::StorageUnavailable {
            path: "data/agora.db".into(),
            reason: "permission denied".into(),
        });
        assert_eq!(
            unavailable.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
