use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use fortune_wheel_common::types::lamports_to_sol;
use fortune_wheel_common::HISTORY_CAPACITY;

use crate::coordinator::{self, HISTORY_PAGE};
use crate::error::{DistributeError, SpinError};
use crate::msg::{
    BalanceResponse, ClaimResponse, ErrorResponse, HistoryResponse, HoldersResponse, SpinResponse,
    StatusResponse, WheelDataResponse, WinnerStatsResponse,
};
use crate::state::AppState;
use crate::ws;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/holders", get(get_holders))
        .route("/wheel-data", get(get_wheel_data))
        .route("/history", get(get_history))
        .route("/status", get(get_status))
        .route("/balance", get(get_balance))
        .route("/winners/:address", get(get_winner_stats))
        .route("/spin", post(post_spin))
        .route("/claim-fees", post(post_claim_fees))
        .route("/ws", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API-boundary error: a status code plus a json body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<SpinError> for ApiError {
    fn from(error: SpinError) -> Self {
        ApiError::bad_request(error.to_string())
    }
}

impl From<DistributeError> for ApiError {
    fn from(error: DistributeError) -> Self {
        let status = match &error {
            DistributeError::ClaimUnavailable { .. } | DistributeError::NetworkFailure { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError {
            status,
            message: error.to_string(),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn get_holders(State(state): State<Arc<AppState>>) -> Json<HoldersResponse> {
    let wheel = state.wheel.read().await;
    Json(HoldersResponse {
        holders: wheel.segments.segments.clone(),
        total_eligible_supply: wheel.segments.total_eligible_supply,
        holder_count: wheel.holder_count,
    })
}

async fn get_wheel_data(State(state): State<Arc<AppState>>) -> Json<WheelDataResponse> {
    let wheel = state.wheel.read().await;
    Json(WheelDataResponse {
        segments: wheel.segments.segments.clone(),
        countdown_seconds: (wheel.next_spin_at - Utc::now()).num_seconds().max(0),
        spinning: wheel.phase.is_spinning(),
        last_winner: wheel.last_winner.clone(),
    })
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn get_history(
    Query(query): Query<HistoryQuery>,
    State(state): State<Arc<AppState>>,
) -> Json<HistoryResponse> {
    let limit = query.limit.unwrap_or(HISTORY_PAGE).min(HISTORY_CAPACITY);
    let ledger = state.ledger.lock().await;
    Json(HistoryResponse {
        records: ledger.recent(limit),
        cumulative_total_sol: lamports_to_sol(ledger.cumulative_total()),
    })
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let wheel = state.wheel.read().await;
    Json(StatusResponse {
        token_mint: state.config.token_mint.clone(),
        holder_count: wheel.holder_count,
        countdown_seconds: (wheel.next_spin_at - Utc::now()).num_seconds().max(0),
        spinning: wheel.phase.is_spinning(),
        operator_address: state.operator_address(),
        operator_balance_sol: lamports_to_sol(wheel.operator_balance_lamports),
    })
}

async fn get_balance(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let address = state
        .operator_address()
        .ok_or_else(|| ApiError::bad_request("no operator configured"))?;
    coordinator::refresh_balance(&state).await;
    let wheel = state.wheel.read().await;
    Ok(Json(BalanceResponse {
        address,
        balance_sol: lamports_to_sol(wheel.operator_balance_lamports),
    }))
}

async fn get_winner_stats(
    Path(address): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Json<WinnerStatsResponse> {
    let ledger = state.ledger.lock().await;
    let stats = ledger.winner_stats(&address);
    Json(WinnerStatsResponse {
        address,
        wins: stats.wins,
        total_won_sol: lamports_to_sol(stats.total_won_lamports),
    })
}

/// Manual spin trigger. Answers 400 while a spin is in flight or the wheel
/// is empty; the rejection has no side effects.
async fn post_spin(State(state): State<Arc<AppState>>) -> Result<Json<SpinResponse>, ApiError> {
    let response = coordinator::trigger_spin(&state).await?;
    Ok(Json(response))
}

/// Manual fee claim, without a distribution attached.
async fn post_claim_fees(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let operator = state
        .config
        .operator_keypair
        .as_ref()
        .ok_or(DistributeError::NotConfigured)
        .map_err(ApiError::from)?;
    match state.chain.claim_creator_fees(operator).await {
        Ok(signature) => {
            coordinator::refresh_balance(&state).await;
            Ok(Json(ClaimResponse { signature }))
        }
        Err(error) => Err(ApiError::from(DistributeError::ClaimUnavailable {
            reason: error.to_string(),
        })),
    }
}
