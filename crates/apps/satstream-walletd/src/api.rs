//! Wallet API endpoints.
//!
//! These endpoints are called by:
//! - The metering core, to redeem tokens after successful work
//! - Admin/CLI tools, to check balance and sweep funds
//!
//! The wire shapes live in `satstream-wallet` and are shared with the HTTP
//! client.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use satstream_wallet::types::{
    BalanceResponse, ReceiveRequest, ReceiveResponse, SendRequest, SendResponse, SweepResponse,
};

use crate::ledger::{Ledger, LedgerError};

/// Shared application state.
pub struct AppState {
    /// The proof ledger.
    pub ledger: Arc<Ledger>,
}

/// Build the wallet API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/wallet/receive", post(receive))
        .route("/api/wallet/balance", get(balance))
        .route("/api/wallet/sweep", post(sweep))
        .route("/api/wallet/send", post(send))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Receive an ecash token and store its proofs.
///
/// Called by the metering core after successful work to redeem the
/// session's payment.
async fn receive(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ReceiveRequest>,
) -> impl IntoResponse {
    match state.ledger.receive(&request.token) {
        Ok(amount) => (
            StatusCode::OK,
            Json(ReceiveResponse {
                success: true,
                amount,
                error: None,
            }),
        ),
        Err(e @ (LedgerError::AlreadySpent | LedgerError::Malformed(_))) => (
            StatusCode::OK,
            Json(ReceiveResponse {
                success: false,
                amount: 0,
                error: Some(e.to_string()),
            }),
        ),
        Err(e) => internal(e, |error| ReceiveResponse {
            success: false,
            amount: 0,
            error: Some(error),
        }),
    }
}

/// Get the current wallet balance across all stored proofs.
async fn balance(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.ledger.balance() {
        Ok(balance) => (StatusCode::OK, Json(BalanceResponse { balance })),
        Err(e) => {
            error!(error = %e, "balance query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(BalanceResponse { balance: 0 }))
        }
    }
}

/// Sweep all funds into a single token.
///
/// WARNING: this removes the funds from the wallet - the response carries
/// the only copy.
async fn sweep(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.ledger.sweep() {
        Ok(Some((amount, token))) => (
            StatusCode::OK,
            Json(SweepResponse {
                success: true,
                amount,
                token: Some(token),
                error: None,
            }),
        ),
        Ok(None) => (
            StatusCode::OK,
            Json(SweepResponse {
                success: false,
                amount: 0,
                token: None,
                error: Some("no funds to sweep".to_string()),
            }),
        ),
        Err(e) => internal(e, |error| SweepResponse {
            success: false,
            amount: 0,
            token: None,
            error: Some(error),
        }),
    }
}

/// Create a send token for a specific amount.
async fn send(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SendRequest>,
) -> impl IntoResponse {
    match state.ledger.send(request.amount) {
        Ok(token) => (
            StatusCode::OK,
            Json(SendResponse {
                success: true,
                amount: request.amount,
                token: Some(token),
                error: None,
            }),
        ),
        Err(e @ (LedgerError::InsufficientBalance { .. } | LedgerError::InvalidAmount)) => (
            StatusCode::OK,
            Json(SendResponse {
                success: false,
                amount: 0,
                token: None,
                error: Some(e.to_string()),
            }),
        ),
        Err(e) => internal(e, |error| SendResponse {
            success: false,
            amount: 0,
            token: None,
            error: Some(error),
        }),
    }
}

/// Log an unexpected ledger fault and map it to a 500 with a generic body.
fn internal<T>(e: LedgerError, build: impl FnOnce(String) -> T) -> (StatusCode, Json<T>) {
    error!(error = %e, "ledger operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(build("internal wallet error".to_string())),
    )
}
