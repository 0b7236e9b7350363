//! HTTP routes.
//!
//! - `GET  /`                                   health
//! - `POST /api/v1/risk/evaluate-trade`         quota decision
//! - `GET  /api/v1/risk/user-limits/{user_id}`  quota view
//! - `PUT  /api/v1/risk/user-limits/{user_id}`  limit override (operator)
//! - `GET  /metrics`                            Prometheus text format

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use quota_core::{Amount, RiskDecision, TradeRequest, UserId};
use quota_engine::QuotaCoordinator;
use quota_risk::{QuotaRules, QuotaSnapshot};
use quota_telemetry::Metrics;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::error::ApiError;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    coordinator: Arc<QuotaCoordinator>,
}

impl AppState {
    pub fn new(coordinator: Arc<QuotaCoordinator>) -> Self {
        Self { coordinator }
    }
}

/// Create the axum router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/v1/risk/evaluate-trade", post(evaluate_trade))
        .route(
            "/api/v1/risk/user-limits/{user_id}",
            get(get_user_limits).put(set_user_limit),
        )
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Wire types
// ============================================================================

/// Verdict returned by `evaluate-trade`.
#[derive(Debug, Serialize)]
pub struct RiskResponse {
    pub approved: bool,
    /// Reason code; omitted on approval.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RiskResponse {
    pub fn new(decision: RiskDecision, rules: &QuotaRules) -> Self {
        let reason = decision.reason();
        Self {
            approved: decision.is_approved(),
            reason: (!reason.is_none()).then(|| reason.as_str()),
            message: rules.describe(reason),
        }
    }
}

/// Quota view. Amounts are JSON numbers.
#[derive(Debug, Serialize)]
pub struct UserLimitsResponse {
    pub user_id: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_limit: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub daily_traded: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub remaining: Decimal,
    pub trading_day: String,
}

impl From<QuotaSnapshot> for UserLimitsResponse {
    fn from(snapshot: QuotaSnapshot) -> Self {
        Self {
            user_id: snapshot.user_id.to_string(),
            daily_limit: snapshot.daily_limit.inner(),
            daily_traded: snapshot.daily_traded.inner(),
            remaining: snapshot.remaining.inner(),
            trading_day: snapshot.trading_day.key(),
        }
    }
}

/// Body of the limit override endpoint.
#[derive(Debug, Deserialize)]
pub struct SetLimitRequest {
    pub daily_limit: Amount,
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "risk-management",
    }))
}

async fn evaluate_trade(
    State(state): State<AppState>,
    body: Result<Json<TradeRequest>, JsonRejection>,
) -> Result<Json<RiskResponse>, ApiError> {
    let Json(request) = body.map_err(bad_json)?;
    let decision = state.coordinator.evaluate_trade(&request).await?;
    Ok(Json(RiskResponse::new(decision, state.coordinator.rules())))
}

async fn get_user_limits(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserLimitsResponse>, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let snapshot = state.coordinator.user_limits(&user_id).await?;
    Ok(Json(snapshot.into()))
}

async fn set_user_limit(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<SetLimitRequest>, JsonRejection>,
) -> Result<Json<UserLimitsResponse>, ApiError> {
    let user_id = parse_user_id(user_id)?;
    let Json(body) = body.map_err(bad_json)?;
    let snapshot = state
        .coordinator
        .set_daily_limit(&user_id, body.daily_limit)
        .await?;
    Ok(Json(snapshot.into()))
}

async fn metrics() -> Response {
    match Metrics::render() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn parse_user_id(raw: String) -> Result<UserId, ApiError> {
    UserId::new(raw).map_err(|e| ApiError::BadRequest(e.to_string()))
}

fn bad_json(rejection: JsonRejection) -> ApiError {
    debug!(error = %rejection.body_text(), "Rejected request body");
    ApiError::BadRequest(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quota_core::DecisionReason;
    use quota_risk::QuotaRulesConfig;

    #[test]
    fn test_approval_omits_reason() {
        let response = RiskResponse::new(RiskDecision::approve(), &QuotaRules::default());
        let body = serde_json::to_value(response).unwrap();
        assert_eq!(body, json!({ "approved": true }));
    }

    #[test]
    fn test_rejection_carries_code_and_message() {
        let response = RiskResponse::new(
            RiskDecision::reject(DecisionReason::DailyLimitExceeded),
            &QuotaRules::default(),
        );
        let body = serde_json::to_value(response).unwrap();
        assert_eq!(body["approved"], false);
        assert_eq!(body["reason"], "DAILY_LIMIT_EXCEEDED");
        assert_eq!(body["message"], "Daily trading limit exceeded");
    }

    #[test]
    fn test_large_trade_message_follows_configured_fraction() {
        let rules = QuotaRules::new(QuotaRulesConfig {
            large_trade_fraction: Decimal::new(3, 1),
        })
        .unwrap();
        let response = RiskResponse::new(
            RiskDecision::reject(DecisionReason::LargeTradeManualReview),
            &rules,
        );
        assert_eq!(
            response.message.as_deref(),
            Some("Trade amount exceeds 30% of daily limit, requires manual approval")
        );
    }
}
