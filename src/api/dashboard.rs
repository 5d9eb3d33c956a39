//! Read-only dashboard endpoints. Aggregates are global, per the panel's
//! reporting pages; tenant scoping applies to the CRUD listings only.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::db::{stats, Actor};
use crate::AppState;

use super::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub period: Option<String>,
}

/// GET /admin/dashboard
pub async fn admin_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();

    let counts = stats::user_status_counts(&state.db, None).await?;
    let last_month = match stats::period_window("last_month", now) {
        Some((from, to)) => stats::users_registered_between(&state.db, from, to).await?,
        None => 0,
    };
    let earnings = stats::earnings_summary(&state.db, now).await?;
    let totals = stats::monthly_payment_totals(&state.db, now.year()).await?;

    Ok(Json(json!({
        "activos": counts.activos,
        "inactivos": counts.inactivos,
        "usuarios_mes_pasado": last_month,
        "ganancias": earnings,
        "meses": stats::MONTH_NAMES_ES,
        "totales": totals,
    })))
}

/// GET /admin/dashboard/users
pub async fn users_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();

    let counts = stats::user_status_counts(&state.db, None).await?;
    let last_month = match stats::period_window("last_month", now) {
        Some((from, to)) => stats::users_registered_between(&state.db, from, to).await?,
        None => 0,
    };

    Ok(Json(json!({
        "activos": counts.activos,
        "inactivos": counts.inactivos,
        "usuarios_mes_pasado": last_month,
    })))
}

/// GET /admin/dashboard/user-stats?period=today|this_month|last_month|two_months_ago
pub async fn user_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<stats::StatusCounts>, ApiError> {
    let period = query.period.as_deref().unwrap_or("all");
    let window = stats::period_window(period, Utc::now());
    let counts = stats::user_status_counts(&state.db, window).await?;
    Ok(Json(counts))
}

/// GET /admin/dashboard/users-by-month
pub async fn users_by_month(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<stats::MonthlyCount>>, ApiError> {
    Ok(Json(stats::users_by_month(&state.db).await?))
}

/// GET /receptionist/dashboard
pub async fn receptionist_dashboard(actor: Actor) -> Json<Value> {
    Json(json!({
        "receptionist": {
            "id": actor.id(),
            "name": actor.name(),
            "gym_id": actor.gym_id(),
        }
    }))
}

/// GET /dashboard — the member landing page shows the earnings report.
pub async fn member_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let earnings = stats::earnings_summary(&state.db, now).await?;
    let totals = stats::monthly_payment_totals(&state.db, now.year()).await?;

    Ok(Json(json!({
        "ganancias": earnings,
        "meses": stats::MONTH_NAMES_ES,
        "totales": totals,
    })))
}
