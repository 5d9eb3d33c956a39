//! Payment management.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{
    Actor, CreatePaymentRequest, Membership, Payment, PaymentFilters, UpdatePaymentRequest, User,
};
use crate::{AppState, DbPool};

use super::error::{ApiError, ValidationErrorBuilder};
use super::flash::{self, Flash};
use super::validation::{validate_amount, validate_date, validate_payment_method};

async fn validate_fields(
    pool: &DbPool,
    gym_id: &str,
    date: &str,
    amount: f64,
    payment_method: &str,
    user_id: &str,
) -> Result<ValidationErrorBuilder, ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_date(date) {
        errors.add("date", e);
    }
    if let Err(e) = validate_amount(amount) {
        errors.add("amount", e);
    }
    if let Err(e) = validate_payment_method(payment_method) {
        errors.add("payment_method", e);
    }
    if user_id.is_empty() {
        errors.add("user_id", "La cédula del usuario es obligatoria.");
    } else if !User::exists_in_gym(pool, user_id, gym_id).await? {
        errors.add("user_id", "Usuario no encontrado en el gimnasio.");
    }

    Ok(errors)
}

/// The payment must belong to the acting staff member's gym.
async fn authorize(pool: &DbPool, id: &str, gym_id: &str) -> Result<(), ApiError> {
    match Payment::gym_of(pool, id).await? {
        Some(owner_gym) if owner_gym == gym_id => Ok(()),
        Some(_) => Err(ApiError::forbidden("No autorizado.")),
        None => Err(ApiError::not_found("Pago no encontrado")),
    }
}

/// GET /{base}/payments
pub async fn index(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    jar: CookieJar,
    Query(filters): Query<PaymentFilters>,
) -> Result<Response, ApiError> {
    let (jar, flash) = flash::take(jar);
    let gym_id = actor.gym_id();

    let payments = Payment::list(&state.db, gym_id, &filters, &state.config.pagination).await?;
    let memberships = Membership::paid_options(&state.db, gym_id).await?;
    let payment_methods = Payment::distinct_methods(&state.db, gym_id).await?;
    let members = User::all_for_gym(&state.db, gym_id).await?;

    Ok((
        jar,
        Json(json!({
            "payments": payments,
            "memberships": memberships,
            "payment_methods": payment_methods,
            "users": members,
            "flash": flash,
        })),
    )
        .into_response())
}

/// POST /{base}/payments
pub async fn store(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Form(req): Form<CreatePaymentRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("payments");
    let gym_id = actor.gym_id();

    let mut errors = validate_fields(
        &state.db,
        gym_id,
        &req.date,
        req.amount,
        &req.payment_method,
        &req.user_id,
    )
    .await?;
    if req.membership_id.is_empty() {
        errors.add("membership_id", "La membresía es obligatoria.");
    } else if !Membership::exists_in_gym(&state.db, &req.membership_id, gym_id).await? {
        errors.add("membership_id", "Membresía inválida para este gimnasio.");
    }
    errors.finish().map_err(|e| e.with_redirect(&index))?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO payments (id, date, amount, payment_method, user_id, membership_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&req.date)
    .bind(req.amount)
    .bind(&req.payment_method)
    .bind(&req.user_id)
    .bind(&req.membership_id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    Ok(flash::redirect(
        &index,
        Flash::success("Pago registrado correctamente."),
    ))
}

/// GET /{base}/payments/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Payment>, ApiError> {
    let payment = Payment::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pago no encontrado"))?;
    authorize(&state.db, &id, actor.gym_id()).await?;
    Ok(Json(payment))
}

/// PUT /{base}/payments/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Form(req): Form<UpdatePaymentRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("payments");

    Payment::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pago no encontrado"))?;
    authorize(&state.db, &id, actor.gym_id()).await?;

    let errors = validate_fields(
        &state.db,
        actor.gym_id(),
        &req.date,
        req.amount,
        &req.payment_method,
        &req.user_id,
    )
    .await?;
    errors.finish().map_err(|e| e.with_redirect(&index))?;

    sqlx::query(
        "UPDATE payments SET date = ?, amount = ?, payment_method = ?, user_id = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&req.date)
    .bind(req.amount)
    .bind(&req.payment_method)
    .bind(&req.user_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    Ok(flash::redirect(
        &index,
        Flash::success("Pago actualizado correctamente."),
    ))
}

/// DELETE /{base}/payments/:id
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&state.db, &id, actor.gym_id()).await?;

    sqlx::query("DELETE FROM payments WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(flash::redirect(
        &actor.index_path("payments"),
        Flash::success("Pago eliminado correctamente."),
    ))
}
