//! Membership management.

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
    Actor, CreateMembershipRequest, Membership, MembershipFilters, UpdateMembershipRequest, User,
};
use crate::{AppState, DbPool};

use super::error::{ApiError, ValidationErrorBuilder};
use super::flash::{self, Flash};
use super::validation::{validate_amount, validate_date, validate_discount, validate_membership_type};

/// Shared by store and update: field constraints plus the tenant check on
/// the referenced member.
async fn validate_request(
    pool: &DbPool,
    gym_id: &str,
    membership_type: &str,
    amount: f64,
    discount: Option<f64>,
    start_date: &str,
    finish_date: &str,
    user_id: &str,
) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_membership_type(membership_type) {
        errors.add("type", e);
    }
    if let Err(e) = validate_amount(amount) {
        errors.add("amount", e);
    }
    if let Err(e) = validate_discount(discount.unwrap_or(0.0)) {
        errors.add("discount", e);
    }

    let start = match validate_date(start_date) {
        Ok(date) => Some(date),
        Err(e) => {
            errors.add("start_date", e);
            None
        }
    };
    match validate_date(finish_date) {
        Ok(finish) => {
            if let Some(start) = start {
                if finish < start {
                    errors.add(
                        "finish_date",
                        "La fecha de fin debe ser igual o posterior a la de inicio.",
                    );
                }
            }
        }
        Err(e) => {
            errors.add("finish_date", e);
        }
    }

    if user_id.is_empty() {
        errors.add("user_id", "La cédula del usuario es obligatoria.");
    } else if !User::exists_in_gym(pool, user_id, gym_id).await? {
        errors.add("user_id", "No existe un usuario con esta cédula en el gimnasio.");
    }

    errors.finish()
}

/// GET /{base}/memberships
pub async fn index(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    jar: CookieJar,
    Query(filters): Query<MembershipFilters>,
) -> Result<Response, ApiError> {
    let (jar, flash) = flash::take(jar);
    let gym_id = actor.gym_id();

    let memberships =
        Membership::list(&state.db, gym_id, &filters, &state.config.pagination).await?;
    let types = Membership::distinct_types(&state.db, gym_id).await?;
    let members = User::all_for_gym(&state.db, gym_id).await?;

    Ok((
        jar,
        Json(json!({
            "memberships": memberships,
            "types": types,
            "users": members,
            "flash": flash,
        })),
    )
        .into_response())
}

/// POST /{base}/memberships — on success, hands the new membership over to
/// the payment form through the flash.
pub async fn store(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Form(req): Form<CreateMembershipRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("memberships");
    validate_request(
        &state.db,
        actor.gym_id(),
        &req.membership_type,
        req.amount,
        req.discount,
        &req.start_date,
        &req.finish_date,
        &req.user_id,
    )
    .await
    .map_err(|e| e.with_redirect(&index))?;

    let id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO memberships (id, type, amount, discount, start_date, finish_date, user_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&req.membership_type)
    .bind(req.amount)
    .bind(req.discount.unwrap_or(0.0))
    .bind(&req.start_date)
    .bind(&req.finish_date)
    .bind(&req.user_id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    let flash = Flash::success("Membresía creada correctamente. Ahora puedes registrar el pago.")
        .with_data("user_id", &req.user_id)
        .with_data("membership_id", &id)
        .with_data("amount", format!("{}", req.amount));

    Ok(flash::redirect(&actor.index_path("payments"), flash))
}

/// GET /{base}/memberships/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Membership>, ApiError> {
    let membership = Membership::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Membresía no encontrada"))?;
    authorize(&state.db, &id, actor.gym_id()).await?;
    Ok(Json(membership))
}

/// The membership must belong to the acting staff member's gym.
async fn authorize(pool: &DbPool, id: &str, gym_id: &str) -> Result<(), ApiError> {
    match Membership::gym_of(pool, id).await? {
        Some(owner_gym) if owner_gym == gym_id => Ok(()),
        Some(_) => Err(ApiError::forbidden("No autorizado.")),
        None => Err(ApiError::not_found("Membresía no encontrada")),
    }
}

/// PUT /{base}/memberships/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Form(req): Form<UpdateMembershipRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("memberships");

    Membership::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Membresía no encontrada"))?;
    authorize(&state.db, &id, actor.gym_id()).await?;

    validate_request(
        &state.db,
        actor.gym_id(),
        &req.membership_type,
        req.amount,
        req.discount,
        &req.start_date,
        &req.finish_date,
        &req.user_id,
    )
    .await
    .map_err(|e| e.with_redirect(&index))?;

    sqlx::query(
        "UPDATE memberships SET type = ?, amount = ?, discount = ?, start_date = ?, finish_date = ?, user_id = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(&req.membership_type)
    .bind(req.amount)
    .bind(req.discount.unwrap_or(0.0))
    .bind(&req.start_date)
    .bind(&req.finish_date)
    .bind(&req.user_id)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    Ok(flash::redirect(
        &index,
        Flash::success("Membresía actualizada correctamente."),
    ))
}

/// DELETE /{base}/memberships/:id
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&state.db, &id, actor.gym_id()).await?;

    sqlx::query("DELETE FROM memberships WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(flash::redirect(
        &actor.index_path("memberships"),
        Flash::success("Membresía eliminada correctamente."),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    #[tokio::test]
    async fn test_validation_rejects_inverted_dates_before_any_write() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        testing::seed_member(&pool, &gym, "100001", "Carlos", "Activo").await;

        let err = validate_request(
            &pool,
            &gym,
            "Mensual",
            50.0,
            None,
            "2025-06-10",
            "2025-06-01",
            "100001",
        )
        .await
        .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("finish_date"));

        // Equal dates are allowed (a one-day membership).
        assert!(validate_request(
            &pool,
            &gym,
            "Diaria",
            10.0,
            None,
            "2025-06-01",
            "2025-06-01",
            "100001"
        )
        .await
        .is_ok());
    }

    #[tokio::test]
    async fn test_validation_rejects_foreign_gym_member() {
        let pool = testing::pool().await;
        let gym1 = testing::seed_gym(&pool, "Uno").await;
        let gym2 = testing::seed_gym(&pool, "Dos").await;
        testing::seed_member(&pool, &gym2, "200001", "Lucía", "Activo").await;

        let err = validate_request(
            &pool,
            &gym1,
            "Mensual",
            50.0,
            Some(10.0),
            "2025-06-01",
            "2025-07-01",
            "200001",
        )
        .await
        .unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("user_id"));
    }

    #[tokio::test]
    async fn test_validation_checks_type_and_discount_range() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        testing::seed_member(&pool, &gym, "100001", "Carlos", "Activo").await;

        let err = validate_request(
            &pool,
            &gym,
            "Semanal",
            -5.0,
            Some(150.0),
            "2025-06-01",
            "2025-07-01",
            "100001",
        )
        .await
        .unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains_key("type"));
        assert!(fields.contains_key("amount"));
        assert!(fields.contains_key("discount"));
    }

    #[tokio::test]
    async fn test_authorize_blocks_cross_tenant_access() {
        let pool = testing::pool().await;
        let gym1 = testing::seed_gym(&pool, "Uno").await;
        let gym2 = testing::seed_gym(&pool, "Dos").await;
        let member = testing::seed_member(&pool, &gym2, "200001", "Lucía", "Activo").await;
        let membership = testing::seed_membership(&pool, &member, "Mensual", 50.0).await;

        assert!(authorize(&pool, &membership, &gym2).await.is_ok());
        let err = authorize(&pool, &membership, &gym1).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);
    }
}
