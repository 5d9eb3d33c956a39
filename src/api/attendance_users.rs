//! Member attendance management.

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
    Actor, AttendanceUser, AttendanceUserFilters, CreateAttendanceUserRequest,
    UpdateAttendanceRequest, User,
};
use crate::{AppState, DbPool};

use super::error::{ApiError, ValidationErrorBuilder};
use super::flash::{self, Flash};
use super::validation::{validate_date, validate_time};

async fn validate_store(
    pool: &DbPool,
    gym_id: &str,
    req: &CreateAttendanceUserRequest,
) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_date(&req.date) {
        errors.add("date", e);
    }

    let check_in = match validate_time(&req.check_in) {
        Ok(time) => Some(time),
        Err(e) => {
            errors.add("check_in", e);
            None
        }
    };
    if let Some(check_out) = req.check_out.as_deref().filter(|v| !v.is_empty()) {
        match validate_time(check_out) {
            Ok(out) => {
                if let Some(check_in) = check_in {
                    if out < check_in {
                        errors.add(
                            "check_out",
                            "La salida debe ser igual o posterior a la entrada.",
                        );
                    }
                }
            }
            Err(e) => {
                errors.add("check_out", e);
            }
        }
    }

    if req.user_id.is_empty() {
        errors.add("user_id", "La cédula del usuario es obligatoria.");
    } else if !User::exists_in_gym(pool, &req.user_id, gym_id).await? {
        errors.add("user_id", "No existe un usuario con este ID en el gimnasio.");
    }

    errors.finish()
}

/// Closing an attendance validates the new check-out against the recorded
/// check-in.
fn validate_checkout(check_in: &str, req: &UpdateAttendanceRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    match (validate_time(&req.check_out), validate_time(check_in)) {
        (Ok(out), Ok(in_)) if out < in_ => {
            errors.add(
                "check_out",
                "La salida debe ser igual o posterior a la entrada.",
            );
        }
        (Err(e), _) => {
            errors.add("check_out", e);
        }
        _ => {}
    }

    errors.finish()
}

/// The attendance must belong to the acting staff member's gym.
async fn authorize(pool: &DbPool, id: &str, gym_id: &str) -> Result<(), ApiError> {
    match AttendanceUser::gym_of(pool, id).await? {
        Some(owner_gym) if owner_gym == gym_id => Ok(()),
        Some(_) => Err(ApiError::forbidden("No autorizado")),
        None => Err(ApiError::not_found("Asistencia no encontrada")),
    }
}

/// GET /{base}/attendance-users
pub async fn index(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    jar: CookieJar,
    Query(filters): Query<AttendanceUserFilters>,
) -> Result<Response, ApiError> {
    let (jar, flash) = flash::take(jar);
    let gym_id = actor.gym_id();

    let attendances =
        AttendanceUser::list(&state.db, gym_id, &filters, &state.config.pagination).await?;
    let members = User::all_for_gym(&state.db, gym_id).await?;

    Ok((
        jar,
        Json(json!({
            "attendances": attendances,
            "users": members,
            "flash": flash,
        })),
    )
        .into_response())
}

/// POST /{base}/attendance-users
pub async fn store(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Form(req): Form<CreateAttendanceUserRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("attendance-users");
    validate_store(&state.db, actor.gym_id(), &req)
        .await
        .map_err(|e| e.with_redirect(&index))?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO attendance_users (id, date, check_in, check_out, user_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&req.date)
    .bind(&req.check_in)
    .bind(req.check_out.as_deref().filter(|v| !v.is_empty()))
    .bind(&req.user_id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    Ok(flash::redirect(
        &index,
        Flash::success("Asistencia registrada exitosamente."),
    ))
}

/// GET /{base}/attendance-users/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<AttendanceUser>, ApiError> {
    let attendance = AttendanceUser::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Asistencia no encontrada"))?;
    authorize(&state.db, &id, actor.gym_id()).await?;
    Ok(Json(attendance))
}

/// PUT /{base}/attendance-users/:id — records the check-out.
pub async fn update(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Form(req): Form<UpdateAttendanceRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("attendance-users");

    let attendance = AttendanceUser::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Asistencia no encontrada"))?;
    authorize(&state.db, &id, actor.gym_id()).await?;

    validate_checkout(&attendance.check_in, &req).map_err(|e| e.with_redirect(&index))?;

    sqlx::query("UPDATE attendance_users SET check_out = ?, updated_at = ? WHERE id = ?")
        .bind(&req.check_out)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(flash::redirect(
        &index,
        Flash::success("Asistencia finalizada correctamente."),
    ))
}

/// DELETE /{base}/attendance-users/:id
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&state.db, &id, actor.gym_id()).await?;

    sqlx::query("DELETE FROM attendance_users WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(flash::redirect(
        &actor.index_path("attendance-users"),
        Flash::success("Asistencia eliminada correctamente."),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    #[tokio::test]
    async fn test_store_allows_open_attendance() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        testing::seed_member(&pool, &gym, "100001", "Carlos", "Activo").await;

        let req = CreateAttendanceUserRequest {
            date: "2025-06-01".to_string(),
            check_in: "09:00".to_string(),
            check_out: None,
            user_id: "100001".to_string(),
        };
        assert!(validate_store(&pool, &gym, &req).await.is_ok());

        let req = CreateAttendanceUserRequest {
            check_out: Some("08:30".to_string()),
            ..req
        };
        let err = validate_store(&pool, &gym, &req).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("check_out"));
    }

    #[tokio::test]
    async fn test_store_rejects_foreign_gym_member() {
        let pool = testing::pool().await;
        let gym1 = testing::seed_gym(&pool, "Uno").await;
        let gym2 = testing::seed_gym(&pool, "Dos").await;
        testing::seed_member(&pool, &gym2, "200001", "Lucía", "Activo").await;

        let req = CreateAttendanceUserRequest {
            date: "2025-06-01".to_string(),
            check_in: "09:00".to_string(),
            check_out: None,
            user_id: "200001".to_string(),
        };
        let err = validate_store(&pool, &gym1, &req).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("user_id"));
    }

    #[test]
    fn test_checkout_must_not_precede_checkin() {
        let before = UpdateAttendanceRequest {
            check_out: "08:30".to_string(),
        };
        assert!(validate_checkout("09:00", &before).is_err());

        let equal = UpdateAttendanceRequest {
            check_out: "09:00".to_string(),
        };
        assert!(validate_checkout("09:00", &equal).is_ok());

        let after = UpdateAttendanceRequest {
            check_out: "10:15".to_string(),
        };
        assert!(validate_checkout("09:00", &after).is_ok());

        let junk = UpdateAttendanceRequest {
            check_out: "later".to_string(),
        };
        assert!(validate_checkout("09:00", &junk).is_err());
    }
}
