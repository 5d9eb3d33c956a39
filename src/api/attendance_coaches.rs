//! Coach attendance management (admin section only).

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
    Actor, AttendanceCoach, AttendanceCoachFilters, Coach, CreateAttendanceCoachRequest,
    UpdateAttendanceRequest,
};
use crate::{AppState, DbPool};

use super::error::{ApiError, ValidationErrorBuilder};
use super::flash::{self, Flash};
use super::validation::{validate_date, validate_time};

async fn validate_store(
    pool: &DbPool,
    gym_id: &str,
    req: &CreateAttendanceCoachRequest,
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

    if req.coach_id.is_empty() {
        errors.add("coach_id", "El entrenador es obligatorio.");
    } else if !Coach::exists_in_gym(pool, &req.coach_id, gym_id).await? {
        errors.add("coach_id", "No existe un entrenador con este ID en el gimnasio.");
    }

    errors.finish()
}

/// The attendance must belong to the acting admin's gym.
async fn authorize(pool: &DbPool, id: &str, gym_id: &str) -> Result<(), ApiError> {
    match AttendanceCoach::gym_of(pool, id).await? {
        Some(owner_gym) if owner_gym == gym_id => Ok(()),
        Some(_) => Err(ApiError::forbidden("No autorizado")),
        None => Err(ApiError::not_found("Asistencia no encontrada")),
    }
}

/// GET /admin/attendance-coaches
pub async fn index(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    jar: CookieJar,
    Query(filters): Query<AttendanceCoachFilters>,
) -> Result<Response, ApiError> {
    let (jar, flash) = flash::take(jar);
    let gym_id = actor.gym_id();

    let attendances =
        AttendanceCoach::list(&state.db, gym_id, &filters, &state.config.pagination).await?;
    let coaches = Coach::all_for_gym(&state.db, gym_id).await?;

    Ok((
        jar,
        Json(json!({
            "attendances": attendances,
            "coaches": coaches,
            "flash": flash,
        })),
    )
        .into_response())
}

/// POST /admin/attendance-coaches
pub async fn store(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Form(req): Form<CreateAttendanceCoachRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("attendance-coaches");
    validate_store(&state.db, actor.gym_id(), &req)
        .await
        .map_err(|e| e.with_redirect(&index))?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO attendance_coaches (id, date, check_in, check_out, coach_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&req.date)
    .bind(&req.check_in)
    .bind(req.check_out.as_deref().filter(|v| !v.is_empty()))
    .bind(&req.coach_id)
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    Ok(flash::redirect(
        &index,
        Flash::success("Asistencia registrada exitosamente."),
    ))
}

/// GET /admin/attendance-coaches/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<AttendanceCoach>, ApiError> {
    let attendance = AttendanceCoach::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Asistencia no encontrada"))?;
    authorize(&state.db, &id, actor.gym_id()).await?;
    Ok(Json(attendance))
}

/// PUT /admin/attendance-coaches/:id — records the check-out.
pub async fn update(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Form(req): Form<UpdateAttendanceRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("attendance-coaches");

    let attendance = AttendanceCoach::find(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Asistencia no encontrada"))?;
    authorize(&state.db, &id, actor.gym_id()).await?;

    let mut errors = ValidationErrorBuilder::new();
    match (validate_time(&req.check_out), validate_time(&attendance.check_in)) {
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
    errors.finish().map_err(|e| e.with_redirect(&index))?;

    sqlx::query("UPDATE attendance_coaches SET check_out = ?, updated_at = ? WHERE id = ?")
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

/// DELETE /admin/attendance-coaches/:id
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    authorize(&state.db, &id, actor.gym_id()).await?;

    sqlx::query("DELETE FROM attendance_coaches WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(flash::redirect(
        &actor.index_path("attendance-coaches"),
        Flash::success("Asistencia eliminada correctamente."),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    async fn seed_coach(pool: &DbPool, gym_id: &str, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO coaches (id, name, gender, phone_number, birth_date, gym_id, created_at, updated_at) \
             VALUES (?, ?, 'male', '3000000000', '1985-04-04', ?, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(gym_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed coach");
        id
    }

    #[tokio::test]
    async fn test_store_requires_a_coach_of_the_same_gym() {
        let pool = testing::pool().await;
        let gym1 = testing::seed_gym(&pool, "Uno").await;
        let gym2 = testing::seed_gym(&pool, "Dos").await;
        let coach = seed_coach(&pool, &gym2, "Pedro").await;

        let req = CreateAttendanceCoachRequest {
            date: "2025-06-01".to_string(),
            check_in: "07:00".to_string(),
            check_out: None,
            coach_id: coach.clone(),
        };
        let err = validate_store(&pool, &gym1, &req).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("coach_id"));

        assert!(validate_store(&pool, &gym2, &req).await.is_ok());
    }
}
