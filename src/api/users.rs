//! Gym member management.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Form, Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;
use std::sync::Arc;

use crate::db::{Actor, CreateUserRequest, Gym, UpdateUserRequest, User, UserFilters};
use crate::{AppState, DbPool};

use super::error::{ApiError, ValidationErrorBuilder};
use super::flash::{self, Flash};
use super::validation::{
    title_case, validate_date, validate_email, validate_gender, validate_name,
    validate_national_id, validate_phone, validate_state,
};

async fn validate_store(pool: &DbPool, req: &CreateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_national_id(&req.id) {
        errors.add("id", e);
    } else if User::id_taken(pool, &req.id).await? {
        errors.add("id", "Ya existe un usuario con esta cédula.");
    }
    if let Err(e) = validate_name(&req.name) {
        errors.add("name", e);
    }
    if let Err(e) = validate_gender(&req.gender) {
        errors.add("gender", e);
    }
    if let Err(e) = validate_date(&req.birth_date) {
        errors.add("birth_date", e);
    }
    if let Err(e) = validate_phone(&req.phone_number) {
        errors.add("phone_number", e);
    }
    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    } else if User::email_taken(pool, &req.email, None).await? {
        errors.add("email", "El correo ya está registrado.");
    }
    if let Err(e) = validate_state(&req.state) {
        errors.add("state", e);
    }

    errors.finish()
}

async fn validate_update(pool: &DbPool, id: &str, req: &UpdateUserRequest) -> Result<(), ApiError> {
    let mut errors = ValidationErrorBuilder::new();

    if let Err(e) = validate_name(&req.name) {
        errors.add("name", e);
    }
    if let Err(e) = validate_gender(&req.gender) {
        errors.add("gender", e);
    }
    if let Err(e) = validate_date(&req.birth_date) {
        errors.add("birth_date", e);
    }
    if let Err(e) = validate_phone(&req.phone_number) {
        errors.add("phone_number", e);
    }
    if let Err(e) = validate_email(&req.email) {
        errors.add("email", e);
    } else if User::email_taken(pool, &req.email, Some(id)).await? {
        errors.add("email", "El correo ya está registrado.");
    }
    if let Err(e) = validate_state(&req.state) {
        errors.add("state", e);
    }

    errors.finish()
}

/// GET /{base}/users
pub async fn index(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    jar: CookieJar,
    Query(filters): Query<UserFilters>,
) -> Result<Response, ApiError> {
    let (jar, flash) = flash::take(jar);
    let users = User::list(
        &state.db,
        actor.gym_id(),
        &filters,
        &state.config.pagination,
    )
    .await?;
    let gym = Gym::find(&state.db, actor.gym_id()).await?;

    Ok((jar, Json(json!({ "users": users, "gym": gym, "flash": flash }))).into_response())
}

/// POST /{base}/users
pub async fn store(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Form(req): Form<CreateUserRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("users");
    validate_store(&state.db, &req)
        .await
        .map_err(|e| e.with_redirect(&index))?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO users (id, name, gender, birth_date, phone_number, email, state, gym_id, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&req.id)
    .bind(title_case(&req.name))
    .bind(&req.gender)
    .bind(&req.birth_date)
    .bind(&req.phone_number)
    .bind(&req.email)
    .bind(&req.state)
    .bind(actor.gym_id())
    .bind(&now)
    .bind(&now)
    .execute(&state.db)
    .await?;

    Ok(flash::redirect(
        &index,
        Flash::success("Usuario registrado correctamente."),
    ))
}

/// GET /{base}/users/:id
pub async fn show(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<User>, ApiError> {
    User::find_in_gym(&state.db, &id, actor.gym_id())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))
}

/// PUT /{base}/users/:id
pub async fn update(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    Form(req): Form<UpdateUserRequest>,
) -> Result<Response, ApiError> {
    let index = actor.index_path("users");

    User::find_in_gym(&state.db, &id, actor.gym_id())
        .await?
        .ok_or_else(|| ApiError::not_found("Usuario no encontrado"))?;

    validate_update(&state.db, &id, &req)
        .await
        .map_err(|e| e.with_redirect(&index))?;

    sqlx::query(
        "UPDATE users SET name = ?, gender = ?, birth_date = ?, phone_number = ?, email = ?, state = ?, updated_at = ? \
         WHERE id = ?",
    )
    .bind(title_case(&req.name))
    .bind(&req.gender)
    .bind(&req.birth_date)
    .bind(&req.phone_number)
    .bind(&req.email)
    .bind(&req.state)
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(&id)
    .execute(&state.db)
    .await?;

    Ok(flash::redirect(
        &index,
        Flash::success("Usuario actualizado correctamente."),
    ))
}

/// DELETE /{base}/users/:id
pub async fn destroy(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Usuario no encontrado"));
    }

    Ok(flash::redirect(
        &actor.index_path("users"),
        Flash::success("Usuario eliminado correctamente."),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    fn create_request() -> CreateUserRequest {
        CreateUserRequest {
            id: "123456".to_string(),
            name: "david lópez".to_string(),
            gender: "M".to_string(),
            birth_date: "1990-01-01".to_string(),
            phone_number: "1234567890".to_string(),
            email: "david@test.local".to_string(),
            state: "Activo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_validate_store_accepts_a_valid_member() {
        let pool = testing::pool().await;
        testing::seed_gym(&pool, "Uno").await;
        assert!(validate_store(&pool, &create_request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_store_rejects_duplicates_and_bad_fields() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        testing::seed_member(&pool, &gym, "123456", "David", "Activo").await;

        let mut req = create_request();
        req.state = "activo".to_string();
        let err = validate_store(&pool, &req).await.unwrap_err();
        let fields = err.field_errors().unwrap();
        // Duplicate cedula, duplicate-free email, invalid state casing.
        assert!(fields.contains_key("id"));
        assert!(fields.contains_key("state"));
        assert!(!fields.contains_key("email"));

        let mut req = create_request();
        req.id = "99999".to_string();
        req.email = "123456@test.local".to_string();
        let err = validate_store(&pool, &req).await.unwrap_err();
        assert!(err.field_errors().unwrap().contains_key("email"));
    }

    #[tokio::test]
    async fn test_validate_update_ignores_own_email() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        testing::seed_member(&pool, &gym, "123456", "David", "Activo").await;

        let req = UpdateUserRequest {
            name: "David".to_string(),
            gender: "M".to_string(),
            birth_date: "1990-01-01".to_string(),
            phone_number: "1234567890".to_string(),
            email: "123456@test.local".to_string(),
            state: "Inactivo".to_string(),
        };
        assert!(validate_update(&pool, "123456", &req).await.is_ok());
        // Same email under a different member id is a conflict.
        assert!(validate_update(&pool, "654321", &req).await.is_err());
    }
}
