//! Authentication: password hashing, browser sessions, the login/logout
//! handlers and the per-request role gate.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::Config;
use crate::db::{Actor, Login, LoginRequest, Role, Session};
use crate::{AppState, DbPool};

use super::error::{ApiError, ValidationErrorBuilder};
use super::flash::{self, Flash};
use super::validation::{validate_email, validate_password};

pub const SESSION_COOKIE: &str = "gymdesk_session";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash. Argon2's verifier compares digests in
/// constant time.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Login failures, with the form field each one belongs to.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("El correo no está registrado")]
    UnknownEmail,
    #[error("Contraseña incorrecta")]
    WrongPassword,
    #[error("Tipo de usuario no reconocido")]
    UnknownActor,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl AuthError {
    pub fn field(&self) -> &'static str {
        match self {
            AuthError::WrongPassword => "password",
            _ => "email",
        }
    }
}

/// Resolve a credential pair to its login row and actor. One attempt, no
/// session side effects.
pub async fn authenticate(
    pool: &DbPool,
    email: &str,
    password: &str,
) -> Result<(Login, Actor), AuthError> {
    let login = Login::find_by_email(pool, email)
        .await?
        .ok_or(AuthError::UnknownEmail)?;

    if !verify_password(password, &login.password_hash) {
        return Err(AuthError::WrongPassword);
    }

    let actor = Actor::resolve(pool, &login.actor_type, &login.actor_id)
        .await?
        .ok_or(AuthError::UnknownActor)?;

    Ok((login, actor))
}

/// Create a session row and return the raw browser token.
pub async fn create_session(pool: &DbPool, login_id: &str) -> sqlx::Result<String> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (id, login_id, token_hash, created_at) VALUES (?, ?, ?, ?)")
        .bind(Uuid::new_v4().to_string())
        .bind(login_id)
        .bind(hash_token(&token))
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await?;
    Ok(token)
}

/// Delete the session a token points at. Deleting an already-gone session
/// is not an error, which makes logout idempotent.
pub async fn destroy_session(pool: &DbPool, token: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .execute(pool)
        .await?;
    Ok(())
}

/// Re-resolve the acting principal from a session token: session row →
/// login row → actor. Any missing link yields `None`.
pub async fn resolve_session(pool: &DbPool, token: &str) -> sqlx::Result<Option<Actor>> {
    let session: Option<Session> = sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ?")
        .bind(hash_token(token))
        .fetch_optional(pool)
        .await?;

    let Some(session) = session else {
        return Ok(None);
    };

    let Some(login) = Login::find(pool, &session.login_id).await? else {
        return Ok(None);
    };

    Actor::resolve(pool, &login.actor_type, &login.actor_id).await
}

fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .build()
}

fn session_removal_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}

/// GET /login — the page itself is static panel content; this returns the
/// pending flash payload (field errors, messages) for it.
pub async fn login_form(jar: CookieJar) -> impl IntoResponse {
    let (jar, flash) = flash::take(jar);
    (jar, Json(serde_json::json!({ "flash": flash })))
}

/// POST /login
pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(request): Form<LoginRequest>,
) -> Response {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validate_email(&request.email) {
        errors.add("email", e);
    }
    if let Err(e) = validate_password(&request.password) {
        errors.add("password", e);
    }
    if let Some(err) = errors.build() {
        return err.with_redirect("/login").into_response();
    }

    let (login, actor) = match authenticate(&state.db, &request.email, &request.password).await {
        Ok(resolved) => resolved,
        Err(AuthError::Database(e)) => return ApiError::from(e).into_response(),
        Err(e) => return flash::redirect("/login", Flash::error(e.field(), e.to_string())),
    };

    let token = match create_session(&state.db, &login.id).await {
        Ok(token) => token,
        Err(e) => return ApiError::from(e).into_response(),
    };

    let target = match actor.role() {
        Role::Admin => "/admin/dashboard",
        Role::Receptionist => "/receptionist/dashboard",
        Role::User => {
            // Members have no back-office landing page; undo the session.
            if let Err(e) = destroy_session(&state.db, &token).await {
                tracing::error!("Failed to delete session: {}", e);
            }
            return flash::redirect(
                "/login",
                Flash::error("email", "Tipo de usuario no soportado"),
            );
        }
    };

    tracing::info!(email = %login.email, role = %actor.role(), "Login");
    let jar = jar.add(session_cookie(&token));
    (jar, Redirect::to(target)).into_response()
}

/// POST /logout — idempotent.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = destroy_session(&state.db, cookie.value()).await {
            tracing::error!("Failed to delete session: {}", e);
        }
    }
    let jar = jar
        .remove(session_removal_cookie())
        .add(flash::cookie(&Flash::success("Sesión cerrada correctamente")));
    (jar, Redirect::to("/login")).into_response()
}

/// The role gate run on every protected request. Re-resolves the actor from
/// the session store each time; holds no state between requests.
async fn role_gate(
    required: Role,
    state: Arc<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return flash::redirect("/login", Flash::error("access", "Debes iniciar sesión."));
    };
    let token = cookie.value().to_string();

    let actor = match resolve_session(&state.db, &token).await {
        Ok(Some(actor)) => actor,
        Ok(None) => {
            // Stale or tampered session: drop it and start over.
            if let Err(e) = destroy_session(&state.db, &token).await {
                tracing::error!("Failed to delete session: {}", e);
            }
            let jar = jar.remove(session_removal_cookie());
            return (
                jar,
                flash::redirect("/login", Flash::error("access", "Sesión inválida.")),
            )
                .into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    };

    if actor.role() != required {
        return flash::redirect("/login", Flash::error("access", "Permisos insuficientes."));
    }

    request.extensions_mut().insert(actor);
    next.run(request).await
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Response {
    role_gate(Role::Admin, state, jar, request, next).await
}

pub async fn require_receptionist(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Response {
    role_gate(Role::Receptionist, state, jar, request, next).await
}

pub async fn require_member(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request<Body>,
    next: Next,
) -> Response {
    role_gate(Role::User, state, jar, request, next).await
}

/// Extractor for the actor the role gate resolved for this request.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or_else(|| flash::redirect("/login", Flash::error("access", "Sesión inválida.")))
    }
}

/// Ensure the configured administrator login exists (first run).
pub async fn ensure_admin_login(pool: &DbPool, config: &Config, gym_id: &str) -> anyhow::Result<()> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM logins WHERE actor_type = 'admin'")
        .fetch_one(pool)
        .await?;
    if count.0 > 0 {
        return Ok(());
    }

    let now = chrono::Utc::now().to_rfc3339();
    let admin_id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO admins (id, name, email, gym_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&admin_id)
    .bind("Administrador")
    .bind(&config.auth.admin_email)
    .bind(gym_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    let password_hash = hash_password(&config.auth.admin_password)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    sqlx::query(
        "INSERT INTO logins (id, email, password_hash, actor_type, actor_id, created_at, updated_at) \
         VALUES (?, ?, ?, 'admin', ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&config.auth.admin_email)
    .bind(&password_hash)
    .bind(&admin_id)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    tracing::info!("Created administrator login: {}", config.auth.admin_email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secreto123").unwrap();
        assert!(verify_password("secreto123", &hash));
        assert!(!verify_password("secreto124", &hash));
        assert!(!verify_password("secreto123", "not-a-hash"));
    }

    #[test]
    fn test_tokens_are_unique_and_hashed() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert_eq!(hash_token(&a), hash_token(&a));
        assert_ne!(hash_token(&a), a);
    }

    #[tokio::test]
    async fn test_authenticate_failures() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        testing::seed_admin(&pool, &gym, "admin@test.local", "secreto123").await;

        match authenticate(&pool, "nobody@test.local", "secreto123").await {
            Err(AuthError::UnknownEmail) => {}
            other => panic!("expected UnknownEmail, got {:?}", other.map(|_| ())),
        }

        match authenticate(&pool, "admin@test.local", "wrong-password").await {
            Err(AuthError::WrongPassword) => {}
            other => panic!("expected WrongPassword, got {:?}", other.map(|_| ())),
        }

        let (login, actor) = authenticate(&pool, "admin@test.local", "secreto123")
            .await
            .unwrap();
        assert_eq!(login.email, "admin@test.local");
        assert_eq!(actor.role(), Role::Admin);
        assert_eq!(actor.gym_id(), gym);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_dangling_actor() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        let login_id = testing::seed_admin(&pool, &gym, "admin@test.local", "secreto123").await;

        // Point the login at a missing actor row.
        sqlx::query("UPDATE logins SET actor_id = 'gone' WHERE id = ?")
            .bind(&login_id)
            .execute(&pool)
            .await
            .unwrap();

        match authenticate(&pool, "admin@test.local", "secreto123").await {
            Err(AuthError::UnknownActor) => {}
            other => panic!("expected UnknownActor, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_session_lifecycle_and_idempotent_destroy() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        let login_id = testing::seed_admin(&pool, &gym, "admin@test.local", "secreto123").await;

        let token = create_session(&pool, &login_id).await.unwrap();
        let actor = resolve_session(&pool, &token).await.unwrap().unwrap();
        assert_eq!(actor.role(), Role::Admin);

        // An unknown token resolves to nothing.
        assert!(resolve_session(&pool, "bogus").await.unwrap().is_none());

        destroy_session(&pool, &token).await.unwrap();
        assert!(resolve_session(&pool, &token).await.unwrap().is_none());
        // Destroying again is a no-op, not an error.
        destroy_session(&pool, &token).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_session_with_unknown_role_tag() {
        let pool = testing::pool().await;
        let gym = testing::seed_gym(&pool, "Uno").await;
        let login_id = testing::seed_admin(&pool, &gym, "admin@test.local", "secreto123").await;
        sqlx::query("UPDATE logins SET actor_type = 'coach' WHERE id = ?")
            .bind(&login_id)
            .execute(&pool)
            .await
            .unwrap();

        let token = create_session(&pool, &login_id).await.unwrap();
        assert!(resolve_session(&pool, &token).await.unwrap().is_none());
    }
}
