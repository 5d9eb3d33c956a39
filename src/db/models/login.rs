//! Login and session models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Identity record. `actor_type`/`actor_id` reference exactly one row in
/// `admins`, `receptionists` or `users`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Login {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub actor_type: String,
    pub actor_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Login {
    pub async fn find_by_email(pool: &crate::DbPool, email: &str) -> sqlx::Result<Option<Login>> {
        sqlx::query_as("SELECT * FROM logins WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn find(pool: &crate::DbPool, id: &str) -> sqlx::Result<Option<Login>> {
        sqlx::query_as("SELECT * FROM logins WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// One browser session. The cookie holds the raw token; only its SHA-256
/// digest is stored here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub login_id: String,
    pub token_hash: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}
