mod models;
mod seeders;

pub use models::*;
pub use seeders::seed_default_gym;

use anyhow::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("gymdesk.db");
    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    info!("Initializing database at {}", db_path.display());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    // Enable WAL mode for better concurrency
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: Initial schema
    execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::api::auth::hash_password;
    use uuid::Uuid;

    /// Fresh in-memory database with the full schema applied.
    pub async fn pool() -> DbPool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .expect("pragma");
        run_migrations(&pool).await.expect("migrations");
        pool
    }

    pub async fn seed_gym(pool: &DbPool, name: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO gyms (id, name, address, phone_number, created_at, updated_at) \
             VALUES (?, ?, NULL, NULL, ?, ?)",
        )
        .bind(&id)
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed gym");
        id
    }

    pub async fn seed_member(pool: &DbPool, gym_id: &str, id: &str, name: &str, state: &str) -> String {
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, name, gender, birth_date, phone_number, email, state, gym_id, created_at, updated_at) \
             VALUES (?, ?, 'M', '1990-01-01', '3001112233', ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(format!("{}@test.local", id))
        .bind(state)
        .bind(gym_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed member");
        id.to_string()
    }

    pub async fn seed_admin(pool: &DbPool, gym_id: &str, email: &str, password: &str) -> String {
        let now = chrono::Utc::now().to_rfc3339();
        let admin_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO admins (id, name, email, gym_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&admin_id)
        .bind("Administrador")
        .bind(email)
        .bind(gym_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed admin");

        let login_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO logins (id, email, password_hash, actor_type, actor_id, created_at, updated_at) \
             VALUES (?, ?, ?, 'admin', ?, ?, ?)",
        )
        .bind(&login_id)
        .bind(email)
        .bind(hash_password(password).expect("hash"))
        .bind(&admin_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed login");
        login_id
    }

    pub async fn seed_receptionist(pool: &DbPool, gym_id: &str, email: &str, password: &str) -> String {
        let now = chrono::Utc::now().to_rfc3339();
        let receptionist_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO receptionists (id, name, email, gym_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&receptionist_id)
        .bind("Recepcionista")
        .bind(email)
        .bind(gym_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed receptionist");

        let login_id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO logins (id, email, password_hash, actor_type, actor_id, created_at, updated_at) \
             VALUES (?, ?, ?, 'receptionist', ?, ?, ?)",
        )
        .bind(&login_id)
        .bind(email)
        .bind(hash_password(password).expect("hash"))
        .bind(&receptionist_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed login");
        login_id
    }

    pub async fn seed_membership(pool: &DbPool, user_id: &str, kind: &str, amount: f64) -> String {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO memberships (id, type, amount, discount, start_date, finish_date, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, 0, '2025-01-01', '2025-02-01', ?, ?, ?)",
        )
        .bind(&id)
        .bind(kind)
        .bind(amount)
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed membership");
        id
    }
}
