//! First-run seed data.

use anyhow::Result;
use tracing::info;
use uuid::Uuid;

use super::models::common::now_rfc3339;
use super::DbPool;

/// Make sure at least one gym exists and return its id. The back office is
/// unusable without a tenant to scope everything to.
pub async fn seed_default_gym(pool: &DbPool, name: &str) -> Result<String> {
    let existing: Option<(String,)> =
        sqlx::query_as("SELECT id FROM gyms ORDER BY created_at LIMIT 1")
            .fetch_optional(pool)
            .await?;

    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4().to_string();
    let now = now_rfc3339();
    sqlx::query(
        "INSERT INTO gyms (id, name, address, phone_number, created_at, updated_at) \
         VALUES (?, ?, NULL, NULL, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    info!("Created default gym '{}'", name);
    Ok(id)
}
