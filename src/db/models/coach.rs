//! Coach model. Coaches are provisioned out of band; the panel only
//! references them from attendance records and dropdowns.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coach {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub phone_number: String,
    pub birth_date: String,
    pub gym_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Coach {
    pub async fn all_for_gym(pool: &DbPool, gym_id: &str) -> sqlx::Result<Vec<Coach>> {
        sqlx::query_as("SELECT * FROM coaches WHERE gym_id = ? ORDER BY name")
            .bind(gym_id)
            .fetch_all(pool)
            .await
    }

    pub async fn exists_in_gym(pool: &DbPool, id: &str, gym_id: &str) -> sqlx::Result<bool> {
        let exists: (i64,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM coaches WHERE id = ? AND gym_id = ?)")
                .bind(id)
                .bind(gym_id)
                .fetch_one(pool)
                .await?;
        Ok(exists.0 != 0)
    }
}
