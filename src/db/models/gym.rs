//! Gym (tenant) model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A gym is the unit of data isolation: every member, membership, payment
/// and attendance record hangs off exactly one gym.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gym {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Gym {
    pub async fn find(pool: &crate::DbPool, id: &str) -> sqlx::Result<Option<Gym>> {
        sqlx::query_as("SELECT * FROM gyms WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
