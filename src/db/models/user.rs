//! Gym member model, request DTOs and the scoped listing query.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::common::{filter_value, like_pattern, limit_offset, present, resolve_page, Page};
use crate::config::PaginationConfig;
use crate::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    /// National id number (5-20 digits), supplied at registration.
    pub id: String,
    pub name: String,
    pub gender: String,
    pub birth_date: String,
    pub phone_number: String,
    pub email: String,
    pub state: String,
    pub gym_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub id: String,
    pub name: String,
    pub gender: String,
    pub birth_date: String,
    pub phone_number: String,
    pub email: String,
    pub state: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub gender: String,
    pub birth_date: String,
    pub phone_number: String,
    pub email: String,
    pub state: String,
}

/// Recognized list filters, applied in declaration order.
#[derive(Debug, Default, Deserialize)]
pub struct UserFilters {
    pub search: Option<String>,
    pub state: Option<String>,
    pub gender: Option<String>,
    pub id: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// A `dd/mm/YYYY` search term also matches the member's birth date.
fn search_date(value: &str) -> Option<String> {
    NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, gym_id: &str, filters: &UserFilters) {
    qb.push(" FROM users WHERE gym_id = ");
    qb.push_bind(gym_id.to_string());

    if let Some(search) = present(&filters.search) {
        let pattern = like_pattern(search);
        qb.push(" AND (name LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR email LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR phone_number LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR state LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR gender LIKE ");
        qb.push_bind(pattern);
        if let Some(date) = search_date(search) {
            qb.push(" OR birth_date = ");
            qb.push_bind(date);
        }
        qb.push(")");
    }

    if let Some(state) = filter_value(&filters.state) {
        qb.push(" AND state = ");
        qb.push_bind(state.to_string());
    }

    if let Some(gender) = filter_value(&filters.gender) {
        qb.push(" AND gender = ");
        qb.push_bind(gender.to_string());
    }

    if let Some(id) = filter_value(&filters.id) {
        qb.push(" AND id LIKE ");
        qb.push_bind(like_pattern(id));
    }
}

impl User {
    pub async fn list(
        pool: &DbPool,
        gym_id: &str,
        filters: &UserFilters,
        config: &PaginationConfig,
    ) -> sqlx::Result<Page<User>> {
        let (page, per_page) = resolve_page(filters.page, filters.per_page, config);

        let mut count = QueryBuilder::new("SELECT COUNT(*)");
        push_filters(&mut count, gym_id, filters);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let (limit, offset) = limit_offset(page, per_page);
        let mut select = QueryBuilder::new("SELECT *");
        push_filters(&mut select, gym_id, filters);
        select.push(" ORDER BY created_at DESC, id LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);
        let data = select.build_query_as::<User>().fetch_all(pool).await?;

        Ok(Page::new(data, total, page, per_page))
    }

    /// Members of one gym, for the panel's dropdowns.
    pub async fn all_for_gym(pool: &DbPool, gym_id: &str) -> sqlx::Result<Vec<User>> {
        sqlx::query_as("SELECT * FROM users WHERE gym_id = ? ORDER BY name")
            .bind(gym_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_in_gym(pool: &DbPool, id: &str, gym_id: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as("SELECT * FROM users WHERE id = ? AND gym_id = ?")
            .bind(id)
            .bind(gym_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn exists_in_gym(pool: &DbPool, id: &str, gym_id: &str) -> sqlx::Result<bool> {
        let exists: (i64,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND gym_id = ?)")
                .bind(id)
                .bind(gym_id)
                .fetch_one(pool)
                .await?;
        Ok(exists.0 != 0)
    }

    pub async fn id_taken(pool: &DbPool, id: &str) -> sqlx::Result<bool> {
        let exists: (i64,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(id)
            .fetch_one(pool)
            .await?;
        Ok(exists.0 != 0)
    }

    /// Email uniqueness, optionally ignoring one row (the row being updated).
    pub async fn email_taken(
        pool: &DbPool,
        email: &str,
        exclude_id: Option<&str>,
    ) -> sqlx::Result<bool> {
        let exists: (i64,) = match exclude_id {
            Some(id) => {
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND id != ?)")
                    .bind(email)
                    .bind(id)
                    .fetch_one(pool)
                    .await?
            }
            None => sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
                .bind(email)
                .fetch_one(pool)
                .await?,
        };
        Ok(exists.0 != 0)
    }
}
