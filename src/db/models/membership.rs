//! Membership model and scoped listing. Memberships hang off a member, so
//! every query joins `users` to apply the tenant filter.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::common::{filter_value, like_pattern, limit_offset, present, resolve_page, Page};
use crate::config::PaginationConfig;
use crate::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub membership_type: String,
    pub amount: f64,
    pub discount: f64,
    pub start_date: String,
    pub finish_date: String,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Listing row: the membership plus the owning member's name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MembershipRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub membership: Membership,
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateMembershipRequest {
    #[serde(rename = "type")]
    pub membership_type: String,
    pub amount: f64,
    pub discount: Option<f64>,
    pub start_date: String,
    pub finish_date: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMembershipRequest {
    #[serde(rename = "type")]
    pub membership_type: String,
    pub amount: f64,
    pub discount: Option<f64>,
    pub start_date: String,
    pub finish_date: String,
    pub user_id: String,
}

/// Recognized list filters, applied in declaration order.
#[derive(Debug, Default, Deserialize)]
pub struct MembershipFilters {
    pub id: Option<String>,
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub membership_type: Option<String>,
    pub start_date: Option<String>,
    pub finish_date: Option<String>,
    pub user_name: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, gym_id: &str, filters: &MembershipFilters) {
    qb.push(" FROM memberships m JOIN users u ON u.id = m.user_id WHERE u.gym_id = ");
    qb.push_bind(gym_id.to_string());

    if let Some(id) = filter_value(&filters.id) {
        qb.push(" AND m.id LIKE ");
        qb.push_bind(like_pattern(id));
    }

    if let Some(user_id) = filter_value(&filters.user_id) {
        qb.push(" AND m.user_id = ");
        qb.push_bind(user_id.to_string());
    }

    if let Some(kind) = filter_value(&filters.membership_type) {
        qb.push(" AND m.type = ");
        qb.push_bind(kind.to_string());
    }

    if let Some(start) = filter_value(&filters.start_date) {
        qb.push(" AND m.start_date = ");
        qb.push_bind(start.to_string());
    }

    if let Some(finish) = filter_value(&filters.finish_date) {
        qb.push(" AND m.finish_date = ");
        qb.push_bind(finish.to_string());
    }

    if let Some(name) = present(&filters.user_name) {
        qb.push(" AND u.name LIKE ");
        qb.push_bind(like_pattern(name));
    }

    if let Some(search) = present(&filters.search) {
        let pattern = like_pattern(search);
        qb.push(" AND (CAST(m.amount AS TEXT) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR CAST(m.discount AS TEXT) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR u.name LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

impl Membership {
    pub async fn list(
        pool: &DbPool,
        gym_id: &str,
        filters: &MembershipFilters,
        config: &PaginationConfig,
    ) -> sqlx::Result<Page<MembershipRow>> {
        let (page, per_page) = resolve_page(filters.page, filters.per_page, config);

        let mut count = QueryBuilder::new("SELECT COUNT(*)");
        push_filters(&mut count, gym_id, filters);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let (limit, offset) = limit_offset(page, per_page);
        let mut select = QueryBuilder::new("SELECT m.*, u.name AS user_name");
        push_filters(&mut select, gym_id, filters);
        select.push(" ORDER BY m.created_at DESC, m.id LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);
        let data = select.build_query_as::<MembershipRow>().fetch_all(pool).await?;

        Ok(Page::new(data, total, page, per_page))
    }

    pub async fn find(pool: &DbPool, id: &str) -> sqlx::Result<Option<Membership>> {
        sqlx::query_as("SELECT * FROM memberships WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Gym of the owning member, for ownership checks.
    pub async fn gym_of(pool: &DbPool, id: &str) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar(
            "SELECT u.gym_id FROM memberships m JOIN users u ON u.id = m.user_id WHERE m.id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn exists_in_gym(pool: &DbPool, id: &str, gym_id: &str) -> sqlx::Result<bool> {
        let exists: (i64,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM memberships m JOIN users u ON u.id = m.user_id \
             WHERE m.id = ? AND u.gym_id = ?)",
        )
        .bind(id)
        .bind(gym_id)
        .fetch_one(pool)
        .await?;
        Ok(exists.0 != 0)
    }

    /// Distinct membership types sold in one gym, for the filter dropdown.
    pub async fn distinct_types(pool: &DbPool, gym_id: &str) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT m.type FROM memberships m JOIN users u ON u.id = m.user_id \
             WHERE u.gym_id = ? ORDER BY m.type",
        )
        .bind(gym_id)
        .fetch_all(pool)
        .await
    }

    /// Memberships of one gym that already have at least one payment,
    /// for the payments filter dropdown.
    pub async fn paid_options(pool: &DbPool, gym_id: &str) -> sqlx::Result<Vec<MembershipRow>> {
        sqlx::query_as(
            "SELECT m.*, u.name AS user_name FROM memberships m \
             JOIN users u ON u.id = m.user_id \
             WHERE u.gym_id = ? AND EXISTS(SELECT 1 FROM payments p WHERE p.membership_id = m.id) \
             ORDER BY u.name, m.created_at DESC",
        )
        .bind(gym_id)
        .fetch_all(pool)
        .await
    }
}
