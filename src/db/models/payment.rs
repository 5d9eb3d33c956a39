//! Payment model and scoped listing.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::common::{filter_value, like_pattern, limit_offset, present, resolve_page, Page};
use crate::config::PaginationConfig;
use crate::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub id: String,
    pub date: String,
    pub amount: f64,
    pub payment_method: String,
    pub user_id: String,
    pub membership_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Listing row: the payment plus the paying member's name.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PaymentRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub payment: Payment,
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub date: String,
    pub amount: f64,
    pub payment_method: String,
    pub user_id: String,
    pub membership_id: String,
}

/// The membership reference is fixed once a payment exists; updates touch
/// the remaining fields only.
#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub date: String,
    pub amount: f64,
    pub payment_method: String,
    pub user_id: String,
}

/// Recognized list filters, applied in declaration order.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentFilters {
    pub id: Option<String>,
    pub user_id: Option<String>,
    pub payment_method: Option<String>,
    pub date: Option<String>,
    pub membership_id: Option<String>,
    pub user_name: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, gym_id: &str, filters: &PaymentFilters) {
    qb.push(" FROM payments p JOIN users u ON u.id = p.user_id WHERE u.gym_id = ");
    qb.push_bind(gym_id.to_string());

    if let Some(id) = filter_value(&filters.id) {
        qb.push(" AND p.id LIKE ");
        qb.push_bind(like_pattern(id));
    }

    if let Some(user_id) = filter_value(&filters.user_id) {
        qb.push(" AND p.user_id = ");
        qb.push_bind(user_id.to_string());
    }

    if let Some(method) = filter_value(&filters.payment_method) {
        qb.push(" AND p.payment_method = ");
        qb.push_bind(method.to_string());
    }

    if let Some(date) = filter_value(&filters.date) {
        qb.push(" AND p.date = ");
        qb.push_bind(date.to_string());
    }

    if let Some(membership_id) = filter_value(&filters.membership_id) {
        qb.push(" AND p.membership_id = ");
        qb.push_bind(membership_id.to_string());
    }

    if let Some(name) = present(&filters.user_name) {
        qb.push(" AND u.name LIKE ");
        qb.push_bind(like_pattern(name));
    }

    if let Some(search) = present(&filters.search) {
        let pattern = like_pattern(search);
        qb.push(" AND (CAST(p.amount AS TEXT) LIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR u.name LIKE ");
        qb.push_bind(pattern);
        qb.push(")");
    }
}

impl Payment {
    pub async fn list(
        pool: &DbPool,
        gym_id: &str,
        filters: &PaymentFilters,
        config: &PaginationConfig,
    ) -> sqlx::Result<Page<PaymentRow>> {
        let (page, per_page) = resolve_page(filters.page, filters.per_page, config);

        let mut count = QueryBuilder::new("SELECT COUNT(*)");
        push_filters(&mut count, gym_id, filters);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let (limit, offset) = limit_offset(page, per_page);
        let mut select = QueryBuilder::new("SELECT p.*, u.name AS user_name");
        push_filters(&mut select, gym_id, filters);
        select.push(" ORDER BY p.created_at DESC, p.id LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);
        let data = select.build_query_as::<PaymentRow>().fetch_all(pool).await?;

        Ok(Page::new(data, total, page, per_page))
    }

    pub async fn find(pool: &DbPool, id: &str) -> sqlx::Result<Option<Payment>> {
        sqlx::query_as("SELECT * FROM payments WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Gym of the paying member, for ownership checks.
    pub async fn gym_of(pool: &DbPool, id: &str) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar(
            "SELECT u.gym_id FROM payments p JOIN users u ON u.id = p.user_id WHERE p.id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Distinct payment methods used in one gym, for the filter dropdown.
    pub async fn distinct_methods(pool: &DbPool, gym_id: &str) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar(
            "SELECT DISTINCT p.payment_method FROM payments p \
             JOIN users u ON u.id = p.user_id WHERE u.gym_id = ? ORDER BY p.payment_method",
        )
        .bind(gym_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use uuid::Uuid;

    async fn seed_payment(pool: &DbPool, user_id: &str, membership_id: &str, method: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO payments (id, date, amount, payment_method, user_id, membership_id, created_at, updated_at) \
             VALUES (?, '2025-06-01', 50, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(method)
        .bind(user_id)
        .bind(membership_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed payment");
        id
    }

    #[tokio::test]
    async fn test_list_scopes_through_owner_and_filters_by_method() {
        let pool = testing::pool().await;
        let gym1 = testing::seed_gym(&pool, "Uno").await;
        let gym2 = testing::seed_gym(&pool, "Dos").await;
        let m1 = testing::seed_member(&pool, &gym1, "100001", "Carlos", "Activo").await;
        let m2 = testing::seed_member(&pool, &gym2, "200001", "Lucía", "Activo").await;
        let ms1 = testing::seed_membership(&pool, &m1, "Mensual", 50.0).await;
        let ms2 = testing::seed_membership(&pool, &m2, "Mensual", 60.0).await;

        seed_payment(&pool, &m1, &ms1, "Efectivo").await;
        seed_payment(&pool, &m1, &ms1, "Tarjeta").await;
        seed_payment(&pool, &m2, &ms2, "Efectivo").await;

        let config = PaginationConfig::default();
        let page = Payment::list(&pool, &gym1, &PaymentFilters::default(), &config)
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.data.iter().all(|row| row.payment.user_id == m1));

        let filters = PaymentFilters {
            payment_method: Some("Tarjeta".to_string()),
            ..Default::default()
        };
        let card = Payment::list(&pool, &gym1, &filters, &config).await.unwrap();
        assert_eq!(card.total, 1);
        assert_eq!(card.data[0].payment.payment_method, "Tarjeta");

        let methods = Payment::distinct_methods(&pool, &gym1).await.unwrap();
        assert_eq!(methods, vec!["Efectivo".to_string(), "Tarjeta".to_string()]);
    }
}
