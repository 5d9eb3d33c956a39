//! Attendance models for members and coaches.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite};

use super::common::{filter_value, like_pattern, limit_offset, present, resolve_page, Page};
use crate::config::PaginationConfig;
use crate::DbPool;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceUser {
    pub id: String,
    pub date: String,
    pub check_in: String,
    pub check_out: Option<String>,
    pub user_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceUserRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub attendance: AttendanceUser,
    pub user_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAttendanceUserRequest {
    pub date: String,
    pub check_in: String,
    pub check_out: Option<String>,
    pub user_id: String,
}

/// Closing an attendance only ever sets the check-out time.
#[derive(Debug, Deserialize)]
pub struct UpdateAttendanceRequest {
    pub check_out: String,
}

/// Recognized list filters, applied in declaration order.
#[derive(Debug, Default, Deserialize)]
pub struct AttendanceUserFilters {
    pub user_name: Option<String>,
    pub date: Option<String>,
    pub user_id: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn push_user_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    gym_id: &str,
    filters: &AttendanceUserFilters,
) {
    qb.push(" FROM attendance_users a JOIN users u ON u.id = a.user_id WHERE u.gym_id = ");
    qb.push_bind(gym_id.to_string());

    if let Some(name) = present(&filters.user_name) {
        qb.push(" AND u.name LIKE ");
        qb.push_bind(like_pattern(name));
    }

    if let Some(date) = filter_value(&filters.date) {
        qb.push(" AND a.date = ");
        qb.push_bind(date.to_string());
    }

    if let Some(user_id) = filter_value(&filters.user_id) {
        qb.push(" AND a.user_id = ");
        qb.push_bind(user_id.to_string());
    }
}

impl AttendanceUser {
    pub async fn list(
        pool: &DbPool,
        gym_id: &str,
        filters: &AttendanceUserFilters,
        config: &PaginationConfig,
    ) -> sqlx::Result<Page<AttendanceUserRow>> {
        let (page, per_page) = resolve_page(filters.page, filters.per_page, config);

        let mut count = QueryBuilder::new("SELECT COUNT(*)");
        push_user_filters(&mut count, gym_id, filters);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let (limit, offset) = limit_offset(page, per_page);
        let mut select = QueryBuilder::new("SELECT a.*, u.name AS user_name");
        push_user_filters(&mut select, gym_id, filters);
        select.push(" ORDER BY a.date DESC, a.check_in DESC, a.id LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);
        let data = select
            .build_query_as::<AttendanceUserRow>()
            .fetch_all(pool)
            .await?;

        Ok(Page::new(data, total, page, per_page))
    }

    pub async fn find(pool: &DbPool, id: &str) -> sqlx::Result<Option<AttendanceUser>> {
        sqlx::query_as("SELECT * FROM attendance_users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Gym of the attending member, for ownership checks.
    pub async fn gym_of(pool: &DbPool, id: &str) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar(
            "SELECT u.gym_id FROM attendance_users a JOIN users u ON u.id = a.user_id \
             WHERE a.id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AttendanceCoach {
    pub id: String,
    pub date: String,
    pub check_in: String,
    pub check_out: Option<String>,
    pub coach_id: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttendanceCoachRow {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub attendance: AttendanceCoach,
    pub coach_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAttendanceCoachRequest {
    pub date: String,
    pub check_in: String,
    pub check_out: Option<String>,
    pub coach_id: String,
}

/// Recognized list filters, applied in declaration order.
#[derive(Debug, Default, Deserialize)]
pub struct AttendanceCoachFilters {
    pub coach_name: Option<String>,
    pub date: Option<String>,
    pub coach_id: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn push_coach_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    gym_id: &str,
    filters: &AttendanceCoachFilters,
) {
    qb.push(" FROM attendance_coaches a JOIN coaches c ON c.id = a.coach_id WHERE c.gym_id = ");
    qb.push_bind(gym_id.to_string());

    if let Some(name) = present(&filters.coach_name) {
        qb.push(" AND c.name LIKE ");
        qb.push_bind(like_pattern(name));
    }

    if let Some(date) = filter_value(&filters.date) {
        qb.push(" AND a.date = ");
        qb.push_bind(date.to_string());
    }

    if let Some(coach_id) = filter_value(&filters.coach_id) {
        qb.push(" AND a.coach_id = ");
        qb.push_bind(coach_id.to_string());
    }
}

impl AttendanceCoach {
    pub async fn list(
        pool: &DbPool,
        gym_id: &str,
        filters: &AttendanceCoachFilters,
        config: &PaginationConfig,
    ) -> sqlx::Result<Page<AttendanceCoachRow>> {
        let (page, per_page) = resolve_page(filters.page, filters.per_page, config);

        let mut count = QueryBuilder::new("SELECT COUNT(*)");
        push_coach_filters(&mut count, gym_id, filters);
        let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

        let (limit, offset) = limit_offset(page, per_page);
        let mut select = QueryBuilder::new("SELECT a.*, c.name AS coach_name");
        push_coach_filters(&mut select, gym_id, filters);
        select.push(" ORDER BY a.date DESC, a.check_in DESC, a.id LIMIT ");
        select.push_bind(limit);
        select.push(" OFFSET ");
        select.push_bind(offset);
        let data = select
            .build_query_as::<AttendanceCoachRow>()
            .fetch_all(pool)
            .await?;

        Ok(Page::new(data, total, page, per_page))
    }

    pub async fn find(pool: &DbPool, id: &str) -> sqlx::Result<Option<AttendanceCoach>> {
        sqlx::query_as("SELECT * FROM attendance_coaches WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn gym_of(pool: &DbPool, id: &str) -> sqlx::Result<Option<String>> {
        sqlx::query_scalar(
            "SELECT c.gym_id FROM attendance_coaches a JOIN coaches c ON c.id = a.coach_id \
             WHERE a.id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing;
    use uuid::Uuid;

    async fn seed_attendance(pool: &DbPool, user_id: &str, date: &str, check_in: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO attendance_users (id, date, check_in, check_out, user_id, created_at, updated_at) \
             VALUES (?, ?, ?, NULL, ?, ?, ?)",
        )
        .bind(&id)
        .bind(date)
        .bind(check_in)
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .expect("seed attendance");
        id
    }

    #[tokio::test]
    async fn test_list_scopes_and_filters_by_date() {
        let pool = testing::pool().await;
        let gym1 = testing::seed_gym(&pool, "Uno").await;
        let gym2 = testing::seed_gym(&pool, "Dos").await;
        let m1 = testing::seed_member(&pool, &gym1, "100001", "Carlos", "Activo").await;
        let m2 = testing::seed_member(&pool, &gym2, "200001", "Lucía", "Activo").await;

        seed_attendance(&pool, &m1, "2025-06-01", "09:00").await;
        seed_attendance(&pool, &m1, "2025-06-02", "08:30").await;
        seed_attendance(&pool, &m2, "2025-06-01", "10:00").await;

        let config = PaginationConfig::default();
        let page = AttendanceUser::list(&pool, &gym1, &AttendanceUserFilters::default(), &config)
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.data.iter().all(|row| row.attendance.user_id == m1));

        let filters = AttendanceUserFilters {
            date: Some("2025-06-01".to_string()),
            ..Default::default()
        };
        let day = AttendanceUser::list(&pool, &gym1, &filters, &config).await.unwrap();
        assert_eq!(day.total, 1);
        assert_eq!(day.data[0].attendance.check_in, "09:00");
        assert_eq!(day.data[0].user_name, "Carlos");
    }
}
