//! Read-only dashboard aggregates over members and payments.
//!
//! All window computations take `now` as a parameter so the date math is
//! testable; handlers pass `Utc::now()`.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::DbPool;

pub const MONTH_NAMES_ES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusCounts {
    pub activos: i64,
    pub inactivos: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct EarningsSummary {
    pub hoy: f64,
    pub mes: f64,
    pub anio: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MonthlyCount {
    pub mes: String,
    pub total: i64,
}

fn day(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn month_start(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn month_bounds(first: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let next = first.checked_add_months(Months::new(1))?;
    Some((first, next.pred_opt()?))
}

/// Calendar window for a named reporting period. Unknown periods (and the
/// `all` default) mean no window.
pub fn period_window(period: &str, now: DateTime<Utc>) -> Option<(NaiveDate, NaiveDate)> {
    let today = now.date_naive();
    match period {
        "today" => Some((today, today)),
        "this_month" => month_bounds(month_start(today.year(), today.month())?),
        "last_month" => {
            month_bounds(month_start(today.year(), today.month())?.checked_sub_months(Months::new(1))?)
        }
        "two_months_ago" => {
            month_bounds(month_start(today.year(), today.month())?.checked_sub_months(Months::new(2))?)
        }
        _ => None,
    }
}

/// Member counts by state, optionally windowed by registration date.
/// State matching is case-insensitive: legacy rows mix "Activo"/"activo".
pub async fn user_status_counts(
    pool: &DbPool,
    window: Option<(NaiveDate, NaiveDate)>,
) -> sqlx::Result<StatusCounts> {
    let row: (i64, i64) = match window {
        Some((from, to)) => {
            sqlx::query_as(
                "SELECT \
                   COALESCE(SUM(LOWER(state) = 'activo'), 0), \
                   COALESCE(SUM(LOWER(state) = 'inactivo'), 0) \
                 FROM users WHERE date(created_at) BETWEEN ? AND ?",
            )
            .bind(day(from))
            .bind(day(to))
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_as(
                "SELECT \
                   COALESCE(SUM(LOWER(state) = 'activo'), 0), \
                   COALESCE(SUM(LOWER(state) = 'inactivo'), 0) \
                 FROM users",
            )
            .fetch_one(pool)
            .await?
        }
    };
    Ok(StatusCounts {
        activos: row.0,
        inactivos: row.1,
    })
}

/// Members registered inside a calendar window.
pub async fn users_registered_between(
    pool: &DbPool,
    from: NaiveDate,
    to: NaiveDate,
) -> sqlx::Result<i64> {
    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE date(created_at) BETWEEN ? AND ?")
            .bind(day(from))
            .bind(day(to))
            .fetch_one(pool)
            .await?;
    Ok(count.0)
}

/// Registration counts grouped by `YYYY-MM` month.
pub async fn users_by_month(pool: &DbPool) -> sqlx::Result<Vec<MonthlyCount>> {
    sqlx::query_as(
        "SELECT strftime('%Y-%m', created_at) AS mes, COUNT(*) AS total \
         FROM users GROUP BY mes ORDER BY mes",
    )
    .fetch_all(pool)
    .await
}

async fn sum_between(pool: &DbPool, from: NaiveDate, to: NaiveDate) -> sqlx::Result<f64> {
    let sum: (f64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0.0) FROM payments WHERE date(created_at) BETWEEN ? AND ?",
    )
    .bind(day(from))
    .bind(day(to))
    .fetch_one(pool)
    .await?;
    Ok(sum.0)
}

/// Earnings today, month-to-date and year-to-date.
pub async fn earnings_summary(pool: &DbPool, now: DateTime<Utc>) -> sqlx::Result<EarningsSummary> {
    let today = now.date_naive();
    let month_start = month_start(today.year(), today.month()).unwrap_or(today);
    let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);

    Ok(EarningsSummary {
        hoy: sum_between(pool, today, today).await?,
        mes: sum_between(pool, month_start, today).await?,
        anio: sum_between(pool, year_start, today).await?,
    })
}

/// Payment totals per month of one year. Months without payments are zero,
/// not omitted, so the panel's chart always has twelve buckets.
pub async fn monthly_payment_totals(pool: &DbPool, year: i32) -> sqlx::Result<[f64; 12]> {
    let rows: Vec<(i64, f64)> = sqlx::query_as(
        "SELECT CAST(strftime('%m', created_at) AS INTEGER) AS mes, COALESCE(SUM(amount), 0.0) \
         FROM payments WHERE strftime('%Y', created_at) = ? GROUP BY mes ORDER BY mes",
    )
    .bind(format!("{:04}", year))
    .fetch_all(pool)
    .await?;

    let mut totals = [0.0; 12];
    for (month, total) in rows {
        if (1..=12).contains(&month) {
            totals[(month - 1) as usize] = total;
        }
    }
    Ok(totals)
}
