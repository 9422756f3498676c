//! # Sale Repository
//!
//! Database operations for sale records and attribution queries.
//!
//! ## Attribution Queries
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Candidate Sales for a Session                          │
//! │                                                                         │
//! │  Sales explicitly stamped with the session id                          │
//! │       +                                                                 │
//! │  Unstamped sales of the same store                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  till-core attribution partitions them:                                │
//! │  matched (expected cash, report totals) vs unmatched (warnings)        │
//! │                                                                         │
//! │  The SQL deliberately over-fetches: the time-window rule lives in      │
//! │  till-core, not in the query.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sales are recorded by the selling surface; this engine only inserts
//! them on its behalf and stamps `session_id` during attribution. Totals
//! and line items stay out of scope.

use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{CashSession, PaymentMethod, SaleRecord};

/// Repository for sale record database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Records a sale.
    pub async fn record(&self, sale: &SaleRecord) -> DbResult<()> {
        debug!(id = %sale.id, store_id = %sale.store_id, total = sale.total.units(), "Recording sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, store_id, payment_method, total, occurred_at, session_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.store_id)
        .bind(sale.payment_method)
        .bind(sale.total)
        .bind(sale.occurred_at)
        .bind(&sale.session_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<SaleRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, store_id, payment_method, total, occurred_at, session_id
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| map_sale(&r)).transpose()
    }

    /// Lists the sales attributed to a session, in order of occurrence.
    pub async fn list_for_session(&self, session_id: &str) -> DbResult<Vec<SaleRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, store_id, payment_method, total, occurred_at, session_id
            FROM sales
            WHERE session_id = ?1
            ORDER BY occurred_at
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_sale).collect()
    }

    /// Lists a store's sales inside a time range, in order of occurrence.
    ///
    /// Read surface for daily summaries and audits.
    pub async fn list_for_store_between(
        &self,
        store_id: &str,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> DbResult<Vec<SaleRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, store_id, payment_method, total, occurred_at, session_id
            FROM sales
            WHERE store_id = ?1 AND occurred_at >= ?2 AND occurred_at <= ?3
            ORDER BY occurred_at
            "#,
        )
        .bind(store_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_sale).collect()
    }

    /// Lists a store's sales that are not attributed to any session.
    ///
    /// These are the rows that would land in the unmatched warning bucket
    /// if a close happened now.
    pub async fn list_unattributed(&self, store_id: &str) -> DbResult<Vec<SaleRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, store_id, payment_method, total, occurred_at, session_id
            FROM sales
            WHERE store_id = ?1 AND session_id IS NULL
            ORDER BY occurred_at
            "#,
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_sale).collect()
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn map_sale(row: &sqlx::sqlite::SqliteRow) -> DbResult<SaleRecord> {
    Ok(SaleRecord {
        id: row.try_get("id")?,
        store_id: row.try_get("store_id")?,
        payment_method: row.try_get::<PaymentMethod, _>("payment_method")?,
        total: row.try_get("total")?,
        occurred_at: row.try_get("occurred_at")?,
        session_id: row.try_get("session_id")?,
    })
}

/// Fetches the candidate sales for one session's attribution pass: the
/// explicitly stamped rows plus the store's unstamped rows.
pub(crate) async fn fetch_candidate_sales(
    conn: &mut SqliteConnection,
    session: &CashSession,
) -> DbResult<Vec<SaleRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT id, store_id, payment_method, total, occurred_at, session_id
        FROM sales
        WHERE session_id = ?1
           OR (store_id = ?2 AND session_id IS NULL)
        ORDER BY occurred_at
        "#,
    )
    .bind(&session.id)
    .bind(&session.store_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_sale).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use till_core::Money;
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sale(store_id: &str, method: PaymentMethod, total: i64) -> SaleRecord {
        SaleRecord {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            payment_method: method,
            total: Money::from_units(total),
            occurred_at: Utc::now(),
            session_id: None,
        }
    }

    #[tokio::test]
    async fn test_record_and_reload_round_trip() {
        let db = test_db().await;
        let sales = db.sales();

        let recorded = sale("store-1", PaymentMethod::Card, 7_500);
        sales.record(&recorded).await.unwrap();

        let loaded = sales.get_by_id(&recorded.id).await.unwrap().unwrap();
        assert_eq!(loaded.payment_method, PaymentMethod::Card);
        assert_eq!(loaded.total.units(), 7_500);
        assert!(loaded.session_id.is_none());
    }

    #[tokio::test]
    async fn test_unattributed_listing() {
        let db = test_db().await;
        let sales = db.sales();

        let session = db
            .sessions()
            .open("store-1", Money::zero(), "maria")
            .await
            .unwrap();

        let mut stamped = sale("store-1", PaymentMethod::Cash, 1_000);
        stamped.session_id = Some(session.id.clone());
        sales.record(&stamped).await.unwrap();
        sales.record(&sale("store-1", PaymentMethod::Cash, 2_000)).await.unwrap();
        sales.record(&sale("store-2", PaymentMethod::Cash, 3_000)).await.unwrap();

        let unattributed = sales.list_unattributed("store-1").await.unwrap();
        assert_eq!(unattributed.len(), 1);
        assert_eq!(unattributed[0].total.units(), 2_000);

        let for_session = sales.list_for_session(&session.id).await.unwrap();
        assert_eq!(for_session.len(), 1);
        assert_eq!(for_session[0].id, stamped.id);
    }

    #[tokio::test]
    async fn test_store_range_listing() {
        let db = test_db().await;
        let sales = db.sales();
        let now = Utc::now();

        sales.record(&sale("store-1", PaymentMethod::Cash, 1_000)).await.unwrap();
        sales.record(&sale("store-1", PaymentMethod::Card, 2_000)).await.unwrap();
        sales.record(&sale("store-2", PaymentMethod::Cash, 3_000)).await.unwrap();

        let today = sales
            .list_for_store_between(
                "store-1",
                now - chrono::Duration::hours(1),
                now + chrono::Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(today.len(), 2);

        let yesterday = sales
            .list_for_store_between(
                "store-1",
                now - chrono::Duration::hours(25),
                now - chrono::Duration::hours(24),
            )
            .await
            .unwrap();
        assert!(yesterday.is_empty());
    }
}
