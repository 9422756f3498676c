//! # Credit Repository
//!
//! Database operations for customer credits and repayments.
//!
//! ## Repayment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Repayment (one transaction)                         │
//! │                                                                         │
//! │  record_payment(credit, amount, session?)                              │
//! │  ├── BEGIN                                                             │
//! │  ├── load credit aggregate                                             │
//! │  ├── linked session? load it, must be open                             │
//! │  ├── apply core rules (no overpay, paid is terminal)                   │
//! │  ├── UPDATE credits (remaining, status)                                │
//! │  ├── INSERT credit_payments row                                        │
//! │  ├── linked session? INSERT cash-in operation (money enters drawer)    │
//! │  └── COMMIT                                                            │
//! │                                                                         │
//! │  The credit ledger and the session's drawer move together or not       │
//! │  at all.                                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use till_core::report::credit_aging_report;
use till_core::{Credit, CreditAgingReport, CreditPayment, CreditStatus, Money, TillError};

use super::session::{fetch_session, insert_operation};

/// Repository for credit ledger database operations.
#[derive(Debug, Clone)]
pub struct CreditRepository {
    pool: SqlitePool,
}

impl CreditRepository {
    /// Creates a new CreditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CreditRepository { pool }
    }

    /// Grants a new credit to a customer.
    pub async fn create(
        &self,
        customer_id: &str,
        store_id: &str,
        amount: Money,
        due_at: DateTime<Utc>,
        description: &str,
    ) -> DbResult<Credit> {
        let credit = Credit::create(customer_id, store_id, amount, due_at, description)?;

        debug!(id = %credit.id, customer_id = %customer_id, amount = amount.units(), "Granting credit");

        sqlx::query(
            r#"
            INSERT INTO credits (
                id, customer_id, store_id, original, remaining, status,
                created_at, due_at, description
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&credit.id)
        .bind(&credit.customer_id)
        .bind(&credit.store_id)
        .bind(credit.original)
        .bind(credit.remaining)
        .bind(credit.status)
        .bind(credit.created_at)
        .bind(credit.due_at)
        .bind(&credit.description)
        .execute(&self.pool)
        .await?;

        Ok(credit)
    }

    /// Gets a credit by ID, repayment history included.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Credit>> {
        let mut conn = self.pool.acquire().await?;
        fetch_credit(&mut conn, id).await
    }

    /// Lists a customer's credits, most recent first.
    pub async fn list_by_customer(&self, customer_id: &str) -> DbResult<Vec<Credit>> {
        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM credits WHERE customer_id = ?1 ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        self.fetch_many(ids).await
    }

    /// Lists a store's credits that are overdue at `now`.
    pub async fn list_overdue(&self, store_id: &str, now: DateTime<Utc>) -> DbResult<Vec<Credit>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT id FROM credits
            WHERE store_id = ?1
              AND status IN ('pending', 'partial')
              AND due_at < ?2
            ORDER BY due_at
            "#,
        )
        .bind(store_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        self.fetch_many(ids).await
    }

    /// Records a repayment against a credit.
    ///
    /// When `session_id` is given the payment was taken in cash at that
    /// till: the session must be open, and a matching cash-in operation is
    /// appended to its drawer log in the same transaction.
    pub async fn record_payment(
        &self,
        credit_id: &str,
        amount: Money,
        paid_by: &str,
        session_id: Option<&str>,
        note: Option<String>,
    ) -> DbResult<Credit> {
        let mut tx = self.pool.begin().await?;

        let mut credit = fetch_credit(&mut tx, credit_id)
            .await?
            .ok_or_else(|| DbError::Till(TillError::CreditNotFound(credit_id.to_string())))?;

        let mut session = match session_id {
            Some(sid) => {
                let session = fetch_session(&mut tx, sid)
                    .await?
                    .ok_or_else(|| DbError::Till(TillError::SessionNotFound(sid.to_string())))?;
                if !session.is_open() {
                    return Err(DbError::Till(TillError::SessionClosed(sid.to_string())));
                }
                Some(session)
            }
            None => None,
        };

        let payment = credit
            .record_payment(amount, paid_by, session_id.map(str::to_string), note)?
            .clone();

        let result = sqlx::query(
            r#"
            UPDATE credits SET remaining = ?2, status = ?3
            WHERE id = ?1 AND status != 'paid'
            "#,
        )
        .bind(&credit.id)
        .bind(credit.remaining)
        .bind(credit.status)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Till(TillError::CreditAlreadyPaid(
                credit.id.clone(),
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO credit_payments (
                id, credit_id, amount, paid_by, session_id, paid_at, note
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.credit_id)
        .bind(payment.amount)
        .bind(&payment.paid_by)
        .bind(&payment.session_id)
        .bind(payment.paid_at)
        .bind(&payment.note)
        .execute(&mut *tx)
        .await?;

        // Cash taken at a till lands in that drawer
        if let Some(session) = session.as_mut() {
            let description = format!("Credit repayment {}", credit.id);
            let operation = session
                .record_cash_in(amount, &description, paid_by)?
                .clone();
            insert_operation(&mut tx, &operation).await?;
        }

        tx.commit().await?;

        info!(
            credit_id = %credit.id,
            amount = amount.units(),
            remaining = credit.remaining.units(),
            status = ?credit.status,
            "Credit repayment recorded"
        );
        Ok(credit)
    }

    /// Builds the aging report over a store's credits at `now`.
    pub async fn aging_report(
        &self,
        store_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<CreditAgingReport> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT id FROM credits WHERE store_id = ?1")
                .bind(store_id)
                .fetch_all(&self.pool)
                .await?;

        let credits = self.fetch_many(ids).await?;
        Ok(credit_aging_report(&credits, now))
    }

    async fn fetch_many(&self, ids: Vec<String>) -> DbResult<Vec<Credit>> {
        let mut conn = self.pool.acquire().await?;

        let mut credits = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(credit) = fetch_credit(&mut conn, &id).await? {
                credits.push(credit);
            }
        }

        Ok(credits)
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Loads a credit aggregate: the credit row plus its ordered repayment
/// history.
pub(crate) async fn fetch_credit(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Credit>> {
    let row = sqlx::query(
        r#"
        SELECT id, customer_id, store_id, original, remaining, status,
               created_at, due_at, description
        FROM credits
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut credit = Credit {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        store_id: row.try_get("store_id")?,
        original: row.try_get("original")?,
        remaining: row.try_get("remaining")?,
        status: row.try_get::<CreditStatus, _>("status")?,
        created_at: row.try_get("created_at")?,
        due_at: row.try_get("due_at")?,
        description: row.try_get("description")?,
        payments: Vec::new(),
    };

    let payment_rows = sqlx::query(
        r#"
        SELECT id, credit_id, amount, paid_by, session_id, paid_at, note
        FROM credit_payments
        WHERE credit_id = ?1
        ORDER BY paid_at, rowid
        "#,
    )
    .bind(&credit.id)
    .fetch_all(&mut *conn)
    .await?;

    for payment_row in payment_rows {
        credit.payments.push(CreditPayment {
            id: payment_row.try_get("id")?,
            credit_id: payment_row.try_get("credit_id")?,
            amount: payment_row.try_get("amount")?,
            paid_by: payment_row.try_get("paid_by")?,
            session_id: payment_row.try_get("session_id")?,
            paid_at: payment_row.try_get("paid_at")?,
            note: payment_row.try_get("note")?,
        });
    }

    Ok(Some(credit))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::{Duration, Utc};
    use till_core::{CreditStatus, Money, OperationKind, TillError};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_reload_round_trip() {
        let db = test_db().await;

        let credit = db
            .credits()
            .create(
                "customer-1",
                "store-1",
                Money::from_units(10_000),
                Utc::now() + Duration::days(30),
                "groceries on account",
            )
            .await
            .unwrap();

        let loaded = db.credits().get_by_id(&credit.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CreditStatus::Pending);
        assert_eq!(loaded.remaining.units(), 10_000);
        assert!(loaded.payments.is_empty());
    }

    #[tokio::test]
    async fn test_repayment_lifecycle_persists() {
        let db = test_db().await;
        let credits = db.credits();

        let credit = credits
            .create(
                "customer-1",
                "store-1",
                Money::from_units(10_000),
                Utc::now() + Duration::days(30),
                "",
            )
            .await
            .unwrap();

        let after_first = credits
            .record_payment(&credit.id, Money::from_units(4_000), "maria", None, None)
            .await
            .unwrap();
        assert_eq!(after_first.status, CreditStatus::Partial);
        assert_eq!(after_first.remaining.units(), 6_000);

        let after_second = credits
            .record_payment(&credit.id, Money::from_units(6_000), "maria", None, None)
            .await
            .unwrap();
        assert_eq!(after_second.status, CreditStatus::Paid);

        // Paid is terminal in the database too
        let err = credits
            .record_payment(&credit.id, Money::from_units(1), "maria", None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Till(TillError::CreditAlreadyPaid(_))
        ));

        let loaded = credits.get_by_id(&credit.id).await.unwrap().unwrap();
        assert_eq!(loaded.payments.len(), 2);
    }

    #[tokio::test]
    async fn test_overpayment_leaves_database_unchanged() {
        let db = test_db().await;
        let credits = db.credits();

        let credit = credits
            .create(
                "customer-1",
                "store-1",
                Money::from_units(5_000),
                Utc::now() + Duration::days(30),
                "",
            )
            .await
            .unwrap();

        let err = credits
            .record_payment(&credit.id, Money::from_units(5_001), "maria", None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Till(TillError::AmountExceedsRemaining { .. })
        ));

        let loaded = credits.get_by_id(&credit.id).await.unwrap().unwrap();
        assert_eq!(loaded.remaining.units(), 5_000);
        assert!(loaded.payments.is_empty());
    }

    #[tokio::test]
    async fn test_cash_repayment_lands_in_session_drawer() {
        let db = test_db().await;

        let session = db
            .sessions()
            .open("store-1", Money::from_units(1_000), "maria")
            .await
            .unwrap();

        let credit = db
            .credits()
            .create(
                "customer-1",
                "store-1",
                Money::from_units(3_000),
                Utc::now() + Duration::days(30),
                "",
            )
            .await
            .unwrap();

        db.credits()
            .record_payment(
                &credit.id,
                Money::from_units(2_000),
                "maria",
                Some(&session.id),
                None,
            )
            .await
            .unwrap();

        let loaded = db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
        let cash_in = loaded
            .operations
            .iter()
            .find(|op| op.kind == OperationKind::CashIn)
            .unwrap();
        assert_eq!(cash_in.amount.units(), 2_000);

        let expected = db.sessions().expected_cash(&session.id).await.unwrap();
        assert_eq!(expected.units(), 3_000);
    }

    #[tokio::test]
    async fn test_repayment_rejects_closed_session_link() {
        let db = test_db().await;

        let session = db
            .sessions()
            .open("store-1", Money::zero(), "maria")
            .await
            .unwrap();
        db.sessions()
            .close(&session.id, Money::zero(), None, "maria")
            .await
            .unwrap();

        let credit = db
            .credits()
            .create(
                "customer-1",
                "store-1",
                Money::from_units(3_000),
                Utc::now() + Duration::days(30),
                "",
            )
            .await
            .unwrap();

        let err = db
            .credits()
            .record_payment(
                &credit.id,
                Money::from_units(1_000),
                "maria",
                Some(&session.id),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Till(TillError::SessionClosed(_))));

        // Ledger untouched
        let loaded = db.credits().get_by_id(&credit.id).await.unwrap().unwrap();
        assert_eq!(loaded.remaining.units(), 3_000);
        assert!(loaded.payments.is_empty());
    }

    #[tokio::test]
    async fn test_aging_report_over_store_credits() {
        let db = test_db().await;
        let credits = db.credits();
        let now = Utc::now();

        let paid = credits
            .create("c-1", "store-1", Money::from_units(2_000), now + Duration::days(10), "")
            .await
            .unwrap();
        credits
            .record_payment(&paid.id, Money::from_units(2_000), "maria", None, None)
            .await
            .unwrap();

        credits
            .create("c-2", "store-1", Money::from_units(3_000), now - Duration::days(5), "")
            .await
            .unwrap();

        credits
            .create("c-3", "store-1", Money::from_units(5_000), now + Duration::days(30), "")
            .await
            .unwrap();

        // Another store's credits stay out of the report
        credits
            .create("c-4", "store-2", Money::from_units(9_000), now - Duration::days(1), "")
            .await
            .unwrap();

        let report = credits.aging_report("store-1", now).await.unwrap();
        assert_eq!(report.outstanding_total.units(), 8_000);
        assert_eq!(report.overdue_count, 1);
        assert_eq!(report.overdue_total.units(), 3_000);
        assert_eq!(report.paid_count, 1);

        let overdue = credits.list_overdue("store-1", now).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].customer_id, "c-2");
    }
}
