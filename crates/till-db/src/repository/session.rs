//! # Session Repository
//!
//! Database operations for cash sessions and their operation log.
//!
//! ## Transactional Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                Session State Transitions                                │
//! │                                                                         │
//! │  open(store)                                                           │
//! │  ├── BEGIN                                                             │
//! │  ├── INSERT cash_sessions + opening operation                          │
//! │  │   (unique index rejects a second open per store; the violation      │
//! │  │    maps back to the typed already-open error)                       │
//! │  └── COMMIT                                                            │
//! │                                                                         │
//! │  record_cash_in / record_cash_out                                      │
//! │  ├── BEGIN                                                             │
//! │  ├── load aggregate, apply rule (rejects on closed session)            │
//! │  ├── INSERT cash_operations row                                        │
//! │  └── COMMIT                                                            │
//! │                                                                         │
//! │  close(counted)                                                        │
//! │  ├── BEGIN                                                             │
//! │  ├── load aggregate + candidate sales, partition, reconcile            │
//! │  ├── UPDATE cash_sessions (status/closed_at/counted/notes)             │
//! │  ├── INSERT closing operation                                          │
//! │  ├── UPDATE matched window-fallback sales with the session id          │
//! │  └── COMMIT                                                            │
//! │                                                                         │
//! │  An error anywhere rolls the whole transition back.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use till_core::{
    AttributedSales, CashOperation, CashSession, ClosingReport, Money, OperationKind,
    SessionStatus, TillError,
};

use super::sale::fetch_candidate_sales;

/// Repository for cash session database operations.
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Opens a new session for a store.
    ///
    /// ## Guard
    /// At most one open session per store. The partial unique index on
    /// `cash_sessions` is the authoritative arbiter: a check-then-insert
    /// would race under concurrent opens, so the insert goes straight in
    /// and an index violation is mapped back to
    /// [`TillError::SessionAlreadyOpen`] carrying the blocking session's
    /// id.
    ///
    /// ## Returns
    /// The freshly opened session, opening operation included.
    pub async fn open(
        &self,
        store_id: &str,
        opening_amount: Money,
        operator: &str,
    ) -> DbResult<CashSession> {
        let session = CashSession::open(store_id, opening_amount, operator)?;

        debug!(id = %session.id, store_id = %store_id, "Opening cash session");

        let mut tx = self.pool.begin().await?;

        let insert = sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                id, store_id, opened_at, opened_by, opening_amount, status,
                closed_at, closed_by, counted_amount, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, NULL, NULL)
            "#,
        )
        .bind(&session.id)
        .bind(&session.store_id)
        .bind(session.opened_at)
        .bind(&session.opened_by)
        .bind(session.opening_amount)
        .bind(session.status)
        .execute(&mut *tx)
        .await;

        if let Err(err) = insert {
            let db_err = DbError::from(err);
            if is_open_session_conflict(&db_err) {
                tx.rollback().await?;
                return Err(self.already_open_error(store_id).await?);
            }
            return Err(db_err);
        }

        insert_operation(&mut tx, &session.operations[0]).await?;

        tx.commit().await?;

        info!(id = %session.id, store_id = %store_id, "Cash session opened");
        Ok(session)
    }

    /// Builds the typed already-open error by re-reading the blocking
    /// session's id after the conflicting insert rolled back.
    async fn already_open_error(&self, store_id: &str) -> DbResult<DbError> {
        let session_id: Option<String> =
            sqlx::query_scalar("SELECT id FROM cash_sessions WHERE store_id = ?1 AND status = 'open'")
                .bind(store_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(DbError::Till(TillError::SessionAlreadyOpen {
            store_id: store_id.to_string(),
            // The winner may have closed in the meantime; the conflict
            // itself is still authoritative
            session_id: session_id.unwrap_or_default(),
        }))
    }

    /// Gets a session by ID, operation log included.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let mut conn = self.pool.acquire().await?;
        fetch_session(&mut conn, id).await
    }

    /// Finds the currently open session for a store, if any.
    pub async fn find_open(&self, store_id: &str) -> DbResult<Option<CashSession>> {
        let mut conn = self.pool.acquire().await?;

        let id: Option<String> =
            sqlx::query_scalar("SELECT id FROM cash_sessions WHERE store_id = ?1 AND status = 'open'")
                .bind(store_id)
                .fetch_optional(&mut *conn)
                .await?;

        match id {
            Some(id) => fetch_session(&mut conn, &id).await,
            None => Ok(None),
        }
    }

    /// Lists a store's sessions, most recently opened first.
    pub async fn list_for_store(&self, store_id: &str, limit: i64) -> DbResult<Vec<CashSession>> {
        let mut conn = self.pool.acquire().await?;

        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM cash_sessions WHERE store_id = ?1 ORDER BY opened_at DESC LIMIT ?2",
        )
        .bind(store_id)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(session) = fetch_session(&mut conn, &id).await? {
                sessions.push(session);
            }
        }

        Ok(sessions)
    }

    /// Records manual cash added to the drawer.
    pub async fn record_cash_in(
        &self,
        session_id: &str,
        amount: Money,
        description: &str,
        operator: &str,
    ) -> DbResult<CashOperation> {
        self.record_manual(session_id, OperationKind::CashIn, amount, description, operator)
            .await
    }

    /// Records manual cash removed from the drawer.
    pub async fn record_cash_out(
        &self,
        session_id: &str,
        amount: Money,
        description: &str,
        operator: &str,
    ) -> DbResult<CashOperation> {
        self.record_manual(session_id, OperationKind::CashOut, amount, description, operator)
            .await
    }

    async fn record_manual(
        &self,
        session_id: &str,
        kind: OperationKind,
        amount: Money,
        description: &str,
        operator: &str,
    ) -> DbResult<CashOperation> {
        let mut tx = self.pool.begin().await?;

        let mut session = fetch_session(&mut tx, session_id)
            .await?
            .ok_or_else(|| DbError::not_found("Session", session_id))?;

        let operation = match kind {
            OperationKind::CashIn => session.record_cash_in(amount, description, operator)?,
            OperationKind::CashOut => session.record_cash_out(amount, description, operator)?,
            // Opening/closing markers are appended by open() and close()
            _ => {
                return Err(DbError::Internal(format!(
                    "manual operation cannot have kind {kind:?}"
                )))
            }
        }
        .clone();

        insert_operation(&mut tx, &operation).await?;

        tx.commit().await?;

        debug!(
            session_id = %session_id,
            kind = ?operation.kind,
            amount = operation.amount.units(),
            "Cash operation recorded"
        );
        Ok(operation)
    }

    /// Computes the live expected-cash figure for an open session.
    ///
    /// Read-only: partitions the store's candidate sales against the
    /// session and folds the drawer formula over the matched ones.
    pub async fn expected_cash(&self, session_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;

        let session = fetch_session(&mut conn, session_id)
            .await?
            .ok_or_else(|| DbError::not_found("Session", session_id))?;

        let candidates = fetch_candidate_sales(&mut conn, &session).await?;
        let attributed = AttributedSales::partition(candidates, &session, Utc::now());

        Ok(session.expected_cash(&attributed.matched))
    }

    /// Closes a session and reconciles the drawer.
    ///
    /// ## What This Does (one transaction)
    /// 1. Loads the aggregate and the store's candidate sales
    /// 2. Partitions sales against the session (explicit id, then window)
    /// 3. Applies the core close rules (terminal transition, counted >= 0)
    /// 4. Persists the closed session row and the closing operation
    /// 5. Stamps matched window-fallback sales with the session id so the
    ///    attribution is durable
    ///
    /// ## Returns
    /// The [`ClosingReport`], unmatched-sale warnings included.
    pub async fn close(
        &self,
        session_id: &str,
        counted_amount: Money,
        notes: Option<String>,
        operator: &str,
    ) -> DbResult<ClosingReport> {
        let mut tx = self.pool.begin().await?;

        let mut session = fetch_session(&mut tx, session_id)
            .await?
            .ok_or_else(|| DbError::not_found("Session", session_id))?;

        let candidates = fetch_candidate_sales(&mut tx, &session).await?;
        let attributed = AttributedSales::partition(candidates, &session, Utc::now());

        let report = session.close(counted_amount, notes, operator, &attributed)?;

        let result = sqlx::query(
            r#"
            UPDATE cash_sessions SET
                status = ?2,
                closed_at = ?3,
                closed_by = ?4,
                counted_amount = ?5,
                notes = ?6
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(&session.id)
        .bind(session.status)
        .bind(session.closed_at)
        .bind(&session.closed_by)
        .bind(session.counted_amount)
        .bind(&session.notes)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Till(TillError::SessionClosed(
                session.id.clone(),
            )));
        }

        let closing = session.operations.last().ok_or_else(|| {
            DbError::Internal("closed session has an empty operation log".to_string())
        })?;
        insert_operation(&mut tx, closing).await?;

        // Durable attribution for sales matched by the window fallback
        for sale in attributed.matched.iter().filter(|s| s.session_id.is_none()) {
            sqlx::query("UPDATE sales SET session_id = ?1 WHERE id = ?2")
                .bind(&session.id)
                .bind(&sale.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        info!(
            id = %session.id,
            expected = report.expected.units(),
            counted = report.counted.units(),
            classification = ?report.classification,
            "Cash session closed"
        );
        Ok(report)
    }
}

/// Whether a database error is the one-open-session-per-store index
/// rejecting an insert.
///
/// SQLite names the violated index in the message, which the
/// `From<sqlx::Error>` conversion carries through as the violation field:
/// `index 'idx_sessions_one_open_per_store'`. Column-level uniqueness on
/// the same table would surface as `cash_sessions.<column>`.
fn is_open_session_conflict(err: &DbError) -> bool {
    match err {
        DbError::UniqueViolation { field, .. } => {
            field.contains("idx_sessions_one_open_per_store")
                || field.starts_with("cash_sessions")
        }
        _ => false,
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Loads a session aggregate: the session row plus its ordered operation
/// log.
pub(crate) async fn fetch_session(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<CashSession>> {
    let row = sqlx::query(
        r#"
        SELECT id, store_id, opened_at, opened_by, opening_amount, status,
               closed_at, closed_by, counted_amount, notes
        FROM cash_sessions
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut session = CashSession {
        id: row.try_get("id")?,
        store_id: row.try_get("store_id")?,
        opened_at: row.try_get("opened_at")?,
        opened_by: row.try_get("opened_by")?,
        opening_amount: row.try_get("opening_amount")?,
        status: row.try_get::<SessionStatus, _>("status")?,
        closed_at: row.try_get("closed_at")?,
        closed_by: row.try_get("closed_by")?,
        counted_amount: row.try_get("counted_amount")?,
        notes: row.try_get("notes")?,
        operations: Vec::new(),
    };

    let op_rows = sqlx::query(
        r#"
        SELECT id, session_id, kind, amount, description, operator, recorded_at
        FROM cash_operations
        WHERE session_id = ?1
        ORDER BY recorded_at, rowid
        "#,
    )
    .bind(&session.id)
    .fetch_all(&mut *conn)
    .await?;

    for op_row in op_rows {
        session.operations.push(CashOperation {
            id: op_row.try_get("id")?,
            session_id: op_row.try_get("session_id")?,
            kind: op_row.try_get::<OperationKind, _>("kind")?,
            amount: op_row.try_get("amount")?,
            description: op_row.try_get("description")?,
            operator: op_row.try_get("operator")?,
            recorded_at: op_row.try_get("recorded_at")?,
        });
    }

    Ok(Some(session))
}

/// Inserts one operation-log row.
pub(crate) async fn insert_operation(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    operation: &CashOperation,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cash_operations (
            id, session_id, kind, amount, description, operator, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&operation.id)
    .bind(&operation.session_id)
    .bind(operation.kind)
    .bind(operation.amount)
    .bind(&operation.description)
    .bind(&operation.operator)
    .bind(operation.recorded_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use till_core::{
        DifferenceClass, Money, OperationKind, PaymentMethod, SaleRecord, TillError,
    };
    use uuid::Uuid;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn cash_sale(store_id: &str, total: i64, session_id: Option<String>) -> SaleRecord {
        SaleRecord {
            id: Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            payment_method: PaymentMethod::Cash,
            total: Money::from_units(total),
            occurred_at: Utc::now(),
            session_id,
        }
    }

    #[tokio::test]
    async fn test_open_and_reload_round_trip() {
        let db = test_db().await;

        let session = db
            .sessions()
            .open("store-1", Money::from_units(50_000), "maria")
            .await
            .unwrap();

        let loaded = db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.store_id, "store-1");
        assert_eq!(loaded.opening_amount.units(), 50_000);
        assert_eq!(loaded.operations.len(), 1);
        assert_eq!(loaded.operations[0].kind, OperationKind::Opening);
    }

    #[tokio::test]
    async fn test_one_open_session_per_store() {
        let db = test_db().await;
        let sessions = db.sessions();

        let first = sessions
            .open("store-1", Money::zero(), "maria")
            .await
            .unwrap();

        // The loser's insert hits the unique index and comes back as the
        // typed error naming the session that blocked it
        let err = sessions
            .open("store-1", Money::zero(), "pedro")
            .await
            .unwrap_err();
        match err {
            crate::error::DbError::Till(TillError::SessionAlreadyOpen {
                store_id,
                session_id,
            }) => {
                assert_eq!(store_id, "store-1");
                assert_eq!(session_id, first.id);
            }
            other => panic!("expected SessionAlreadyOpen, got {other:?}"),
        }

        // Another store is unaffected
        sessions.open("store-2", Money::zero(), "pedro").await.unwrap();

        // After closing, the store can open again
        sessions
            .close(&first.id, Money::zero(), None, "maria")
            .await
            .unwrap();
        sessions.open("store-1", Money::zero(), "pedro").await.unwrap();
    }

    #[tokio::test]
    async fn test_operations_persist_and_feed_expected_cash() {
        let db = test_db().await;
        let sessions = db.sessions();

        let session = sessions
            .open("store-1", Money::from_units(50_000), "maria")
            .await
            .unwrap();

        sessions
            .record_cash_in(&session.id, Money::from_units(2_000), "change", "maria")
            .await
            .unwrap();
        sessions
            .record_cash_out(&session.id, Money::from_units(500), "courier", "maria")
            .await
            .unwrap();

        let expected = sessions.expected_cash(&session.id).await.unwrap();
        assert_eq!(expected.units(), 51_500);

        let loaded = sessions.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.operations.len(), 3);
    }

    #[tokio::test]
    async fn test_close_reconciles_and_stamps_sales() {
        let db = test_db().await;
        let sessions = db.sessions();
        let sales = db.sales();

        let session = sessions
            .open("store-1", Money::from_units(10_000), "maria")
            .await
            .unwrap();

        // One explicitly stamped, one relying on the window fallback
        sales
            .record(&cash_sale("store-1", 3_000, Some(session.id.clone())))
            .await
            .unwrap();
        let fallback = cash_sale("store-1", 2_000, None);
        sales.record(&fallback).await.unwrap();

        let report = sessions
            .close(&session.id, Money::from_units(15_000), None, "maria")
            .await
            .unwrap();

        assert_eq!(report.expected.units(), 15_000);
        assert_eq!(report.classification, DifferenceClass::Balanced);
        assert_eq!(report.cash_sales.count, 2);

        // The fallback sale is now durably attributed
        let stamped = sales.get_by_id(&fallback.id).await.unwrap().unwrap();
        assert_eq!(stamped.session_id.as_deref(), Some(session.id.as_str()));

        // The transition is terminal in the database too
        let err = sessions
            .close(&session.id, Money::zero(), None, "maria")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::DbError::Till(TillError::SessionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_operation_rolls_back() {
        let db = test_db().await;
        let sessions = db.sessions();

        let session = sessions
            .open("store-1", Money::from_units(1_000), "maria")
            .await
            .unwrap();
        sessions
            .close(&session.id, Money::from_units(1_000), None, "maria")
            .await
            .unwrap();

        let err = sessions
            .record_cash_in(&session.id, Money::from_units(1), "late", "maria")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::DbError::Till(TillError::SessionClosed(_))
        ));

        // Log unchanged: opening + closing only
        let loaded = sessions.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.operations.len(), 2);
    }
}
