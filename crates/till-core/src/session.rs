//! # Cash Session State Machine
//!
//! Lifecycle and reconciliation logic for one till's working period.
//!
//! ## Session Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session Lifecycle                                  │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── CashSession::open() → status Open                              │
//! │         └── appends the Opening operation (the float)                  │
//! │                                                                         │
//! │  2. OPERATE                                                            │
//! │     └── record_cash_in()  → appends CashIn                             │
//! │     └── record_cash_out() → appends CashOut                            │
//! │     └── expected_cash()   → live drawer estimate (read-only)           │
//! │                                                                         │
//! │  3. CLOSE (terminal, exactly once)                                     │
//! │     └── close() → computes expected, difference, classification        │
//! │         └── appends the Closing operation                              │
//! │         └── emits an immutable ClosingReport                           │
//! │                                                                         │
//! │  A closed session rejects every further mutation with SessionClosed.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reconciliation Formula
//! ```text
//! expected = opening
//!          + Σ cash-method sale totals attributed to this session
//!          + Σ cash-in amounts
//!          − Σ cash-out amounts
//!
//! difference = counted − expected
//! ```
//! Exact integer arithmetic; the balanced/surplus/shortage classification
//! is by sign alone, with no tolerance band.

use chrono::Utc;
use uuid::Uuid;

use crate::attribution::AttributedSales;
use crate::error::{TillError, TillResult};
use crate::money::Money;
use crate::report::ClosingReport;
use crate::types::{
    CashOperation, CashSession, OperationKind, PaymentMethod, SaleRecord, SessionStatus,
};
use crate::validation::{
    validate_counted_amount, validate_note, validate_opening_amount, validate_operation_amount,
    validate_operator,
};

impl CashSession {
    /// Opens a new cash session for a store.
    ///
    /// Appends the `Opening` operation carrying the float, so the ledger
    /// is never empty while a session exists.
    ///
    /// ## Preconditions
    /// - `opening_amount >= 0`
    /// - No session for the store is currently open. This spans *all*
    ///   sessions of the store, so it cannot be checked on a single
    ///   aggregate: the store-scoped guard lives in the repository
    ///   ([`SessionAlreadyOpen`](TillError::SessionAlreadyOpen) is raised
    ///   there).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    /// use till_core::types::CashSession;
    ///
    /// let session = CashSession::open("store-1", Money::from_units(50_000), "maria").unwrap();
    /// assert_eq!(session.operations.len(), 1);
    /// ```
    pub fn open(store_id: &str, opening_amount: Money, operator: &str) -> TillResult<CashSession> {
        validate_opening_amount(opening_amount)?;
        validate_operator(operator)?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let opening = CashOperation {
            id: Uuid::new_v4().to_string(),
            session_id: id.clone(),
            kind: OperationKind::Opening,
            amount: opening_amount,
            description: "Opening float".to_string(),
            operator: operator.trim().to_string(),
            recorded_at: now,
        };

        Ok(CashSession {
            id,
            store_id: store_id.to_string(),
            opened_at: now,
            opened_by: operator.trim().to_string(),
            opening_amount,
            status: SessionStatus::Open,
            closed_at: None,
            closed_by: None,
            counted_amount: None,
            notes: None,
            operations: vec![opening],
        })
    }

    /// Whether the session is still open.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Records manual cash added to the drawer.
    ///
    /// ## Failure
    /// - [`TillError::SessionClosed`] if the session is not open
    /// - [`TillError::InvalidAmount`] if `amount <= 0`
    pub fn record_cash_in(
        &mut self,
        amount: Money,
        description: &str,
        operator: &str,
    ) -> TillResult<&CashOperation> {
        self.append_manual(OperationKind::CashIn, amount, description, operator)
    }

    /// Records manual cash removed from the drawer.
    ///
    /// ## Failure
    /// - [`TillError::SessionClosed`] if the session is not open
    /// - [`TillError::InvalidAmount`] if `amount <= 0`
    pub fn record_cash_out(
        &mut self,
        amount: Money,
        description: &str,
        operator: &str,
    ) -> TillResult<&CashOperation> {
        self.append_manual(OperationKind::CashOut, amount, description, operator)
    }

    /// Appends a manual ledger entry. All precondition checks happen
    /// before any mutation, so a rejected call leaves the log unchanged.
    fn append_manual(
        &mut self,
        kind: OperationKind,
        amount: Money,
        description: &str,
        operator: &str,
    ) -> TillResult<&CashOperation> {
        if !self.is_open() {
            return Err(TillError::SessionClosed(self.id.clone()));
        }

        validate_operation_amount(amount)?;
        validate_operator(operator)?;
        validate_note(description)?;

        self.operations.push(CashOperation {
            id: Uuid::new_v4().to_string(),
            session_id: self.id.clone(),
            kind,
            amount,
            description: description.to_string(),
            operator: operator.trim().to_string(),
            recorded_at: Utc::now(),
        });

        Ok(&self.operations[self.operations.len() - 1])
    }

    /// Computes the cash expected in the drawer right now.
    ///
    /// Pure function over the session's own log and the cash-method sales
    /// attributed to it. Callable at any time while the session is open
    /// (live display) and at close time (reconciliation) with identical
    /// semantics.
    ///
    /// Card and credit sales never touch the drawer, so only
    /// [`PaymentMethod::Cash`] totals enter the sum.
    pub fn expected_cash(&self, attributed_sales: &[SaleRecord]) -> Money {
        let cash_sales: Money = attributed_sales
            .iter()
            .filter(|s| s.payment_method == PaymentMethod::Cash)
            .map(|s| s.total)
            .sum();

        let cash_in: Money = self
            .operations
            .iter()
            .filter(|op| op.kind == OperationKind::CashIn)
            .map(|op| op.amount)
            .sum();

        let cash_out: Money = self
            .operations
            .iter()
            .filter(|op| op.kind == OperationKind::CashOut)
            .map(|op| op.amount)
            .sum();

        self.opening_amount + cash_sales + cash_in - cash_out
    }

    /// Closes the session and reconciles the drawer.
    ///
    /// ## What This Does
    /// 1. Computes `expected` via [`expected_cash`](Self::expected_cash)
    ///    over the matched sales
    /// 2. Computes `difference = counted − expected` and classifies it
    /// 3. Transitions `Open` → `Closed`, records who/when/counted
    /// 4. Appends the terminal `Closing` operation carrying the counted
    ///    amount
    /// 5. Emits the immutable [`ClosingReport`] for the caller to persist
    ///
    /// ## Failure
    /// - [`TillError::SessionClosed`] if already closed (the stored
    ///   closing data from the first close is left untouched)
    /// - [`TillError::InvalidAmount`] if `counted_amount < 0`
    pub fn close(
        &mut self,
        counted_amount: Money,
        notes: Option<String>,
        operator: &str,
        sales: &AttributedSales,
    ) -> TillResult<ClosingReport> {
        if !self.is_open() {
            return Err(TillError::SessionClosed(self.id.clone()));
        }

        validate_counted_amount(counted_amount)?;
        validate_operator(operator)?;
        if let Some(n) = &notes {
            validate_note(n)?;
        }

        let now = Utc::now();

        self.status = SessionStatus::Closed;
        self.closed_at = Some(now);
        self.closed_by = Some(operator.trim().to_string());
        self.counted_amount = Some(counted_amount);
        self.notes = notes;

        self.operations.push(CashOperation {
            id: Uuid::new_v4().to_string(),
            session_id: self.id.clone(),
            kind: OperationKind::Closing,
            amount: counted_amount,
            description: "Closing count".to_string(),
            operator: operator.trim().to_string(),
            recorded_at: now,
        });

        Ok(ClosingReport::build(self, sales))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DifferenceClass;
    use chrono::Duration;

    fn cash_sale(session: &CashSession, total: i64) -> SaleRecord {
        SaleRecord {
            id: Uuid::new_v4().to_string(),
            store_id: session.store_id.clone(),
            payment_method: PaymentMethod::Cash,
            total: Money::from_units(total),
            occurred_at: session.opened_at + Duration::minutes(5),
            session_id: Some(session.id.clone()),
        }
    }

    #[test]
    fn test_open_appends_opening_operation() {
        let session = CashSession::open("store-1", Money::from_units(50_000), "maria").unwrap();

        assert!(session.is_open());
        assert_eq!(session.operations.len(), 1);
        assert_eq!(session.operations[0].kind, OperationKind::Opening);
        assert_eq!(session.operations[0].amount.units(), 50_000);
        assert!(session.closed_at.is_none());
    }

    #[test]
    fn test_open_rejects_negative_float() {
        let result = CashSession::open("store-1", Money::from_units(-1), "maria");
        assert!(result.is_err());
    }

    #[test]
    fn test_record_operation_requires_positive_amount() {
        let mut session = CashSession::open("store-1", Money::zero(), "maria").unwrap();

        let err = session
            .record_cash_in(Money::zero(), "petty cash", "maria")
            .unwrap_err();
        assert!(matches!(err, TillError::InvalidAmount { .. }));

        // Rejected call left the log unchanged
        assert_eq!(session.operations.len(), 1);
    }

    #[test]
    fn test_returned_entry_is_the_appended_one() {
        let mut session = CashSession::open("store-1", Money::zero(), "maria").unwrap();
        let operation = session
            .record_cash_in(Money::from_units(250), "float top-up", "maria")
            .unwrap()
            .clone();

        assert_eq!(operation.kind, OperationKind::CashIn);
        assert_eq!(operation.amount.units(), 250);
        assert_eq!(operation.id, session.operations.last().unwrap().id);
    }

    #[test]
    fn test_round_trip_reconciliation_balanced() {
        // open(50000) → cash-in 2000 → cash-out 500 → close(51500)
        let mut session = CashSession::open("store-1", Money::from_units(50_000), "maria").unwrap();
        session
            .record_cash_in(Money::from_units(2_000), "change from safe", "maria")
            .unwrap();
        session
            .record_cash_out(Money::from_units(500), "courier tip", "maria")
            .unwrap();

        let sales = AttributedSales::default();
        assert_eq!(session.expected_cash(&sales.matched).units(), 51_500);

        let report = session
            .close(Money::from_units(51_500), None, "maria", &sales)
            .unwrap();

        assert_eq!(report.expected.units(), 51_500);
        assert_eq!(report.difference.units(), 0);
        assert_eq!(report.classification, DifferenceClass::Balanced);
        assert_eq!(session.status, SessionStatus::Closed);
    }

    #[test]
    fn test_expected_cash_counts_only_cash_sales() {
        let session = CashSession::open("store-1", Money::from_units(1_000), "maria").unwrap();

        let mut card_sale = cash_sale(&session, 9_999);
        card_sale.payment_method = PaymentMethod::Card;
        let mut credit_sale = cash_sale(&session, 5_000);
        credit_sale.payment_method = PaymentMethod::Credit;

        let sales = vec![cash_sale(&session, 2_500), card_sale, credit_sale];

        assert_eq!(session.expected_cash(&sales).units(), 3_500);
    }

    #[test]
    fn test_close_shortage_and_surplus_classification() {
        let mut short = CashSession::open("store-1", Money::from_units(1_000), "maria").unwrap();
        let report = short
            .close(Money::from_units(900), None, "maria", &AttributedSales::default())
            .unwrap();
        assert_eq!(report.difference.units(), -100);
        assert_eq!(report.classification, DifferenceClass::Shortage);

        let mut over = CashSession::open("store-2", Money::from_units(1_000), "maria").unwrap();
        let report = over
            .close(Money::from_units(1_050), None, "maria", &AttributedSales::default())
            .unwrap();
        assert_eq!(report.difference.units(), 50);
        assert_eq!(report.classification, DifferenceClass::Surplus);
    }

    #[test]
    fn test_close_is_terminal() {
        let mut session = CashSession::open("store-1", Money::from_units(1_000), "maria").unwrap();
        let sales = AttributedSales::default();

        session
            .close(Money::from_units(1_000), Some("all good".into()), "maria", &sales)
            .unwrap();
        let first_closed_at = session.closed_at;
        let first_counted = session.counted_amount;

        // Second close is rejected and the stored closing data is unchanged
        let err = session
            .close(Money::from_units(999), None, "pedro", &sales)
            .unwrap_err();
        assert!(matches!(err, TillError::SessionClosed(_)));
        assert_eq!(session.closed_at, first_closed_at);
        assert_eq!(session.counted_amount, first_counted);
        assert_eq!(session.closed_by.as_deref(), Some("maria"));

        // And so is any further operation
        let err = session
            .record_cash_in(Money::from_units(1), "late", "maria")
            .unwrap_err();
        assert!(matches!(err, TillError::SessionClosed(_)));
    }

    #[test]
    fn test_close_rejects_negative_count() {
        let mut session = CashSession::open("store-1", Money::from_units(1_000), "maria").unwrap();
        let err = session
            .close(Money::from_units(-1), None, "maria", &AttributedSales::default())
            .unwrap_err();
        assert!(matches!(err, TillError::InvalidAmount { .. }));
        assert!(session.is_open());
    }

    #[test]
    fn test_closing_operation_carries_counted_amount() {
        let mut session = CashSession::open("store-1", Money::from_units(1_000), "maria").unwrap();
        session
            .close(Money::from_units(1_200), None, "maria", &AttributedSales::default())
            .unwrap();

        let last = session.operations.last().unwrap();
        assert_eq!(last.kind, OperationKind::Closing);
        assert_eq!(last.amount.units(), 1_200);
    }
}
