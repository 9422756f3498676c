//! # Domain Types
//!
//! Core domain types for the cash-session and credit-ledger engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CashSession    │   │ CashOperation   │   │   SaleRecord    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │──►│  session_id     │   │  store_id       │       │
//! │  │  store_id       │   │  kind           │   │  payment_method │       │
//! │  │  opening_amount │   │  amount         │   │  total          │       │
//! │  │  status         │   │  recorded_at    │   │  session_id?    │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │     Credit      │   │ CreditPayment   │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  id (UUID)      │──►│  credit_id      │                             │
//! │  │  original       │   │  amount         │                             │
//! │  │  remaining      │   │  paid_by        │                             │
//! │  │  status, due_at │   │  session_id?    │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each aggregate (`CashSession`, `Credit`) owns its append-only log.
//! `SaleRecord` is a read-only view of an externally-recorded sale; this
//! engine never mutates sales.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Session Status
// =============================================================================

/// Lifecycle status of a cash session.
///
/// A session transitions exactly once, `Open` → `Closed`, and is never
/// deleted: closed sessions are the historical record of the till.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Till is open and accepting operations.
    Open,
    /// Till is reconciled and permanently immutable.
    Closed,
}

// =============================================================================
// Operation Kind
// =============================================================================

/// The kind of a single cash-operation ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// The opening float, appended automatically by `open()`.
    Opening,
    /// Manual cash added to the drawer while the session is open.
    CashIn,
    /// Manual cash removed from the drawer while the session is open.
    CashOut,
    /// The terminal marker appended automatically by `close()`.
    Closing,
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a sale was paid. Only `Cash` sales move money through the drawer;
/// `Credit` sales create a customer credit tracked by the credit ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on an external terminal.
    Card,
    /// Deferred payment (customer credit).
    Credit,
}

// =============================================================================
// Credit Status
// =============================================================================

/// Repayment status of a customer credit.
///
/// Coupled to the remaining balance by invariant:
/// `remaining == original` ⇔ `Pending`, `0 < remaining < original` ⇔
/// `Partial`, `remaining == 0` ⇔ `Paid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CreditStatus {
    /// No repayments yet.
    Pending,
    /// Partially repaid.
    Partial,
    /// Fully repaid; the credit is immutable.
    Paid,
}

// =============================================================================
// Difference Class
// =============================================================================

/// Classification of the reconciliation difference at session close.
///
/// Exact integer comparison, no tolerance band: all amounts are whole
/// currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceClass {
    /// Counted equals expected.
    Balanced,
    /// Counted exceeds expected (difference > 0).
    Surplus,
    /// Counted falls short of expected (difference < 0).
    Shortage,
}

impl DifferenceClass {
    /// Classifies a signed difference (`counted − expected`) by sign/zero.
    pub fn from_difference(difference: Money) -> Self {
        if difference.is_zero() {
            DifferenceClass::Balanced
        } else if difference.is_positive() {
            DifferenceClass::Surplus
        } else {
            DifferenceClass::Shortage
        }
    }
}

// =============================================================================
// Cash Operation
// =============================================================================

/// A single entry in a session's append-only cash-operation log.
///
/// Belongs to exactly one session, inserted only while that session is
/// open, never mutated or removed after insertion.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashOperation {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning session.
    pub session_id: String,

    /// Entry kind (opening / cash-in / cash-out / closing).
    pub kind: OperationKind,

    /// Amount in whole currency units. Strictly positive for cash-in and
    /// cash-out; the opening/closing markers may carry zero.
    pub amount: Money,

    /// Free-text description entered by the operator.
    pub description: String,

    /// Operator identity string (attribution only, not enforcement).
    pub operator: String,

    /// When the entry was appended.
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// Cash Session
// =============================================================================

/// One till's open-to-close working period.
///
/// The aggregate root for the cash side of the engine: it owns its
/// operation log and is the only path through which that log grows.
/// Lifecycle operations live in the [`crate::session`] module.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSession {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Store this till belongs to. At most one session per store may be
    /// open at any time.
    pub store_id: String,

    /// When the session was opened.
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,

    /// Operator who opened the session.
    pub opened_by: String,

    /// Opening float placed in the drawer (≥ 0).
    pub opening_amount: Money,

    /// Lifecycle status.
    pub status: SessionStatus,

    /// When the session was closed (None while open).
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,

    /// Operator who closed the session (None while open).
    pub closed_by: Option<String>,

    /// Physically counted cash at close (None while open).
    pub counted_amount: Option<Money>,

    /// Free-text closing notes.
    pub notes: Option<String>,

    /// Append-only cash-operation log owned by this session.
    pub operations: Vec<CashOperation>,
}

// =============================================================================
// Sale Record
// =============================================================================

/// Read-only view of an externally-recorded sale.
///
/// The surrounding application records sales; this engine only consumes
/// them to attribute drawer movement to a session and to build reports.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleRecord {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Store where the sale happened.
    pub store_id: String,

    /// How the sale was paid.
    pub payment_method: PaymentMethod,

    /// Sale total in whole currency units (> 0).
    pub total: Money,

    /// When the sale occurred.
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,

    /// Explicit session reference, when the recording surface knew the
    /// active session. Preferred over any time-window heuristic.
    pub session_id: Option<String>,
}

// =============================================================================
// Credit Payment
// =============================================================================

/// A single repayment against a credit. Append-only, immutable.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditPayment {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Owning credit.
    pub credit_id: String,

    /// Amount repaid (> 0, ≤ remaining at time of payment).
    pub amount: Money,

    /// Operator who took the payment.
    pub paid_by: String,

    /// Session the repayment was received under, when the caller linked
    /// one (cash repayments land in that session's drawer).
    pub session_id: Option<String>,

    /// When the payment was recorded.
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,

    /// Optional free-text note.
    pub note: Option<String>,
}

// =============================================================================
// Credit
// =============================================================================

/// A deferred-payment balance owed by a customer.
///
/// Created once with `remaining == original`, mutated only by repayments,
/// never deleted, immutable once `Paid`. Lifecycle operations live in the
/// [`crate::credit`] module.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Credit {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Customer who owes the balance.
    pub customer_id: String,

    /// Store where the credit was granted.
    pub store_id: String,

    /// Original amount owed (> 0).
    pub original: Money,

    /// Remaining balance (0 ≤ remaining ≤ original).
    pub remaining: Money,

    /// Repayment status, always consistent with `remaining`.
    pub status: CreditStatus,

    /// When the credit was granted.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the balance falls due. Past due while unpaid ⇒ overdue.
    #[ts(as = "String")]
    pub due_at: DateTime<Utc>,

    /// Free-text description (what was sold on credit).
    pub description: String,

    /// Append-only repayment history owned by this credit.
    pub payments: Vec<CreditPayment>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference_classification_by_sign() {
        assert_eq!(
            DifferenceClass::from_difference(Money::zero()),
            DifferenceClass::Balanced
        );
        assert_eq!(
            DifferenceClass::from_difference(Money::from_units(1)),
            DifferenceClass::Surplus
        );
        assert_eq!(
            DifferenceClass::from_difference(Money::from_units(-1)),
            DifferenceClass::Shortage
        );
    }

    #[test]
    fn test_enum_serde_names() {
        assert_eq!(
            serde_json::to_string(&OperationKind::CashIn).unwrap(),
            "\"cash_in\""
        );
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Card).unwrap(),
            "\"card\""
        );
        assert_eq!(
            serde_json::to_string(&CreditStatus::Partial).unwrap(),
            "\"partial\""
        );
    }
}
