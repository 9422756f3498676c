//! # Session/Credit Report Builder
//!
//! Derives the read-only records consumed by external presentation and
//! export collaborators. These two builders are the only sanctioned read
//! surface for dashboards and documents: consumers must not recompute
//! reconciliation logic themselves.
//!
//! ## Report Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Report Flow                                     │
//! │                                                                         │
//! │  close() ──► ClosingReport ──► persistence / printing / export         │
//! │                                                                         │
//! │  credits ──► CreditAgingReport ──► dashboards                          │
//! │                                                                         │
//! │  Both records are immutable snapshots; the engine never persists       │
//! │  them itself.                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::attribution::AttributedSales;
use crate::credit::{outstanding_total, overdue_summary, paid_count};
use crate::money::Money;
use crate::types::{CashOperation, CashSession, Credit, DifferenceClass, PaymentMethod, SaleRecord};

// =============================================================================
// Per-Method Totals
// =============================================================================

/// Sale total and transaction count for one payment method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MethodTotals {
    /// Sum of sale totals.
    pub total: Money,
    /// Number of sales.
    pub count: u32,
}

fn method_totals(sales: &[SaleRecord], method: PaymentMethod) -> MethodTotals {
    sales
        .iter()
        .filter(|s| s.payment_method == method)
        .fold(MethodTotals::default(), |acc, s| MethodTotals {
            total: acc.total + s.total,
            count: acc.count + 1,
        })
}

// =============================================================================
// Closing Report
// =============================================================================

/// Immutable record of one session's reconciliation, emitted by `close()`.
///
/// The sole artifact handed to persistence/export collaborators; the
/// engine does not persist it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ClosingReport {
    /// Session this report reconciles.
    pub session_id: String,

    /// Store the session belonged to.
    pub store_id: String,

    /// When the session opened.
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,

    /// When the session closed.
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,

    /// Operator who closed the session.
    pub closed_by: String,

    /// Opening float.
    pub opening_amount: Money,

    /// Computed expected cash at close.
    pub expected: Money,

    /// Physically counted cash at close.
    pub counted: Money,

    /// `counted − expected`; the only place a negative Money is valid.
    pub difference: Money,

    /// Balanced / surplus / shortage, by exact sign.
    pub classification: DifferenceClass,

    /// Cash sales attributed to the session.
    pub cash_sales: MethodTotals,

    /// Card sales attributed to the session.
    pub card_sales: MethodTotals,

    /// Credit sales attributed to the session.
    pub credit_sales: MethodTotals,

    /// Warning category: sales that matched neither the explicit-id rule
    /// nor the date-window fallback. Excluded from expected cash, never
    /// silently dropped.
    pub unmatched_sales: MethodTotals,

    /// The session's full operation log, opening and closing markers
    /// included.
    pub operations: Vec<CashOperation>,

    /// Caller-supplied closing notes.
    pub notes: Option<String>,
}

impl ClosingReport {
    /// Builds the closing report for a just-closed session.
    ///
    /// Expects `session` to already carry its closing data (counted
    /// amount, closed-at, closed-by); `CashSession::close` is the only
    /// caller in this crate.
    pub fn build(session: &CashSession, sales: &AttributedSales) -> ClosingReport {
        let expected = session.expected_cash(&sales.matched);
        let counted = session.counted_amount.unwrap_or(Money::zero());
        let difference = counted - expected;

        let unmatched = sales
            .unmatched
            .iter()
            .fold(MethodTotals::default(), |acc, s| MethodTotals {
                total: acc.total + s.total,
                count: acc.count + 1,
            });

        ClosingReport {
            session_id: session.id.clone(),
            store_id: session.store_id.clone(),
            opened_at: session.opened_at,
            closed_at: session.closed_at.unwrap_or(session.opened_at),
            closed_by: session.closed_by.clone().unwrap_or_default(),
            opening_amount: session.opening_amount,
            expected,
            counted,
            difference,
            classification: DifferenceClass::from_difference(difference),
            cash_sales: method_totals(&sales.matched, PaymentMethod::Cash),
            card_sales: method_totals(&sales.matched, PaymentMethod::Card),
            credit_sales: method_totals(&sales.matched, PaymentMethod::Credit),
            unmatched_sales: unmatched,
            operations: session.operations.clone(),
            notes: session.notes.clone(),
        }
    }
}

// =============================================================================
// Credit Aging Report
// =============================================================================

/// Outstanding/overdue summary over a credit collection, for dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditAgingReport {
    /// Total remaining balance across unpaid credits.
    pub outstanding_total: Money,

    /// Remaining balance across overdue credits.
    pub overdue_total: Money,

    /// Number of overdue credits.
    pub overdue_count: u32,

    /// Number of fully repaid credits.
    pub paid_count: u32,
}

/// Builds the aging report for a set of credits at `now`.
///
/// Pure reduction, recomputed on demand.
pub fn credit_aging_report<'a>(
    credits: impl IntoIterator<Item = &'a Credit> + Clone,
    now: DateTime<Utc>,
) -> CreditAgingReport {
    let (overdue_count, overdue_total) = overdue_summary(credits.clone(), now);

    CreditAgingReport {
        outstanding_total: outstanding_total(credits.clone()),
        overdue_total,
        overdue_count: overdue_count as u32,
        paid_count: paid_count(credits) as u32,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
