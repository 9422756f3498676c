//! # Credit Ledger
//!
//! Customer credit balances, repayment history, and aging.
//!
//! ## Credit Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Credit Lifecycle                                  │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── Credit::create(amount, due_at) → Pending, remaining = amount   │
//! │                                                                         │
//! │  2. REPAY (one or more times)                                          │
//! │     └── record_payment(4000) → Partial, remaining = 6000               │
//! │     └── record_payment(6000) → Paid,    remaining = 0                  │
//! │                                                                         │
//! │  3. PAID (terminal)                                                    │
//! │     └── record_payment(1)    → Err(CreditAlreadyPaid)                  │
//! │                                                                         │
//! │  Invariants (hold at every point in the history):                      │
//! │  • remaining == original − Σ payment amounts                           │
//! │  • remaining == original   ⇔ Pending                                   │
//! │  • 0 < remaining < original ⇔ Partial                                  │
//! │  • remaining == 0          ⇔ Paid                                      │
//! │  • overdue ⇔ status ∈ {Pending, Partial} AND due_at < now              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A repayment may name the session it was taken under. The ledger only
//! carries that link; whether the repayment also lands in the session's
//! drawer as a cash-in is a payment-method policy decision the caller
//! makes (till-db does it for cash repayments into an open session).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{TillError, TillResult};
use crate::money::Money;
use crate::types::{Credit, CreditPayment, CreditStatus};
use crate::validation::{
    validate_credit_amount, validate_note, validate_operator, validate_payment_amount,
};

impl Credit {
    /// Creates a credit with `remaining = original = amount`.
    ///
    /// ## Failure
    /// - [`TillError::InvalidAmount`] if `amount <= 0`
    pub fn create(
        customer_id: &str,
        store_id: &str,
        amount: Money,
        due_at: DateTime<Utc>,
        description: &str,
    ) -> TillResult<Credit> {
        validate_credit_amount(amount)?;
        validate_note(description)?;

        Ok(Credit {
            id: Uuid::new_v4().to_string(),
            customer_id: customer_id.to_string(),
            store_id: store_id.to_string(),
            original: amount,
            remaining: amount,
            status: CreditStatus::Pending,
            created_at: Utc::now(),
            due_at,
            description: description.to_string(),
            payments: Vec::new(),
        })
    }

    /// Records a repayment against this credit.
    ///
    /// Appends the payment, reduces the remaining balance and recomputes
    /// the status. All precondition checks happen before any mutation, so
    /// a rejected call leaves the aggregate unchanged.
    ///
    /// ## Failure
    /// - [`TillError::CreditAlreadyPaid`] if the credit is `Paid`
    /// - [`TillError::InvalidAmount`] if `amount <= 0`
    /// - [`TillError::AmountExceedsRemaining`] if `amount > remaining`
    pub fn record_payment(
        &mut self,
        amount: Money,
        paid_by: &str,
        session_id: Option<String>,
        note: Option<String>,
    ) -> TillResult<&CreditPayment> {
        if self.status == CreditStatus::Paid {
            return Err(TillError::CreditAlreadyPaid(self.id.clone()));
        }

        validate_payment_amount(amount)?;

        if amount > self.remaining {
            return Err(TillError::AmountExceedsRemaining {
                credit_id: self.id.clone(),
                amount,
                remaining: self.remaining,
            });
        }

        validate_operator(paid_by)?;
        if let Some(n) = &note {
            validate_note(n)?;
        }

        self.payments.push(CreditPayment {
            id: Uuid::new_v4().to_string(),
            credit_id: self.id.clone(),
            amount,
            paid_by: paid_by.trim().to_string(),
            session_id,
            paid_at: Utc::now(),
            note,
        });

        self.remaining -= amount;
        self.status = if self.remaining.is_zero() {
            CreditStatus::Paid
        } else {
            CreditStatus::Partial
        };

        Ok(&self.payments[self.payments.len() - 1])
    }

    /// Whether this credit is overdue at `now`.
    ///
    /// Pure predicate: unpaid (pending or partial) and past its due date.
    /// A paid credit is never overdue, regardless of when it was settled.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, CreditStatus::Pending | CreditStatus::Partial) && self.due_at < now
    }
}

// =============================================================================
// Aggregate Queries
// =============================================================================
// Pure reductions over a credit collection, recomputed on demand rather
// than cached, to avoid staleness.

/// Total remaining balance across unpaid credits.
pub fn outstanding_total<'a>(credits: impl IntoIterator<Item = &'a Credit>) -> Money {
    credits.into_iter().map(|c| c.remaining).sum()
}

/// Count and remaining total of credits overdue at `now`.
pub fn overdue_summary<'a>(
    credits: impl IntoIterator<Item = &'a Credit>,
    now: DateTime<Utc>,
) -> (usize, Money) {
    credits
        .into_iter()
        .filter(|c| c.is_overdue(now))
        .fold((0, Money::zero()), |(count, total), c| {
            (count + 1, total + c.remaining)
        })
}

/// Number of fully repaid credits.
pub fn paid_count<'a>(credits: impl IntoIterator<Item = &'a Credit>) -> usize {
    credits
        .into_iter()
        .filter(|c| c.status == CreditStatus::Paid)
        .count()
}

// =============================================================================
// Unit Tests
// =============================================================================
