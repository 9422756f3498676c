//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── TillError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  Flow: ValidationError → TillError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (session id, remaining balance, etc.)
//! 3. Errors are enum variants, never String
//! 4. Every rejected operation leaves all aggregates unchanged

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Till Error
// =============================================================================

/// Ledger rule violations.
///
/// Every variant is recoverable by the caller: re-prompt for valid input,
/// or re-fetch the aggregate's current state and retry the correct
/// operation. The engine itself never retries.
#[derive(Debug, Error)]
pub enum TillError {
    /// A supplied monetary value violates a non-negativity or positivity
    /// constraint.
    ///
    /// ## When This Occurs
    /// - Negative opening or counted amount
    /// - Zero or negative cash-in/cash-out amount
    /// - Zero or negative credit or repayment amount
    #[error("Invalid amount {amount} for {field}: {reason}")]
    InvalidAmount {
        field: String,
        amount: Money,
        reason: String,
    },

    /// A session is already open for the store.
    ///
    /// ## When This Occurs
    /// - `open()` called while another session for the same store is open
    ///
    /// The invariant is exactly one open session per store at any time.
    #[error("Store {store_id} already has open session {session_id}")]
    SessionAlreadyOpen {
        store_id: String,
        session_id: String,
    },

    /// The session is closed (or was never opened) and cannot accept the
    /// requested operation.
    ///
    /// ## When This Occurs
    /// - `record_operation()` against a closed session
    /// - `close()` called a second time
    #[error("Session {0} is closed")]
    SessionClosed(String),

    /// Session cannot be found.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Credit cannot be found.
    #[error("Credit not found: {0}")]
    CreditNotFound(String),

    /// The credit is already fully repaid and is immutable.
    #[error("Credit {0} is already paid")]
    CreditAlreadyPaid(String),

    /// A repayment exceeds the credit's remaining balance.
    ///
    /// ## When This Occurs
    /// - `record_payment(amount)` with `amount > remaining`
    ///
    /// Caller should re-fetch the remaining balance before retrying.
    #[error("Payment {amount} exceeds remaining balance {remaining} on credit {credit_id}")]
    AmountExceedsRemaining {
        credit_id: String,
        amount: Money,
        remaining: Money,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when operator input doesn't meet shape requirements
/// (presence, length). Amount sign violations are not shape errors and
/// surface as [`TillError::InvalidAmount`] instead, carrying the value.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with TillError.
pub type TillResult<T> = Result<T, TillError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TillError::AmountExceedsRemaining {
            credit_id: "c-1".to_string(),
            amount: Money::from_units(7000),
            remaining: Money::from_units(6000),
        };
        assert_eq!(
            err.to_string(),
            "Payment 7000 exceeds remaining balance 6000 on credit c-1"
        );

        let err = TillError::SessionClosed("s-1".to_string());
        assert_eq!(err.to_string(), "Session s-1 is closed");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "operator".to_string(),
        };
        assert_eq!(err.to_string(), "operator is required");

        let err = ValidationError::TooLong {
            field: "note".to_string(),
            max: 500,
        };
        assert_eq!(err.to_string(), "note must be at most 500 characters");
    }

    #[test]
    fn test_validation_converts_to_till_error() {
        let validation_err = ValidationError::Required {
            field: "operator".to_string(),
        };
        let till_err: TillError = validation_err.into();
        assert!(matches!(till_err, TillError::Validation(_)));
    }
}
