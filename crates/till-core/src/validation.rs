//! # Validation Module
//!
//! Input validation for the till engine boundary.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Calling application (UI/API)                                 │
//! │  ├── Basic format checks (empty, length)                               │
//! │  └── Immediate operator feedback                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE, called by the lifecycle methods                 │
//! │  ├── Amount sign rules → TillError::InvalidAmount                      │
//! │  └── Operator/note shape → ValidationError                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite, till-db)                                   │
//! │  ├── CHECK constraints on amounts                                      │
//! │  └── Partial unique index: one open session per store                  │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The amount validators produce [`TillError::InvalidAmount`] carrying the
//! offending value; the string validators produce the lighter
//! [`ValidationError`] shape errors. Both feed [`TillResult`] via `?`.

use crate::error::{TillError, TillResult, ValidationError};
use crate::money::Money;
use crate::{MAX_NOTE_LEN, MAX_OPERATOR_LEN};

/// Result type for string-shape validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Amount Validators
// =============================================================================

/// Validates an opening float amount.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (a till may open empty)
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::validation::validate_opening_amount;
///
/// assert!(validate_opening_amount(Money::from_units(50_000)).is_ok());
/// assert!(validate_opening_amount(Money::zero()).is_ok());
/// assert!(validate_opening_amount(Money::from_units(-1)).is_err());
/// ```
pub fn validate_opening_amount(amount: Money) -> TillResult<()> {
    if amount.is_negative() {
        return Err(TillError::InvalidAmount {
            field: "opening amount".to_string(),
            amount,
            reason: "must not be negative".to_string(),
        });
    }

    Ok(())
}

/// Validates a manual cash-in / cash-out amount.
///
/// ## Rules
/// - Must be strictly positive (> 0)
pub fn validate_operation_amount(amount: Money) -> TillResult<()> {
    if !amount.is_positive() {
        return Err(TillError::InvalidAmount {
            field: "operation amount".to_string(),
            amount,
            reason: "must be positive".to_string(),
        });
    }

    Ok(())
}

/// Validates the physically counted amount at close.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (an emptied drawer counts to zero)
pub fn validate_counted_amount(amount: Money) -> TillResult<()> {
    if amount.is_negative() {
        return Err(TillError::InvalidAmount {
            field: "counted amount".to_string(),
            amount,
            reason: "must not be negative".to_string(),
        });
    }

    Ok(())
}

/// Validates a granted credit amount.
///
/// ## Rules
/// - Must be strictly positive (> 0)
pub fn validate_credit_amount(amount: Money) -> TillResult<()> {
    if !amount.is_positive() {
        return Err(TillError::InvalidAmount {
            field: "credit amount".to_string(),
            amount,
            reason: "must be positive".to_string(),
        });
    }

    Ok(())
}

/// Validates a credit repayment amount.
///
/// ## Rules
/// - Must be strictly positive (> 0)
///
/// The not-above-remaining rule needs the credit aggregate and lives in
/// `Credit::record_payment`.
pub fn validate_payment_amount(amount: Money) -> TillResult<()> {
    if !amount.is_positive() {
        return Err(TillError::InvalidAmount {
            field: "payment amount".to_string(),
            amount,
            reason: "must be positive".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an operator identity string.
///
/// The identity is supplied by the authentication collaborator and used
/// purely for attribution/audit, so only shape is checked here.
///
/// ## Rules
/// - Must not be empty
/// - Must be at most 100 characters
pub fn validate_operator(operator: &str) -> ValidationResult<()> {
    let operator = operator.trim();

    if operator.is_empty() {
        return Err(ValidationError::Required {
            field: "operator".to_string(),
        });
    }

    if operator.len() > MAX_OPERATOR_LEN {
        return Err(ValidationError::TooLong {
            field: "operator".to_string(),
            max: MAX_OPERATOR_LEN,
        });
    }

    Ok(())
}

/// Validates a free-text note or description.
///
/// ## Rules
/// - Can be empty
/// - Maximum 500 characters
pub fn validate_note(note: &str) -> ValidationResult<()> {
    if note.len() > MAX_NOTE_LEN {
        return Err(ValidationError::TooLong {
            field: "note".to_string(),
            max: MAX_NOTE_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
