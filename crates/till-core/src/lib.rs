//! # till-core: Pure Business Logic for the Till Engine
//!
//! This crate is the **heart** of the Till Engine. It contains the cash
//! session and credit ledger rules as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Engine Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Calling Application (UI / API)                    │   │
//! │  │    open session ──► record ops ──► close ──► reports           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ till-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌───────────┐ ┌──────────────┐    │   │
//! │  │   │ session  │ │  credit  │ │attribution│ │    report    │    │   │
//! │  │   │  open/   │ │ ledger + │ │ sale ──►  │ │  closing +   │    │   │
//! │  │   │ op/close │ │  aging   │ │  session  │ │ credit aging │    │   │
//! │  │   └──────────┘ └──────────┘ └───────────┘ └──────────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CashSession, CashOperation, Credit, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input shape validation
//! - [`session`] - Session lifecycle: open, record operations, close
//! - [`attribution`] - Sale to session resolution
//! - [`credit`] - Credit ledger: repayments, status, overdue aging
//! - [`report`] - Closing report and credit aging report builders
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic given its inputs
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are whole currency units (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **Append-Only Log**: Cash operations are appended, never edited
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::attribution::AttributedSales;
//! use till_core::money::Money;
//! use till_core::types::{CashSession, DifferenceClass};
//!
//! // Open with a 50,000-unit float, take 2,000 in and 500 out
//! let mut session = CashSession::open("store-1", Money::from_units(50_000), "maria").unwrap();
//! session.record_cash_in(Money::from_units(2_000), "supplier refund", "maria").unwrap();
//! session.record_cash_out(Money::from_units(500), "courier", "maria").unwrap();
//!
//! // Count the drawer and close
//! let report = session
//!     .close(Money::from_units(51_500), None, "maria", &AttributedSales::default())
//!     .unwrap();
//!
//! assert_eq!(report.difference, Money::zero());
//! assert_eq!(report.classification, DifferenceClass::Balanced);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod attribution;
pub mod credit;
pub mod error;
pub mod money;
pub mod report;
pub mod session;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use till_core::Money` instead of
// `use till_core::money::Money`

pub use attribution::AttributedSales;
pub use error::{TillError, TillResult, ValidationError};
pub use money::Money;
pub use report::{ClosingReport, CreditAgingReport, MethodTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of an operator identity string
///
/// ## Business Reason
/// Operator identities come from the calling application's auth layer and
/// are stored on every operation for audit. The cap keeps audit rows and
/// printed reports bounded.
pub const MAX_OPERATOR_LEN: usize = 100;

/// Maximum length of a free-text note or description
///
/// ## Business Reason
/// Notes appear on closing reports and printed documents; anything longer
/// belongs in an external document, not the operation log.
pub const MAX_NOTE_LEN: usize = 500;
