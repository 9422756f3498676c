//! # Sale Attribution Resolver
//!
//! Maps externally-recorded sales to the session that was active when
//! they occurred.
//!
//! ## Resolution Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Sale → Session Attribution                          │
//! │                                                                         │
//! │  Sale carries an explicit session_id?                                  │
//! │       │                                                                 │
//! │       ├── YES → attributed iff sale.session_id == session.id           │
//! │       │         (no further checks, time window ignored)               │
//! │       │                                                                 │
//! │       └── NO  → attributed iff same store AND                          │
//! │                 opened_at ≤ occurred_at ≤ (closed_at ?? now)           │
//! │                                                                         │
//! │  Neither rule matches any session → the sale lands in the              │
//! │  `unmatched` bucket, surfaced on the closing report as a warning.      │
//! │  It is never silently dropped and never counted into expected cash.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The resolver is applied independently to every sale and makes no global
//! uniqueness guarantee. The date-window fallback can mis-attribute
//! back-dated entries, so recording surfaces should always stamp the
//! explicit session id; the fallback exists as a degraded-mode
//! reconciliation aid only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{CashSession, SaleRecord};

// =============================================================================
// Resolver
// =============================================================================

/// Does this sale belong to this session?
///
/// Primary rule: an explicit `session_id` on the sale decides alone.
/// Fallback rule: same store and occurred inside the session's open
/// window, using `now` as the window end for still-open sessions.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use till_core::attribution::attribute;
/// use till_core::money::Money;
/// use till_core::types::{CashSession, PaymentMethod, SaleRecord};
///
/// let session = CashSession::open("store-1", Money::zero(), "maria").unwrap();
/// let sale = SaleRecord {
///     id: "sale-1".into(),
///     store_id: "store-1".into(),
///     payment_method: PaymentMethod::Cash,
///     total: Money::from_units(100),
///     occurred_at: Utc::now(),
///     session_id: Some(session.id.clone()),
/// };
/// assert!(attribute(&sale, &session, Utc::now()));
/// ```
pub fn attribute(sale: &SaleRecord, session: &CashSession, now: DateTime<Utc>) -> bool {
    // Primary rule: an explicit reference wins outright, even when the
    // timestamp falls outside the window (back-dated entries).
    if let Some(session_id) = &sale.session_id {
        return *session_id == session.id;
    }

    // Fallback rule: store + open window.
    if sale.store_id != session.store_id {
        return false;
    }

    let window_end = session.closed_at.unwrap_or(now);
    session.opened_at <= sale.occurred_at && sale.occurred_at <= window_end
}

// =============================================================================
// Batch Partition
// =============================================================================

/// A sale set split against one session: the sales that belong to it and
/// the remainder that matched neither rule.
///
/// The `unmatched` bucket is a warning category for the closing report;
/// callers decide remediation (re-stamping, manual adjustment).
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AttributedSales {
    /// Sales attributed to the session.
    pub matched: Vec<SaleRecord>,

    /// Sales that carried no explicit id and fell outside the window,
    /// or explicitly referenced a different session.
    pub unmatched: Vec<SaleRecord>,
}

impl AttributedSales {
    /// Splits `sales` against `session`, applying the resolver to each
    /// sale independently.
    pub fn partition(
        sales: impl IntoIterator<Item = SaleRecord>,
        session: &CashSession,
        now: DateTime<Utc>,
    ) -> Self {
        let mut result = AttributedSales::default();

        for sale in sales {
            if attribute(&sale, session, now) {
                result.matched.push(sale);
            } else {
                result.unmatched.push(sale);
            }
        }

        result
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;
    use crate::types::PaymentMethod;
    use chrono::Duration;

    fn sale_at(
        store_id: &str,
        occurred_at: DateTime<Utc>,
        session_id: Option<String>,
    ) -> SaleRecord {
        SaleRecord {
            id: uuid::Uuid::new_v4().to_string(),
            store_id: store_id.to_string(),
            payment_method: PaymentMethod::Cash,
            total: Money::from_units(100),
            occurred_at,
            session_id,
        }
    }

    #[test]
    fn test_explicit_id_wins_over_window() {
        let session = CashSession::open("store-1", Money::zero(), "maria").unwrap();
        let now = Utc::now();

        // Outside the window and wrong store, yet the explicit id attributes
        let sale = sale_at(
            "store-2",
            session.opened_at - Duration::days(1),
            Some(session.id.clone()),
        );
        assert!(attribute(&sale, &session, now));

        // Explicit id for another session never falls back to the window
        let sale = sale_at("store-1", now, Some("other-session".to_string()));
        assert!(!attribute(&sale, &session, now));
    }

    #[test]
    fn test_window_fallback_requires_same_store() {
        let session = CashSession::open("store-1", Money::zero(), "maria").unwrap();
        let now = Utc::now() + Duration::minutes(2);

        let inside = sale_at("store-1", session.opened_at + Duration::minutes(1), None);
        assert!(attribute(&inside, &session, now));

        let wrong_store = sale_at("store-2", session.opened_at + Duration::minutes(1), None);
        assert!(!attribute(&wrong_store, &session, now));
    }

    #[test]
    fn test_window_fallback_respects_bounds() {
        let mut session = CashSession::open("store-1", Money::zero(), "maria").unwrap();
        let now = Utc::now();

        let before = sale_at("store-1", session.opened_at - Duration::seconds(1), None);
        assert!(!attribute(&before, &session, now));

        // Open session: window end is `now`
        let future = sale_at("store-1", now + Duration::hours(1), None);
        assert!(!attribute(&future, &session, now));

        // Closed session: window end is closed_at
        session
            .close(Money::zero(), None, "maria", &AttributedSales::default())
            .unwrap();
        let closed_at = session.closed_at.unwrap();
        let late = sale_at("store-1", closed_at + Duration::seconds(1), None);
        assert!(!attribute(&late, &session, now + Duration::hours(2)));

        let at_close = sale_at("store-1", closed_at, None);
        assert!(attribute(&at_close, &session, now + Duration::hours(2)));
    }

    #[test]
    fn test_partition_buckets() {
        let session = CashSession::open("store-1", Money::zero(), "maria").unwrap();
        let now = Utc::now() + Duration::minutes(2);

        let sales = vec![
            sale_at("store-1", session.opened_at + Duration::minutes(1), None),
            sale_at("store-1", session.opened_at - Duration::days(1), None),
            sale_at("store-2", now, Some(session.id.clone())),
        ];

        let partitioned = AttributedSales::partition(sales, &session, now);
        assert_eq!(partitioned.matched.len(), 2);
        assert_eq!(partitioned.unmatched.len(), 1);
    }
}
