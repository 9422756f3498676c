//! # Repository Module
//!
//! Database repository implementations for the Till Engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Calling application                                                   │
//! │       │                                                                 │
//! │       │  db.sessions().close(id, counted, notes, operator)             │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  SessionRepository                                                     │
//! │  ├── BEGIN TRANSACTION                                                 │
//! │  ├── load aggregate rows                                               │
//! │  ├── apply till-core rules (pure, may reject)                          │
//! │  ├── write resulting rows                                              │
//! │  └── COMMIT (or implicit rollback on error)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  One SQL transaction per state transition: a rejected rule or a        │
//! │  failed write leaves the database exactly as it was.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`session::SessionRepository`] - Cash session lifecycle and operation log
//! - [`credit::CreditRepository`] - Credit ledger and repayments
//! - [`sale::SaleRepository`] - Sale records and attribution queries

pub mod credit;
pub mod sale;
pub mod session;
