//! SQLite persistence of ledger snapshots.
//!
//! This module provides:
//! - Database initialization and migrations
//! - SQLite pragma configuration
//! - `Repository`, the sqlx implementation of `LedgerStore`

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
