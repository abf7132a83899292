//! cairn-db - Database layer for Cairn
//!
//! This crate provides the synchronous `Database` trait the migration engine
//! drives, and its DuckDB implementation: DDL rendering for table
//! definitions, parameterised row inserts, the migration log table, and the
//! advisory run lock.

pub mod ddl;
pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{Database, LockAttempt};
