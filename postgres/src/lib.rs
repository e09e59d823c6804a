//! `PostgreSQL` record store for the exhibits lifecycle service.
//!
//! This crate provides the production implementation of the
//! [`RecordStore`](exhibits_core::RecordStore) trait from `exhibits-core`:
//!
//! - One table per record kind, created by the embedded migrations
//! - Filters and patches compiled into single `SELECT` / `UPDATE` / `DELETE`
//!   statements, so an edit lock is taken by one conditional update
//! - Content stored as `JSONB` and merged on update
//! - Connection pooling through `sqlx`
//!
//! # Example
//!
//! ```ignore
//! use exhibits_postgres::{PoolConfig, PostgresRecordStore};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresRecordStore::connect("postgres://localhost/exhibits", &PoolConfig::default()).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod sql;
pub mod store;

pub use store::{PoolConfig, PostgresRecordStore};
