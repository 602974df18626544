//! SQL persistence for meetsync
//!
//! Provides [`DbClient`], an `sqlx::Any` pool built from the `[database]`
//! config section, and [`SqlStore`], the [`meetsync_common::Store`]
//! implementation on top of it. SQLite is enabled by default; build with the
//! `postgres` feature for PostgreSQL.
//!
//! ```rust,no_run
//! use meetsync_config::AppConfig;
//! use meetsync_db::{DbClient, SqlStore};
//!
//! async fn setup(config: &AppConfig) -> Result<SqlStore, meetsync_db::DbError> {
//!     let store = SqlStore::new(DbClient::new(config).await?);
//!     store.init_schema().await?;
//!     Ok(store)
//! }
//! ```

pub mod client;
pub mod error;
pub mod store;

pub use client::{DbClient, DbTransaction};
pub use error::DbError;
pub use store::SqlStore;
