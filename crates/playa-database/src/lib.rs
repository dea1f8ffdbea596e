//! SQLite storage for art, camps, events and user points of interest.
//!
//! This crate provides:
//! - Async SQLite executor with a dedicated thread
//! - Schema migrations
//! - Model types for every category table
//! - The fixed catalog of query shapes
//! - A store adapter with explicit transactions and change notifications
//!
//! # Architecture
//!
//! All SQL runs on the single thread owned by [`AsyncDatabase`]. Statements
//! are sent through a channel and executed in FIFO order, so the executor is
//! the only place where SQL execution is serialized.
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let store = StoreAdapter::new(db, DEFAULT_CHANGE_CAPACITY);
//! let camps = store.run_query(queries::all::<Camp>()).await?;
//! ```
//!
//! **Important**: only SQL and row mapping should run inside `db.call()`.
//! Anything slower holds up every other query.

mod error;
mod executor;
mod migrations;
mod models;
pub mod queries;
mod record;
mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::*;
pub use queries::Query;
pub use record::{PlayaRecord, LOCATION_COLUMNS};
pub use store::{ChangeEvent, ChangeListener, StoreAdapter, DEFAULT_CHANGE_CAPACITY};
