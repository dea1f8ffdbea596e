//! Reactive access to the playa data set.
//!
//! This crate turns the fixed queries of `playa-database` into live result
//! streams and combines them for the screens that show several categories
//! at once.
//!
//! # Architecture
//!
//! - [`live`] - one tokio task per live query, re-running on table changes
//! - [`combine`] - n-ary combine-latest over live queries
//! - [`interceptor`] - query rewriting before each run (location embargo)
//! - [`upgrade`] - the upgrade window and transaction bracketing
//! - [`provider`] - the [`DataProvider`] facade and its process-wide instance
//!
//! ```ignore
//! let provider = DataProvider::instance().await?;
//! let mut favorites = provider.observe_favorites();
//! while let Some(items) = favorites.next().await {
//!     render(items?);
//! }
//! ```

pub mod combine;
mod error;
pub mod interceptor;
pub mod live;
pub mod provider;
pub mod upgrade;

#[cfg(test)]
mod tests;

pub use combine::{combine_latest, concat, CombineLatest};
pub use error::{ProviderError, ProviderResult};
pub use interceptor::{Embargo, Identity, QueryInterceptor};
pub use live::{LiveQuery, LiveQueryEngine, LiveState};
pub use provider::{
    CombinedItems, DataProvider, ItemStream, SharedProvider, BUNDLED_DATABASE_VERSION,
};
pub use upgrade::UpgradeCoordinator;
