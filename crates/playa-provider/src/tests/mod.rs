//! Behavioural tests for the data provider.
//!
//! - `favorites.rs`    - favorite toggling and the favorites combination
//! - `search.rs`       - name search across categories
//! - `region.rs`       - map items in a visible region
//! - `events.rs`       - camp/event relations and event lookups
//! - `transactions.rs` - transaction bracketing and deferred notifications
//! - `upgrade.rs`      - the upgrade window
//! - `lifecycle.rs`    - opening from disk, preferences, shared instance

mod favorites;
mod lifecycle;
mod transactions;

use crate::{DataProvider, ProviderResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use futures_util::{Stream, StreamExt};
use playa_database::{Art, Camp, Event, ItemInfo, PlayaItem, UserPoi};
use tokio::time::timeout;

const WAIT: std::time::Duration = std::time::Duration::from_secs(2);
const QUIET: std::time::Duration = std::time::Duration::from_millis(200);

async fn provider() -> DataProvider {
    DataProvider::open_in_memory().await.unwrap()
}

/// The next snapshot, failing the test if none arrives in time.
async fn next<S, T>(stream: &mut S) -> T
where
    S: Stream<Item = ProviderResult<T>> + Unpin,
{
    timeout(WAIT, stream.next())
        .await
        .expect("timed out waiting for snapshot")
        .expect("stream ended")
        .expect("query failed")
}

/// True when the stream stays silent for a short while.
async fn quiet<S: Stream + Unpin>(stream: &mut S) -> bool {
    timeout(QUIET, stream.next()).await.is_err()
}

fn gate_time(hours: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 8, 28, 10, 0, 0).unwrap() + Duration::hours(hours)
}

fn art(name: &str) -> Art {
    Art {
        info: ItemInfo::new(name),
        ..Default::default()
    }
}

fn camp(playa_id: &str, name: &str) -> Camp {
    Camp {
        info: ItemInfo::new(name).with_playa_id(playa_id),
    }
}

fn event(playa_id: &str, name: &str, start: DateTime<Utc>) -> Event {
    Event {
        info: ItemInfo::new(name).with_playa_id(playa_id),
        start_time: start,
        end_time: start + Duration::hours(1),
        ..Default::default()
    }
}

fn poi(name: &str) -> UserPoi {
    UserPoi {
        info: ItemInfo::new(name),
    }
}

fn names(items: &[PlayaItem]) -> Vec<&str> {
    items.iter().map(PlayaItem::name).collect()
}
