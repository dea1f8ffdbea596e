//! The data provider: the one object consumers talk to.
//!
//! It owns the store, the live query engine and the upgrade coordinator, and
//! exposes every fixed query shape as a live stream. Combined streams merge
//! categories in [`Table`] order: art, camps, events, user points of
//! interest.

use crate::combine::{combine_latest, concat, CombineLatest};
use crate::interceptor::{Embargo, Identity, QueryInterceptor};
use crate::live::{LiveQuery, LiveQueryEngine};
use crate::upgrade::UpgradeCoordinator;
use crate::ProviderResult;
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use playa_config_and_utils::{init_logging, Config, Paths, Preferences};
use playa_database::{
    queries, Art, AsyncDatabase, Camp, DatabaseError, Event, PlayaItem, Region, StoreAdapter,
    Table, UserPoi, CURRENT_VERSION,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Schema version of the database this build ships with.
pub const BUNDLED_DATABASE_VERSION: i64 = CURRENT_VERSION as i64;

/// A live list of items from one category, widened to [`PlayaItem`].
pub type ItemStream = BoxStream<'static, ProviderResult<Vec<PlayaItem>>>;

type MergeItems = fn(&[&Vec<PlayaItem>]) -> Vec<PlayaItem>;

/// Several categories combined into one live list.
pub type CombinedItems = CombineLatest<ItemStream, Vec<PlayaItem>, Vec<PlayaItem>, MergeItems>;

fn items<T>(live: LiveQuery<Vec<T>>) -> ItemStream
where
    T: Into<PlayaItem> + Send + 'static,
{
    live.map(|result| result.map(|rows| rows.into_iter().map(Into::into).collect()))
        .boxed()
}

/// Copy the bundled database into place when none exists yet.
fn stage_bundled_database(config: &Config, db_path: &Path) -> ProviderResult<bool> {
    if db_path.exists() {
        return Ok(false);
    }
    let Some(bundled) = config.bundled_database.as_deref() else {
        return Ok(false);
    };
    if !bundled.exists() {
        warn!(path = %bundled.display(), "Bundled database missing, starting empty");
        return Ok(false);
    }

    std::fs::copy(bundled, db_path)?;
    info!(from = %bundled.display(), to = %db_path.display(), "Staged bundled database");
    Ok(true)
}

/// The festival clock from `config`, or UTC if the offset is out of range.
fn festival_offset(config: &Config) -> FixedOffset {
    let minutes = config.festival_utc_offset_minutes;
    FixedOffset::east_opt(minutes.saturating_mul(60)).unwrap_or_else(|| {
        warn!(minutes, "Festival offset out of range, using UTC");
        Utc.fix()
    })
}

pub struct DataProvider {
    store: StoreAdapter,
    pub(crate) engine: LiveQueryEngine,
    upgrade: UpgradeCoordinator,
    festival_offset: FixedOffset,
}

impl DataProvider {
    /// Open the on-disk database described by `config`.
    ///
    /// Stages the bundled database on first run, applies migrations and
    /// records the installed versions in the preferences file.
    pub async fn open(config: &Config, paths: &Paths) -> ProviderResult<Self> {
        paths.ensure_dirs()?;
        let db_path = paths.database_file(&config.database_name);
        stage_bundled_database(config, &db_path)?;

        let db = AsyncDatabase::open(&db_path).await?;

        let mut preferences = Preferences::load(paths)?;
        preferences.set_versions(BUNDLED_DATABASE_VERSION, config.resources_version);
        preferences.save(paths)?;

        let embargo = Embargo::from_preferences(&preferences);
        info!(
            path = %db_path.display(),
            embargo = embargo.is_active(),
            "Data provider ready"
        );
        Ok(Self::with_database(db, Arc::new(embargo), config))
    }

    /// A provider over a fresh in-memory database with no interceptor.
    pub async fn open_in_memory() -> ProviderResult<Self> {
        let db = AsyncDatabase::open_in_memory().await?;
        Ok(Self::with_database(db, Arc::new(Identity), &Config::default()))
    }

    pub fn with_database(
        db: AsyncDatabase,
        interceptor: Arc<dyn QueryInterceptor>,
        config: &Config,
    ) -> Self {
        let store = StoreAdapter::new(db, config.change_channel_capacity);
        let upgrade = UpgradeCoordinator::new(store.clone());
        let engine = LiveQueryEngine::new(
            store.clone(),
            interceptor,
            upgrade.subscribe(),
            config.live_query_buffer,
        );
        Self {
            store,
            engine,
            upgrade,
            festival_offset: festival_offset(config),
        }
    }

    /// The process-wide provider, opened from `~/.playa` on first use.
    ///
    /// Also installs logging at the configured level if the host has not.
    pub async fn instance() -> ProviderResult<Arc<DataProvider>> {
        static INSTANCE: SharedProvider = SharedProvider::new();

        INSTANCE
            .get_or_try_init(|| async {
                let paths = Paths::new()?;
                let config = Config::load(&paths)?;
                init_logging(&config.log_level);
                Self::open(&config, &paths).await
            })
            .await
    }

    pub fn store(&self) -> &StoreAdapter {
        &self.store
    }

    // ==========================================
    // Art
    // ==========================================

    pub fn observe_art(&self) -> LiveQuery<Vec<Art>> {
        self.engine.observe(queries::all::<Art>())
    }

    pub fn observe_art_favorites(&self) -> LiveQuery<Vec<Art>> {
        self.engine.observe(queries::favorites::<Art>())
    }

    pub fn observe_art_with_audio_tour(&self) -> LiveQuery<Vec<Art>> {
        self.engine.observe(queries::art_with_audio_tour())
    }

    pub fn observe_art_by_name(&self, query: &str) -> LiveQuery<Vec<Art>> {
        self.engine.observe(queries::by_name::<Art>(query))
    }

    pub fn observe_art_by_playa_id(&self, playa_id: &str) -> LiveQuery<Option<Art>> {
        self.engine.observe_one(queries::by_playa_id::<Art>(playa_id))
    }

    pub async fn insert_art(&self, art: Art) -> ProviderResult<i64> {
        Ok(self.store.insert(art).await?)
    }

    pub async fn delete_art(&self) -> ProviderResult<usize> {
        Ok(self.store.clear(Table::Art).await?)
    }

    // ==========================================
    // Camps
    // ==========================================

    pub fn observe_camps(&self) -> LiveQuery<Vec<Camp>> {
        self.engine.observe(queries::all::<Camp>())
    }

    pub fn observe_camp_favorites(&self) -> LiveQuery<Vec<Camp>> {
        self.engine.observe(queries::favorites::<Camp>())
    }

    pub fn observe_camps_by_name(&self, query: &str) -> LiveQuery<Vec<Camp>> {
        self.engine.observe(queries::by_name::<Camp>(query))
    }

    pub fn observe_camp_by_playa_id(&self, playa_id: &str) -> LiveQuery<Option<Camp>> {
        self.engine.observe_one(queries::by_playa_id::<Camp>(playa_id))
    }

    pub async fn insert_camp(&self, camp: Camp) -> ProviderResult<i64> {
        Ok(self.store.insert(camp).await?)
    }

    pub async fn delete_camps(&self) -> ProviderResult<usize> {
        Ok(self.store.clear(Table::Camp).await?)
    }

    /// The camp hosting `event`. A missing or dangling reference gives `None`.
    ///
    /// Waits for any running upgrade to finish first.
    pub async fn camp_for_event(&self, event: &Event) -> ProviderResult<Option<Camp>> {
        let Some(camp_playa_id) = event.camp_playa_id.as_deref() else {
            return Ok(None);
        };
        let camps = self
            .engine
            .fetch(&queries::by_playa_id::<Camp>(camp_playa_id))
            .await?;
        Ok(camps.into_iter().next())
    }

    // ==========================================
    // Events
    // ==========================================

    pub fn observe_events(&self) -> LiveQuery<Vec<Event>> {
        self.engine.observe(queries::all::<Event>())
    }

    pub fn observe_event_favorites(&self) -> LiveQuery<Vec<Event>> {
        self.engine.observe(queries::favorites::<Event>())
    }

    /// Events matching `query`, one per distinct name.
    pub fn observe_events_by_name(&self, query: &str) -> LiveQuery<Vec<Event>> {
        self.engine.observe(queries::events_by_name(query))
    }

    pub fn observe_event_by_playa_id(&self, playa_id: &str) -> LiveQuery<Option<Event>> {
        self.engine.observe_one(queries::by_playa_id::<Event>(playa_id))
    }

    /// Events starting on `day` by the festival's clock, limited to `types`
    /// unless it is empty.
    pub fn observe_events_on_day_of_types(
        &self,
        day: NaiveDate,
        types: &[String],
    ) -> LiveQuery<Vec<Event>> {
        self.engine.observe(queries::events_on_day_of_types(
            day,
            self.festival_offset,
            types,
        ))
    }

    pub fn observe_events_hosted_by_camp(&self, camp: &Camp) -> LiveQuery<Vec<Event>> {
        self.engine
            .observe(queries::events_by_camp_playa_id(camp.info.playa_id.as_deref()))
    }

    pub fn observe_other_occurrences_of_event(&self, event: &Event) -> LiveQuery<Vec<Event>> {
        self.engine.observe(queries::other_occurrences(
            event.info.playa_id.as_deref(),
            event.info.id,
        ))
    }

    pub fn observe_events_between_dates(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> LiveQuery<Vec<Event>> {
        debug!(%start, %end, "Observing events by start time");
        self.engine
            .observe(queries::events_in_date_range(start, end))
    }

    pub async fn insert_event(&self, event: Event) -> ProviderResult<i64> {
        Ok(self.store.insert(event).await?)
    }

    pub async fn delete_events(&self) -> ProviderResult<usize> {
        Ok(self.store.clear(Table::Event).await?)
    }

    // ==========================================
    // User points of interest
    // ==========================================

    pub fn observe_user_pois(&self) -> LiveQuery<Vec<UserPoi>> {
        self.engine.observe(queries::all::<UserPoi>())
    }

    pub fn observe_user_poi_favorites(&self) -> LiveQuery<Vec<UserPoi>> {
        self.engine.observe(queries::favorites::<UserPoi>())
    }

    pub async fn insert_user_poi(&self, poi: UserPoi) -> ProviderResult<i64> {
        Ok(self.store.insert(poi).await?)
    }

    pub async fn delete_user_pois(&self) -> ProviderResult<usize> {
        Ok(self.store.clear(Table::UserPoi).await?)
    }

    // ==========================================
    // Combined
    // ==========================================

    fn combine(&self, inputs: Vec<ItemStream>) -> CombinedItems {
        combine_latest(inputs, concat as MergeItems)
    }

    /// Every favorited item.
    pub fn observe_favorites(&self) -> CombinedItems {
        self.combine(vec![
            items(self.observe_art_favorites()),
            items(self.observe_camp_favorites()),
            items(self.observe_event_favorites()),
            items(self.observe_user_poi_favorites()),
        ])
    }

    /// Art, camps and events whose name contains `query`.
    pub fn observe_name_query(&self, query: &str) -> CombinedItems {
        self.combine(vec![
            items(self.observe_art_by_name(query)),
            items(self.observe_camps_by_name(query)),
            items(self.observe_events_by_name(query)),
        ])
    }

    /// What the map shows for `region`: favorited art and camps, events in
    /// the region or favorited, and every user point of interest.
    pub fn observe_all_map_items_in_visible_region(&self, region: &Region) -> CombinedItems {
        self.combine(vec![
            items(self.observe_art_favorites()),
            items(self.observe_camp_favorites()),
            items(
                self.engine
                    .observe(queries::events_in_region_or_favorite(region)),
            ),
            items(self.observe_user_pois()),
        ])
    }

    /// Favorited art, camps and events plus every user point of interest.
    pub fn observe_user_added_map_items_only(&self) -> CombinedItems {
        self.combine(vec![
            items(self.observe_art_favorites()),
            items(self.observe_camp_favorites()),
            items(self.observe_event_favorites()),
            items(self.observe_user_pois()),
        ])
    }

    // ==========================================
    // Writes
    // ==========================================

    /// Flip the favorite flag of `item` in the store and in place.
    ///
    /// Waits for any running upgrade to finish first.
    pub async fn toggle_favorite(&self, item: &mut PlayaItem) -> ProviderResult<()> {
        self.upgrade.wait_until_idle().await;

        let favorite = !item.is_favorite();
        let id = item.info().id;
        let changed = self.store.set_favorite(item.table(), id, favorite).await?;
        if changed == 0 {
            return Err(DatabaseError::NotFound(format!("{} {id}", item.table())).into());
        }

        item.info_mut().favorite = favorite;
        debug!(name = item.name(), favorite, "Toggled favorite");
        Ok(())
    }

    /// Replace every stored column of `item`.
    ///
    /// Waits for any running upgrade to finish first.
    pub async fn update(&self, item: PlayaItem) -> ProviderResult<()> {
        self.upgrade.wait_until_idle().await;

        let table = item.table();
        let id = item.info().id;
        if self.store.update_item(item).await? == 0 {
            return Err(DatabaseError::NotFound(format!("{table} {id}")).into());
        }
        Ok(())
    }

    /// Clear a category table by name. Unknown names clear nothing.
    pub async fn delete(&self, table: &str) -> ProviderResult<usize> {
        Ok(self.store.clear_table(table).await?)
    }

    // ==========================================
    // Upgrades and transactions
    // ==========================================

    pub fn begin_upgrade(&self) -> ProviderResult<()> {
        self.upgrade.begin_upgrade()
    }

    pub fn end_upgrade(&self) {
        self.upgrade.end_upgrade()
    }

    pub fn is_upgrading(&self) -> bool {
        self.upgrade.is_upgrading()
    }

    pub async fn begin_transaction(&self) -> ProviderResult<()> {
        self.upgrade.begin_transaction().await
    }

    pub fn set_transaction_successful(&self) {
        self.upgrade.set_transaction_successful()
    }

    pub async fn end_transaction(&self) -> ProviderResult<()> {
        self.upgrade.end_transaction().await
    }

    pub fn in_transaction(&self) -> bool {
        self.store.in_transaction()
    }
}

/// A provider built at most once, however many callers race to build it.
pub struct SharedProvider {
    cell: OnceCell<Arc<DataProvider>>,
}

impl SharedProvider {
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::const_new(),
        }
    }

    pub fn get(&self) -> Option<Arc<DataProvider>> {
        self.cell.get().cloned()
    }

    /// Return the provider, building it with `init` if nobody has yet.
    /// Concurrent callers wait for the one build in flight.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> ProviderResult<Arc<DataProvider>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = ProviderResult<DataProvider>>,
    {
        self.cell
            .get_or_try_init(|| async { init().await.map(Arc::new) })
            .await
            .cloned()
    }
}

impl Default for SharedProvider {
    fn default() -> Self {
        Self::new()
    }
}
