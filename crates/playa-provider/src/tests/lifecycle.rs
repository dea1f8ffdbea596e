//! Opening from disk, preferences and the shared instance.

use super::*;
use crate::{SharedProvider, BUNDLED_DATABASE_VERSION};
use playa_config_and_utils::{Config, Paths, Preferences};
use playa_database::{AsyncDatabase, StoreAdapter, DEFAULT_CHANGE_CAPACITY};
use std::sync::Arc;
use tempfile::tempdir;

fn located_art(name: &str) -> Art {
    Art {
        info: ItemInfo::new(name).with_location(40.78, -119.21),
        ..Default::default()
    }
}

#[tokio::test]
async fn open_records_installed_versions() {
    let dir = tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());

    let config = Config {
        resources_version: 1_472_093_065_000,
        ..Config::default()
    };

    let _provider = DataProvider::open(&config, &paths).await.unwrap();

    let preferences = Preferences::load(&paths).unwrap();
    assert_eq!(preferences.database_version, BUNDLED_DATABASE_VERSION);
    assert_eq!(preferences.resources_version, 1_472_093_065_000);
    assert!(paths.database_file(&Config::default().database_name).exists());
}

#[tokio::test]
async fn embargo_hides_locations_until_unlocked() {
    let dir = tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());
    let config = Config::default();

    {
        let provider = DataProvider::open(&config, &paths).await.unwrap();
        provider.insert_art(located_art("Temple")).await.unwrap();
        provider
            .insert_user_poi(UserPoi {
                info: ItemInfo::new("Home").with_location(40.77, -119.22),
            })
            .await
            .unwrap();

        let mut art = provider.observe_art();
        assert_eq!(next(&mut art).await[0].info.location, None);
        let mut pois = provider.observe_user_pois();
        assert!(next(&mut pois).await[0].info.location.is_some());
    }

    let mut preferences = Preferences::load(&paths).unwrap();
    preferences.embargo_unlocked = true;
    preferences.save(&paths).unwrap();

    let provider = DataProvider::open(&config, &paths).await.unwrap();
    let mut art = provider.observe_art();
    assert!(next(&mut art).await[0].info.location.is_some());
}

#[tokio::test]
async fn bundled_database_is_staged_on_first_open() {
    let dir = tempdir().unwrap();
    let bundle = dir.path().join("bundle").join("playa.sqlite");
    {
        let db = AsyncDatabase::open(&bundle).await.unwrap();
        let store = StoreAdapter::new(db.clone(), DEFAULT_CHANGE_CAPACITY);
        store.insert(camp("C1", "Center Camp")).await.unwrap();
        drop(store);
        db.close().await.unwrap();
    }

    let paths = Paths::with_base_dir(dir.path().join("home"));
    let config = Config {
        bundled_database: Some(bundle),
        ..Config::default()
    };
    let provider = DataProvider::open(&config, &paths).await.unwrap();

    let mut camps = provider.observe_camps();
    let staged = next(&mut camps).await;
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].info.name, "Center Camp");
}

#[tokio::test]
async fn missing_bundle_starts_empty() {
    let dir = tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());
    let config = Config {
        bundled_database: Some(dir.path().join("nowhere.sqlite")),
        ..Config::default()
    };

    let provider = DataProvider::open(&config, &paths).await.unwrap();
    let mut camps = provider.observe_camps();
    assert!(next(&mut camps).await.is_empty());
}

#[tokio::test]
async fn shared_provider_is_built_once() {
    let dir = tempdir().unwrap();
    let paths = Paths::with_base_dir(dir.path().to_path_buf());
    let config = Config::default();
    let shared = Arc::new(SharedProvider::new());
    assert!(shared.get().is_none());

    let mut handles = vec![];
    for _ in 0..8 {
        let shared = shared.clone();
        let paths = paths.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            shared
                .get_or_try_init(|| DataProvider::open(&config, &paths))
                .await
                .unwrap()
        }));
    }

    let mut providers = vec![];
    for handle in handles {
        providers.push(handle.await.unwrap());
    }
    let first = shared.get().unwrap();
    assert!(providers.iter().all(|p| Arc::ptr_eq(p, &first)));
}

#[tokio::test]
async fn failed_build_can_be_retried() {
    let shared = SharedProvider::new();

    let failed = shared
        .get_or_try_init(|| async { Err(crate::ProviderError::UpgradeInProgress) })
        .await;
    assert!(failed.is_err());
    assert!(shared.get().is_none());

    let built = shared
        .get_or_try_init(DataProvider::open_in_memory)
        .await
        .unwrap();
    assert!(Arc::ptr_eq(&built, &shared.get().unwrap()));
}
