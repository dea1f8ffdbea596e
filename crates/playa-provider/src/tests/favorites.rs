//! Favorite toggling and the favorites combination.

use super::*;
use playa_database::Table;

#[tokio::test]
async fn toggle_twice_restores_flag_for_every_category() {
    let provider = provider().await;

    let art_id = provider.insert_art(art("Temple")).await.unwrap();
    let camp_id = provider.insert_camp(camp("C1", "Center Camp")).await.unwrap();
    let event_id = provider
        .insert_event(event("E1", "Yoga", gate_time(0)))
        .await
        .unwrap();
    let poi_id = provider.insert_user_poi(poi("Home")).await.unwrap();

    let mut items: Vec<PlayaItem> = vec![
        Art {
            info: ItemInfo { id: art_id, ..art("Temple").info },
            ..Default::default()
        }
        .into(),
        Camp {
            info: ItemInfo { id: camp_id, ..camp("C1", "Center Camp").info },
        }
        .into(),
        Event {
            info: ItemInfo { id: event_id, ..event("E1", "Yoga", gate_time(0)).info },
            ..event("E1", "Yoga", gate_time(0))
        }
        .into(),
        UserPoi {
            info: ItemInfo { id: poi_id, ..poi("Home").info },
        }
        .into(),
    ];

    let mut favorites = provider.observe_favorites();
    assert!(next(&mut favorites).await.is_empty());

    for item in items.iter_mut() {
        let table = item.table();

        provider.toggle_favorite(item).await.unwrap();
        assert!(item.is_favorite());
        let snapshot = next(&mut favorites).await;
        assert_eq!(snapshot.len(), 1, "{table} favorited");
        assert_eq!(snapshot[0].table(), table);

        provider.toggle_favorite(item).await.unwrap();
        assert!(!item.is_favorite());
        assert!(next(&mut favorites).await.is_empty(), "{table} unfavorited");
    }

    assert!(quiet(&mut favorites).await);
}

#[tokio::test]
async fn toggle_touches_only_the_favorite_flag() {
    let provider = provider().await;
    let id = provider
        .insert_art(Art {
            info: ItemInfo::new("Temple").with_playa_id("A1"),
            artist: "Builder".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    // A stale copy must not overwrite the stored artist.
    let mut stale: PlayaItem = Art {
        info: ItemInfo { id, ..ItemInfo::new("Old Name") },
        ..Default::default()
    }
    .into();
    provider.toggle_favorite(&mut stale).await.unwrap();

    let mut live = provider.observe_art_by_playa_id("A1");
    let stored = next(&mut live).await.unwrap();
    assert!(stored.info.favorite);
    assert_eq!(stored.info.name, "Temple");
    assert_eq!(stored.artist, "Builder");
}

#[tokio::test]
async fn toggle_of_missing_item_fails() {
    let provider = provider().await;
    let mut ghost: PlayaItem = Camp {
        info: ItemInfo { id: 404, ..ItemInfo::new("Ghost Camp") },
    }
    .into();

    assert!(provider.toggle_favorite(&mut ghost).await.is_err());
    assert!(!ghost.is_favorite());
}

#[tokio::test]
async fn update_of_unsaved_item_is_not_found_and_creates_nothing() {
    let provider = provider().await;
    let mut camps = provider.observe_camps();
    assert!(next(&mut camps).await.is_empty());

    for item in [
        PlayaItem::from(camp("C9", "Never Imported")),
        PlayaItem::from(poi("Unsaved Pin")),
    ] {
        let result = provider.update(item).await;
        assert!(matches!(
            result,
            Err(crate::ProviderError::Database(playa_database::DatabaseError::NotFound(_)))
        ));
    }

    assert!(quiet(&mut camps).await);
    let mut pois = provider.observe_user_pois();
    assert!(next(&mut pois).await.is_empty());
}

#[tokio::test]
async fn clearing_events_empties_favorites_of_that_category_only() {
    let provider = provider().await;
    provider
        .insert_art(Art {
            info: ItemInfo::new("Temple").with_favorite(true),
            ..Default::default()
        })
        .await
        .unwrap();
    provider
        .insert_camp(Camp {
            info: ItemInfo::new("Center Camp").with_favorite(true),
        })
        .await
        .unwrap();
    let mut favorite_event = event("E1", "Yoga", gate_time(0));
    favorite_event.info.favorite = true;
    provider.insert_event(favorite_event).await.unwrap();

    let mut events = provider.observe_events();
    let mut favorites = provider.observe_favorites();
    assert_eq!(next(&mut events).await.len(), 1);
    assert_eq!(names(&next(&mut favorites).await), vec!["Temple", "Center Camp", "Yoga"]);

    assert_eq!(provider.delete("events").await.unwrap(), 1);

    assert!(next(&mut events).await.is_empty());
    let after = next(&mut favorites).await;
    assert_eq!(names(&after), vec!["Temple", "Center Camp"]);
    assert!(after.iter().all(|item| item.table() != Table::Event));
}

#[tokio::test]
async fn user_added_items_include_every_poi() {
    let provider = provider().await;
    provider.insert_user_poi(poi("Bike")).await.unwrap();
    provider
        .insert_user_poi(UserPoi {
            info: ItemInfo::new("Home").with_favorite(true),
        })
        .await
        .unwrap();
    provider.insert_camp(camp("C1", "Center Camp")).await.unwrap();

    let mut map = provider.observe_user_added_map_items_only();
    assert_eq!(names(&next(&mut map).await), vec!["Bike", "Home"]);
}
