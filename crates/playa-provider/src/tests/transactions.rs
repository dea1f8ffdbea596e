//! Transaction bracketing and deferred notifications.

use super::*;

#[tokio::test]
async fn nested_begin_leaves_one_transaction() {
    let provider = provider().await;

    provider.begin_transaction().await.unwrap();
    provider.begin_transaction().await.unwrap();
    assert!(provider.in_transaction());

    provider.set_transaction_successful();
    provider.end_transaction().await.unwrap();
    assert!(!provider.in_transaction());
}

#[tokio::test]
async fn end_without_transaction_is_noop() {
    let provider = provider().await;

    provider.set_transaction_successful();
    provider.end_transaction().await.unwrap();
    provider.end_transaction().await.unwrap();
    assert!(!provider.in_transaction());
}

#[tokio::test]
async fn committed_writes_notify_once_committed() {
    let provider = provider().await;
    let mut camps = provider.observe_camps();
    assert!(next(&mut camps).await.is_empty());

    provider.begin_transaction().await.unwrap();
    provider.insert_camp(camp("C1", "Center Camp")).await.unwrap();
    provider.insert_camp(camp("C2", "Dust Bar")).await.unwrap();
    assert!(quiet(&mut camps).await);

    provider.set_transaction_successful();
    provider.end_transaction().await.unwrap();

    let committed = next(&mut camps).await;
    assert_eq!(committed.len(), 2);
}

#[tokio::test]
async fn unmarked_transaction_is_rolled_back() {
    let provider = provider().await;
    let mut camps = provider.observe_camps();
    assert!(next(&mut camps).await.is_empty());

    provider.begin_transaction().await.unwrap();
    provider.insert_camp(camp("C1", "Center Camp")).await.unwrap();
    provider.end_transaction().await.unwrap();

    // The rollback re-runs the subscription once, against the kept rows.
    assert!(next(&mut camps).await.is_empty());
    assert!(quiet(&mut camps).await);
    let mut fresh = provider.observe_camps();
    assert!(next(&mut fresh).await.is_empty());
}

#[tokio::test]
async fn subscription_opened_mid_transaction_drops_rolled_back_rows() {
    let provider = provider().await;
    provider.insert_camp(camp("C0", "Kept Camp")).await.unwrap();

    provider.begin_transaction().await.unwrap();
    provider.insert_camp(camp("C1", "Phantom")).await.unwrap();

    // Everything shares one connection, so the first run sees the
    // uncommitted row.
    let mut camps = provider.observe_camps();
    let during = next(&mut camps).await;
    assert_eq!(during.len(), 2);

    provider.end_transaction().await.unwrap();

    let after = next(&mut camps).await;
    let names: Vec<_> = after.iter().map(|c| c.info.name.as_str()).collect();
    assert_eq!(names, vec!["Kept Camp"]);
}

#[tokio::test]
async fn success_mark_does_not_leak_into_next_transaction() {
    let provider = provider().await;

    provider.begin_transaction().await.unwrap();
    provider.set_transaction_successful();
    provider.end_transaction().await.unwrap();

    provider.begin_transaction().await.unwrap();
    provider.insert_camp(camp("C1", "Center Camp")).await.unwrap();
    provider.end_transaction().await.unwrap();

    let mut camps = provider.observe_camps();
    assert!(next(&mut camps).await.is_empty());
}

#[tokio::test]
async fn failed_query_only_ends_its_own_subscription() {
    use crate::live::LiveState;
    use playa_database::queries;

    let provider = provider().await;
    let mut healthy = provider.observe_camps();
    next(&mut healthy).await;

    let broken = queries::all::<Camp>().with_sql("SELECT nope FROM camps");
    let mut failing = provider.engine.observe(broken);
    let first = timeout(WAIT, failing.next()).await.unwrap();
    assert!(matches!(first, Some(Err(_))));
    assert_eq!(timeout(WAIT, failing.next()).await.unwrap().map(|_| ()), None);
    assert_eq!(failing.state(), LiveState::Cancelled);

    provider.insert_camp(camp("C1", "Center Camp")).await.unwrap();
    assert_eq!(next(&mut healthy).await.len(), 1);
}
