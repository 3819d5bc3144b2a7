//! End-to-end scenarios for the reconciliation service over the in-memory store.

use std::collections::BTreeSet;
use std::sync::Arc;

use castsync::core::GroupId;
use castsync::store::{MemoryStore, Store, StoreExt};
use castsync::sync::SyncGroupManager;
use castsync::{
    EpisodeActionEvent, EpisodeActionQuery, ErrorKind, ReconciliationService, ServiceConfig,
    SyncRequest, Timestamp,
};
use castsync_testkit::fixtures::{ALICE, FEED_A, FEED_B, FEED_C, START};
use castsync_testkit::{init_test_tracing, FlakyStore, GatedStore, ManualClock, TestFixture};

type Service<S = MemoryStore> = ReconciliationService<S, ManualClock>;

async fn service() -> (Service, ManualClock) {
    init_test_tracing();
    let (store, clock) = TestFixture::memory().await.unwrap().into_parts();
    let service = ReconciliationService::with_clock(store, clock.clone(), ServiceConfig::default());
    (service, clock)
}

fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn names(list: &[&str]) -> Vec<String> {
    urls(list)
}

async fn group_ids<S: Store>(service: &Service<S>) -> BTreeSet<GroupId> {
    service
        .store()
        .read(|tx| SyncGroupManager.group_ids_for_user(tx, ALICE))
        .await
        .unwrap()
}

fn episode(device: &str, podcast: &str, n: u32, ts: Timestamp) -> EpisodeActionEvent {
    EpisodeActionEvent {
        podcast: podcast.to_string(),
        episode: format!("{podcast}/{n}.mp3"),
        device: device.to_string(),
        action: "play".to_string(),
        position: 60,
        started: 0,
        total: 1800,
        timestamp: ts,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subscriptions and fan-out
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_linked_device_sees_add_then_remove() {
    let (service, clock) = service().await;
    service.link_devices(ALICE, &names(&["phone", "laptop"])).await.unwrap();

    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap();
    let first = service.read_changes(ALICE, "laptop", Timestamp::EPOCH).await.unwrap();
    assert_eq!(first.add, urls(&[FEED_A]));
    assert!(first.remove.is_empty());

    clock.advance(1);
    service
        .upload_changes(ALICE, "phone", &[], &urls(&[FEED_A]))
        .await
        .unwrap();
    let second = service.read_changes(ALICE, "laptop", first.cursor).await.unwrap();
    assert!(second.add.is_empty());
    assert_eq!(second.remove, urls(&[FEED_A]));

    // Over the whole history the subscribe and unsubscribe cancel out.
    let whole = service.read_changes(ALICE, "laptop", Timestamp::EPOCH).await.unwrap();
    assert!(whole.add.is_empty());
    assert_eq!(whole.remove, urls(&[FEED_A]));
    assert!(service.device_subscriptions(ALICE, "laptop").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_repeated_subscribes_stay_added() {
    let (service, clock) = service().await;
    for _ in 0..3 {
        service
            .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
            .await
            .unwrap();
        clock.advance(1);
    }
    let changes = service.read_changes(ALICE, "phone", Timestamp::EPOCH).await.unwrap();
    assert_eq!(changes.add, urls(&[FEED_A]));
    assert!(changes.remove.is_empty());
}

#[tokio::test]
async fn test_fan_out_reaches_every_linked_device() {
    let (service, _clock) = service().await;
    service
        .link_devices(ALICE, &names(&["phone", "laptop", "tablet"]))
        .await
        .unwrap();

    let receipt = service
        .upload_changes(ALICE, "laptop", &urls(&[FEED_A, FEED_B]), &[])
        .await
        .unwrap();
    assert_eq!(receipt.fan_out_devices.len(), 3);
    assert_eq!(receipt.timestamp, START);

    for device in ["phone", "laptop", "tablet"] {
        assert_eq!(
            service.device_subscriptions(ALICE, device).await.unwrap(),
            urls(&[FEED_A, FEED_B]),
            "{device}"
        );
    }
}

#[tokio::test]
async fn test_ungrouped_upload_stays_on_device() {
    let (service, _clock) = service().await;
    let receipt = service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap();
    assert_eq!(receipt.fan_out_devices.len(), 1);

    let laptop = service.read_changes(ALICE, "laptop", Timestamp::EPOCH).await.unwrap();
    assert!(laptop.add.is_empty() && laptop.remove.is_empty());
}

#[tokio::test]
async fn test_upload_reports_sanitized_urls() {
    let (service, _clock) = service().await;
    let receipt = service
        .upload_changes(ALICE, "phone", &urls(&["  http://a.fm/feed "]), &[])
        .await
        .unwrap();
    assert_eq!(
        receipt.update_urls,
        vec![("  http://a.fm/feed ".to_string(), FEED_A.to_string())]
    );
    assert_eq!(
        service.device_subscriptions(ALICE, "phone").await.unwrap(),
        urls(&[FEED_A])
    );
}

#[tokio::test]
async fn test_failed_fan_out_leaves_no_rows() {
    init_test_tracing();
    let fixture = TestFixture::with_store(FlakyStore::new(MemoryStore::new()))
        .await
        .unwrap();
    let (store, clock) = fixture.into_parts();
    let service = ReconciliationService::with_clock(store, clock, ServiceConfig::default());
    service
        .link_devices(ALICE, &names(&["phone", "laptop", "tablet"]))
        .await
        .unwrap();

    // Two of three rows go through, the third fails.
    service.store().fail_after_writes(2);
    let err = service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.is_retryable());

    for device in ["phone", "laptop", "tablet"] {
        let changes = service.read_changes(ALICE, device, Timestamp::EPOCH).await.unwrap();
        assert!(changes.add.is_empty(), "{device} saw a partial upload");
    }

    // Retrying the same batch succeeds.
    let receipt = service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap();
    assert_eq!(receipt.fan_out_devices.len(), 3);
}

#[tokio::test]
async fn test_first_write_failure_is_store_unavailable() {
    let fixture = TestFixture::with_store(FlakyStore::new(MemoryStore::new()))
        .await
        .unwrap();
    let (store, clock) = fixture.into_parts();
    let service = ReconciliationService::with_clock(store, clock, ServiceConfig::default());

    service.store().fail_after_writes(0);
    let err = service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    assert!(service.device_subscriptions(ALICE, "phone").await.unwrap().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Sync groups
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cross_group_link_moves_one_device() {
    let (service, _clock) = service().await;
    service
        .store()
        .register_device(ALICE, "tv", "Living room", "other")
        .await
        .unwrap();

    service.link_devices(ALICE, &names(&["phone", "laptop"])).await.unwrap();
    service.link_devices(ALICE, &names(&["tablet", "tv"])).await.unwrap();
    service.link_devices(ALICE, &names(&["laptop", "tv"])).await.unwrap();

    let status = service.sync_status(ALICE).await.unwrap();
    assert_eq!(status.synchronized.len(), 2);
    assert!(status.are_synchronized("phone", "tv"));
    assert!(!status.are_synchronized("phone", "tablet"));
    assert!(status.not_synchronized.is_empty());

    let receipt = service
        .upload_changes(ALICE, "tv", &urls(&[FEED_C]), &[])
        .await
        .unwrap();
    assert_eq!(receipt.fan_out_devices.len(), 3);
    assert_eq!(
        service.device_subscriptions(ALICE, "phone").await.unwrap(),
        urls(&[FEED_C])
    );
    assert!(service
        .device_subscriptions(ALICE, "tablet")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_orphaned_group_is_left_in_place() {
    let (service, _clock) = service().await;
    service
        .store()
        .register_device(ALICE, "tv", "Living room", "other")
        .await
        .unwrap();

    service.link_devices(ALICE, &names(&["phone", "laptop"])).await.unwrap();
    service.link_devices(ALICE, &names(&["tablet", "tv"])).await.unwrap();

    let groups_before = group_ids(&service).await;
    assert_eq!(groups_before.len(), 2);

    service.link_devices(ALICE, &names(&["phone", "tablet"])).await.unwrap();

    // Both group rows survive and tv still points at the second one.
    assert_eq!(group_ids(&service).await, groups_before);
    let status = service.sync_status(ALICE).await.unwrap();
    assert!(status.are_synchronized("phone", "tablet"));
    assert!(!status.are_synchronized("tablet", "tv"));
    assert!(status.synchronized.iter().any(|g| g == &names(&["tv"])));

    let receipt = service
        .upload_changes(ALICE, "tv", &urls(&[FEED_A]), &[])
        .await
        .unwrap();
    assert_eq!(receipt.fan_out_devices.len(), 1);
}

#[tokio::test]
async fn test_unlinked_device_is_isolated() {
    let (service, clock) = service().await;
    service
        .link_devices(ALICE, &names(&["phone", "laptop", "tablet"]))
        .await
        .unwrap();
    service.unlink_device(ALICE, "tablet").await.unwrap();

    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap();
    clock.advance(1);
    service
        .upload_changes(ALICE, "tablet", &urls(&[FEED_B]), &[])
        .await
        .unwrap();

    assert_eq!(
        service.device_subscriptions(ALICE, "laptop").await.unwrap(),
        urls(&[FEED_A])
    );
    assert_eq!(
        service.device_subscriptions(ALICE, "tablet").await.unwrap(),
        urls(&[FEED_B])
    );

    let status = service.sync_status(ALICE).await.unwrap();
    assert!(status.are_synchronized("phone", "laptop"));
    assert_eq!(status.not_synchronized, names(&["tablet"]));
}

#[tokio::test]
async fn test_unlink_ungrouped_device_is_noop() {
    let (service, _clock) = service().await;
    service.unlink_device(ALICE, "phone").await.unwrap();
    let status = service.sync_status(ALICE).await.unwrap();
    assert!(status.synchronized.is_empty());
    assert_eq!(status.not_synchronized, names(&["laptop", "phone", "tablet"]));
}

#[tokio::test]
async fn test_update_sync_links_then_unlinks() {
    let (service, _clock) = service().await;
    let request = SyncRequest::new()
        .synchronize(["phone", "laptop", "tablet"])
        .stop("tablet");

    let status = service.update_sync(ALICE, &request).await.unwrap();
    assert_eq!(status.synchronized, vec![names(&["laptop", "phone"])]);
    assert_eq!(status.not_synchronized, names(&["tablet"]));
}

#[tokio::test]
async fn test_update_sync_is_atomic() {
    let (service, _clock) = service().await;
    let request = SyncRequest::new()
        .synchronize(["phone", "laptop"])
        .synchronize(["tablet", "toaster"]);

    let err = service.update_sync(ALICE, &request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    // The first, valid link was rolled back with the rest.
    let status = service.sync_status(ALICE).await.unwrap();
    assert!(status.synchronized.is_empty());
}

#[tokio::test]
async fn test_link_errors() {
    let (service, _clock) = service().await;

    let empty = service.link_devices(ALICE, &[]).await.unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::InvalidInput);

    let unknown = service
        .link_devices(ALICE, &names(&["phone", "toaster"]))
        .await
        .unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::NotFound);

    let unlink = service.unlink_device(ALICE, "toaster").await.unwrap_err();
    assert_eq!(unlink.kind(), ErrorKind::NotFound);
}

// ─────────────────────────────────────────────────────────────────────────────
// Cursors
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_chained_reads_never_repeat_a_change() {
    let (service, clock) = service().await;

    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap();
    clock.advance(1);
    let first = service.read_changes(ALICE, "phone", Timestamp::EPOCH).await.unwrap();
    assert_eq!(first.add, urls(&[FEED_A]));

    clock.advance(1);
    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_B]), &[])
        .await
        .unwrap();
    clock.advance(1);
    let second = service.read_changes(ALICE, "phone", first.cursor).await.unwrap();
    assert_eq!(second.add, urls(&[FEED_B]));
    assert!(second.cursor > first.cursor);

    let third = service.read_changes(ALICE, "phone", second.cursor).await.unwrap();
    assert!(third.add.is_empty() && third.remove.is_empty());
    assert!(third.cursor >= second.cursor);
}

#[tokio::test]
async fn test_rows_after_cursor_wait_for_next_read() {
    let (service, clock) = service().await;

    clock.set(Timestamp(START.as_unix() + 10));
    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap();

    // A read whose clock is behind the row does not see it.
    clock.set(Timestamp(START.as_unix() + 5));
    let early = service.read_changes(ALICE, "phone", Timestamp::EPOCH).await.unwrap();
    assert!(early.add.is_empty());
    assert_eq!(early.cursor, Timestamp(START.as_unix() + 4));

    clock.set(Timestamp(START.as_unix() + 10));
    let late = service.read_changes(ALICE, "phone", early.cursor).await.unwrap();
    assert_eq!(late.add, urls(&[FEED_A]));
}

#[tokio::test]
async fn test_commit_in_the_read_second_is_not_lost() {
    let (service, clock) = service().await;
    service.link_devices(ALICE, &names(&["phone", "laptop"])).await.unwrap();

    clock.set(Timestamp(START.as_unix() + 30));
    let first = service.read_changes(ALICE, "laptop", Timestamp::EPOCH).await.unwrap();
    assert!(first.add.is_empty());

    // Same second as the read, but committed after it.
    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
        .await
        .unwrap();

    clock.advance(5);
    let second = service.read_changes(ALICE, "laptop", first.cursor).await.unwrap();
    assert_eq!(second.add, urls(&[FEED_A]));
}

#[tokio::test]
async fn test_upload_waiting_on_the_store_is_stamped_when_it_runs() {
    init_test_tracing();
    let fixture = TestFixture::with_store(GatedStore::new(MemoryStore::new()))
        .await
        .unwrap();
    let (store, clock) = fixture.into_parts();
    let service = Arc::new(ReconciliationService::with_clock(
        store,
        clock.clone(),
        ServiceConfig::default(),
    ));
    service.link_devices(ALICE, &names(&["phone", "laptop"])).await.unwrap();

    service.store().hold_next();
    let upload = {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            service
                .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &[])
                .await
        })
    };
    service.store().wait_until_parked().await;

    // The laptop polls while the upload is still queued.
    clock.advance(2);
    let polled = service.read_changes(ALICE, "laptop", Timestamp::EPOCH).await.unwrap();
    assert!(polled.add.is_empty());

    service.store().release();
    let receipt = upload.await.unwrap().unwrap();
    assert!(receipt.timestamp > polled.cursor);

    let next = service.read_changes(ALICE, "laptop", polled.cursor).await.unwrap();
    assert_eq!(next.add, urls(&[FEED_A]));
}

// ─────────────────────────────────────────────────────────────────────────────
// Listings and replacement
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_replace_subscriptions_touches_only_acting_device() {
    let (service, clock) = service().await;
    service.link_devices(ALICE, &names(&["phone", "laptop"])).await.unwrap();
    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A, FEED_B]), &[])
        .await
        .unwrap();

    clock.advance(1);
    let receipt = service
        .replace_subscriptions(ALICE, "phone", &urls(&[FEED_B, FEED_C]))
        .await
        .unwrap();
    assert_eq!(receipt.fan_out_devices.len(), 1);

    assert_eq!(
        service.device_subscriptions(ALICE, "phone").await.unwrap(),
        urls(&[FEED_B, FEED_C])
    );
    assert_eq!(
        service.device_subscriptions(ALICE, "laptop").await.unwrap(),
        urls(&[FEED_A, FEED_B])
    );

    // Replacing with the same set writes nothing new.
    let since = receipt.timestamp;
    clock.advance(1);
    service
        .replace_subscriptions(ALICE, "phone", &urls(&[FEED_C, FEED_B]))
        .await
        .unwrap();
    let changes = service.read_changes(ALICE, "phone", since).await.unwrap();
    assert!(changes.add.is_empty() && changes.remove.is_empty());
}

#[tokio::test]
async fn test_all_subscriptions_and_summaries() {
    let (service, _clock) = service().await;
    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_B, FEED_A]), &[])
        .await
        .unwrap();
    service
        .upload_changes(ALICE, "tablet", &urls(&[FEED_C, FEED_A]), &[])
        .await
        .unwrap();

    assert_eq!(
        service.all_subscriptions(ALICE).await.unwrap(),
        urls(&[FEED_A, FEED_B, FEED_C])
    );

    let summaries = service.device_summaries(ALICE).await.unwrap();
    let counts: Vec<_> = summaries
        .iter()
        .map(|s| (s.name.as_str(), s.subscriptions))
        .collect();
    assert_eq!(counts, vec![("phone", 2), ("laptop", 0), ("tablet", 2)]);

    let json = serde_json::to_value(&summaries[0]).unwrap();
    assert_eq!(json["id"], "phone");
    assert_eq!(json["type"], "other");
}

#[tokio::test]
async fn test_unknown_user_and_device() {
    let (service, _clock) = service().await;

    let err = service.all_subscriptions("bob").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .upload_changes(ALICE, "toaster", &urls(&[FEED_A]), &[])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = service
        .read_changes(ALICE, "toaster", Timestamp::EPOCH)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_invalid_uploads_are_rejected() {
    let (service, _clock) = service().await;

    let overlap = service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A]), &urls(&[FEED_A]))
        .await
        .unwrap_err();
    assert_eq!(overlap.kind(), ErrorKind::InvalidInput);

    let empty = service
        .upload_changes(ALICE, "phone", &urls(&["   "]), &[])
        .await
        .unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::InvalidInput);

    assert!(service.device_subscriptions(ALICE, "phone").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_change_limit() {
    let (store, clock) = TestFixture::memory().await.unwrap().into_parts();
    let config = ServiceConfig::default().with_max_changes(2);
    let service = ReconciliationService::with_clock(store, clock, config);

    let err = service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A, FEED_B]), &urls(&[FEED_C]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    service
        .upload_changes(ALICE, "phone", &urls(&[FEED_A, FEED_B]), &[])
        .await
        .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Episode actions
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_episode_actions_roundtrip_and_filters() {
    let (service, clock) = service().await;
    let t = |offset: i64| Timestamp(START.as_unix() - 100 + offset);

    let receipt = service
        .upload_episode_actions(
            ALICE,
            vec![
                episode("phone", FEED_A, 1, t(0)),
                episode("laptop", FEED_A, 2, t(10)),
                episode("phone", FEED_B, 1, t(20)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(receipt.stored, 3);

    let all = service
        .read_episode_actions(ALICE, &EpisodeActionQuery::new())
        .await
        .unwrap();
    assert_eq!(all.actions.len(), 3);
    assert_eq!(all.cursor, Timestamp(START.as_unix() - 1));

    let phone = service
        .read_episode_actions(ALICE, &EpisodeActionQuery::new().device("phone"))
        .await
        .unwrap();
    assert_eq!(phone.actions.len(), 2);
    assert!(phone.actions.iter().all(|a| a.device == "phone"));

    let feed_a = service
        .read_episode_actions(ALICE, &EpisodeActionQuery::new().podcast(FEED_A))
        .await
        .unwrap();
    assert_eq!(feed_a.actions.len(), 2);

    // `since` is about when the server got the action, so a later batch
    // is all that shows up after the first receipt.
    clock.advance(10);
    service
        .upload_episode_actions(ALICE, vec![episode("laptop", FEED_B, 3, t(5))])
        .await
        .unwrap();
    let recent = service
        .read_episode_actions(ALICE, &EpisodeActionQuery::new().since(receipt.timestamp))
        .await
        .unwrap();
    assert_eq!(recent.actions, vec![episode("laptop", FEED_B, 3, t(5))]);
}

#[tokio::test]
async fn test_offline_episode_actions_reach_readers_past_their_timestamp() {
    let (service, clock) = service().await;

    let before = service
        .read_episode_actions(ALICE, &EpisodeActionQuery::new().device("laptop"))
        .await
        .unwrap();
    assert!(before.actions.is_empty());

    // The phone was offline for ten minutes and uploads what it recorded.
    clock.advance(60);
    let played = episode("phone", FEED_A, 1, Timestamp(START.as_unix() - 600));
    service
        .upload_episode_actions(ALICE, vec![played.clone()])
        .await
        .unwrap();

    let page = service
        .read_episode_actions(ALICE, &EpisodeActionQuery::new().since(before.cursor))
        .await
        .unwrap();
    assert_eq!(page.actions, vec![played]);
}

#[tokio::test]
async fn test_episode_upload_is_all_or_nothing() {
    let (service, _clock) = service().await;
    let ts = Timestamp(START.as_unix() - 10);

    let err = service
        .upload_episode_actions(
            ALICE,
            vec![episode("phone", FEED_A, 1, ts), episode("toaster", FEED_A, 2, ts)],
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let page = service
        .read_episode_actions(ALICE, &EpisodeActionQuery::new())
        .await
        .unwrap();
    assert!(page.actions.is_empty());
}

#[tokio::test]
async fn test_episode_validation() {
    let (service, _clock) = service().await;
    let mut bad = episode("phone", FEED_A, 1, START);
    bad.position = -5;

    let err = service
        .upload_episode_actions(ALICE, vec![bad.clone()])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    // Permissive configs store the action as sent.
    let (store, clock) = TestFixture::memory().await.unwrap().into_parts();
    let lenient = ReconciliationService::with_clock(store, clock, ServiceConfig::permissive());
    let receipt = lenient.upload_episode_actions(ALICE, vec![bad]).await.unwrap();
    assert_eq!(receipt.stored, 1);
}

#[tokio::test]
async fn test_episode_read_unknown_device_filter() {
    let (service, _clock) = service().await;
    let err = service
        .read_episode_actions(ALICE, &EpisodeActionQuery::new().device("toaster"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let page = service
        .read_episode_actions("bob", &EpisodeActionQuery::new())
        .await
        .unwrap();
    assert!(page.actions.is_empty());
}
