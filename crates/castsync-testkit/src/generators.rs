//! Proptest generators for property-based testing.

use proptest::prelude::*;

use castsync_core::{
    DeviceHandle, EpisodeActionEvent, SubscriptionAction, SubscriptionEvent, Timestamp,
};

/// One of a small pool of feed URLs, so logs revisit the same podcast.
pub fn podcast_url() -> impl Strategy<Value = String> {
    (0u8..8).prop_map(|n| format!("http://feed{n}.example.com/rss"))
}

/// Mostly known actions, with the occasional unknown label.
pub fn subscription_action() -> impl Strategy<Value = SubscriptionAction> {
    prop_oneof![
        5 => Just(SubscriptionAction::Subscribe),
        4 => Just(SubscriptionAction::Unsubscribe),
        1 => "[A-Z]{3,8}".prop_map(SubscriptionAction::from),
    ]
}

/// Generate a reasonable timestamp (2001 to 2033).
pub fn timestamp() -> impl Strategy<Value = Timestamp> {
    (1_000_000_000i64..2_000_000_000).prop_map(Timestamp)
}

/// A subscription event for `user` on `device`.
pub fn subscription_event(
    user: &'static str,
    device: DeviceHandle,
) -> impl Strategy<Value = SubscriptionEvent> {
    (podcast_url(), subscription_action(), timestamp()).prop_map(move |(podcast, action, ts)| {
        SubscriptionEvent {
            user: user.to_string(),
            device,
            podcast,
            action,
            timestamp: ts,
        }
    })
}

/// A log slice of up to `max_len` events, sorted by timestamp like a store read.
pub fn event_log(
    user: &'static str,
    device: DeviceHandle,
    max_len: usize,
) -> impl Strategy<Value = Vec<SubscriptionEvent>> {
    prop::collection::vec(subscription_event(user, device), 0..=max_len).prop_map(|mut events| {
        events.sort_by_key(|e| e.timestamp);
        events
    })
}

/// An `(add, remove)` upload with no URL on both sides.
pub fn change_lists(max_len: usize) -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    prop::collection::btree_map(podcast_url(), any::<bool>(), 0..=max_len).prop_map(|urls| {
        let mut add = Vec::new();
        let mut remove = Vec::new();
        for (url, is_add) in urls {
            if is_add {
                add.push(url);
            } else {
                remove.push(url);
            }
        }
        (add, remove)
    })
}

/// A valid episode action recorded by `device`.
pub fn episode_action(device: &'static str) -> impl Strategy<Value = EpisodeActionEvent> {
    (
        podcast_url(),
        0u32..50,
        prop::sample::select(vec!["play", "download", "delete", "new"]),
        0i64..7200,
        timestamp(),
    )
        .prop_map(move |(podcast, episode, action, position, ts)| EpisodeActionEvent {
            episode: format!("{podcast}/episode-{episode}"),
            podcast,
            device: device.to_string(),
            action: action.to_string(),
            position,
            started: 0,
            total: 7200,
            timestamp: ts,
        })
}

/// A sequence of link requests between `devices` device indexes.
pub fn link_plan(devices: usize, max_links: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0..devices, 0..devices), 1..=max_links)
}
