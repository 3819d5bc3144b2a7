//! Subscription diff: derive add/remove sets from a slice of the log.
//!
//! Algorithm:
//! 1. Keep a signed counter per podcast URL
//! 2. `SUBSCRIBE` adds 1, `UNSUBSCRIBE` subtracts 1, any other label is skipped
//! 3. Counter `> 0` puts the URL in `add`; counter `<= 0` puts it in `remove`
//!
//! A URL whose subscribes and unsubscribes cancel out lands in `remove`, not
//! nowhere. Clients rely on seeing the explicit removal, so the zero case
//! must stay on the `remove` side.
//!
//! The result depends on the events only through their counts, never through
//! timestamps, so ties in the log order do not matter.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::event::{SubscriptionAction, SubscriptionEvent};

/// Podcasts to add and to remove, as derived from the log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionDiff {
    pub add: BTreeSet<String>,
    pub remove: BTreeSet<String>,
}

impl SubscriptionDiff {
    /// No podcast was touched.
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Sorted `(add, remove)` lists.
    pub fn into_lists(self) -> (Vec<String>, Vec<String>) {
        (self.add.into_iter().collect(), self.remove.into_iter().collect())
    }
}

/// Incremental form of [`diff`].
#[derive(Debug, Clone, Default)]
pub struct SubscriptionTally {
    counters: BTreeMap<String, i64>,
}

impl SubscriptionTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the tally.
    pub fn apply(&mut self, event: &SubscriptionEvent) {
        self.apply_action(&event.podcast, &event.action);
    }

    /// Fold a bare `(podcast, action)` pair into the tally.
    pub fn apply_action(&mut self, podcast: &str, action: &SubscriptionAction) {
        let delta = match action {
            SubscriptionAction::Subscribe => 1,
            SubscriptionAction::Unsubscribe => -1,
            SubscriptionAction::Unknown(_) => return,
        };
        *self.counters.entry(podcast.to_string()).or_insert(0) += delta;
    }

    /// Current counter for a podcast, if it has been seen.
    pub fn count(&self, podcast: &str) -> Option<i64> {
        self.counters.get(podcast).copied()
    }

    /// Split the counters into add and remove sets.
    pub fn finish(self) -> SubscriptionDiff {
        let mut out = SubscriptionDiff::default();
        for (podcast, count) in self.counters {
            if count > 0 {
                out.add.insert(podcast);
            } else {
                out.remove.insert(podcast);
            }
        }
        out
    }
}

/// Reduce an ordered slice of subscription events to add/remove sets.
pub fn diff<'a, I>(events: I) -> SubscriptionDiff
where
    I: IntoIterator<Item = &'a SubscriptionEvent>,
{
    let mut tally = SubscriptionTally::new();
    for event in events {
        tally.apply(event);
    }
    tally.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::Timestamp;
    use crate::types::DeviceHandle;
    use proptest::prelude::*;

    const DEV: DeviceHandle = DeviceHandle(1);

    fn sub(url: &str, ts: i64) -> SubscriptionEvent {
        SubscriptionEvent::subscribe("alice", DEV, url, Timestamp(ts))
    }

    fn unsub(url: &str, ts: i64) -> SubscriptionEvent {
        SubscriptionEvent::unsubscribe("alice", DEV, url, Timestamp(ts))
    }

    fn set(urls: &[&str]) -> BTreeSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_empty_log() {
        assert!(diff(&[]).is_empty());
    }

    #[test]
    fn test_repeated_subscribe_is_add() {
        let events = vec![sub("a", 1), sub("a", 2), sub("a", 3)];
        let d = diff(&events);
        assert_eq!(d.add, set(&["a"]));
        assert!(d.remove.is_empty());
    }

    #[test]
    fn test_balanced_is_remove_not_absent() {
        // Net zero must be reported as removed. Do not "fix" this to omit
        // the URL; clients depend on the explicit removal.
        let events = vec![sub("a", 1), unsub("a", 2)];
        let d = diff(&events);
        assert!(d.add.is_empty());
        assert_eq!(d.remove, set(&["a"]));
    }

    #[test]
    fn test_unsubscribe_without_subscribe_is_remove() {
        let d = diff(&[unsub("a", 1)]);
        assert_eq!(d.remove, set(&["a"]));
    }

    #[test]
    fn test_resubscribe_after_remove_is_add() {
        let events = vec![sub("a", 1), unsub("a", 2), sub("a", 3)];
        assert_eq!(diff(&events).add, set(&["a"]));
    }

    #[test]
    fn test_unknown_action_is_ignored() {
        let mut odd = sub("b", 1);
        odd.action = SubscriptionAction::Unknown("FLATTR".into());
        let events = vec![sub("a", 1), odd];
        let d = diff(&events);
        assert_eq!(d.add, set(&["a"]));
        assert!(!d.remove.contains("b"));
    }

    #[test]
    fn test_tally_count() {
        let mut tally = SubscriptionTally::new();
        tally.apply(&sub("a", 1));
        tally.apply(&sub("a", 1));
        tally.apply(&unsub("a", 1));
        assert_eq!(tally.count("a"), Some(1));
        assert_eq!(tally.count("b"), None);
    }

    #[test]
    fn test_into_lists_sorted() {
        let events = vec![sub("z", 1), sub("m", 1), unsub("c", 1)];
        let (add, remove) = diff(&events).into_lists();
        assert_eq!(add, vec!["m".to_string(), "z".to_string()]);
        assert_eq!(remove, vec!["c".to_string()]);
    }

    fn arb_event() -> impl Strategy<Value = SubscriptionEvent> {
        (
            prop::sample::select(vec!["a", "b", "c", "d"]),
            prop_oneof![
                4 => Just(SubscriptionAction::Subscribe),
                4 => Just(SubscriptionAction::Unsubscribe),
                1 => Just(SubscriptionAction::Unknown("PING".into())),
            ],
            0i64..1000,
        )
            .prop_map(|(url, action, ts)| SubscriptionEvent {
                user: "alice".into(),
                device: DEV,
                podcast: url.into(),
                action,
                timestamp: Timestamp(ts),
            })
    }

    proptest! {
        #[test]
        fn prop_diff_deterministic(events in prop::collection::vec(arb_event(), 0..64)) {
            prop_assert_eq!(diff(&events), diff(&events));
        }

        #[test]
        fn prop_diff_ignores_order(events in prop::collection::vec(arb_event(), 0..64)) {
            let mut reversed = events.clone();
            reversed.reverse();
            prop_assert_eq!(diff(&events), diff(&reversed));
        }

        #[test]
        fn prop_net_count_decides(subs in 0usize..8, unsubs in 0usize..8) {
            prop_assume!(subs + unsubs > 0);
            let mut events: Vec<_> = (0..subs).map(|i| sub("a", i as i64)).collect();
            events.extend((0..unsubs).map(|i| unsub("a", i as i64)));
            let d = diff(&events);
            prop_assert_eq!(d.add.contains("a"), subs > unsubs);
            prop_assert_eq!(d.remove.contains("a"), subs <= unsubs);
        }

        #[test]
        fn prop_sets_disjoint(events in prop::collection::vec(arb_event(), 0..64)) {
            let d = diff(&events);
            prop_assert!(d.add.is_disjoint(&d.remove));
        }
    }
}
