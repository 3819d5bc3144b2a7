//! Golden diff vectors.
//!
//! Each vector is a short log of `(podcast, action label)` pairs with the
//! add/remove sets the diff must produce. Any backend or client port of the
//! counting rule should agree on all of them.

use castsync_core::{
    diff, DeviceHandle, SubscriptionAction, SubscriptionDiff, SubscriptionEvent, Timestamp,
};

/// A golden diff case.
#[derive(Debug, Clone)]
pub struct DiffVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Log rows in order.
    pub events: &'static [(&'static str, &'static str)],
    /// Expected `add`, sorted.
    pub add: &'static [&'static str],
    /// Expected `remove`, sorted.
    pub remove: &'static [&'static str],
}

impl DiffVector {
    /// Materialize the log as events of one device, one second apart.
    pub fn to_events(&self) -> Vec<SubscriptionEvent> {
        self.events
            .iter()
            .enumerate()
            .map(|(i, (podcast, label))| SubscriptionEvent {
                user: "alice".to_string(),
                device: DeviceHandle(1),
                podcast: podcast.to_string(),
                action: SubscriptionAction::from_label(label),
                timestamp: Timestamp(1_700_000_000 + i as i64),
            })
            .collect()
    }

    /// Run the diff over this vector.
    pub fn compute(&self) -> SubscriptionDiff {
        diff(&self.to_events())
    }

    /// Whether the diff matches the expected sets.
    pub fn holds(&self) -> bool {
        let (add, remove) = self.compute().into_lists();
        add.iter().map(String::as_str).eq(self.add.iter().copied())
            && remove.iter().map(String::as_str).eq(self.remove.iter().copied())
    }
}

const A: &str = "http://a.fm/feed";
const B: &str = "http://b.fm/feed";
const C: &str = "http://c.fm/feed";

/// Get all golden diff vectors.
pub fn all_vectors() -> Vec<DiffVector> {
    vec![
        DiffVector {
            name: "empty log",
            events: &[],
            add: &[],
            remove: &[],
        },
        DiffVector {
            name: "single subscribe",
            events: &[(A, "SUBSCRIBE")],
            add: &[A],
            remove: &[],
        },
        DiffVector {
            name: "subscribe then unsubscribe cancels to remove",
            events: &[(A, "SUBSCRIBE"), (A, "UNSUBSCRIBE")],
            add: &[],
            remove: &[A],
        },
        DiffVector {
            name: "repeated subscribes stay added",
            events: &[(A, "SUBSCRIBE"), (A, "SUBSCRIBE"), (A, "SUBSCRIBE")],
            add: &[A],
            remove: &[],
        },
        DiffVector {
            name: "unsubscribe of never-subscribed podcast",
            events: &[(B, "UNSUBSCRIBE")],
            add: &[],
            remove: &[B],
        },
        DiffVector {
            name: "order does not matter",
            events: &[(A, "UNSUBSCRIBE"), (A, "SUBSCRIBE"), (A, "SUBSCRIBE")],
            add: &[A],
            remove: &[],
        },
        DiffVector {
            name: "unknown labels are skipped",
            events: &[(A, "SUBSCRIBE"), (A, "MARK_PLAYED"), (C, "subscribe")],
            add: &[A],
            remove: &[],
        },
        DiffVector {
            name: "mixed podcasts",
            events: &[
                (A, "SUBSCRIBE"),
                (B, "SUBSCRIBE"),
                (C, "UNSUBSCRIBE"),
                (B, "UNSUBSCRIBE"),
                (B, "UNSUBSCRIBE"),
            ],
            add: &[A],
            remove: &[B, C],
        },
    ]
}

/// Names of vectors whose diff disagrees with the expected sets.
pub fn failing_vectors() -> Vec<&'static str> {
    all_vectors()
        .into_iter()
        .filter(|v| !v.holds())
        .map(|v| v.name)
        .collect()
}
