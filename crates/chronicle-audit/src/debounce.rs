//! Time-windowed deduplication of audit actions.
//!
//! A single logical operation in the repository fires several events for the
//! same entity within a few hundred milliseconds. The [`DebounceStore`]
//! remembers when each (path, action) pair was last emitted and suppresses
//! repeats inside the debounce window.
//!
//! The store is sharded (`DashMap`), so the check-and-update for one key holds
//! only that key's shard lock and unrelated keys proceed in parallel.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chronicle_core::ActionKind;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

/// Share of a full store evicted at once when nothing has expired.
const EVICTION_DIVISOR: usize = 10;

/// Key identifying one auditable action on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DebounceKey {
    subject_path: String,
    action_kind: ActionKind,
}

impl DebounceKey {
    /// Creates a key.
    #[must_use]
    pub fn new(subject_path: impl Into<String>, action_kind: ActionKind) -> Self {
        Self {
            subject_path: subject_path.into(),
            action_kind,
        }
    }

    /// Returns the subject path.
    #[must_use]
    pub fn subject_path(&self) -> &str {
        &self.subject_path
    }

    /// Returns the action kind.
    #[must_use]
    pub const fn action_kind(&self) -> ActionKind {
        self.action_kind
    }
}

impl fmt::Display for DebounceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.subject_path, self.action_kind)
    }
}

/// Snapshot of one store entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebounceEntry {
    /// The key.
    pub key: DebounceKey,
    /// Milliseconds since the Unix epoch at which the key was last emitted.
    pub last_emitted_at: i64,
}

/// Concurrent debounce store.
///
/// Timestamps are milliseconds since the Unix epoch. For a given key the
/// stored timestamp never decreases.
///
/// The store keeps its own clock: the newest timestamp passed to
/// [`should_emit`](Self::should_emit). Background sweeps expire entries
/// against that clock, never against the wall clock, so callers replaying
/// historical or synthetic time see the same decisions as live callers.
#[derive(Debug)]
pub struct DebounceStore {
    entries: DashMap<DebounceKey, i64>,
    max_entries: Option<usize>,
    latest_ms: AtomicI64,
}

impl Default for DebounceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceStore {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: None,
            latest_ms: AtomicI64::new(i64::MIN),
        }
    }

    /// Creates a store holding at most `max_entries` keys.
    ///
    /// When a new key arrives at capacity, expired entries are purged first;
    /// if the store is still nearly full, the oldest tenth of the entries is
    /// evicted in one pass, leaving headroom for the next inserts.
    #[must_use]
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: Some(max_entries.max(1)),
            latest_ms: AtomicI64::new(i64::MIN),
        }
    }

    /// Returns the capacity limit, if any.
    #[must_use]
    pub const fn max_entries(&self) -> Option<usize> {
        self.max_entries
    }

    /// Decides whether an action observed at `now_ms` should be emitted.
    ///
    /// Returns `true` and records `now_ms` if the key is new or its last
    /// emission is at least `window` old. Otherwise returns `false` and leaves
    /// the entry untouched. A `now_ms` earlier than the stored timestamp is
    /// treated as inside the window.
    pub fn should_emit(&self, key: DebounceKey, now_ms: i64, window: Duration) -> bool {
        let window_ms = window_millis(window);
        self.latest_ms.fetch_max(now_ms, Ordering::Relaxed);

        if let Some(max_entries) = self.max_entries {
            if self.entries.len() >= max_entries && !self.entries.contains_key(&key) {
                self.make_room(now_ms, window_ms, max_entries);
            }
        }

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let last = *occupied.get();
                if now_ms.saturating_sub(last) < window_ms {
                    false
                } else {
                    occupied.insert(now_ms);
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(now_ms);
                true
            }
        }
    }

    /// Returns when the key was last emitted.
    #[must_use]
    pub fn last_emitted(&self, key: &DebounceKey) -> Option<i64> {
        self.entries.get(key).map(|entry| *entry.value())
    }

    /// Returns the newest timestamp the store has seen.
    #[must_use]
    pub fn latest(&self) -> Option<i64> {
        let latest = self.latest_ms.load(Ordering::Relaxed);
        (latest != i64::MIN).then_some(latest)
    }

    /// Returns the number of tracked keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no keys are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a snapshot of all entries, sorted by key.
    #[must_use]
    pub fn entries(&self) -> Vec<DebounceEntry> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| DebounceEntry {
                key: entry.key().clone(),
                last_emitted_at: *entry.value(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Removes entries whose last emission is at least `window` old.
    ///
    /// Such entries no longer suppress anything, so removing them never
    /// changes a future decision. Returns the number of removed entries.
    pub fn purge_expired(&self, now_ms: i64, window: Duration) -> usize {
        self.purge_older_than(now_ms, window_millis(window))
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
        self.latest_ms.store(i64::MIN, Ordering::Relaxed);
    }

    /// Periodically purges entries expired relative to [`latest`](Self::latest)
    /// until the task is aborted.
    ///
    /// Needs to be spawned on a tokio runtime.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, window: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let Some(now_ms) = self.latest() else {
                continue;
            };
            let removed = self.purge_expired(now_ms, window);
            if removed > 0 {
                self.entries.shrink_to_fit();
                debug!(removed, remaining = self.len(), "Swept expired debounce entries");
            }
        }
    }

    fn purge_older_than(&self, now_ms: i64, window_ms: i64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, last| now_ms.saturating_sub(*last) < window_ms);
        before.saturating_sub(self.entries.len())
    }

    fn make_room(&self, now_ms: i64, window_ms: i64, max_entries: usize) {
        let target = max_entries - (max_entries / EVICTION_DIVISOR).max(1);
        let purged = self.purge_older_than(now_ms, window_ms);

        let excess = self.entries.len().saturating_sub(target);
        if excess == 0 {
            return;
        }

        let mut stamps: Vec<i64> = self.entries.iter().map(|entry| *entry.value()).collect();
        if excess > stamps.len() {
            return;
        }
        let (_, cutoff, _) = stamps.select_nth_unstable(excess - 1);
        let cutoff = *cutoff;

        let mut budget = excess;
        self.entries.retain(|_, last| {
            if budget > 0 && *last <= cutoff {
                budget -= 1;
                false
            } else {
                true
            }
        });
        debug!(
            purged,
            evicted = excess - budget,
            remaining = self.entries.len(),
            "Evicted oldest debounce entries at capacity"
        );
    }
}

fn window_millis(window: Duration) -> i64 {
    i64::try_from(window.as_millis()).unwrap_or(i64::MAX)
}
