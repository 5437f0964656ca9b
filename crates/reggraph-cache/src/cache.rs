use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use reggraph_core::{CacheSettings, Result, TenantId};

use crate::CacheEntry;

/// Point-in-time counters for cache behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub size: usize,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

/// Called once per invalidated entry with the full `<tenant>:<key>` and the
/// entry's tag set. Errors are logged and swallowed.
pub type InvalidationCallback = dyn Fn(&str, &HashSet<String>) -> Result<()> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ListenerMap = HashMap<u64, Arc<InvalidationCallback>>;

/// Process-wide key/value cache with per-entry TTL and tag sets. Entries are
/// namespaced `<tenant>:<key>`; every entry carries its tenant id as a tag, so
/// tenant-scoped invalidation can never cross tenants. Expired entries are
/// dropped inline on read (counted as evictions) and by a periodic background
/// sweep.
pub struct TagCache<V> {
    entries: Arc<DashMap<String, CacheEntry<V>>>,
    listeners: Arc<RwLock<ListenerMap>>,
    listener_seq: Arc<AtomicU64>,
    counters: Arc<Counters>,
    settings: CacheSettings,
    shutdown_token: CancellationToken,
}

impl<V> Clone for TagCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            listeners: self.listeners.clone(),
            listener_seq: self.listener_seq.clone(),
            counters: self.counters.clone(),
            settings: self.settings.clone(),
            shutdown_token: self.shutdown_token.clone(),
        }
    }
}

impl<V> Default for TagCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> TagCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    pub fn with_settings(settings: CacheSettings) -> Self {
        let cache = Self {
            entries: Arc::new(DashMap::new()),
            listeners: Arc::new(RwLock::new(HashMap::new())),
            listener_seq: Arc::new(AtomicU64::new(0)),
            counters: Arc::new(Counters::default()),
            settings,
            shutdown_token: CancellationToken::new(),
        };
        cache.spawn_sweeper();
        cache
    }

    fn spawn_sweeper(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            debug!("no tokio runtime; cache expiry relies on inline eviction only");
            return;
        };
        let entries = self.entries.clone();
        let counters = self.counters.clone();
        let listeners = self.listeners.clone();
        let token = self.shutdown_token.clone();
        let period = self.settings.sweep_interval;
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = sweep_expired(&entries, &counters, &listeners);
                        if removed > 0 {
                            debug!(removed, "cache sweep evicted expired entries");
                        }
                    }
                }
            }
        });
    }

    fn full_key(tenant_id: TenantId, key: &str) -> String {
        format!("{tenant_id}:{key}")
    }

    /// Stores `value`. The entry's effective tag set is `{tenant} ∪ tags`;
    /// a missing TTL falls back to the configured default.
    pub fn set(
        &self,
        tenant_id: TenantId,
        key: &str,
        value: V,
        ttl: Option<Duration>,
        tags: Vec<String>,
    ) {
        let mut tag_set: HashSet<String> = tags.into_iter().collect();
        tag_set.insert(tenant_id.to_string());
        let entry = CacheEntry::new(value, ttl.unwrap_or(self.settings.default_ttl), tag_set);
        self.entries.insert(Self::full_key(tenant_id, key), entry);
    }

    /// Returns the live value, dropping an expired entry inline.
    pub fn get(&self, tenant_id: TenantId, key: &str) -> Option<V> {
        let full = Self::full_key(tenant_id, key);
        let expired = match self.entries.get(&full) {
            Some(entry) if !entry.is_expired() => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            if let Some((removed_key, entry)) =
                self.entries.remove_if(&full, |_, e| e.is_expired())
            {
                self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                self.notify(&removed_key, &entry.tags);
            }
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn has(&self, tenant_id: TenantId, key: &str) -> bool {
        self.get(tenant_id, key).is_some()
    }

    /// Removes the entry and fires invalidation callbacks with its tags.
    pub fn delete(&self, tenant_id: TenantId, key: &str) -> bool {
        match self.entries.remove(&Self::full_key(tenant_id, key)) {
            Some((removed_key, entry)) => {
                self.notify(&removed_key, &entry.tags);
                true
            }
            None => false,
        }
    }

    /// Removes every entry belonging to the tenant.
    pub fn invalidate_tenant(&self, tenant_id: TenantId) -> usize {
        let tenant_tag = tenant_id.to_string();
        self.invalidate_matching(move |tags| tags.contains(&tenant_tag))
    }

    pub fn invalidate_by_tag(&self, tag: &str) -> usize {
        self.invalidate_by_tags(&[tag.to_string()])
    }

    /// Union semantics: an entry is removed if it carries any of `tags`.
    pub fn invalidate_by_tags(&self, tags: &[String]) -> usize {
        let tags = tags.to_vec();
        self.invalidate_matching(move |entry_tags| tags.iter().any(|t| entry_tags.contains(t)))
    }

    /// Union semantics restricted to one tenant's entries.
    pub fn invalidate_scoped(&self, tenant_id: TenantId, tags: &[String]) -> usize {
        let tenant_tag = tenant_id.to_string();
        let tags = tags.to_vec();
        self.invalidate_matching(move |entry_tags| {
            entry_tags.contains(&tenant_tag) && tags.iter().any(|t| entry_tags.contains(t))
        })
    }

    fn invalidate_matching<F>(&self, matches: F) -> usize
    where
        F: Fn(&HashSet<String>) -> bool,
    {
        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|e| matches(&e.value().tags))
            .map(|e| e.key().clone())
            .collect();

        let mut removed = 0;
        for key in candidates {
            // remove_if re-checks under the shard lock, so a concurrent
            // invalidation cannot double-notify for the same entry.
            if let Some((removed_key, entry)) = self.entries.remove_if(&key, |_, e| matches(&e.tags))
            {
                self.notify(&removed_key, &entry.tags);
                removed += 1;
            }
        }
        removed
    }

    /// Installs a callback invoked once per invalidated entry.
    pub fn on_invalidation<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&str, &HashSet<String>) -> Result<()> + Send + Sync + 'static,
    {
        let id = self.listener_seq.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().insert(id, Arc::new(callback));
        ListenerId(id)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.write().remove(&id.0).is_some()
    }

    fn notify(&self, key: &str, tags: &HashSet<String>) {
        notify_listeners(&self.listeners, key, tags);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            size: self.entries.len(),
        }
    }

    pub fn reset_stats(&self) {
        self.counters.hits.store(0, Ordering::Relaxed);
        self.counters.misses.store(0, Ordering::Relaxed);
        self.counters.evictions.store(0, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Stops the background sweep and drops all state. Call during orderly
    /// teardown.
    pub fn shutdown(&self) {
        self.shutdown_token.cancel();
        self.entries.clear();
        self.listeners.write().clear();
    }
}

fn sweep_expired<V>(
    entries: &DashMap<String, CacheEntry<V>>,
    counters: &Counters,
    listeners: &RwLock<ListenerMap>,
) -> usize {
    let expired: Vec<String> = entries
        .iter()
        .filter(|e| e.value().is_expired())
        .map(|e| e.key().clone())
        .collect();

    let mut removed = 0;
    for key in expired {
        if let Some((removed_key, entry)) = entries.remove_if(&key, |_, e| e.is_expired()) {
            counters.evictions.fetch_add(1, Ordering::Relaxed);
            notify_listeners(listeners, &removed_key, &entry.tags);
            removed += 1;
        }
    }
    removed
}

fn notify_listeners(listeners: &RwLock<ListenerMap>, key: &str, tags: &HashSet<String>) {
    let snapshot: Vec<Arc<InvalidationCallback>> = listeners.read().values().cloned().collect();
    for callback in snapshot {
        if let Err(e) = callback(key, tags) {
            warn!("invalidation listener failed for {key}: {e:?}");
        }
    }
}
