use std::collections::HashSet;
use std::time::{Duration, Instant};

/// A cached value with its expiry and invalidation tags.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub created_at: Instant,
    pub ttl: Duration,
    /// Always contains the owning tenant's id alongside caller-supplied tags.
    pub tags: HashSet<String>,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, ttl: Duration, tags: HashSet<String>) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
            tags,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }

    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        tags.iter().any(|t| self.tags.contains(t))
    }
}
