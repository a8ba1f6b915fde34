//! Read-cache invalidation driven by lifecycle events.
//!
//! List queries are cached under `"<resource>:list:<variant>"` keys. Any
//! lifecycle change to an aggregate makes its cached lists stale, so the
//! [`CacheInvalidationHandler`] evicts the matching pattern on every
//! Created/Updated/Deleted event. Eviction is best-effort like every other
//! consumer: a miss or an empty cache is not an error.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use fleetops_events::{DomainEvent, EventDispatcher, EventHandler, EventKind, HandlerError};

use crate::audit::AUDITED_AGGREGATES;

/// In-process cache for rendered list queries.
///
/// Keys follow the `"<resource>:list:<variant>"` convention; invalidation
/// uses a trailing-`*` prefix glob, mirroring how the web tier names its
/// cached pages.
#[derive(Debug, Default)]
pub struct ReadCache {
    entries: RwLock<HashMap<String, JsonValue>>,
}

impl ReadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: impl Into<String>, value: JsonValue) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), value);
        }
    }

    pub fn get(&self, key: &str) -> Option<JsonValue> {
        self.entries.read().ok().and_then(|e| e.get(key).cloned())
    }

    /// Evict every key matching `pattern`; returns the eviction count.
    ///
    /// A pattern ending in `*` matches by prefix; anything else matches
    /// exactly.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            warn!(pattern, "read cache lock poisoned; skipping invalidation");
            return 0;
        };

        match pattern.strip_suffix('*') {
            Some(prefix) => {
                let before = entries.len();
                entries.retain(|key, _| !key.starts_with(prefix));
                before - entries.len()
            }
            None => usize::from(entries.remove(pattern).is_some()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key pattern covering every cached list of the given aggregate,
/// e.g. `"Vehicle"` → `"vehicles:list:*"`, `"Company"` → `"companies:list:*"`.
fn list_pattern(aggregate_type: &str) -> String {
    let lower = aggregate_type.to_lowercase();
    let plural = match lower.strip_suffix('y') {
        Some(stem) => format!("{stem}ies"),
        None => format!("{lower}s"),
    };
    format!("{plural}:list:*")
}

/// Evicts stale list caches when an aggregate changes.
#[derive(Debug)]
pub struct CacheInvalidationHandler {
    cache: Arc<ReadCache>,
}

impl CacheInvalidationHandler {
    pub fn new(cache: Arc<ReadCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl EventHandler for CacheInvalidationHandler {
    fn name(&self) -> &'static str {
        "cache-invalidation"
    }

    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        let pattern = list_pattern(event.aggregate_type());
        let evicted = self.cache.invalidate_pattern(&pattern);
        debug!(
            event_type = event.event_type(),
            %pattern,
            evicted,
            "invalidated cached lists"
        );
        Ok(())
    }
}

/// Subscribe cache invalidation to the same lifecycle set the audit trail
/// tracks. Called once during process bootstrap.
pub fn register_cache_invalidation(
    dispatcher: &EventDispatcher,
    handler: Arc<CacheInvalidationHandler>,
) {
    for aggregate in AUDITED_AGGREGATES {
        for kind in EventKind::ALL {
            dispatcher.subscribe(kind.event_type_for(aggregate), handler.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_pattern_pluralizes_resource_names() {
        assert_eq!(list_pattern("Vehicle"), "vehicles:list:*");
        assert_eq!(list_pattern("Company"), "companies:list:*");
        assert_eq!(list_pattern("Cost"), "costs:list:*");
    }

    #[test]
    fn prefix_pattern_evicts_only_matching_keys() {
        let cache = ReadCache::new();
        cache.put("vehicles:list:page-1", json!([1, 2]));
        cache.put("vehicles:list:page-2", json!([3]));
        cache.put("drivers:list:page-1", json!([4]));

        let evicted = cache.invalidate_pattern("vehicles:list:*");

        assert_eq!(evicted, 2);
        assert!(cache.get("vehicles:list:page-1").is_none());
        assert!(cache.get("vehicles:list:page-2").is_none());
        assert_eq!(cache.get("drivers:list:page-1"), Some(json!([4])));
    }

    #[test]
    fn exact_pattern_evicts_a_single_key() {
        let cache = ReadCache::new();
        cache.put("routes:list:page-1", json!([]));
        cache.put("routes:list:page-2", json!([]));

        assert_eq!(cache.invalidate_pattern("routes:list:page-1"), 1);
        assert_eq!(cache.invalidate_pattern("routes:list:page-1"), 0);
        assert_eq!(cache.len(), 1);
    }
}
