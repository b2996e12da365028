use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// (member id, guild id)
pub type MemberKey = (u64, u64);

struct Entry {
    authorized: bool,
    inserted_at: Instant,
}

/// Memoized role-authorization results.
///
/// Bounded by capacity (least recently used entries are evicted first). When
/// `ttl` is `None` an entry stays valid until it is invalidated or evicted,
/// so role changes made after the first check are not observed.
#[derive(Clone)]
pub struct RoleCache {
    cache: Arc<Mutex<LruCache<MemberKey, Entry>>>,
    ttl: Option<Duration>,
}

impl RoleCache {
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN.saturating_add(99));
        Self {
            cache: Arc::new(Mutex::new(LruCache::new(cap))),
            ttl,
        }
    }

    pub fn get(&self, key: MemberKey) -> Option<bool> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match cache.get(&key) {
            Some(entry) => match self.ttl {
                Some(ttl) if entry.inserted_at.elapsed() >= ttl => true,
                _ => return Some(entry.authorized),
            },
            None => return None,
        };
        if expired {
            cache.pop(&key);
        }
        None
    }

    pub fn insert(&self, key: MemberKey, authorized: bool) {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.put(
            key,
            Entry {
                authorized,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop the entry for one member. Returns whether anything was cached.
    pub fn invalidate(&self, key: MemberKey) -> bool {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        cache.pop(&key).is_some()
    }

    /// Drop every entry belonging to a guild. Returns the number removed.
    pub fn invalidate_guild(&self, guild_id: u64) -> usize {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let stale: Vec<MemberKey> = cache
            .iter()
            .filter(|((_, guild), _)| *guild == guild_id)
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            cache.pop(key);
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
