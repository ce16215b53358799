//! DNS response cache with TTL-based expiration.

use std::fmt;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use hickory_proto::op::Message;
use hickory_proto::rr::RecordType;
use rustc_hash::FxHashMap;

/// Key identifying a distinct question: lowercased name plus record type.
///
/// Lowercasing happens once at construction, so `EXAMPLE.com` and
/// `example.com` share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    name: String,
    qtype: RecordType,
}

impl CacheKey {
    pub fn new(name: &str, qtype: RecordType) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            qtype,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.qtype)
    }
}

struct CacheEntry {
    message: Message,
    expires_at: Instant,
}

/// TTL-based cache of resolved DNS messages.
///
/// A single read/write lock over the whole map: concurrent readers, one
/// exclusive writer. Entries are only served strictly before their expiry;
/// expired entries are removed lazily on lookup, and [`remove_expired`]
/// sweeps the rest.
///
/// [`remove_expired`]: ResponseCache::remove_expired
pub struct ResponseCache {
    entries: RwLock<FxHashMap<CacheKey, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Look up a fresh entry, returning a copy of the cached message.
    ///
    /// Expired entries behave as absent. The returned clone is the caller's
    /// to mutate (transaction-id rewriting must never touch shared state).
    pub fn lookup(&self, key: &CacheKey) -> Option<Message> {
        let now = Instant::now();

        {
            let Ok(entries) = self.entries.read() else {
                return None;
            };
            match entries.get(key) {
                Some(entry) if now < entry.expires_at => {
                    return Some(entry.message.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Entry exists but is stale: drop it under the write lock.
        let Ok(mut entries) = self.entries.write() else {
            return None;
        };
        if let Some(entry) = entries.get(key) {
            if now >= entry.expires_at {
                entries.remove(key);
            }
        }
        None
    }

    /// Insert or overwrite the entry for `key`, expiring `ttl` from now.
    ///
    /// Visible to every subsequent lookup as soon as the call returns. A
    /// store always replaces the prior entry wholesale.
    pub fn store(&self, key: CacheKey, message: Message, ttl: Duration) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };
        entries.insert(
            key,
            CacheEntry {
                message,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn remove_expired(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| now < entry.expires_at);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
