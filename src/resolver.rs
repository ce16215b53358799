//! DNS query resolution logic.
//!
//! The core pipeline shared by transports:
//! 1. Derive the cache key from the question
//! 2. Serve fresh cached answers under the caller's transaction id
//! 3. Otherwise resolve upstream, apply the TTL policy, populate the cache
//!
//! Transports handle the actual I/O, the resolver handles decisions.

use std::time::{Duration, Instant};

use hickory_proto::op::{Message, ResponseCode};
use tracing::{debug, warn};

use crate::cache::{CacheKey, ResponseCache};
use crate::stats::{Stats, StatsSnapshot};
use crate::upstream::Upstream;

/// Default TTL for cached NXDOMAIN answers. Caching the non-existence
/// briefly keeps repeated lookups for dead names off the upstream.
pub const DEFAULT_NXDOMAIN_TTL: Duration = Duration::from_secs(60);

/// Default TTL for other answerless responses (SERVFAIL and friends);
/// short, so transient upstream trouble is not remembered for long.
pub const DEFAULT_FAILURE_TTL: Duration = Duration::from_secs(30);

/// Resolver owns the cache and the upstream client; transports share one
/// instance behind an `Arc` and call [`resolve`] per inbound query.
///
/// [`resolve`]: Resolver::resolve
pub struct Resolver<U> {
    cache: ResponseCache,
    upstream: U,
    stats: Stats,
    nxdomain_ttl: Duration,
    failure_ttl: Duration,
}

impl<U: Upstream> Resolver<U> {
    pub fn new(upstream: U, nxdomain_ttl: Duration, failure_ttl: Duration) -> Self {
        Self {
            cache: ResponseCache::new(),
            upstream,
            stats: Stats::new(),
            nxdomain_ttl,
            failure_ttl,
        }
    }

    /// Resolve one inbound query to the reply that should be written back.
    ///
    /// `None` means the request is dropped without a reply: the query
    /// carried no question, or the upstream exchange failed. The requester's
    /// own resend-on-timeout covers both.
    pub async fn resolve(&self, query: &Message) -> Option<Message> {
        let start = Instant::now();

        let Some(question) = query.queries().first() else {
            debug!(id = query.id(), "query without question section, dropping");
            return None;
        };
        let key = CacheKey::new(&question.name().to_utf8(), question.query_type());

        if let Some(mut cached) = self.cache.lookup(&key) {
            // The cached copy still carries the id it was resolved under;
            // the reply must carry this requester's.
            cached.set_id(query.id());
            self.stats.record_hit(start.elapsed());
            debug!(%key, "cache hit");
            return Some(cached);
        }

        debug!(%key, "cache miss, resolving over DoH");
        match self.upstream.resolve(query).await {
            Ok(response) => {
                let ttl = self.response_ttl(&response);
                self.cache.store(key, response.clone(), ttl);
                self.stats.record_miss(start.elapsed());
                Some(response)
            }
            Err(error) => {
                self.stats.record_failure();
                warn!(%key, %error, "upstream resolution failed, dropping query");
                None
            }
        }
    }

    /// TTL policy, evaluated in order: the first answer record's TTL, the
    /// NXDOMAIN negative TTL, the short TTL for anything else answerless.
    fn response_ttl(&self, response: &Message) -> Duration {
        if let Some(first) = response.answers().first() {
            Duration::from_secs(u64::from(first.ttl()))
        } else if response.response_code() == ResponseCode::NXDomain {
            self.nxdomain_ttl
        } else {
            self.failure_ttl
        }
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop expired cache entries; called by the periodic maintenance task.
    pub fn sweep_cache(&self) -> usize {
        self.cache.remove_expired()
    }

    pub fn stats_snapshot_and_reset(&self) -> StatsSnapshot {
        self.stats.snapshot_and_reset()
    }
}
