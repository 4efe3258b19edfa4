use anyhow::Result;
use std::time::Duration;
use uuid::Uuid;

use crate::infra::cache::RedisCache;

/// Fleet-wide mutual exclusion for scheduled jobs, keyed by job name.
#[derive(Clone)]
pub struct DistributedLock {
    cache: RedisCache,
}

/// Proof of a held lock. Pass it back to [`DistributedLock::release`].
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    token: String,
}

impl DistributedLock {
    pub fn new(cache: RedisCache) -> Self {
        Self { cache }
    }

    /// Returns `None` when another holder owns the lock.
    pub async fn try_acquire(&self, name: &str, lock_at_most_for: Duration) -> Result<Option<LockGuard>> {
        let key = format!("lock:{}", name);
        let token = Uuid::new_v4().to_string();
        let ttl_ms = u64::try_from(lock_at_most_for.as_millis()).unwrap_or(u64::MAX).max(1);

        if self.cache.set_if_absent(&key, &token, ttl_ms).await? {
            Ok(Some(LockGuard { key, token }))
        } else {
            Ok(None)
        }
    }

    /// Returns false when the lock had already expired and moved on.
    pub async fn release(&self, guard: LockGuard) -> Result<bool> {
        self.cache.delete_if_equals(&guard.key, &guard.token).await
    }
}
