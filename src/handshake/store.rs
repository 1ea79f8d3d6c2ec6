//! Handshake storage with atomic single-use consumption.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::now_unix_seconds;

/// Consumed and expired records are kept this long past `expires_at`, so late
/// replays report "already consumed" or "expired" instead of "unknown".
pub const DEFAULT_RETENTION_SECONDS: i64 = 10 * 60;

/// Records [`MemoryHandshakeStore`] holds before refusing new handshakes.
pub const DEFAULT_MAX_HANDSHAKES: usize = 10_000;

/// Returned by [`HandshakeStore::put`] when no room is left for another record.
#[derive(Debug, Error)]
#[error("handshake store is full ({capacity} records)")]
pub struct HandshakeStoreFull {
    pub capacity: usize,
}

/// Server-side record of one pending login attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakeState {
    pub state: String,
    pub nonce: String,
    pub redirect_target: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl HandshakeState {
    #[must_use]
    pub fn is_expired(&self, now_unix_seconds: i64) -> bool {
        now_unix_seconds >= self.expires_at
    }
}

/// Result of [`HandshakeStore::take`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TakeOutcome {
    /// The caller is the only one that will ever see this record as unconsumed.
    Taken(HandshakeState),
    Consumed,
    Unknown,
}

#[async_trait]
pub trait HandshakeStore: Send + Sync {
    /// Persist a new handshake under `id`.
    async fn put(&self, id: &str, handshake: &HandshakeState) -> Result<()>;

    /// Read and invalidate the handshake in one atomic step.
    ///
    /// Concurrent callers racing on the same `id` get at most one
    /// [`TakeOutcome::Taken`]; everyone else sees [`TakeOutcome::Consumed`].
    async fn take(&self, id: &str) -> Result<TakeOutcome>;
}

struct Entry {
    handshake: HandshakeState,
    consumed: bool,
}

/// Process-local handshake store.
///
/// Bounded by `max_entries`; consumed records are evicted first when it fills up.
pub struct MemoryHandshakeStore {
    retention_seconds: i64,
    max_entries: usize,
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryHandshakeStore {
    #[must_use]
    pub fn new(retention_seconds: i64) -> Self {
        Self {
            retention_seconds,
            max_entries: DEFAULT_MAX_HANDSHAKES,
            entries: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

impl Default for MemoryHandshakeStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_SECONDS)
    }
}

#[async_trait]
impl HandshakeStore for MemoryHandshakeStore {
    async fn put(&self, id: &str, handshake: &HandshakeState) -> Result<()> {
        let now = now_unix_seconds();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| {
            entry.handshake.expires_at.saturating_add(self.retention_seconds) > now
        });
        if entries.len() >= self.max_entries {
            entries.retain(|_, entry| !entry.consumed);
        }
        if entries.len() >= self.max_entries {
            return Err(HandshakeStoreFull {
                capacity: self.max_entries,
            }
            .into());
        }
        entries.insert(
            id.to_string(),
            Entry {
                handshake: handshake.clone(),
                consumed: false,
            },
        );
        Ok(())
    }

    async fn take(&self, id: &str) -> Result<TakeOutcome> {
        let mut entries = self.entries.lock().await;
        let outcome = match entries.get_mut(id) {
            None => TakeOutcome::Unknown,
            Some(entry) if entry.consumed => TakeOutcome::Consumed,
            Some(entry) => {
                entry.consumed = true;
                TakeOutcome::Taken(entry.handshake.clone())
            }
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn handshake(expires_at: i64) -> HandshakeState {
        HandshakeState {
            state: "state".to_string(),
            nonce: "nonce".to_string(),
            redirect_target: "/".to_string(),
            created_at: 0,
            expires_at,
        }
    }

    #[tokio::test]
    async fn take_is_single_use() -> Result<()> {
        let store = MemoryHandshakeStore::default();
        let record = handshake(now_unix_seconds() + 60);
        store.put("h1", &record).await?;

        assert_eq!(store.take("h1").await?, TakeOutcome::Taken(record));
        assert_eq!(store.take("h1").await?, TakeOutcome::Consumed);
        assert_eq!(store.take("missing").await?, TakeOutcome::Unknown);
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_takes_have_one_winner() -> Result<()> {
        let store = Arc::new(MemoryHandshakeStore::default());
        store.put("h1", &handshake(now_unix_seconds() + 60)).await?;

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move { store.take("h1").await }));
        }

        let mut taken = 0;
        let mut consumed = 0;
        for task in tasks {
            match task.await?? {
                TakeOutcome::Taken(_) => taken += 1,
                TakeOutcome::Consumed => consumed += 1,
                TakeOutcome::Unknown => {}
            }
        }
        assert_eq!(taken, 1);
        assert_eq!(consumed, 31);
        Ok(())
    }

    #[tokio::test]
    async fn put_reclaims_records_past_retention() -> Result<()> {
        let store = MemoryHandshakeStore::new(0);
        store.put("old", &handshake(now_unix_seconds() - 1)).await?;
        store.put("new", &handshake(now_unix_seconds() + 60)).await?;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.take("old").await?, TakeOutcome::Unknown);
        Ok(())
    }

    #[tokio::test]
    async fn put_refuses_records_beyond_capacity() -> Result<()> {
        let store = MemoryHandshakeStore::default().with_max_entries(2);
        let record = handshake(now_unix_seconds() + 60);
        store.put("h1", &record).await?;
        store.put("h2", &record).await?;

        let err = store.put("h3", &record).await.err();
        assert!(err.is_some_and(|err| err.is::<HandshakeStoreFull>()));
        assert_eq!(store.take("h3").await?, TakeOutcome::Unknown);

        // Consumed records make room again.
        assert!(matches!(store.take("h1").await?, TakeOutcome::Taken(_)));
        store.put("h3", &record).await?;
        assert_eq!(store.len().await, 2);
        assert!(matches!(store.take("h3").await?, TakeOutcome::Taken(_)));
        Ok(())
    }

    #[test]
    fn expiry_is_inclusive() {
        let record = handshake(100);
        assert!(!record.is_expired(99));
        assert!(record.is_expired(100));
    }
}
