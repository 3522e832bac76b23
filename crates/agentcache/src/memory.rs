use crate::AgentCache;
use async_trait::async_trait;
use chessmate_protocol::AgentEvaluation;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Fixed-capacity in-memory cache (spec.md §4.4 "In-memory LRU").
/// `find` peeks rather than promotes, so a read-heavy workload doesn't
/// perturb eviction order — the spec allows promote-on-read as a
/// faithful alternative, but this keeps `find` side-effect free.
pub struct InMemoryAgentCache {
    inner: Mutex<LruCache<String, AgentEvaluation>>,
}

impl InMemoryAgentCache {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AgentCache for InMemoryAgentCache {
    async fn find(&self, key: &str) -> Option<AgentEvaluation> {
        self.inner.lock().peek(key).cloned()
    }

    async fn store(&self, key: &str, entry: AgentEvaluation) {
        self.inner.lock().put(key.to_string(), entry);
    }

    async fn ping(&self) -> crate::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chessmate_protocol::AgentEvaluation;

    fn eval(game_id: i64, score: f32) -> AgentEvaluation {
        AgentEvaluation {
            game_id,
            score,
            explanation: None,
            themes: vec![],
            reasoning_effort: "low".into(),
            usage: None,
        }
    }

    #[tokio::test]
    async fn stores_and_finds_entries() {
        let cache = InMemoryAgentCache::new(NonZeroUsize::new(2).unwrap());
        cache.store("a", eval(1, 0.5)).await;
        assert_eq!(cache.find("a").await.map(|e| e.game_id), Some(1));
        assert_eq!(cache.find("missing").await, None);
    }

    #[tokio::test]
    async fn evicts_oldest_entry_once_over_capacity() {
        let cache = InMemoryAgentCache::new(NonZeroUsize::new(2).unwrap());
        cache.store("a", eval(1, 0.1)).await;
        cache.store("b", eval(2, 0.2)).await;
        cache.store("c", eval(3, 0.3)).await;
        assert_eq!(cache.find("a").await, None);
        assert!(cache.find("b").await.is_some());
        assert!(cache.find("c").await.is_some());
    }

    #[tokio::test]
    async fn ping_always_succeeds() {
        let cache = InMemoryAgentCache::new(NonZeroUsize::new(1).unwrap());
        assert!(cache.ping().await.is_ok());
    }
}
