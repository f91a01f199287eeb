use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tag_resolver::{ResolveError, Resolver};
use tokio::sync::{OnceCell, Semaphore};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub identity: String,
    pub tag: String,
}

/// Run-scoped memo of resolver answers keyed by identity + tag.
///
/// Each key owns an async once-cell: the first caller runs the resolver,
/// concurrent callers for the same key wait on that single call, distinct
/// keys proceed in parallel. Failures leave the cell empty so the next
/// caller retries. Nothing expires; a new run builds a new cache.
pub struct ResolutionCache {
    resolver: Arc<dyn Resolver>,
    entries: Mutex<HashMap<CacheKey, Arc<OnceCell<String>>>>,
    limiter: Option<Semaphore>,
    calls: AtomicUsize,
}

impl ResolutionCache {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self {
            resolver,
            entries: Mutex::new(HashMap::new()),
            limiter: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Cap the number of resolver calls in flight at once.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.limiter = Some(Semaphore::new(max.max(1)));
        self
    }

    fn cell_for(&self, identity: &str, tag: &str) -> Arc<OnceCell<String>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let key = CacheKey {
            identity: identity.to_string(),
            tag: tag.to_string(),
        };
        Arc::clone(entries.entry(key).or_default())
    }

    pub async fn get_or_resolve(&self, identity: &str, tag: &str) -> tag_resolver::Result<String> {
        let cell = self.cell_for(identity, tag);
        let value = cell
            .get_or_try_init(|| async {
                let _permit = match &self.limiter {
                    Some(limiter) => Some(limiter.acquire().await.map_err(|_| {
                        ResolveError::Transient("resolution limiter closed".into())
                    })?),
                    None => None,
                };
                self.calls.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(identity, tag, "resolving tag");
                self.resolver.resolve(identity, tag).await
            })
            .await?;
        Ok(value.clone())
    }

    /// Value already resolved for this key, if any.
    pub fn cached(&self, identity: &str, tag: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let key = CacheKey {
            identity: identity.to_string(),
            tag: tag.to_string(),
        };
        entries.get(&key).and_then(|cell| cell.get().cloned())
    }

    /// How many times the underlying resolver has been invoked.
    pub fn resolver_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}
