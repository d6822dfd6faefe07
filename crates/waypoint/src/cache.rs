// File: src/cache.rs
// Purpose: Resource cache keyed by match identity, with equivalence reuse and dirty invalidation

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use waypoint_router::loader::{LoadError, Loader, LoaderContext};

/// Identity of a cached resource
///
/// Two matches share a resource only when they resolved to the identical
/// concrete path and reference the same loader. Structurally equivalent
/// matches with different parameter values resolve to different paths and
/// therefore never share.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    /// Concrete path consumed from the URL start through the matched node
    pub path: String,
    /// Stable id of the loader attached to the node
    pub loader: u64,
}

/// Lifecycle of one loader invocation
#[derive(Debug, Clone)]
pub enum ResourceState {
    Pending,
    Resolved(Value),
    Rejected(LoadError),
}

/// A cached in-flight or settled loader result
///
/// Owned by the [`ResourceCache`]; navigations hold non-owning `Arc` handles
/// and register interest while they wait. The underlying work is cancelled
/// only when no pending navigation still depends on it.
pub struct Resource {
    identity: ResourceIdentity,
    state: watch::Receiver<ResourceState>,
    dirty: AtomicBool,
    interest: AtomicUsize,
    cancel: CancellationToken,
}

impl Resource {
    pub fn identity(&self) -> &ResourceIdentity {
        &self.identity
    }

    pub fn state(&self) -> ResourceState {
        self.state.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Marks this resource ineligible for reuse; the next loading phase for
    /// an equivalent match recomputes instead
    pub fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    fn is_pending(&self) -> bool {
        matches!(*self.state.borrow(), ResourceState::Pending)
    }

    /// Registers a pending navigation's interest; only called by the cache
    /// with its lock held
    fn retain(&self) {
        self.interest.fetch_add(1, Ordering::AcqRel);
    }

    /// Drops one navigation's interest; cancels the underlying work when it
    /// was the last one and the resource is still pending. Only called by
    /// the cache with its lock held, so the check-then-cancel cannot race an
    /// `obtain` that is about to reuse this entry.
    fn release(&self) {
        if self.interest.fetch_sub(1, Ordering::AcqRel) == 1 && self.is_pending() {
            self.cancel.cancel();
        }
    }

    /// Waits until the resource settles and returns the outcome
    pub async fn settled(&self) -> Result<Value, LoadError> {
        let mut rx = self.state.clone();
        // The sender side is dropped once the loader task settles the state,
        // so a closed channel still carries the final value
        let _ = rx
            .wait_for(|state| !matches!(state, ResourceState::Pending))
            .await;
        let state = rx.borrow().clone();
        match state {
            ResourceState::Resolved(value) => Ok(value),
            ResourceState::Rejected(err) => Err(err),
            ResourceState::Pending => Err(LoadError::Cancelled),
        }
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("identity", &self.identity)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

/// Shared cache of loader resources, keyed by [`ResourceIdentity`]
///
/// Lookup-then-insert happens under one lock before any await point, so two
/// navigations racing to the same identity in the same tick can never both
/// miss and issue duplicate work.
#[derive(Default)]
pub struct ResourceCache {
    inner: Mutex<HashMap<ResourceIdentity, Arc<Resource>>>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a reusable resource: present, not dirty, and not rejected
    ///
    /// Rejected resources are deliberately not reusable, so a failed loader
    /// is retried on the next navigation instead of pinning its failure.
    pub fn find(&self, identity: &ResourceIdentity) -> Option<Arc<Resource>> {
        let inner = self.inner.lock().unwrap();
        inner
            .get(identity)
            .filter(|res| !res.is_dirty() && !matches!(res.state(), ResourceState::Rejected(_)))
            .cloned()
    }

    /// Returns the resource for an identity, reusing an equivalent non-dirty
    /// one or inserting a fresh `Pending` entry and spawning the loader
    ///
    /// With `reload` set, cache consultation is skipped and a fresh resource
    /// always replaces the entry. The lookup and insert are a single atomic
    /// step; the loader itself runs on a spawned task. The returned resource
    /// already carries the caller's interest; balance it with [`release`].
    ///
    /// [`release`]: ResourceCache::release
    pub fn obtain(
        &self,
        identity: ResourceIdentity,
        loader: &Loader,
        context: LoaderContext,
        reload: bool,
    ) -> Arc<Resource> {
        let mut inner = self.inner.lock().unwrap();

        if !reload {
            if let Some(existing) = inner.get(&identity) {
                if !existing.is_dirty()
                    && !matches!(existing.state(), ResourceState::Rejected(_))
                {
                    tracing::debug!(
                        target: "waypoint::cache",
                        path = %identity.path,
                        "reusing cached resource"
                    );
                    existing.retain();
                    return Arc::clone(existing);
                }
            }
        }

        let (tx, rx) = watch::channel(ResourceState::Pending);
        let cancel = CancellationToken::new();
        let resource = Arc::new(Resource {
            identity: identity.clone(),
            state: rx,
            dirty: AtomicBool::new(false),
            interest: AtomicUsize::new(1),
            cancel: cancel.clone(),
        });
        inner.insert(identity.clone(), Arc::clone(&resource));

        tracing::debug!(target: "waypoint::cache", path = %identity.path, "starting loader");
        let fut = loader.invoke(LoaderContext {
            cancel: cancel.clone(),
            ..context
        });
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel.cancelled() => Err(LoadError::Cancelled),
                result = fut => result,
            };
            let state = match outcome {
                Ok(value) => ResourceState::Resolved(value),
                Err(err) => ResourceState::Rejected(err),
            };
            // Receivers observe the final state even after the sender drops
            let _ = tx.send(state);
        });

        resource
    }

    /// Drops one navigation's interest in a resource obtained from this cache
    ///
    /// Held under the cache lock, so it serializes against concurrent
    /// `obtain` calls: a superseded navigation letting go can never cancel
    /// pending work a newer navigation has already picked up.
    pub(crate) fn release(&self, resource: &Resource) {
        let _guard = self.inner.lock().unwrap();
        resource.release();
    }

    /// Marks every resource whose identity satisfies the predicate as dirty
    pub fn mark_dirty(&self, predicate: impl Fn(&ResourceIdentity) -> bool) {
        let inner = self.inner.lock().unwrap();
        for (identity, resource) in inner.iter() {
            if predicate(identity) {
                resource.mark_dirty();
            }
        }
    }

    /// Number of cached entries, settled or pending
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn identity(path: &str, loader: &Loader) -> ResourceIdentity {
        ResourceIdentity {
            path: path.to_string(),
            loader: loader.id(),
        }
    }

    fn context() -> LoaderContext {
        LoaderContext {
            url: "/users".to_string(),
            params: HashMap::new(),
            splat: Vec::new(),
            cancel: CancellationToken::new(),
        }
    }

    fn counting_loader(counter: Arc<AtomicUsize>) -> Loader {
        Loader::from_fn(move |_cx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(json!("data"))
            }
        })
    }

    #[tokio::test]
    async fn test_obtain_reuses_same_identity() {
        let cache = ResourceCache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(Arc::clone(&counter));
        let id = identity("/users", &loader);

        let first = cache.obtain(id.clone(), &loader, context(), false);
        let second = cache.obtain(id.clone(), &loader, context(), false);
        assert!(Arc::ptr_eq(&first, &second));

        first.settled().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_different_loader_ids_do_not_share() {
        let cache = ResourceCache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let a = counting_loader(Arc::clone(&counter));
        let b = counting_loader(Arc::clone(&counter));

        let first = cache.obtain(identity("/users", &a), &a, context(), false);
        let second = cache.obtain(identity("/users", &b), &b, context(), false);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_dirty_resource_is_replaced() {
        let cache = ResourceCache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(Arc::clone(&counter));
        let id = identity("/users", &loader);

        let first = cache.obtain(id.clone(), &loader, context(), false);
        first.settled().await.unwrap();
        cache.mark_dirty(|candidate| candidate.path == "/users");

        let second = cache.obtain(id.clone(), &loader, context(), false);
        assert!(!Arc::ptr_eq(&first, &second));
        second.settled().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reload_bypasses_cache() {
        let cache = ResourceCache::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let loader = counting_loader(Arc::clone(&counter));
        let id = identity("/users", &loader);

        cache.obtain(id.clone(), &loader, context(), false).settled().await.unwrap();
        cache.obtain(id.clone(), &loader, context(), true).settled().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_rejected_resource_not_reused() {
        let cache = ResourceCache::new();
        let loader = Loader::from_fn(|_cx| async {
            Err(LoadError::Message("boom".to_string()))
        });
        let id = identity("/broken", &loader);

        let first = cache.obtain(id.clone(), &loader, context(), false);
        assert!(first.settled().await.is_err());
        assert!(cache.find(&id).is_none());

        let second = cache.obtain(id.clone(), &loader, context(), false);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_release_of_last_interest_cancels_pending_work() {
        let cache = ResourceCache::new();
        let loader = Loader::from_fn(|cx: LoaderContext| async move {
            cx.cancel.cancelled().await;
            Err(LoadError::Cancelled)
        });
        let id = identity("/slow", &loader);

        // Two navigations share the same pending work
        let resource = cache.obtain(id.clone(), &loader, context(), false);
        let shared = cache.obtain(id, &loader, context(), false);
        assert!(Arc::ptr_eq(&resource, &shared));

        cache.release(&resource);
        assert!(resource.is_pending());

        cache.release(&shared);
        assert_eq!(resource.settled().await, Err(LoadError::Cancelled));
    }

    #[tokio::test]
    async fn test_reobtained_pending_work_survives_older_release() {
        // A superseded navigation letting go must not tear down work a newer
        // navigation has already picked up from the cache
        let cache = ResourceCache::new();
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let loader = {
            let gate = Arc::clone(&gate);
            Loader::from_fn(move |_cx| {
                let gate = Arc::clone(&gate);
                async move {
                    let _permit = gate.acquire().await.map_err(|_| LoadError::Cancelled)?;
                    Ok(json!("slow"))
                }
            })
        };
        let id = identity("/items", &loader);

        let older = cache.obtain(id.clone(), &loader, context(), false);
        let newer = cache.obtain(id, &loader, context(), false);
        cache.release(&older);
        assert!(newer.is_pending());

        gate.add_permits(1);
        assert_eq!(newer.settled().await, Ok(json!("slow")));
        cache.release(&newer);
    }
}
