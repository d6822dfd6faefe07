// File: src/scheduler.rs
// Purpose: Navigation lifecycle orchestration: actions, loader fan-out, cancellation, commits

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use waypoint_router::config::{RouteConfigNode, RouteTree};
use waypoint_router::loader::{ActionContext, LoadError, LoaderContext};
use waypoint_router::matcher::Match;
use waypoint_router::path::{normalize_path, split_search};

use crate::cache::{Resource, ResourceCache, ResourceIdentity};
use crate::events::RouterEvent;

/// Redirect chains longer than this fail the navigation instead of looping
const MAX_REDIRECT_HOPS: usize = 8;

static NEXT_NAVIGATION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle state of one navigation
///
/// `Starting → (Submitting)? → Loading → Committing → Complete`, with
/// `Aborted` and `Cancelled` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationState {
    Starting,
    Submitting,
    Loading,
    Committing,
    Complete,
    Aborted,
    Cancelled,
}

impl NavigationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NavigationState::Complete | NavigationState::Aborted | NavigationState::Cancelled
        )
    }
}

/// Options controlling one navigation
#[derive(Debug, Clone)]
pub struct NavigateOptions {
    /// Submission payload; presence selects the action path
    pub submission: Option<Value>,
    /// Replace the current history entry instead of pushing
    pub replace: bool,
    /// Skip cache consultation and re-fetch every segment
    pub reload: bool,
    /// After a successful submission, mark the submitted route's resources
    /// dirty so the loading phase recomputes them
    pub revalidate: bool,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            submission: None,
            replace: false,
            reload: false,
            revalidate: true,
        }
    }
}

impl NavigateOptions {
    pub fn with_submission(mut self, data: Value) -> Self {
        self.submission = Some(data);
        self
    }

    pub fn with_replace(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn with_reload(mut self) -> Self {
        self.reload = true;
        self
    }

    pub fn without_revalidate(mut self) -> Self {
        self.revalidate = false;
        self
    }
}

/// One in-flight or finished routing transition
///
/// Ephemeral: created per triggered navigation, torn down when superseded,
/// completed, or aborted. Owns its cancellation controller; the controller is
/// signalled on teardown if work is still pending.
#[derive(Debug)]
pub struct Navigation {
    id: u64,
    url: String,
    cancel: CancellationToken,
    state: Mutex<NavigationState>,
    abort_reason: Mutex<Option<Value>>,
}

impl Navigation {
    fn new(url: String) -> Self {
        Self {
            id: NEXT_NAVIGATION_ID.fetch_add(1, Ordering::Relaxed),
            url,
            cancel: CancellationToken::new(),
            state: Mutex::new(NavigationState::Starting),
            abort_reason: Mutex::new(None),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> NavigationState {
        *self.state.lock().unwrap()
    }

    fn set_state(&self, next: NavigationState) {
        let mut state = self.state.lock().unwrap();
        if state.is_terminal() {
            return;
        }
        tracing::debug!(
            target: "waypoint::scheduler",
            nav = self.id,
            from = ?*state,
            to = ?next,
            "navigation state"
        );
        *state = next;
    }

    fn abort(&self, reason: Value) {
        *self.abort_reason.lock().unwrap() = Some(reason);
        self.cancel.cancel();
    }

    fn take_abort_reason(&self) -> Option<Value> {
        self.abort_reason.lock().unwrap().take()
    }
}

/// A committed navigation's results, exposed read-only to the rendering layer
#[derive(Debug, Clone)]
pub struct NavigationSnapshot {
    pub url: String,
    pub pathname: String,
    pub search: String,
    /// Whether the rendering layer should replace the current history entry
    /// instead of pushing a new one
    pub replace: bool,
    /// Parameters merged across the chain, deepest level winning
    pub params: HashMap<String, String>,
    /// Splat segments captured by the deepest node
    pub splat: Vec<String>,
    /// Per-segment loader outcomes, root first; segments without loaders are
    /// not represented
    pub segments: Vec<SegmentResult>,
    /// Result of the action, when the navigation carried a submission
    pub action_result: Option<Value>,
}

impl NavigationSnapshot {
    /// The deepest segment's loader outcome
    pub fn leaf_result(&self) -> Option<&Result<Value, LoadError>> {
        self.segments.last().map(|seg| &seg.result)
    }

    /// First loader failure in root-to-leaf order, if any
    pub fn first_error(&self) -> Option<&LoadError> {
        self.segments
            .iter()
            .find_map(|seg| seg.result.as_ref().err())
    }
}

/// One matched segment's loader outcome
#[derive(Debug, Clone)]
pub struct SegmentResult {
    /// Concrete path consumed through the segment's node
    pub path: String,
    pub result: Result<Value, LoadError>,
}

/// How a navigation ended
#[derive(Debug)]
pub enum NavigationOutcome {
    /// Results committed; accessors now reflect this navigation
    Committed(Arc<NavigationSnapshot>),
    /// No config node consumed the URL
    NoMatch,
    /// Superseded by a newer navigation
    Cancelled,
    /// Explicitly aborted by the caller
    Aborted(Option<Value>),
    /// The action rejected; loaders were short-circuited
    ActionFailed(LoadError),
    /// Redirects exceeded the hop limit
    RedirectLoop,
}

struct RouterInner {
    pending: Vec<Arc<Navigation>>,
    current: Option<Arc<NavigationSnapshot>>,
}

/// The navigation scheduler
///
/// Owns the compiled route tree and the shared resource cache, and drives one
/// navigation per [`Router::navigate`] call: at most one action to
/// completion, then all loaders for the matched chain in parallel, consulting
/// the cache first. A newer navigation supersedes and cancels older pending
/// ones; the most recently committed navigation's results are authoritative.
pub struct Router {
    tree: RouteTree,
    cache: ResourceCache,
    inner: Mutex<RouterInner>,
    events: broadcast::Sender<RouterEvent>,
}

impl Router {
    pub fn new(tree: RouteTree) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            tree,
            cache: ResourceCache::new(),
            inner: Mutex::new(RouterInner {
                pending: Vec::new(),
                current: None,
            }),
            events,
        }
    }

    pub fn tree(&self) -> &RouteTree {
        &self.tree
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Subscribes to navigation lifecycle notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.events.subscribe()
    }

    /// Navigates to a URL with default options
    pub async fn navigate(&self, url: &str) -> NavigationOutcome {
        self.navigate_with(url, NavigateOptions::default()).await
    }

    /// Navigates to a URL, following redirects, running the deepest matched
    /// action (when a submission is carried) and then the chain's loaders
    pub async fn navigate_with(&self, url: &str, options: NavigateOptions) -> NavigationOutcome {
        let (raw_path, search) = split_search(url);
        let mut pathname = normalize_path(raw_path).into_owned();

        for _hop in 0..MAX_REDIRECT_HOPS {
            let url = format!("{pathname}{search}");
            let Some(chain) = self.tree.match_url(&pathname) else {
                tracing::debug!(target: "waypoint::scheduler", %url, "no matching route");
                return NavigationOutcome::NoMatch;
            };

            let deepest = chain.deepest();
            if let RouteConfigNode::Redirect(redirect) = deepest.config.as_ref() {
                let target = redirect.to.resolve(&deepest.params, &deepest.splat);
                tracing::debug!(
                    target: "waypoint::scheduler",
                    from = %pathname,
                    to = %target,
                    status = ?redirect.status,
                    "following redirect"
                );
                pathname = normalize_path(&target).into_owned();
                continue;
            }

            return self.drive(chain, url, search, &options).await;
        }

        NavigationOutcome::RedirectLoop
    }

    /// Aborts every pending navigation with a caller-supplied reason
    ///
    /// Routed to the `Abort` event channel, unlike implicit supersession
    /// which routes to `Cancel`.
    pub fn abort(&self, reason: Value) {
        let pending: Vec<Arc<Navigation>> = self.inner.lock().unwrap().pending.clone();
        for nav in pending {
            nav.abort(reason.clone());
        }
    }

    // ------------------------------------------------------------------
    // Read-only accessors into the latest committed navigation
    // ------------------------------------------------------------------

    /// The latest committed navigation's results
    pub fn current(&self) -> Option<Arc<NavigationSnapshot>> {
        self.inner.lock().unwrap().current.clone()
    }

    /// The committed location, pathname plus search
    pub fn location(&self) -> Option<String> {
        self.current().map(|snap| snap.url.clone())
    }

    /// Merged parameters of the committed match chain
    pub fn params(&self) -> HashMap<String, String> {
        self.current().map(|snap| snap.params.clone()).unwrap_or_default()
    }

    /// Splat segments of the committed match chain
    pub fn splat(&self) -> Vec<String> {
        self.current().map(|snap| snap.splat.clone()).unwrap_or_default()
    }

    /// The committed action result, if the last navigation submitted one
    pub fn action_result(&self) -> Option<Value> {
        self.current().and_then(|snap| snap.action_result.clone())
    }

    /// First loader error of the committed chain, if any
    pub fn loader_error(&self) -> Option<LoadError> {
        self.current().and_then(|snap| snap.first_error().cloned())
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    async fn drive(
        &self,
        chain: Match,
        url: String,
        search: &str,
        options: &NavigateOptions,
    ) -> NavigationOutcome {
        let nav = Arc::new(Navigation::new(url.clone()));

        // Supersede: signal every older pending navigation before queueing
        // this one. Their own drive calls observe the token and tear down.
        {
            let mut inner = self.inner.lock().unwrap();
            for old in inner.pending.drain(..) {
                tracing::debug!(
                    target: "waypoint::scheduler",
                    superseded = old.id(),
                    by = nav.id(),
                    "cancelling pending navigation"
                );
                old.cancel.cancel();
            }
            inner.pending.push(Arc::clone(&nav));
        }

        self.emit(RouterEvent::NavigateStart { url: url.clone() });

        // Submitting: at most one action, strictly before any loader
        let mut action_result = None;
        let deepest = chain.deepest();
        if let (Some(action), Some(data)) = (deepest.config.action(), options.submission.clone()) {
            nav.set_state(NavigationState::Submitting);
            let context = ActionContext {
                url: url.clone(),
                data,
                params: deepest.params.clone(),
                splat: deepest.splat.clone(),
                cancel: nav.cancel.child_token(),
            };
            let outcome = tokio::select! {
                _ = nav.cancel.cancelled() => return self.finish_interrupted(&nav, &[]),
                result = action.invoke(context) => result,
            };
            match outcome {
                Ok(value) => {
                    if options.revalidate {
                        // The submitted route and everything under it must
                        // recompute on the next loading phase
                        let submitted = deepest.path.clone();
                        self.cache.mark_dirty(|identity| {
                            identity.path == submitted
                                || identity
                                    .path
                                    .strip_prefix(submitted.as_str())
                                    .is_some_and(|rest| rest.starts_with('/'))
                        });
                    }
                    action_result = Some(value);
                }
                Err(err) => {
                    nav.set_state(NavigationState::Aborted);
                    self.remove_pending(&nav);
                    self.emit(RouterEvent::Abort {
                        url: url.clone(),
                        reason: serde_json::to_value(&err).unwrap_or(Value::Null),
                    });
                    return NavigationOutcome::ActionFailed(err);
                }
            }
        }

        // Loading: fan out across every segment with a loader, cache first.
        // Lookup-and-insert per segment is atomic and happens before the
        // first await below; obtain registers this navigation's interest.
        nav.set_state(NavigationState::Loading);
        let mut resources: Vec<(String, Arc<Resource>)> = Vec::new();
        for level in chain.iter() {
            let Some(loader) = level.config.loader() else {
                continue;
            };
            let identity = ResourceIdentity {
                path: level.path.clone(),
                loader: loader.id(),
            };
            let context = LoaderContext {
                url: url.clone(),
                params: level.params.clone(),
                splat: level.splat.clone(),
                cancel: CancellationToken::new(),
            };
            let resource = self.cache.obtain(identity, loader, context, options.reload);
            resources.push((level.path.clone(), resource));
        }

        // Wait for all to settle; one segment's rejection does not cancel
        // its siblings
        let settle = join_all(
            resources
                .iter()
                .map(|(_, resource)| resource.settled()),
        );
        let results = tokio::select! {
            _ = nav.cancel.cancelled() => {
                return self.finish_interrupted(&nav, &resources);
            }
            results = settle => results,
        };

        // Committing: attach results and publish, unless superseded while
        // the last loader settled
        nav.set_state(NavigationState::Committing);
        let segments = resources
            .iter()
            .zip(results)
            .map(|((path, _), result)| SegmentResult {
                path: path.clone(),
                result,
            })
            .collect();
        let snapshot = Arc::new(NavigationSnapshot {
            url: url.clone(),
            pathname: split_search(&url).0.to_string(),
            search: search.to_string(),
            replace: options.replace,
            params: chain.merged_params(),
            splat: chain.deepest().splat.clone(),
            segments,
            action_result,
        });

        {
            let mut inner = self.inner.lock().unwrap();
            if nav.cancel.is_cancelled() {
                drop(inner);
                return self.finish_interrupted(&nav, &resources);
            }
            inner.current = Some(Arc::clone(&snapshot));
            inner.pending.retain(|pending| pending.id() != nav.id());
        }

        for (_, resource) in &resources {
            self.cache.release(resource);
        }
        nav.set_state(NavigationState::Complete);
        self.emit(RouterEvent::Navigate { url: url.clone() });
        self.emit(RouterEvent::NavigateEnd { url });

        NavigationOutcome::Committed(snapshot)
    }

    /// Tears down a navigation whose token fired: releases resource
    /// interest, records the terminal state, and emits on the matching
    /// channel
    fn finish_interrupted(
        &self,
        nav: &Arc<Navigation>,
        resources: &[(String, Arc<Resource>)],
    ) -> NavigationOutcome {
        for (_, resource) in resources {
            self.cache.release(resource);
        }
        self.remove_pending(nav);

        match nav.take_abort_reason() {
            Some(reason) => {
                nav.set_state(NavigationState::Aborted);
                self.emit(RouterEvent::Abort {
                    url: nav.url().to_string(),
                    reason: reason.clone(),
                });
                NavigationOutcome::Aborted(Some(reason))
            }
            None => {
                nav.set_state(NavigationState::Cancelled);
                self.emit(RouterEvent::Cancel {
                    url: nav.url().to_string(),
                });
                NavigationOutcome::Cancelled
            }
        }
    }

    fn remove_pending(&self, nav: &Arc<Navigation>) {
        self.inner
            .lock()
            .unwrap()
            .pending
            .retain(|pending| pending.id() != nav.id());
    }

    fn emit(&self, event: RouterEvent) {
        // Send fails only when nobody subscribed, which is fine
        let _ = self.events.send(event);
    }
}
