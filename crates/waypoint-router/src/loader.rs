// File: src/loader.rs
// Purpose: Async loader/action handles carried by route config nodes

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_handle_id() -> u64 {
    NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Failure of a loader or action invocation
///
/// Cancellation is carried as a variant so in-flight work can report that it
/// observed its token, but the scheduler treats it as a lifecycle outcome,
/// never as a data error.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
pub enum LoadError {
    /// A non-success HTTP response from the built-in defaults
    #[error("http status {status}")]
    Http { status: u16, body: String },
    /// Any other rejection, with its message
    #[error("{0}")]
    Message(String),
    /// The invocation observed its cancellation signal
    #[error("cancelled")]
    Cancelled,
}

/// Context handed to a loader invocation
#[derive(Debug, Clone)]
pub struct LoaderContext {
    /// Full target URL of the navigation, pathname plus search
    pub url: String,
    /// Parameters captured by this segment's descriptor
    pub params: HashMap<String, String>,
    /// Splat segments captured by this segment's descriptor
    pub splat: Vec<String>,
    /// Advisory cancellation signal; loaders are expected to honor it
    pub cancel: CancellationToken,
}

/// Context handed to an action invocation, additionally carrying the
/// submission payload
#[derive(Debug, Clone)]
pub struct ActionContext {
    pub url: String,
    pub data: Value,
    pub params: HashMap<String, String>,
    pub splat: Vec<String>,
    pub cancel: CancellationToken,
}

type LoaderFn = dyn Fn(LoaderContext) -> BoxFuture<'static, Result<Value, LoadError>> + Send + Sync;
type ActionFn = dyn Fn(ActionContext) -> BoxFuture<'static, Result<Value, LoadError>> + Send + Sync;

/// An async data-producing function attached to a route
///
/// Each loader carries a stable identity assigned at construction. Cloning a
/// [`Loader`] shares the identity, so the resource cache can tell "the same
/// loader" apart from "a different loader with the same behavior".
///
/// # Examples
///
/// ```
/// use waypoint_router::loader::{Loader, LoaderContext};
/// use serde_json::json;
///
/// let loader = Loader::from_fn(|cx: LoaderContext| async move {
///     Ok(json!({ "url": cx.url }))
/// });
/// let clone = loader.clone();
/// assert_eq!(loader.id(), clone.id());
/// ```
#[derive(Clone)]
pub struct Loader {
    id: u64,
    inner: Arc<LoaderFn>,
}

impl Loader {
    /// Wraps an async function as a loader
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(LoaderContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LoadError>> + Send + 'static,
    {
        Self {
            id: next_handle_id(),
            inner: Arc::new(move |cx| Box::pin(f(cx))),
        }
    }

    /// A loader that resolves immediately with a static value
    pub fn from_value(value: Value) -> Self {
        Self::from_fn(move |_cx| {
            let value = value.clone();
            async move { Ok(value) }
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn invoke(&self, cx: LoaderContext) -> BoxFuture<'static, Result<Value, LoadError>> {
        (self.inner)(cx)
    }
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader").field("id", &self.id).finish_non_exhaustive()
    }
}

/// An async submission-handling function attached to a route
#[derive(Clone)]
pub struct Action {
    id: u64,
    inner: Arc<ActionFn>,
}

impl Action {
    pub fn from_fn<F, Fut>(f: F) -> Self
    where
        F: Fn(ActionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, LoadError>> + Send + 'static,
    {
        Self {
            id: next_handle_id(),
            inner: Arc::new(move |cx| Box::pin(f(cx))),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn invoke(&self, cx: ActionContext) -> BoxFuture<'static, Result<Value, LoadError>> {
        (self.inner)(cx)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Provider of the built-in HTTP-backed default loader and action
///
/// Routes authored with `loader_default()` / `action_default()` are bound to
/// an implementation of this trait at compile time. The `waypoint` crate
/// ships the reqwest-backed implementation.
pub trait DefaultEndpoints: Send + Sync {
    /// The default loader for a node at the given nesting depth
    fn loader(&self, prefix: &str, depth: usize) -> Loader;
    /// The default action for a node at the given nesting depth
    fn action(&self, prefix: &str, depth: usize) -> Action;
}
