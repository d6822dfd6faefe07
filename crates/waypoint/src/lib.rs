//! # Waypoint
//!
//! Nested client-side routing with per-segment data loading:
//!
//! - Declarative route trees compiled and matched by [`waypoint_router`]
//! - Per-segment async loaders with request de-duplication and caching
//! - Form-style actions that run before loaders and invalidate stale data
//! - Cancellable navigations: a newer navigation supersedes older pending
//!   ones, and shared in-flight work is cancelled only when the last
//!   interested navigation lets go
//! - Built-in HTTP-backed defaults over reqwest
//!
//! ## Example
//!
//! ```no_run
//! use serde_json::json;
//! use waypoint::{compile, CompileOptions, Loader, RouteNode, Router};
//!
//! # async fn demo() {
//! let tree = compile(
//!     RouteNode::new("/")
//!         .root()
//!         .child(
//!             RouteNode::new("users")
//!                 .loader(Loader::from_fn(|_cx| async { Ok(json!(["alice", "bob"])) }))
//!                 .child(RouteNode::new(":id")),
//!         ),
//!     &CompileOptions::default(),
//! )
//! .unwrap();
//!
//! let router = Router::new(tree);
//! router.navigate("/users/42").await;
//! assert_eq!(router.params().get("id"), Some(&"42".to_string()));
//! # }
//! ```

pub mod cache;
pub mod events;
pub mod http;
pub mod scheduler;

// Routing core, re-exported for single-crate consumption
pub use waypoint_router::{
    compile, Action, ActionContext, CaseSensitivity, CompileOptions, ConfigReporter,
    ConfigWarning, DefaultEndpoints, DescriptorError, LoadError, Loader, LoaderContext, Match,
    NoopReporter, PathDescriptor, RedirectTarget, RouteConfigNode, RouteNode, RouteTree,
    RouterConfigError, TracingReporter,
};

pub use cache::{Resource, ResourceCache, ResourceIdentity, ResourceState};
pub use events::RouterEvent;
pub use http::HttpEndpoints;
pub use scheduler::{
    NavigateOptions, Navigation, NavigationOutcome, NavigationSnapshot, NavigationState, Router,
    SegmentResult,
};
