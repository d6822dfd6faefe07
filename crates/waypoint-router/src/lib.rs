//! # Waypoint Router
//!
//! Route-tree compiler and URL matcher for nested client-side routing:
//! - Literal segments (`/about`)
//! - Dynamic parameters (`/users/:id`)
//! - Optional segments (`/posts/:id?`)
//! - Splat (catch-all) routes (`/docs/*`)
//! - Redirect routes with parameter substitution
//!
//! A raw, declaratively authored tree is compiled into a normalized
//! [`config::RouteTree`]: descriptors are resolved against their ancestors,
//! siblings are ordered by specificity score, and structural invariants are
//! validated. Matching a URL walks the compiled tree depth-first and produces
//! a root-to-leaf [`matcher::Match`] chain with extracted parameters.
//!
//! Matching is first-match-wins over the compiler's fixed descending-score
//! sibling order, so route declaration order never changes behavior except to
//! break exact specificity ties.
//!
//! ## Example
//!
//! ```
//! use waypoint_router::{compile, CompileOptions, RouteNode};
//!
//! let tree = compile(
//!     RouteNode::new("/")
//!         .root()
//!         .child(RouteNode::new("users").child(RouteNode::new(":id"))),
//!     &CompileOptions::default(),
//! )
//! .unwrap();
//!
//! let matched = tree.match_url("/users/123").unwrap();
//! assert_eq!(matched.deepest().params.get("id"), Some(&"123".to_string()));
//! ```

pub mod config;
pub mod descriptor;
pub mod loader;
pub mod matcher;
pub mod path;

pub use config::{
    compile, CompileOptions, ConfigReporter, ConfigWarning, NoopReporter, RedirectTarget,
    RouteConfigNode, RouteNode, RouteTree, RouterConfigError, TracingReporter,
};
pub use descriptor::{CaseSensitivity, DescriptorError, PathDescriptor, SegmentKind, SegmentSpec};
pub use loader::{Action, ActionContext, DefaultEndpoints, LoadError, Loader, LoaderContext};
pub use matcher::{Match, MatchIter};
