// File: src/config.rs
// Purpose: Route-tree authoring, validation, and compilation into a normalized config tree

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::descriptor::{CaseSensitivity, DescriptorError, PathDescriptor};
use crate::loader::{Action, DefaultEndpoints, Loader};

// ============================================================================
// Errors & Warnings
// ============================================================================

/// A structural authoring violation
///
/// In strict mode these fail compilation; otherwise they are routed to the
/// configured [`ConfigReporter`] and compilation degrades gracefully (the
/// offending node is dropped or flagged, siblings still compile). Redirect
/// violations are hard errors in either mode.
#[derive(Debug, Clone, Error)]
pub enum RouterConfigError {
    #[error("redirect route {0:?} cannot have children")]
    RedirectWithChildren(String),
    #[error("redirect route {0:?} cannot have a loader")]
    RedirectWithLoader(String),
    #[error("redirect route {0:?} cannot have an action")]
    RedirectWithAction(String),
    #[error("root route {0:?} must have at least one child")]
    ChildlessRoot(String),
    #[error("route {0:?} is marked root but the tree already has a root")]
    MultipleRoots(String),
    #[error("route tree has no node marked root")]
    MissingRoot,
    #[error("route {0:?} requests the default loader/action but no DefaultEndpoints provider was configured")]
    NoDefaultEndpoints(String),
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// A non-fatal finding reported during compilation
#[derive(Debug, Clone)]
pub enum ConfigWarning {
    /// Two reachable leaf routes have equivalent descriptors; the
    /// lower-scoring one can never match
    UnreachableRoute { kept: String, unreachable: String },
    /// A hard rule was violated in non-strict mode; the offending node was
    /// dropped or degraded
    Violation(String),
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::UnreachableRoute { kept, unreachable } => write!(
                f,
                "route {unreachable:?} is unreachable: its descriptor is equivalent to {kept:?}"
            ),
            ConfigWarning::Violation(msg) => write!(f, "{msg}"),
        }
    }
}

/// Sink for compilation warnings
///
/// Injectable so hosts decide where developer-facing signal goes. The default
/// is [`NoopReporter`]; [`TracingReporter`] forwards to `tracing::warn!`.
pub trait ConfigReporter: Send + Sync {
    fn warn(&self, warning: &ConfigWarning);
}

/// Discards all warnings
#[derive(Debug, Default)]
pub struct NoopReporter;

impl ConfigReporter for NoopReporter {
    fn warn(&self, _warning: &ConfigWarning) {}
}

/// Forwards warnings to the `tracing` warn level
#[derive(Debug, Default)]
pub struct TracingReporter;

impl ConfigReporter for TracingReporter {
    fn warn(&self, warning: &ConfigWarning) {
        tracing::warn!(target: "waypoint::config", "{warning}");
    }
}

// ============================================================================
// Raw (authored) tree
// ============================================================================

#[derive(Clone, Debug, Default)]
enum LoaderSlot {
    #[default]
    None,
    /// `loader_default()`: bind the built-in HTTP loader at compile time
    Default,
    Custom(Loader),
}

#[derive(Clone, Debug, Default)]
enum ActionSlot {
    #[default]
    None,
    Default,
    Custom(Action),
}

/// Destination of a redirect route
#[derive(Clone)]
pub enum RedirectTarget {
    /// A path template; `:param` and `*` placeholders are substituted from
    /// the match before navigation continues
    Literal(String),
    /// A function of the matched params and splat producing a path
    Computed(Arc<dyn Fn(&HashMap<String, String>, &[String]) -> String + Send + Sync>),
}

impl RedirectTarget {
    /// Resolves the destination for a concrete match
    ///
    /// Substituted parameter values are percent-encoded so captured segments
    /// cannot smuggle separators into the destination path.
    pub fn resolve(&self, params: &HashMap<String, String>, splat: &[String]) -> String {
        match self {
            RedirectTarget::Computed(f) => f(params, splat),
            RedirectTarget::Literal(template) => {
                let resolved = template
                    .split('/')
                    .map(|seg| {
                        if let Some(name) = seg.strip_prefix(':') {
                            params
                                .get(name)
                                .map(|v| urlencoding::encode(v).into_owned())
                                .unwrap_or_else(|| seg.to_string())
                        } else if seg.starts_with('*') {
                            splat.join("/")
                        } else {
                            seg.to_string()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("/");
                if resolved.starts_with('/') {
                    resolved
                } else {
                    format!("/{resolved}")
                }
            }
        }
    }
}

impl fmt::Debug for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectTarget::Literal(to) => f.debug_tuple("Literal").field(to).finish(),
            RedirectTarget::Computed(_) => f.debug_tuple("Computed").finish_non_exhaustive(),
        }
    }
}

/// An authored route node, built through the immutable builder API
///
/// # Examples
///
/// ```
/// use waypoint_router::config::RouteNode;
/// use serde_json::json;
///
/// let tree = RouteNode::new("/")
///     .root()
///     .child(
///         RouteNode::new("users")
///             .loader_value(json!(["alice", "bob"]))
///             .child(RouteNode::new(":id")),
///     )
///     .child(RouteNode::redirect("old-users", "/users"));
/// # let _ = tree;
/// ```
#[derive(Clone, Debug)]
pub struct RouteNode {
    path: Option<String>,
    root: bool,
    redirect: Option<(RedirectTarget, Option<u16>)>,
    loader: LoaderSlot,
    action: ActionSlot,
    children: Vec<RouteNode>,
}

impl RouteNode {
    /// A route at the given path template, relative to its parent
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            root: false,
            redirect: None,
            loader: LoaderSlot::None,
            action: ActionSlot::None,
            children: Vec::new(),
        }
    }

    /// A pathless route: inherits its parent's base unchanged
    ///
    /// Useful for grouping children under shared loaders.
    pub fn pathless() -> Self {
        Self {
            path: None,
            root: false,
            redirect: None,
            loader: LoaderSlot::None,
            action: ActionSlot::None,
            children: Vec::new(),
        }
    }

    /// A redirect route with a literal destination
    pub fn redirect(path: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            redirect: Some((RedirectTarget::Literal(to.into()), None)),
            ..Self::new(path)
        }
    }

    /// A redirect route with a destination computed from the match
    pub fn redirect_with<F>(path: impl Into<String>, to: F) -> Self
    where
        F: Fn(&HashMap<String, String>, &[String]) -> String + Send + Sync + 'static,
    {
        Self {
            redirect: Some((RedirectTarget::Computed(Arc::new(to)), None)),
            ..Self::new(path)
        }
    }

    /// Sets the HTTP status for a redirect route
    pub fn status(mut self, status: u16) -> Self {
        if let Some((_, slot)) = self.redirect.as_mut() {
            *slot = Some(status);
        }
        self
    }

    /// Marks this node as the tree's structural root
    pub fn root(mut self) -> Self {
        self.root = true;
        self
    }

    /// Attaches a loader function
    pub fn loader(mut self, loader: Loader) -> Self {
        self.loader = LoaderSlot::Custom(loader);
        self
    }

    /// Attaches a loader that resolves to a static value
    pub fn loader_value(self, value: Value) -> Self {
        self.loader(Loader::from_value(value))
    }

    /// Requests the built-in HTTP-backed default loader
    pub fn loader_default(mut self) -> Self {
        self.loader = LoaderSlot::Default;
        self
    }

    /// Attaches an action function
    pub fn action(mut self, action: Action) -> Self {
        self.action = ActionSlot::Custom(action);
        self
    }

    /// Requests the built-in HTTP-backed default action
    pub fn action_default(mut self) -> Self {
        self.action = ActionSlot::Default;
        self
    }

    /// Appends a child route
    pub fn child(mut self, child: RouteNode) -> Self {
        self.children.push(child);
        self
    }

    /// Specificity used for sibling ordering
    ///
    /// A pathless grouping node borrows its most specific child's score, so
    /// grouping routes never demotes their priority against siblings.
    fn sort_score(&self) -> u64 {
        match self.path.as_deref() {
            Some(path) => PathDescriptor::parse(path)
                .map(|d| d.score())
                .unwrap_or(0),
            None => self
                .children
                .iter()
                .map(RouteNode::sort_score)
                .max()
                .unwrap_or(0),
        }
    }

    fn describe(&self) -> String {
        self.path.clone().unwrap_or_else(|| "<pathless>".to_string())
    }
}

// ============================================================================
// Compiled tree
// ============================================================================

/// A compiled, validated route config node
///
/// Closed tagged variant: every consumer (compiler, matcher, scheduler)
/// handles both arms exhaustively.
#[derive(Debug)]
pub enum RouteConfigNode {
    Default(DefaultRoute),
    Redirect(RedirectRoute),
}

/// A compiled non-redirect route
#[derive(Debug)]
pub struct DefaultRoute {
    /// This node's own segments, consumed at its level during matching
    pub descriptor: PathDescriptor,
    /// Descriptor resolved against all ancestors, used for reachability
    /// analysis and diagnostics
    pub full: PathDescriptor,
    pub root: bool,
    pub loader: Option<Loader>,
    pub action: Option<Action>,
    /// Children in descending score order; this fixed ordering is what makes
    /// the matcher's first-match-wins selection deterministic
    pub children: Vec<Arc<RouteConfigNode>>,
    /// Nesting depth, starting at zero for the top node
    pub depth: usize,
    /// Flagged by the compiler when an equivalent higher-scoring leaf shadows
    /// this one; kept in the tree but never matchable
    pub unreachable: bool,
}

/// A compiled redirect route
#[derive(Debug)]
pub struct RedirectRoute {
    pub descriptor: PathDescriptor,
    pub full: PathDescriptor,
    pub to: RedirectTarget,
    pub status: Option<u16>,
    pub depth: usize,
    pub unreachable: bool,
}

impl RouteConfigNode {
    /// The node's own (local) descriptor
    pub fn descriptor(&self) -> &PathDescriptor {
        match self {
            RouteConfigNode::Default(node) => &node.descriptor,
            RouteConfigNode::Redirect(node) => &node.descriptor,
        }
    }

    /// The descriptor resolved against all ancestors
    pub fn full_descriptor(&self) -> &PathDescriptor {
        match self {
            RouteConfigNode::Default(node) => &node.full,
            RouteConfigNode::Redirect(node) => &node.full,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            RouteConfigNode::Default(node) => node.depth,
            RouteConfigNode::Redirect(node) => node.depth,
        }
    }

    pub fn children(&self) -> &[Arc<RouteConfigNode>] {
        match self {
            RouteConfigNode::Default(node) => &node.children,
            RouteConfigNode::Redirect(_) => &[],
        }
    }

    /// A leaf is a childless non-redirect node
    pub fn is_leaf(&self) -> bool {
        matches!(self, RouteConfigNode::Default(node) if node.children.is_empty())
    }

    pub fn is_unreachable(&self) -> bool {
        match self {
            RouteConfigNode::Default(node) => node.unreachable,
            RouteConfigNode::Redirect(node) => node.unreachable,
        }
    }

    pub fn loader(&self) -> Option<&Loader> {
        match self {
            RouteConfigNode::Default(node) => node.loader.as_ref(),
            RouteConfigNode::Redirect(_) => None,
        }
    }

    pub fn action(&self) -> Option<&Action> {
        match self {
            RouteConfigNode::Default(node) => node.action.as_ref(),
            RouteConfigNode::Redirect(_) => None,
        }
    }
}

/// A compiled route tree, ready for matching
#[derive(Debug, Clone)]
pub struct RouteTree {
    pub(crate) root: Arc<RouteConfigNode>,
    pub(crate) case: CaseSensitivity,
}

impl RouteTree {
    pub fn root(&self) -> &Arc<RouteConfigNode> {
        &self.root
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }
}

// ============================================================================
// Compilation
// ============================================================================

/// Options controlling a compilation pass
#[derive(Clone)]
pub struct CompileOptions {
    /// Prefix the built-in HTTP defaults are bound to
    pub prefix: String,
    /// Strict mode raises structural violations; otherwise they are reported
    /// through `reporter` and compilation degrades gracefully
    pub strict: bool,
    pub case: CaseSensitivity,
    /// Provider for `loader_default()` / `action_default()` bindings
    pub defaults: Option<Arc<dyn DefaultEndpoints>>,
    pub reporter: Arc<dyn ConfigReporter>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            strict: false,
            case: CaseSensitivity::Sensitive,
            defaults: None,
            reporter: Arc::new(NoopReporter),
        }
    }
}

impl CompileOptions {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_case(mut self, case: CaseSensitivity) -> Self {
        self.case = case;
        self
    }

    pub fn with_defaults(mut self, defaults: Arc<dyn DefaultEndpoints>) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ConfigReporter>) -> Self {
        self.reporter = reporter;
        self
    }
}

struct CompilePass<'a> {
    opts: &'a CompileOptions,
    /// Resolved descriptors of every leaf seen so far in this pass
    leaves: Vec<PathDescriptor>,
    root_seen: bool,
}

impl<'a> CompilePass<'a> {
    /// Reports a violation in lenient mode, raises it in strict mode
    fn violation(&mut self, err: RouterConfigError) -> Result<(), RouterConfigError> {
        if self.opts.strict {
            Err(err)
        } else {
            self.opts
                .reporter
                .warn(&ConfigWarning::Violation(err.to_string()));
            Ok(())
        }
    }

    fn compile_node(
        &mut self,
        node: RouteNode,
        base: &PathDescriptor,
        depth: usize,
    ) -> Result<Option<Arc<RouteConfigNode>>, RouterConfigError> {
        let described = node.describe();

        let descriptor = match node.path.as_deref() {
            Some(path) => match PathDescriptor::parse(path) {
                Ok(descriptor) => descriptor,
                Err(err) if depth == 0 => return Err(err.into()),
                Err(err) => {
                    // Malformed descriptors are unrecoverable for the node
                    // itself; in lenient mode the node is dropped and its
                    // siblings still compile
                    self.violation(err.into())?;
                    return Ok(None);
                }
            },
            None => PathDescriptor::empty(),
        };
        let full = descriptor.resolve_against(base);

        if let Some((to, status)) = node.redirect {
            // Redirect invariants are hard errors regardless of mode: a
            // redirect carrying work or children is never meaningful
            if !node.children.is_empty() {
                return Err(RouterConfigError::RedirectWithChildren(described));
            }
            if !matches!(node.loader, LoaderSlot::None) {
                return Err(RouterConfigError::RedirectWithLoader(described));
            }
            if !matches!(node.action, ActionSlot::None) {
                return Err(RouterConfigError::RedirectWithAction(described));
            }

            let unreachable = self.register_leaf(&full);
            return Ok(Some(Arc::new(RouteConfigNode::Redirect(RedirectRoute {
                descriptor,
                full,
                to,
                status,
                depth,
                unreachable,
            }))));
        }

        let mut root = node.root;
        if root {
            if self.root_seen {
                self.violation(RouterConfigError::MultipleRoots(described.clone()))?;
                root = false;
            } else {
                self.root_seen = true;
            }
        }

        let loader = self.materialize_loader(node.loader, depth, &described)?;
        let action = self.materialize_action(node.action, depth, &described)?;

        // Fixed descending-score sibling order, stable so declaration order
        // breaks ties
        let mut raw_children = node.children;
        raw_children.sort_by_key(|child| std::cmp::Reverse(child.sort_score()));

        let mut children = Vec::with_capacity(raw_children.len());
        for raw_child in raw_children {
            if let Some(child) = self.compile_node(raw_child, &full, depth + 1)? {
                children.push(child);
            }
        }

        if root && children.is_empty() {
            self.violation(RouterConfigError::ChildlessRoot(described))?;
        }

        let unreachable = if children.is_empty() {
            self.register_leaf(&full)
        } else {
            false
        };

        Ok(Some(Arc::new(RouteConfigNode::Default(DefaultRoute {
            descriptor,
            full,
            root,
            loader,
            action,
            children,
            depth,
            unreachable,
        }))))
    }

    /// Registers a leaf descriptor; returns true when an equivalent leaf was
    /// already seen, making this one unreachable
    fn register_leaf(&mut self, full: &PathDescriptor) -> bool {
        let shadowed_by = self
            .leaves
            .iter()
            .find(|seen| seen.equivalent(full, self.opts.case));
        let unreachable = if let Some(kept) = shadowed_by {
            self.opts.reporter.warn(&ConfigWarning::UnreachableRoute {
                kept: kept.to_string(),
                unreachable: full.to_string(),
            });
            true
        } else {
            false
        };
        self.leaves.push(full.clone());
        unreachable
    }

    fn materialize_loader(
        &mut self,
        slot: LoaderSlot,
        depth: usize,
        described: &str,
    ) -> Result<Option<Loader>, RouterConfigError> {
        Ok(match slot {
            LoaderSlot::None => None,
            LoaderSlot::Custom(loader) => Some(loader),
            LoaderSlot::Default => match &self.opts.defaults {
                Some(provider) => Some(provider.loader(&self.opts.prefix, depth)),
                None => {
                    self.violation(RouterConfigError::NoDefaultEndpoints(
                        described.to_string(),
                    ))?;
                    None
                }
            },
        })
    }

    fn materialize_action(
        &mut self,
        slot: ActionSlot,
        depth: usize,
        described: &str,
    ) -> Result<Option<Action>, RouterConfigError> {
        Ok(match slot {
            ActionSlot::None => None,
            ActionSlot::Custom(action) => Some(action),
            ActionSlot::Default => match &self.opts.defaults {
                Some(provider) => Some(provider.action(&self.opts.prefix, depth)),
                None => {
                    self.violation(RouterConfigError::NoDefaultEndpoints(
                        described.to_string(),
                    ))?;
                    None
                }
            },
        })
    }
}

/// Compiles an authored route tree into a normalized, validated config tree
///
/// Depth-first: siblings are sorted descending by descriptor score, child
/// descriptors are resolved against the accumulated base, leaves are checked
/// for descriptor equivalence (the duplicate becomes unreachable and is
/// flagged, never dropped), and the root/redirect invariants from the data
/// model are enforced.
///
/// # Examples
///
/// ```
/// use waypoint_router::config::{compile, CompileOptions, RouteNode};
///
/// let tree = compile(
///     RouteNode::new("/")
///         .root()
///         .child(RouteNode::new("users").child(RouteNode::new(":id"))),
///     &CompileOptions::default(),
/// )
/// .unwrap();
/// assert_eq!(tree.root().children().len(), 1);
/// ```
pub fn compile(node: RouteNode, opts: &CompileOptions) -> Result<RouteTree, RouterConfigError> {
    let mut pass = CompilePass {
        opts,
        leaves: Vec::new(),
        root_seen: false,
    };

    let root = pass
        .compile_node(node, &PathDescriptor::empty(), 0)?
        .expect("top node is never dropped: its violations are hard errors");

    if !pass.root_seen {
        pass.violation(RouterConfigError::MissingRoot)?;
    }

    tracing::debug!(target: "waypoint::config", "compiled route tree: {}", root.full_descriptor());

    Ok(RouteTree {
        root,
        case: opts.case,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Collects warnings for assertions
    #[derive(Default)]
    struct CollectingReporter {
        warnings: Mutex<Vec<String>>,
    }

    impl ConfigReporter for CollectingReporter {
        fn warn(&self, warning: &ConfigWarning) {
            self.warnings.lock().unwrap().push(warning.to_string());
        }
    }

    fn options_with(reporter: Arc<CollectingReporter>) -> CompileOptions {
        CompileOptions::default().with_reporter(reporter)
    }

    #[test]
    fn test_compile_sorts_siblings_by_score() {
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("*"))
                .child(RouteNode::new(":slug"))
                .child(RouteNode::new("about")),
            &CompileOptions::default(),
        )
        .unwrap();

        let order: Vec<String> = tree
            .root()
            .children()
            .iter()
            .map(|c| c.descriptor().to_string())
            .collect();
        assert_eq!(order, vec!["/about", "/:slug", "/*"]);
    }

    #[test]
    fn test_pathless_group_sorts_by_best_child() {
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new(":slug"))
                .child(RouteNode::pathless().child(RouteNode::new("about"))),
            &CompileOptions::default(),
        )
        .unwrap();

        // The group carries a literal leaf, so it must come before :slug
        let first = &tree.root().children()[0];
        assert!(first.descriptor().is_empty());
        assert_eq!(first.children()[0].descriptor().to_string(), "/about");
    }

    #[test]
    fn test_duplicate_leaf_descriptors_warn() {
        let reporter = Arc::new(CollectingReporter::default());
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("users/:id"))
                .child(RouteNode::new("users/:userId")),
            &options_with(reporter.clone()),
        )
        .unwrap();

        let warnings = reporter.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unreachable"));

        // The duplicate is kept but flagged
        let flagged: Vec<bool> = tree
            .root()
            .children()
            .iter()
            .map(|c| c.is_unreachable())
            .collect();
        assert_eq!(flagged, vec![false, true]);
    }

    #[test]
    fn test_distinct_leaves_do_not_warn() {
        let reporter = Arc::new(CollectingReporter::default());
        compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("users"))
                .child(RouteNode::new("users/:id")),
            &options_with(reporter.clone()),
        )
        .unwrap();
        assert!(reporter.warnings.lock().unwrap().is_empty());
    }

    #[test]
    fn test_redirect_with_loader_is_hard_error() {
        let node = RouteNode {
            loader: LoaderSlot::Custom(Loader::from_value(Value::Null)),
            ..RouteNode::redirect("old", "/new")
        };
        let result = compile(
            RouteNode::new("/").root().child(node),
            &CompileOptions::default(),
        );
        assert!(matches!(
            result,
            Err(RouterConfigError::RedirectWithLoader(_))
        ));
    }

    #[test]
    fn test_redirect_with_children_is_hard_error() {
        let result = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::redirect("old", "/new").child(RouteNode::new("sub"))),
            &CompileOptions::default(),
        );
        assert!(matches!(
            result,
            Err(RouterConfigError::RedirectWithChildren(_))
        ));
    }

    #[test]
    fn test_redirect_equivalent_to_sibling_warns_but_compiles() {
        let reporter = Arc::new(CollectingReporter::default());
        compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("old"))
                .child(RouteNode::redirect("old", "/new")),
            &options_with(reporter.clone()),
        )
        .unwrap();
        assert_eq!(reporter.warnings.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_childless_root_strict_fails() {
        let result = compile(RouteNode::new("/").root(), &CompileOptions::strict());
        assert!(matches!(result, Err(RouterConfigError::ChildlessRoot(_))));
    }

    #[test]
    fn test_childless_root_lenient_warns() {
        let reporter = Arc::new(CollectingReporter::default());
        let tree = compile(RouteNode::new("/").root(), &options_with(reporter.clone()));
        assert!(tree.is_ok());
        assert_eq!(reporter.warnings.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_root_strict_fails() {
        let result = compile(
            RouteNode::new("/").child(RouteNode::new("users")),
            &CompileOptions::strict(),
        );
        assert!(matches!(result, Err(RouterConfigError::MissingRoot)));
    }

    #[test]
    fn test_missing_root_lenient_warns() {
        let reporter = Arc::new(CollectingReporter::default());
        let tree = compile(
            RouteNode::new("/").child(RouteNode::new("users")),
            &options_with(reporter.clone()),
        );
        assert!(tree.is_ok());
        assert_eq!(reporter.warnings.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_multiple_roots_strict_fails() {
        let result = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("nested").root().child(RouteNode::new("x"))),
            &CompileOptions::strict(),
        );
        assert!(matches!(result, Err(RouterConfigError::MultipleRoots(_))));
    }

    #[test]
    fn test_malformed_descriptor_lenient_drops_node() {
        let reporter = Arc::new(CollectingReporter::default());
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("ok"))
                .child(RouteNode::new("bad#fragment")),
            &options_with(reporter.clone()),
        )
        .unwrap();

        assert_eq!(tree.root().children().len(), 1);
        assert_eq!(reporter.warnings.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_descriptor_strict_fails() {
        let result = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("bad#fragment")),
            &CompileOptions::strict(),
        );
        assert!(matches!(result, Err(RouterConfigError::Descriptor(_))));
    }

    #[test]
    fn test_default_loader_without_provider_strict_fails() {
        let result = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("users").loader_default()),
            &CompileOptions::strict(),
        );
        assert!(matches!(
            result,
            Err(RouterConfigError::NoDefaultEndpoints(_))
        ));
    }

    #[test]
    fn test_pathless_node_inherits_base() {
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::pathless().child(RouteNode::new("users"))),
            &CompileOptions::default(),
        )
        .unwrap();

        let group = &tree.root().children()[0];
        assert!(group.descriptor().is_empty());
        assert_eq!(
            group.children()[0].full_descriptor().to_string(),
            "/users"
        );
    }

    #[test]
    fn test_redirect_target_substitution() {
        let target = RedirectTarget::Literal("/articles/:slug".to_string());
        let mut params = HashMap::new();
        params.insert("slug".to_string(), "hello world".to_string());
        assert_eq!(target.resolve(&params, &[]), "/articles/hello%20world");

        let target = RedirectTarget::Literal("/docs/*".to_string());
        let splat = vec!["a".to_string(), "b".to_string()];
        assert_eq!(target.resolve(&HashMap::new(), &splat), "/docs/a/b");
    }
}
