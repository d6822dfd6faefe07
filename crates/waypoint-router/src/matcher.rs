// File: src/matcher.rs
// Purpose: Match URLs against a compiled route tree, producing root-to-leaf Match chains

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{RouteConfigNode, RouteTree};
use crate::descriptor::CaseSensitivity;
use crate::path::{normalize_path, path_segments, split_search};

/// One node's successful consumption of part of a URL, linked into a
/// root-to-leaf chain
///
/// Chains are rebuilt per navigation and immutable once built; no
/// back-references exist.
#[derive(Debug, Clone)]
pub struct Match {
    /// The compiled node that consumed this part of the path
    pub config: Arc<RouteConfigNode>,
    /// Parameters captured at this level
    pub params: HashMap<String, String>,
    /// Splat segments captured at this level
    pub splat: Vec<String>,
    /// Concrete path consumed from the URL start through this node
    pub path: String,
    pub child: Option<Box<Match>>,
}

impl Match {
    /// Iterates the chain from this node down to the deepest match
    pub fn iter(&self) -> MatchIter<'_> {
        MatchIter { next: Some(self) }
    }

    /// The deepest node in the chain
    pub fn deepest(&self) -> &Match {
        self.iter().last().unwrap_or(self)
    }

    /// Parameters merged across the whole chain, deepest level winning on
    /// name collisions
    pub fn merged_params(&self) -> HashMap<String, String> {
        let mut merged = HashMap::new();
        for level in self.iter() {
            merged.extend(level.params.clone());
        }
        merged
    }

    pub fn depth(&self) -> usize {
        self.iter().count()
    }
}

/// Borrowing iterator over a match chain
pub struct MatchIter<'a> {
    next: Option<&'a Match>,
}

impl<'a> Iterator for MatchIter<'a> {
    type Item = &'a Match;

    fn next(&mut self) -> Option<&'a Match> {
        let current = self.next?;
        self.next = current.child.as_deref();
        Some(current)
    }
}

impl RouteTree {
    /// Matches a URL against this tree
    ///
    /// The query string is ignored for matching. Returns the chain from the
    /// tree root to the deepest node that consumed the path, or `None` when
    /// the top-level node fails to consume. Siblings are tried in the
    /// compiler's fixed descending-score order and never re-scored here.
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
    ///
    /// let matched = tree.match_url("/users/42").unwrap();
    /// assert_eq!(matched.deepest().params.get("id"), Some(&"42".to_string()));
    /// assert!(tree.match_url("/nowhere").is_none());
    /// ```
    pub fn match_url(&self, url: &str) -> Option<Match> {
        let (pathname, _search) = split_search(url);
        let normalized = normalize_path(pathname);
        let segments = path_segments(&normalized);
        match_node(&self.root, &segments, 0, self.case)
    }
}

/// Attempts to match `node` starting at `segments[from..]`
///
/// A match requires the full remaining path to be consumed by the time the
/// chain bottoms out. Children are tried in order; the first child whose
/// subtree completes the path wins. A node with children may still terminate
/// the chain itself when the cursor is already exhausted.
fn match_node(
    node: &Arc<RouteConfigNode>,
    segments: &[&str],
    from: usize,
    case: CaseSensitivity,
) -> Option<Match> {
    if node.is_unreachable() {
        return None;
    }

    let consumptions = node.descriptor().consumptions(&segments[from..], case);

    // First pass: descend. The deepest chain wins, so every viable
    // consumption (greedy optional capture first) is offered to the children
    // before this node may terminate the chain itself.
    if let RouteConfigNode::Default(route) = node.as_ref() {
        for consumption in &consumptions {
            let next = from + consumption.consumed;
            for child in &route.children {
                if let Some(matched) = match_node(child, segments, next, case) {
                    return Some(Match {
                        config: Arc::clone(node),
                        params: consumption.params.clone(),
                        splat: consumption.splat.clone(),
                        path: concrete_path(&segments[..next]),
                        child: Some(Box::new(matched)),
                    });
                }
            }
        }
    }

    // Second pass: terminate here when the cursor is exhausted. Redirects
    // only ever terminate; they have no children to descend into.
    for consumption in consumptions {
        let next = from + consumption.consumed;
        if next == segments.len() {
            return Some(Match {
                config: Arc::clone(node),
                params: consumption.params,
                splat: consumption.splat,
                path: concrete_path(&segments[..next]),
                child: None,
            });
        }
    }

    None
}

fn concrete_path(consumed: &[&str]) -> String {
    if consumed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", consumed.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{compile, CompileOptions, RouteNode};
    use pretty_assertions::assert_eq;

    fn users_tree() -> RouteTree {
        compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("users").child(RouteNode::new(":id"))),
            &CompileOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_match_chain_shape() {
        let tree = users_tree();
        let matched = tree.match_url("/users/42").unwrap();

        let paths: Vec<&str> = matched.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/users", "/users/42"]);
        assert_eq!(matched.depth(), 3);
        assert_eq!(
            matched.deepest().params.get("id"),
            Some(&"42".to_string())
        );
        // Params are captured at the level that consumed them
        assert!(matched.params.is_empty());
    }

    #[test]
    fn test_match_intermediate_node_terminates_chain() {
        let tree = users_tree();
        let matched = tree.match_url("/users").unwrap();
        assert_eq!(matched.depth(), 2);
        assert!(matched.deepest().child.is_none());
    }

    #[test]
    fn test_no_match_returns_none() {
        let tree = users_tree();
        assert!(tree.match_url("/users/42/posts").is_none());
        assert!(tree.match_url("/other").is_none());
    }

    #[test]
    fn test_match_is_idempotent() {
        let tree = users_tree();
        let a = tree.match_url("/users/42").unwrap();
        let b = tree.match_url("/users/42").unwrap();
        assert_eq!(
            a.iter().map(|m| m.path.clone()).collect::<Vec<_>>(),
            b.iter().map(|m| m.path.clone()).collect::<Vec<_>>()
        );
        assert_eq!(a.merged_params(), b.merged_params());
    }

    #[test]
    fn test_score_order_picks_literal_over_param() {
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new(":slug"))
                .child(RouteNode::new("about")),
            &CompileOptions::default(),
        )
        .unwrap();

        let matched = tree.match_url("/about").unwrap();
        assert_eq!(
            matched.deepest().config.descriptor().to_string(),
            "/about"
        );

        let matched = tree.match_url("/something").unwrap();
        assert_eq!(
            matched.deepest().params.get("slug"),
            Some(&"something".to_string())
        );
    }

    #[test]
    fn test_splat_captures_remainder() {
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("docs/*")),
            &CompileOptions::default(),
        )
        .unwrap();

        let matched = tree.match_url("/docs/guide/intro").unwrap();
        let deepest = matched.deepest();
        assert_eq!(deepest.splat, vec!["guide", "intro"]);
        assert_eq!(deepest.path, "/docs/guide/intro");
    }

    #[test]
    fn test_query_string_ignored_for_matching() {
        let tree = users_tree();
        let matched = tree.match_url("/users/42?tab=posts").unwrap();
        assert_eq!(matched.deepest().path, "/users/42");
    }

    #[test]
    fn test_redirect_terminates_chain() {
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::redirect("old", "/new"))
                .child(RouteNode::new("new")),
            &CompileOptions::default(),
        )
        .unwrap();

        let matched = tree.match_url("/old").unwrap();
        assert!(matches!(
            matched.deepest().config.as_ref(),
            RouteConfigNode::Redirect(_)
        ));
    }

    #[test]
    fn test_optional_segment_backtracks_for_child() {
        // `/files/:rev?` with child `latest`: the optional param must decline
        // "latest" so the literal child can take it
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("files/:rev?").child(RouteNode::new("latest"))),
            &CompileOptions::default(),
        )
        .unwrap();

        let matched = tree.match_url("/files/latest").unwrap();
        assert_eq!(matched.depth(), 3);
        assert!(matched.deepest().params.is_empty());

        let matched = tree.match_url("/files/abc123").unwrap();
        assert_eq!(matched.depth(), 2);
        assert_eq!(
            matched.deepest().params.get("rev"),
            Some(&"abc123".to_string())
        );
    }

    #[test]
    fn test_pathless_group_keeps_literal_priority() {
        // `/about` lives under a pathless group beside a `:slug` sibling; the
        // literal must still win for "/about"
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new(":slug"))
                .child(RouteNode::pathless().child(RouteNode::new("about"))),
            &CompileOptions::default(),
        )
        .unwrap();

        let matched = tree.match_url("/about").unwrap();
        assert_eq!(
            matched.deepest().config.descriptor().to_string(),
            "/about"
        );
        assert!(matched.deepest().params.is_empty());

        let matched = tree.match_url("/anything-else").unwrap();
        assert_eq!(
            matched.deepest().params.get("slug"),
            Some(&"anything-else".to_string())
        );
    }

    #[test]
    fn test_case_insensitive_matching() {
        let tree = compile(
            RouteNode::new("/").root().child(RouteNode::new("About")),
            &CompileOptions::default().with_case(CaseSensitivity::Insensitive),
        )
        .unwrap();

        assert!(tree.match_url("/about").is_some());
        assert!(tree.match_url("/ABOUT").is_some());
    }

    #[test]
    fn test_unreachable_duplicate_never_matches() {
        let tree = compile(
            RouteNode::new("/")
                .root()
                .child(RouteNode::new("users/:id"))
                .child(RouteNode::new("users/:userId")),
            &CompileOptions::default(),
        )
        .unwrap();

        let matched = tree.match_url("/users/42").unwrap();
        assert_eq!(
            matched.deepest().params.get("id"),
            Some(&"42".to_string())
        );
    }
}
