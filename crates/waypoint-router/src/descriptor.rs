// File: src/descriptor.rs
// Purpose: Parsed, scorable route path templates and their equivalence rules

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;

/// Errors raised while parsing a path template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    /// A wildcard segment appeared before the final position
    #[error("splat segment must be the last segment in {0:?}")]
    SplatNotLast(String),
    /// The template contains a `#` fragment; routing never depends on the fragment
    #[error("path template {0:?} contains a hash fragment")]
    HashFragment(String),
}

/// Case handling policy for literal segments
///
/// Applies both to matching and to descriptor equivalence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
}

impl CaseSensitivity {
    pub(crate) fn eq(self, a: &str, b: &str) -> bool {
        match self {
            CaseSensitivity::Sensitive => a == b,
            CaseSensitivity::Insensitive => a.eq_ignore_ascii_case(b),
        }
    }

    fn fold(self, s: &str) -> String {
        match self {
            CaseSensitivity::Sensitive => s.to_string(),
            CaseSensitivity::Insensitive => s.to_ascii_lowercase(),
        }
    }
}

/// The matchable shape of one path segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Static text, matched verbatim (modulo case policy)
    Literal(String),
    /// Named parameter capturing exactly one concrete segment
    Param(String),
    /// Wildcard capturing all remaining segments; must be last
    Splat,
}

/// One segment spec: a kind plus an optional flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentSpec {
    pub kind: SegmentKind,
    pub optional: bool,
}

/// A parsed path template
///
/// # Template syntax
///
/// - `users` — literal segment
/// - `:id` — parameter segment
/// - `*` or `*rest` — splat (wildcard) segment, must be last
/// - a trailing `?` marks any segment optional: `:id?`, `archive?`, `*rest?`
///
/// # Examples
///
/// ```
/// use waypoint_router::descriptor::{PathDescriptor, SegmentKind};
///
/// let desc = PathDescriptor::parse("/users/:id").unwrap();
/// assert_eq!(desc.segments().len(), 2);
/// assert!(matches!(desc.segments()[1].kind, SegmentKind::Param(_)));
///
/// assert!(PathDescriptor::parse("/docs/*rest/more").is_err());
/// assert!(PathDescriptor::parse("/about#team").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathDescriptor {
    segments: Vec<SegmentSpec>,
}

/// Positions beyond this depth no longer influence the score. Sixteen
/// segments is far deeper than any practical route tree nests.
const MAX_SCORED_SEGMENTS: usize = 16;

impl PathDescriptor {
    /// The empty descriptor: consumes no segments, inherits its parent's base
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parses a path template into a descriptor
    pub fn parse(template: &str) -> Result<Self, DescriptorError> {
        if template.contains('#') {
            return Err(DescriptorError::HashFragment(template.to_string()));
        }

        let raw_segments: Vec<&str> = template.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(raw_segments.len());

        for (idx, raw) in raw_segments.iter().enumerate() {
            let (body, optional) = match raw.strip_suffix('?') {
                Some(body) => (body, true),
                None => (*raw, false),
            };

            let kind = if body.starts_with('*') {
                if idx != raw_segments.len() - 1 {
                    return Err(DescriptorError::SplatNotLast(template.to_string()));
                }
                // `*rest` and `*` are the same shape; the name is cosmetic
                SegmentKind::Splat
            } else if let Some(name) = body.strip_prefix(':') {
                SegmentKind::Param(name.to_string())
            } else {
                SegmentKind::Literal(body.to_string())
            };

            segments.push(SegmentSpec { kind, optional });
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[SegmentSpec] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Whether the final segment is a splat
    pub fn has_splat(&self) -> bool {
        matches!(
            self.segments.last(),
            Some(SegmentSpec {
                kind: SegmentKind::Splat,
                ..
            })
        )
    }

    /// Joins this descriptor onto an ancestor base, for nested resolution
    pub fn resolve_against(&self, base: &PathDescriptor) -> PathDescriptor {
        let mut segments = base.segments.clone();
        segments.extend(self.segments.iter().cloned());
        PathDescriptor { segments }
    }

    /// Computes the specificity score
    ///
    /// Higher score = more specific = matched first. The score is a positional
    /// encoding: each segment contributes a weight (literal > param > splat,
    /// required > optional) shifted so that earlier positions strictly dominate
    /// later ones. A descriptor with an additional leading literal therefore
    /// always outranks one without it, no matter how many parameter or splat
    /// segments trail either of them.
    ///
    /// Ties (identical shapes) are broken by declaration order via stable
    /// sorting in the compiler, never here.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_router::descriptor::PathDescriptor;
    ///
    /// let literal = PathDescriptor::parse("/users/list").unwrap();
    /// let param = PathDescriptor::parse("/users/:id").unwrap();
    /// let splat = PathDescriptor::parse("/users/*").unwrap();
    ///
    /// assert!(literal.score() > param.score());
    /// assert!(param.score() > splat.score());
    /// ```
    pub fn score(&self) -> u64 {
        self.segments
            .iter()
            .take(MAX_SCORED_SEGMENTS)
            .enumerate()
            .map(|(idx, seg)| {
                let kind_weight: u64 = match seg.kind {
                    SegmentKind::Literal(_) => 3,
                    SegmentKind::Param(_) => 2,
                    SegmentKind::Splat => 1,
                };
                // Required outranks optional of the same kind: 6/5, 4/3, 2/1
                let weight = kind_weight * 2 - u64::from(seg.optional);
                let shift = (MAX_SCORED_SEGMENTS - 1 - idx) as u32 * 3;
                weight << shift
            })
            .sum()
    }

    /// Tests whether two descriptors accept the same set of concrete paths
    ///
    /// Parameter names are ignored, literal casing follows the given policy,
    /// and optional segments are expanded into their include/exclude variants
    /// before comparison.
    ///
    /// # Examples
    ///
    /// ```
    /// use waypoint_router::descriptor::{CaseSensitivity, PathDescriptor};
    ///
    /// let a = PathDescriptor::parse("/users/:id").unwrap();
    /// let b = PathDescriptor::parse("/users/:userId").unwrap();
    /// assert!(a.equivalent(&b, CaseSensitivity::Sensitive));
    ///
    /// let c = PathDescriptor::parse("/users/list").unwrap();
    /// assert!(!a.equivalent(&c, CaseSensitivity::Sensitive));
    /// ```
    pub fn equivalent(&self, other: &PathDescriptor, case: CaseSensitivity) -> bool {
        self.shapes(case) == other.shapes(case)
    }

    /// Expands optional segments and erases parameter names, yielding the set
    /// of canonical shapes this descriptor accepts
    fn shapes(&self, case: CaseSensitivity) -> BTreeSet<Vec<CanonicalSegment>> {
        let mut shapes: BTreeSet<Vec<CanonicalSegment>> = BTreeSet::new();
        shapes.insert(Vec::new());

        for seg in &self.segments {
            let canon = match &seg.kind {
                SegmentKind::Literal(lit) => CanonicalSegment::Literal(case.fold(lit)),
                SegmentKind::Param(_) => CanonicalSegment::Param,
                SegmentKind::Splat => CanonicalSegment::Splat,
            };

            let mut next = BTreeSet::new();
            for shape in &shapes {
                if seg.optional {
                    next.insert(shape.clone());
                }
                let mut extended = shape.clone();
                extended.push(canon.clone());
                next.insert(extended);
            }
            shapes = next;
        }

        shapes
    }

    /// Attempts to consume this descriptor against the remaining path cursor
    ///
    /// Returns every viable consumption, most-consumed first, so the matcher
    /// can prefer greedy optional capture but still fall back when a child
    /// needs the segment. Parameters capture one segment each; a splat
    /// captures the entire remaining cursor.
    pub(crate) fn consumptions(&self, cursor: &[&str], case: CaseSensitivity) -> Vec<Consumption> {
        let mut out = Vec::new();
        consume_from(
            &self.segments,
            cursor,
            0,
            Consumption::default(),
            case,
            &mut out,
        );
        out
    }
}

impl fmt::Display for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for seg in &self.segments {
            f.write_str("/")?;
            match &seg.kind {
                SegmentKind::Literal(lit) => f.write_str(lit)?,
                SegmentKind::Param(name) => write!(f, ":{}", name)?,
                SegmentKind::Splat => f.write_str("*")?,
            }
            if seg.optional {
                f.write_str("?")?;
            }
        }
        Ok(())
    }
}

/// Canonical segment shape with parameter names erased
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum CanonicalSegment {
    Literal(String),
    Param,
    Splat,
}

/// One viable consumption of a descriptor against a cursor
#[derive(Debug, Clone, Default)]
pub(crate) struct Consumption {
    pub params: HashMap<String, String>,
    pub splat: Vec<String>,
    pub consumed: usize,
}

fn consume_from(
    segments: &[SegmentSpec],
    cursor: &[&str],
    at: usize,
    partial: Consumption,
    case: CaseSensitivity,
    out: &mut Vec<Consumption>,
) {
    let Some(spec) = segments.first() else {
        out.push(partial);
        return;
    };
    let rest = &segments[1..];

    match &spec.kind {
        SegmentKind::Splat => {
            let remaining: Vec<String> = cursor[at..].iter().map(|s| s.to_string()).collect();
            if remaining.is_empty() && !spec.optional {
                return;
            }
            let mut taken = partial.clone();
            taken.consumed = cursor.len();
            taken.splat = remaining;
            out.push(taken);
            // An optional splat may also decline the remainder entirely
            if spec.optional && at < cursor.len() {
                consume_from(rest, cursor, at, partial, case, out);
            }
        }
        SegmentKind::Param(name) => {
            if at < cursor.len() {
                let mut taken = partial.clone();
                taken.params.insert(name.clone(), cursor[at].to_string());
                taken.consumed = at + 1;
                consume_from(rest, cursor, at + 1, taken, case, out);
            }
            if spec.optional {
                consume_from(rest, cursor, at, partial, case, out);
            }
        }
        SegmentKind::Literal(lit) => {
            if at < cursor.len() && case.eq(lit, cursor[at]) {
                let mut taken = partial.clone();
                taken.consumed = at + 1;
                consume_from(rest, cursor, at + 1, taken, case, out);
            }
            if spec.optional {
                consume_from(rest, cursor, at, partial, case, out);
            }
        }
    }
}
