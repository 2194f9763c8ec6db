//! Semantic versions and version range predicates.
//!
//! Ordering follows semver precedence: numeric `major.minor.patch`, then
//! prerelease identifiers, with a prerelease sorting before its release.
//! Build metadata never affects ordering or equality.
//!
//! Ranges are disjunctions of comparator sets. Accepted forms:
//! - exact: `1.2.3`, `=1.2.3`
//! - comparisons: `>=1.0.0`, `> 1.0`, `<2`, `<= 1.4.x`
//! - conjunction by whitespace: `>= 1.0.0 < 2.0.0`
//! - union: `1.x || >= 3.0.0`
//! - wildcards and partials: `*`, `1.x`, `1.2.X`, `1`, `1.2`
//! - hyphen ranges: `1.0.0 - 2.3`
//! - tilde and caret: `~1.2`, `^0.3.1`

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use modkit_util::errors::{ModkitError, ModkitResult};

/// An immutable semantic version.
#[derive(Debug, Clone)]
pub struct Version {
    inner: semver::Version,
}

impl Version {
    /// Parse a version string such as `1.2.3`, `1.2.3-rc.1` or `1.2.3+build.5`.
    pub fn parse(input: &str) -> ModkitResult<Self> {
        semver::Version::parse(input.trim())
            .map(|inner| Self { inner })
            .map_err(|e| {
                ModkitError::MalformedVersion {
                    input: input.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            inner: semver::Version::new(major, minor, patch),
        }
    }

    pub fn major(&self) -> u64 {
        self.inner.major
    }

    pub fn minor(&self) -> u64 {
        self.inner.minor
    }

    pub fn patch(&self) -> u64 {
        self.inner.patch
    }

    pub fn is_prerelease(&self) -> bool {
        !self.inner.pre.is_empty()
    }

    fn same_triple(&self, other: &Version) -> bool {
        self.major() == other.major() && self.minor() == other.minor() && self.patch() == other.patch()
    }

    fn with_pre(major: u64, minor: u64, patch: u64, pre: semver::Prerelease) -> Self {
        let mut inner = semver::Version::new(major, minor, patch);
        inner.pre = pre;
        Self { inner }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::str::FromStr for Version {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major()
            .cmp(&other.major())
            .then(self.minor().cmp(&other.minor()))
            .then(self.patch().cmp(&other.patch()))
            .then_with(|| self.inner.pre.cmp(&other.inner.pre))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.major().hash(state);
        self.minor().hash(state);
        self.patch().hash(state);
        self.inner.pre.as_str().hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Comparator {
    op: Op,
    version: Version,
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn matches(&self, v: &Version) -> bool {
        let ord = v.cmp(&self.version);
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Gt => ord == Ordering::Greater,
            Op::Ge => ord != Ordering::Less,
            Op::Lt => ord == Ordering::Less,
            Op::Le => ord != Ordering::Greater,
        }
    }
}

/// A conjunction of comparators. An empty set matches every release version.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ComparatorSet(Vec<Comparator>);

impl ComparatorSet {
    fn includes(&self, v: &Version) -> bool {
        if !self.0.iter().all(|c| c.matches(v)) {
            return false;
        }
        // Prereleases only match when the set explicitly names a prerelease
        // on the same major.minor.patch.
        !v.is_prerelease()
            || self
                .0
                .iter()
                .any(|c| c.version.is_prerelease() && c.version.same_triple(v))
    }
}

/// A predicate over [`Version`]s.
///
/// [`VersionRange::EMPTY`]-style ranges (no comparator sets) match nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    sets: Vec<ComparatorSet>,
}

impl VersionRange {
    /// A range matching no version at all.
    pub fn empty() -> Self {
        Self { sets: Vec::new() }
    }

    /// A range matching every release (non-prerelease) version.
    pub fn any() -> Self {
        Self {
            sets: vec![ComparatorSet::default()],
        }
    }

    /// A range matching exactly `version`.
    pub fn exact(version: &Version) -> Self {
        Self {
            sets: vec![ComparatorSet(vec![Comparator::new(Op::Eq, version.clone())])],
        }
    }

    /// `>= version` restricted to the same major version line.
    ///
    /// Prereleases are never admitted unless `version` itself is one.
    pub fn same_major_at_least(version: &Version) -> Self {
        let mut comparators = vec![Comparator::new(Op::Ge, version.clone())];
        if let Some(next) = version.major().checked_add(1) {
            comparators.push(Comparator::new(Op::Lt, Version::new(next, 0, 0)));
        }
        Self {
            sets: vec![ComparatorSet(comparators)],
        }
    }

    /// Parse a range expression, failing with `MalformedRange`.
    pub fn parse(input: &str) -> ModkitResult<Self> {
        let malformed = |reason: String| -> miette::Report {
            ModkitError::MalformedRange {
                input: input.to_string(),
                reason,
            }
            .into()
        };
        let mut sets = Vec::new();
        for part in input.split("||") {
            let set = parse_set(part.trim()).map_err(malformed)?;
            sets.push(set);
        }
        Ok(Self { sets })
    }

    /// Parse an advisory range, substituting [`VersionRange::empty`] on
    /// failure so that a bad constraint can never mean "anything goes".
    pub fn parse_or_empty(input: &str) -> Self {
        match Self::parse(input) {
            Ok(range) => range,
            Err(e) => {
                tracing::debug!("treating unparsable range as empty: {e}");
                Self::empty()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Whether `version` satisfies this range.
    pub fn includes(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set.includes(version))
    }

    /// The logical AND of two ranges. The result is not simplified.
    pub fn intersect(&self, other: &VersionRange) -> VersionRange {
        let mut sets = Vec::with_capacity(self.sets.len() * other.sets.len());
        for a in &self.sets {
            for b in &other.sets {
                let mut comparators = a.0.clone();
                comparators.extend(b.0.iter().cloned());
                sets.push(ComparatorSet(comparators));
            }
        }
        VersionRange { sets }
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::any()
    }
}

impl std::str::FromStr for VersionRange {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sets.is_empty() {
            return f.write_str("<empty>");
        }
        for (i, set) in self.sets.iter().enumerate() {
            if i > 0 {
                f.write_str(" || ")?;
            }
            if set.0.is_empty() {
                f.write_str("*")?;
            }
            for (j, c) in set.0.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}{}", c.op.symbol(), c.version)?;
            }
        }
        Ok(())
    }
}

/// A possibly partial version: `1`, `1.2`, `1.x`, `1.2.3-rc.1`.
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: semver::Prerelease,
}

impl Partial {
    fn parse(input: &str) -> Result<Self, String> {
        let s = input.strip_prefix('v').unwrap_or(input);
        if s.is_empty() {
            return Err("missing version".to_string());
        }
        let s = s.split_once('+').map_or(s, |(head, _)| head);
        let (numbers, pre) = match s.split_once('-') {
            Some((numbers, pre)) => {
                let pre = semver::Prerelease::new(pre)
                    .map_err(|e| format!("invalid prerelease in '{input}': {e}"))?;
                (numbers, pre)
            }
            None => (s, semver::Prerelease::EMPTY),
        };

        let mut parts = [None; 3];
        let mut wildcard = false;
        let pieces: Vec<&str> = numbers.split('.').collect();
        if pieces.len() > 3 {
            return Err(format!("too many components in '{input}'"));
        }
        for (slot, piece) in parts.iter_mut().zip(&pieces) {
            if matches!(*piece, "x" | "X" | "*") {
                wildcard = true;
                continue;
            }
            if wildcard {
                return Err(format!("'{input}' has a number after a wildcard"));
            }
            let n = piece
                .parse::<u64>()
                .map_err(|_| format!("'{piece}' is not a version number"))?;
            *slot = Some(n);
        }
        let partial = Self {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            pre,
        };
        if !partial.pre.is_empty() && partial.patch.is_none() {
            return Err(format!("prerelease on a partial version in '{input}'"));
        }
        Ok(partial)
    }

    fn is_full(&self) -> bool {
        self.patch.is_some()
    }

    /// The lowest version this partial describes.
    fn floor(&self) -> Version {
        Version::with_pre(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
            self.pre.clone(),
        )
    }

    /// The first version past everything this partial describes, or `None`
    /// when the partial is fully wild.
    fn ceiling(&self) -> Result<Option<Version>, String> {
        Ok(match (self.major, self.minor, self.patch) {
            (None, _, _) => None,
            (Some(major), None, _) => Some(Version::new(bump(major)?, 0, 0)),
            (Some(major), Some(minor), None) => Some(Version::new(major, bump(minor)?, 0)),
            (Some(major), Some(minor), Some(patch)) => Some(Version::new(major, minor, bump(patch)?)),
        })
    }
}

/// The next value of a version component.
fn bump(component: u64) -> Result<u64, String> {
    component
        .checked_add(1)
        .ok_or_else(|| format!("version component {component} has no successor"))
}

fn parse_set(input: &str) -> Result<ComparatorSet, String> {
    if input.is_empty() {
        return Ok(ComparatorSet::default());
    }

    let tokens = tokenize(input);
    if tokens.len() == 3 && tokens[1] == "-" {
        return hyphen_range(&tokens[0], &tokens[2]);
    }

    let mut comparators = Vec::new();
    for token in &tokens {
        comparators.extend(parse_comparator(token)?);
    }
    Ok(ComparatorSet(comparators))
}

/// Split on whitespace, gluing a bare operator to the version after it.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;
    for word in input.split_whitespace() {
        if matches!(word, ">=" | "<=" | ">" | "<" | "=" | "~" | "^" | "~>") {
            pending_op = Some(word);
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(format!("{op}{word}")),
            None => tokens.push(word.to_string()),
        }
    }
    if let Some(op) = pending_op {
        tokens.push(op.to_string());
    }
    tokens
}

fn hyphen_range(low: &str, high: &str) -> Result<ComparatorSet, String> {
    let low = Partial::parse(low)?;
    let high = Partial::parse(high)?;
    let mut comparators = vec![Comparator::new(Op::Ge, low.floor())];
    if high.is_full() {
        comparators.push(Comparator::new(Op::Le, high.floor()));
    } else if let Some(ceiling) = high.ceiling()? {
        comparators.push(Comparator::new(Op::Lt, ceiling));
    }
    Ok(ComparatorSet(comparators))
}

fn parse_comparator(token: &str) -> Result<Vec<Comparator>, String> {
    let (op, rest) = split_operator(token);
    let partial = Partial::parse(rest)?;

    let comparators = match op {
        "" | "=" => {
            if partial.is_full() {
                vec![Comparator::new(Op::Eq, partial.floor())]
            } else {
                bounded(&partial)?
            }
        }
        ">=" => vec![Comparator::new(Op::Ge, partial.floor())],
        ">" if partial.is_full() => vec![Comparator::new(Op::Gt, partial.floor())],
        ">" => match partial.ceiling()? {
            Some(ceiling) => vec![Comparator::new(Op::Ge, ceiling)],
            // `> *` can never be satisfied.
            None => vec![Comparator::new(Op::Lt, Version::new(0, 0, 0))],
        },
        "<" => vec![Comparator::new(Op::Lt, partial.floor())],
        "<=" if partial.is_full() => vec![Comparator::new(Op::Le, partial.floor())],
        "<=" => match partial.ceiling()? {
            Some(ceiling) => vec![Comparator::new(Op::Lt, ceiling)],
            None => Vec::new(),
        },
        "~" | "~>" => {
            let floor = partial.floor();
            let ceiling = match (partial.major, partial.minor) {
                (None, _) => None,
                (Some(major), None) => Some(Version::new(bump(major)?, 0, 0)),
                (Some(major), Some(minor)) => Some(Version::new(major, bump(minor)?, 0)),
            };
            with_ceiling(floor, ceiling)
        }
        "^" => {
            let floor = partial.floor();
            let ceiling = match (partial.major, partial.minor, partial.patch) {
                (None, _, _) => None,
                (Some(0), Some(0), Some(patch)) => Some(Version::new(0, 0, bump(patch)?)),
                (Some(0), Some(minor), _) => Some(Version::new(0, bump(minor)?, 0)),
                (Some(major), _, _) => Some(Version::new(bump(major)?, 0, 0)),
            };
            with_ceiling(floor, ceiling)
        }
        other => return Err(format!("unknown operator '{other}'")),
    };
    Ok(comparators)
}

fn bounded(partial: &Partial) -> Result<Vec<Comparator>, String> {
    Ok(with_ceiling(partial.floor(), partial.ceiling()?))
}

fn with_ceiling(floor: Version, ceiling: Option<Version>) -> Vec<Comparator> {
    match ceiling {
        Some(ceiling) => vec![
            Comparator::new(Op::Ge, floor),
            Comparator::new(Op::Lt, ceiling),
        ],
        None => Vec::new(),
    }
}

fn split_operator(token: &str) -> (&str, &str) {
    for op in [">=", "<=", "~>", ">", "<", "=", "~", "^"] {
        if let Some(rest) = token.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("", token)
}
