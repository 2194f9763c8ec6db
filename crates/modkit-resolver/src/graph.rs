//! The constraint graph: candidate releases per module name plus every
//! constraint a resolution must honour.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use modkit_util::errors::{ModkitError, ModkitResult};

use crate::release::{Release, Source};
use crate::version::VersionRange;

const MAX_CONCURRENT_FETCHES: usize = 8;

/// A predicate over a single candidate release.
pub type Predicate = Arc<dyn Fn(&Release) -> bool + Send + Sync>;

/// A predicate over a (possibly partial) selection. Must be monotone: once
/// false for a selection, false for every superset of it.
pub type SelectionPredicate = Arc<dyn Fn(&[&Release]) -> bool + Send + Sync>;

/// A named restriction on the candidates for one module name.
#[derive(Clone)]
pub struct Constraint {
    pub tag: String,
    pub name: String,
    pub description: String,
    predicate: Predicate,
}

impl Constraint {
    pub fn allows(&self, release: &Release) -> bool {
        (self.predicate)(release)
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.tag, self.name, self.description)
    }
}

/// A named restriction on the selection as a whole.
#[derive(Clone)]
pub struct GraphConstraint {
    pub tag: String,
    pub description: String,
    predicate: SelectionPredicate,
}

impl GraphConstraint {
    pub fn allows(&self, selection: &[&Release]) -> bool {
        (self.predicate)(selection)
    }
}

impl fmt::Debug for GraphConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.tag, self.description)
    }
}

/// Preference order among the candidates of one name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrder {
    /// Newest version first; source priority breaks ties.
    NewestFirst,
    /// Most trusted source first; newest version within a source.
    SourceFirst,
}

impl CandidateOrder {
    fn sort(self, candidates: &mut [Arc<Release>]) {
        match self {
            CandidateOrder::NewestFirst => candidates.sort_by(|a, b| {
                b.version()
                    .cmp(a.version())
                    .then_with(|| a.as_ref().cmp(b.as_ref()))
            }),
            CandidateOrder::SourceFirst => candidates.sort_by(|a, b| {
                a.priority()
                    .cmp(&b.priority())
                    .then_with(|| b.version().cmp(a.version()))
                    .then_with(|| a.as_ref().cmp(b.as_ref()))
            }),
        }
    }
}

/// Candidate releases per name plus the constraints on them.
pub struct ConstraintGraph {
    root: BTreeMap<String, VersionRange>,
    candidates: BTreeMap<String, Vec<Arc<Release>>>,
    constraints: BTreeMap<String, Vec<Constraint>>,
    graph_constraints: Vec<GraphConstraint>,
    expanded: BTreeSet<String>,
    root_order: CandidateOrder,
    dependency_order: CandidateOrder,
}

impl ConstraintGraph {
    /// A graph for the given root request (`name -> range`).
    pub fn new(root: BTreeMap<String, VersionRange>) -> Self {
        Self {
            root,
            candidates: BTreeMap::new(),
            constraints: BTreeMap::new(),
            graph_constraints: Vec::new(),
            expanded: BTreeSet::new(),
            root_order: CandidateOrder::NewestFirst,
            dependency_order: CandidateOrder::SourceFirst,
        }
    }

    /// Convenience for a single-name root request.
    pub fn for_module(name: &str, range: VersionRange) -> Self {
        Self::new(BTreeMap::from([(name.to_string(), range)]))
    }

    /// Override the preference order for root names and for everything else.
    pub fn with_candidate_order(mut self, root: CandidateOrder, dependencies: CandidateOrder) -> Self {
        self.root_order = root;
        self.dependency_order = dependencies;
        let names: Vec<String> = self.candidates.keys().cloned().collect();
        for name in names {
            self.sort_candidates(&name);
        }
        self
    }

    /// The graph for a request whose dependencies are ignored: only `name` is
    /// fetched and its candidates carry no dependencies, so nothing expands.
    pub async fn without_dependencies(
        name: &str,
        range: VersionRange,
        sources: &[Arc<dyn Source>],
    ) -> ModkitResult<Self> {
        let mut graph = Self::for_module(name, range);
        let releases = fetch_releases(name, sources).await?;
        graph.add_candidates(name, releases.iter().map(Release::detached));
        graph.expanded.insert(name.to_string());
        Ok(graph)
    }

    pub fn root(&self) -> &BTreeMap<String, VersionRange> {
        &self.root
    }

    /// Candidates for `name` in preference order.
    pub fn candidates(&self, name: &str) -> &[Arc<Release>] {
        self.candidates.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every name with at least one candidate.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.candidates.keys().map(String::as_str)
    }

    /// Constraints registered against `name`.
    pub fn constraints(&self, name: &str) -> &[Constraint] {
        self.constraints.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn graph_constraints(&self) -> &[GraphConstraint] {
        &self.graph_constraints
    }

    /// Add candidates for `name`, keeping the list in preference order.
    pub fn add_candidates(&mut self, name: &str, releases: impl IntoIterator<Item = Release>) {
        self.candidates
            .entry(name.to_string())
            .or_default()
            .extend(releases.into_iter().map(Arc::new));
        self.sort_candidates(name);
    }

    /// Add a constraint that every candidate for `name` must satisfy.
    pub fn add_constraint(
        &mut self,
        tag: &str,
        name: &str,
        description: impl Into<String>,
        predicate: impl Fn(&Release) -> bool + Send + Sync + 'static,
    ) {
        self.constraints
            .entry(name.to_string())
            .or_default()
            .push(Constraint {
                tag: tag.to_string(),
                name: name.to_string(),
                description: description.into(),
                predicate: Arc::new(predicate),
            });
    }

    /// Add a constraint over the whole selection.
    pub fn add_graph_constraint(
        &mut self,
        tag: &str,
        description: impl Into<String>,
        predicate: impl Fn(&[&Release]) -> bool + Send + Sync + 'static,
    ) {
        self.graph_constraints.push(GraphConstraint {
            tag: tag.to_string(),
            description: description.into(),
            predicate: Arc::new(predicate),
        });
    }

    /// Restrict `name` to versions included by `range`.
    pub fn add_range_constraint(&mut self, tag: &str, name: &str, description: impl Into<String>, range: VersionRange) {
        self.add_constraint(tag, name, description, move |release| {
            range.includes(release.version())
        });
    }

    /// Fetch candidates for every name reachable from the root through
    /// declared dependencies, until no new names appear.
    ///
    /// Fetches for one level of names run concurrently. A failing source is
    /// logged and skipped, unless it is the only source.
    pub async fn query(&mut self, sources: &[Arc<dyn Source>]) -> ModkitResult<()> {
        let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
        let mut frontier = self.unexpanded_names();

        while !frontier.is_empty() {
            tracing::debug!("querying {} module(s): {:?}", frontier.len(), frontier);
            let mut join_set = JoinSet::new();
            for name in &frontier {
                self.expanded.insert(name.clone());
                for (index, source) in sources.iter().enumerate() {
                    let source = Arc::clone(source);
                    let name = name.clone();
                    let sem = Arc::clone(&semaphore);
                    join_set.spawn(async move {
                        let _permit = sem.acquire().await;
                        let result = source.fetch(name.clone()).await;
                        (name, index, result)
                    });
                }
            }

            let mut fetched = Vec::new();
            while let Some(joined) = join_set.join_next().await {
                let item = joined.map_err(|e| ModkitError::Generic {
                    message: format!("module fetch task failed: {e}"),
                })?;
                fetched.push(item);
            }
            // Arrival order is not deterministic.
            fetched.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

            for (name, index, result) in fetched {
                match result {
                    Ok(releases) => self.add_candidates(&name, releases),
                    Err(e) if sources.len() == 1 => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            "skipping {} for {name}: {e}",
                            sources[index].label()
                        );
                    }
                }
            }

            frontier = self.unexpanded_names();
        }
        Ok(())
    }

    /// Root names and dependency names of known candidates not yet fetched.
    fn unexpanded_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for name in self.root.keys() {
            names.insert(name.clone());
        }
        for releases in self.candidates.values() {
            for release in releases {
                names.extend(release.dependencies().keys().cloned());
            }
        }
        names
            .into_iter()
            .filter(|name| !self.expanded.contains(name))
            .collect()
    }

    fn sort_candidates(&mut self, name: &str) {
        let order = if self.root.contains_key(name) {
            self.root_order
        } else {
            self.dependency_order
        };
        if let Some(list) = self.candidates.get_mut(name) {
            order.sort(list);
        }
    }
}

/// Fetch `name` from every source, concatenated in source order.
///
/// A failing source is logged and skipped, unless it is the only source.
pub async fn fetch_releases(name: &str, sources: &[Arc<dyn Source>]) -> ModkitResult<Vec<Release>> {
    let mut releases = Vec::new();
    for source in sources {
        match Arc::clone(source).fetch(name.to_string()).await {
            Ok(found) => releases.extend(found),
            Err(e) if sources.len() == 1 => return Err(e),
            Err(e) => tracing::warn!("skipping {} for {name}: {e}", source.label()),
        }
    }
    Ok(releases)
}
