//! Dependency resolution
//!
//! Linearizes the dependency graph into a build order and detects cycles.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::core::graph::{BaseTiers, DependencyGraph};
use crate::core::metadata::MetadataIndex;
use crate::error::{ForgeError, ResolverError};

/// The sequence in which units are built
///
/// `resolved` is a topological order of the graph (dependencies first);
/// `deferred` holds units with unparseable metadata, built last.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildOrder {
    resolved: Vec<String>,
    deferred: Vec<String>,
}

impl BuildOrder {
    /// Units in topological order
    pub fn resolved(&self) -> &[String] {
        &self.resolved
    }

    /// Units appended after the resolved ones
    pub fn deferred(&self) -> &[String] {
        &self.deferred
    }

    /// Every unit, in build order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.resolved
            .iter()
            .chain(self.deferred.iter())
            .map(String::as_str)
    }

    /// Consume into the flat list of units
    pub fn into_units(self) -> Vec<String> {
        let mut units = self.resolved;
        units.extend(self.deferred);
        units
    }

    /// Index of `unit` in the order
    pub fn position(&self, unit: &str) -> Option<usize> {
        self.iter().position(|u| u == unit)
    }

    /// Total number of units
    pub fn len(&self) -> usize {
        self.resolved.len() + self.deferred.len()
    }

    /// Whether there is nothing to build
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for BuildOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.iter().collect::<Vec<_>>().join(" "))
    }
}

/// Everything learned while ordering a source root
#[derive(Debug)]
pub struct BuildPlan {
    /// Parsed metadata
    pub index: MetadataIndex,
    /// Dependency graph over parsed units
    pub graph: DependencyGraph,
    /// Resulting build order
    pub order: BuildOrder,
}

impl BuildPlan {
    /// Scan `src_dir` and order its units
    pub fn from_directory(src_dir: &Path, base: &BaseTiers) -> Result<Self, ForgeError> {
        let index = MetadataIndex::scan(src_dir)?;
        let graph = DependencyGraph::from_index(&index, base);
        let order = resolve(&graph, &index.unparseable_names())?;
        tracing::debug!(
            "{} units, {} edges, {} unparseable, {} unresolved dependencies",
            graph.len(),
            graph.edge_count(),
            index.unparseable().len(),
            graph.unresolved().len()
        );
        Ok(Self { index, graph, order })
    }
}

/// Compute the build order: sorted graph followed by `unparseable` units
pub fn resolve(graph: &DependencyGraph, unparseable: &[String]) -> Result<BuildOrder, ResolverError> {
    let resolved = topological_sort(graph)?;
    Ok(BuildOrder {
        resolved,
        deferred: unparseable.to_vec(),
    })
}

/// Compute topological sort (build order)
///
/// Returns units in order such that dependencies come before dependents.
/// Among units whose dependencies are all satisfied, the lexicographically
/// smallest is emitted first, so a given graph always sorts the same way.
pub fn topological_sort(graph: &DependencyGraph) -> Result<Vec<String>, ResolverError> {
    let mut remaining: BTreeMap<&str, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

    for unit in graph.units() {
        let deps = graph.dependencies(unit).map_or(0, BTreeSet::len);
        remaining.insert(unit, deps);
    }
    for (unit, dep) in graph.edges() {
        dependents.entry(dep).or_default().push(unit);
    }

    let mut ready: BTreeSet<&str> = remaining
        .iter()
        .filter(|(_, &n)| n == 0)
        .map(|(&u, _)| u)
        .collect();
    let mut order = Vec::with_capacity(remaining.len());

    while let Some(unit) = ready.pop_first() {
        order.push(unit.to_string());
        for &dependent in dependents.get(unit).into_iter().flatten() {
            if let Some(n) = remaining.get_mut(dependent) {
                *n -= 1;
                if *n == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() < remaining.len() {
        let stuck: BTreeSet<&str> = remaining
            .iter()
            .filter(|(_, &n)| n > 0)
            .map(|(&u, _)| u)
            .collect();
        return Err(ResolverError::CircularDependency {
            cycle: find_cycle(graph, &stuck),
        });
    }

    Ok(order)
}

/// Extract one cycle from the units Kahn's algorithm could not place
///
/// Every stuck unit has at least one stuck dependency, so following those
/// from any stuck unit must revisit a unit.
fn find_cycle(graph: &DependencyGraph, stuck: &BTreeSet<&str>) -> Vec<String> {
    let Some(&start) = stuck.iter().next() else {
        return Vec::new();
    };

    let mut path: Vec<&str> = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = path.iter().position(|&u| u == current) {
            let mut cycle: Vec<String> = path[pos..].iter().map(ToString::to_string).collect();
            cycle.push(current.to_string());
            return cycle;
        }
        path.push(current);

        let next = graph
            .dependencies(current)
            .and_then(|deps| deps.iter().find(|d| stuck.contains(d.as_str())));
        match next {
            Some(dep) => current = dep.as_str(),
            None => return path.iter().map(ToString::to_string).collect(),
        }
    }
}
