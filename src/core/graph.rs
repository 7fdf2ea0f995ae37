//! Dependency graph construction
//!
//! Vertices are units with parseable metadata; an edge `unit -> dep` means
//! `dep` must be built before `unit`. Edges come from build-time relations
//! resolved through the metadata index, plus implicit edges towards the base
//! units every other unit needs.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::defaults;
use crate::core::metadata::MetadataIndex;

/// Ordered tiers of foundational units
///
/// A unit in tier `k` is built after every unit of tiers `0..k`; a unit in
/// no tier is built after every base unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseTiers(Vec<Vec<String>>);

impl BaseTiers {
    /// Create tiers from lists of unit names
    pub fn new(tiers: Vec<Vec<String>>) -> Self {
        Self(tiers)
    }

    /// No implicit base units at all
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// The tiers, lowest first
    pub fn tiers(&self) -> &[Vec<String>] {
        &self.0
    }

    fn tier_of(&self, unit: &str) -> Option<usize> {
        self.0.iter().position(|tier| tier.iter().any(|u| u == unit))
    }

    /// Base units that `unit` must be built after
    pub fn requirements_of<'a>(&'a self, unit: &str) -> impl Iterator<Item = &'a str> + 'a {
        let upto = self.tier_of(unit).unwrap_or(self.0.len());
        self.0[..upto].iter().flatten().map(String::as_str)
    }
}

impl Default for BaseTiers {
    fn default() -> Self {
        Self(
            defaults::DEFAULT_BASE_TIERS
                .iter()
                .map(|tier| tier.iter().map(ToString::to_string).collect())
                .collect(),
        )
    }
}

/// A build-time dependency that no unit of the corpus provides
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedDependency {
    /// Unit declaring the dependency
    pub unit: String,
    /// Package name that did not resolve
    pub package: String,
}

/// Dependency graph over units
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    /// Adjacency list: unit -> units it must be built after
    edges: BTreeMap<String, BTreeSet<String>>,
    /// Alternatives dropped because nothing in the corpus provides them
    unresolved: Vec<UnresolvedDependency>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph for every parsed unit of `index`
    pub fn from_index(index: &MetadataIndex, base: &BaseTiers) -> Self {
        let mut graph = Self::new();
        for (unit, _) in index.units() {
            graph.add_unit(unit);
        }

        for (unit, ctrl) in index.units() {
            for base_unit in base.requirements_of(unit) {
                if graph.contains(base_unit) {
                    graph.add_edge(unit, base_unit);
                }
            }

            for relation in &ctrl.source.build_depends {
                for possibility in relation.possibilities.iter().filter(|p| p.is_package()) {
                    let name = possibility.name.trim();
                    match index.owner(name) {
                        Some(owner) => {
                            if !graph.add_edge(unit, owner) && owner == unit {
                                tracing::debug!("{unit}: ignoring build dependency on own package {name}");
                            }
                        }
                        None => {
                            tracing::debug!("{unit}: {name} is not built from this corpus");
                            graph.unresolved.push(UnresolvedDependency {
                                unit: unit.to_string(),
                                package: name.to_string(),
                            });
                        }
                    }
                }
            }
        }

        graph
    }

    /// Add a vertex; returns false if it was already present
    pub fn add_unit(&mut self, name: &str) -> bool {
        if self.edges.contains_key(name) {
            return false;
        }
        self.edges.insert(name.to_string(), BTreeSet::new());
        true
    }

    /// Record that `unit` must be built after `dependency`
    ///
    /// Missing vertices are added. Self-edges and duplicates are ignored;
    /// returns whether a new edge was created.
    pub fn add_edge(&mut self, unit: &str, dependency: &str) -> bool {
        if unit == dependency {
            return false;
        }
        self.add_unit(dependency);
        self.edges
            .entry(unit.to_string())
            .or_default()
            .insert(dependency.to_string())
    }

    /// Whether `unit` is a vertex
    pub fn contains(&self, unit: &str) -> bool {
        self.edges.contains_key(unit)
    }

    /// All vertices, ordered by name
    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    /// Units that `unit` must be built after
    pub fn dependencies(&self, unit: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(unit)
    }

    /// All edges as `(unit, dependency)` pairs
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.edges
            .iter()
            .flat_map(|(u, deps)| deps.iter().map(move |d| (u.as_str(), d.as_str())))
    }

    /// Number of distinct edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph has no vertices
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Dependencies dropped during construction
    pub fn unresolved(&self) -> &[UnresolvedDependency] {
        &self.unresolved
    }
}
