//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    use crate::core::graph::DependencyGraph;

    /// Generate a valid Debian package name
    pub fn package_name() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9+.-]{1,30}"
    }

    /// Unit names `u0..u{n}` in a random order
    fn shuffled_names(n: usize) -> impl Strategy<Value = Vec<String>> {
        Just((0..n).map(|i| format!("u{i}")).collect::<Vec<_>>()).prop_shuffle()
    }

    /// Generate an acyclic graph of 1 to `max_units` units
    ///
    /// Edges always point from a later to an earlier unit of a shuffled
    /// ranking, so name order and topological order are unrelated.
    pub fn acyclic_graph(max_units: usize) -> impl Strategy<Value = DependencyGraph> {
        (1..=max_units)
            .prop_flat_map(|n| {
                (
                    shuffled_names(n),
                    proptest::collection::vec((0..n, 0..n), 0..=n * 2),
                )
            })
            .prop_map(|(names, edges)| {
                let mut graph = DependencyGraph::new();
                for name in &names {
                    graph.add_unit(name);
                }
                for (a, b) in edges {
                    graph.add_edge(&names[a.max(b)], &names[a.min(b)]);
                }
                graph
            })
    }

    /// Generate a graph of 2 to `max_units` units containing at least one cycle
    pub fn cyclic_graph(max_units: usize) -> impl Strategy<Value = DependencyGraph> {
        (2..=max_units.max(2))
            .prop_flat_map(|n| (shuffled_names(n), 2..=n))
            .prop_map(|(names, len)| {
                let mut graph = DependencyGraph::new();
                for name in &names {
                    graph.add_unit(name);
                }
                for i in 1..len {
                    graph.add_edge(&names[i], &names[i - 1]);
                }
                graph.add_edge(&names[0], &names[len - 1]);
                graph
            })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use crate::core::control::Possibility;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_package_name_generator_parses(name in package_name()) {
            let p: Possibility = name.parse().unwrap();
            prop_assert_eq!(p.name, name);
        }

        #[test]
        fn test_acyclic_graph_has_no_self_edges(g in acyclic_graph(10)) {
            prop_assert!(!g.is_empty());
            prop_assert!(g.edges().all(|(u, d)| u != d));
        }

        #[test]
        fn test_cyclic_graph_has_edges(g in cyclic_graph(10)) {
            prop_assert!(g.edge_count() >= 2);
        }
    }
}
