//! Property Tests for the Dependency Graph
//!
//! Random DAGs are generated as "node i may depend on any node j < i", which
//! can never contain a cycle. Node order is then shuffled so the sorter
//! cannot rely on it.

use std::collections::{BTreeSet, HashMap};

use proptest::prelude::*;

use trellis_core::{topological_sort, DependencyGraph, GraphError};

/// `(node count, edges as (dependent, dependency), input order)`.
fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>, Vec<usize>)> {
    (1usize..24).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n, 0..n), 0..n * 3).prop_map(|pairs| {
            let set: BTreeSet<(usize, usize)> = pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.max(b), a.min(b)))
                .collect();
            set.into_iter().collect::<Vec<_>>()
        });
        let order = Just((0..n).collect::<Vec<_>>()).prop_shuffle();
        (Just(n), edges, order)
    })
}

fn dependencies(edges: &[(usize, usize)]) -> HashMap<usize, Vec<usize>> {
    let mut map: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(dependent, dependency) in edges {
        map.entry(dependent).or_default().push(dependency);
    }
    map
}

fn build(order: &[usize], edges: &[(usize, usize)]) -> DependencyGraph<usize> {
    DependencyGraph::from_edges(order.iter().copied(), edges.iter().copied()).unwrap()
}

proptest! {
    #[test]
    fn sort_never_places_node_before_dependency((_n, edges, order) in dag()) {
        let deps = dependencies(&edges);
        let sorted = topological_sort(order.clone(), |id| {
            deps.get(id).cloned().unwrap_or_default()
        })
        .unwrap();

        prop_assert_eq!(sorted.len(), order.len());
        let position: HashMap<usize, usize> =
            sorted.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        for (dependent, dependency) in &edges {
            prop_assert!(position[dependency] < position[dependent]);
        }
    }

    #[test]
    fn cached_order_matches_free_sort((_n, edges, order) in dag()) {
        let deps = dependencies(&edges);
        let sorted = topological_sort(order.clone(), |id| {
            deps.get(id).cloned().unwrap_or_default()
        })
        .unwrap();
        let graph = build(&order, &edges);
        prop_assert_eq!(graph.topological_order().unwrap(), sorted.as_slice());
    }

    #[test]
    fn back_edge_is_always_detected((_n, edges, order) in dag(), pick in any::<prop::sample::Index>()) {
        prop_assume!(!edges.is_empty());
        let (dependent, dependency) = edges[pick.index(edges.len())];

        let mut graph = build(&order, &edges);
        graph.add_dependency(&dependency, &dependent).unwrap();

        let is_cycle = matches!(
            graph.topological_order(),
            Err(GraphError::CycleDetected { .. })
        );
        prop_assert!(is_cycle);
    }

    #[test]
    fn mutations_match_fresh_graph(
        (n, edges, order) in dag(),
        toggles in prop::collection::vec((0usize..24, 0usize..24), 0..16),
    ) {
        let mut graph = build(&order, &edges);
        let mut final_edges: BTreeSet<(usize, usize)> = edges.iter().copied().collect();

        for (a, b) in toggles {
            let (a, b) = (a % n, b % n);
            if a == b {
                continue;
            }
            let edge = (a.max(b), a.min(b));
            if final_edges.remove(&edge) {
                prop_assert!(graph.remove_dependency(&edge.0, &edge.1).unwrap());
            } else {
                graph.add_dependency(&edge.0, &edge.1).unwrap();
                final_edges.insert(edge);
            }
        }

        let final_edges: Vec<(usize, usize)> = final_edges.into_iter().collect();
        let fresh = build(&order, &final_edges);
        for node in 0..n {
            prop_assert_eq!(
                graph.find_descendants(&node).unwrap(),
                fresh.find_descendants(&node).unwrap()
            );
        }
    }
}
