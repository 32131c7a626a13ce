//! Ordering properties over randomly generated graphs.

use pixgraph::prelude::*;
use proptest::prelude::*;
use std::collections::HashMap;

/// Edge list of a DAG: node `i` may take `A` and `B` from earlier nodes.
#[derive(Debug, Clone)]
struct Dag {
    parents: Vec<(Option<usize>, Option<usize>)>,
}

impl Dag {
    fn name(i: usize) -> String {
        format!("n{:02}", i)
    }

    fn edges(&self) -> Vec<(usize, usize, &'static str)> {
        let mut edges = Vec::new();
        for (dst, (a, b)) in self.parents.iter().enumerate() {
            if let Some(src) = a {
                edges.push((*src, dst, "A"));
            }
            if let Some(src) = b {
                edges.push((*src, dst, "B"));
            }
        }
        edges
    }

    /// Registers nodes in `node_order` and binds edges in `edge_order`.
    fn build(&self, node_order: &[usize], edge_order: &[usize]) -> Graph {
        let mut graph = Graph::new();
        for &i in node_order {
            graph
                .register_node(Self::name(i), "math", &[Attribute::named("op", "add")])
                .unwrap();
        }
        let edges = self.edges();
        for &e in edge_order {
            let (src, dst, port) = edges[e];
            graph
                .bind(&Self::name(src), "Out", &Self::name(dst), port)
                .unwrap();
        }
        graph
    }
}

fn dag() -> impl Strategy<Value = Dag> {
    (1usize..12).prop_flat_map(|n| {
        let parent = || any::<Option<prop::sample::Index>>();
        prop::collection::vec((parent(), parent()), n)
            .prop_map(|raw| Dag {
                parents: raw
                    .into_iter()
                    .enumerate()
                    .map(|(i, (a, b))| {
                        let pick = |ix: Option<prop::sample::Index>| {
                            ix.filter(|_| i > 0).map(|ix| ix.index(i))
                        };
                        (pick(a), pick(b))
                    })
                    .collect(),
            })
    })
}

/// A DAG with two independent (node order, edge order) registration sequences.
type ShuffledDag = (Dag, Vec<usize>, Vec<usize>, Vec<usize>, Vec<usize>);

fn shuffled_build() -> impl Strategy<Value = ShuffledDag> {
    dag().prop_flat_map(|dag| {
        let nodes: Vec<usize> = (0..dag.parents.len()).collect();
        let edges: Vec<usize> = (0..dag.edges().len()).collect();
        (
            Just(dag),
            Just(nodes.clone()).prop_shuffle(),
            Just(edges.clone()).prop_shuffle(),
            Just(nodes).prop_shuffle(),
            Just(edges).prop_shuffle(),
        )
    })
}

proptest! {
    #[test]
    fn order_respects_every_dependency((dag, nodes, edges, _, _) in shuffled_build()) {
        let mut graph = dag.build(&nodes, &edges);
        let order = graph.compute_order().unwrap().to_vec();

        prop_assert_eq!(order.len(), dag.parents.len());
        let position: HashMap<&str, usize> =
            order.iter().enumerate().map(|(i, n)| (n.as_str(), i)).collect();
        prop_assert_eq!(position.len(), order.len());

        for (src, dst, _) in dag.edges() {
            let (src, dst) = (Dag::name(src), Dag::name(dst));
            prop_assert!(position[src.as_str()] < position[dst.as_str()], "{} after {}", src, dst);
        }
        prop_assert_eq!(graph.state(), GraphState::Ordered);
    }

    #[test]
    fn order_ignores_registration_sequence(
        (dag, nodes_a, edges_a, nodes_b, edges_b) in shuffled_build()
    ) {
        let mut first = dag.build(&nodes_a, &edges_a);
        let mut second = dag.build(&nodes_b, &edges_b);

        let a = first.compute_order().unwrap().to_vec();
        let b = second.compute_order().unwrap().to_vec();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn cycles_are_reported_not_dropped(len in 1usize..8, tail in 0usize..3) {
        let mut graph = Graph::new();
        let ring: Vec<String> = (0..len).map(|i| format!("ring{}", i)).collect();
        for name in &ring {
            graph.register_node(name.as_str(), "invert", &[]).unwrap();
        }
        for i in 0..len {
            graph.bind(&ring[i], "Out", &ring[(i + 1) % len], "In").unwrap();
        }

        // Nodes hanging off the loop can never be scheduled either.
        let mut previous = ring[0].clone();
        for i in 0..tail {
            let name = format!("tail{}", i);
            graph.register_node(name.as_str(), "invert", &[]).unwrap();
            graph.bind(&previous, "Out", &name, "In").unwrap();
            previous = name;
        }
        graph.register_node("free", "matrix3", &[]).unwrap();

        let err = graph.compute_order().unwrap_err();
        match err {
            GraphError::CyclicGraph { nodes } => {
                prop_assert_eq!(nodes.len(), len + tail);
                prop_assert!(!nodes.contains(&"free".to_string()));
                let mut sorted = nodes.clone();
                sorted.sort();
                prop_assert_eq!(nodes, sorted);
            }
            other => prop_assert!(false, "unexpected error: {:?}", other),
        }
        prop_assert!(graph.execution_order().is_none());
    }
}

#[test]
fn diamond_uses_name_tie_break() {
    let mut graph = Graph::new();
    for name in ["sink_side", "left", "right", "top"] {
        graph
            .register_node(name, "math", &[Attribute::named("op", "mix")])
            .unwrap();
    }
    graph.bind("top", "Out", "right", "A").unwrap();
    graph.bind("top", "Out", "left", "A").unwrap();
    graph.bind("left", "Out", "sink_side", "A").unwrap();
    graph.bind("right", "Out", "sink_side", "B").unwrap();

    let order = graph.compute_order().unwrap();
    assert_eq!(order, ["top", "left", "right", "sink_side"]);
}
