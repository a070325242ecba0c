//! Miniature flow propagation over a hand-built data-flow graph
//!
//! Demonstrates the consumer pattern the lattice is built for: a worklist
//! scheduler that pushes type states along edges, unions them into the
//! target flow and revisits downstream flows whenever a value changed.
//!
//! Run with `RUST_LOG=trace cargo run --example propagate` to watch the
//! fast-path misses and representation switches.

use typeflow_core::prelude::*;
use typeflow_core::TypeState;

/// An edge may pass a flow through unchanged or filter it by declared type.
enum Edge {
    Copy { from: usize, to: usize },
    Filter { from: usize, to: usize, declared: TypeState },
}

fn propagate(lattice: &Lattice<'_>, flows: &mut [TypeState], edges: &[Edge]) {
    let mut worklist: Vec<usize> = (0..flows.len()).collect();
    while let Some(flow) = worklist.pop() {
        for edge in edges {
            let (from, to, incoming) = match edge {
                Edge::Copy { from, to } if *from == flow => {
                    (*from, *to, flows[*from].clone())
                }
                Edge::Filter { from, to, declared } if *from == flow => {
                    (*from, *to, lattice.intersect(&flows[*from], declared))
                }
                _ => continue,
            };
            let updated = lattice.union(&flows[to], &incoming);
            if updated != flows[to] {
                tracing::info!(from, to, state = %updated, "flow updated");
                flows[to] = updated;
                worklist.push(to);
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut registry = TypeRegistry::new();
    let string = registry.register("java.lang.String", TypeKind::Class);
    let builder = registry.register("java.lang.StringBuilder", TypeKind::Class);
    let buffer = registry.register("java.lang.StringBuffer", TypeKind::Class);
    let object_array = registry.register("java.lang.Object[]", TypeKind::Array);

    let lattice = Lattice::new(&registry);

    // Flow graph: two allocation sites meet in a phi (flow 2), which feeds
    // both a plain copy (flow 3) and a declared-type filter (flow 4).
    let mut flows = vec![
        lattice.for_type(string, false),
        lattice.union(
            &lattice.for_type(builder, false),
            &TypeState::null_state(),
        ),
        TypeState::empty(),
        TypeState::empty(),
        TypeState::empty(),
    ];
    let edges = vec![
        Edge::Copy { from: 0, to: 2 },
        Edge::Copy { from: 1, to: 2 },
        Edge::Copy { from: 2, to: 3 },
        Edge::Filter {
            from: 2,
            to: 4,
            declared: lattice.union(
                &lattice.for_type(string, false),
                &lattice.for_type(buffer, false),
            ),
        },
    ];

    propagate(&lattice, &mut flows, &edges);

    for (index, flow) in flows.iter().enumerate() {
        let names: Vec<&str> = flow
            .types()
            .filter_map(|id| registry.name(id))
            .collect();
        println!(
            "flow {index}: {flow} types={names:?} canBeNull={}",
            flow.can_be_null()
        );
    }

    // The array type never reached any flow.
    assert!(flows.iter().all(|flow| !flow.contains_type(object_array)));
}
