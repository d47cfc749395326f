//! GN-003: Structural validation: cycle detection and orphan detection.
//!
//! Both checks walk supplier edges only. Validation runs before anything is
//! resolved or built and its errors are fatal.

use super::error::GraphError;
use super::graph::{Graph, StationId};
use super::types::StationState;
use rustc_hash::FxHashSet;

/// First station that closes a supplier cycle reachable from `root`.
///
/// Depth-first, tracking the current recursion stack. A supplier already on
/// the stack is a back-edge; finished stations are never revisited, so a
/// diamond is walked once per branch point, not once per path.
pub fn find_cycle(graph: &Graph, root: StationId) -> Option<StationId> {
    let mut on_stack = FxHashSet::default();
    let mut done = FxHashSet::default();
    visit(graph, root, &mut on_stack, &mut done)
}

fn visit(
    graph: &Graph,
    node: StationId,
    on_stack: &mut FxHashSet<StationId>,
    done: &mut FxHashSet<StationId>,
) -> Option<StationId> {
    on_stack.insert(node);
    for &supplier in graph.station(node).suppliers() {
        if on_stack.contains(&supplier) {
            return Some(supplier);
        }
        if done.contains(&supplier) {
            continue;
        }
        if let Some(hit) = visit(graph, supplier, on_stack, done) {
            return Some(hit);
        }
    }
    on_stack.remove(&node);
    done.insert(node);
    None
}

/// True iff the supplier subgraph reachable from `root` has a directed cycle.
pub fn is_cyclic(graph: &Graph, root: StationId) -> bool {
    find_cycle(graph, root).is_some()
}

/// First station reachable from `root` that is supplied-to but lists no
/// managers. The root itself is exempt.
pub fn find_orphan(graph: &Graph, root: StationId) -> Option<StationId> {
    graph
        .reachable(root)
        .into_iter()
        .filter(|&id| id != root)
        .find(|&id| graph.station(id).managers().is_empty())
}

/// True iff some station below `root` has an empty managers list.
pub fn is_broken(graph: &Graph, root: StationId) -> bool {
    find_orphan(graph, root).is_some()
}

/// Certify the graph below `root` and seal it against rewiring.
pub fn validate(graph: &mut Graph, root: StationId) -> Result<(), GraphError> {
    if let Some(id) = find_cycle(graph, root) {
        return Err(GraphError::Cyclic {
            station: graph.station(id).name().to_string(),
        });
    }
    if let Some(id) = find_orphan(graph, root) {
        return Err(GraphError::Broken {
            station: graph.station(id).name().to_string(),
        });
    }
    graph.advance(root, StationState::Validated);
    tracing::debug!(
        root = graph.station(root).name(),
        stations = graph.reachable(root).len(),
        "graph validated"
    );
    Ok(())
}
