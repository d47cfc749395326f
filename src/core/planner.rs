//! GN-004: Depth assignment and build scheduling.
//!
//! A station's depth is its longest supplier-path distance from the root.
//! Building from the greatest depth to the least guarantees every supplier
//! is finished before any of its managers reads from it.

use super::error::GraphError;
use super::graph::{Graph, StationId};
use super::types::{PlannedStation, SchedulePlan};
use super::validate;

/// Assign longest-path depths to every station reachable from `root`.
///
/// The recursion does not memoise: a station reached again through a longer
/// path is raised and its own suppliers re-walked.
pub fn build_graph_depth(graph: &mut Graph, root: StationId) -> Result<(), GraphError> {
    if let Some(id) = validate::find_cycle(graph, root) {
        return Err(GraphError::Cyclic {
            station: graph.station(id).name().to_string(),
        });
    }
    graph.station_mut(root).depth = Some(0);
    deepen(graph, root);
    Ok(())
}

fn deepen(graph: &mut Graph, current: StationId) {
    let next = graph.station(current).depth.unwrap_or(0) + 1;
    let suppliers = graph.station(current).suppliers().to_vec();
    for supplier in suppliers {
        let station = graph.station_mut(supplier);
        station.depth = Some(station.depth.map_or(next, |d| d.max(next)));
        deepen(graph, supplier);
    }
}

/// Reachable stations in discovery order, refusing any without a depth.
fn ranked(graph: &Graph, root: StationId) -> Result<Vec<StationId>, GraphError> {
    let order = graph.reachable(root);
    if let Some(&id) = order.iter().find(|&&id| graph.station(id).depth().is_none()) {
        return Err(GraphError::Unranked {
            station: graph.station(id).name().to_string(),
        });
    }
    Ok(order)
}

fn depth_of(graph: &Graph, id: StationId) -> usize {
    graph.station(id).depth().unwrap_or_default()
}

/// Build order: reachable stations sorted by depth, deepest first. Ties keep
/// discovery order from the root.
pub fn schedule(graph: &Graph, root: StationId) -> Result<Vec<StationId>, GraphError> {
    let mut order = ranked(graph, root)?;
    order.sort_by_key(|&id| std::cmp::Reverse(depth_of(graph, id)));
    Ok(order)
}

/// Resolution order: the reverse tiering, root first. A station appears
/// after every manager that can push demand to it.
pub fn demand_order(graph: &Graph, root: StationId) -> Result<Vec<StationId>, GraphError> {
    let mut order = ranked(graph, root)?;
    order.sort_by_key(|&id| depth_of(graph, id));
    Ok(order)
}

/// Describe what a build would do, from an already resolved graph.
pub fn plan(
    graph: &Graph,
    root: StationId,
    name: &str,
    errors: Vec<String>,
) -> Result<SchedulePlan, GraphError> {
    let stations = schedule(graph, root)?
        .into_iter()
        .map(|id| {
            let station = graph.station(id);
            PlannedStation {
                station: station.name().to_string(),
                depth: depth_of(graph, id),
                tools: station.planned_keys(),
            }
        })
        .collect();

    Ok(SchedulePlan {
        name: name.to_string(),
        stations,
        errors,
    })
}
