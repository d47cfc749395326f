//! GN-006: Demand-driven requirement resolution.
//!
//! The root's requirement map is pushed down supplier edges. Each station
//! picks the `(tool, option)` pairs it registers out of the demand it
//! received, then pushes its tools' own requirements to its suppliers.
//! Stations are visited root first in depth order, so all demand for a
//! station has arrived before it selects. Tools nobody asked for are never
//! selected.

use super::error::{GraphError, ResolveError};
use super::graph::{Graph, StationId};
use super::planner;
use super::registry::{lookup, ToolRequest, Variants};
use super::types::{merge_demand, RequirementMap, StationState};
use tracing::{debug, warn};

/// Resolve demand for every station reachable from `root`.
///
/// Every reachable station must be `Validated` and carry a depth; otherwise
/// the graph is left untouched and the offending station is reported.
/// Demand problems are returned rather than raised; the affected capability
/// is simply not selected.
pub fn resolve(graph: &mut Graph, root: StationId) -> Result<Vec<ResolveError>, GraphError> {
    if let Some(&id) = graph
        .reachable(root)
        .iter()
        .find(|&&id| graph.station(id).state() != StationState::Validated)
    {
        let station = graph.station(id);
        return Err(GraphError::Unvalidated {
            station: station.name().to_string(),
            state: station.state().to_string(),
        });
    }
    let order = planner::demand_order(graph, root)?;
    let mut errors = Vec::new();

    for &id in &order {
        let station = graph.station_mut(id);
        station.plan.clear();
        station.resources.clear();
        if id != root {
            station.demand.clear();
        }
    }

    for &id in &order {
        if id != root {
            select_tools(graph, id, &mut errors);
        }
        let outgoing = outgoing_demand(graph, id);
        check_supplied(graph, id, &outgoing, &mut errors);

        let suppliers = graph.station(id).suppliers().to_vec();
        for supplier in suppliers {
            let demand = &mut graph.station_mut(supplier).demand;
            for (capability, options) in &outgoing {
                merge_demand(demand, capability, options);
            }
        }
    }

    graph.advance(root, StationState::Resolved);
    Ok(errors)
}

/// Pick the registered tools out of the demand a station received.
fn select_tools(graph: &mut Graph, id: StationId, errors: &mut Vec<ResolveError>) {
    let station = graph.station_mut(id);
    let mut plan: Vec<ToolRequest> = Vec::new();

    for (capability, options) in &station.demand {
        let Some(spec) = lookup(station.registry(), capability) else {
            continue;
        };
        match spec.variants {
            Variants::None => {
                if !plan.iter().any(|r| r.spec.name == spec.name) {
                    plan.push(ToolRequest { spec, option: None });
                }
            }
            Variants::Options(_) if options.is_empty() => {
                errors.push(ResolveError::MissingOption {
                    station: station.name().to_string(),
                    capability: capability.clone(),
                    valid: spec.valid_options(),
                });
            }
            Variants::Options(_) => {
                for option in options {
                    if !spec.accepts(option) {
                        errors.push(ResolveError::InvalidOption {
                            station: station.name().to_string(),
                            capability: capability.clone(),
                            option: option.clone(),
                            valid: spec.valid_options(),
                        });
                        continue;
                    }
                    let duplicate = plan
                        .iter()
                        .any(|r| r.spec.name == spec.name && r.option() == Some(option));
                    if !duplicate {
                        plan.push(ToolRequest {
                            spec,
                            option: Some(option.clone()),
                        });
                    }
                }
            }
        }
    }

    debug!(
        station = station.name(),
        tools = ?plan.iter().map(ToolRequest::key).collect::<Vec<_>>(),
        "resolved"
    );
    station.plan = plan;
}

/// What a station asks of its suppliers. The root forwards its requirement
/// map; any other station forwards the requirements of its selected tools,
/// handing each variant tool's option down with it.
fn outgoing_demand(graph: &Graph, id: StationId) -> RequirementMap {
    let station = graph.station(id);
    if let Some(requirements) = station.requirements() {
        return requirements.clone();
    }

    let mut outgoing = RequirementMap::new();
    for request in station.plan() {
        let options: Vec<String> = request.option.iter().cloned().collect();
        for requirement in request.spec.requirements {
            merge_demand(&mut outgoing, requirement, &options);
        }
    }
    outgoing
}

/// Every outgoing capability must be registered by at least one supplier.
fn check_supplied(
    graph: &Graph,
    id: StationId,
    outgoing: &RequirementMap,
    errors: &mut Vec<ResolveError>,
) {
    let station = graph.station(id);
    for capability in outgoing.keys() {
        let supplied = station
            .suppliers()
            .iter()
            .any(|&s| graph.station(s).provides(capability));
        if !supplied {
            warn!(station = station.name(), capability, "unresolved requirement");
            errors.push(ResolveError::UnresolvedRequirement {
                station: station.name().to_string(),
                capability: capability.clone(),
            });
        }
    }
}
