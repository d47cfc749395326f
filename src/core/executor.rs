//! GN-010: Executor, the build loop.
//!
//! validate → depth → resolve → for each station, deepest first: for each
//! resolved tool: gather supplier resources → construct → build → cache.
//!
//! A failing tool does not stop its siblings or later stations. Every
//! resolution and build failure of the pass is collected and returned at the
//! end as a single [`BuildError::Failed`]. A requirement resolution already
//! reported as unresolved is not reported again when the tool needing it
//! cannot build.

use super::error::{BuildError, BuildFailure, Failure, ProducerError, ResolveError};
use super::graph::{Graph, StationId};
use super::planner;
use super::registry::{BuildContext, Resources, ToolRequest};
use super::resolver;
use super::types::{
    resource_key, Artifact, BuildReport, BuiltResource, RunEvent, StationReport, StationState,
};
use super::validate;
use crate::provenance::{eventlog, hasher};
use rustc_hash::FxHashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Requirements resolution already reported as unresolved, and the tools
/// left unbuilt because of them.
struct Withheld {
    unresolved: FxHashSet<(String, String)>,
    keys: FxHashSet<String>,
}

impl Withheld {
    fn covers(&self, station: &str, name: &str, key: &str) -> bool {
        self.unresolved.contains(&(station.to_string(), name.to_string()))
            || self.keys.contains(key)
            || self.keys.contains(name)
    }
}

/// What one station produced in one pass.
struct StationOutcome {
    built: Vec<(String, Artifact, BuiltResource)>,
    failures: Vec<BuildFailure>,
}

/// Build everything the root's requirement map demands.
///
/// Structural problems abort before any producer runs. Otherwise all
/// stations are built and the graph keeps every artifact that succeeded,
/// even when the call returns an error.
pub fn build(
    graph: &mut Graph,
    root: StationId,
    ctx: &BuildContext<'_>,
) -> Result<BuildReport, BuildError> {
    let start = Instant::now();

    validate::validate(graph, root)?;
    planner::build_graph_depth(graph, root)?;
    let resolve_errors = resolver::resolve(graph, root)?;
    let mut withheld = Withheld {
        unresolved: resolve_errors
            .iter()
            .filter_map(|e| match e {
                ResolveError::UnresolvedRequirement {
                    station,
                    capability,
                } => Some((station.clone(), capability.clone())),
                _ => None,
            })
            .collect(),
        keys: FxHashSet::default(),
    };
    let mut failures: Vec<Failure> = resolve_errors.into_iter().map(Failure::from).collect();

    let run_id = eventlog::generate_run_id();
    log_event(
        ctx,
        RunEvent::RunStarted {
            run_id: run_id.clone(),
            scenario: ctx.config.scenario.name.clone(),
            gantry_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );

    let mut stations = Vec::new();
    let mut built = 0u32;

    for id in planner::schedule(graph, root)? {
        let outcome = build_station(graph, id, ctx, &mut withheld);
        let station_name = graph.station(id).name().to_string();
        let depth = graph.station(id).depth().unwrap_or(0);

        for failure in &outcome.failures {
            warn!(
                station = %failure.station,
                tool = %failure.tool,
                option = failure.option.as_deref().unwrap_or("-"),
                error = %failure.source,
                "build failed"
            );
            log_event(
                ctx,
                RunEvent::ToolFailed {
                    station: failure.station.clone(),
                    key: resource_key(&failure.tool, failure.option.as_deref()),
                    error: failure.source.to_string(),
                },
            );
        }
        failures.extend(outcome.failures.into_iter().map(Failure::from));

        let mut resources = Vec::new();
        let station = graph.station_mut(id);
        for (key, artifact, entry) in outcome.built {
            log_event(
                ctx,
                RunEvent::ToolBuilt {
                    station: station_name.clone(),
                    key: entry.key.clone(),
                    digest: entry.digest.clone(),
                    duration_seconds: entry.duration_seconds,
                },
            );
            station.resources.insert(key, artifact);
            resources.push(entry);
        }
        station.state = StationState::Built;
        built += resources.len() as u32;

        if !resources.is_empty() {
            stations.push(StationReport {
                station: station_name,
                depth,
                resources,
            });
        }
    }

    let total_seconds = start.elapsed().as_secs_f64();
    let failed = failures.len() as u32;
    log_event(
        ctx,
        RunEvent::RunCompleted {
            run_id: run_id.clone(),
            built,
            failed,
            total_seconds,
        },
    );
    info!(built, failed, total_seconds, "build finished");

    if !failures.is_empty() {
        return Err(BuildError::Failed(failures));
    }

    Ok(BuildReport {
        name: ctx.config.scenario.name.clone(),
        run_id,
        stations,
        built,
        total_seconds,
    })
}

/// Run every resolved tool of one station against its suppliers' caches.
/// Reads the graph only; the caller commits the results.
fn build_station(
    graph: &Graph,
    id: StationId,
    ctx: &BuildContext<'_>,
    withheld: &mut Withheld,
) -> StationOutcome {
    let station = graph.station(id);
    let supplied = gather(graph, id);
    let mut outcome = StationOutcome {
        built: Vec::new(),
        failures: Vec::new(),
    };

    if !station.plan().is_empty() {
        info!(
            station = station.name(),
            depth = station.depth().unwrap_or(0),
            tools = station.plan().len(),
            supplied = supplied.len(),
            "building station"
        );
    }

    for request in station.plan() {
        let fail = |source: ProducerError| BuildFailure {
            station: station.name().to_string(),
            tool: request.spec.name.to_string(),
            option: request.option.clone(),
            source,
        };

        let missing = missing_requirements(request, &supplied);
        if !missing.is_empty() {
            let before = outcome.failures.len();
            for (name, key) in missing {
                if withheld.covers(station.name(), name, &key) {
                    debug!(station = station.name(), key = %key, "requirement already reported");
                    continue;
                }
                outcome.failures.push(fail(ProducerError::MissingResource(key)));
            }
            if outcome.failures.len() == before {
                withheld.keys.insert(request.key());
            }
            continue;
        }

        let key = request.key();
        let tool_start = Instant::now();
        let mut producer = request.construct();
        match producer.build(&supplied, ctx) {
            Ok(artifact) => {
                let entry = BuiltResource {
                    key: key.clone(),
                    digest: hasher::hash_artifact(&artifact),
                    duration_seconds: tool_start.elapsed().as_secs_f64(),
                };
                debug!(station = station.name(), key = %key, digest = %entry.digest, "built");
                outcome.built.push((key, artifact, entry));
            }
            Err(e) => outcome.failures.push(fail(e)),
        }
    }

    outcome
}

/// Union of the caches of every supplier of `id`, in supplier order.
fn gather(graph: &Graph, id: StationId) -> Resources<'_> {
    let mut resources = Resources::new();
    for &supplier in graph.station(id).suppliers() {
        for (key, artifact) in graph.station(supplier).resources() {
            resources.insert(key.as_str(), artifact);
        }
    }
    resources
}

/// Requirements of `request` that no supplier has built, with the key each
/// was looked up under.
fn missing_requirements(
    request: &ToolRequest,
    supplied: &Resources<'_>,
) -> Vec<(&'static str, String)> {
    request
        .spec
        .requirements
        .iter()
        .filter(|name| supplied.find(name, request.option()).is_none())
        .map(|&name| (name, resource_key(name, request.option())))
        .collect()
}

fn log_event(ctx: &BuildContext<'_>, event: RunEvent) {
    if let Some(write_path) = ctx.write_path {
        if let Err(e) = eventlog::append_event(write_path, event) {
            warn!(path = %write_path.display(), error = %e, "cannot append run event");
        }
    }
}
