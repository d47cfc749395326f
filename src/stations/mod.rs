//! GN-011: Station catalogue, the analytics tiers and the producers each registers.
//!
//! Producers here do no domain math. They locate and fingerprint simulation
//! outputs, thread lineage from upstream artifacts into their own, and write
//! a JSON artifact to the write path when one is given.

pub mod benchmarks;
pub mod event_handlers;
pub mod inputs;
pub mod paths;
pub mod plan_handlers;
pub mod post_processors;

use crate::core::error::{GraphError, ProducerError};
use crate::core::graph::{Graph, StationId};
use crate::core::parser;
use crate::core::registry::{BuildContext, Resources, ToolSpec};
use crate::core::types::{resource_key, Artifact, RequirementMap};
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::PathBuf;

/// The tiers of the standard pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationKind {
    Requirements,
    PostProcessors,
    Benchmarks,
    EventHandlers,
    PlanHandlers,
    Inputs,
    Paths,
}

impl StationKind {
    pub const ALL: [StationKind; 7] = [
        Self::Requirements,
        Self::PostProcessors,
        Self::Benchmarks,
        Self::EventHandlers,
        Self::PlanHandlers,
        Self::Inputs,
        Self::Paths,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Requirements => "requirements",
            Self::PostProcessors => "post_processors",
            Self::Benchmarks => "benchmarks",
            Self::EventHandlers => "event_handlers",
            Self::PlanHandlers => "plan_handlers",
            Self::Inputs => "inputs",
            Self::Paths => "paths",
        }
    }

    pub fn registry(self) -> &'static [ToolSpec] {
        match self {
            Self::Requirements => &[],
            Self::PostProcessors => post_processors::TOOLS,
            Self::Benchmarks => benchmarks::TOOLS,
            Self::EventHandlers => event_handlers::TOOLS,
            Self::PlanHandlers => plan_handlers::TOOLS,
            Self::Inputs => inputs::TOOLS,
            Self::Paths => paths::TOOLS,
        }
    }
}

impl fmt::Display for StationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A wired graph and its orchestration root.
#[derive(Debug)]
pub struct Pipeline {
    pub graph: Graph,
    pub root: StationId,
}

impl Pipeline {
    pub fn station(&self, kind: StationKind) -> Option<StationId> {
        self.graph.find(kind.name())
    }
}

/// Wire the standard tiers under a root holding `requirements`:
///
/// ```text
/// requirements → [post_processors, benchmarks, event_handlers, plan_handlers]
/// post_processors → [event_handlers, plan_handlers, inputs]
/// benchmarks → [event_handlers, plan_handlers]
/// event_handlers, plan_handlers → [inputs]
/// inputs → [paths]
/// ```
pub fn standard_pipeline(requirements: RequirementMap) -> Result<Pipeline, GraphError> {
    let mut graph = Graph::new();
    let root = graph.add_root(StationKind::Requirements.name(), requirements);
    let add = |graph: &mut Graph, kind: StationKind| graph.add_station(kind.name(), kind.registry());
    let post = add(&mut graph, StationKind::PostProcessors);
    let bench = add(&mut graph, StationKind::Benchmarks);
    let events = add(&mut graph, StationKind::EventHandlers);
    let plans = add(&mut graph, StationKind::PlanHandlers);
    let inputs = add(&mut graph, StationKind::Inputs);
    let paths = add(&mut graph, StationKind::Paths);

    graph.connect(root, &[], &[post, bench, events, plans])?;
    graph.connect(post, &[root], &[events, plans, inputs])?;
    graph.connect(bench, &[root], &[events, plans])?;
    graph.connect(events, &[post, bench, root], &[inputs])?;
    graph.connect(plans, &[root, bench, post], &[inputs])?;
    graph.connect(inputs, &[events, plans, post], &[paths])?;
    graph.connect(paths, &[inputs], &[])?;

    Ok(Pipeline { graph, root })
}

/// Collect the upstream artifacts named by `requirements`, keyed by the
/// resource key they were found under.
pub(crate) fn lineage(
    resources: &Resources<'_>,
    requirements: &[&str],
    option: Option<&str>,
) -> Result<Map<String, Value>, ProducerError> {
    let mut upstream = Map::new();
    for name in requirements {
        let (key, artifact) = resources
            .find(name, option)
            .ok_or_else(|| ProducerError::MissingResource(resource_key(name, option)))?;
        upstream.insert(key.to_string(), digest_of(artifact));
    }
    Ok(upstream)
}

/// An upstream artifact's own digest when it carries one, else the whole
/// artifact.
fn digest_of(artifact: &Artifact) -> Value {
    artifact
        .get("digest")
        .cloned()
        .unwrap_or_else(|| artifact.clone())
}

/// Write `artifact` as `<scenario>_<tool>[_<option>].json` under the write
/// path. Without a write path this is a no-op returning `None`. A scenario
/// name that is not a plain file-name stem is refused.
pub(crate) fn persist(
    ctx: &BuildContext<'_>,
    tool: &str,
    option: Option<&str>,
    artifact: &Artifact,
) -> Result<Option<PathBuf>, ProducerError> {
    let Some(dir) = ctx.write_path else {
        return Ok(None);
    };
    let scenario = &ctx.config.scenario.name;
    if !parser::is_file_stem(scenario) {
        return Err(ProducerError::Invalid(format!(
            "scenario name '{scenario}' cannot be used in an artifact file name"
        )));
    }
    let file_name = match option {
        Some(option) => format!("{scenario}_{tool}_{option}.json"),
        None => format!("{scenario}_{tool}.json"),
    };
    let path = dir.join(file_name);
    let io = |source| ProducerError::Io {
        path: path.clone(),
        source,
    };
    std::fs::create_dir_all(dir).map_err(io)?;
    let body = serde_json::to_string_pretty(artifact)
        .map_err(|e| ProducerError::Invalid(format!("cannot serialize {tool}: {e}")))?;
    std::fs::write(&path, body).map_err(io)?;
    Ok(Some(path))
}

/// Standard descriptor shared by the handler tiers.
pub(crate) fn descriptor(
    station: StationKind,
    tool: &str,
    option: Option<&str>,
    upstream: Map<String, Value>,
) -> Artifact {
    json!({
        "station": station.name(),
        "tool": tool,
        "option": option,
        "upstream": upstream,
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Scenario files on disk for producer and pipeline tests.

    use crate::core::types::PipelineConfig;
    use std::path::Path;

    pub const INPUTS: [&str; 6] = [
        "events",
        "network",
        "plans",
        "transit_schedule",
        "transit_vehicles",
        "attributes",
    ];

    /// Write one placeholder file per input into `dir` and return a config
    /// pointing at them, with `extra` appended (handler sections).
    pub fn scenario(dir: &Path, extra: &str) -> PipelineConfig {
        let mut toml_text = String::from(
            "[scenario]\nname = \"test_town\"\ntime_periods = 24\nscale_factor = 0.01\n\n[inputs]\n",
        );
        for input in INPUTS {
            let file = format!("output_{input}.xml");
            std::fs::write(dir.join(&file), format!("<{input}/>")).unwrap();
            toml_text.push_str(&format!("{input} = \"{file}\"\n"));
        }
        toml_text.push('\n');
        toml_text.push_str(extra);
        let config: PipelineConfig = toml::from_str(&toml_text).unwrap();
        config.with_base_dir(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{executor, planner, validate};
    use crate::core::types::StationState;

    fn requirements(pairs: &[(&str, &[&str])]) -> RequirementMap {
        pairs
            .iter()
            .map(|(cap, opts)| (cap.to_string(), opts.iter().map(|o| o.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_gn011_standard_pipeline_is_valid() {
        let p = standard_pipeline(RequirementMap::new()).unwrap();
        assert_eq!(p.graph.len(), 7);
        assert!(!validate::is_cyclic(&p.graph, p.root));
        assert!(!validate::is_broken(&p.graph, p.root));
    }

    #[test]
    fn test_gn011_standard_pipeline_depths() {
        let mut p = standard_pipeline(RequirementMap::new()).unwrap();
        planner::build_graph_depth(&mut p.graph, p.root).unwrap();
        let depth = |kind| {
            let id = p.station(kind).unwrap();
            p.graph.station(id).depth().unwrap()
        };
        assert_eq!(depth(StationKind::Requirements), 0);
        assert_eq!(depth(StationKind::PostProcessors), 1);
        assert_eq!(depth(StationKind::Benchmarks), 1);
        assert_eq!(depth(StationKind::EventHandlers), 2);
        assert_eq!(depth(StationKind::PlanHandlers), 2);
        assert_eq!(depth(StationKind::Inputs), 3);
        assert_eq!(depth(StationKind::Paths), 4);
    }

    #[test]
    fn test_gn011_vkt_car_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        let mut p = standard_pipeline(requirements(&[("vkt", &["car"])])).unwrap();
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        executor::build(&mut p.graph, p.root, &ctx).unwrap();

        let keys = |kind| -> Vec<String> {
            let id = p.station(kind).unwrap();
            p.graph.station(id).resources().keys().cloned().collect()
        };
        assert!(p.graph.station(p.root).resources().is_empty());
        assert_eq!(keys(StationKind::PostProcessors), vec!["vkt:car"]);
        assert_eq!(keys(StationKind::EventHandlers), vec!["volume_counts:car"]);
        assert!(keys(StationKind::PlanHandlers).is_empty());
        assert!(keys(StationKind::Benchmarks).is_empty());
        assert_eq!(keys(StationKind::Inputs), vec!["events", "network"]);
        assert_eq!(keys(StationKind::Paths), vec!["events_path", "network_path"]);
        assert_eq!(p.graph.station(p.root).state(), StationState::Built);
    }

    #[test]
    fn test_gn011_full_scenario_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        let out = dir.path().join("out");
        let mut p = standard_pipeline(requirements(&[
            ("volume_counts", &["car"]),
            ("passenger_counts", &["bus", "train"]),
            ("stop_interactions", &["bus", "train"]),
            ("mode_share", &["all"]),
            ("vkt", &["car"]),
            ("trip_logs", &["all"]),
            ("mode_share_comparison", &["all"]),
            ("link_counts_comparison", &["car"]),
        ]))
        .unwrap();
        let ctx = BuildContext {
            config: &config,
            write_path: Some(&out),
        };
        let report = executor::build(&mut p.graph, p.root, &ctx).unwrap();

        assert!(out.join("test_town_vkt_car.json").exists());
        assert!(out.join("test_town_mode_share_all.json").exists());
        assert!(out.join("test_town_mode_share_comparison_all.json").exists());
        assert!(out.join("gantry.events.jsonl").exists());
        let bench = p.station(StationKind::Benchmarks).unwrap();
        assert_eq!(
            p.graph.station(bench).resources().keys().collect::<Vec<_>>(),
            vec!["mode_share_comparison:all", "link_counts_comparison:car"]
        );
        assert_eq!(report.stations[0].station, "paths");
        assert_eq!(report.stations[0].resources.len(), 6);
    }

    #[test]
    fn test_gn011_missing_input_file_surfaces_every_dependent() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        std::fs::remove_file(dir.path().join("output_network.xml")).unwrap();
        let mut p = standard_pipeline(requirements(&[("vkt", &["car", "bus"])])).unwrap();
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        let err = executor::build(&mut p.graph, p.root, &ctx).unwrap_err();
        let lines = err.lines();
        // network_path → network → volume_counts:{car,bus} → vkt:{car,bus}
        assert_eq!(lines.len(), 6, "{lines:#?}");
        assert!(lines[0].starts_with("paths/network_path"));
        assert!(lines.iter().any(|l| l.starts_with("post_processors/vkt:bus")));
        let inputs = p.station(StationKind::Inputs).unwrap();
        assert!(p.graph.station(inputs).resources().contains_key("events"));
    }

    #[test]
    fn test_gn011_unknown_capability_fails_run() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        let mut p = standard_pipeline(requirements(&[("congestion", &["car"])])).unwrap();
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        let err = executor::build(&mut p.graph, p.root, &ctx).unwrap_err();
        assert!(err.lines()[0].contains("'congestion'"));
    }

    #[test]
    fn test_gn011_kind_names_unique() {
        let mut names: Vec<_> = StationKind::ALL.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), StationKind::ALL.len());
        assert!(StationKind::Requirements.registry().is_empty());
    }

    #[test]
    fn test_gn011_trip_logs_reads_mode_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        let mut p = standard_pipeline(requirements(&[("trip_logs", &["all"])])).unwrap();
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        executor::build(&mut p.graph, p.root, &ctx).unwrap();

        let post = p.station(StationKind::PostProcessors).unwrap();
        let inputs = p.station(StationKind::Inputs).unwrap();
        let trip_logs = &p.graph.station(post).resources()["trip_logs:all"];
        let upstream = trip_logs["upstream"].as_object().unwrap();
        assert_eq!(
            upstream.keys().collect::<Vec<_>>(),
            vec!["agent_logs:all", "mode_hierarchy"]
        );
        assert!(p
            .graph
            .station(inputs)
            .resources()
            .contains_key("mode_hierarchy"));
    }

    #[test]
    fn test_gn011_persist_refuses_escaping_scenario_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixtures::scenario(dir.path(), "");
        config.scenario.name = "../x".to_string();
        let out = dir.path().join("out");
        let ctx = BuildContext {
            config: &config,
            write_path: Some(&out),
        };
        let err = persist(&ctx, "vkt", Some("car"), &json!({})).unwrap_err();
        assert!(matches!(err, ProducerError::Invalid(_)));
        assert!(!dir.path().join("x_vkt_car.json").exists());
        assert!(!out.exists());
    }
}
