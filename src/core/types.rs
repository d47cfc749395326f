//! GN-001: Run configuration, requirement maps, plans, reports, run events.
//!
//! The configuration is read once per run and passed by reference to every
//! stage; nothing here is global.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Built value of a producer. Opaque to the engine.
pub type Artifact = serde_json::Value;

/// Declarative demand: capability → options, in declaration order.
pub type RequirementMap = IndexMap<String, Vec<String>>;

/// Cache key of a built artifact: `tool:option`, or the bare tool name for
/// producers without variants.
pub fn resource_key(tool: &str, option: Option<&str>) -> String {
    match option {
        Some(option) => format!("{tool}:{option}"),
        None => tool.to_string(),
    }
}

/// Merge `options` for `capability` into `map`, keeping first-seen order and
/// dropping duplicates.
pub fn merge_demand(map: &mut RequirementMap, capability: &str, options: &[String]) {
    let entry = map.entry(capability.to_string()).or_default();
    for option in options {
        if !entry.contains(option) {
            entry.push(option.clone());
        }
    }
}

// ============================================================================
// Run configuration (gantry.toml)
// ============================================================================

/// Everything a run needs to know, read from one config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub scenario: Scenario,

    /// Named simulation outputs (events, network, plans, ...)
    #[serde(default)]
    pub inputs: IndexMap<String, PathBuf>,

    #[serde(default)]
    pub outputs: Outputs,

    #[serde(default)]
    pub event_handlers: RequirementMap,

    #[serde(default)]
    pub plan_handlers: RequirementMap,

    #[serde(default)]
    pub post_processors: RequirementMap,

    #[serde(default)]
    pub benchmarks: RequirementMap,

    /// Directory relative input paths are resolved against
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

/// Scenario metadata shared by every producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,

    /// Number of time slices per simulated day
    #[serde(default = "default_time_periods")]
    pub time_periods: u32,

    /// Fraction of the population that was simulated
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,

    #[serde(default = "default_crs")]
    pub crs: String,
}

fn default_time_periods() -> u32 {
    24
}

fn default_scale_factor() -> f64 {
    1.0
}

fn default_crs() -> String {
    "EPSG:27700".to_string()
}

/// Output location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl PipelineConfig {
    /// The root requirement map: every handler section merged in pipeline
    /// order (event handlers, plan handlers, post processors, benchmarks).
    pub fn requirements(&self) -> RequirementMap {
        let mut merged = RequirementMap::new();
        for section in [
            &self.event_handlers,
            &self.plan_handlers,
            &self.post_processors,
            &self.benchmarks,
        ] {
            for (capability, options) in section {
                merge_demand(&mut merged, capability, options);
            }
        }
        merged
    }

    /// Resolve a named input against the config directory.
    pub fn input_path(&self, name: &str) -> Option<PathBuf> {
        let path = self.inputs.get(name)?;
        Some(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        })
    }

    /// Output directory, resolved like inputs.
    pub fn output_path(&self) -> Option<PathBuf> {
        let path = self.outputs.path.as_ref()?;
        Some(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        })
    }

    pub(crate) fn with_base_dir(mut self, dir: &Path) -> Self {
        self.base_dir = Some(dir.to_path_buf());
        self
    }
}

// ============================================================================
// Station lifecycle
// ============================================================================

/// Lifecycle of a station within one run. Strictly sequential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationState {
    #[default]
    Connected,
    Validated,
    Resolved,
    Built,
}

impl fmt::Display for StationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected => write!(f, "CONNECTED"),
            Self::Validated => write!(f, "VALIDATED"),
            Self::Resolved => write!(f, "RESOLVED"),
            Self::Built => write!(f, "BUILT"),
        }
    }
}

// ============================================================================
// Plan
// ============================================================================

/// One station's slot in the build schedule.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedStation {
    pub station: String,
    pub depth: usize,
    /// Resource keys this station will build, in build order
    pub tools: Vec<String>,
}

/// Depth-ordered schedule, deepest station first.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulePlan {
    pub name: String,
    pub stations: Vec<PlannedStation>,
    /// Resolution problems found while planning
    pub errors: Vec<String>,
}

impl SchedulePlan {
    /// Total number of producers the schedule would build.
    pub fn tool_count(&self) -> usize {
        self.stations.iter().map(|s| s.tools.len()).sum()
    }
}

// ============================================================================
// Build report
// ============================================================================

/// A cached artifact as it appears in the report.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltResource {
    pub key: String,
    pub digest: String,
    pub duration_seconds: f64,
}

/// Per-station contents after a build.
#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    pub station: String,
    pub depth: usize,
    pub resources: Vec<BuiltResource>,
}

/// Outcome of a complete, successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub name: String,
    pub run_id: String,
    pub stations: Vec<StationReport>,
    pub built: u32,
    pub total_seconds: f64,
}

// ============================================================================
// Run events
// ============================================================================

/// Event for the JSONL run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        scenario: String,
        gantry_version: String,
    },
    ToolBuilt {
        station: String,
        key: String,
        digest: String,
        duration_seconds: f64,
    },
    ToolFailed {
        station: String,
        key: String,
        error: String,
    },
    RunCompleted {
        run_id: String,
        built: u32,
        failed: u32,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}
