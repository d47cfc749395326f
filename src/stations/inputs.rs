//! GN-013: Inputs tier: fingerprint each located simulation output.
//!
//! Downstream handlers key their lineage on the digests recorded here, so an
//! input file that changes between runs changes every artifact derived from
//! it.

use crate::core::error::ProducerError;
use crate::core::registry::{BuildContext, Producer, Resources, ToolSpec, Variants};
use crate::core::types::Artifact;
use crate::provenance::hasher;
use serde_json::json;
use std::path::PathBuf;

/// Reads a path artifact and records the file's size and BLAKE3 digest.
#[derive(Debug)]
pub struct InputFile {
    input: &'static str,
    path_tool: &'static str,
}

impl Producer for InputFile {
    fn build(
        &mut self,
        resources: &Resources<'_>,
        _ctx: &BuildContext<'_>,
    ) -> Result<Artifact, ProducerError> {
        let located = resources.require(self.path_tool, None)?;
        let path = located["path"]
            .as_str()
            .map(PathBuf::from)
            .ok_or_else(|| ProducerError::Invalid(format!("{} has no path", self.path_tool)))?;
        let io = |source| ProducerError::Io {
            path: path.clone(),
            source,
        };
        let bytes = std::fs::metadata(&path).map_err(io)?.len();
        let digest = hasher::hash_file(&path).map_err(io)?;
        tracing::debug!(input = self.input, bytes, %digest, "input fingerprinted");
        Ok(json!({
            "input": self.input,
            "path": path.display().to_string(),
            "bytes": bytes,
            "digest": digest,
        }))
    }
}

/// Modes in priority order, used to pick a trip's main mode from its legs.
pub const MODE_HIERARCHY: [&str; 10] = [
    "ferry",
    "rail",
    "train",
    "subway",
    "tram",
    "bus",
    "car",
    "bike",
    "walk",
    "transit_walk",
];

#[derive(Debug)]
pub struct ModeHierarchy;

impl Producer for ModeHierarchy {
    fn build(
        &mut self,
        _resources: &Resources<'_>,
        _ctx: &BuildContext<'_>,
    ) -> Result<Artifact, ProducerError> {
        Ok(json!({
            "input": "mode_hierarchy",
            "hierarchy": MODE_HIERARCHY,
            "digest": hasher::hash_string(&MODE_HIERARCHY.join(",")),
        }))
    }
}

macro_rules! input_file {
    ($ctor:ident, $input:literal, $path_tool:literal) => {
        fn $ctor(_option: Option<&str>) -> Box<dyn Producer> {
            Box::new(InputFile {
                input: $input,
                path_tool: $path_tool,
            })
        }
    };
}

input_file!(events, "events", "events_path");
input_file!(network, "network", "network_path");
input_file!(plans, "plans", "plans_path");
input_file!(transit_schedule, "transit_schedule", "transit_schedule_path");
input_file!(transit_vehicles, "transit_vehicles", "transit_vehicles_path");
input_file!(attributes, "attributes", "attributes_path");

fn mode_hierarchy(_option: Option<&str>) -> Box<dyn Producer> {
    Box::new(ModeHierarchy)
}

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "events",
        variants: Variants::None,
        requirements: &["events_path"],
        construct: events,
    },
    ToolSpec {
        name: "network",
        variants: Variants::None,
        requirements: &["network_path"],
        construct: network,
    },
    ToolSpec {
        name: "plans",
        variants: Variants::None,
        requirements: &["plans_path"],
        construct: plans,
    },
    ToolSpec {
        name: "transit_schedule",
        variants: Variants::None,
        requirements: &["transit_schedule_path"],
        construct: transit_schedule,
    },
    ToolSpec {
        name: "transit_vehicles",
        variants: Variants::None,
        requirements: &["transit_vehicles_path"],
        construct: transit_vehicles,
    },
    ToolSpec {
        name: "attributes",
        variants: Variants::None,
        requirements: &["attributes_path"],
        construct: attributes,
    },
    ToolSpec {
        name: "mode_hierarchy",
        variants: Variants::None,
        requirements: &[],
        construct: mode_hierarchy,
    },
];
