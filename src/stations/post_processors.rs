//! GN-016: Post processors: derived outputs over handler results.

use super::{descriptor, lineage, persist, StationKind};
use crate::core::error::ProducerError;
use crate::core::registry::{BuildContext, Producer, Resources, ToolSpec, Variants};
use crate::core::types::Artifact;

const VKT: &[&str] = &["volume_counts"];
const TRIP_LOGS: &[&str] = &["agent_logs", "mode_hierarchy"];

#[derive(Debug)]
pub struct PostProcessor {
    tool: &'static str,
    option: Option<String>,
    requirements: &'static [&'static str],
    units: Option<&'static str>,
}

impl Producer for PostProcessor {
    fn build(
        &mut self,
        resources: &Resources<'_>,
        ctx: &BuildContext<'_>,
    ) -> Result<Artifact, ProducerError> {
        let option = self.option.as_deref();
        let upstream = lineage(resources, self.requirements, option)?;
        let mut artifact = descriptor(StationKind::PostProcessors, self.tool, option, upstream);
        if let Some(units) = self.units {
            artifact["units"] = units.into();
        }
        persist(ctx, self.tool, option, &artifact)?;
        Ok(artifact)
    }
}

fn vkt(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(PostProcessor {
        tool: "vkt",
        option: option.map(str::to_string),
        requirements: VKT,
        units: Some("km"),
    })
}

fn trip_logs(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(PostProcessor {
        tool: "trip_logs",
        option: option.map(str::to_string),
        requirements: TRIP_LOGS,
        units: None,
    })
}

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "vkt",
        variants: Variants::Options(&["car", "bus", "train", "subway", "ferry"]),
        requirements: VKT,
        construct: vkt,
    },
    ToolSpec {
        name: "trip_logs",
        variants: Variants::Options(&["all"]),
        requirements: TRIP_LOGS,
        construct: trip_logs,
    },
];
