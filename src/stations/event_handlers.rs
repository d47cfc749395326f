//! GN-014: Event handlers: per-mode aggregations over the simulation event stream.

use super::{descriptor, lineage, persist, StationKind};
use crate::core::error::ProducerError;
use crate::core::registry::{BuildContext, Producer, Resources, ToolSpec, Variants};
use crate::core::types::Artifact;

const VOLUME_COUNTS: &[&str] = &["events", "network"];
const TRANSIT: &[&str] = &[
    "events",
    "network",
    "transit_schedule",
    "transit_vehicles",
    "attributes",
];

/// One event-stream aggregation for one mode, binned into the scenario's
/// time periods.
#[derive(Debug)]
pub struct EventHandler {
    tool: &'static str,
    mode: Option<String>,
    requirements: &'static [&'static str],
}

impl Producer for EventHandler {
    fn build(
        &mut self,
        resources: &Resources<'_>,
        ctx: &BuildContext<'_>,
    ) -> Result<Artifact, ProducerError> {
        let mode = self.mode.as_deref();
        let upstream = lineage(resources, self.requirements, mode)?;
        let mut artifact = descriptor(StationKind::EventHandlers, self.tool, mode, upstream);
        artifact["time_periods"] = ctx.config.scenario.time_periods.into();
        artifact["scale_factor"] = ctx.config.scenario.scale_factor.into();
        persist(ctx, self.tool, mode, &artifact)?;
        Ok(artifact)
    }
}

fn volume_counts(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(EventHandler {
        tool: "volume_counts",
        mode: option.map(str::to_string),
        requirements: VOLUME_COUNTS,
    })
}

fn passenger_counts(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(EventHandler {
        tool: "passenger_counts",
        mode: option.map(str::to_string),
        requirements: TRANSIT,
    })
}

fn stop_interactions(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(EventHandler {
        tool: "stop_interactions",
        mode: option.map(str::to_string),
        requirements: TRANSIT,
    })
}

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "volume_counts",
        variants: Variants::Options(&["car", "bus", "train", "subway", "ferry", "walk", "bike"]),
        requirements: VOLUME_COUNTS,
        construct: volume_counts,
    },
    ToolSpec {
        name: "passenger_counts",
        variants: Variants::Options(&["bus", "train", "subway", "ferry", "tram"]),
        requirements: TRANSIT,
        construct: passenger_counts,
    },
    ToolSpec {
        name: "stop_interactions",
        variants: Variants::Options(&["bus", "train", "subway", "ferry", "tram"]),
        requirements: TRANSIT,
        construct: stop_interactions,
    },
];
