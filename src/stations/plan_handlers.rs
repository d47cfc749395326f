//! GN-015: Plan handlers: summaries over the agents' selected plans.

use super::inputs::MODE_HIERARCHY;
use super::{descriptor, lineage, persist, StationKind};
use crate::core::error::ProducerError;
use crate::core::registry::{BuildContext, Producer, Resources, ToolSpec, Variants};
use crate::core::types::Artifact;
use serde_json::Value;

const MODE_SHARE: &[&str] = &["plans", "attributes", "mode_hierarchy"];
const PLANS: &[&str] = &["plans"];

#[derive(Debug)]
pub struct PlanHandler {
    tool: &'static str,
    subpopulation: Option<String>,
    requirements: &'static [&'static str],
}

impl Producer for PlanHandler {
    fn build(
        &mut self,
        resources: &Resources<'_>,
        ctx: &BuildContext<'_>,
    ) -> Result<Artifact, ProducerError> {
        let option = self.subpopulation.as_deref();
        let upstream = lineage(resources, self.requirements, option)?;
        let mut artifact = descriptor(StationKind::PlanHandlers, self.tool, option, upstream);

        if self.requirements.contains(&"mode_hierarchy") {
            let hierarchy = resources.require("mode_hierarchy", None)?;
            artifact["modes"] = hierarchy
                .get("hierarchy")
                .cloned()
                .unwrap_or_else(|| Value::from(MODE_HIERARCHY.to_vec()));
        }

        persist(ctx, self.tool, option, &artifact)?;
        Ok(artifact)
    }
}

fn mode_share(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(PlanHandler {
        tool: "mode_share",
        subpopulation: option.map(str::to_string),
        requirements: MODE_SHARE,
    })
}

fn agent_logs(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(PlanHandler {
        tool: "agent_logs",
        subpopulation: option.map(str::to_string),
        requirements: PLANS,
    })
}

fn agent_plans(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(PlanHandler {
        tool: "agent_plans",
        subpopulation: option.map(str::to_string),
        requirements: PLANS,
    })
}

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "mode_share",
        variants: Variants::Options(&["all"]),
        requirements: MODE_SHARE,
        construct: mode_share,
    },
    ToolSpec {
        name: "agent_logs",
        variants: Variants::Options(&["all"]),
        requirements: PLANS,
        construct: agent_logs,
    },
    ToolSpec {
        name: "agent_plans",
        variants: Variants::Options(&["all"]),
        requirements: PLANS,
        construct: agent_plans,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::fixtures;
    use serde_json::json;

    #[test]
    fn test_gn015_mode_share_carries_hierarchy() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        let plans = json!({ "digest": "p" });
        let attributes = json!({ "digest": "a" });
        let hierarchy = json!({ "hierarchy": ["ferry", "car"], "digest": "h" });
        let mut resources = Resources::new();
        resources.insert("plans", &plans);
        resources.insert("attributes", &attributes);
        resources.insert("mode_hierarchy", &hierarchy);

        let artifact = mode_share(Some("all")).build(&resources, &ctx).unwrap();
        assert_eq!(artifact["modes"], json!(["ferry", "car"]));
        assert_eq!(artifact["upstream"]["mode_hierarchy"], "h");
    }

    #[test]
    fn test_gn015_agent_logs_plans_only() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        let plans = json!({ "digest": "p" });
        let mut resources = Resources::new();
        resources.insert("plans", &plans);

        let artifact = agent_logs(Some("all")).build(&resources, &ctx).unwrap();
        assert_eq!(artifact["station"], "plan_handlers");
        assert!(artifact.get("modes").is_none());
    }
}
