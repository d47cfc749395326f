//! GN-012: Paths tier: locate each configured simulation output on disk.

use crate::core::error::ProducerError;
use crate::core::registry::{BuildContext, Producer, Resources, ToolSpec, Variants};
use crate::core::types::Artifact;
use serde_json::json;

/// Resolves one named input to an existing file.
#[derive(Debug)]
pub struct InputPath {
    input: &'static str,
}

impl Producer for InputPath {
    fn build(
        &mut self,
        _resources: &Resources<'_>,
        ctx: &BuildContext<'_>,
    ) -> Result<Artifact, ProducerError> {
        let path = ctx
            .config
            .input_path(self.input)
            .ok_or_else(|| ProducerError::MissingInput(self.input.to_string()))?;
        std::fs::metadata(&path).map_err(|source| ProducerError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(json!({
            "input": self.input,
            "path": path.display().to_string(),
        }))
    }
}

macro_rules! input_path {
    ($ctor:ident, $input:literal) => {
        fn $ctor(_option: Option<&str>) -> Box<dyn Producer> {
            Box::new(InputPath { input: $input })
        }
    };
}

input_path!(events_path, "events");
input_path!(network_path, "network");
input_path!(plans_path, "plans");
input_path!(transit_schedule_path, "transit_schedule");
input_path!(transit_vehicles_path, "transit_vehicles");
input_path!(attributes_path, "attributes");

const fn spec(name: &'static str, construct: fn(Option<&str>) -> Box<dyn Producer>) -> ToolSpec {
    ToolSpec {
        name,
        variants: Variants::None,
        requirements: &[],
        construct,
    }
}

pub static TOOLS: &[ToolSpec] = &[
    spec("events_path", events_path),
    spec("network_path", network_path),
    spec("plans_path", plans_path),
    spec("transit_schedule_path", transit_schedule_path),
    spec("transit_vehicles_path", transit_vehicles_path),
    spec("attributes_path", attributes_path),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stations::fixtures;

    #[test]
    fn test_gn012_path_found() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        let artifact = events_path(None).build(&Resources::new(), &ctx).unwrap();
        assert_eq!(artifact["input"], "events");
        assert!(artifact["path"].as_str().unwrap().ends_with("output_events.xml"));
    }

    #[test]
    fn test_gn012_path_not_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = fixtures::scenario(dir.path(), "");
        config.inputs.shift_remove("plans");
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        let err = plans_path(None).build(&Resources::new(), &ctx).unwrap_err();
        assert!(matches!(err, ProducerError::MissingInput(ref name) if name == "plans"));
    }

    #[test]
    fn test_gn012_path_absent_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixtures::scenario(dir.path(), "");
        std::fs::remove_file(dir.path().join("output_network.xml")).unwrap();
        let ctx = BuildContext {
            config: &config,
            write_path: None,
        };
        let err = network_path(None).build(&Resources::new(), &ctx).unwrap_err();
        assert!(matches!(err, ProducerError::Io { .. }));
    }

    #[test]
    fn test_gn012_registry_has_no_variants() {
        assert!(TOOLS.iter().all(|t| t.variants == Variants::None));
        assert!(TOOLS.iter().all(|t| t.requirements.is_empty()));
    }
}
