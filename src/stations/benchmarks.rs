//! GN-017: Benchmarks: compare handler outputs against reference observations.
//!
//! A benchmark's reference file is looked up among the configured inputs by
//! the benchmark's own name. Without one the comparison is still produced,
//! flagged as unreferenced.

use super::{descriptor, lineage, persist, StationKind};
use crate::core::error::ProducerError;
use crate::core::registry::{BuildContext, Producer, Resources, ToolSpec, Variants};
use crate::core::types::Artifact;
use crate::provenance::hasher;
use serde_json::Value;

const MODE_SHARE_COMPARISON: &[&str] = &["mode_share"];
const LINK_COUNTS_COMPARISON: &[&str] = &["volume_counts"];

#[derive(Debug)]
pub struct Benchmark {
    tool: &'static str,
    option: Option<String>,
    requirements: &'static [&'static str],
}

impl Benchmark {
    /// Digest of the reference data, if configured.
    fn reference(&self, ctx: &BuildContext<'_>) -> Result<Value, ProducerError> {
        let Some(path) = ctx.config.input_path(self.tool) else {
            return Ok(Value::Null);
        };
        let digest = hasher::hash_file(&path).map_err(|source| ProducerError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(Value::from(digest))
    }
}

impl Producer for Benchmark {
    fn build(
        &mut self,
        resources: &Resources<'_>,
        ctx: &BuildContext<'_>,
    ) -> Result<Artifact, ProducerError> {
        let option = self.option.as_deref();
        let upstream = lineage(resources, self.requirements, option)?;
        let mut artifact = descriptor(StationKind::Benchmarks, self.tool, option, upstream);
        artifact["reference"] = self.reference(ctx)?;
        persist(ctx, self.tool, option, &artifact)?;
        Ok(artifact)
    }
}

fn mode_share_comparison(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(Benchmark {
        tool: "mode_share_comparison",
        option: option.map(str::to_string),
        requirements: MODE_SHARE_COMPARISON,
    })
}

fn link_counts_comparison(option: Option<&str>) -> Box<dyn Producer> {
    Box::new(Benchmark {
        tool: "link_counts_comparison",
        option: option.map(str::to_string),
        requirements: LINK_COUNTS_COMPARISON,
    })
}

pub static TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "mode_share_comparison",
        variants: Variants::Options(&["all"]),
        requirements: MODE_SHARE_COMPARISON,
        construct: mode_share_comparison,
    },
    ToolSpec {
        name: "link_counts_comparison",
        variants: Variants::Options(&["car", "bus"]),
        requirements: LINK_COUNTS_COMPARISON,
        construct: link_counts_comparison,
    },
];
