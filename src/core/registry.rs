//! GN-005: Producer contract and the static tool registries stations carry.
//!
//! A station kind publishes a `&'static [ToolSpec]` table mapping tool names
//! to constructors. The engine never reflects over types: it looks a name up,
//! checks the option against the table, constructs, and calls
//! [`Producer::build`] exactly once.

use super::error::ProducerError;
use super::types::{resource_key, Artifact, PipelineConfig};
use indexmap::IndexMap;
use std::fmt;
use std::path::Path;

/// A unit of work that yields one artifact.
pub trait Producer {
    /// Build the artifact from the resources already produced by the
    /// owning station's suppliers.
    fn build(
        &mut self,
        resources: &Resources<'_>,
        ctx: &BuildContext<'_>,
    ) -> Result<Artifact, ProducerError>;
}

/// Which options a tool can be built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variants {
    /// Single instance, keyed by the bare tool name.
    None,
    /// One instance per requested option.
    Options(&'static [&'static str]),
}

/// Registry entry: a tool name and how to make it.
pub struct ToolSpec {
    pub name: &'static str,
    pub variants: Variants,
    /// Resource names this tool reads from its station's suppliers
    pub requirements: &'static [&'static str],
    pub construct: fn(Option<&str>) -> Box<dyn Producer>,
}

impl fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("variants", &self.variants)
            .field("requirements", &self.requirements)
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    /// The option list a user may pick from, empty for no-variant tools.
    pub fn valid_options(&self) -> Vec<String> {
        match self.variants {
            Variants::None => Vec::new(),
            Variants::Options(options) => options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn accepts(&self, option: &str) -> bool {
        match self.variants {
            Variants::None => true,
            Variants::Options(options) => options.contains(&option),
        }
    }
}

/// Find a tool by name in a registry table.
pub fn lookup(registry: &'static [ToolSpec], name: &str) -> Option<&'static ToolSpec> {
    registry.iter().find(|spec| spec.name == name)
}

/// A resolved `(tool, option)` pair scheduled for building.
#[derive(Debug, Clone)]
pub struct ToolRequest {
    pub spec: &'static ToolSpec,
    pub option: Option<String>,
}

impl ToolRequest {
    pub fn key(&self) -> String {
        resource_key(self.spec.name, self.option.as_deref())
    }

    pub fn option(&self) -> Option<&str> {
        self.option.as_deref()
    }

    /// Instantiate the producer for this request.
    pub fn construct(&self) -> Box<dyn Producer> {
        (self.spec.construct)(self.option.as_deref())
    }
}

/// Read-only view over the artifacts a station's suppliers have built.
#[derive(Debug, Default)]
pub struct Resources<'a> {
    entries: IndexMap<&'a str, &'a Artifact>,
}

impl<'a> Resources<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'a str, artifact: &'a Artifact) {
        self.entries.insert(key, artifact);
    }

    pub fn get(&self, key: &str) -> Option<&'a Artifact> {
        self.entries.get(key).copied()
    }

    /// Look up `name` for a consumer built with `option`: the variant entry
    /// `name:option` wins, the bare `name` of a no-variant tool is the fallback.
    pub fn find(&self, name: &str, option: Option<&str>) -> Option<(&'a str, &'a Artifact)> {
        let keyed = option.and_then(|o| self.entries.get_key_value(format!("{name}:{o}").as_str()));
        keyed
            .or_else(|| self.entries.get_key_value(name))
            .map(|(k, v)| (*k, *v))
    }

    /// Like [`Resources::find`], failing with the key that was looked for.
    pub fn require(&self, name: &str, option: Option<&str>) -> Result<&'a Artifact, ProducerError> {
        self.find(name, option)
            .map(|(_, artifact)| artifact)
            .ok_or_else(|| ProducerError::MissingResource(resource_key(name, option)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Run-wide context handed to every producer unchanged.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub config: &'a PipelineConfig,
    /// Where producers that persist output should write it
    pub write_path: Option<&'a Path>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl Producer for Echo {
        fn build(
            &mut self,
            _resources: &Resources<'_>,
            _ctx: &BuildContext<'_>,
        ) -> Result<Artifact, ProducerError> {
            Ok(json!("echo"))
        }
    }

    fn echo(_option: Option<&str>) -> Box<dyn Producer> {
        Box::new(Echo)
    }

    static TOOLS: &[ToolSpec] = &[
        ToolSpec {
            name: "counts",
            variants: Variants::Options(&["car", "bus"]),
            requirements: &["events"],
            construct: echo,
        },
        ToolSpec {
            name: "events",
            variants: Variants::None,
            requirements: &[],
            construct: echo,
        },
    ];

    #[test]
    fn test_gn005_lookup() {
        assert_eq!(lookup(TOOLS, "counts").unwrap().name, "counts");
        assert!(lookup(TOOLS, "vkt").is_none());
    }

    #[test]
    fn test_gn005_accepts_options() {
        let counts = lookup(TOOLS, "counts").unwrap();
        assert!(counts.accepts("car"));
        assert!(!counts.accepts("walk"));
        assert_eq!(counts.valid_options(), vec!["car", "bus"]);

        let events = lookup(TOOLS, "events").unwrap();
        assert!(events.accepts("anything"));
        assert!(events.valid_options().is_empty());
    }

    #[test]
    fn test_gn005_request_key() {
        let request = ToolRequest {
            spec: lookup(TOOLS, "counts").unwrap(),
            option: Some("bus".to_string()),
        };
        assert_eq!(request.key(), "counts:bus");
        let request = ToolRequest {
            spec: lookup(TOOLS, "events").unwrap(),
            option: None,
        };
        assert_eq!(request.key(), "events");
    }

    #[test]
    fn test_gn005_find_prefers_variant_then_bare() {
        let car = json!({"mode": "car"});
        let events = json!({"source": "events.xml"});
        let mut resources = Resources::new();
        resources.insert("counts:car", &car);
        resources.insert("events", &events);

        let (key, _) = resources.find("counts", Some("car")).unwrap();
        assert_eq!(key, "counts:car");
        assert!(resources.find("counts", Some("bus")).is_none());

        let (key, artifact) = resources.find("events", Some("car")).unwrap();
        assert_eq!(key, "events");
        assert_eq!(artifact["source"], "events.xml");
    }

    #[test]
    fn test_gn005_require_names_missing_key() {
        let resources = Resources::new();
        let err = resources.require("counts", Some("bus")).unwrap_err();
        assert_eq!(err.to_string(), "missing resource 'counts:bus'");
        assert!(resources.is_empty());
    }
}
