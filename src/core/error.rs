//! GN-007: Error taxonomy for the station graph.
//!
//! Structural errors ([`GraphError`]) are fatal and raised before anything is
//! built. Resolution and producer failures are collected across a whole pass
//! and surfaced together through [`BuildError::Failed`].

use std::fmt;
use std::path::PathBuf;

/// Structural problems with the station graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// A supplier back-edge closes a loop.
    #[error("station graph is cyclic: back-edge into '{station}'")]
    Cyclic { station: String },

    /// A station is supplied-to but has no managers.
    #[error("station graph is broken: '{station}' is reachable but has no managers")]
    Broken { station: String },

    /// Edges cannot change once validation has started.
    #[error("station '{station}' is {state} and can no longer be connected")]
    Sealed { station: String, state: String },

    /// Resolution only runs over a validated graph.
    #[error("station '{station}' is {state}, expected VALIDATED before resolution")]
    Unvalidated { station: String, state: String },

    /// Ordering needs every reachable station to carry a depth.
    #[error("station '{station}' has no depth assigned")]
    Unranked { station: String },
}

/// Demand that cannot be mapped onto a registered producer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unresolved requirement '{capability}' demanded by '{station}': no supplier registers it")]
    UnresolvedRequirement { station: String, capability: String },

    #[error("invalid option '{option}' for '{capability}' at '{station}' (valid: {})", .valid.join(", "))]
    InvalidOption {
        station: String,
        capability: String,
        option: String,
        valid: Vec<String>,
    },

    #[error("'{capability}' at '{station}' requires an option (valid: {})", .valid.join(", "))]
    MissingOption {
        station: String,
        capability: String,
        valid: Vec<String>,
    },
}

/// Why a single producer failed to build.
#[derive(Debug, thiserror::Error)]
pub enum ProducerError {
    /// A declared requirement never made it into the supplier caches.
    #[error("missing resource '{0}'")]
    MissingResource(String),

    /// The run configuration has no entry the producer needs.
    #[error("no '{0}' input configured")]
    MissingInput(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// A producer failure with the coordinates of the tool that raised it.
#[derive(Debug, thiserror::Error)]
#[error("{station}/{tool}{}: {source}", .option.as_deref().map(|o| format!(":{o}")).unwrap_or_default())]
pub struct BuildFailure {
    pub station: String,
    pub tool: String,
    pub option: Option<String>,
    #[source]
    pub source: ProducerError,
}

/// One entry in the aggregate failure report.
#[derive(Debug, thiserror::Error)]
pub enum Failure {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Build(#[from] BuildFailure),
}

/// What a full build returns when it does not succeed.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("{}", FailureList(.0))]
    Failed(Vec<Failure>),
}

impl BuildError {
    /// Every failure carried by this error, one line each.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::Graph(e) => vec![e.to_string()],
            Self::Failed(failures) => failures.iter().map(ToString::to_string).collect(),
        }
    }
}

struct FailureList<'a>(&'a [Failure]);

impl fmt::Display for FailureList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure(s)", self.0.len())?;
        for failure in self.0 {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

/// Reading or decoding a run configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}
