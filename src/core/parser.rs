//! GN-019: Run configuration parsing and validation.
//!
//! Parses gantry.toml (or a YAML equivalent) and checks:
//! - Scenario name is set and usable as a file-name stem
//! - time_periods > 0 and 0 < scale_factor <= 1
//! - Capability and option names are identifiers
//! - At least one handler is requested

use super::error::ConfigError;
use super::types::{PipelineConfig, RequirementMap};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a run configuration from disk. `.yaml` and `.yml` files are read
/// as YAML, anything else as TOML. Relative input paths resolve against the
/// file's directory.
pub fn parse_config_file(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => parse_config_yaml(&content)?,
        _ => parse_config(&content)?,
    };
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(config.with_base_dir(base))
}

/// Parse a TOML run configuration from a string.
pub fn parse_config(toml_text: &str) -> Result<PipelineConfig, ConfigError> {
    Ok(toml::from_str(toml_text)?)
}

/// Parse a YAML run configuration from a string.
pub fn parse_config_yaml(yaml: &str) -> Result<PipelineConfig, ConfigError> {
    Ok(serde_yaml_ng::from_str(yaml)?)
}

fn identifier() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("literal regex"))
}

fn file_stem() -> &'static Regex {
    static STEM: OnceLock<Regex> = OnceLock::new();
    STEM.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").expect("literal regex"))
}

/// True when `name` can prefix an artifact file name: letters, digits, `_`
/// and `-`, starting with a letter or digit. Rules out path separators and
/// `.`/`..`.
pub fn is_file_stem(name: &str) -> bool {
    file_stem().is_match(name)
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &PipelineConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |message: String| errors.push(ValidationError { message });

    let name = &config.scenario.name;
    if name.trim().is_empty() {
        push("scenario name must not be empty".to_string());
    } else if !is_file_stem(name) {
        push(format!(
            "scenario name '{name}' may only contain letters, digits, '_' and '-'"
        ));
    }
    if config.scenario.time_periods == 0 {
        push("time_periods must be greater than 0".to_string());
    }
    let scale = config.scenario.scale_factor;
    if !(scale > 0.0 && scale <= 1.0) {
        push(format!("scale_factor must be in (0, 1], got {scale}"));
    }

    for name in config.inputs.keys() {
        if !identifier().is_match(name) {
            push(format!("input '{name}' is not a valid identifier"));
        }
    }

    let sections: [(&str, &RequirementMap); 4] = [
        ("event_handlers", &config.event_handlers),
        ("plan_handlers", &config.plan_handlers),
        ("post_processors", &config.post_processors),
        ("benchmarks", &config.benchmarks),
    ];
    for (section, map) in sections {
        for (capability, options) in map {
            if !identifier().is_match(capability) {
                push(format!(
                    "[{section}] capability '{capability}' is not a valid identifier"
                ));
            }
            for option in options {
                if !identifier().is_match(option) {
                    push(format!(
                        "[{section}] {capability}: option '{option}' is not a valid identifier"
                    ));
                }
            }
        }
    }

    if sections.iter().all(|(_, map)| map.is_empty()) {
        push("no handlers requested: nothing to build".to_string());
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
[scenario]
name = "test_town"
time_periods = 24
scale_factor = 0.01

[inputs]
events = "output_events.xml"
network = "output_network.xml"

[outputs]
path = "./outputs"

[event_handlers]
volume_counts = ["car", "bus"]

[post_processors]
vkt = ["car"]
"#;

    #[test]
    fn test_gn019_parse_valid() {
        let config = parse_config(VALID).unwrap();
        assert_eq!(config.scenario.name, "test_town");
        assert_eq!(config.scenario.crs, "EPSG:27700");
        assert_eq!(config.event_handlers["volume_counts"], vec!["car", "bus"]);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_gn019_parse_yaml() {
        let yaml = r#"
scenario:
  name: test_town
inputs:
  plans: output_plans.xml
plan_handlers:
  mode_share: [all]
"#;
        let config = parse_config_yaml(yaml).unwrap();
        assert_eq!(config.scenario.time_periods, 24);
        assert_eq!(config.plan_handlers["mode_share"], vec!["all"]);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_gn019_parse_error() {
        let err = parse_config("[scenario\nname = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
        assert!(err.to_string().starts_with("TOML parse error"));
    }

    #[test]
    fn test_gn019_missing_scenario() {
        assert!(parse_config("[event_handlers]\nvolume_counts = [\"car\"]\n").is_err());
    }

    #[test]
    fn test_gn019_file_resolves_inputs_relative() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("gantry.toml");
        std::fs::write(&file, VALID).unwrap();
        let config = parse_config_file(&file).unwrap();
        assert_eq!(
            config.input_path("events").unwrap(),
            dir.path().join("output_events.xml")
        );
        assert_eq!(config.output_path().unwrap(), dir.path().join("./outputs"));
    }

    #[test]
    fn test_gn019_file_picks_yaml_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("run.yml");
        std::fs::write(&file, "scenario:\n  name: y\nbenchmarks:\n  mode_share_comparison: [all]\n")
            .unwrap();
        let config = parse_config_file(&file).unwrap();
        assert_eq!(config.scenario.name, "y");
    }

    #[test]
    fn test_gn019_file_missing() {
        let err = parse_config_file(Path::new("/nonexistent/gantry.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_gn019_scenario_bounds() {
        let mut config = parse_config(VALID).unwrap();
        config.scenario.name = " ".to_string();
        config.scenario.time_periods = 0;
        config.scenario.scale_factor = 1.5;
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 3);
        assert!(errors[2].message.contains("scale_factor"));
    }

    #[test]
    fn test_gn019_scenario_name_stays_inside_write_path() {
        for bad in ["../x", "a/b", "a\\b", "..", ".hidden", "London 2020"] {
            let mut config = parse_config(VALID).unwrap();
            config.scenario.name = bad.to_string();
            let errors = validate_config(&config);
            assert_eq!(errors.len(), 1, "{bad}");
            assert!(errors[0].message.contains("scenario name"), "{bad}");
        }
        for good in ["test_town", "London-2020", "Run7"] {
            assert!(is_file_stem(good), "{good}");
        }
    }

    #[test]
    fn test_gn019_bad_identifiers() {
        let mut config = parse_config(VALID).unwrap();
        config
            .event_handlers
            .insert("Volume-Counts".to_string(), vec!["car".to_string()]);
        config
            .post_processors
            .insert("vkt".to_string(), vec!["Car Park".to_string()]);
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("Volume-Counts"));
        assert!(errors[1].message.contains("Car Park"));
    }

    #[test]
    fn test_gn019_nothing_requested() {
        let config = parse_config("[scenario]\nname = \"empty\"\n").unwrap();
        let errors = validate_config(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("nothing to build"));
    }
}
