//! GN-018: CLI subcommands: init, validate, plan, run, stations, completions.

use crate::core::registry::{BuildContext, Variants};
use crate::core::types::{BuildReport, PipelineConfig, SchedulePlan};
use crate::core::{executor, parser, planner, resolver, validate};
use crate::stations::{self, Pipeline, StationKind};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "gantry",
    version,
    about = "Demand-driven station graph for transport simulation analytics"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template gantry.toml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a run config and the station graph it wires
    Validate {
        /// Path to gantry.toml
        #[arg(short, long, default_value = "gantry.toml")]
        file: PathBuf,
    },

    /// Show the build schedule without running any producer
    Plan {
        /// Path to gantry.toml
        #[arg(short, long, default_value = "gantry.toml")]
        file: PathBuf,
    },

    /// Build every requested output
    Run {
        /// Path to gantry.toml
        #[arg(short, long, default_value = "gantry.toml")]
        file: PathBuf,

        /// Where producers write artifacts (overrides [outputs] path)
        #[arg(short = 'o', long)]
        write_path: Option<PathBuf>,

        /// Print the build report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List station kinds and the tools each registers
    Stations,

    /// Generate shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Plan { file } => cmd_plan(&file),
        Commands::Run {
            file,
            write_path,
            json,
        } => cmd_run(&file, write_path.as_deref(), json),
        Commands::Stations => {
            cmd_stations();
            Ok(())
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "gantry", &mut std::io::stdout());
            Ok(())
        }
    }
}

const TEMPLATE: &str = r#"[scenario]
name = "my_scenario"
time_periods = 24
scale_factor = 0.1
crs = "EPSG:27700"

[inputs]
events = "output_events.xml"
network = "output_network.xml"
plans = "output_plans.xml"
transit_schedule = "output_transitSchedule.xml"
transit_vehicles = "output_transitVehicles.xml"
attributes = "output_personAttributes.xml"

[outputs]
path = "outputs"

[event_handlers]
volume_counts = ["car"]

[plan_handlers]
mode_share = ["all"]

[post_processors]
vkt = ["car"]
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("gantry.toml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&config_path, TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized gantry run at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

/// Parse and validate a run config, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<PipelineConfig, String> {
    let config = parser::parse_config_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err(format!("{} validation error(s)", errors.len()))
}

fn wire(config: &PipelineConfig) -> Result<Pipeline, String> {
    stations::standard_pipeline(config.requirements()).map_err(|e| e.to_string())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let mut pipeline = wire(&config)?;
    validate::validate(&mut pipeline.graph, pipeline.root).map_err(|e| e.to_string())?;

    println!(
        "OK: {} ({} stations, {} requested outputs)",
        config.scenario.name,
        pipeline.graph.len(),
        config.requirements().len()
    );
    Ok(())
}

/// Validate, assign depths and resolve, stopping short of building.
fn schedule(config: &PipelineConfig) -> Result<SchedulePlan, String> {
    let mut pipeline = wire(config)?;
    let (graph, root) = (&mut pipeline.graph, pipeline.root);
    validate::validate(graph, root).map_err(|e| e.to_string())?;
    planner::build_graph_depth(graph, root).map_err(|e| e.to_string())?;
    let errors = resolver::resolve(graph, root)
        .map_err(|e| e.to_string())?
        .iter()
        .map(ToString::to_string)
        .collect();
    planner::plan(graph, root, &config.scenario.name, errors).map_err(|e| e.to_string())
}

fn cmd_plan(file: &Path) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let plan = schedule(&config)?;
    print_plan(&plan);
    if plan.errors.is_empty() {
        Ok(())
    } else {
        Err(format!("{} resolution error(s)", plan.errors.len()))
    }
}

/// Display a plan to stdout.
fn print_plan(plan: &SchedulePlan) {
    println!("Planning: {} ({} tools)", plan.name, plan.tool_count());
    println!();
    for station in &plan.stations {
        println!("[{}] {}:", station.depth, station.station);
        if station.tools.is_empty() {
            println!("    (nothing requested)");
        }
        for tool in &station.tools {
            println!("  + {}", tool);
        }
    }
    if !plan.errors.is_empty() {
        println!();
        for e in &plan.errors {
            println!("  ERROR: {}", e);
        }
    }
}

fn cmd_run(file: &Path, write_path: Option<&Path>, json: bool) -> Result<(), String> {
    let config = parse_and_validate(file)?;
    let mut pipeline = wire(&config)?;
    let output = write_path.map(Path::to_path_buf).or_else(|| config.output_path());
    let ctx = BuildContext {
        config: &config,
        write_path: output.as_deref(),
    };

    match executor::build(&mut pipeline.graph, pipeline.root, &ctx) {
        Ok(report) if json => {
            let text = serde_json::to_string_pretty(&report)
                .map_err(|e| format!("cannot serialize report: {}", e))?;
            println!("{}", text);
            Ok(())
        }
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            for line in e.lines() {
                eprintln!("  FAILED: {}", line);
            }
            Err(format!("run {} did not complete", config.scenario.name))
        }
    }
}

fn print_report(report: &BuildReport) {
    for station in &report.stations {
        println!("{} (depth {}):", station.station, station.depth);
        for resource in &station.resources {
            println!(
                "  {} {} ({:.3}s)",
                resource.key, resource.digest, resource.duration_seconds
            );
        }
    }
    println!();
    println!(
        "Run complete: {} built in {:.1}s (run {}).",
        report.built, report.total_seconds, report.run_id
    );
}

fn cmd_stations() {
    for kind in StationKind::ALL {
        println!("{}:", kind);
        for spec in kind.registry() {
            let options = match spec.variants {
                Variants::None => String::new(),
                Variants::Options(options) => format!(" [{}]", options.join(", ")),
            };
            let requires = if spec.requirements.is_empty() {
                String::new()
            } else {
                format!(" <- {}", spec.requirements.join(", "))
            };
            println!("  {}{}{}", spec.name, options, requires);
        }
    }
}
