//! Grid simulator entry point: CLI wiring and config-driven engine construction.

use std::path::{Path, PathBuf};
use std::process;

use tracing::error;
use tracing_subscriber::EnvFilter;

use grid_sim::config::ScenarioConfig;
use grid_sim::grid::build_scenario;
use grid_sim::sim::SimulationEngine;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    output_dir: Option<PathBuf>,
}

fn print_help() {
    eprintln!("grid-sim: discrete-time energy distribution pipeline simulator");
    eprintln!();
    eprintln!("Usage: grid-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>        Load scenario from TOML config file");
    eprintln!(
        "  --preset <name>          Use a built-in preset ({})",
        ScenarioConfig::PRESETS.join(", ")
    );
    eprintln!("  --seed <u64>             Override random seed");
    eprintln!("  --output-dir <path>      Override output directory");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

/// Returns the value following the flag at `i`, or exits with an error.
fn value_for<'a>(args: &'a [String], i: usize, flag: &str, what: &str) -> &'a str {
    match args.get(i) {
        Some(v) => v,
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        output_dir: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                cli.scenario_path = Some(value_for(&args, i, "--scenario", "a path argument").to_string());
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(value_for(&args, i, "--preset", "a name argument").to_string());
            }
            "--seed" => {
                i += 1;
                let raw = value_for(&args, i, "--seed", "a u64 argument");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--output-dir" => {
                i += 1;
                cli.output_dir = Some(PathBuf::from(value_for(
                    &args,
                    i,
                    "--output-dir",
                    "a path argument",
                )));
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.scenario_path.is_some() && cli.preset.is_some() {
        eprintln!("error: --scenario and --preset are mutually exclusive");
        process::exit(1);
    }

    cli
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = parse_args();

    // --scenario takes priority, then --preset, then baseline default
    let loaded = if let Some(ref path) = cli.scenario_path {
        ScenarioConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        ScenarioConfig::from_preset(name)
    } else {
        Ok(ScenarioConfig::baseline())
    };
    let mut scenario = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }
    if let Some(dir) = cli.output_dir {
        scenario.simulation.output_dir = dir;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let (topology, handlers) = match build_scenario(&scenario) {
        Ok(built) => built,
        Err(e) => {
            error!(error = %e, "failed to build scenario");
            process::exit(1);
        }
    };

    let mut engine = SimulationEngine::new(topology, handlers);
    let sim = &scenario.simulation;
    match engine.run(sim.duration, sim.timestep, &sim.output_dir) {
        Ok(summary) => println!("{summary}"),
        Err(e) => {
            error!(error = %e, "simulation aborted");
            process::exit(1);
        }
    }
}
