//! Loadshape dataset entry point: CLI wiring and config-driven batch run.

use std::path::{Path, PathBuf};
use std::process;

use loadshape_dataset::config::RunConfig;
use loadshape_dataset::observability::init_tracing;
use loadshape_dataset::pipeline::run_batch;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    out_dir: Option<String>,
    synthesize_only: bool,
}

fn print_help() {
    eprintln!("loadshape-dataset: synthetic loadshapes and measurement datasets");
    eprintln!();
    eprintln!("Usage: loadshape-dataset [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>          Load run configuration from a TOML file");
    eprintln!("  --preset <name>          Use a built-in preset (demo, demo_yearly)");
    eprintln!("  --seed <u64>             Override every circuit's master seed");
    eprintln!("  --out <dir>              Override the output directory");
    eprintln!("  --synthesize-only        Write loadshapes and labels without simulating");
    eprintln!("  --help                   Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the demo preset is used.");
}

/// Returns the value following a flag or exits with a usage error.
fn flag_value(args: &[String], i: usize, flag: &str, what: &str) -> String {
    match args.get(i) {
        Some(v) => v.clone(),
        None => {
            eprintln!("error: {flag} requires {what}");
            process::exit(1);
        }
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        seed_override: None,
        out_dir: None,
        synthesize_only: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => {
                i += 1;
                cli.config_path = Some(flag_value(&args, i, "--config", "a path argument"));
            }
            "--preset" => {
                i += 1;
                cli.preset = Some(flag_value(&args, i, "--preset", "a name argument"));
            }
            "--seed" => {
                i += 1;
                let raw = flag_value(&args, i, "--seed", "a u64 argument");
                if let Ok(s) = raw.parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{raw}\" is not a valid u64");
                    process::exit(1);
                }
            }
            "--out" => {
                i += 1;
                cli.out_dir = Some(flag_value(&args, i, "--out", "a directory argument"));
            }
            "--synthesize-only" => {
                cli.synthesize_only = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    let cli = parse_args();
    init_tracing();

    // --config takes priority, then --preset, then the demo default
    let loaded = if let Some(ref path) = cli.config_path {
        RunConfig::from_toml_file(Path::new(path))
    } else if let Some(ref name) = cli.preset {
        RunConfig::from_preset(name)
    } else {
        Ok(RunConfig::demo())
    };
    let mut cfg = match loaded {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    if let Some(seed) = cli.seed_override {
        for circuit in &mut cfg.circuits {
            circuit.seed = seed;
        }
    }
    if let Some(ref dir) = cli.out_dir {
        cfg.output.directory = PathBuf::from(dir);
    }

    let errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let outcomes = run_batch(&cfg, cli.synthesize_only);
    for outcome in &outcomes {
        match &outcome.result {
            Ok(paths) => println!(
                "{}: ok ({})",
                outcome.circuit,
                paths.labels.parent().unwrap_or(Path::new(".")).display()
            ),
            Err(e) => println!("{}: failed: {e}", outcome.circuit),
        }
    }
    let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
    println!("{} of {} circuits succeeded", outcomes.len() - failed, outcomes.len());

    if failed > 0 {
        process::exit(1);
    }
}
