// CLI entry point for replaying scripted construction sessions.
//
// Loads a piece catalog and a replay script (world description plus a list
// of build actions), runs the actions through a construction controller,
// and prints the resulting track layout as JSON on stdout. Rejected actions
// are reported on stderr. Set `RUST_LOG=debug` to see every narrowing
// reset, pin and rejection.
//
// Usage:
//   replay --catalog <FILE> --script <FILE> [OPTIONS]
//     --config <FILE>    BuildConfig JSON (default: built-in defaults)
//
// See `replay.rs` for the script format and `data/` for samples.

use std::path::{Path, PathBuf};

use coaster_build::catalog::TrackCatalog;
use coaster_build::config::BuildConfig;
use coaster_build::replay::{ReplayScript, run_script};

struct Args {
    config: Option<PathBuf>,
    catalog: PathBuf,
    script: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    let config = match &args.config {
        Some(path) => load(path, "config", BuildConfig::from_json),
        None => BuildConfig::default(),
    };
    let catalog = load(&args.catalog, "catalog", TrackCatalog::from_json);
    let script = load(&args.script, "script", ReplayScript::from_json);

    let report = run_script(&config, &catalog, &script);
    for (index, err) in &report.rejected {
        eprintln!("action {index}: {err}");
    }
    log::info!(
        "{} actions, {} pieces placed, {} rejected",
        script.actions.len(),
        report.layout.len(),
        report.rejected.len()
    );

    match report.layout.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to serialize layout: {e}");
            std::process::exit(1);
        }
    }
}

/// Read and parse one JSON input file, exiting on failure.
fn load<T>(
    path: &Path,
    what: &str,
    parse: impl Fn(&str) -> Result<T, serde_json::Error>,
) -> T {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Failed to read {what} {}: {e}", path.display());
            std::process::exit(1);
        }
    };
    match parse(&text) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{what} {} does not parse: {e}", path.display());
            eprintln!("Invalid {what} {}: {e}", path.display());
            std::process::exit(1);
        }
    }
}

/// Parse command-line arguments. Uses simple `std::env::args()` matching.
fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().collect();
    let mut config = None;
    let mut catalog = None;
    let mut script = None;
    let mut i = 1;

    while i < args.len() {
        let flag = args[i].as_str();
        i += 1;
        let value = args.get(i).map(PathBuf::from);
        match flag {
            "--config" => config = value,
            "--catalog" => catalog = value,
            "--script" => script = value,
            "--help" | "-h" => {
                println!("Usage: replay --catalog <FILE> --script <FILE> [--config <FILE>]");
                std::process::exit(0);
            }
            other => {
                eprintln!("Unknown argument: {other}");
                std::process::exit(1);
            }
        }
        if value_missing(&args, i) {
            eprintln!("{flag} requires a file path");
            std::process::exit(1);
        }
        i += 1;
    }

    match (catalog, script) {
        (Some(catalog), Some(script)) => Args {
            config,
            catalog,
            script,
        },
        _ => {
            eprintln!("Both --catalog and --script are required");
            std::process::exit(1);
        }
    }
}

fn value_missing(args: &[String], i: usize) -> bool {
    args.get(i).is_none_or(|v| v.starts_with("--"))
}
