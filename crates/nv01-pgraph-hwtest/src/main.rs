//! Command-line runner for the NV1 PGRAPH regression suite.
//!
//! Runs the selected scenario groups against the chosen back-end and exits
//! non-zero if any scenario fails.

use std::path::PathBuf;
use std::process;

use nv01_pgraph_hwtest::{Backend, Config, GROUPS, Report, TestOutcome, run};
use nvidia_nv01_pgraph::SimulatedCard;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct CliArgs {
    config_path: Option<PathBuf>,
    seed: Option<u64>,
    groups: Vec<String>,
    scenarios: Vec<String>,
    iteration: Option<u32>,
    scale: Option<f64>,
    report_path: Option<PathBuf>,
    list: bool,
}

fn print_usage_and_exit(code: i32) -> ! {
    eprintln!("Usage: nv01-pgraph-hwtest [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <file.json>  Load settings from a JSON config file");
    eprintln!("  --seed <n>            Run seed, decimal or 0x-prefixed hex");
    eprintln!("  --group <name>        Run only this group (repeatable)");
    eprintln!("  --scenario <name>     Run only this scenario, as name or group.name (repeatable)");
    eprintln!("  --iteration <n>       Replay a single iteration");
    eprintln!("  --scale <f>           Multiply every iteration count [default: 1.0]");
    eprintln!("  --report <file.json>  Write a JSON report");
    eprintln!("  --list                List groups and scenarios");
    eprintln!("  -h, --help            Show this help");
    process::exit(code);
}

fn parse_seed(value: &str) -> Option<u64> {
    match value.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16).ok(),
        None => value.parse().ok(),
    }
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        seed: None,
        groups: Vec::new(),
        scenarios: Vec::new(),
        iteration: None,
        scale: None,
        report_path: None,
        list: false,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--config" | "--seed" | "--group" | "--scenario" | "--iteration" | "--scale"
            | "--report" => {
                i += 1;
                let Some(value) = args.get(i) else {
                    eprintln!("Missing value for {flag}");
                    print_usage_and_exit(1);
                };
                let ok = match flag {
                    "--config" => {
                        cli.config_path = Some(PathBuf::from(value));
                        true
                    }
                    "--seed" => {
                        cli.seed = parse_seed(value);
                        cli.seed.is_some()
                    }
                    "--group" => {
                        cli.groups.push(value.clone());
                        true
                    }
                    "--scenario" => {
                        cli.scenarios.push(value.clone());
                        true
                    }
                    "--iteration" => {
                        cli.iteration = value.parse().ok();
                        cli.iteration.is_some()
                    }
                    "--scale" => {
                        cli.scale = value
                            .parse::<f64>()
                            .ok()
                            .filter(|s| s.is_finite() && *s > 0.0);
                        cli.scale.is_some()
                    }
                    _ => {
                        cli.report_path = Some(PathBuf::from(value));
                        true
                    }
                };
                if !ok {
                    eprintln!("Invalid {flag} value '{value}'");
                    print_usage_and_exit(1);
                }
            }
            "--list" => {
                cli.list = true;
            }
            "-h" | "--help" => print_usage_and_exit(0),
            other => {
                eprintln!("Unknown argument: {other}");
                print_usage_and_exit(1);
            }
        }
        i += 1;
    }
    cli
}

fn list_scenarios() {
    for group in GROUPS {
        println!("{}", group.name);
        for scenario in group.scenarios {
            println!("  {:<20} {:>9}", scenario.name, scenario.iterations);
        }
    }
}

/// The file config, if any, with command-line flags applied on top.
fn build_config(cli: CliArgs) -> Config {
    let mut config = match &cli.config_path {
        Some(path) => Config::load(path).unwrap_or_else(|e| {
            eprintln!("{e}");
            process::exit(1);
        }),
        None => Config::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if !cli.groups.is_empty() {
        config.groups = cli.groups;
    }
    if !cli.scenarios.is_empty() {
        config.scenarios = cli.scenarios;
    }
    if cli.iteration.is_some() {
        config.iteration = cli.iteration;
    }
    if let Some(scale) = cli.scale {
        config.scale = scale;
    }
    if cli.report_path.is_some() {
        config.report = cli.report_path;
    }
    config
}

fn summarize(report: &Report) {
    for failed in report.failures() {
        let Some(failure) = &failed.failure else {
            continue;
        };
        eprintln!(
            "{}.{} failed at iteration {}; replay with --seed {:#x} --scenario {}.{} --iteration {}",
            failed.group,
            failed.name,
            failure.iteration,
            report.seed,
            failed.group,
            failed.name,
            failure.iteration
        );
        for mismatch in &failure.diff {
            eprintln!("  {mismatch}");
        }
    }
    println!("{} scenarios: {}", report.scenarios.len(), report.outcome);
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = parse_args();
    if cli.list {
        list_scenarios();
        return;
    }
    let config = build_config(cli);

    let report = match config.backend {
        Backend::Simulated => {
            info!("running against the simulated card");
            let mut card = SimulatedCard::new();
            run(&mut card, &config)
        }
    };
    let report = report.unwrap_or_else(|e| {
        error!("{e}");
        process::exit(1);
    });

    if let Some(path) = &config.report {
        if let Err(e) = report.write(path) {
            error!("{e}");
            process::exit(1);
        }
        info!("report written to {}", path.display());
    }

    summarize(&report);
    if report.outcome == TestOutcome::Fail {
        process::exit(1);
    }
}
