//! Headless CLI: load a scenario, run the batch and print a summary.

use anyhow::{bail, Context, Result};
use econ_runtime::{load_scenario, run_batch, Outcome, WellSummary};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct Args {
    scenario: Option<String>,
    json: bool,
    version: bool,
}

fn parse_args() -> Args {
    let mut args = Args {
        scenario: None,
        json: false,
        version: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--scenario" => args.scenario = it.next(),
            "--json" => args.json = true,
            "--version" | "-V" => args.version = true,
            _ => {}
        }
    }
    args
}

fn print_well(s: &WellSummary) {
    println!(
        "well {} | cutoff: {} | unecon: {} | capex: ${:.2} | expenses: ${:.2} | taxes: ${:.2} | net cf: ${:.2}",
        s.well_id, s.cutoff_date, s.unecon, s.capex, s.expenses, s.taxes, s.net_cash_flow
    );
}

fn main() -> Result<()> {
    let args = parse_args();
    if args.version {
        println!(
            "econ-cli {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }

    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let Some(path) = args.scenario else {
        bail!("usage: econ-cli --scenario <file.yaml|file.json> [--json]");
    };
    info!(%path, "starting CLI");
    let scenario = load_scenario(&path).with_context(|| format!("loading {path}"))?;
    let report = run_batch(&scenario);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for w in &report.wells {
        match &w.outcome {
            Outcome::Ok(result) => print_well(&WellSummary::of(result)),
            Outcome::Failed(f) => println!("well {} | FAILED: {}", w.well_id, f.message),
        }
    }
    for g in &report.groups {
        match &g.outcome {
            Outcome::Ok(group) => {
                print_well(&WellSummary::of(&group.result));
                for share in &group.allocations {
                    println!(
                        "  {} <- {} | capex ratio: {:.4} | allocated cost: ${:.2}",
                        share.well_id,
                        g.group_id,
                        share.capex_ratio,
                        share.total_cost()
                    );
                }
            }
            Outcome::Failed(f) => println!("group {} | FAILED: {}", g.group_id, f.message),
        }
    }
    println!(
        "Batch | wells: {} | groups: {} | failed: {}",
        report.wells.len(),
        report.groups.len(),
        report.failed()
    );
    Ok(())
}
