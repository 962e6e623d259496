//! Enumerates all 2^16 deterministic memory-two strategies, printing those that pass the
//! requested combination of defensibility, efficiency, and distinguishability filters.
//!
//! This binary is the external driver described by the analysis engine's interface contract: it
//! consumes [`m2pd::Strategy`]'s public operations only, and enforces the cross-check contract
//! between each property's topological and numeric formulations, aborting with a diagnostic if
//! they ever disagree.

use clap::Parser;
use m2pd::Strategy;

const NUM_STRATEGIES: u32 = 1 << 16;

/// Enumerate memory-two prisoner's dilemma strategies and filter by game-theoretic properties.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Enumerate memory-two IPD strategies passing selected filters.",
    override_usage = "m2pd <0/1 defensibility> <0/1 efficiency> <0/1 distinguishability>"
)]
struct Cli {
    /// Require defensibility.
    #[arg(value_parser = parse_bit)]
    check_defensibility: bool,

    /// Require efficiency.
    #[arg(value_parser = parse_bit)]
    check_efficiency: bool,

    /// Require distinguishability.
    #[arg(value_parser = parse_bit)]
    check_distinguishability: bool,
}

fn parse_bit(raw: &str) -> Result<bool, String> {
    match raw {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(format!("expected 0 or 1, got {:?}", other)),
    }
}

fn strategy_for_id(id: u16) -> Strategy {
    let mut chars = ['c'; 16];
    for (j, slot) in chars.iter_mut().enumerate() {
        if (id >> j) & 1 == 1 {
            *slot = 'd';
        }
    }
    Strategy::from_str16(&chars.iter().collect::<String>())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    run(
        cli.check_defensibility,
        cli.check_efficiency,
        cli.check_distinguishability,
    );
}

fn run(check_defensibility: bool, check_efficiency: bool, check_distinguishability: bool) {
    let mut num_passed: u64 = 0;
    let mut num_candidates: u64 = 0;

    for id in 0..NUM_STRATEGIES {
        num_candidates += 1;
        let strategy = strategy_for_id(id as u16);

        if num_candidates % 8192 == 0 {
            log::debug!(
                "enumerated {}/{} candidates, {} passed so far",
                num_candidates,
                NUM_STRATEGIES,
                num_passed
            );
        }

        if check_defensibility && !strategy.is_defensible() {
            continue;
        }

        if check_efficiency && !require_consistent(&strategy, "efficiency", strategy.is_efficient_topo(), || {
            strategy.is_efficient_default()
        }) {
            continue;
        }

        if check_distinguishability
            && !require_consistent(
                &strategy,
                "distinguishability",
                strategy.is_distinguishable_topo(),
                || strategy.is_distinguishable_default(),
            )
        {
            continue;
        }

        println!("{}", strategy);
        num_passed += 1;
    }

    eprintln!(
        "# passed / # candidates : {} / {}",
        num_passed, NUM_STRATEGIES
    );
}

/// Evaluate the numeric formulation of a check, abort on solver failure or on disagreement with
/// the already-computed topological formulation, and return whether the strategy passes.
fn require_consistent(
    strategy: &Strategy,
    check: &'static str,
    topological: bool,
    numeric: impl FnOnce() -> Result<bool, m2pd::AnalysisError>,
) -> bool {
    let numeric = match numeric() {
        Ok(value) => value,
        Err(err) => {
            log::error!("solver failure for strategy {}: {}", strategy, err);
            panic!("stationary-state solver failed for strategy {}: {}", strategy, err);
        }
    };

    if numeric != topological {
        log::error!(
            "{} cross-check contradiction for strategy {}: topological={} numeric={}",
            check,
            strategy,
            topological,
            numeric
        );
        panic!(
            "cross-check contradiction: strategy {} {} topological={} numeric={}",
            strategy, check, topological, numeric
        );
    }

    numeric
}
