// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: run one 2D-to-3D conversion pass over a plan file
//!
//! Usage:
//!   plan-to-3d <plan.json> [options]

use houseplan_engine::{
    apply_plan, ApplyAction, ApplyOptions, ApplySummary, EngineConfig, Error, FloorPlanState,
    PlanInput, Result,
};
use serde::Serialize;
use std::env;
use std::fs;
use std::path::Path;

#[derive(Serialize)]
struct Output<'a> {
    state: &'a FloorPlanState,
    summary: &'a ApplySummary,
}

struct Args {
    plan_path: String,
    previous_path: Option<String>,
    output_path: Option<String>,
    options: ApplyOptions,
    verbose: bool,
}

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let parsed = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    let default_filter = if parsed.verbose {
        "info,houseplan_engine=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()))
        .with_writer(std::io::stderr)
        .init();

    match run(&parsed) {
        Ok(summary) => {
            if let Some(status) = &summary.status {
                eprintln!("{}", status);
            }
            if summary.action == ApplyAction::Failed {
                std::process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args {
        plan_path: args[1].clone(),
        previous_path: None,
        output_path: None,
        options: ApplyOptions::default(),
        verbose: false,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--level" => {
                let value = option_value(args, &mut i, "--level")?;
                parsed.options.level = value
                    .parse()
                    .map_err(|_| Error::invalid_input(format!("invalid level: {}", value)))?;
            }
            "--previous" => {
                parsed.previous_path = Some(option_value(args, &mut i, "--previous")?.to_string());
            }
            "--output" => {
                parsed.output_path = Some(option_value(args, &mut i, "--output")?.to_string());
            }
            "--strips-only" => parsed.options.strips_only = true,
            "--no-rooms" => parsed.options.allow_rooms = false,
            "--non-destructive" => parsed.options.non_destructive = true,
            "--preserve-positions" => parsed.options.preserve_positions = true,
            "--permissive-faces" => parsed.options.strict_closed_loops_only = false,
            "--quiet" => parsed.options.quiet = true,
            "--verbose" => parsed.verbose = true,
            other => {
                return Err(Error::invalid_input(format!("unknown option: {}", other)));
            }
        }
        i += 1;
    }
    Ok(parsed)
}

fn option_value<'a>(args: &'a [String], i: &mut usize, name: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| Error::invalid_input(format!("{} needs a value", name)))
}

fn run(args: &Args) -> Result<ApplySummary> {
    let plan: PlanInput = serde_json::from_str(&fs::read_to_string(&args.plan_path)?)?;
    let previous = match &args.previous_path {
        Some(path) if Path::new(path).exists() => {
            serde_json::from_str::<FloorPlanState>(&fs::read_to_string(path)?)?
        }
        Some(path) => {
            tracing::warn!(path = %path, "Previous state not found, starting empty");
            FloorPlanState::new()
        }
        None => FloorPlanState::new(),
    };

    let config = EngineConfig::from_env();
    let outcome = apply_plan(&previous, &plan, &args.options, &config);

    let json = serde_json::to_string_pretty(&Output {
        state: &outcome.state,
        summary: &outcome.summary,
    })?;
    match &args.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{}", json),
    }
    Ok(outcome.summary)
}

fn print_usage() {
    eprintln!("Usage: plan-to-3d <plan.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --level <n>            Target floor level (default: 0)");
    eprintln!("  --previous <file>      Previous state JSON to reconcile against");
    eprintln!("  --output <file>        Write state and summary here instead of stdout");
    eprintln!("  --strips-only          Skip room detection, extrude every wall");
    eprintln!("  --no-rooms             Leave rooms untouched, rebuild strips only");
    eprintln!("  --non-destructive      Keep existing 3D state when the plan is empty");
    eprintln!("  --preserve-positions   Matched rooms keep their previous position");
    eprintln!("  --permissive-faces     Also run the half-edge face pass");
    eprintln!("  --quiet                Suppress status messages");
    eprintln!("  --verbose              Debug logging (overridden by RUST_LOG)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  HOUSEPLAN_PRECISION_M, HOUSEPLAN_WALL_HEIGHT_M, HOUSEPLAN_LEVEL_HEIGHT_M");
}
