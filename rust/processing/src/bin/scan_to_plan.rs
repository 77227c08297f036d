// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! CLI tool: Convert a laser scan into a scaled 2D floor plan layout (JSON)
//!
//! Usage:
//!   scan-to-plan <scan-file> [options]

use anyhow::{bail, Context};
use scanplan_processing::{analyze_scan, detect_floor_walls, plan_layout, PipelineConfig};
use scanplan_vision::ExportOptions;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct Args {
    scan_path: PathBuf,
    floor: usize,
    paper: String,
    scale: String,
    seed: Option<u64>,
    config_path: Option<PathBuf>,
    decimated_path: Option<PathBuf>,
    output_path: Option<PathBuf>,
}

fn print_usage() {
    eprintln!("Usage: scan-to-plan <scan-file> [options]");
    eprintln!();
    eprintln!("Supported inputs: PLY (ascii / binary), XYZ / PTS text, HFPC");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --floor <N>           Floor index to plan, 0 = lowest (default: 0)");
    eprintln!("  --paper <A1|A3|A4>    Paper size (default: A3)");
    eprintln!("  --scale <1:N>         Drawing scale (default: 1:100)");
    eprintln!("  --seed <S>            Seed wall detection for reproducible output");
    eprintln!("  --config <file>       Pipeline configuration JSON");
    eprintln!("  --decimated <file>    Also write the decimated cloud (HFPC)");
    eprintln!("  --output <file>       Layout JSON path (default: stdout)");
    eprintln!();
    eprintln!("Log verbosity follows RUST_LOG (default: info).");
}

fn parse_args() -> anyhow::Result<Option<Args>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        return Ok(None);
    }

    let mut parsed = Args {
        scan_path: PathBuf::from(&args[1]),
        floor: 0,
        paper: String::from("A3"),
        scale: String::from("1:100"),
        seed: None,
        config_path: None,
        decimated_path: None,
        output_path: None,
    };

    let mut i = 2;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .cloned()
                .with_context(|| format!("Missing value for {}", flag))
        };
        match flag {
            "--floor" => parsed.floor = value()?.parse().context("Invalid floor index")?,
            "--paper" => parsed.paper = value()?,
            "--scale" => parsed.scale = value()?,
            "--seed" => parsed.seed = Some(value()?.parse().context("Invalid seed")?),
            "--config" => parsed.config_path = Some(value()?.into()),
            "--decimated" => parsed.decimated_path = Some(value()?.into()),
            "--output" => parsed.output_path = Some(value()?.into()),
            other => bail!("Unknown option: {}", other),
        }
        i += 2;
    }

    Ok(Some(parsed))
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = match &args.config_path {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Cannot read config '{}'", path.display()))?;
            PipelineConfig::from_json_str(&json)?
        }
        None => PipelineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.walls.seed = Some(seed);
    }

    let bytes = fs::read(&args.scan_path)
        .with_context(|| format!("Cannot read scan '{}'", args.scan_path.display()))?;
    tracing::info!(path = %args.scan_path.display(), bytes = bytes.len(), "Loading scan");

    let analysis = analyze_scan(&bytes, &config)?;

    for floor in &analysis.floors {
        eprintln!(
            "  [{}] {:<14} z = {:>7.3} m  points = {:>8}  confidence = {:>3}",
            floor.sort_order, floor.label, floor.z_height_m, floor.point_count, floor.confidence
        );
    }

    if let Some(path) = &args.decimated_path {
        fs::write(path, analysis.display_bytes())
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::info!(path = %path.display(), points = analysis.display.count, "Decimated cloud written");
    }

    let Some(floor) = analysis.floors.get(args.floor) else {
        bail!(
            "Floor {} not found ({} floors detected)",
            args.floor,
            analysis.floors.len()
        );
    };

    let walls = detect_floor_walls(&analysis, floor, &config);

    let options = ExportOptions {
        paper_size: args.paper,
        scale: args.scale,
        floor_label: Some(floor.label.clone()),
        ..Default::default()
    };
    let layout = plan_layout(&walls, &options);
    let json = serde_json::to_string_pretty(&layout)?;

    match &args.output_path {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
            tracing::info!(path = %path.display(), walls = layout.walls.len(), "Plan layout written");
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let Some(args) = parse_args()? else {
        print_usage();
        return Ok(());
    };

    run(args)
}
