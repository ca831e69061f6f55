//! CLI application for sprite sheet face calibration.
//!
//! Usage:
//!   sprite-faces sheets.json                   # Annotate in place
//!   sprite-faces sheets.json -o out.json       # Write to another file
//!   sprite-faces sheets.json --jobs 5 --json   # Parallel, JSON summary

use clap::Parser;
use serde::Serialize;
use sprite_faces::{
    annotate_sheets, load_sheets, save_sheets, AnalyzerConfig, BatchOptions, SheetAnalyzerBuilder,
    SheetDescriptor, SheetOutcome,
};
use std::path::PathBuf;

/// Exit status for every failure, including missing arguments.
const FAILURE: i32 = -1;

#[derive(Parser, Debug)]
#[command(name = "sprite-faces")]
#[command(author, version, about = "Infer face grid geometry of sprite sheets", long_about = None)]
struct Args {
    /// Sheet data file: a JSON array of objects with a `path` field
    #[arg(required = true)]
    data: PathBuf,

    /// Output file (default: rewrite the data file in place)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Analyzer configuration (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum face tile size
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Black rows added above each sheet before analysis
    #[arg(long)]
    padding: Option<u32>,

    /// Number of sheets analyzed in parallel
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Resolve relative image paths against this directory
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Re-analyze sheets that were calibrated by hand (certainty >= 100)
    #[arg(long)]
    recalibrate_manual: bool,

    /// Pretty-print the rewritten data file
    #[arg(long)]
    pretty: bool,

    /// Print the per-sheet results as JSON
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Per-sheet result for JSON output
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SheetSummary {
    path: String,
    skipped: bool,
    layout: Option<String>,
    face_dimension: Option<u32>,
    body_width: Option<u32>,
    body_height: Option<u32>,
    head_x: Option<i64>,
    head_y: Option<i64>,
    certainty: Option<f64>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() { FAILURE } else { 0 };
            e.print().ok();
            std::process::exit(code);
        }
    };

    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(FAILURE);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading analyzer configuration from {:?}...", path);
            AnalyzerConfig::load(path)?
        }
        None => AnalyzerConfig::default(),
    };
    if let Some(dim) = args.min_face_size {
        config.min_face_dimension = dim;
    }
    if let Some(rows) = args.padding {
        config.padding_top = rows;
    }
    let analyzer = SheetAnalyzerBuilder::new().config(config).build()?;

    log::info!("Loading sheet data {:?}...", args.data);
    let mut sheets = load_sheets(&args.data)?;
    log::info!("Working {} records.", sheets.len());

    let options = BatchOptions {
        jobs: args.jobs,
        base_dir: args.base_dir.clone(),
        recalibrate_manual: args.recalibrate_manual,
    };
    let outcomes = annotate_sheets(&analyzer, &mut sheets, &options)?;

    let target = args.output.as_ref().unwrap_or(&args.data);
    save_sheets(target, &sheets, args.pretty)?;
    log::info!("Finished {} sheet calibrations, written to {:?}", sheets.len(), target);

    let summaries: Vec<SheetSummary> = sheets
        .iter()
        .zip(&outcomes)
        .map(|(sheet, outcome)| summarize(sheet, outcome))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        print!("{}", format_human_readable(&summaries));
    }

    Ok(())
}

fn summarize(sheet: &SheetDescriptor, outcome: &SheetOutcome) -> SheetSummary {
    let path = sheet.path.display().to_string();
    match outcome {
        SheetOutcome::Annotated(g) => SheetSummary {
            path,
            skipped: false,
            layout: Some(g.layout.to_string()),
            face_dimension: g.face_dimension,
            body_width: Some(g.body_width),
            body_height: Some(g.body_height),
            head_x: g.reference_face_x,
            head_y: g.reference_face_y,
            certainty: Some(g.certainty),
        },
        SheetOutcome::SkippedManual => SheetSummary {
            path,
            skipped: true,
            layout: None,
            face_dimension: None,
            body_width: None,
            body_height: None,
            head_x: None,
            head_y: None,
            certainty: None,
        },
    }
}

fn format_human_readable(summaries: &[SheetSummary]) -> String {
    let mut s = String::new();

    s.push_str(&format!("Sheets: {}\n", summaries.len()));

    for sheet in summaries {
        if sheet.skipped {
            s.push_str(&format!("{}: skipped (manually calibrated)\n", sheet.path));
            continue;
        }
        let layout = sheet.layout.as_deref().unwrap_or("unknown");
        s.push_str(&format!(
            "{}: {} body {}x{}",
            sheet.path,
            layout,
            sheet.body_width.unwrap_or(0),
            sheet.body_height.unwrap_or(0)
        ));
        if let (Some(dim), Some(x), Some(y)) = (sheet.face_dimension, sheet.head_x, sheet.head_y) {
            s.push_str(&format!(", faces {}px, head at ({}, {})", dim, x, y));
        }
        s.push_str(&format!(", certainty {:.3}\n", sheet.certainty.unwrap_or(0.0)));
    }

    s
}
