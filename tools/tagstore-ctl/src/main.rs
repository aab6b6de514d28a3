// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! tagstore - import, inspect and analyse industrial tag logs.
//!
//! # Usage
//!
//! ```bash
//! # Import WinCC exports into project 607
//! tagstore --root data import 607 export_1.csv export_2.csv
//!
//! # Inspect
//! tagstore projects
//! tagstore tags 607
//! tagstore series 607 PT270_Value --start 2024-01-01T00:00:00 --end 2024-01-02T00:00:00
//!
//! # Metrics
//! tagstore trend 607 PT270_Value
//! tagstore leak 607 --state-tag Compressor_State --pressure-tag PT270_Value --volume 2.0
//! tagstore analyze 607 plan.json
//! ```
//!
//! Metric results are printed as JSON on stdout; logs go to stderr.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tagstore::{export, parser, query, Dataset, ImportSettings, SeriesStore, StoreConfig, TimeWindow};
use tagstore_analytics::{
    duty_cycle_count, evaluate_all, leak_rate_estimate, psa_swing_estimate, recovery_rate_estimate,
    run_time_fraction, trendline_in, DutyCycleConfig, FlowBasis, LeakConfig, MetricRequest,
    PressureUnit, RecoveryConfig, SourceSpec, SwingConfig,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tagstore")]
#[command(author = "naskel.com", version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Incremental storage and process-health analytics for tag logs")]
struct Args {
    /// Store directory (datasets and index.json)
    #[arg(short, long, global = true, default_value = "data")]
    root: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import raw log exports into a project
    Import {
        project: u32,

        /// Raw export files, merged in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Dataset name (defaults to the derived project name)
        #[arg(long)]
        name: Option<String>,

        /// Import settings JSON; created or updated when --time-format is given
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Field delimiter
        #[arg(long)]
        delimiter: Option<char>,

        /// Decimal separator
        #[arg(long)]
        decimal: Option<char>,

        /// chrono time format of the time column
        #[arg(long)]
        time_format: Option<String>,
    },

    /// List tags of a project
    Tags { project: u32 },

    /// Print one tag's series as CSV
    Series {
        project: u32,
        tag: String,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Export a project (or one tag) as normalised CSV
    Export {
        project: u32,

        /// Only this tag
        #[arg(long)]
        tag: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List index entries
    Projects,

    /// Bind a project number to a dataset name
    Register {
        project: u32,
        name: String,

        /// Replace existing entries for the project
        #[arg(long)]
        overwrite: bool,
    },

    /// Remove a project from the index (data files are kept)
    Remove { project: u32 },

    /// Drop stale duplicate index entries
    DedupIndex,

    /// Trendline of one tag
    Trend {
        project: u32,
        tag: String,
        #[command(flatten)]
        window: WindowArgs,
    },

    /// Midline crossings of a bounded tag
    Duty {
        project: u32,
        tag: String,

        /// Quantisation step of the tag
        #[arg(long, default_value_t = 0.1)]
        resolution: f64,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Fraction of time a state tag is on
    Runtime {
        project: u32,
        state_tag: String,

        #[arg(long, default_value_t = 1.0)]
        on_value: f64,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// PSA pressure cycle length in samples
    Swing {
        project: u32,
        pressure_tag: String,

        /// Longest spacing accepted as one cycle, seconds
        #[arg(long, default_value_t = 600.0)]
        max_period: f64,

        /// Minimum separation of maxima, samples
        #[arg(long, default_value_t = 2)]
        min_distance: usize,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Leak rate from off-state pressure decay
    Leak {
        project: u32,

        #[arg(long)]
        state_tag: String,

        #[arg(long, default_value_t = 0.0)]
        off_value: f64,

        #[arg(long)]
        pressure_tag: String,

        /// Storage volume (rate unit per hour)
        #[arg(long)]
        volume: f64,

        /// bar, mbar, kpa or psi
        #[arg(long, default_value = "bar", value_parser = parse_serde::<PressureUnit>)]
        unit: PressureUnit,

        /// Peak separation in cycle lengths
        #[arg(long, default_value_t = 10.0)]
        gating: f64,

        /// Cycle length in samples (estimated from the pressure tag when omitted)
        #[arg(long)]
        cycle_length: Option<usize>,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Recovery rate by mass balance
    Recovery {
        project: u32,

        /// Flow tag; repeat to sum several meters
        #[arg(long = "flow", required = true)]
        flow: Vec<String>,

        /// per_second, per_minute or per_hour
        #[arg(long, default_value = "per_hour", value_parser = parse_serde::<FlowBasis>)]
        flow_basis: FlowBasis,

        #[arg(long)]
        pressure_tag: String,

        #[arg(long)]
        state_tag: String,

        #[arg(long, default_value_t = 1.0)]
        on_value: f64,

        #[arg(long)]
        volume: f64,

        #[arg(long, default_value = "bar", value_parser = parse_serde::<PressureUnit>)]
        unit: PressureUnit,

        /// Leak rate, volume per hour
        #[arg(long, default_value_t = 0.0)]
        leak_rate: f64,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Evaluate a JSON metric plan
    Analyze { project: u32, plan: PathBuf },
}

/// Inclusive time window; either bound may be omitted.
#[derive(ClapArgs, Debug, Clone, Copy, Default)]
struct WindowArgs {
    /// Window start (2024-01-01T00:00:00)
    #[arg(long, value_parser = parse_time)]
    start: Option<NaiveDateTime>,

    /// Window end, inclusive
    #[arg(long, value_parser = parse_time)]
    end: Option<NaiveDateTime>,
}

impl From<WindowArgs> for TimeWindow {
    fn from(args: WindowArgs) -> Self {
        TimeWindow {
            start: args.start,
            end: args.end,
        }
    }
}

const TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d",
];

fn parse_time(s: &str) -> Result<NaiveDateTime, String> {
    TIME_FORMATS
        .iter()
        .find_map(|format| parser::parse_timestamp(s, format))
        .ok_or_else(|| format!("unrecognised time {s:?}, expected e.g. 2024-01-01T00:00:00"))
}

/// Parse a CLI value through the type's serde names.
fn parse_serde<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string())).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(args, &mut out)
}

fn run<W: Write>(args: Args, out: &mut W) -> Result<()> {
    let config = StoreConfig::builder().root(&args.root).build();
    let mut store = SeriesStore::open_dir(config)
        .with_context(|| format!("Failed to open store at {}", args.root.display()))?;

    match args.command {
        Commands::Import {
            project,
            files,
            name,
            settings,
            delimiter,
            decimal,
            time_format,
        } => {
            let settings = import_settings(settings.as_deref(), delimiter, decimal, time_format)?;
            let mut dataset = match name {
                Some(name) => store.open_named(project, &name)?,
                None => store.open(project)?,
            };
            for file in &files {
                let raw = std::fs::read_to_string(file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let (samples, report) = tagstore::parse_with_report(&raw, &settings)
                    .with_context(|| format!("Failed to parse {}", file.display()))?;
                dataset = store.merge(&dataset, &samples)?;
                info!(
                    file = %file.display(),
                    accepted = report.accepted,
                    dropped = report.dropped(),
                    "imported"
                );
            }
            writeln!(
                out,
                "project {} ({}): {} samples, {} tags",
                dataset.project(),
                dataset.name(),
                dataset.len(),
                dataset.tags().len()
            )?;
        }
        Commands::Tags { project } => {
            for tag in load(&store, project)?.tags() {
                writeln!(out, "{tag}")?;
            }
        }
        Commands::Series {
            project,
            tag,
            window,
        } => {
            let dataset = load(&store, project)?;
            let points = query::windowed(&dataset, &tag, &window.into());
            export::write_series(out, &tag, &points)?;
        }
        Commands::Export {
            project,
            tag,
            output,
        } => {
            let dataset = load(&store, project)?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    write_export(&mut BufWriter::new(file), &dataset, tag.as_deref())?;
                    info!(path = %path.display(), "exported");
                }
                None => write_export(out, &dataset, tag.as_deref())?,
            }
        }
        Commands::Projects => {
            for (project, names) in store.index().duplicates() {
                warn!(project, ?names, "duplicate index entries, run dedup-index");
            }
            for entry in store.projects() {
                writeln!(out, "{}\t{}", entry.project, entry.name)?;
            }
        }
        Commands::Register {
            project,
            name,
            overwrite,
        } => {
            if overwrite {
                store.register_overwrite(project, &name)?;
            } else {
                store.open_named(project, &name)?;
            }
            writeln!(out, "{project}\t{name}")?;
        }
        Commands::Remove { project } => {
            for entry in store.remove_project(project)? {
                writeln!(out, "removed {}\t{}", entry.project, entry.name)?;
            }
        }
        Commands::DedupIndex => {
            let removed = store.deduplicate_index()?;
            for entry in &removed {
                writeln!(out, "removed {}\t{}", entry.project, entry.name)?;
            }
            writeln!(out, "{} duplicate(s) removed", removed.len())?;
        }
        Commands::Trend {
            project,
            tag,
            window,
        } => {
            let dataset = load(&store, project)?;
            print_json(out, &trendline_in(&dataset, &tag, &window.into())?)?;
        }
        Commands::Duty {
            project,
            tag,
            resolution,
            window,
        } => {
            let dataset = load(&store, project)?;
            let config = DutyCycleConfig::default()
                .resolution(resolution)
                .window(window.into());
            print_json(out, &duty_cycle_count(&dataset, &tag, &config)?)?;
        }
        Commands::Runtime {
            project,
            state_tag,
            on_value,
            window,
        } => {
            let dataset = load(&store, project)?;
            print_json(
                out,
                &run_time_fraction(&dataset, &state_tag, on_value, &window.into())?,
            )?;
        }
        Commands::Swing {
            project,
            pressure_tag,
            max_period,
            min_distance,
            window,
        } => {
            let dataset = load(&store, project)?;
            let config = SwingConfig {
                min_peak_distance: min_distance,
                ..SwingConfig::default()
            }
            .max_plausible_period_secs(max_period)
            .window(window.into());
            print_json(out, &psa_swing_estimate(&dataset, &pressure_tag, &config)?)?;
        }
        Commands::Leak {
            project,
            state_tag,
            off_value,
            pressure_tag,
            volume,
            unit,
            gating,
            cycle_length,
            window,
        } => {
            let dataset = load(&store, project)?;
            let window: TimeWindow = window.into();
            let hint = match cycle_length {
                Some(hint) => hint,
                None => {
                    let swing = SwingConfig::default().window(window);
                    let estimate = psa_swing_estimate(&dataset, &pressure_tag, &swing)
                        .context("Failed to estimate the cycle length, pass --cycle-length")?;
                    info!(cycle_length = estimate.cycle_length, "using estimated cycle length");
                    estimate.cycle_length
                }
            };
            let config = LeakConfig::new(state_tag, off_value, pressure_tag, volume)
                .pressure_unit(unit)
                .gating_multiplier(gating)
                .window(window);
            print_json(out, &leak_rate_estimate(&dataset, &config, hint)?)?;
        }
        Commands::Recovery {
            project,
            mut flow,
            flow_basis,
            pressure_tag,
            state_tag,
            on_value,
            volume,
            unit,
            leak_rate,
            window,
        } => {
            let dataset = load(&store, project)?;
            let flow = if flow.len() == 1 {
                SourceSpec::Single(flow.remove(0))
            } else {
                SourceSpec::Summed(flow)
            };
            let config = RecoveryConfig::new(flow, pressure_tag, state_tag, on_value, volume)
                .flow_basis(flow_basis)
                .pressure_unit(unit)
                .window(window.into());
            print_json(out, &recovery_rate_estimate(&dataset, &config, leak_rate)?)?;
        }
        Commands::Analyze { project, plan } => {
            let dataset = load(&store, project)?;
            let text = std::fs::read_to_string(&plan)
                .with_context(|| format!("Failed to read plan {}", plan.display()))?;
            let requests: Vec<MetricRequest> = serde_json::from_str(&text)
                .with_context(|| format!("Invalid metric plan {}", plan.display()))?;

            let results: Vec<serde_json::Value> = evaluate_all(&dataset, &requests)
                .into_iter()
                .zip(&requests)
                .map(|(result, request)| match result {
                    Ok(metric) => serde_json::json!({ "ok": metric }),
                    Err(e) => serde_json::json!({ "metric": request.name(), "error": e.to_string() }),
                })
                .collect();
            print_json(out, &results)?;
        }
    }
    Ok(())
}

fn import_settings(
    path: Option<&Path>,
    delimiter: Option<char>,
    decimal: Option<char>,
    time_format: Option<String>,
) -> Result<ImportSettings> {
    let mut settings = match path {
        Some(path) if path.exists() => ImportSettings::load(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?,
        _ => ImportSettings::default(),
    };
    if let Some(delimiter) = delimiter {
        settings.delimiter = delimiter;
    }
    if let Some(decimal) = decimal {
        settings.decimal = decimal;
    }
    if let Some(format) = time_format {
        settings.remember_format(format);
        if let Some(path) = path {
            settings
                .save(path)
                .with_context(|| format!("Failed to save settings {}", path.display()))?;
        }
    }
    Ok(settings)
}

fn load<B: tagstore::DatasetBackend>(store: &SeriesStore<B>, project: u32) -> Result<Dataset> {
    store
        .load(project)
        .with_context(|| format!("Failed to load project {project}"))
}

fn write_export<W: Write>(out: &mut W, dataset: &Dataset, tag: Option<&str>) -> Result<()> {
    match tag {
        Some(tag) => export::write_series(out, tag, &query::series_for(dataset, tag))?,
        None => export::write_dataset(out, dataset)?,
    }
    Ok(())
}

fn print_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
