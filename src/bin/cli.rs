//! TsFile CLI
//!
//! Command-line interface for inspecting and recovering TsFiles:
//! - Self-check a file and report its truncation offset
//! - List devices and series
//! - Summarize file metadata

use anyhow::Context;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tsfile::{CheckResult, DeviceTimeIndex, TsFileConfig, TsFileReader};

#[derive(Parser)]
#[command(name = "tsfile")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and recover TsFile time-series files")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Config file path (default: <config dir>/tsfile/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Self-check a file and report completeness or the safe truncation offset
    Check {
        /// File to check
        file: PathBuf,
        /// Only answer complete/incomplete; skip structure re-derivation
        #[arg(long)]
        fast: bool,
    },

    /// List all devices in a file
    Devices {
        /// File to inspect
        file: PathBuf,
    },

    /// List every series in a file, grouped by device
    Series {
        /// File to inspect
        file: PathBuf,
    },

    /// Summarize file metadata
    Info {
        /// File to inspect
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct CheckReport {
    file: String,
    result: CheckResult,
    committed_chunk_groups: usize,
    total_chunks: u64,
    devices: Vec<String>,
    partition: Option<i64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tsfile=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => TsFileConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => TsFileConfig::load_or_default()?,
    };
    let json = cli.format == "json";

    match cli.command {
        Commands::Check { file, fast } => check(&file, fast, &config, json),
        Commands::Devices { file } => devices(&file, json),
        Commands::Series { file } => series(&file, json),
        Commands::Info { file } => info(&file, json),
    }
}

fn open(file: &Path) -> anyhow::Result<TsFileReader> {
    TsFileReader::open(file).with_context(|| format!("opening {}", file.display()))
}

fn check(file: &Path, fast: bool, config: &TsFileConfig, json: bool) -> anyhow::Result<()> {
    let mut reader = open(file)?;

    let mut schemas = HashMap::new();
    let mut chunk_groups = Vec::new();
    let mut versions = Vec::new();
    let result = reader.self_check(&mut schemas, &mut chunk_groups, &mut versions, fast)?;

    let time_index =
        DeviceTimeIndex::from_chunk_groups(&chunk_groups, config.partition_interval_ms);
    let mut devices: Vec<String> = chunk_groups.iter().map(|g| g.device_id.clone()).collect();
    devices.sort();
    devices.dedup();
    let partition = time_index
        .get_time_partition_with_check(&file.display().to_string())
        .ok();

    let report = CheckReport {
        file: file.display().to_string(),
        result,
        committed_chunk_groups: chunk_groups.len(),
        total_chunks: reader.total_chunk_num(),
        devices,
        partition,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match report.result {
        CheckResult::Complete => println!("{}: complete", report.file),
        CheckResult::TruncateAt(offset) => {
            println!(
                "{}: data is safe up to byte {} of {}",
                report.file,
                offset,
                reader.file_size()
            );
            println!(
                "  committed chunk groups: {} ({} chunks)",
                report.committed_chunk_groups, report.total_chunks
            );
            for device in &report.devices {
                println!("  device: {}", device);
            }
            if let Some(partition) = report.partition {
                println!("  time partition: {}", partition);
            }
        }
        CheckResult::FileNotFound => println!("{}: not found", report.file),
        CheckResult::Incompatible => println!("{}: not a TsFile of this version", report.file),
    }
    Ok(())
}

fn devices(file: &Path, json: bool) -> anyhow::Result<()> {
    let mut reader = open(file)?;
    let mut devices = reader.get_all_devices()?;
    devices.sort();

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else {
        for device in devices {
            println!("{}", device);
        }
    }
    Ok(())
}

fn series(file: &Path, json: bool) -> anyhow::Result<()> {
    let mut reader = open(file)?;
    let all = reader.get_all_timeseries_metadata()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    let mut devices: Vec<_> = all.keys().collect();
    devices.sort();
    for device in devices {
        println!("{}", device);
        for meta in &all[device] {
            println!(
                "  {} ({:?}): {} values, {} .. {}",
                meta.measurement_id,
                meta.data_type,
                meta.statistics.count,
                format_time(meta.statistics.start_time),
                format_time(meta.statistics.end_time),
            );
        }
    }
    Ok(())
}

fn info(file: &Path, json: bool) -> anyhow::Result<()> {
    let mut reader = open(file)?;
    let complete = reader.is_complete()?;
    let metadata = reader.read_file_metadata()?;
    let all = reader.get_all_timeseries_metadata()?;
    let series_count: usize = all.values().map(|v| v.len()).sum();

    #[derive(Serialize)]
    struct InfoReport {
        file: String,
        size: u64,
        complete: bool,
        devices: usize,
        series: usize,
        version_records: usize,
        meta_offset: u64,
    }

    let report = InfoReport {
        file: file.display().to_string(),
        size: reader.file_size(),
        complete,
        devices: all.len(),
        series: series_count,
        version_records: metadata.version_info.len(),
        meta_offset: metadata.meta_offset,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.file);
        println!("  size: {} bytes", report.size);
        println!("  complete: {}", report.complete);
        println!("  devices: {}", report.devices);
        println!("  series: {}", report.series);
        println!("  version records: {}", report.version_records);
        println!("  metadata section at: {}", report.meta_offset);
    }
    Ok(())
}

/// Millisecond timestamps rendered as RFC 3339, raw when out of range
fn format_time(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| millis.to_string())
}
