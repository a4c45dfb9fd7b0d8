use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use pzip_core::{
    BufferSizing, EncodeRunStats, EncoderConfig, FileEncodeStats, FileEncoder, WriteOrder,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pzip",
    version,
    about = "Parallel run-length encoder",
    long_about = "Encode files into flat run-length records using one thread per chunk."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode each file into <file><suffix>.
    Encode {
        /// Files to encode, processed in the order given.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Maximum number of chunk threads per file (defaults to CPU count).
        #[arg(long, default_value_t = num_cpus::get())]
        workers: usize,

        /// Suffix appended to each input path to name its output.
        #[arg(long, default_value = pzip_core::pipeline::DEFAULT_OUTPUT_SUFFIX)]
        suffix: String,

        /// Order in which chunk payloads are written.
        #[arg(long, value_enum, default_value_t = OrderArg::Index)]
        order: OrderArg,

        /// How chunk record buffers are sized.
        #[arg(long, value_enum, default_value_t = SizingArg::WorstCase)]
        buffer_sizing: SizingArg,

        /// Suppress the per-file summary.
        #[arg(short, long, default_value_t = false)]
        quiet: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OrderArg {
    Index,
    Completion,
}

impl From<OrderArg> for WriteOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Index => WriteOrder::ChunkIndex,
            OrderArg::Completion => WriteOrder::Completion,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SizingArg {
    WorstCase,
    Incremental,
}

impl From<SizingArg> for BufferSizing {
    fn from(value: SizingArg) -> Self {
        match value {
            SizingArg::WorstCase => BufferSizing::WorstCase,
            SizingArg::Incremental => BufferSizing::Incremental,
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Encode {
            files,
            workers,
            suffix,
            order,
            buffer_sizing,
            quiet,
        } => {
            let config = EncoderConfig::new(workers)
                .with_output_suffix(suffix)
                .with_write_order(order.into())
                .with_buffer_sizing(buffer_sizing.into());
            let encoder = FileEncoder::new(config);
            tracing::debug!(workers = encoder.workers(), files = files.len(), "starting run");

            let stats = encoder
                .encode_files_with_progress(&files, |file| {
                    if !quiet {
                        print_file_summary(file);
                    }
                })?;

            if !quiet && stats.files.len() > 1 {
                print_run_summary(&stats);
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize logging: {error}"))
}

fn print_file_summary(stats: &FileEncodeStats) {
    let elapsed_secs = stats.elapsed.as_secs_f64().max(1e-6);
    let read_bps = stats.input_bytes as f64 / elapsed_secs;
    let input = stats
        .input_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "-".to_string());
    let output = stats
        .output_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "-".to_string());

    println!("encode complete");
    println!("  source: {input}");
    println!("  output: {output}");
    println!("  write order: {:?}", stats.write_order);
    println!("  elapsed: {}", format_duration(stats.elapsed));
    println!("  input bytes: {}", format_bytes(stats.input_bytes));
    println!("  output bytes: {}", format_bytes(stats.output_bytes));
    println!("  expansion ratio: {:.3}x", stats.output_ratio());
    println!("  throughput avg: {}/s", format_rate(read_bps));
    println!(
        "  records: {} (mean run {:.2} bytes)",
        stats.records,
        stats.mean_run_length()
    );
    println!(
        "  chunks: {} | lock wait {}",
        stats.chunks,
        format_duration(stats.lock_wait)
    );
    if stats.tasks.is_empty() {
        return;
    }

    println!("  chunk runtime:");
    for task in &stats.tasks {
        println!(
            "    chunk {:>3}: {} at +{} busy {}{}",
            task.index,
            format_bytes(task.range.len() as u64),
            format_duration(task.started),
            format_duration(task.busy),
            if task.succeeded { "" } else { " (failed)" },
        );
    }
}

fn print_run_summary(stats: &EncodeRunStats) {
    let elapsed_secs = stats.elapsed.as_secs_f64().max(1e-6);
    let read_bps = stats.input_bytes_total() as f64 / elapsed_secs;

    println!("run complete");
    println!("  files: {}", stats.files.len());
    println!("  workers: {}", stats.workers);
    println!("  elapsed: {}", format_duration(stats.elapsed));
    println!("  input bytes: {}", format_bytes(stats.input_bytes_total()));
    println!("  output bytes: {}", format_bytes(stats.output_bytes_total()));
    println!("  throughput avg: {}/s", format_rate(read_bps));
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0usize;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

fn format_rate(bytes_per_second: f64) -> String {
    if !bytes_per_second.is_finite() || bytes_per_second <= 0.0 {
        return "0 B".to_string();
    }
    format_bytes(bytes_per_second as u64)
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 {
        format!("{minutes:02}:{seconds:02}")
    } else if total_seconds > 0 {
        format!("{seconds}.{:03}s", duration.subsec_millis())
    } else {
        format!("{:.3}ms", duration.as_secs_f64() * 1000.0)
    }
}
