use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use codec::ProtocolVariant;
use glob::Pattern;
use netchan::NetSource;
use tools::{decode_entities, format_entities_pretty, inspect_datagram, DatagramReport};
use tracing::{debug, Level};

#[derive(Parser)]
#[command(
    name = "deltachan-tools",
    version,
    about = "deltachan capture inspection and decoding tools"
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Inspect datagram headers.
    Inspect {
        /// Path to a captured datagram, or a directory of them.
        path: PathBuf,
        /// Protocol variant the capture was made with.
        #[arg(long, value_enum, default_value_t = Variant::Legacy)]
        variant: Variant,
        /// Which side sent the datagrams.
        #[arg(long, value_enum, default_value_t = Sender::Client)]
        sender: Sender,
        /// Optional glob filter when inspecting a directory.
        #[arg(long)]
        glob: Option<String>,
        /// Sort inspected datagrams.
        #[arg(long, value_enum)]
        sort: Option<InspectSort>,
        /// Limit the number of inspected datagrams (after sorting).
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Decode a packet-entities payload.
    Entities {
        /// Path to the payload bytes.
        payload_file: PathBuf,
        /// Protocol variant the payload was encoded with.
        #[arg(long, value_enum, default_value_t = Variant::Legacy)]
        variant: Variant,
        /// Output format.
        #[arg(long, value_enum, default_value_t = EntitiesFormat::Json)]
        format: EntitiesFormat,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Variant {
    Legacy,
    EnhancedV1,
    EnhancedV2,
    EnhancedV3,
    Extended,
    Modern,
}

impl From<Variant> for ProtocolVariant {
    fn from(variant: Variant) -> Self {
        match variant {
            Variant::Legacy => Self::Legacy,
            Variant::EnhancedV1 => Self::EnhancedV1,
            Variant::EnhancedV2 => Self::EnhancedV2,
            Variant::EnhancedV3 => Self::EnhancedV3,
            Variant::Extended => Self::Extended,
            Variant::Modern => Self::Modern,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Sender {
    Client,
    Server,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InspectSort {
    Size,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EntitiesFormat {
    Json,
    Pretty,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Command::Inspect {
            path,
            variant,
            sender,
            glob,
            sort,
            limit,
        } => {
            // The receiver of a client datagram is the server, and vice versa.
            let receiver = match sender {
                Sender::Client => NetSource::Server,
                Sender::Server => NetSource::Client,
            };
            let config = ProtocolVariant::from(variant)
                .capabilities()
                .channel_config(receiver);
            if path.is_dir() {
                let entries = collect_capture_entries(&path, glob.as_deref())?;
                let mut entries = maybe_sort_entries(entries, sort);
                let limit = limit.or(sort.map(|InspectSort::Size| 10));
                if let Some(limit) = limit {
                    entries.truncate(limit);
                }
                for entry in entries {
                    let bytes = fs::read(&entry.path)
                        .with_context(|| format!("read datagram {}", entry.path.display()))?;
                    let report = inspect_datagram(&bytes, &config)
                        .with_context(|| format!("inspect {}", entry.path.display()))?;
                    println!("== {} ({} bytes) ==", entry.path.display(), entry.size);
                    print_datagram_report(&report);
                }
            } else {
                let bytes = fs::read(&path)
                    .with_context(|| format!("read datagram {}", path.display()))?;
                let report = inspect_datagram(&bytes, &config).context("inspect datagram")?;
                print_datagram_report(&report);
            }
        }
        Command::Entities {
            payload_file,
            variant,
            format,
        } => {
            let bytes = fs::read(&payload_file)
                .with_context(|| format!("read payload {}", payload_file.display()))?;
            debug!(len = bytes.len(), ?variant, "decoding packet entities");
            let entities = decode_entities(&bytes, variant.into()).context("decode entities")?;
            match format {
                EntitiesFormat::Json => {
                    let json = serde_json::to_string_pretty(&entities).context("serialize json")?;
                    println!("{json}");
                }
                EntitiesFormat::Pretty => {
                    println!("{}", format_entities_pretty(&entities));
                }
            }
        }
    }
    Ok(())
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .finish(),
    )
    .context("install tracing subscriber")
}

struct CaptureEntry {
    path: PathBuf,
    size: u64,
}

fn collect_capture_entries(dir: &Path, glob: Option<&str>) -> Result<Vec<CaptureEntry>> {
    let mut entries = Vec::new();
    let pattern = match glob {
        Some(value) => Some(Pattern::new(value).context("invalid glob pattern")?),
        None => None,
    };

    for entry in fs::read_dir(dir).with_context(|| format!("read dir {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(pattern) = &pattern {
            let matches_path = pattern.matches_path(&path);
            let matches_name = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| pattern.matches(name));
            if !matches_path && !matches_name {
                continue;
            }
        }
        let size = entry.metadata()?.len();
        entries.push(CaptureEntry { path, size });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn maybe_sort_entries(
    mut entries: Vec<CaptureEntry>,
    sort: Option<InspectSort>,
) -> Vec<CaptureEntry> {
    match sort {
        Some(InspectSort::Size) => {
            entries.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path)));
        }
        None => {}
    }
    entries
}

fn print_datagram_report(report: &DatagramReport) {
    println!(
        "sequence: {} reliable: {} ack: {} ack_reliable: {}",
        report.sequence, report.reliable, report.ack, report.ack_reliable
    );
    if let Some(qport) = report.qport {
        println!("qport: {qport}");
    }
    if let Some(fragment) = report.fragment {
        println!(
            "fragment: offset {} of {} bytes{}",
            fragment.offset,
            fragment.total_len,
            if fragment.is_last { " (last)" } else { "" }
        );
    }
    println!("payload_len: {} bytes", report.payload_len);
}
