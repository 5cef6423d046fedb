use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::warn;

use skd_core::{
    build, dump, BuildConfig, BuildLog, ClassTable, DictFile, KeyDisplay, UNRESOLVED_ADDRESS,
};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "skdconv",
    about = "Convert SKK dictionaries into indexed SKD binaries, and inspect or verify them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an SKD binary from a Shift_JIS SKK dictionary
    Build {
        /// Source SKK dictionary (Shift_JIS)
        input: PathBuf,
        /// Destination SKD file
        output: PathBuf,
        /// Maximum number of entries one index key may stand for
        #[arg(long)]
        cap: usize,
        /// Maximum index key length in characters
        #[arg(long)]
        max_char_len: usize,
        /// ASCII comment stored in the header
        #[arg(long, default_value = "")]
        comment: String,
        /// Write the table-ordered entries as JSON
        #[arg(long)]
        dump_entries: Option<PathBuf>,
        /// Write the resolved (prefix, address) pairs as JSON
        #[arg(long)]
        dump_index: Option<PathBuf>,
        /// Write per-key builder counts as JSON
        #[arg(long)]
        dump_stats: Option<PathBuf>,
        /// Fail when any index key could not be resolved
        #[arg(long)]
        strict: bool,
    },
    /// Print header fields, region sizes, and index records
    Inspect {
        /// SKD file to inspect
        file: PathBuf,
        /// Print every index record
        #[arg(long)]
        index: bool,
        /// Print the first N table entries
        #[arg(long, default_value_t = 0)]
        entries: usize,
    },
    /// Check an SKD file for structural consistency
    Verify {
        /// SKD file to verify
        file: PathBuf,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn create_dump(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating dump file {:?}", path))?;
    Ok(BufWriter::new(file))
}

// ── Subcommand implementations ─────────────────────────────────────────────

struct BuildArgs {
    input: PathBuf,
    output: PathBuf,
    config: BuildConfig,
    dump_entries: Option<PathBuf>,
    dump_index: Option<PathBuf>,
    dump_stats: Option<PathBuf>,
    strict: bool,
}

fn run_build(args: BuildArgs) -> anyhow::Result<()> {
    let t0 = Instant::now();

    let source = skd_source::load_file(&args.input)?;
    let source_entries = source.entries.len();
    let skipped = source.skipped_total();

    let mut log = BuildLog::new();
    let out = build(source.entries, &ClassTable::hiragana(), &args.config, &mut log)
        .with_context(|| format!("building dictionary from {:?}", args.input))?;

    if let Some(path) = &args.dump_stats {
        dump::write_index_stats(create_dump(path)?, &args.config, &out.index)
            .with_context(|| format!("writing index stats to {:?}", path))?;
    }
    if let Some(path) = &args.dump_entries {
        dump::write_entries(create_dump(path)?, &out.entries)
            .with_context(|| format!("writing entry dump to {:?}", path))?;
    }
    if let Some(path) = &args.dump_index {
        dump::write_index(create_dump(path)?, &out.report.resolved)
            .with_context(|| format!("writing index dump to {:?}", path))?;
    }

    let misses = out.report.misses.len();
    if args.strict && misses > 0 {
        anyhow::bail!(
            "{} index key(s) could not be resolved; not writing {:?}",
            misses,
            args.output
        );
    }
    out.buffer
        .save(&args.output)
        .with_context(|| format!("writing output file {:?}", args.output))?;

    let elapsed = t0.elapsed();
    eprintln!("  source entries : {}", source_entries);
    eprintln!("  skipped lines  : {}", skipped);
    eprintln!("  unclassified   : {}", log.unclassified());
    eprintln!("  table entries  : {}", out.entries.len());
    eprintln!("  index keys     : {}", out.index.len());
    eprintln!("  unresolved     : {}", misses);
    eprintln!("  output size    : {}", human_bytes(out.buffer.len() as u64));
    eprintln!("  elapsed        : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, show_index: bool, show_entries: usize) -> anyhow::Result<()> {
    let dict = DictFile::open(&file)?;
    let view = dict
        .view()
        .with_context(|| format!("parsing {:?}", file))?;
    let header = view.header();
    let records = view.index_records()?;

    println!("=== SKD File: {:?} ===", file);
    println!();
    println!("  total length   : {} ({})", header.total_len, human_bytes(header.total_len as u64));
    println!("  comment        : {}", String::from_utf8_lossy(&header.comment));
    println!("  max key length : {} bytes", header.max_key_len);
    println!("  index region   : {} bytes, {} records", view.index_body().len(), records.len());
    println!("  table region   : {} bytes", view.table_body().len());

    if show_index {
        println!();
        println!("  {:>6}  {:>10}  prefix", "record", "address");
        println!("  {}", "-".repeat(40));
        for (i, record) in records.iter().enumerate() {
            let address = if record.address == UNRESOLVED_ADDRESS {
                "unresolved".to_string()
            } else {
                format!("0x{:06x}", record.address)
            };
            println!("  {:>6}  {:>10}  {}", i, address, KeyDisplay(record.prefix));
        }
    }

    if show_entries > 0 {
        println!();
        for entry in view.table_entries().take(show_entries) {
            let entry = entry?;
            let candidates: Vec<String> = entry
                .candidates
                .iter()
                .map(|c| KeyDisplay(c).to_string())
                .collect();
            println!(
                "  0x{:06x}  {}  /{}/",
                entry.offset,
                KeyDisplay(entry.key),
                candidates.join("/")
            );
        }
    }

    Ok(())
}

fn run_verify(file: PathBuf) -> anyhow::Result<()> {
    let dict = DictFile::open(&file)?;
    let report = dict
        .view()
        .and_then(|view| view.verify())
        .with_context(|| format!("verifying {:?}", file))?;

    if report.unresolved > 0 {
        warn!(unresolved = report.unresolved, "file has unresolved index keys");
    }
    println!("  total length   : {}", report.total_len);
    println!("  index records  : {}", report.index_records);
    println!("  unresolved     : {}", report.unresolved);
    println!("  table entries  : {}", report.table_entries);
    println!("OK");
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build {
            input,
            output,
            cap,
            max_char_len,
            comment,
            dump_entries,
            dump_index,
            dump_stats,
            strict,
        } => run_build(BuildArgs {
            input,
            output,
            config: BuildConfig::new(cap, max_char_len).with_comment(comment),
            dump_entries,
            dump_index,
            dump_stats,
            strict,
        }),
        Commands::Inspect {
            file,
            index,
            entries,
        } => run_inspect(file, index, entries),
        Commands::Verify { file } => run_verify(file),
    }
}
