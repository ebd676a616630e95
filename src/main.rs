use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use edit_align::config::{load_from_path, ChangeSetConfig};
use edit_align::{
    apply_and_register, apply_changes, AlignmentRegistry, ChangeReport, Chunk, DocumentId,
};
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "edit-align")]
#[command(
    about = "Apply change sets to text and map offsets between versions",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Log decisions at debug level (EDIT_ALIGN_LOG / RUST_LOG take precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a change set to a text file
    Apply {
        /// Source text file
        #[arg(short, long)]
        input: PathBuf,

        /// Change set (TOML)
        #[arg(short, long)]
        changes: PathBuf,

        /// Write the transformed text here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,

        /// Print a JSON report (text, chunks, applied/discarded/rejected changes)
        #[arg(long)]
        json: bool,
    },

    /// Translate a span between the source and transformed text
    Map {
        /// Source text file
        #[arg(short, long)]
        input: PathBuf,

        /// Change set (TOML)
        #[arg(short, long)]
        changes: PathBuf,

        /// Span start (byte offset)
        #[arg(long)]
        begin: usize,

        /// Span end (byte offset, exclusive)
        #[arg(long)]
        end: usize,

        /// Direction of the translation
        #[arg(long, value_enum, default_value_t = Direction::Original)]
        to: Direction,
    },

    /// Apply `<name>.changes.toml` to every `<name>.txt` in a directory
    Batch {
        /// Directory holding documents and change sets
        #[arg(short, long)]
        dir: PathBuf,

        /// Worker threads (defaults to available parallelism)
        #[arg(short, long)]
        jobs: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Direction {
    /// From transformed text offsets to source text offsets
    Original,
    /// From source text offsets to transformed text offsets
    Current,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Apply {
            input,
            changes,
            output,
            diff,
            json,
        } => cmd_apply(&input, &changes, output.as_deref(), diff, json),

        Commands::Map {
            input,
            changes,
            begin,
            end,
            to,
        } => cmd_map(&input, &changes, begin, end, to),

        Commands::Batch { dir, jobs } => cmd_batch(&dir, jobs),
    }
}

/// Install the stderr subscriber.
///
/// Filter priority: `EDIT_ALIGN_LOG`, then `RUST_LOG`, then `warn`
/// (`debug` with `--verbose`).
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = env::var("EDIT_ALIGN_LOG")
        .or_else(|_| env::var("RUST_LOG"))
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .unwrap_or_else(|| EnvFilter::new(default));

    // Ignore the error if a subscriber is already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Helper: Read a document and its change set, verifying the source hash.
fn load_document(input: &Path, changes: &Path) -> Result<(String, ChangeSetConfig)> {
    let text = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let config = load_from_path(changes)?;
    config
        .meta
        .verify_source(&text)
        .with_context(|| format!("{} does not match {}", input.display(), changes.display()))?;
    Ok((text, config))
}

#[derive(Serialize)]
struct ApplyReport<'a> {
    document: DocumentId,
    text: &'a str,
    chunks: &'a [Chunk],
    #[serde(flatten)]
    report: &'a ChangeReport,
}

fn cmd_apply(
    input: &Path,
    changes: &Path,
    output: Option<&Path>,
    show_diff: bool,
    json: bool,
) -> Result<()> {
    let (text, config) = load_document(input, changes)?;
    let transformation = apply_changes(&text, &config.sorted_operations())?;
    let transformed = transformation.text();

    if json {
        let report = ApplyReport {
            document: config.meta.document_id_for(input, &text),
            text: &transformed,
            chunks: transformation.aligned.chunks(),
            report: &transformation.report,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(input, &transformation.report);
    }

    if show_diff {
        display_diff(input, &text, &transformed);
    }

    match output {
        Some(path) => {
            atomic_write(path, transformed.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("{} wrote {}", "✓".green(), path.display());
        }
        None if !json && !show_diff => print!("{transformed}"),
        None => {}
    }

    Ok(())
}

fn cmd_map(input: &Path, changes: &Path, begin: usize, end: usize, to: Direction) -> Result<()> {
    let (text, config) = load_document(input, changes)?;
    let transformation = apply_changes(&text, &config.sorted_operations())?;
    let aligned = &transformation.aligned;
    let current = aligned.get();

    let (mapped, from, target) = match to {
        Direction::Original => (
            aligned.resolve_to_original(begin..end)?,
            current.as_str(),
            aligned.original(),
        ),
        Direction::Current => (
            aligned.resolve_to_current(begin..end)?,
            aligned.original(),
            current.as_str(),
        ),
    };

    println!(
        "[{}, {}) -> [{}, {})",
        begin, end, mapped.start, mapped.end
    );
    println!(
        "  {:?} -> {:?}",
        from.get(begin..end).unwrap_or_default(),
        target.get(mapped).unwrap_or_default()
    );
    Ok(())
}

/// One document found by [`discover_documents`].
struct BatchItem {
    input: PathBuf,
    changes: PathBuf,
    output: PathBuf,
}

/// Helper: Find `<name>.txt` files with a sibling `<name>.changes.toml`.
fn discover_documents(dir: &Path) -> Result<Vec<BatchItem>> {
    let mut items = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(stem) = name.strip_suffix(".txt") else {
            continue;
        };
        if stem.ends_with(".out") {
            continue;
        }
        let changes = path.with_file_name(format!("{stem}.changes.toml"));
        if changes.is_file() {
            items.push(BatchItem {
                input: path.to_path_buf(),
                output: path.with_file_name(format!("{stem}.out.txt")),
                changes,
            });
        }
    }
    items.sort_by(|a, b| a.input.cmp(&b.input));
    Ok(items)
}

fn process_document(item: &BatchItem, registry: &AlignmentRegistry) -> Result<ChangeReport> {
    let (text, config) = load_document(&item.input, &item.changes)?;
    let key = config.alignment_key_for(&item.input, &text);
    let (aligned, report) =
        apply_and_register(registry, key, &text, &config.sorted_operations())?;
    atomic_write(&item.output, aligned.get().as_bytes())
        .with_context(|| format!("failed to write {}", item.output.display()))?;
    Ok(report)
}

fn cmd_batch(dir: &Path, jobs: Option<usize>) -> Result<()> {
    let items = discover_documents(dir)?;
    if items.is_empty() {
        anyhow::bail!(
            "No <name>.txt files with a matching <name>.changes.toml found in {}",
            dir.display()
        );
    }

    let jobs = jobs
        .or_else(|| thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1)
        .clamp(1, items.len());
    let per_worker = items.len().div_ceil(jobs);
    let registry = AlignmentRegistry::new();

    let results: Vec<BatchResult> = thread::scope(|scope| {
        let workers: Vec<_> = items
            .chunks(per_worker)
            .map(|batch| {
                let registry = registry.clone();
                let handle = scope.spawn(move || {
                    batch
                        .iter()
                        .map(|item| (item, process_document(item, &registry)))
                        .collect::<Vec<_>>()
                });
                (batch, handle)
            })
            .collect();

        workers
            .into_iter()
            .flat_map(|(batch, handle)| worker_results(batch, handle.join()))
            .collect()
    });

    let mut failed = 0;
    for (item, result) in &results {
        match result {
            Ok(report) => {
                println!(
                    "{} {}: {} applied, {} discarded, {} rejected",
                    "✓".green(),
                    item.input.display(),
                    report.applied.len(),
                    report.discarded.len(),
                    report.rejected.len()
                );
            }
            Err(e) => {
                eprintln!("{} {}: {:#}", "✗".red(), item.input.display(), e);
                failed += 1;
            }
        }
    }

    println!();
    println!("{}", "Summary:".bold());
    println!(
        "  {} processed",
        format!("{}", items.len() - failed).green()
    );
    println!("  {} failed", format!("{}", failed).red());
    println!("  {} alignments registered", registry.len());

    if failed > 0 {
        anyhow::bail!("{failed} document(s) failed");
    }
    Ok(())
}

type BatchResult<'a> = (&'a BatchItem, Result<ChangeReport>);

/// Results of one joined worker. A panicked worker fails every document it owned.
fn worker_results<'a>(
    batch: &'a [BatchItem],
    joined: thread::Result<Vec<BatchResult<'a>>>,
) -> Vec<BatchResult<'a>> {
    match joined {
        Ok(results) => results,
        Err(_) => {
            tracing::error!(documents = batch.len(), "batch worker panicked");
            batch
                .iter()
                .map(|item| {
                    let error = anyhow::anyhow!("worker panicked before finishing");
                    (item, Err(error))
                })
                .collect()
        }
    }
}

fn print_summary(input: &Path, report: &ChangeReport) {
    eprintln!(
        "{} {}: {} applied, {} discarded, {} rejected",
        "✓".green(),
        input.display(),
        report.applied.len(),
        report.discarded.len(),
        report.rejected.len()
    );
    for rejected in &report.rejected {
        eprintln!("  {} {}", "⚠".yellow(), rejected);
    }
}

/// Helper: Show the edits as one inline character diff, deletions struck
/// through in red and insertions underlined in green.
fn display_diff(file: &Path, original: &str, transformed: &str) {
    let diff = TextDiff::from_chars(original, transformed);
    let (mut inserted, mut removed) = (0, 0);
    let mut run = String::new();
    let mut tag = ChangeTag::Equal;

    println!("{} {}", "edits in".bold(), file.display());
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => inserted += change.value().len(),
            ChangeTag::Delete => removed += change.value().len(),
            ChangeTag::Equal => {}
        }
        if change.tag() != tag {
            print!("{}", paint(tag, &run));
            run.clear();
            tag = change.tag();
        }
        run.push_str(change.value());
    }
    println!("{}", paint(tag, &run));
    println!("  {inserted} bytes inserted, {removed} bytes removed");
}

fn paint(tag: ChangeTag, text: &str) -> colored::ColoredString {
    match tag {
        ChangeTag::Delete => text.red().strikethrough(),
        ChangeTag::Insert => text.green().underline(),
        ChangeTag::Equal => text.normal(),
    }
}

/// Atomic file write: tempfile + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
