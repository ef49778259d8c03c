use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;

use textsieve::{
    cli::{Cli, Commands, ExtractArgs, OutputFormat, TitleArgs, WordArgs},
    error::{ExitCode, ExtractError, Result},
    extractor::{ExtractStats, Extractor, FileWords},
    word::is_ok_word,
};

/// JSON document printed by `extract --format json`.
#[derive(Serialize)]
struct JsonOutput<'a> {
    files: &'a [FileWords],
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<&'a ExtractStats>,
}

fn main() -> std::process::ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize structured logging (respects RUST_LOG env var)
    // Default: WARN level (only errors and warnings)
    // Quiet flag (-q/--quiet) disables all logging output
    if !cli.quiet {
        tracing_subscriber::fmt()
            .with_target(false) // Hide target module (cleaner output)
            .with_level(true) // Show log level
            .with_writer(std::io::stderr) // Write to stderr (preserves stdout for words)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }

    match &cli.command {
        Commands::Extract(args) => run_extract(args),
        Commands::Title(args) => run_title(args),
        Commands::Check { words, word } => run_check(words, word),
    }
}

/// Containment root for symlink checks: the directory itself, or a file's parent.
fn walk_root(path: &Path) -> PathBuf {
    if path.is_dir() {
        return path.to_path_buf();
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn map_error(error: &ExtractError, message: &str) -> std::process::ExitCode {
    tracing::error!(error = %error, "{message}");
    error.exit_code().into()
}

fn write_plain(out: &mut impl Write, file: &FileWords, meta_names: bool) -> io::Result<()> {
    for word in &file.words {
        match (&word.meta, meta_names) {
            (Some(meta), true) => writeln!(out, "{}\t{}\t{}", file.path, word.word, meta)?,
            _ => writeln!(out, "{}\t{}", file.path, word.word)?,
        }
    }
    Ok(())
}

fn add_stats(total: &mut ExtractStats, stats: &ExtractStats) {
    total.files_extracted += stats.files_extracted;
    total.files_skipped += stats.files_skipped;
    total.bytes_extracted += stats.bytes_extracted;
    total.words += stats.words;
    total.words_rejected += stats.words_rejected;
    total.duration += stats.duration;
}

/// Run the `extract` subcommand.
fn run_extract(args: &ExtractArgs) -> std::process::ExitCode {
    let (config, paths) = match args.extractor_config().and_then(|c| Ok((c, args.paths()?))) {
        Ok(v) => v,
        Err(e) => return map_error(&e, "Invalid configuration"),
    };

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut json_files = Vec::new();
    let mut total = ExtractStats::default();

    for path in &paths {
        let extractor = Extractor::new(&walk_root(path), config.clone());
        let result = extractor.extract_path(path, &mut |file: FileWords| -> Result<()> {
            match args.format {
                OutputFormat::Plain => write_plain(&mut out, &file, args.meta_names)?,
                OutputFormat::Json => json_files.push(file),
            }
            Ok(())
        });
        match result {
            Ok(stats) => add_stats(&mut total, &stats),
            Err(e @ ExtractError::Walk { .. }) => {
                tracing::error!(path = %path.display(), error = %e, "Cannot read input path");
                return ExitCode::NoInput.into();
            }
            Err(e) => return map_error(&e, "Extraction failed"),
        }
    }

    if args.format == OutputFormat::Json {
        let doc = JsonOutput { files: &json_files, stats: args.stats.then_some(&total) };
        if let Err(e) = serde_json::to_writer_pretty(&mut out, &doc) {
            return map_error(&ExtractError::from(e), "Failed to write JSON");
        }
        if let Err(e) = writeln!(out) {
            return map_error(&ExtractError::from(e), "Failed to write output");
        }
    }
    if let Err(e) = out.flush() {
        return map_error(&ExtractError::from(e), "Failed to write output");
    }

    if args.stats {
        eprintln!(
            "files: {}  skipped: {}  bytes: {}  words: {}  rejected: {}  ({:.2}s)",
            total.files_extracted,
            total.files_skipped,
            total.bytes_extracted,
            total.words,
            total.words_rejected,
            total.duration.as_secs_f64()
        );
    }
    ExitCode::Ok.into()
}

/// Run the `title` subcommand. Files without a title print their file name.
fn run_title(args: &TitleArgs) -> std::process::ExitCode {
    let config = match args.extractor_config() {
        Ok(c) => c,
        Err(e) => return map_error(&e, "Invalid configuration"),
    };

    let mut status = ExitCode::Ok;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for path in &args.files {
        let extractor = Extractor::new(&walk_root(path), config.clone());
        let title = match extractor.title(path) {
            Ok(Some(title)) => title,
            Ok(None) => path.file_name().map_or_else(
                || path.display().to_string(),
                |n| n.to_string_lossy().into_owned(),
            ),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read title");
                status = e.exit_code();
                continue;
            }
        };
        if let Err(e) = writeln!(out, "{}\t{}", path.display(), title) {
            return map_error(&ExtractError::from(e), "Failed to write output");
        }
    }
    status.into()
}

/// Run the `check` subcommand.
fn run_check(words: &[String], word: &WordArgs) -> std::process::ExitCode {
    let config = word.word_config();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for w in words {
        let ok = w.len() <= config.max_size && is_ok_word(w.as_bytes(), &config);
        let verdict = if ok { "ok" } else { "reject" };
        if let Err(e) = writeln!(out, "{w}\t{verdict}") {
            return map_error(&ExtractError::from(e), "Failed to write output");
        }
    }
    ExitCode::Ok.into()
}
