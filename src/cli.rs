use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use crate::charset::Charset;
use crate::error::{ExtractError, Result};
use crate::extractor::ExtractorConfig;
use crate::filter::{Filter, FilterSet};
use crate::format::FileFormat;
use crate::word::{WORD_HARD_MAX_SIZE, WordConfig};

/// Output format for extracted words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
}

/// CLI arguments for the word extractor.
#[derive(Parser, Debug)]
#[command(
    name = "textsieve",
    version = env!("CARGO_PKG_VERSION"),
    about = "Format-aware word extractor for full-text indexing",
    long_about = concat!("Format-aware word extractor for full-text indexing

Decodes HTML, LaTeX, RTF, mail (MIME), ID3 and man pages in their native
character sets and transfer encodings, and prints the words an indexer
would store, optionally tagged with the field (meta name) they came from.

Version: ", env!("CARGO_PKG_VERSION"), "

SUBCOMMANDS:
  extract    Print the indexable words of files and directories
  title      Print the title of each file
  check      Run the word-quality heuristic over words

EXIT CODES:
  0   Success
  1   Internal or filter error
  2   Invalid configuration value
  3   I/O error
  4   No input")
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Suppress log output (for CI/scripting)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

/// Subcommands for textsieve.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the indexable words of files and directories.
    Extract(ExtractArgs),
    /// Print the title of each file.
    Title(TitleArgs),
    /// Print `ok` or `reject` for each word.
    Check {
        /// Words to check
        #[arg(required = true)]
        words: Vec<String>,
        #[command(flatten)]
        word: WordArgs,
    },
}

/// Minimum and maximum word lengths.
#[derive(Args, Debug, Clone)]
pub struct WordArgs {
    /// Shortest word accepted (acronyms are exempt)
    #[arg(long, default_value = "4", value_parser = validate_word_size)]
    pub word_min_size: usize,

    /// Longest word accepted
    #[arg(long, default_value = "25", value_parser = validate_word_size)]
    pub word_max_size: usize,
}

impl WordArgs {
    pub fn word_config(&self) -> WordConfig {
        WordConfig {
            min_size: self.word_min_size,
            max_size: self.word_max_size,
            ..Default::default()
        }
    }
}

/// Options shared by every subcommand that reads files.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Map a file extension to a format (`ext:format`, repeatable)
    #[arg(long = "ext", value_name = "EXT:FORMAT")]
    pub ext: Vec<String>,

    /// Treat files with unmapped extensions as plain text
    #[arg(long)]
    pub default_text: bool,

    /// Character set of non-mail text files
    #[arg(
        long,
        env = "TEXTSIEVE_CHARSET",
        default_value = "utf-8",
        value_parser = validate_charset
    )]
    pub charset: Charset,

    /// Largest file read, in bytes
    #[arg(long, default_value = "16777216", value_parser = validate_max_file_size)]
    pub max_file_size: u64,

    /// Follow symlinks while walking (disabled by default for safety)
    #[arg(long)]
    pub follow_symlinks: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    /// Files or directories (defaults to the current directory)
    pub paths: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Print the meta name of tagged words
    #[arg(long)]
    pub meta_names: bool,

    /// Do not associate words with meta names
    #[arg(long, conflicts_with = "meta_names")]
    pub no_meta: bool,

    /// Only recognize these meta names (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub include_meta: Vec<String>,

    /// Never recognize these meta names (comma-separated); excluded fields are not indexed
    #[arg(long, value_delimiter = ',')]
    pub exclude_meta: Vec<String>,

    /// Do not index HTML elements with these classes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub exclude_class: Vec<String>,

    /// Run MIME parts of a type through a command (`mime:command`, repeatable)
    #[arg(long = "filter", value_name = "MIME:COMMAND", value_parser = parse_filter)]
    pub filters: Vec<Filter>,

    /// File of stop words (one per line) replacing the built-in list
    #[arg(long)]
    pub stop_words: Option<PathBuf>,

    /// Print extraction totals to stderr
    #[arg(long)]
    pub stats: bool,

    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub word: WordArgs,
}

#[derive(Args, Debug, Clone)]
pub struct TitleArgs {
    /// Files to read titles from
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Longest title printed, in bytes
    #[arg(long, default_value = "200", value_parser = validate_title_size)]
    pub title_max_size: usize,

    /// Lines of a man page searched for `.SH NAME`
    #[arg(long, default_value = "12")]
    pub man_title_lines: usize,

    #[command(flatten)]
    pub input: InputArgs,
}

/// Validates a word length: `1` to the word buffer capacity.
fn validate_word_size(s: &str) -> std::result::Result<usize, String> {
    let val: usize = s.parse().map_err(|_| "invalid integer".to_string())?;

    if !(1..=WORD_HARD_MAX_SIZE).contains(&val) {
        return Err(format!("must be between 1 and {WORD_HARD_MAX_SIZE}"));
    }

    Ok(val)
}

/// Validates `max_file_size`: must be positive.
fn validate_max_file_size(s: &str) -> std::result::Result<u64, String> {
    let val: u64 = s.parse().map_err(|_| "invalid integer".to_string())?;

    if val == 0 {
        return Err("must be > 0".to_string());
    }

    Ok(val)
}

/// Validates `title_max_size`: must be positive.
fn validate_title_size(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be > 0".to_string()),
        Ok(v) => Ok(v),
        Err(_) => Err("invalid integer".to_string()),
    }
}

/// Validates a character set name.
fn validate_charset(s: &str) -> std::result::Result<Charset, String> {
    Charset::from_name(s).ok_or_else(|| format!("unsupported charset '{s}'"))
}

fn parse_filter(s: &str) -> std::result::Result<Filter, String> {
    Filter::parse(s).map_err(|e| e.to_string())
}

/// Expand tilde (`~`) to home directory in path.
fn expand_tilde(path: &Path) -> Result<PathBuf> {
    if let Some(stripped) = path.to_str().and_then(|s| s.strip_prefix('~')) {
        let home = dirs::home_dir().ok_or_else(|| ExtractError::ConfigInvalid {
            field: "path".to_string(),
            value: path.to_string_lossy().to_string(),
            reason: "Could not determine home directory".to_string(),
        })?;
        if stripped.is_empty() {
            return Ok(home);
        }
        if stripped.starts_with('/') || stripped.starts_with('\\') {
            return Ok(home.join(&stripped[1..]));
        }
    }
    Ok(path.to_path_buf())
}

fn lowercase_set(names: &[String]) -> std::collections::HashSet<String> {
    names
        .iter()
        .map(|n| n.trim().to_ascii_lowercase())
        .filter(|n| !n.is_empty())
        .collect()
}

impl InputArgs {
    /// Fill the file-reading parts of `config`.
    ///
    /// # Errors
    /// Returns `ExtractError::ConfigInvalid` for a malformed `--ext` pair.
    fn apply(&self, config: &mut ExtractorConfig) -> Result<()> {
        for pair in &self.ext {
            config.formats.insert_override(pair)?;
        }
        if self.default_text {
            config.formats.set_fallback(Some(FileFormat::Text));
        }
        config.tokenizer.charset = self.charset;
        config.max_file_size = self.max_file_size;
        config.follow_symlinks = self.follow_symlinks;
        Ok(())
    }
}

impl ExtractArgs {
    /// Paths to extract, with `~` expanded.
    ///
    /// # Errors
    /// Returns `ExtractError::ConfigInvalid` if the home directory is unknown.
    pub fn paths(&self) -> Result<Vec<PathBuf>> {
        if self.paths.is_empty() {
            return Ok(vec![PathBuf::from(".")]);
        }
        self.paths.iter().map(|p| expand_tilde(p)).collect()
    }

    /// Build the extractor configuration from the flags.
    ///
    /// # Errors
    /// Returns `ExtractError` if an override is malformed, the word sizes
    /// are inconsistent or the stop-word file can't be read.
    pub fn extractor_config(&self) -> Result<ExtractorConfig> {
        if self.word.word_min_size > self.word.word_max_size {
            return Err(ExtractError::ConfigInvalid {
                field: "word-min-size".to_string(),
                value: self.word.word_min_size.to_string(),
                reason: format!("must not exceed word-max-size ({})", self.word.word_max_size),
            });
        }

        let mut config = ExtractorConfig { words: self.word.word_config(), ..Default::default() };
        self.input.apply(&mut config)?;
        config.meta.disabled = self.no_meta;
        config.meta.include = lowercase_set(&self.include_meta);
        config.meta.exclude = lowercase_set(&self.exclude_meta);
        config.tokenizer.html.excluded_classes = lowercase_set(&self.exclude_class);
        config.tokenizer.filters = FilterSet::new(self.filters.clone());

        if let Some(path) = &self.stop_words {
            let text = fs::read_to_string(expand_tilde(path)?)?;
            config.stop_words = Some(
                text.lines().map(str::trim).filter(|w| !w.is_empty()).map(String::from).collect(),
            );
        }
        Ok(config)
    }
}

impl TitleArgs {
    /// Build the extractor configuration from the flags.
    ///
    /// # Errors
    /// Returns `ExtractError::ConfigInvalid` for a malformed `--ext` pair.
    pub fn extractor_config(&self) -> Result<ExtractorConfig> {
        let mut config = ExtractorConfig::default();
        self.input.apply(&mut config)?;
        config.titles.max_size = self.title_max_size;
        config.titles.man_title_lines = self.man_title_lines;
        Ok(config)
    }
}
