use ignore::{DirEntry, WalkBuilder};
use serde::Serialize;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::error::{ExtractError, Result};
use crate::format::{self, FileFormat, FormatMap, TitleConfig, TokenizerConfig};
use crate::sink::{MetaConfig, WordCollector};
use crate::word::WordConfig;

/// Configuration for the extractor.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Maximum file size to read (in bytes)
    pub max_file_size: u64,
    /// Follow symlinks (disabled by default)
    pub follow_symlinks: bool,
    pub words: WordConfig,
    pub meta: MetaConfig,
    pub tokenizer: TokenizerConfig,
    pub formats: FormatMap,
    pub titles: TitleConfig,
    /// Replacement stop-word list
    pub stop_words: Option<Vec<String>>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_file_size: 16 * 1024 * 1024, // 16MB
            follow_symlinks: false,
            words: WordConfig::default(),
            meta: MetaConfig::default(),
            tokenizer: TokenizerConfig::default(),
            formats: FormatMap::default(),
            titles: TitleConfig::default(),
            stop_words: None,
        }
    }
}

/// Statistics from an extraction run.
#[derive(Debug, Default, Serialize)]
pub struct ExtractStats {
    pub files_extracted: u64,
    pub files_skipped: u64,
    pub bytes_extracted: u64,
    pub words: u64,
    pub words_rejected: u64,
    #[serde(skip)]
    pub duration: Duration,
}

/// One accepted word and the name of the field it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedWord {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
}

/// Words extracted from one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileWords {
    pub path: String,
    pub format: FileFormat,
    pub words: Vec<ExtractedWord>,
}

/// Walks paths and runs each file through its format's tokenizer.
///
/// Uses the `ignore` crate for gitignore-aware directory walking.
pub struct Extractor {
    root: PathBuf,
    root_canonical: PathBuf,
    config: ExtractorConfig,
}

impl Extractor {
    /// Create an extractor whose symlink containment root is `root`.
    pub fn new(root: &Path, config: ExtractorConfig) -> Self {
        let root_canonical = root.canonicalize().unwrap_or_else(|err| {
            tracing::warn!(
                path = %root.display(),
                error = %err,
                "Failed to canonicalize root; symlink containment checks may be overly strict"
            );
            root.to_path_buf()
        });
        Self { root: root.to_path_buf(), root_canonical, config }
    }

    /// Extract every file under `path` (or `path` itself), handing each
    /// file's words to `output` as soon as they are ready.
    ///
    /// # Errors
    /// Returns `ExtractError::Walk` if `path` does not exist. Errors on
    /// individual files are logged and counted as skipped.
    pub fn extract_path(
        &self,
        path: &Path,
        output: &mut dyn FnMut(FileWords) -> Result<()>,
    ) -> Result<ExtractStats> {
        let start = SystemTime::now();
        if fs::symlink_metadata(path).is_err() {
            return Err(ExtractError::Walk {
                path: path.display().to_string(),
                source: ignore::Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound)),
            });
        }

        let walk = WalkBuilder::new(path)
            .standard_filters(true) // Respect .gitignore
            .same_file_system(true)
            .follow_links(self.config.follow_symlinks)
            .build();

        let mut stats = ExtractStats::default();
        for result in walk {
            match result {
                Ok(entry) => match self.process_entry(&entry, &mut stats) {
                    Ok(Some(words)) => output(words)?,
                    Ok(None) => {}
                    Err(e) => {
                        // Log and continue - single file errors shouldn't fail the run
                        tracing::warn!(
                            path = %entry.path().display(),
                            error = %e,
                            "Failed to extract file"
                        );
                        stats.files_skipped += 1;
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Directory walk error");
                }
            }
        }

        stats.duration = start.elapsed().unwrap_or_default();
        tracing::info!(
            files = stats.files_extracted,
            skipped = stats.files_skipped,
            bytes = stats.bytes_extracted,
            words = stats.words,
            rejected = stats.words_rejected,
            "Extraction complete"
        );
        Ok(stats)
    }

    /// Process a single directory entry.
    fn process_entry(
        &self,
        entry: &DirEntry,
        stats: &mut ExtractStats,
    ) -> Result<Option<FileWords>> {
        let path = entry.path();

        // Check if it's a symlink (symlink_metadata avoids following links).
        let is_symlink = match fs::symlink_metadata(path) {
            Ok(metadata) => metadata.file_type().is_symlink(),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read symlink metadata"
                );
                stats.files_skipped += 1;
                return Ok(None);
            }
        };

        if is_symlink {
            if !self.config.follow_symlinks {
                stats.files_skipped += 1;
                return Ok(None);
            }

            // Resolve symlink and verify it's within root
            if let Ok(resolved) = fs::canonicalize(path) {
                if !self.is_within_root(&resolved) {
                    tracing::warn!(
                        path = %path.display(),
                        resolved = %resolved.display(),
                        "Skipping symlink that escapes root"
                    );
                    stats.files_skipped += 1;
                    return Ok(None);
                }
            } else {
                stats.files_skipped += 1;
                return Ok(None);
            }
        }

        // Skip directories (only extract files)
        if entry.file_type().is_some_and(|ft| ft.is_dir()) {
            return Ok(None);
        }

        let Some(format) = self.config.formats.format_for(path) else {
            tracing::debug!(path = %path.display(), "No format for file");
            stats.files_skipped += 1;
            return Ok(None);
        };

        let metadata = entry.metadata()?;
        if metadata.len() > self.config.max_file_size {
            stats.files_skipped += 1;
            return Ok(None);
        }

        let content = match self.read_file_content(path, metadata.len()) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read file content"
                );
                stats.files_skipped += 1;
                return Ok(None);
            }
        };

        let (words, rejected) = self.extract_bytes(format, &content);
        stats.files_extracted += 1;
        stats.bytes_extracted += content.len() as u64;
        stats.words += words.len() as u64;
        stats.words_rejected += rejected;

        Ok(Some(FileWords { path: path.display().to_string(), format, words }))
    }

    /// Tokenize `content` as `format`; returns accepted words and the
    /// number of rejected candidates.
    pub fn extract_bytes(&self, format: FileFormat, content: &[u8]) -> (Vec<ExtractedWord>, u64) {
        let mut collector = WordCollector::new(self.config.words.clone(), self.config.meta.clone());
        if let Some(stop_words) = &self.config.stop_words {
            collector = collector.with_stop_words(stop_words);
        }
        format::extract(format, content, &self.config.tokenizer, &mut collector);

        let words = collector
            .words()
            .iter()
            .map(|w| ExtractedWord {
                word: w.word.clone(),
                meta: w.meta.and_then(|id| collector.meta_name(id)).map(String::from),
            })
            .collect();
        (words, collector.rejected())
    }

    /// Title of one file; `None` if its format has no title or the file
    /// doesn't carry one.
    ///
    /// # Errors
    /// Returns `ExtractError` if the file cannot be read or is too large.
    pub fn title(&self, path: &Path) -> Result<Option<String>> {
        let Some(format) = self.config.formats.format_for(path) else {
            return Ok(None);
        };
        let size = fs::metadata(path)?.len();
        let content = self.read_file_content(path, size)?;
        Ok(format::find_title(format, &content, &self.config.tokenizer, &self.config.titles))
    }

    /// Read file content, bounded by `max_file_size`.
    ///
    /// Tokenizers need the whole file in memory (ID3v1 lives at the end,
    /// MIME parts are sub-ranges), so this reads everything up front.
    fn read_file_content(&self, path: &Path, size: u64) -> Result<Vec<u8>> {
        // Check size limit first (fail fast)
        if size > self.config.max_file_size {
            return Err(ExtractError::FileTooLarge { size, max: self.config.max_file_size });
        }

        let file = File::open(path).map_err(|e| ExtractError::Io { source: e })?;

        let max_size = self.config.max_file_size;
        let capacity = std::cmp::min(size, max_size);
        // Safety: capacity ≤ max_file_size, which is bounded to sane values for extraction.
        #[allow(clippy::cast_possible_truncation)]
        let mut bytes = Vec::with_capacity(capacity as usize);

        // Read at most max_size + 1 bytes to detect concurrent growth beyond limit.
        let read_limit = max_size.saturating_add(1);
        file.take(read_limit)
            .read_to_end(&mut bytes)
            .map_err(|e| ExtractError::Io { source: e })?;

        if bytes.len() as u64 > max_size {
            return Err(ExtractError::FileTooLarge { size: bytes.len() as u64, max: max_size });
        }
        Ok(bytes)
    }

    /// Check if a path is safely within the root.
    #[inline]
    fn is_within_root(&self, path: &Path) -> bool {
        [&self.root_canonical, &self.root].into_iter().any(|root| {
            path.strip_prefix(root).is_ok_and(|rel| {
                rel.components().all(|c| c != std::path::Component::ParentDir)
            })
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub const fn config(&self) -> &ExtractorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn collect(extractor: &Extractor, path: &Path) -> (Vec<FileWords>, ExtractStats) {
        let mut files = Vec::new();
        let stats = extractor
            .extract_path(path, &mut |words: FileWords| {
                files.push(words);
                Ok(())
            })
            .unwrap();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        (files, stats)
    }

    fn words(file: &FileWords) -> Vec<&str> {
        file.words.iter().map(|w| w.word.as_str()).collect()
    }

    #[test]
    fn test_extract_directory_by_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "Hello wonderful world").unwrap();
        fs::write(
            dir.path().join("b.html"),
            r#"<meta name="author" content="Jane Austen"><p>Markup words</p>"#,
        )
        .unwrap();
        fs::write(dir.path().join("c.bin"), [0u8, 1, 2]).unwrap();

        let extractor = Extractor::new(dir.path(), ExtractorConfig::default());
        let (files, stats) = collect(&extractor, dir.path());

        assert_eq!(files.len(), 2);
        assert_eq!(words(&files[0]), ["hello", "wonderful", "world"]);
        assert_eq!(files[1].format, FileFormat::Html);
        assert_eq!(words(&files[1]), ["jane", "austen", "markup", "words"]);
        assert_eq!(files[1].words[0].meta.as_deref(), Some("author"));
        assert_eq!(files[1].words[2].meta, None);
        assert_eq!(stats.files_extracted, 2);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.words, 7);
    }

    #[test]
    fn test_fallback_format_for_unknown_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README"), "plain readme text").unwrap();

        let mut config = ExtractorConfig::default();
        config.formats.set_fallback(Some(FileFormat::Text));
        let extractor = Extractor::new(dir.path(), config);
        let (files, _) = collect(&extractor, dir.path());
        assert_eq!(words(&files[0]), ["plain", "readme", "text"]);
    }

    #[test]
    fn test_respects_gitignore() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(".git")).unwrap();
        fs::write(dir.path().join(".gitignore"), "ignored.txt\n").unwrap();
        fs::write(dir.path().join("ignored.txt"), "secret words").unwrap();
        fs::write(dir.path().join("kept.txt"), "public words").unwrap();

        let extractor = Extractor::new(dir.path(), ExtractorConfig::default());
        let (files, _) = collect(&extractor, dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("kept.txt"));
    }

    #[test]
    fn test_oversized_file_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("big.txt"), "x".repeat(2048)).unwrap();

        let config = ExtractorConfig { max_file_size: 1024, ..Default::default() };
        let extractor = Extractor::new(dir.path(), config);
        let (files, stats) = collect(&extractor, dir.path());
        assert!(files.is_empty());
        assert_eq!(stats.files_skipped, 1);
    }

    #[test]
    fn test_single_file_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("note.txt");
        fs::write(&file, "single file words").unwrap();

        let extractor = Extractor::new(dir.path(), ExtractorConfig::default());
        let (files, _) = collect(&extractor, &file);
        assert_eq!(words(&files[0]), ["single", "file", "words"]);
    }

    #[test]
    fn test_missing_path_is_walk_error() {
        let dir = TempDir::new().unwrap();
        let extractor = Extractor::new(dir.path(), ExtractorConfig::default());
        let result = extractor.extract_path(&dir.path().join("absent"), &mut |_: FileWords| Ok(()));
        assert!(matches!(result, Err(ExtractError::Walk { .. })));
    }

    #[test]
    fn test_custom_stop_words() {
        let config = ExtractorConfig {
            stop_words: Some(vec!["hello".to_string()]),
            ..Default::default()
        };
        let extractor = Extractor::new(Path::new("."), config);
        let (words, rejected) = extractor.extract_bytes(FileFormat::Text, b"hello there world");
        let words: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(words, ["there", "world"]);
        assert_eq!(rejected, 1);
    }

    #[test]
    fn test_title() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("page.html");
        fs::write(&file, "<html><title>My  Page</title></html>").unwrap();
        let extractor = Extractor::new(dir.path(), ExtractorConfig::default());
        assert_eq!(extractor.title(&file).unwrap().as_deref(), Some("My Page"));
        assert_eq!(extractor.title(&dir.path().join("x.unknown")).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_not_followed_by_default() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("real.txt");
        fs::write(&target, "linked words").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

        let extractor = Extractor::new(dir.path(), ExtractorConfig::default());
        let (files, stats) = collect(&extractor, dir.path());
        assert_eq!(files.len(), 1);
        assert!(files[0].path.ends_with("real.txt"));
        assert_eq!(stats.files_skipped, 1);
    }
}
