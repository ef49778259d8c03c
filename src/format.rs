//! File formats and dispatch to their tokenizers.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::charset::Charset;
use crate::encoded::EncodedCharRange;
use crate::error::{ExtractError, Result};
use crate::filter::FilterSet;
use crate::html::HtmlConfig;
use crate::sink::WordSink;
use crate::word::index_words;
use crate::{html, id3, latex, mail, man, rtf};

/// Document formats with a dedicated tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Text,
    Html,
    Latex,
    Rtf,
    Mail,
    Id3,
    Man,
}

impl FileFormat {
    pub const ALL: [Self; 7] =
        [Self::Text, Self::Html, Self::Latex, Self::Rtf, Self::Mail, Self::Id3, Self::Man];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Html => "html",
            Self::Latex => "latex",
            Self::Rtf => "rtf",
            Self::Mail => "mail",
            Self::Id3 => "id3",
            Self::Man => "man",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in extension mapping.
const DEFAULT_EXTENSIONS: &[(&str, FileFormat)] = &[
    ("txt", FileFormat::Text),
    ("text", FileFormat::Text),
    ("md", FileFormat::Text),
    ("htm", FileFormat::Html),
    ("html", FileFormat::Html),
    ("xhtml", FileFormat::Html),
    ("shtml", FileFormat::Html),
    ("tex", FileFormat::Latex),
    ("latex", FileFormat::Latex),
    ("rtf", FileFormat::Rtf),
    ("eml", FileFormat::Mail),
    ("mbox", FileFormat::Mail),
    ("mail", FileFormat::Mail),
    ("msg", FileFormat::Mail),
    ("mp3", FileFormat::Id3),
    ("id3", FileFormat::Id3),
    ("man", FileFormat::Man),
    ("1", FileFormat::Man),
    ("2", FileFormat::Man),
    ("3", FileFormat::Man),
    ("4", FileFormat::Man),
    ("5", FileFormat::Man),
    ("6", FileFormat::Man),
    ("7", FileFormat::Man),
    ("8", FileFormat::Man),
    ("9", FileFormat::Man),
];

/// Lower-case file extension to format.
#[derive(Debug, Clone)]
pub struct FormatMap {
    extensions: HashMap<String, FileFormat>,
    /// Format for files whose extension is not mapped
    fallback: Option<FileFormat>,
}

impl Default for FormatMap {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|&(e, f)| (e.to_string(), f)).collect(),
            fallback: None,
        }
    }
}

impl FormatMap {
    /// Apply an `ext:format` override.
    ///
    /// # Errors
    /// Returns `ExtractError::ConfigInvalid` for a malformed pair or an
    /// unknown format name.
    pub fn insert_override(&mut self, pair: &str) -> Result<()> {
        let invalid = |reason: &str| ExtractError::ConfigInvalid {
            field: "ext".to_string(),
            value: pair.to_string(),
            reason: reason.to_string(),
        };
        let (ext, format) = pair.split_once(':').ok_or_else(|| invalid("expected ext:format"))?;
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if ext.is_empty() {
            return Err(invalid("empty extension"));
        }
        let format = FileFormat::from_name(format).ok_or_else(|| invalid("unknown format"))?;
        self.extensions.insert(ext, format);
        Ok(())
    }

    /// Index files with unmapped extensions using `format`.
    pub const fn set_fallback(&mut self, format: Option<FileFormat>) {
        self.fallback = format;
    }

    pub fn get(&self, ext: &str) -> Option<FileFormat> {
        self.extensions.get(&ext.to_ascii_lowercase()).copied()
    }

    /// Format for a path by its extension.
    pub fn format_for(&self, path: &Path) -> Option<FileFormat> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| self.get(e))
            .or(self.fallback)
    }
}

/// Settings shared by the tokenizers.
#[derive(Debug, Clone)]
pub struct TokenizerConfig {
    pub html: HtmlConfig,
    pub filters: FilterSet,
    /// Character set of text-based formats other than mail
    pub charset: Charset,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { html: HtmlConfig::default(), filters: FilterSet::default(), charset: Charset::Utf8 }
    }
}

/// Title extraction limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleConfig {
    /// Longest title returned, in bytes
    pub max_size: usize,
    /// Lines searched for a man page `.SH NAME`
    pub man_title_lines: usize,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self { max_size: 200, man_title_lines: 12 }
    }
}

/// Collapse whitespace runs and truncate to `max_size` bytes.
/// `None` if nothing but whitespace remains.
pub(crate) fn collapse_title(raw: &[u8], max_size: usize) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let mut title = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if title.len() > max_size {
        let mut cut = max_size;
        while !title.is_char_boundary(cut) {
            cut -= 1;
        }
        title.truncate(cut);
        title.truncate(title.trim_end().len());
    }
    (!title.is_empty()).then_some(title)
}

fn text_range<'a>(bytes: &'a [u8], config: &TokenizerConfig) -> EncodedCharRange<'a> {
    EncodedCharRange::new(bytes).with_charset(config.charset)
}

/// Send the words of a document to `sink`.
pub fn extract(
    format: FileFormat,
    bytes: &[u8],
    config: &TokenizerConfig,
    sink: &mut dyn WordSink,
) {
    tracing::trace!(%format, bytes = bytes.len(), "Tokenizing");
    match format {
        FileFormat::Text => index_words(text_range(bytes, config), None, sink),
        FileFormat::Html => html::tokenize(text_range(bytes, config), &config.html, sink),
        FileFormat::Latex => latex::tokenize(text_range(bytes, config), sink),
        FileFormat::Rtf => rtf::tokenize(text_range(bytes, config), sink),
        FileFormat::Mail => {
            mail::tokenize(EncodedCharRange::new(bytes), &config.html, &config.filters, sink);
        }
        FileFormat::Id3 => id3::tokenize(EncodedCharRange::new(bytes), sink),
        FileFormat::Man => man::tokenize(text_range(bytes, config), sink),
    }
}

/// The document's title, if its format defines one and it has one.
pub fn find_title(
    format: FileFormat,
    bytes: &[u8],
    config: &TokenizerConfig,
    title: &TitleConfig,
) -> Option<String> {
    let max = title.max_size;
    match format {
        FileFormat::Text => None,
        FileFormat::Html => html::find_title(text_range(bytes, config), max),
        FileFormat::Latex => latex::find_title(text_range(bytes, config), max),
        FileFormat::Rtf => rtf::find_title(text_range(bytes, config), max),
        FileFormat::Mail => mail::find_title(EncodedCharRange::new(bytes), max),
        FileFormat::Id3 => id3::find_title(EncodedCharRange::new(bytes), max),
        FileFormat::Man => man::find_title(text_range(bytes, config), max, title.man_title_lines),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn extracted(format: FileFormat, bytes: &[u8]) -> Vec<String> {
        let mut sink = RecordingSink::default();
        extract(format, bytes, &TokenizerConfig::default(), &mut sink);
        sink.all().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_collapse_title() {
        assert_eq!(collapse_title(b"  A\n\tTitle  ", 100).as_deref(), Some("A Title"));
        assert_eq!(collapse_title(b"   ", 100), None);
        assert_eq!(collapse_title(b"Hello World", 6).as_deref(), Some("Hello"));
        assert_eq!(collapse_title("caf\u{e9}".as_bytes(), 4).as_deref(), Some("caf"));
    }

    #[test]
    fn test_format_names() {
        for format in FileFormat::ALL {
            assert_eq!(FileFormat::from_name(format.name()), Some(format));
        }
        assert_eq!(FileFormat::from_name(" HTML "), Some(FileFormat::Html));
        assert_eq!(FileFormat::from_name("pdf"), None);
    }

    #[test]
    fn test_default_extensions() {
        let map = FormatMap::default();
        assert_eq!(map.format_for(Path::new("doc/index.HTML")), Some(FileFormat::Html));
        assert_eq!(map.format_for(Path::new("ls.1")), Some(FileFormat::Man));
        assert_eq!(map.format_for(Path::new("song.mp3")), Some(FileFormat::Id3));
        assert_eq!(map.format_for(Path::new("inbox.mbox")), Some(FileFormat::Mail));
        assert_eq!(map.format_for(Path::new("binary.exe")), None);
        assert_eq!(map.format_for(Path::new("Makefile")), None);
    }

    #[test]
    fn test_extension_overrides() {
        let mut map = FormatMap::default();
        map.insert_override(".ltx:latex").unwrap();
        map.insert_override("txt:html").unwrap();
        assert_eq!(map.get("ltx"), Some(FileFormat::Latex));
        assert_eq!(map.get("txt"), Some(FileFormat::Html));

        assert!(matches!(map.insert_override("nocolon"), Err(ExtractError::ConfigInvalid { .. })));
        assert!(map.insert_override("doc:word").is_err());
        assert!(map.insert_override(":text").is_err());
    }

    #[test]
    fn test_fallback_format() {
        let mut map = FormatMap::default();
        map.set_fallback(Some(FileFormat::Text));
        assert_eq!(map.format_for(Path::new("README")), Some(FileFormat::Text));
        assert_eq!(map.format_for(Path::new("page.htm")), Some(FileFormat::Html));
    }

    #[test]
    fn test_extract_dispatch() {
        assert_eq!(extracted(FileFormat::Text, b"plain <b>text</b>"), ["plain", "b", "text", "b"]);
        assert_eq!(extracted(FileFormat::Html, b"plain <b>text</b>"), ["plain", "text"]);
        assert_eq!(extracted(FileFormat::Latex, br"\emph{word} here"), ["word", "here"]);
        assert_eq!(extracted(FileFormat::Rtf, br"{\rtf1 rich\par text}"), ["rich", "text"]);
        assert_eq!(extracted(FileFormat::Man, b".TH X 1\nbody\n"), ["X", "1", "body"]);
    }

    #[test]
    fn test_text_decodes_configured_charset() {
        let mut sink = RecordingSink::default();
        let config = TokenizerConfig { charset: Charset::Iso8859_1, ..Default::default() };
        extract(FileFormat::Text, b"caf\xE9 au lait", &config, &mut sink);
        assert_eq!(sink.all(), ["cafe", "au", "lait"]);
    }

    #[test]
    fn test_find_title_dispatch() {
        let config = TokenizerConfig::default();
        let title = TitleConfig::default();
        let html = b"<html><head><title>Page  Title</title></head></html>";
        assert_eq!(
            find_title(FileFormat::Html, html, &config, &title).as_deref(),
            Some("Page Title")
        );
        let mail = b"Subject: Hello there\n\nbody\n";
        assert_eq!(
            find_title(FileFormat::Mail, mail, &config, &title).as_deref(),
            Some("Hello there")
        );
        assert_eq!(find_title(FileFormat::Text, b"no titles", &config, &title), None);
    }
}
