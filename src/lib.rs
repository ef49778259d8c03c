//! textsieve - format-aware word extraction for full-text indexing
//!
//! Tokenizers walk a document through an [`EncodedCharRange`], which
//! decodes the file's character set and transfer encoding on the fly, and
//! hand candidate words to a [`WordSink`]. [`WordCollector`] is the
//! index-side sink that filters candidates the way an indexer stores them.
//!
//! # Example
//!
//! ```rust
//! use textsieve::{FileFormat, TokenizerConfig, WordCollector, extract};
//!
//! let mut sink = WordCollector::default();
//! let html = b"<html><body><p>Encoded caf&eacute; menus</p></body></html>";
//! extract(FileFormat::Html, html, &TokenizerConfig::default(), &mut sink);
//!
//! let words: Vec<&str> = sink.words().iter().map(|w| w.word.as_str()).collect();
//! assert_eq!(words, ["encoded", "cafe", "menus"]);
//! ```

pub mod charset;
pub mod cli;
pub mod encoded;
pub mod encoding;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod format;
pub mod html;
pub mod id3;
pub mod latex;
pub mod mail;
pub mod man;
pub mod rtf;
pub mod sink;
pub mod word;

pub use charset::Charset;
pub use cli::OutputFormat;
pub use encoded::{EncodedCharRange, EncodedChars};
pub use encoding::Encoding;
pub use error::{ExitCode, ExtractError, Result};
pub use extractor::{ExtractStats, ExtractedWord, Extractor, ExtractorConfig, FileWords};
pub use filter::{Filter, FilterSet};
pub use format::{FileFormat, FormatMap, TitleConfig, TokenizerConfig, extract, find_title};
pub use sink::{
    FieldMeta, IndexedWord, MetaConfig, MetaId, MetaRegistry, RecordingSink, WordCollector,
    WordSink,
};
pub use word::{WordBuffer, WordConfig, index_text, index_words, is_ok_word};
