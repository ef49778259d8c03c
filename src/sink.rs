//! Where tokenizers send their words.
//!
//! Tokenizers emit raw candidate words; the [`WordSink`] decides what gets
//! stored. [`WordCollector`] is the index-side implementation: it trims,
//! length-checks, quality-checks, lowercases and stop-word-filters each
//! candidate before recording it.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::word::{WordConfig, is_ok_word, is_word_boundary_char};

/// Handle of a meta name (field) words can be associated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MetaId(pub u32);

/// What to do with text belonging to a named field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMeta {
    /// The field is excluded; do not index its text at all.
    Skip,
    /// Index the text, tagged with the meta id if there is one.
    Index(Option<MetaId>),
}

/// Receiver of tokenizer output.
pub trait WordSink {
    /// Accept one candidate word.
    fn index_word(&mut self, word: &[u8], meta: Option<MetaId>);

    /// Resolve a lower-cased meta name; `None` if excluded or not allowed.
    fn find_meta(&mut self, name: &str) -> Option<MetaId>;

    /// Whether words are tagged with meta names at all.
    fn associates_meta(&self) -> bool {
        true
    }

    fn suspend_indexing(&mut self);

    fn resume_indexing(&mut self);

    /// Meta handling for a named field: excluded fields are skipped only
    /// when meta association is on; otherwise their text is indexed untagged.
    fn field(&mut self, name: &str) -> FieldMeta {
        if !self.associates_meta() {
            return FieldMeta::Index(None);
        }
        match self.find_meta(&name.to_ascii_lowercase()) {
            Some(id) => FieldMeta::Index(Some(id)),
            None => FieldMeta::Skip,
        }
    }
}

/// Which meta names are recognized.
#[derive(Debug, Clone, Default)]
pub struct MetaConfig {
    /// Do not associate words with meta names
    pub disabled: bool,
    /// If non-empty, only these names are recognized
    pub include: HashSet<String>,
    /// Names never recognized
    pub exclude: HashSet<String>,
}

/// Assigns stable ids to meta names according to a [`MetaConfig`].
#[derive(Debug, Clone, Default)]
pub struct MetaRegistry {
    config: MetaConfig,
    ids: HashMap<String, MetaId>,
    names: Vec<String>,
}

impl MetaRegistry {
    pub fn new(config: MetaConfig) -> Self {
        Self { config, ids: HashMap::new(), names: Vec::new() }
    }

    pub const fn enabled(&self) -> bool {
        !self.config.disabled
    }

    pub fn find(&mut self, name: &str) -> Option<MetaId> {
        if self.config.disabled || name.is_empty() {
            return None;
        }
        let name = name.to_ascii_lowercase();
        if self.config.exclude.contains(&name) {
            return None;
        }
        if !self.config.include.is_empty() && !self.config.include.contains(&name) {
            return None;
        }
        if let Some(&id) = self.ids.get(&name) {
            return Some(id);
        }
        let id = MetaId(u32::try_from(self.names.len()).ok()?);
        self.ids.insert(name.clone(), id);
        self.names.push(name);
        Some(id)
    }

    pub fn name(&self, id: MetaId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }
}

/// Built-in English stop words.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "about", "above", "after", "again", "against", "also", "although", "among", "another",
        "anyone", "anything", "because", "been", "before", "being", "below", "between", "both",
        "cannot", "could", "does", "doing", "down", "during", "each", "either", "else", "even",
        "ever", "every", "from", "further", "have", "having", "here", "hers", "herself", "himself",
        "however", "into", "itself", "just", "least", "less", "many", "more", "most", "much",
        "must", "myself", "neither", "never", "nobody", "none", "nothing", "often", "once",
        "only", "other", "others", "ours", "ourselves", "over", "same", "should", "since",
        "some", "someone", "something", "still", "such", "than", "that", "their", "theirs",
        "them", "themselves", "then", "there", "therefore", "these", "they", "this", "those",
        "though", "through", "thus", "together", "under", "until", "upon", "very", "were",
        "what", "whatever", "when", "where", "whether", "which", "while", "whom", "whose",
        "will", "with", "within", "without", "would", "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

/// One stored word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexedWord {
    pub word: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaId>,
}

/// Index-side [`WordSink`]: filters candidates and records survivors.
#[derive(Debug, Clone)]
pub struct WordCollector {
    config: WordConfig,
    meta: MetaRegistry,
    stop_words: Option<HashSet<String>>,
    suspended: u32,
    words: Vec<IndexedWord>,
    rejected: u64,
}

impl WordCollector {
    pub fn new(config: WordConfig, meta: MetaConfig) -> Self {
        Self {
            config,
            meta: MetaRegistry::new(meta),
            stop_words: None,
            suspended: 0,
            words: Vec::new(),
            rejected: 0,
        }
    }

    /// Replace the built-in stop-word list.
    #[must_use]
    pub fn with_stop_words<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.stop_words =
            Some(words.into_iter().map(|w| w.as_ref().to_ascii_lowercase()).collect());
        self
    }

    fn is_stop_word(&self, word: &str) -> bool {
        match &self.stop_words {
            Some(custom) => custom.contains(word),
            None => STOP_WORDS.contains(word),
        }
    }

    pub fn words(&self) -> &[IndexedWord] {
        &self.words
    }

    /// Take the recorded words, leaving meta ids registered.
    pub fn take_words(&mut self) -> Vec<IndexedWord> {
        std::mem::take(&mut self.words)
    }

    pub const fn rejected(&self) -> u64 {
        self.rejected
    }

    pub const fn is_suspended(&self) -> bool {
        self.suspended > 0
    }

    pub fn meta_name(&self, id: MetaId) -> Option<&str> {
        self.meta.name(id)
    }

    /// Trim non-alphanumeric characters from both ends.
    fn trim(word: &[u8]) -> &[u8] {
        let start = word.iter().position(|&c| is_word_boundary_char(c)).unwrap_or(word.len());
        let end = word.iter().rposition(|&c| is_word_boundary_char(c)).map_or(start, |i| i + 1);
        &word[start..end]
    }
}

impl Default for WordCollector {
    fn default() -> Self {
        Self::new(WordConfig::default(), MetaConfig::default())
    }
}

impl WordSink for WordCollector {
    fn index_word(&mut self, word: &[u8], meta: Option<MetaId>) {
        if self.suspended > 0 {
            return;
        }
        let word = Self::trim(word);
        if word.is_empty()
            || word.len() > self.config.max_size
            || !is_ok_word(word, &self.config)
        {
            self.rejected += 1;
            return;
        }
        let lower: String = word.iter().map(|&c| char::from(c.to_ascii_lowercase())).collect();
        if self.is_stop_word(&lower) {
            self.rejected += 1;
            return;
        }
        self.words.push(IndexedWord { word: lower, meta });
    }

    fn find_meta(&mut self, name: &str) -> Option<MetaId> {
        self.meta.find(name)
    }

    fn associates_meta(&self) -> bool {
        self.meta.enabled()
    }

    fn suspend_indexing(&mut self) {
        self.suspended += 1;
    }

    fn resume_indexing(&mut self) {
        self.suspended = self.suspended.saturating_sub(1);
    }
}

/// Unfiltered sink: records every candidate as given, honoring suspension.
/// Every meta name is accepted and resolved by name.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub words: Vec<(String, Option<MetaId>)>,
    pub meta: MetaRegistry,
    pub suspended: u32,
}

impl RecordingSink {
    /// Words tagged with the named meta field.
    pub fn words_in(&self, meta_name: &str) -> Vec<&str> {
        self.words
            .iter()
            .filter(|(_, m)| m.and_then(|id| self.meta.name(id)) == Some(meta_name))
            .map(|(w, _)| w.as_str())
            .collect()
    }

    /// All recorded words in order.
    pub fn all(&self) -> Vec<&str> {
        self.words.iter().map(|(w, _)| w.as_str()).collect()
    }

    /// Words with no meta association.
    pub fn untagged(&self) -> Vec<&str> {
        self.words.iter().filter(|(_, m)| m.is_none()).map(|(w, _)| w.as_str()).collect()
    }
}

impl WordSink for RecordingSink {
    fn index_word(&mut self, word: &[u8], meta: Option<MetaId>) {
        if self.suspended == 0 {
            self.words.push((String::from_utf8_lossy(word).into_owned(), meta));
        }
    }

    fn find_meta(&mut self, name: &str) -> Option<MetaId> {
        self.meta.find(name)
    }

    fn associates_meta(&self) -> bool {
        self.meta.enabled()
    }

    fn suspend_indexing(&mut self) {
        self.suspended += 1;
    }

    fn resume_indexing(&mut self) {
        self.suspended = self.suspended.saturating_sub(1);
    }
}
