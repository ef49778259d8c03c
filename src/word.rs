//! Word collection and the word-quality heuristic.

use crate::encoded::EncodedCharRange;
use crate::sink::{MetaId, WordSink};

/// Capacity of the per-tokenizer word buffer. Longer tokens are truncated.
pub const WORD_HARD_MAX_SIZE: usize = 64;

/// Thresholds for [`is_ok_word`] and index-side length filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordConfig {
    /// Minimum word length (acronyms are exempt)
    pub min_size: usize,
    /// Maximum word length
    pub max_size: usize,
    /// Minimum number of vowels
    pub min_vowels: usize,
    /// Maximum run of the same character
    pub max_consec_same: usize,
    /// Maximum run of consonants
    pub max_consec_consonants: usize,
    /// Maximum run of vowels
    pub max_consec_vowels: usize,
    /// Maximum run of punctuation
    pub max_consec_puncts: usize,
}

impl Default for WordConfig {
    fn default() -> Self {
        Self {
            min_size: 4,
            max_size: 25,
            min_vowels: 1,
            max_consec_same: 2,
            max_consec_consonants: 5,
            max_consec_vowels: 4,
            max_consec_puncts: 1,
        }
    }
}

/// Characters that may appear inside a word.
#[inline]
pub const fn is_word_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'&' | b'\'' | b'-' | b'_' | b'.')
}

/// Characters a stored word may begin or end with.
#[inline]
pub const fn is_word_boundary_char(c: u8) -> bool {
    c.is_ascii_alphanumeric()
}

#[inline]
const fn is_vowel(c: u8) -> bool {
    matches!(c.to_ascii_lowercase(), b'a' | b'e' | b'i' | b'o' | b'u')
}

/// Heuristic check that a token is a real word and not decoding noise.
///
/// All-uppercase tokens ("AT&T", "CCCP") are accepted as acronyms. Others
/// must meet the length and vowel minimums and stay under the run limits;
/// digits reset the consonant, vowel, and punctuation runs.
pub fn is_ok_word(word: &[u8], config: &WordConfig) -> bool {
    let Some(&first) = word.first() else {
        return false;
    };

    let (mut digits, mut puncts, mut uppers, mut vowels) = (0, 0, 0, 0);
    for &c in word {
        if c.is_ascii_digit() {
            digits += 1;
        } else if c.is_ascii_punctuation() {
            puncts += 1;
        } else {
            if c.is_ascii_uppercase() {
                uppers += 1;
            }
            if is_vowel(c) {
                vowels += 1;
            }
        }
    }

    if first.is_ascii_uppercase() && uppers + digits + puncts == word.len() {
        return true;
    }
    if word.len() < config.min_size || vowels < config.min_vowels {
        return false;
    }

    let mut last = 0u8;
    let (mut same, mut consonants, mut vowel_run, mut punct_run) = (0, 0, 0, 0);
    for &c in word {
        let folded = c.to_ascii_lowercase();
        if folded == last {
            same += 1;
            if same > config.max_consec_same {
                return false;
            }
        } else {
            last = folded;
            same = 1;
        }

        if c.is_ascii_digit() {
            consonants = 0;
            vowel_run = 0;
            punct_run = 0;
            continue;
        }
        if c.is_ascii_punctuation() {
            punct_run += 1;
            if punct_run > config.max_consec_puncts {
                return false;
            }
            consonants = 0;
            vowel_run = 0;
            continue;
        }
        punct_run = 0;
        if is_vowel(c) {
            vowel_run += 1;
            if vowel_run > config.max_consec_vowels {
                return false;
            }
            consonants = 0;
        } else {
            consonants += 1;
            if consonants > config.max_consec_consonants {
                return false;
            }
            vowel_run = 0;
        }
    }
    true
}

/// Fixed-capacity buffer a tokenizer accumulates word characters in.
#[derive(Debug, Clone)]
pub struct WordBuffer {
    buf: [u8; WORD_HARD_MAX_SIZE],
    len: usize,
}

impl Default for WordBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl WordBuffer {
    pub const fn new() -> Self {
        Self { buf: [0; WORD_HARD_MAX_SIZE], len: 0 }
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Append a word character; characters past capacity are dropped.
    pub const fn push(&mut self, c: u8) {
        if self.len < WORD_HARD_MAX_SIZE {
            self.buf[self.len] = c;
            self.len += 1;
        }
    }

    pub const fn clear(&mut self) {
        self.len = 0;
    }

    /// Hand the collected word (if any) to the sink and start over.
    pub fn flush(&mut self, sink: &mut dyn WordSink, meta: Option<MetaId>) {
        if self.len > 0 {
            sink.index_word(&self.buf[..self.len], meta);
        }
        self.clear();
    }

    /// Feed one character: word characters accumulate, anything else ends
    /// the current word.
    pub fn feed(&mut self, c: u8, sink: &mut dyn WordSink, meta: Option<MetaId>) {
        if is_word_char(c) {
            self.push(c);
        } else {
            self.flush(sink, meta);
        }
    }

    /// Feed every character of `text`.
    pub fn feed_str(&mut self, text: &[u8], sink: &mut dyn WordSink, meta: Option<MetaId>) {
        for &c in text {
            self.feed(c, sink, meta);
        }
    }
}

/// Split a range into words and index each one with `meta`.
pub fn index_words(range: EncodedCharRange<'_>, meta: Option<MetaId>, sink: &mut dyn WordSink) {
    let mut word = WordBuffer::new();
    for c in range.iter() {
        word.feed(c, sink, meta);
    }
    word.flush(sink, meta);
}

/// Index an already-decoded string.
pub fn index_text(text: &[u8], meta: Option<MetaId>, sink: &mut dyn WordSink) {
    let mut word = WordBuffer::new();
    word.feed_str(text, sink, meta);
    word.flush(sink, meta);
}
