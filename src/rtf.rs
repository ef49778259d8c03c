//! RTF tokenizer.
//!
//! Plain text between control words is indexed. Document-information
//! groups (`{\info{\title ...}}`) are indexed tagged with their control name;
//! font tables, stylesheets, pictures and other non-text destinations are
//! skipped.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::charset::{iso8859_1_to_ascii, unicode_to_ascii};
use crate::encoded::{EncodedCharRange, EncodedChars};
use crate::format::collapse_title;
use crate::sink::{FieldMeta, MetaId, WordSink};
use crate::word::WordBuffer;

/// Longest control word looked up; longer ones never match.
pub const CONTROL_WORD_MAX_SIZE: usize = 32;

/// How far past `{HYPERLINK` the closing brace is searched for.
const HYPERLINK_SCAN_MAX: usize = 1024;

/// Info-group control words whose contents become meta fields.
static INFO_GROUPS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "author", "category", "comment", "company", "doccomm", "hlinkbase", "keywords",
        "manager", "operator", "subject", "title",
    ]
    .into_iter()
    .collect()
});

/// Destinations whose whole group carries no document text.
static SKIPPED_DESTINATIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "colortbl", "datastore", "filetbl", "fonttbl", "generator", "latentstyles",
        "listoverridetable", "listtable", "object", "pict", "revtbl", "rsidtbl", "stylesheet",
        "themedata", "xmlnstbl",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug)]
struct ControlWord {
    name: String,
    parameter: Option<i32>,
}

/// Parse a control word whose first letter is next. The numeric parameter
/// and one delimiting space are consumed.
fn control_word(it: &mut EncodedChars<'_>) -> ControlWord {
    let mut name = String::new();
    let mut too_long = false;
    while let Some(c) = it.peek().filter(u8::is_ascii_alphabetic) {
        if name.len() < CONTROL_WORD_MAX_SIZE {
            name.push(char::from(c));
        } else {
            too_long = true;
        }
        it.advance();
    }
    if too_long {
        name.clear();
    }

    let negative = it.eat(b'-');
    let mut parameter: Option<i32> = None;
    while let Some(d) = it.peek().filter(u8::is_ascii_digit) {
        let value = parameter.unwrap_or(0);
        parameter = Some(value.saturating_mul(10).saturating_add(i32::from(d - b'0')));
        it.advance();
    }
    if negative {
        parameter = parameter.map(|p| -p);
    }
    it.eat(b' ');
    ControlWord { name, parameter }
}

fn hex_digit(c: u8) -> Option<u8> {
    char::from(c).to_digit(16).and_then(|d| u8::try_from(d).ok())
}

/// After `\'`: two hex digits naming a Latin-1 byte.
fn hex_escape(it: &mut EncodedChars<'_>) -> u8 {
    let hi = it.peek().and_then(hex_digit);
    if hi.is_some() {
        it.advance();
    }
    let lo = it.peek().and_then(hex_digit);
    if lo.is_some() {
        it.advance();
    }
    match (hi, lo) {
        (Some(hi), Some(lo)) => iso8859_1_to_ascii((hi << 4) | lo),
        _ => b' ',
    }
}

/// Skip the rest of the current group, including its closing brace.
fn skip_group(it: &mut EncodedChars<'_>) {
    let mut depth = 0usize;
    while let Some(c) = it.next() {
        match c {
            b'\\' => it.advance(),
            b'{' => depth += 1,
            b'}' => {
                if depth == 0 {
                    return;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
}

/// Physical end of the current group (position of its closing brace).
fn group_end(it: &EncodedChars<'_>) -> usize {
    let mut look = it.clone();
    let mut depth = 0usize;
    loop {
        let here = look.offset();
        match look.next() {
            None => return here,
            Some(b'\\') => look.advance(),
            Some(b'{') => depth += 1,
            Some(b'}') => {
                if depth == 0 {
                    return here;
                }
                depth -= 1;
            }
            Some(_) => {}
        }
    }
}

/// With the iterator just past a `{`, skip a literal `HYPERLINK ...}` group.
fn skip_hyperlink(it: &mut EncodedChars<'_>) -> bool {
    let mut look = it.clone();
    while look.peek() == Some(b' ') {
        look.advance();
    }
    if !b"HYPERLINK".iter().all(|&h| look.next() == Some(h)) {
        return false;
    }
    for _ in 0..HYPERLINK_SCAN_MAX {
        match look.next() {
            Some(b'}') => {
                *it = look;
                return true;
            }
            Some(_) => {}
            None => return false,
        }
    }
    false
}

/// After `\u<N>`: skip the one-character fallback representation.
fn skip_unicode_fallback(it: &mut EncodedChars<'_>) {
    match it.peek() {
        Some(b'\\') => {
            let mut look = it.clone();
            look.advance();
            if look.eat(b'\'') {
                hex_escape(&mut look);
                *it = look;
            }
        }
        Some(b'{' | b'}') | None => {}
        Some(_) => it.advance(),
    }
}

/// An open info group whose words carry `meta` until brace depth drops
/// below `depth`.
#[derive(Debug, Clone, Copy)]
struct InfoScope {
    depth: usize,
    meta: Option<MetaId>,
}

/// Close the innermost brace group, ending any info scope opened inside it.
fn close_group(depth: &mut usize, scopes: &mut Vec<InfoScope>) {
    *depth = depth.saturating_sub(1);
    while scopes.last().is_some_and(|s| s.depth > *depth) {
        scopes.pop();
    }
}

/// Index an RTF document.
pub fn tokenize(range: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
    let mut word = WordBuffer::new();
    let mut it = range.iter();
    let mut depth = 0usize;
    let mut scopes: Vec<InfoScope> = Vec::new();
    let mut meta = None;
    while let Some(c) = it.next() {
        match c {
            b'\\' => match it.peek() {
                Some(c) if c.is_ascii_alphabetic() => {
                    let control = control_word(&mut it);
                    match control.name.as_str() {
                        "rquote" | "lquote" => word.push(b'\''),
                        "u" => {
                            let unit = control.parameter.unwrap_or(0);
                            let unit = if unit < 0 { unit + 0x10000 } else { unit };
                            let c = u32::try_from(unit).map_or(b' ', unicode_to_ascii);
                            word.feed(c, sink, meta);
                            skip_unicode_fallback(&mut it);
                        }
                        name if INFO_GROUPS.contains(name) => {
                            word.flush(sink, meta);
                            if let FieldMeta::Index(id) = sink.field(name) {
                                scopes.push(InfoScope { depth, meta: id });
                            } else {
                                skip_group(&mut it);
                                close_group(&mut depth, &mut scopes);
                            }
                        }
                        name if SKIPPED_DESTINATIONS.contains(name) => {
                            word.flush(sink, meta);
                            skip_group(&mut it);
                            close_group(&mut depth, &mut scopes);
                        }
                        _ => word.flush(sink, meta),
                    }
                }
                Some(b'\'') => {
                    it.advance();
                    let c = hex_escape(&mut it);
                    word.feed(c, sink, meta);
                }
                Some(b'*') => {
                    word.flush(sink, meta);
                    skip_group(&mut it);
                    close_group(&mut depth, &mut scopes);
                }
                Some(b'_' | b'-') => {
                    it.advance();
                    word.push(b'-');
                }
                Some(_) => {
                    it.advance();
                    word.flush(sink, meta);
                }
                None => {}
            },
            b'{' => {
                word.flush(sink, meta);
                if !skip_hyperlink(&mut it) {
                    depth += 1;
                }
            }
            b'}' => {
                word.flush(sink, meta);
                close_group(&mut depth, &mut scopes);
            }
            // Line breaks in RTF source are not text.
            b'\r' | b'\n' => {}
            _ => word.feed(c, sink, meta),
        }
        meta = scopes.last().and_then(|s| s.meta);
    }
    word.flush(sink, meta);
}

/// The document's `\title` info field.
pub fn find_title(range: EncodedCharRange<'_>, max_size: usize) -> Option<String> {
    let mut it = range.iter();
    while let Some(c) = it.next() {
        if c != b'\\' {
            continue;
        }
        if !it.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            it.advance();
            continue;
        }
        if control_word(&mut it).name == "title" {
            let end = group_end(&it);
            let mut title = Vec::new();
            let mut inner = range.sub_range(it.offset(), end).iter();
            while let Some(c) = inner.next() {
                match c {
                    b'\\' if inner.eat(b'\'') => title.push(hex_escape(&mut inner)),
                    b'\\' if inner.peek().is_some_and(|c| c.is_ascii_alphabetic()) => {
                        let control = control_word(&mut inner);
                        if matches!(control.name.as_str(), "rquote" | "lquote") {
                            title.push(b'\'');
                        }
                    }
                    b'\\' => {
                        if let Some(c) = inner.next() {
                            title.push(c);
                        }
                    }
                    b'{' | b'}' => {}
                    b'\r' | b'\n' => {}
                    _ => title.push(c),
                }
            }
            return collapse_title(&title, max_size);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn tokenized(rtf: &str) -> RecordingSink {
        let mut sink = RecordingSink::default();
        tokenize(EncodedCharRange::new(rtf.as_bytes()), &mut sink);
        sink
    }

    #[test]
    fn test_plain_text_and_control_words() {
        let sink = tokenized(r"{\rtf1\ansi\deff0 Hello \b bold\b0  world\par}");
        assert_eq!(sink.all(), ["Hello", "bold", "world"]);
    }

    #[test]
    fn test_word_adjacent_to_control_word() {
        // The word is finished before the control word is parsed.
        let sink = tokenized(r"Hello\par World one\b0two tight\i\ulnone next");
        assert_eq!(sink.all(), ["Hello", "World", "one", "two", "tight", "next"]);
    }

    #[test]
    fn test_rquote_continues_word() {
        let sink = tokenized(r"don\rquote t stop");
        assert_eq!(sink.all(), ["don't", "stop"]);
    }

    #[test]
    fn test_escapes() {
        let sink = tokenized(r"caf\'e9 well\-known a\~b c\{d\}e f\\g");
        assert_eq!(sink.all(), ["cafe", "well-known", "a", "b", "c", "d", "e", "f", "g"]);
    }

    #[test]
    fn test_unicode_escape_skips_fallback() {
        let sink = tokenized(r"na\u239?ve caf\u233\'e9 end");
        assert_eq!(sink.all(), ["naive", "cafe", "end"]);
    }

    #[test]
    fn test_source_line_breaks_ignored() {
        let sink = tokenized("hel\r\nlo there");
        assert_eq!(sink.all(), ["hello", "there"]);
    }

    #[test]
    fn test_info_group_tagged() {
        let sink = tokenized(r"{\rtf1{\info{\title My Doc}{\author Jane Roe}}Body text}");
        assert_eq!(sink.words_in("title"), ["My", "Doc"]);
        assert_eq!(sink.words_in("author"), ["Jane", "Roe"]);
        assert_eq!(sink.untagged(), ["Body", "text"]);
    }

    #[test]
    fn test_nested_info_groups_restore_meta() {
        let sink = tokenized(r"{\info{\title Outer {\author Inner} again} tail}");
        assert_eq!(sink.words_in("title"), ["Outer", "again"]);
        assert_eq!(sink.words_in("author"), ["Inner"]);
        assert_eq!(sink.untagged(), ["tail"]);
    }

    #[test]
    fn test_deeply_nested_info_groups() {
        let rtf = format!("{{\\rtf1{}word}}", "{\\title ".repeat(20_000));
        let sink = tokenized(&rtf);
        assert_eq!(sink.words_in("title"), ["word"]);
    }

    #[test]
    fn test_deeply_nested_plain_groups() {
        let rtf = format!("{}deep{} after", "{".repeat(100_000), "}".repeat(100_000));
        let sink = tokenized(&rtf);
        assert_eq!(sink.all(), ["deep", "after"]);
    }

    #[test]
    fn test_excluded_info_group_skipped() {
        let mut sink = RecordingSink::default();
        sink.meta = crate::sink::MetaRegistry::new(crate::sink::MetaConfig {
            exclude: ["author".to_string()].into_iter().collect(),
            ..Default::default()
        });
        tokenize(EncodedCharRange::new(br"{\info{\author Secret}}shown"), &mut sink);
        assert_eq!(sink.all(), ["shown"]);
    }

    #[test]
    fn test_destinations_skipped() {
        let sink = tokenized(
            r"{\rtf1{\fonttbl{\f0 Times New Roman;}}{\colortbl;\red0;}{\*\generator Writer}Visible}",
        );
        assert_eq!(sink.all(), ["Visible"]);
    }

    #[test]
    fn test_hyperlink_skipped() {
        let sink = tokenized(r#"see {HYPERLINK "http://example.com/page"} here"#);
        assert_eq!(sink.all(), ["see", "here"]);
    }

    #[test]
    fn test_find_title() {
        let rtf = br"{\rtf1{\info{\title The Caf\'e9 Report}{\author X}}Body}";
        assert_eq!(find_title(EncodedCharRange::new(rtf), 100).as_deref(), Some("The Cafe Report"));
        assert_eq!(find_title(EncodedCharRange::new(br"{\rtf1 no info}"), 100), None);
    }
}
