//! Unix manual page (troff `man` macro) tokenizer.
//!
//! Text lines are indexed with troff escapes stripped. `.SH` headings turn
//! the following text into a meta-tagged section named after the heading.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::encoded::{EncodedCharRange, EncodedChars};
use crate::format::collapse_title;
use crate::sink::{MetaId, WordSink};
use crate::word::WordBuffer;

/// Longest macro name looked up; longer ones are treated as unknown.
pub const MACRO_NAME_MAX_SIZE: usize = 16;

/// Shortest heading accepted as a meta name.
pub const HEADING_MIN_SIZE: usize = 3;

/// Bound on bracketed and quoted escape arguments.
const ESCAPE_ARG_MAX: usize = 64;

/// Requests whose arguments are layout parameters, not text.
static SKIPPED_REQUESTS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "ad", "bp", "br", "ce", "ds", "ev", "fi", "ft", "hy", "in", "ll", "ls", "lt", "mk", "na",
        "ne", "nf", "nh", "nr", "pc", "pl", "ps", "rt", "so", "sp", "ta", "ti", "tr", "vs", "PD",
        "RE", "RS", "TP",
    ]
    .into_iter()
    .collect()
});

/// Requests that open a block ending at a `..` line.
static BLOCK_REQUESTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["am", "de", "ig"].into_iter().collect());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Comment,
    Heading,
    Block,
    Skipped,
    Text,
}

/// If a control line starts here, consume its macro name.
fn control_line(it: &mut EncodedChars<'_>) -> Option<Request> {
    if !matches!(it.peek(), Some(b'.' | b'\'')) {
        return None;
    }
    it.advance();
    while matches!(it.peek(), Some(b' ' | b'\t')) {
        it.advance();
    }
    if it.peek() == Some(b'\\') {
        let mut look = it.clone();
        look.advance();
        if look.peek() == Some(b'"') {
            return Some(Request::Comment);
        }
    }

    let mut name = String::new();
    while let Some(c) = it.peek().filter(|c| !c.is_ascii_whitespace()) {
        if name.len() > MACRO_NAME_MAX_SIZE {
            return Some(Request::Skipped);
        }
        name.push(char::from(c));
        it.advance();
    }
    Some(match name.as_str() {
        "" => Request::Skipped,
        "SH" => Request::Heading,
        n if BLOCK_REQUESTS.contains(n) => Request::Block,
        n if SKIPPED_REQUESTS.contains(n) => Request::Skipped,
        _ => Request::Text,
    })
}

fn skip_line(it: &mut EncodedChars<'_>) {
    while let Some(c) = it.next() {
        if c == b'\n' {
            return;
        }
    }
}

/// Skip a macro definition or ignored block through its `..` line.
fn skip_block(it: &mut EncodedChars<'_>) {
    skip_line(it);
    while !it.at_end() {
        let mut look = it.clone();
        let end = look.next() == Some(b'.') && look.next() == Some(b'.');
        skip_line(it);
        if end {
            return;
        }
    }
}

/// Skip a one-character, `(xx` or `[name]` escape argument.
fn skip_name(it: &mut EncodedChars<'_>) {
    match it.peek() {
        Some(b'(') => {
            it.advance();
            for _ in 0..2 {
                if it.peek().is_some_and(|c| c != b'\n') {
                    it.advance();
                }
            }
        }
        Some(b'[') => skip_until(it, b']'),
        Some(b'\n') | None => {}
        Some(_) => it.advance(),
    }
}

/// With the opening character next, skip through `close` on this line.
fn skip_until(it: &mut EncodedChars<'_>, close: u8) {
    it.advance();
    for _ in 0..ESCAPE_ARG_MAX {
        match it.peek() {
            None | Some(b'\n') => return,
            Some(c) => {
                it.advance();
                if c == close {
                    return;
                }
            }
        }
    }
}

/// Skip a delimited argument such as `'1i'`.
fn skip_quoted(it: &mut EncodedChars<'_>) {
    match it.peek() {
        None | Some(b'\n') => {}
        Some(delimiter) => skip_until(it, delimiter),
    }
}

/// Skip a `\s` point size: optional sign, then `(nn`, `[n]`, `'n'` or one
/// or two digits.
fn skip_size(it: &mut EncodedChars<'_>) {
    if matches!(it.peek(), Some(b'+' | b'-')) {
        it.advance();
    }
    match it.peek() {
        Some(b'(') => skip_name(it),
        Some(b'[') => skip_until(it, b']'),
        Some(b'\'') => skip_quoted(it),
        Some(d @ b'0'..=b'9') => {
            it.advance();
            if (b'1'..=b'3').contains(&d) && it.peek().is_some_and(|c| c.is_ascii_digit()) {
                it.advance();
            }
        }
        _ => {}
    }
}

/// After a backslash: consume one troff escape and return the character it
/// stands for, if any. Zero-width escapes return `None` so a word
/// continues across them.
fn escape(it: &mut EncodedChars<'_>) -> Option<u8> {
    let c = it.peek()?;
    if c == b'\n' {
        // Line continuation.
        it.advance();
        return None;
    }
    it.advance();
    match c {
        b'"' | b'#' => {
            while it.peek().is_some_and(|c| c != b'\n') {
                it.advance();
            }
            Some(b' ')
        }
        b'-' => Some(b'-'),
        b'&' | b'|' | b'^' | b'%' | b'c' | b'd' | b'u' | b'r' | b'p' | b'{' | b'}' | b','
        | b'/' => None,
        b'(' => {
            for _ in 0..2 {
                if it.peek().is_some_and(|c| c != b'\n') {
                    it.advance();
                }
            }
            Some(b' ')
        }
        b'[' => {
            while it.peek().is_some_and(|c| c != b']' && c != b'\n') {
                it.advance();
            }
            it.eat(b']');
            Some(b' ')
        }
        b'f' | b'F' | b'g' | b'k' | b'm' | b'M' | b'V' | b'Y' | b'*' | b'$' => {
            skip_name(it);
            None
        }
        b'n' => {
            if matches!(it.peek(), Some(b'+' | b'-')) {
                it.advance();
            }
            skip_name(it);
            None
        }
        b's' => {
            skip_size(it);
            None
        }
        b'A' | b'b' | b'B' | b'C' | b'D' | b'h' | b'H' | b'l' | b'L' | b'N' | b'o' | b'R'
        | b'S' | b'v' | b'w' | b'x' | b'X' | b'Z' => {
            skip_quoted(it);
            Some(b' ')
        }
        b'e' | b'\\' | b'0' | b'~' | b't' | b'\'' | b'`' => Some(b' '),
        _ => Some(c),
    }
}

/// Index text through the end of the line.
fn index_line(
    it: &mut EncodedChars<'_>,
    word: &mut WordBuffer,
    meta: Option<MetaId>,
    sink: &mut dyn WordSink,
) {
    while let Some(c) = it.next() {
        match c {
            b'\n' => break,
            b'\\' => {
                if let Some(c) = escape(it) {
                    word.feed(c, sink, meta);
                }
            }
            _ => word.feed(c, sink, meta),
        }
    }
    word.flush(sink, meta);
}

/// The rest of the line with escapes resolved.
fn line_text(it: &mut EncodedChars<'_>) -> Vec<u8> {
    let mut text = Vec::new();
    while let Some(c) = it.next() {
        match c {
            b'\n' => break,
            b'\\' => text.extend(escape(it)),
            _ => text.push(c),
        }
    }
    text
}

/// `"SEE ALSO"` becomes `see-also`.
fn heading_name(heading: &[u8]) -> String {
    let words: Vec<String> = heading
        .split(u8::is_ascii_whitespace)
        .filter(|w| !w.is_empty())
        .map(|w| {
            w.iter().filter(|&&c| c != b'"').map(|&c| char::from(c.to_ascii_lowercase())).collect()
        })
        .collect();
    words.join("-").trim_end_matches('-').to_string()
}

fn heading_meta(heading: &[u8], sink: &mut dyn WordSink) -> Option<MetaId> {
    let name = heading_name(heading);
    if name.len() < HEADING_MIN_SIZE || !sink.associates_meta() {
        return None;
    }
    sink.find_meta(&name)
}

/// The heading of an `.SH` whose name is here or, if the line is empty,
/// on the following text line.
fn heading_text(it: &mut EncodedChars<'_>) -> Vec<u8> {
    let heading = line_text(it);
    if !heading.iter().all(u8::is_ascii_whitespace) {
        return heading;
    }
    if matches!(it.peek(), Some(b'.' | b'\'') | None) {
        return heading;
    }
    line_text(it)
}

/// Index a manual page.
pub fn tokenize(range: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
    let mut word = WordBuffer::new();
    let mut meta = None;
    let mut it = range.iter();
    while !it.at_end() {
        match control_line(&mut it) {
            None | Some(Request::Text) => index_line(&mut it, &mut word, meta, sink),
            Some(Request::Comment | Request::Skipped) => skip_line(&mut it),
            Some(Request::Block) => skip_block(&mut it),
            Some(Request::Heading) => {
                let heading = heading_text(&mut it);
                meta = heading_meta(&heading, sink);
            }
        }
    }
}

/// The line after `.SH NAME`, if that heading appears within the first
/// `title_lines` lines.
pub fn find_title(
    range: EncodedCharRange<'_>,
    max_size: usize,
    title_lines: usize,
) -> Option<String> {
    let mut it = range.iter();
    for _ in 0..title_lines {
        if it.at_end() {
            return None;
        }
        match control_line(&mut it) {
            Some(Request::Heading) => {
                if heading_name(&line_text(&mut it)) != "name" {
                    continue;
                }
                return match control_line(&mut it) {
                    None | Some(Request::Text) => collapse_title(&line_text(&mut it), max_size),
                    Some(_) => None,
                };
            }
            Some(Request::Block) => skip_block(&mut it),
            _ => skip_line(&mut it),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MetaConfig, MetaRegistry, RecordingSink};

    fn tokenized(man: &str) -> RecordingSink {
        let mut sink = RecordingSink::default();
        tokenize(EncodedCharRange::new(man.as_bytes()), &mut sink);
        sink
    }

    const LS: &str = concat!(
        ".\\\" generated page\n",
        ".TH LS 1\n",
        ".SH NAME\n",
        "ls \\- list directory contents\n",
        ".SH DESCRIPTION\n",
        "List information about files\n",
        ".B ls\n",
        ".SH \"SEE ALSO\"\n",
        "dir(1)\n",
    );

    #[test]
    fn test_sections_become_meta() {
        let sink = tokenized(LS);
        assert_eq!(sink.untagged(), ["LS", "1"]);
        assert_eq!(sink.words_in("name"), ["ls", "-", "list", "directory", "contents"]);
        assert_eq!(sink.words_in("description"), ["List", "information", "about", "files", "ls"]);
        assert_eq!(sink.words_in("see-also"), ["dir", "1"]);
    }

    #[test]
    fn test_heading_on_next_line() {
        let sink = tokenized(".SH\nOPTIONS\nall entries\n");
        assert_eq!(sink.words_in("options"), ["all", "entries"]);
    }

    #[test]
    fn test_short_or_excluded_heading_untagged() {
        let sink = tokenized(".SH AB\nshort section\n");
        assert_eq!(sink.untagged(), ["short", "section"]);

        let mut sink = RecordingSink::default();
        sink.meta = MetaRegistry::new(MetaConfig {
            exclude: ["description".to_string()].into_iter().collect(),
            ..Default::default()
        });
        tokenize(EncodedCharRange::new(b".SH DESCRIPTION\nplain words\n"), &mut sink);
        assert_eq!(sink.untagged(), ["plain", "words"]);
    }

    #[test]
    fn test_comments() {
        let sink = tokenized(".\\\" hidden comment\nvisible text \\\" trailing note\nnext\n");
        assert_eq!(sink.all(), ["visible", "text", "next"]);
    }

    #[test]
    fn test_escapes_stripped() {
        let sink = tokenized(
            "\\fBbold\\fR and \\f(CWcode\\fP \\(em dash \\s-2small\\s0 \\*(lqq\\*(rq \\h'1i'gap\n",
        );
        assert_eq!(sink.all(), ["bold", "and", "code", "dash", "small", "q", "gap"]);
    }

    #[test]
    fn test_line_continuation() {
        let sink = tokenized("hel\\\nlo world\n");
        assert_eq!(sink.all(), ["hello", "world"]);
    }

    #[test]
    fn test_requests_and_blocks_skipped() {
        let sink =
            tokenized(".sp 2\n.ft B\n.de XX\n.B macro body\n..\nafter\n.ig\nignored\n..\nend\n");
        assert_eq!(sink.all(), ["after", "end"]);
    }

    #[test]
    fn test_find_title() {
        let range = EncodedCharRange::new(LS.as_bytes());
        assert_eq!(find_title(range, 100, 12).as_deref(), Some("ls - list directory contents"));
        assert_eq!(find_title(range, 100, 2), None);
        assert_eq!(find_title(EncodedCharRange::new(b"no macros\n"), 100, 12), None);
    }
}
