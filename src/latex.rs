//! LaTeX tokenizer.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::encoded::{EncodedCharRange, EncodedChars};
use crate::format::collapse_title;
use crate::sink::WordSink;
use crate::word::WordBuffer;

/// Longest command name looked up; longer names never match.
pub const COMMAND_NAME_MAX_SIZE: usize = 20;

/// Deepest nesting of balanced command groups; deeper groups are indexed as
/// plain text of the enclosing group.
pub const GROUP_DEPTH_MAX: usize = 64;

/// What a known command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Feed this text into word collection as if it appeared in the source.
    Substitute(&'static str),
    /// Index the contents of the following group opened by this character.
    Balance(u8),
    /// Skip the following `{...}` argument entirely.
    Discard,
}

static COMMANDS: Lazy<HashMap<&'static str, Command>> = Lazy::new(|| {
    use Command::{Balance, Discard, Substitute};

    let mut map = HashMap::new();
    for name in [
        "author", "caption", "chapter", "emph", "footnote", "hbox", "mbox", "paragraph", "part",
        "section", "subparagraph", "subsection", "subsubsection", "textbf", "textit", "textmd",
        "textrm", "textsc", "textsf", "textsl", "texttt", "textup", "title", "underline",
    ] {
        map.insert(name, Balance(b'{'));
    }
    map.insert("item", Balance(b'['));
    for name in [
        "begin", "bibliography", "bibliographystyle", "cite", "documentclass", "end", "hspace",
        "include", "includegraphics", "input", "label", "pageref", "ref", "url", "usepackage",
        "vspace",
    ] {
        map.insert(name, Discard);
    }
    for (name, text) in [
        ("AA", "A"),
        ("aa", "a"),
        ("AE", "AE"),
        ("ae", "ae"),
        ("i", "i"),
        ("j", "j"),
        ("L", "L"),
        ("l", "l"),
        ("LaTeX", "LaTeX"),
        ("ldots", "... "),
        ("O", "O"),
        ("o", "o"),
        ("OE", "OE"),
        ("oe", "oe"),
        ("ss", "ss"),
        ("TeX", "TeX"),
        // Accents and escaped specials: the letter or character stays in the word.
        ("'", ""),
        ("`", ""),
        ("^", ""),
        ("\"", ""),
        ("~", ""),
        ("=", ""),
        (".", ""),
        ("&", "&"),
        ("_", "_"),
        ("-", ""),
        ("%", " "),
        ("$", " "),
        ("#", " "),
        ("{", " "),
        ("}", " "),
        ("\\", " "),
    ] {
        map.insert(name, Substitute(text));
    }
    map
});

pub fn command(name: &str) -> Option<Command> {
    COMMANDS.get(name).copied()
}

/// Read a command name after a consumed `\`: a run of letters and digits
/// (spaces after it are consumed), or a single non-alphanumeric character.
/// Over-long names come back empty.
fn command_name(it: &mut EncodedChars<'_>) -> String {
    let mut name = String::new();
    let mut too_long = false;
    while let Some(c) = it.peek().filter(u8::is_ascii_alphanumeric) {
        if name.len() < COMMAND_NAME_MAX_SIZE {
            name.push(char::from(c));
        } else {
            too_long = true;
        }
        it.advance();
    }
    if !name.is_empty() {
        skip_spaces(it);
    }
    if too_long {
        return String::new();
    }
    if name.is_empty() {
        if let Some(c) = it.peek().filter(|c| !c.is_ascii_whitespace()) {
            it.advance();
            name.push(char::from(c));
        }
    }
    name
}

/// After `%`: skip the rest of the line and the next line's leading whitespace.
fn skip_comment(it: &mut EncodedChars<'_>) {
    for c in it.by_ref() {
        if c == b'\n' {
            break;
        }
    }
    while it.peek().is_some_and(|c| c == b' ' || c == b'\t') {
        it.advance();
    }
}

/// With the iterator on the opening character, find the physical span of
/// the group's contents and step past its closer. Escaped brackets don't
/// count; an unterminated group runs to the end of input.
fn balanced_group(it: &mut EncodedChars<'_>, open: u8) -> Option<(usize, usize)> {
    let close = if open == b'[' { b']' } else { b'}' };
    if !it.eat(open) {
        return None;
    }
    let begin = it.offset();
    let mut depth = 0usize;
    loop {
        let here = it.offset();
        match it.next() {
            None => return Some((begin, here)),
            Some(b'\\') => {
                it.advance();
            }
            Some(c) if c == open => depth += 1,
            Some(c) if c == close => {
                if depth == 0 {
                    return Some((begin, here));
                }
                depth -= 1;
            }
            Some(_) => {}
        }
    }
}

fn skip_spaces(it: &mut EncodedChars<'_>) {
    while it.peek().is_some_and(|c| c.is_ascii_whitespace()) {
        it.advance();
    }
}

/// Index a LaTeX document.
pub fn tokenize(range: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
    tokenize_group(range, 0, sink);
}

fn tokenize_group(range: EncodedCharRange<'_>, depth: usize, sink: &mut dyn WordSink) {
    let mut word = WordBuffer::new();
    let mut it = range.iter();
    while let Some(c) = it.next() {
        match c {
            b'%' => skip_comment(&mut it),
            b'~' => word.flush(sink, None),
            b'\\' => {
                let name = command_name(&mut it);
                match command(&name) {
                    Some(Command::Substitute(text)) => word.feed_str(text.as_bytes(), sink, None),
                    Some(Command::Balance(_)) if depth >= GROUP_DEPTH_MAX => word.flush(sink, None),
                    Some(Command::Balance(open)) => {
                        word.flush(sink, None);
                        let mut look = it.clone();
                        skip_spaces(&mut look);
                        if look.peek() == Some(open) {
                            it = look;
                            if let Some((begin, end)) = balanced_group(&mut it, open) {
                                tokenize_group(range.sub_range(begin, end), depth + 1, sink);
                            }
                        }
                    }
                    Some(Command::Discard) => {
                        word.flush(sink, None);
                        let mut look = it.clone();
                        skip_spaces(&mut look);
                        if look.peek() == Some(b'{') {
                            it = look;
                            balanced_group(&mut it, b'{');
                        }
                    }
                    None => word.flush(sink, None),
                }
            }
            _ => word.feed(c, sink, None),
        }
    }
    word.flush(sink, None);
}

/// Plain text of a group's contents: commands dropped (substitutions kept),
/// braces and ties turned into spaces.
fn group_text(range: EncodedCharRange<'_>) -> Vec<u8> {
    let mut text = Vec::new();
    let mut it = range.iter();
    while let Some(c) = it.next() {
        match c {
            b'\\' => {
                if let Some(Command::Substitute(s)) = command(&command_name(&mut it)) {
                    text.extend_from_slice(s.as_bytes());
                }
            }
            b'{' | b'}' | b'~' => text.push(b' '),
            b'%' => skip_comment(&mut it),
            _ => text.push(c),
        }
    }
    text
}

/// The argument of `\title{...}`, if the document has one.
pub fn find_title(range: EncodedCharRange<'_>, max_size: usize) -> Option<String> {
    let mut it = range.iter();
    while let Some(c) = it.next() {
        match c {
            b'%' => skip_comment(&mut it),
            b'\\' => {
                let name = command_name(&mut it);
                if name == "title" {
                    skip_spaces(&mut it);
                    let (begin, end) = balanced_group(&mut it, b'{')?;
                    return collapse_title(&group_text(range.sub_range(begin, end)), max_size);
                }
                if name == "begin" {
                    let mut look = it.clone();
                    if let Some((b, e)) = balanced_group(&mut look, b'{') {
                        if range.sub_range(b, e).decode_to_string() == "document" {
                            return None;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn words(tex: &str) -> Vec<String> {
        let mut sink = RecordingSink::default();
        tokenize(EncodedCharRange::new(tex.as_bytes()), &mut sink);
        sink.words.into_iter().map(|(w, _)| w).collect()
    }

    #[test]
    fn test_balanced_section_with_nested_braces() {
        assert_eq!(words(r"\section{A {nested} B} after"), ["A", "nested", "B", "after"]);
    }

    #[test]
    fn test_nested_commands_inside_group() {
        assert_eq!(words(r"\textbf{bold \emph{and} more}tail"), ["bold", "and", "more", "tail"]);
    }

    #[test]
    fn test_substitution_joins_word() {
        assert_eq!(words(r#"Stra\ss e and caf\'e na\"ive"#), ["Strasse", "and", "cafe", "naive"]);
    }

    #[test]
    fn test_deep_nesting_indexed_as_text() {
        let tex = "\\emph{".repeat(100_000) + "word" + &"}".repeat(100_000) + " after";
        assert_eq!(words(&tex), ["word", "after"]);
    }

    #[test]
    fn test_unknown_commands_skipped() {
        assert_eq!(words(r"one \foo two \bar{three}"), ["one", "two", "three"]);
    }

    #[test]
    fn test_discarded_arguments() {
        assert_eq!(
            words(r"\begin{document}Text\label{sec:intro} see \ref{fig} end\end{document}"),
            ["Text", "see", "end"]
        );
    }

    #[test]
    fn test_comment_joins_lines() {
        assert_eq!(words("foo% a comment\n   bar baz"), ["foobar", "baz"]);
    }

    #[test]
    fn test_tie_is_space() {
        assert_eq!(words("Dr.~Watson"), ["Dr.", "Watson"]);
    }

    #[test]
    fn test_optional_argument_balance() {
        assert_eq!(words(r"\item[First] entry \item second"), ["First", "entry", "second"]);
    }

    #[test]
    fn test_escaped_brace_does_not_close_group() {
        assert_eq!(words(r"\emph{a \} b} c"), ["a", "b", "c"]);
    }

    #[test]
    fn test_unterminated_group_runs_to_end() {
        assert_eq!(words(r"\section{never closed"), ["never", "closed"]);
    }

    #[test]
    fn test_overlong_command_never_matches() {
        let tex = format!("\\{}{{x}} y", "section".repeat(4));
        assert_eq!(words(&tex), ["x", "y"]);
    }

    #[test]
    fn test_find_title() {
        let tex = b"\\documentclass{article}\n\
            \\title{The \\emph{Great} Ess\\ae y}\n\\begin{document}";
        assert_eq!(
            find_title(EncodedCharRange::new(&tex[..]), 100).as_deref(),
            Some("The Great Essaey")
        );
        let late = b"\\begin{document}\\title{Too late}";
        assert_eq!(find_title(EncodedCharRange::new(&late[..]), 100), None);
    }
}
