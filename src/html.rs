//! HTML/XHTML tokenizer.
//!
//! Text between tags is indexed as ordinary words. Tags maintain an element
//! stack so elements whose `class` is excluded can suspend indexing until
//! exactly their own end (explicit or implicit). A handful of attributes
//! carrying human-readable text are indexed too.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

use crate::charset::unicode_to_ascii;
use crate::encoded::{EncodedCharRange, EncodedChars};
use crate::format::collapse_title;
use crate::sink::{FieldMeta, MetaId, WordSink};
use crate::word::WordBuffer;

/// Longest tag name looked up; longer names become [`TAG_SENTINEL`].
pub const TAG_NAME_MAX_SIZE: usize = 10;

/// Longest attribute name kept.
const ATTRIBUTE_NAME_MAX_SIZE: usize = 16;

/// Longest entity reference (between `&` and `;`) resolved.
pub const ENTITY_MAX_SIZE: usize = 8;

/// Replaces over-long tag names; no element has this name.
const TAG_SENTINEL: &str = "\u{1}";

/// Whether an element's end tag is forbidden, optional or required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndTag {
    Forbidden,
    Optional,
    Required,
}

#[derive(Debug)]
pub struct Element {
    pub name: &'static str,
    pub end_tag: EndTag,
    /// Start tags that implicitly close this element.
    pub closers: &'static [&'static str],
}

/// Start tags that end an open paragraph.
const P_CLOSERS: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "dir", "div", "dl", "dt",
    "fieldset", "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr",
    "isindex", "li", "main", "menu", "nav", "noframes", "noscript", "ol", "p", "pre", "section",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

const CELL_CLOSERS: &[&str] = &["td", "th", "tr", "tbody", "tfoot", "thead"];

static ELEMENTS: Lazy<HashMap<&'static str, Element>> = Lazy::new(|| {
    use EndTag::{Forbidden, Optional, Required};

    let forbidden = [
        "area", "base", "basefont", "br", "col", "embed", "frame", "hr", "img", "input",
        "isindex", "keygen", "link", "meta", "param", "source", "track", "wbr",
    ];
    let optional: [(&str, &'static [&'static str]); 16] = [
        ("body", &[]),
        ("colgroup", &["colgroup", "thead", "tbody", "tfoot", "tr"]),
        ("dd", &["dd", "dt"]),
        ("dt", &["dd", "dt"]),
        ("head", &["body"]),
        ("html", &[]),
        ("li", &["li"]),
        ("option", &["option", "optgroup"]),
        ("optgroup", &["optgroup"]),
        ("p", P_CLOSERS),
        ("tbody", &["tbody", "tfoot", "thead"]),
        ("td", CELL_CLOSERS),
        ("tfoot", &["tbody", "thead"]),
        ("th", CELL_CLOSERS),
        ("thead", &["tbody", "tfoot"]),
        ("tr", &["tr", "tbody", "tfoot", "thead"]),
    ];
    let required = [
        "a", "abbr", "acronym", "address", "applet", "article", "aside", "b", "bdo", "big",
        "blockquote", "button", "caption", "center", "cite", "code", "del", "dfn", "dir", "div",
        "dl", "em", "fieldset", "figure", "font", "footer", "form", "frameset", "h1", "h2", "h3",
        "h4", "h5", "h6", "header", "i", "iframe", "ins", "kbd", "label", "legend", "main", "map",
        "menu", "nav", "noframes", "noscript", "object", "ol", "pre", "q", "s", "samp", "script",
        "section", "select", "small", "span", "strike", "strong", "style", "sub", "sup", "table",
        "textarea", "title", "tt", "u", "ul", "var",
    ];

    let mut map = HashMap::new();
    for name in forbidden {
        map.insert(name, Element { name, end_tag: Forbidden, closers: &[] });
    }
    for (name, closers) in optional {
        map.insert(name, Element { name, end_tag: Optional, closers });
    }
    for name in required {
        map.insert(name, Element { name, end_tag: Required, closers: &[] });
    }
    map
});

/// Look up an element by lower-case tag name.
pub fn element(name: &str) -> Option<&'static Element> {
    ELEMENTS.get(name)
}

/// HTML 4 Latin-1 entity names for code points 160..=255, in order.
const LATIN1_ENTITIES: [&str; 96] = [
    "nbsp", "iexcl", "cent", "pound", "curren", "yen", "brvbar", "sect", "uml", "copy", "ordf",
    "laquo", "not", "shy", "reg", "macr", "deg", "plusmn", "sup2", "sup3", "acute", "micro",
    "para", "middot", "cedil", "sup1", "ordm", "raquo", "frac14", "frac12", "frac34", "iquest",
    "Agrave", "Aacute", "Acirc", "Atilde", "Auml", "Aring", "AElig", "Ccedil", "Egrave",
    "Eacute", "Ecirc", "Euml", "Igrave", "Iacute", "Icirc", "Iuml", "ETH", "Ntilde", "Ograve",
    "Oacute", "Ocirc", "Otilde", "Ouml", "times", "Oslash", "Ugrave", "Uacute", "Ucirc", "Uuml",
    "Yacute", "THORN", "szlig", "agrave", "aacute", "acirc", "atilde", "auml", "aring", "aelig",
    "ccedil", "egrave", "eacute", "ecirc", "euml", "igrave", "iacute", "icirc", "iuml", "eth",
    "ntilde", "ograve", "oacute", "ocirc", "otilde", "ouml", "divide", "oslash", "ugrave",
    "uacute", "ucirc", "uuml", "yacute", "thorn", "yuml",
];

static ENTITIES: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    let mut map: HashMap<&'static str, u32> =
        LATIN1_ENTITIES.iter().zip(160u32..).map(|(&name, cp)| (name, cp)).collect();
    for (name, cp) in [
        ("quot", 34),
        ("amp", 38),
        ("apos", 39),
        ("lt", 60),
        ("gt", 62),
        ("ndash", 0x2013),
        ("mdash", 0x2014),
        ("lsquo", 0x2018),
        ("rsquo", 0x2019),
        ("sbquo", 0x201A),
        ("ldquo", 0x201C),
        ("rdquo", 0x201D),
        ("bdquo", 0x201E),
    ] {
        map.insert(name, cp);
    }
    map
});

/// Resolve the entity reference following a consumed `&`.
///
/// On success the iterator is left after the `;`. Anything malformed,
/// unknown or longer than [`ENTITY_MAX_SIZE`] yields a space; malformed
/// references leave the iterator right after the `&`.
pub fn parse_entity(it: &mut EncodedChars<'_>) -> u8 {
    let start = it.clone();
    let mut name = [0u8; ENTITY_MAX_SIZE];
    let mut len = 0;
    loop {
        match it.next() {
            Some(b';') if len > 0 => break,
            Some(c) if c.is_ascii_alphanumeric() || (c == b'#' && len == 0) => {
                if len == ENTITY_MAX_SIZE {
                    *it = start;
                    return b' ';
                }
                name[len] = c;
                len += 1;
            }
            _ => {
                *it = start;
                return b' ';
            }
        }
    }
    let name = &name[..len];
    let cp = match name {
        [b'#', b'x' | b'X', hex @ ..] => parse_number(hex, 16),
        [b'#', dec @ ..] => parse_number(dec, 10),
        _ => std::str::from_utf8(name).ok().and_then(|n| ENTITIES.get(n).copied()),
    };
    cp.map_or(b' ', unicode_to_ascii)
}

fn parse_number(digits: &[u8], radix: u32) -> Option<u32> {
    let digits = std::str::from_utf8(digits).ok()?;
    if digits.is_empty() {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

/// Configuration for the HTML tokenizer.
#[derive(Debug, Clone, Default)]
pub struct HtmlConfig {
    /// Class names whose elements are not indexed (lower-case)
    pub excluded_classes: HashSet<String>,
}

#[derive(Debug)]
struct Attribute {
    name: String,
    /// Physical span of the value, quotes excluded.
    value: Option<(usize, usize)>,
}

#[derive(Debug)]
struct Tag {
    name: String,
    is_end: bool,
    self_closing: bool,
    attributes: Vec<Attribute>,
}

impl Tag {
    fn value<'a>(&self, range: &EncodedCharRange<'a>, name: &str) -> Option<EncodedCharRange<'a>> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value)
            .map(|(begin, end)| range.sub_range(begin, end))
    }
}

fn skip_whitespace(it: &mut EncodedChars<'_>) {
    while it.peek().is_some_and(|c| c.is_ascii_whitespace()) {
        it.advance();
    }
}

#[inline]
const fn is_name_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, b'-' | b':' | b'_' | b'.')
}

/// After `<!--`: skip to `--` followed by optional whitespace and `>`.
fn skip_comment(it: &mut EncodedChars<'_>) {
    while let Some(c) = it.next() {
        if c == b'-' && it.eat(b'-') {
            while it.eat(b'-') {}
            skip_whitespace(it);
            if it.eat(b'>') {
                return;
            }
        }
    }
}

/// Consume `!--` if the iterator (just past a `<`) is at a comment opener.
fn eat_comment_open(it: &mut EncodedChars<'_>) -> bool {
    let mut look = it.clone();
    if look.eat(b'!') && look.eat(b'-') && look.eat(b'-') {
        *it = look;
        true
    } else {
        false
    }
}

fn skip_to_tag_end(it: &mut EncodedChars<'_>) {
    for c in it.by_ref() {
        if c == b'>' {
            return;
        }
    }
}

/// Parse a tag after its `<`. Returns `None` (without consuming anything)
/// when the `<` is just text, and `None` after skipping declarations and
/// processing instructions.
fn parse_tag(it: &mut EncodedChars<'_>) -> Option<Tag> {
    let start = it.clone();
    let is_end = it.eat(b'/');

    if !it.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
        if !is_end && matches!(it.peek(), Some(b'!' | b'?')) {
            skip_to_tag_end(it);
        } else {
            *it = start;
        }
        return None;
    }
    let mut name = String::new();
    let mut too_long = false;
    while let Some(c) = it.peek().filter(|&c| is_name_char(c)) {
        if name.len() < TAG_NAME_MAX_SIZE {
            name.push(char::from(c.to_ascii_lowercase()));
        } else {
            too_long = true;
        }
        it.advance();
    }
    if too_long {
        name = TAG_SENTINEL.to_string();
    }

    let mut tag = Tag { name, is_end, self_closing: false, attributes: Vec::new() };
    loop {
        skip_whitespace(it);
        let Some(c) = it.peek() else { break };
        match c {
            b'>' => {
                it.advance();
                break;
            }
            b'/' => {
                it.advance();
                if it.eat(b'>') {
                    tag.self_closing = true;
                    break;
                }
            }
            c if is_name_char(c) => {
                let mut name = String::new();
                while let Some(c) = it.peek().filter(|&c| is_name_char(c)) {
                    if name.len() < ATTRIBUTE_NAME_MAX_SIZE {
                        name.push(char::from(c.to_ascii_lowercase()));
                    }
                    it.advance();
                }
                skip_whitespace(it);
                let value = if it.eat(b'=') {
                    skip_whitespace(it);
                    Some(attribute_value(it))
                } else {
                    None
                };
                tag.attributes.push(Attribute { name, value });
            }
            _ => it.advance(),
        }
    }
    Some(tag)
}

fn attribute_value(it: &mut EncodedChars<'_>) -> (usize, usize) {
    match it.peek() {
        Some(quote @ (b'"' | b'\'')) => {
            it.advance();
            let begin = it.offset();
            let mut end = begin;
            while let Some(c) = it.peek() {
                if c == quote {
                    end = it.offset();
                    it.advance();
                    return (begin, end);
                }
                it.advance();
                end = it.offset();
            }
            (begin, end)
        }
        _ => {
            let begin = it.offset();
            while it.peek().is_some_and(|c| !c.is_ascii_whitespace() && c != b'>') {
                it.advance();
            }
            (begin, it.offset())
        }
    }
}

/// Index text that may contain entity references but no tags.
fn index_value(value: EncodedCharRange<'_>, meta: Option<MetaId>, sink: &mut dyn WordSink) {
    let mut word = WordBuffer::new();
    let mut it = value.iter();
    while let Some(c) = it.next() {
        let c = if c == b'&' { parse_entity(&mut it) } else { c };
        word.feed(c, sink, meta);
    }
    word.flush(sink, meta);
}

#[derive(Debug)]
struct StackEntry {
    element: &'static Element,
    suppressed: bool,
}

/// Open elements, innermost last.
#[derive(Debug, Default)]
struct ElementStack {
    entries: Vec<StackEntry>,
}

impl ElementStack {
    fn push(&mut self, element: &'static Element, suppressed: bool, sink: &mut dyn WordSink) {
        if suppressed {
            sink.suspend_indexing();
        }
        self.entries.push(StackEntry { element, suppressed });
    }

    fn pop(&mut self, sink: &mut dyn WordSink) -> Option<&'static Element> {
        let entry = self.entries.pop()?;
        if entry.suppressed {
            sink.resume_indexing();
        }
        Some(entry.element)
    }

    /// Pop open elements that the start tag `name` implicitly closes.
    fn close_implicit(&mut self, name: &str, sink: &mut dyn WordSink) {
        while let Some(top) = self.entries.last() {
            if top.element.end_tag != EndTag::Optional || !top.element.closers.contains(&name) {
                break;
            }
            self.pop(sink);
        }
    }

    /// Pop up to and including the innermost open `name`; no-op if not open.
    fn close(&mut self, name: &str, sink: &mut dyn WordSink) {
        if !self.entries.iter().any(|e| e.element.name == name) {
            return;
        }
        while let Some(element) = self.pop(sink) {
            if element.name == name {
                break;
            }
        }
    }

    fn clear(&mut self, sink: &mut dyn WordSink) {
        while self.pop(sink).is_some() {}
    }
}

struct HtmlTokenizer<'c> {
    config: &'c HtmlConfig,
    stack: ElementStack,
}

impl HtmlTokenizer<'_> {
    fn run(&mut self, range: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
        let mut word = WordBuffer::new();
        let mut it = range.iter();
        while let Some(c) = it.next() {
            match c {
                b'<' => {
                    if eat_comment_open(&mut it) {
                        word.flush(sink, None);
                        skip_comment(&mut it);
                    } else if let Some(tag) = parse_tag(&mut it) {
                        word.flush(sink, None);
                        self.handle_tag(&tag, &range, &mut it, sink);
                    } else {
                        word.feed(b'<', sink, None);
                    }
                }
                b'&' => {
                    let c = parse_entity(&mut it);
                    word.feed(c, sink, None);
                }
                _ => word.feed(c, sink, None),
            }
        }
        word.flush(sink, None);
        self.stack.clear(sink);
    }

    fn class_excluded(&self, tag: &Tag, range: &EncodedCharRange<'_>) -> bool {
        if self.config.excluded_classes.is_empty() {
            return false;
        }
        let Some(class) = tag.value(range, "class") else { return false };
        class
            .decode_to_string()
            .split_ascii_whitespace()
            .any(|c| self.config.excluded_classes.contains(&c.to_ascii_lowercase()))
    }

    fn handle_tag(
        &mut self,
        tag: &Tag,
        range: &EncodedCharRange<'_>,
        it: &mut EncodedChars<'_>,
        sink: &mut dyn WordSink,
    ) {
        if tag.is_end {
            self.stack.close(&tag.name, sink);
            return;
        }
        let Some(element) = element(&tag.name) else {
            tracing::trace!(tag = %tag.name, "Ignoring unknown tag");
            return;
        };
        self.stack.close_implicit(element.name, sink);

        let excluded = self.class_excluded(tag, range);
        let opens = element.end_tag != EndTag::Forbidden && !tag.self_closing;
        if opens {
            self.stack.push(element, excluded, sink);
        }
        if !excluded {
            Self::index_attributes(element, tag, range, sink);
        }
        if opens && matches!(element.name, "script" | "style") {
            skip_raw_text(it, element.name);
        }
    }

    fn index_attributes(
        element: &Element,
        tag: &Tag,
        range: &EncodedCharRange<'_>,
        sink: &mut dyn WordSink,
    ) {
        if let Some(title) = tag.value(range, "title") {
            index_value(title, None, sink);
        }
        let text_attribute = match element.name {
            "area" | "img" | "input" => Some("alt"),
            "object" => Some("standby"),
            "table" => Some("summary"),
            _ => None,
        };
        if let Some(value) = text_attribute.and_then(|name| tag.value(range, name)) {
            index_value(value, None, sink);
        }
        if element.name == "meta" {
            let (Some(name), Some(content)) =
                (tag.value(range, "name"), tag.value(range, "content"))
            else {
                return;
            };
            let name = name.decode_to_string().to_ascii_lowercase();
            match sink.field(name.trim()) {
                FieldMeta::Skip => {}
                FieldMeta::Index(meta) => index_value(content, meta, sink),
            }
        }
    }
}

/// Skip the raw text content of `script`/`style`, stopping before its end tag.
fn skip_raw_text(it: &mut EncodedChars<'_>, name: &str) {
    loop {
        let before = it.clone();
        match it.next() {
            None => return,
            Some(b'<') => {
                let mut look = it.clone();
                if look.eat(b'/')
                    && name
                        .bytes()
                        .all(|n| look.next().is_some_and(|c| c.to_ascii_lowercase() == n))
                {
                    *it = before;
                    return;
                }
            }
            Some(_) => {}
        }
    }
}

/// Index an HTML or XHTML document.
pub fn tokenize(range: EncodedCharRange<'_>, config: &HtmlConfig, sink: &mut dyn WordSink) {
    HtmlTokenizer { config, stack: ElementStack::default() }.run(range, sink);
}

/// The document's `<title>`, whitespace-collapsed and truncated to `max_size`.
pub fn find_title(range: EncodedCharRange<'_>, max_size: usize) -> Option<String> {
    let mut it = range.iter();
    while let Some(c) = it.next() {
        if c != b'<' {
            continue;
        }
        if eat_comment_open(&mut it) {
            skip_comment(&mut it);
            continue;
        }
        let Some(tag) = parse_tag(&mut it) else { continue };
        match (tag.is_end, tag.name.as_str()) {
            (false, "title") => {
                let mut title = Vec::new();
                while let Some(c) = it.peek().filter(|&c| c != b'<') {
                    it.advance();
                    let c = if c == b'&' { parse_entity(&mut it) } else { c };
                    title.push(c);
                }
                return collapse_title(&title, max_size);
            }
            (_, "body") | (true, "head") => return None,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;

    fn excluding(classes: &[&str]) -> HtmlConfig {
        HtmlConfig { excluded_classes: classes.iter().map(|c| (*c).to_string()).collect() }
    }

    fn words(html: &str, config: &HtmlConfig) -> RecordingSink {
        let mut sink = RecordingSink::default();
        tokenize(EncodedCharRange::new(html.as_bytes()), config, &mut sink);
        sink
    }

    #[test]
    fn test_text_between_tags() {
        let sink = words(
            "<html><body><h1>Heading</h1><p>Some <b>bold</b> text</p>",
            &HtmlConfig::default(),
        );
        assert_eq!(sink.all(), ["Heading", "Some", "bold", "text"]);
    }

    #[test]
    fn test_excluded_class_resumes_at_its_own_end_tag() {
        let sink = words(
            "<div class=ignore><span class=other>Hello</span></div>World",
            &excluding(&["ignore"]),
        );
        assert_eq!(sink.all(), ["World"]);
        assert_eq!(sink.suspended, 0);
    }

    #[test]
    fn test_excluded_class_one_of_many() {
        let sink = words(
            "<div class=\"nav IGNORE\">menu<div>inner</div>still</div>after",
            &excluding(&["ignore"]),
        );
        assert_eq!(sink.all(), ["after"]);
    }

    #[test]
    fn test_optional_end_tag_closed_implicitly() {
        let sink = words("<p>One<p>Two", &HtmlConfig::default());
        assert_eq!(sink.all(), ["One", "Two"]);

        // The second <p> closes the suppressed first one.
        let sink = words("<p class=ignore>One<p>Two", &excluding(&["ignore"]));
        assert_eq!(sink.all(), ["Two"]);
    }

    #[test]
    fn test_list_items_close_each_other() {
        let sink = words("<ul><li class=x>a1<li>b1</ul>c1", &excluding(&["x"]));
        assert_eq!(sink.all(), ["b1", "c1"]);
    }

    #[test]
    fn test_unclosed_suppression_is_balanced_at_end() {
        let sink = words("<div class=x>never closed", &excluding(&["x"]));
        assert!(sink.all().is_empty());
        assert_eq!(sink.suspended, 0);
    }

    #[test]
    fn test_comments_skipped() {
        let sink = words("before<!-- hidden -- still -- >after", &HtmlConfig::default());
        assert_eq!(sink.all(), ["before", "after"]);
        let sink = words("a<!---- x ---->b", &HtmlConfig::default());
        assert_eq!(sink.all(), ["a", "b"]);
    }

    #[test]
    fn test_entities() {
        let sink =
            words("caf&eacute; na&#239;ve &#x48;ello &bogus; x&amp;y", &HtmlConfig::default());
        assert_eq!(sink.all(), ["cafe", "naive", "Hello", "x&y"]);
    }

    #[test]
    fn test_overlong_entity_is_space() {
        let mut it = EncodedCharRange::new(b"verylongname;rest").iter();
        assert_eq!(parse_entity(&mut it), b' ');
        assert_eq!(it.offset(), 0);
    }

    #[test]
    fn test_attributes_indexed() {
        let sink = words(
            concat!(
                "<a title='Link Title' href=x>t</a>",
                "<img alt = \"Alt Text\" src=a.png>",
                "<table summary=Summary><tr><td>cell</td></tr></table>",
                "<object standby=Loading></object>",
                "<span alt=nope>s</span>",
            ),
            &HtmlConfig::default(),
        );
        assert_eq!(
            sink.all(),
            ["Link", "Title", "t", "Alt", "Text", "Summary", "cell", "Loading", "s"]
        );
    }

    #[test]
    fn test_meta_content_tagged() {
        let sink = words(
            "<meta name=\"Description\" content=\"Great stuff\"><meta http-equiv=x content=y>",
            &HtmlConfig::default(),
        );
        assert_eq!(sink.words_in("description"), ["Great", "stuff"]);
        assert_eq!(sink.all().len(), 2);
    }

    #[test]
    fn test_meta_excluded_name_skipped() {
        let mut sink = RecordingSink::default();
        sink.meta = crate::sink::MetaRegistry::new(crate::sink::MetaConfig {
            exclude: ["keywords".to_string()].into_iter().collect(),
            ..Default::default()
        });
        tokenize(
            EncodedCharRange::new(b"<meta name=keywords content=secret>body"),
            &HtmlConfig::default(),
            &mut sink,
        );
        assert_eq!(sink.all(), ["body"]);
    }

    #[test]
    fn test_script_and_style_skipped() {
        let sink = words(
            "<script>var x = '<b>';</script>shown<style>p { color: red }</STYLE>too",
            &HtmlConfig::default(),
        );
        assert_eq!(sink.all(), ["shown", "too"]);
    }

    #[test]
    fn test_overlong_tag_name_never_matches() {
        // "blockquotex" is longer than any known tag; it must not act as "blockquote".
        assert!(element(TAG_SENTINEL).is_none());
        let sink = words("<blockquotex class=x>text", &excluding(&["x"]));
        assert_eq!(sink.all(), ["text"]);
    }

    #[test]
    fn test_less_than_as_text() {
        let sink = words("a < b and 3<4", &HtmlConfig::default());
        assert_eq!(sink.all(), ["a", "b", "and", "3", "4"]);
    }

    #[test]
    fn test_xhtml_self_closing() {
        let sink = words("<div class=\"x\"/>visible<br/>more", &excluding(&["x"]));
        assert_eq!(sink.all(), ["visible", "more"]);
    }

    #[test]
    fn test_find_title() {
        let html = b"<html><head><!-- <title>no</title> --><title>\n  \
            The  Title &amp; More </title></head>";
        assert_eq!(
            find_title(EncodedCharRange::new(html), 100).as_deref(),
            Some("The Title & More")
        );
        assert_eq!(find_title(EncodedCharRange::new(html), 7).as_deref(), Some("The Tit"));
        assert_eq!(find_title(EncodedCharRange::new(b"<body><title>late</title>"), 100), None);
    }
}
