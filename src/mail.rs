//! Mail and MIME tokenizer.
//!
//! Header values are indexed tagged with their (lower-cased) header name.
//! Bodies are dispatched on `Content-Type`: plain, enriched and HTML text are
//! tokenized, `multipart/*` bodies are split on their boundary and each part
//! handled recursively, `message/rfc822` re-enters header parsing, vCards
//! index their fields, and configured external filters handle the rest.

use crate::charset::Charset;
use crate::encoded::EncodedCharRange;
use crate::encoding::Encoding;
use crate::filter::FilterSet;
use crate::format::collapse_title;
use crate::html::{self, HtmlConfig};
use crate::sink::{FieldMeta, WordSink};
use crate::word::{WordBuffer, index_text, index_words};

/// Longest RFC 2047 encoded word considered.
const ENCODED_WORD_MAX_SIZE: usize = 256;

/// Longest text/enriched formatting command kept.
const ENRICHED_COMMAND_MAX_SIZE: usize = 60;

fn line_end(buf: &[u8], from: usize, end: usize) -> usize {
    buf[from..end].iter().position(|&c| c == b'\n').map_or(end, |i| from + i)
}

fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn is_blank(line: &[u8]) -> bool {
    line.iter().all(u8::is_ascii_whitespace)
}

/// One header: physical spans of its name and (possibly folded) value.
#[derive(Debug, Clone, Copy)]
struct Header {
    name: (usize, usize),
    value: (usize, usize),
}

/// Iterates the headers of a message or body part.
struct HeaderParser<'a> {
    buf: &'a [u8],
    pos: usize,
    end: usize,
    done: bool,
}

impl<'a> HeaderParser<'a> {
    fn new(buf: &'a [u8], begin: usize, end: usize) -> Self {
        Self { buf, pos: begin, end, done: false }
    }

    /// Where the body starts, once `next` has returned `None`.
    const fn body_start(&self) -> usize {
        self.pos
    }

    fn name(&self, header: &Header) -> String {
        String::from_utf8_lossy(&self.buf[header.name.0..header.name.1]).to_ascii_lowercase()
    }

    fn value(&self, header: &Header) -> String {
        String::from_utf8_lossy(&self.buf[header.value.0..header.value.1]).into_owned()
    }
}

impl Iterator for HeaderParser<'_> {
    type Item = Header;

    fn next(&mut self) -> Option<Header> {
        let buf = self.buf;
        while !self.done && self.pos < self.end {
            let start = self.pos;
            let eol = line_end(buf, start, self.end);
            let line = trim_cr(&buf[start..eol]);
            let next_line = (eol + 1).min(self.end);

            if is_blank(line) {
                self.pos = next_line;
                self.done = true;
                return None;
            }
            // Envelope line of an mbox message.
            if line.starts_with(b"From ") {
                self.pos = next_line;
                continue;
            }
            let name = line.iter().position(|&c| c == b':').and_then(|colon| {
                let name = &line[..colon];
                let trimmed = name.trim_ascii();
                (!trimmed.is_empty() && !trimmed.iter().any(u8::is_ascii_whitespace))
                    .then_some((colon, trimmed.len()))
            });
            let Some((colon, name_len)) = name else {
                self.pos = next_line;
                continue;
            };
            let name_begin = start + line.iter().take_while(|c| c.is_ascii_whitespace()).count();

            let value_begin = start + colon + 1;
            let mut value_end = start + line.len();
            let mut pos = next_line;
            while pos < self.end && matches!(buf[pos], b' ' | b'\t') {
                let eol = line_end(buf, pos, self.end);
                let line = trim_cr(&buf[pos..eol]);
                if is_blank(line) {
                    break;
                }
                value_end = pos + line.len();
                pos = (eol + 1).min(self.end);
            }
            self.pos = pos;
            return Some(Header {
                name: (name_begin, name_begin + name_len),
                value: (value_begin, value_end.max(value_begin)),
            });
        }
        self.done = true;
        None
    }
}

/// A decoded RFC 2047 `=?charset?B|Q?text?=` word.
#[derive(Debug)]
struct EncodedWord {
    charset: Charset,
    encoding: Encoding,
    underscore_is_space: bool,
    text: (usize, usize),
    end: usize,
}

fn encoded_word(buf: &[u8], pos: usize, end: usize) -> Option<EncodedWord> {
    let limit = end.min(pos + ENCODED_WORD_MAX_SIZE);
    let window = buf.get(pos..limit)?;
    let rest = window.strip_prefix(b"=?")?;
    let q1 = rest.iter().position(|&c| c == b'?')?;
    let charset_name = String::from_utf8_lossy(&rest[..q1]);
    let charset_name = charset_name.split('*').next().unwrap_or_default();
    let (&kind, after) = rest[q1 + 1..].split_first()?;
    let after = after.strip_prefix(b"?")?;
    let text_len = after.windows(2).position(|w| w == b"?=")?;

    let (encoding, underscore_is_space) = match kind.to_ascii_uppercase() {
        b'B' => (Encoding::Base64, false),
        b'Q' => (Encoding::QuotedPrintable, true),
        _ => return None,
    };
    let text_begin = pos + 2 + q1 + 3;
    Some(EncodedWord {
        charset: Charset::from_name(charset_name).unwrap_or_default(),
        encoding,
        underscore_is_space,
        text: (text_begin, text_begin + text_len),
        end: text_begin + text_len + 2,
    })
}

/// A header value's text with RFC 2047 encoded words decoded.
fn decode_header_value(value: EncodedCharRange<'_>) -> Vec<u8> {
    let buf = value.buffer();
    let mut out = Vec::new();
    let mut it = value.iter();
    while !it.at_end() {
        let at = it.offset();
        if buf[at] == b'=' {
            if let Some(word) = encoded_word(buf, at, value.end()) {
                let text = value
                    .sub_range(word.text.0, word.text.1)
                    .with_charset(word.charset)
                    .with_encoding(word.encoding);
                let mut chars = text.iter();
                loop {
                    let raw = chars.offset();
                    let Some(c) = chars.next() else { break };
                    let c = if word.underscore_is_space && buf[raw] == b'_' { b' ' } else { c };
                    out.push(c);
                }
                it.seek(word.end);
                continue;
            }
        }
        match it.next() {
            Some(c) => out.push(c),
            None => break,
        }
    }
    out
}

/// What a part's body contains.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Plain,
    Enriched,
    Html,
    Multipart(Vec<u8>),
    Rfc822,
    Vcard,
    Filtered(String),
    Unindexable(String),
}

#[derive(Debug, Clone)]
struct Part {
    content: Content,
    /// `None` for binary and unknown transfer encodings
    encoding: Option<Encoding>,
    charset: Charset,
}

impl Default for Part {
    fn default() -> Self {
        Self { content: Content::Plain, encoding: Some(Encoding::Identity), charset: Charset::Raw }
    }
}

/// Split `type/subtype; name=value; ...` into the lower-cased type and its
/// parameters (names lower-cased, values unquoted).
fn split_parameters(value: &str) -> (String, Vec<(String, String)>) {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in value.chars() {
        match ch {
            '"' => {
                quoted = !quoted;
                current.push(ch);
            }
            ';' if !quoted => pieces.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    pieces.push(current);

    let mut pieces = pieces.into_iter();
    let mime = pieces.next().unwrap_or_default().trim().to_ascii_lowercase();
    let parameters = pieces
        .filter_map(|p| {
            let (name, value) = p.split_once('=')?;
            Some((name.trim().to_ascii_lowercase(), value.trim().trim_matches('"').to_string()))
        })
        .collect();
    (mime, parameters)
}

/// Tokenizer state for one message: the open multipart boundaries.
pub struct MailTokenizer<'c> {
    html: &'c HtmlConfig,
    filters: &'c FilterSet,
    boundaries: Vec<Vec<u8>>,
}

impl<'c> MailTokenizer<'c> {
    pub const fn new(html: &'c HtmlConfig, filters: &'c FilterSet) -> Self {
        Self { html, filters, boundaries: Vec::new() }
    }

    /// Number of multipart bodies currently being scanned.
    pub fn boundary_depth(&self) -> usize {
        self.boundaries.len()
    }

    /// Index a message or an mbox file of messages.
    pub fn tokenize(&mut self, range: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
        self.boundaries.clear();
        for (begin, end) in mbox_messages(range) {
            self.message(range.sub_range(begin, end), sink);
        }
    }

    fn content_type(&self, value: &str, part: &mut Part) {
        let (mime, parameters) = split_parameters(value);
        let parameter = |name: &str| {
            parameters.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
        };
        if let Some(charset) = parameter("charset") {
            // Unknown charsets pass their bytes through; ASCII words still index.
            part.charset = Charset::from_name(charset).unwrap_or_default();
        }
        part.content = match mime.as_str() {
            "" | "text/plain" => Content::Plain,
            "text/enriched" | "text/richtext" => Content::Enriched,
            "text/html" => Content::Html,
            "message/rfc822" => Content::Rfc822,
            "text/x-vcard" | "text/vcard" | "text/directory" => Content::Vcard,
            m if m.starts_with("multipart/") => match parameter("boundary") {
                Some(b) if !b.is_empty() => Content::Multipart(b.as_bytes().to_vec()),
                _ => Content::Unindexable(mime.clone()),
            },
            m if self.filters.find(m).is_some() => Content::Filtered(mime.clone()),
            _ => Content::Unindexable(mime.clone()),
        };
    }

    /// Headers, then body, of a message or body part.
    fn message(&mut self, range: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
        let mut headers = HeaderParser::new(range.buffer(), range.begin(), range.end());
        let mut part = Part::default();
        while let Some(header) = headers.next() {
            let name = headers.name(&header);
            match name.as_str() {
                "content-transfer-encoding" => {
                    part.encoding = Encoding::from_name(&headers.value(&header));
                }
                "content-type" => self.content_type(&headers.value(&header), &mut part),
                _ => {
                    if let FieldMeta::Index(meta) = sink.field(&name) {
                        let value = range
                            .sub_range(header.value.0, header.value.1)
                            .with_charset(Charset::Iso8859_1);
                        index_text(&decode_header_value(value), meta, sink);
                    }
                }
            }
        }
        let body = range.sub_range(headers.body_start(), range.end());
        self.body(body, &part, sink);
    }

    fn body(&mut self, body: EncodedCharRange<'_>, part: &Part, sink: &mut dyn WordSink) {
        let Some(encoding) = part.encoding else {
            tracing::debug!("Skipping part with binary or unknown transfer encoding");
            return;
        };
        let text = body.with_charset(part.charset).with_encoding(encoding);
        match &part.content {
            Content::Plain => index_words(text, None, sink),
            Content::Enriched => enriched(text, sink),
            Content::Html => html::tokenize(text, self.html, sink),
            Content::Multipart(boundary) => {
                with_transfer_decoded(body, encoding, |raw| self.multipart(raw, boundary, sink));
            }
            Content::Rfc822 => with_transfer_decoded(body, encoding, |raw| self.message(raw, sink)),
            Content::Vcard => {
                let charset =
                    if part.charset == Charset::Raw { Charset::Utf8 } else { part.charset };
                with_transfer_decoded(body, encoding, |raw| vcard(raw, charset, sink));
            }
            Content::Filtered(mime) => {
                let Some(filter) = self.filters.find(mime) else { return };
                let decoded: Vec<u8> = body.with_encoding(encoding).iter().collect();
                match filter.run(&decoded) {
                    Ok(output) => {
                        let text = EncodedCharRange::new(&output).with_charset(Charset::Utf8);
                        index_words(text, None, sink);
                    }
                    Err(e) => {
                        tracing::warn!(mime = %mime, error = %e, "Filter failed; part not indexed");
                    }
                }
            }
            Content::Unindexable(mime) => {
                tracing::debug!(mime = %mime, "Skipping unindexable part");
            }
        }
    }

    fn multipart(&mut self, body: EncodedCharRange<'_>, boundary: &[u8], sink: &mut dyn WordSink) {
        self.boundaries.push(boundary.to_vec());
        self.parts(body, sink);
        self.boundaries.pop();
    }

    /// Tokenize each part between lines matching the innermost boundary.
    fn parts(&mut self, body: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
        let Some(boundary) = self.boundaries.last().cloned() else { return };
        let buf = body.buffer();
        let end = body.end();
        let mut part_start: Option<usize> = None;
        let mut pos = body.begin();
        while pos < end {
            let eol = line_end(buf, pos, end);
            let line = trim_cr(&buf[pos..eol]).trim_ascii_end();
            let delimiter = line
                .strip_prefix(b"--")
                .and_then(|rest| rest.strip_prefix(boundary.as_slice()))
                .filter(|rest| rest.is_empty() || rest.starts_with(b"--"));
            if let Some(rest) = delimiter {
                if let Some(start) = part_start.take() {
                    let part_end = if pos > start && buf[pos - 1] == b'\n' {
                        if pos - 1 > start && buf[pos - 2] == b'\r' { pos - 2 } else { pos - 1 }
                    } else {
                        pos
                    };
                    self.message(EncodedCharRange::with_bounds(buf, start, part_end), sink);
                }
                if rest.starts_with(b"--") {
                    return;
                }
                part_start = Some((eol + 1).min(end));
            }
            pos = eol + 1;
        }
        if let Some(start) = part_start {
            self.message(EncodedCharRange::with_bounds(buf, start, end), sink);
        }
    }
}

/// Run `f` over the body with its transfer encoding removed, so headers and
/// boundaries inside can be parsed as plain bytes.
fn with_transfer_decoded<R>(
    body: EncodedCharRange<'_>,
    encoding: Encoding,
    f: impl FnOnce(EncodedCharRange<'_>) -> R,
) -> R {
    if encoding == Encoding::Identity {
        return f(body);
    }
    let decoded: Vec<u8> = body.with_encoding(encoding).iter().collect();
    f(EncodedCharRange::new(&decoded))
}

/// vCard fields are header-like lines; each is indexed under its type name.
fn vcard(body: EncodedCharRange<'_>, charset: Charset, sink: &mut dyn WordSink) {
    let buf = body.buffer();
    let mut pos = body.begin();
    while pos < body.end() {
        let mut fields = HeaderParser::new(buf, pos, body.end());
        while let Some(field) = fields.next() {
            let name = fields.name(&field);
            let name = name.split(';').next().unwrap_or_default();
            let name = name.rsplit('.').next().unwrap_or_default().trim();
            if matches!(name, "begin" | "end" | "version" | "photo" | "logo" | "sound" | "key") {
                continue;
            }
            if let FieldMeta::Index(meta) = sink.field(name) {
                let value = body.sub_range(field.value.0, field.value.1).with_charset(charset);
                index_text(&decode_header_value(value), meta, sink);
            }
        }
        let next = fields.body_start();
        if next <= pos {
            break;
        }
        pos = next;
    }
}

/// text/enriched: formatting commands are dropped, `<<` is a literal `<`,
/// and `<param>` arguments are skipped.
fn enriched(text: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
    let mut word = WordBuffer::new();
    let mut it = text.iter();
    while let Some(c) = it.next() {
        if c != b'<' {
            word.feed(c, sink, None);
            continue;
        }
        word.flush(sink, None);
        if it.eat(b'<') {
            continue;
        }
        let is_end = it.eat(b'/');
        let mut name = String::new();
        for c in it.by_ref() {
            if c == b'>' {
                break;
            }
            if name.len() < ENRICHED_COMMAND_MAX_SIZE {
                name.push(char::from(c.to_ascii_lowercase()));
            }
        }
        if !is_end && name == "param" {
            while let Some(c) = it.next() {
                if c == b'<'
                    && b"/param>"
                        .iter()
                        .all(|&p| it.next().is_some_and(|c| c.to_ascii_lowercase() == p))
                {
                    break;
                }
            }
        }
    }
    word.flush(sink, None);
}

/// Message spans of an mbox file: a new message starts at each `From ` line
/// that begins the file or follows a blank line.
fn mbox_messages(range: EncodedCharRange<'_>) -> Vec<(usize, usize)> {
    let (buf, begin, end) = (range.buffer(), range.begin(), range.end());
    if !buf[begin..end].starts_with(b"From ") {
        return vec![(begin, end)];
    }
    let mut starts = vec![begin];
    let mut previous_blank = false;
    let mut pos = begin;
    while pos < end {
        let eol = line_end(buf, pos, end);
        let line = trim_cr(&buf[pos..eol]);
        if pos != begin && previous_blank && line.starts_with(b"From ") {
            starts.push(pos);
        }
        previous_blank = is_blank(line);
        pos = eol + 1;
    }
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| (start, starts.get(i + 1).copied().unwrap_or(end)))
        .collect()
}

/// Index a mail message (or mbox file).
pub fn tokenize(
    range: EncodedCharRange<'_>,
    html: &HtmlConfig,
    filters: &FilterSet,
    sink: &mut dyn WordSink,
) {
    MailTokenizer::new(html, filters).tokenize(range, sink);
}

/// The message's decoded `Subject`.
pub fn find_title(range: EncodedCharRange<'_>, max_size: usize) -> Option<String> {
    let mut headers = HeaderParser::new(range.buffer(), range.begin(), range.end());
    while let Some(header) = headers.next() {
        if headers.name(&header) == "subject" {
            let value =
                range.sub_range(header.value.0, header.value.1).with_charset(Charset::Iso8859_1);
            return collapse_title(&decode_header_value(value), max_size);
        }
    }
    None
}
