//! Encoded character ranges.
//!
//! An [`EncodedCharRange`] borrows a span of raw bytes together with the
//! charset and transfer encoding needed to read it. Iterating it yields
//! logical characters (decoded, transliterated to ASCII) while positions
//! stay physical byte offsets into the borrowed buffer, so tokenizers can
//! carve sub-ranges out of what they have scanned.

use std::cmp::Ordering;

use crate::charset::{Charset, Utf7State};
use crate::encoding::{Encoding, GroupCache, base64_byte, quoted_printable_byte};

/// Decoder caches for one iterator.
///
/// Both caches are keyed by physical position, so a stale entry is harmless
/// for sequential reads; [`DecodeContext::reset`] is for non-sequential jumps.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeContext {
    pub(crate) base64: GroupCache,
    pub(crate) utf7: Utf7State,
}

impl DecodeContext {
    /// Drop every cached group.
    pub const fn reset(&mut self) {
        self.base64.clear();
        self.utf7.clear();
    }
}

/// Transfer-decoded byte access used by the charset decoders.
pub(crate) struct TransferSource<'a, 'c> {
    pub(crate) buf: &'a [u8],
    pub(crate) begin: usize,
    pub(crate) end: usize,
    pub(crate) encoding: Encoding,
    pub(crate) cache: &'c mut GroupCache,
}

impl TransferSource<'_, '_> {
    /// The byte at physical `pos` after transfer decoding, and the position after it.
    #[inline]
    pub(crate) fn byte(&mut self, pos: usize) -> Option<(u8, usize)> {
        if pos >= self.end {
            return None;
        }
        match self.encoding {
            Encoding::Identity => Some((self.buf[pos], pos + 1)),
            Encoding::Base64 => base64_byte(self.buf, self.begin, pos, self.end, self.cache),
            Encoding::QuotedPrintable => quoted_printable_byte(self.buf, pos, self.end),
        }
    }

    /// Raw bytes, available only when physical and logical bytes coincide.
    pub(crate) fn raw(&self) -> Option<&[u8]> {
        (self.encoding == Encoding::Identity).then_some(self.buf)
    }
}

/// A borrowed `[begin, end)` span of bytes plus how to decode it.
#[derive(Debug, Clone, Copy)]
pub struct EncodedCharRange<'a> {
    buf: &'a [u8],
    begin: usize,
    end: usize,
    charset: Charset,
    encoding: Encoding,
}

impl<'a> EncodedCharRange<'a> {
    /// Range over the whole buffer with no decoding.
    pub const fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            begin: 0,
            end: buf.len(),
            charset: Charset::Raw,
            encoding: Encoding::Identity,
        }
    }

    /// Range over `buf[begin..end]`; bounds are clamped to the buffer.
    pub fn with_bounds(buf: &'a [u8], begin: usize, end: usize) -> Self {
        let end = end.min(buf.len());
        Self { begin: begin.min(end), end, ..Self::new(buf) }
    }

    #[must_use]
    pub const fn with_charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    #[must_use]
    pub const fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Same buffer and decoding, narrower bounds (clamped to this range).
    #[must_use]
    pub fn sub_range(&self, begin: usize, end: usize) -> Self {
        let end = end.clamp(self.begin, self.end);
        Self { begin: begin.clamp(self.begin, end), end, ..*self }
    }

    pub const fn begin(&self) -> usize {
        self.begin
    }

    pub const fn end(&self) -> usize {
        self.end
    }

    pub const fn charset(&self) -> Charset {
        self.charset
    }

    pub const fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub const fn is_empty(&self) -> bool {
        self.begin >= self.end
    }

    /// The whole underlying buffer.
    pub const fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// The physical (undecoded) bytes of this range.
    pub fn raw_bytes(&self) -> &'a [u8] {
        &self.buf[self.begin..self.end]
    }

    pub fn iter(&self) -> EncodedChars<'a> {
        self.iter_at(self.begin)
    }

    /// Iterator starting at physical position `pos` with a fresh context.
    pub fn iter_at(&self, pos: usize) -> EncodedChars<'a> {
        EncodedChars {
            range: *self,
            pos: pos.clamp(self.begin, self.end),
            ctx: DecodeContext::default(),
            peeked: None,
        }
    }

    /// Decode the whole range into a `String`.
    pub fn decode_to_string(&self) -> String {
        self.iter().map(char::from).collect()
    }
}

impl<'a> IntoIterator for EncodedCharRange<'a> {
    type Item = u8;
    type IntoIter = EncodedChars<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Stateful iterator over the logical characters of a range.
#[derive(Debug, Clone)]
pub struct EncodedChars<'a> {
    range: EncodedCharRange<'a>,
    pos: usize,
    ctx: DecodeContext,
    /// (position, character, next position) of the last peek.
    peeked: Option<(usize, u8, usize)>,
}

impl<'a> EncodedChars<'a> {
    /// Current physical position.
    pub const fn offset(&self) -> usize {
        self.pos
    }

    pub const fn at_end(&self) -> bool {
        self.pos >= self.range.end
    }

    pub const fn range(&self) -> EncodedCharRange<'a> {
        self.range
    }

    /// The range from the current position to the end.
    pub fn rest(&self) -> EncodedCharRange<'a> {
        self.range.sub_range(self.pos, self.range.end)
    }

    /// The character at the current position without consuming it.
    ///
    /// Reaching the end of meaningful input (e.g. trailing Base64 padding)
    /// moves the cursor to the physical end.
    pub fn peek(&mut self) -> Option<u8> {
        if let Some((at, c, _)) = self.peeked {
            if at == self.pos {
                return Some(c);
            }
        }
        let r = &self.range;
        match r.charset.decode(r.buf, r.begin, self.pos, r.end, r.encoding, &mut self.ctx) {
            Some((c, next)) => {
                debug_assert!(next > self.pos, "decoder failed to make progress");
                let next = next.clamp(self.pos + 1, r.end);
                self.peeked = Some((self.pos, c, next));
                Some(c)
            }
            None => {
                self.pos = r.end;
                self.peeked = None;
                None
            }
        }
    }

    /// Step past the current character.
    pub fn advance(&mut self) {
        if self.peek().is_some() {
            if let Some((_, _, next)) = self.peeked.take() {
                self.pos = next;
            }
        }
    }

    /// Consume the next character if it equals `c`.
    pub fn eat(&mut self, c: u8) -> bool {
        if self.peek() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Jump to a physical position. Jumps are non-sequential, so the decoder
    /// caches are reset.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.clamp(self.range.begin, self.range.end);
        self.peeked = None;
        self.ctx.reset();
    }

    /// Reset decoder caches without moving.
    pub const fn reset(&mut self) {
        self.ctx.reset();
        self.peeked = None;
    }
}

impl Iterator for EncodedChars<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.advance();
        Some(c)
    }
}

impl PartialEq for EncodedChars<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.pos == other.pos
    }
}

impl Eq for EncodedChars<'_> {}

impl PartialOrd for EncodedChars<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EncodedChars<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.pos.cmp(&other.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every decoder must reach the end in at most one step per byte.
    fn assert_terminates(bytes: &[u8], charset: Charset, encoding: Encoding) {
        let range = EncodedCharRange::new(bytes).with_charset(charset).with_encoding(encoding);
        let mut it = range.iter();
        let mut steps = 0;
        while !it.at_end() {
            let before = it.offset();
            if it.next().is_none() {
                break;
            }
            assert!(it.offset() > before, "{charset:?}/{encoding:?} stalled at {before}");
            steps += 1;
            assert!(steps <= bytes.len(), "{charset:?}/{encoding:?} did not terminate");
        }
        assert!(it.at_end());
    }

    #[test]
    fn test_forward_progress_on_malformed_input() {
        let inputs: Vec<Vec<u8>> = vec![
            vec![],
            vec![0xFF],
            vec![b'='],
            vec![b'+'],
            vec![0xC3],
            vec![0x80, 0x80, 0x80, 0x80],
            b"+AAAA+AAA+-=\r=\n==ZZ\xF8\x88\x80\x80\x80".to_vec(),
            (0..=255u8).collect(),
            (0..=255u8).rev().cycle().take(1000).collect(),
        ];
        let charsets = [
            Charset::Raw,
            Charset::Iso8859_1,
            Charset::Utf7,
            Charset::Utf8,
            Charset::Utf16Be,
            Charset::Utf16Le,
        ];
        let encodings = [Encoding::Identity, Encoding::Base64, Encoding::QuotedPrintable];
        for input in &inputs {
            for charset in charsets {
                for encoding in encodings {
                    assert_terminates(input, charset, encoding);
                }
            }
        }
    }

    #[test]
    fn test_default_range_is_pass_through() {
        let bytes = b"plain \xE9 text";
        let decoded: Vec<u8> = EncodedCharRange::new(bytes).iter().collect();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_sub_range_and_positions() {
        let bytes = b"0123456789";
        let range = EncodedCharRange::new(bytes);
        let sub = range.sub_range(2, 5);
        assert_eq!(sub.decode_to_string(), "234");
        let mut it = sub.iter();
        it.advance();
        assert_eq!(it.offset(), 3);
        assert_eq!(it.rest().decode_to_string(), "34");
        // Bounds stay inside the parent.
        assert_eq!(range.sub_range(8, 50).decode_to_string(), "89");
    }

    #[test]
    fn test_iterator_ordering_is_physical() {
        let range = EncodedCharRange::new(b"abc");
        let a = range.iter();
        let mut b = range.iter();
        assert_eq!(a, b);
        b.advance();
        assert!(a < b);
    }

    #[test]
    fn test_charset_over_transfer_encoding() {
        // "café" in UTF-8, quoted-printable encoded.
        let range = EncodedCharRange::new(b"caf=C3=A9")
            .with_charset(Charset::Utf8)
            .with_encoding(Encoding::QuotedPrintable);
        assert_eq!(range.decode_to_string(), "cafe");

        // "naïve" in UTF-8, base64 encoded.
        let range = EncodedCharRange::new(b"bmHDr3Zl")
            .with_charset(Charset::Utf8)
            .with_encoding(Encoding::Base64);
        assert_eq!(range.decode_to_string(), "naive");
    }

    #[test]
    fn test_seek_resets_cache() {
        let range = EncodedCharRange::new(b"SGVsbG8=").with_encoding(Encoding::Base64);
        let mut it = range.iter();
        assert_eq!(it.next(), Some(b'H'));
        it.seek(4);
        assert_eq!(it.collect::<Vec<_>>(), b"lo");
    }
}
