//! Transfer-encoding decoders (RFC 2045 Base64 and Quoted-Printable).

/// Content transfer encoding of a byte range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// 7bit, 8bit, or no encoding at all.
    #[default]
    Identity,
    Base64,
    QuotedPrintable,
}

impl Encoding {
    /// Resolve a `Content-Transfer-Encoding` value.
    ///
    /// `binary` and unknown encodings return `None`: such parts are not indexed.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "7bit" | "8bit" | "identity" | "" => Some(Self::Identity),
            "base64" => Some(Self::Base64),
            "quoted-printable" => Some(Self::QuotedPrintable),
            _ => None,
        }
    }
}

/// One decoded group: up to 3 characters produced from a run of physical
/// bytes starting at `start`. Character `i` occupies `[starts[i], starts[i+1])`,
/// the last one runs to `end`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct GroupCache {
    valid: bool,
    start: usize,
    end: usize,
    starts: [usize; 3],
    chars: [u8; 3],
    len: usize,
}

impl GroupCache {
    pub(crate) const fn filled(
        start: usize,
        starts: [usize; 3],
        chars: [u8; 3],
        len: usize,
        end: usize,
    ) -> Self {
        Self { valid: true, start, end, starts, chars, len }
    }

    /// The cached character covering `pos` and the position after it.
    pub(crate) fn lookup(&self, pos: usize) -> Option<(u8, usize)> {
        if !self.valid || self.len == 0 || pos < self.start || pos >= self.end {
            return None;
        }
        let mut i = 0;
        while i + 1 < self.len && self.starts[i + 1] <= pos {
            i += 1;
        }
        let next = if i + 1 < self.len { self.starts[i + 1] } else { self.end };
        Some((self.chars[i], next))
    }

    /// True if the last decoded group ended exactly at `pos`.
    pub(crate) const fn ends_at(&self, pos: usize) -> bool {
        self.valid && self.end == pos
    }

    pub(crate) const fn clear(&mut self) {
        self.valid = false;
    }
}

/// Bound on the backward scan for a Base64 line start.
const BASE64_LINE_MAX: usize = 4096;

#[inline]
const fn base64_sextet(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'a'..=b'z' => Some(b - b'a' + 26),
        b'0'..=b'9' => Some(b - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

#[inline]
const fn is_line_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// Start of the 4-character group containing `pos`, found by rounding the
/// offset from the enclosing line's start.
fn base64_aligned(buf: &[u8], begin: usize, pos: usize) -> usize {
    let floor = begin.max(pos.saturating_sub(BASE64_LINE_MAX));
    let mut line_start = pos;
    while line_start > floor && !is_line_space(buf[line_start - 1]) {
        line_start -= 1;
    }
    line_start + (pos - line_start) / 4 * 4
}

/// Decode the group starting at `start`; returns (bytes, count, group end).
/// Characters outside the alphabet are skipped.
fn base64_group(buf: &[u8], start: usize, end: usize) -> ([u8; 3], usize, usize) {
    let mut sextets = [0u8; 4];
    let mut n = 0;
    let mut pads = 0;
    let mut i = start;
    while i < end && n + pads < 4 {
        let b = buf[i];
        if is_line_space(b) {
            break;
        }
        i += 1;
        if b == b'=' {
            pads += 1;
        } else if pads == 0 {
            if let Some(v) = base64_sextet(b) {
                sextets[n] = v;
                n += 1;
            }
        }
    }
    let bits = (u32::from(sextets[0]) << 18)
        | (u32::from(sextets[1]) << 12)
        | (u32::from(sextets[2]) << 6)
        | u32::from(sextets[3]);
    let bytes = [(bits >> 16) as u8, (bits >> 8) as u8, bits as u8];
    let count = match n {
        4 => 3,
        3 => 2,
        2 => 1,
        _ => 0,
    };
    (bytes, count, i)
}

/// Decode the Base64 byte at `pos`.
///
/// Sequential reads continue from where the previous group ended; a cold
/// read re-derives the group from the line start. Both agree on any position
/// a sequential read can land on.
pub(crate) fn base64_byte(
    buf: &[u8],
    begin: usize,
    pos: usize,
    end: usize,
    cache: &mut GroupCache,
) -> Option<(u8, usize)> {
    let mut target = pos;
    let mut forced: Option<usize> = None;
    loop {
        if target >= end {
            return None;
        }
        if let Some(hit) = cache.lookup(target) {
            return Some(hit);
        }
        if base64_sextet(buf[target]).is_none() {
            target += 1;
            forced = None;
            continue;
        }
        let group_start = match forced {
            Some(start) => start,
            None if cache.ends_at(target) => target,
            None => base64_aligned(buf, begin, target),
        };
        let (bytes, count, group_end) = base64_group(buf, group_start, end);
        if group_end <= target {
            // Skipped garbage shifted the grouping; walk forward group by group.
            forced = Some(group_end);
            cache.clear();
            continue;
        }
        if count == 0 {
            target = group_end;
            forced = None;
            cache.clear();
            continue;
        }
        *cache = GroupCache::filled(
            group_start,
            [group_start, group_start + 1, group_start + 2],
            bytes,
            count,
            group_end,
        );
        if let Some(hit) = cache.lookup(target) {
            return Some(hit);
        }
        target = group_end;
    }
}

#[inline]
const fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'A'..=b'F' => Some(b - b'A' + 10),
        b'a'..=b'f' => Some(b - b'a' + 10),
        _ => None,
    }
}

/// Decode the Quoted-Printable byte at `pos`. Soft line breaks (optionally
/// preceded by transport padding) are elided.
pub(crate) fn quoted_printable_byte(buf: &[u8], pos: usize, end: usize) -> Option<(u8, usize)> {
    let mut pos = pos;
    loop {
        if pos >= end {
            return None;
        }
        if buf[pos] != b'=' {
            return Some((buf[pos], pos + 1));
        }
        let mut after = pos + 1;
        while after < end && matches!(buf[after], b' ' | b'\t') {
            after += 1;
        }
        if after >= end {
            return None;
        }
        match buf[after] {
            b'\n' => {
                pos = after + 1;
                continue;
            }
            b'\r' => {
                pos = if after + 1 < end && buf[after + 1] == b'\n' {
                    after + 2
                } else {
                    after + 1
                };
                continue;
            }
            _ => {}
        }
        if pos + 2 >= end {
            return Some((b' ', end));
        }
        return match (hex_value(buf[pos + 1]), hex_value(buf[pos + 2])) {
            (Some(hi), Some(lo)) => Some(((hi << 4) | lo, pos + 3)),
            _ => Some((b' ', pos + 3)),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoded::EncodedCharRange;

    fn decode_all(bytes: &[u8], encoding: Encoding) -> Vec<u8> {
        EncodedCharRange::new(bytes).with_encoding(encoding).iter().collect()
    }

    #[test]
    fn test_quoted_printable_soft_break() {
        assert_eq!(decode_all(b"abc=\r\ndef", Encoding::QuotedPrintable), b"abcdef");
        assert_eq!(decode_all(b"abc=\ndef", Encoding::QuotedPrintable), b"abcdef");
        assert_eq!(decode_all(b"abc=  \r\ndef", Encoding::QuotedPrintable), b"abcdef");
    }

    #[test]
    fn test_quoted_printable_hex_escape() {
        assert_eq!(decode_all(b"caf=E9 =3D", Encoding::QuotedPrintable), b"caf\xE9 =");
    }

    #[test]
    fn test_quoted_printable_malformed_escape() {
        assert_eq!(decode_all(b"a=ZZb", Encoding::QuotedPrintable), b"a b");
        assert_eq!(decode_all(b"a=4", Encoding::QuotedPrintable), b"a ");
    }

    #[test]
    fn test_base64_basic() {
        assert_eq!(decode_all(b"SGVsbG8gd29ybGQ=", Encoding::Base64), b"Hello world");
        assert_eq!(decode_all(b"SGk=", Encoding::Base64), b"Hi");
        assert_eq!(decode_all(b"SA==", Encoding::Base64), b"H");
    }

    #[test]
    fn test_base64_multiline_and_garbage() {
        assert_eq!(decode_all(b"SGVs\r\nbG8=\r\n", Encoding::Base64), b"Hello");
        assert_eq!(decode_all(b"SG*Vs", Encoding::Base64), b"Hel");
    }

    #[test]
    fn test_base64_random_access_matches_sequential() {
        let bytes = b"VGhlIHF1aWNr\nIGJyb3duIGZv\neCBqdW1wcw==\n";
        let range = EncodedCharRange::new(bytes).with_encoding(Encoding::Base64);
        let mut it = range.iter();
        let mut seen = Vec::new();
        while let Some(c) = it.peek() {
            seen.push((it.offset(), c));
            it.advance();
        }
        let text: Vec<u8> = seen.iter().map(|&(_, c)| c).collect();
        assert_eq!(text, b"The quick brown fox jumps");
        for (pos, c) in seen {
            assert_eq!(range.iter_at(pos).peek(), Some(c), "position {pos}");
        }
    }

    #[test]
    fn test_encoding_from_name() {
        assert_eq!(Encoding::from_name("Base64"), Some(Encoding::Base64));
        assert_eq!(Encoding::from_name(" 7bit "), Some(Encoding::Identity));
        assert_eq!(Encoding::from_name("binary"), None);
    }
}
