//! Character-set decoders.
//!
//! Each decoder reads one character starting at a physical position and
//! returns its nearest 7-bit ASCII approximation together with the physical
//! position just past it. Malformed input never stalls: the worst case is a
//! space and a one-byte advance.

use crate::encoded::{DecodeContext, TransferSource};
use crate::encoding::{Encoding, GroupCache};

/// Character set of a byte range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Charset {
    /// US-ASCII or unknown: bytes pass through untouched.
    #[default]
    Raw,
    Iso8859_1,
    Utf7,
    Utf8,
    Utf16Be,
    Utf16Le,
}

impl Charset {
    /// Resolve a MIME `charset=` value (case-insensitive).
    ///
    /// Returns `None` for names not listed here. Callers choose the fallback:
    /// mail parts read such content as [`Charset::Raw`], and the CLI rejects
    /// the name.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().trim_matches('"').to_ascii_lowercase();
        match name.as_str() {
            "us-ascii" | "ascii" | "ansi_x3.4-1968" => Some(Self::Raw),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" | "windows-1252" | "cp1252" => {
                Some(Self::Iso8859_1)
            }
            "utf-7" | "utf7" => Some(Self::Utf7),
            "utf-8" | "utf8" => Some(Self::Utf8),
            "utf-16" | "utf-16be" | "utf16be" | "ucs-2" => Some(Self::Utf16Be),
            "utf-16le" | "utf16le" => Some(Self::Utf16Le),
            _ => None,
        }
    }

    /// Decode one character at `pos`.
    pub(crate) fn decode(
        self,
        buf: &[u8],
        begin: usize,
        pos: usize,
        end: usize,
        encoding: Encoding,
        ctx: &mut DecodeContext,
    ) -> Option<(u8, usize)> {
        if pos >= end {
            return None;
        }
        if self == Self::Utf7 {
            // UTF-7 is already mail-safe; a transfer encoding on top of it is ignored.
            return Some(utf7_to_ascii(buf, begin, pos, end, &mut ctx.utf7));
        }
        let mut src = TransferSource { buf, begin, end, encoding, cache: &mut ctx.base64 };
        match self {
            Self::Raw => src.byte(pos),
            Self::Iso8859_1 => src.byte(pos).map(|(b, next)| (iso8859_1_to_ascii(b), next)),
            Self::Utf8 => utf8_to_ascii(&mut src, pos),
            Self::Utf16Be => utf16_to_ascii(&mut src, pos, true),
            Self::Utf16Le => utf16_to_ascii(&mut src, pos, false),
            Self::Utf7 => None,
        }
    }
}

/// Latin-1 to ASCII transliteration. Entries 0x80-0x9F carry the Windows-1252
/// punctuation that commonly leaks into "Latin-1" documents.
static LATIN1_TO_ASCII: [u8; 256] = {
    let mut t = [b' '; 256];
    let mut i = 0;
    while i < 0x80 {
        t[i] = i as u8;
        i += 1;
    }
    t[0x91] = b'\'';
    t[0x92] = b'\'';
    t[0x93] = b'"';
    t[0x94] = b'"';
    t[0x96] = b'-';
    t[0x97] = b'-';

    t[0xA1] = b'!';
    t[0xA2] = b'c';
    t[0xA3] = b'L';
    t[0xA5] = b'Y';
    t[0xA6] = b'|';
    t[0xA9] = b'C';
    t[0xAA] = b'a';
    t[0xAB] = b'"';
    t[0xAD] = b'-';
    t[0xAE] = b'R';
    t[0xB2] = b'2';
    t[0xB3] = b'3';
    t[0xB4] = b'\'';
    t[0xB5] = b'u';
    t[0xB9] = b'1';
    t[0xBA] = b'o';
    t[0xBB] = b'"';
    t[0xBF] = b'?';

    let mut i = 0xC0;
    while i <= 0xC6 {
        t[i] = b'A';
        i += 1;
    }
    t[0xC7] = b'C';
    let mut i = 0xC8;
    while i <= 0xCB {
        t[i] = b'E';
        i += 1;
    }
    let mut i = 0xCC;
    while i <= 0xCF {
        t[i] = b'I';
        i += 1;
    }
    t[0xD0] = b'D';
    t[0xD1] = b'N';
    let mut i = 0xD2;
    while i <= 0xD6 {
        t[i] = b'O';
        i += 1;
    }
    t[0xD7] = b'x';
    t[0xD8] = b'O';
    let mut i = 0xD9;
    while i <= 0xDC {
        t[i] = b'U';
        i += 1;
    }
    t[0xDD] = b'Y';
    t[0xDE] = b'T';
    t[0xDF] = b's';

    let mut i = 0xE0;
    while i <= 0xE6 {
        t[i] = b'a';
        i += 1;
    }
    t[0xE7] = b'c';
    let mut i = 0xE8;
    while i <= 0xEB {
        t[i] = b'e';
        i += 1;
    }
    let mut i = 0xEC;
    while i <= 0xEF {
        t[i] = b'i';
        i += 1;
    }
    t[0xF0] = b'd';
    t[0xF1] = b'n';
    let mut i = 0xF2;
    while i <= 0xF6 {
        t[i] = b'o';
        i += 1;
    }
    t[0xF8] = b'o';
    let mut i = 0xF9;
    while i <= 0xFC {
        t[i] = b'u';
        i += 1;
    }
    t[0xFD] = b'y';
    t[0xFE] = b't';
    t[0xFF] = b'y';
    t
};

/// Transliterate an ISO-8859-1 byte.
#[inline]
pub fn iso8859_1_to_ascii(b: u8) -> u8 {
    LATIN1_TO_ASCII[b as usize]
}

/// Transliterate a Unicode code point; space when there is no equivalent.
pub fn unicode_to_ascii(cp: u32) -> u8 {
    match cp {
        0..=0xFF => LATIN1_TO_ASCII[cp as usize],
        0x2010..=0x2015 => b'-',
        0x2018 | 0x2019 | 0x201A | 0x201B => b'\'',
        0x201C | 0x201D | 0x201E | 0x201F => b'"',
        _ => b' ',
    }
}

/// Number of trailing bytes after a UTF-8 lead byte: -1 for a continuation
/// byte, -2 for the two bytes that never appear in UTF-8.
static UTF8_TRAILING: [i8; 256] = {
    let mut t = [0i8; 256];
    let mut i = 0x80;
    while i < 0xC0 {
        t[i] = -1;
        i += 1;
    }
    while i < 0xE0 {
        t[i] = 1;
        i += 1;
    }
    while i < 0xF0 {
        t[i] = 2;
        i += 1;
    }
    while i < 0xF8 {
        t[i] = 3;
        i += 1;
    }
    while i < 0xFC {
        t[i] = 4;
        i += 1;
    }
    while i < 0xFE {
        t[i] = 5;
        i += 1;
    }
    t[0xFE] = -2;
    t[0xFF] = -2;
    t
};

const UTF8_OFFSETS: [u32; 6] =
    [0x0000_0000, 0x0000_3080, 0x000E_2080, 0x03C8_2080, 0xFA08_2080, 0x8208_2080];

#[inline]
const fn is_utf8_continuation(b: u8) -> bool {
    b & 0xC0 == 0x80
}

fn utf8_to_ascii(src: &mut TransferSource<'_, '_>, pos: usize) -> Option<(u8, usize)> {
    let (lead, next) = src.byte(pos)?;
    match UTF8_TRAILING[lead as usize] {
        0 => Some((lead, next)),
        -2 => Some((b' ', next)),
        -1 => Some(utf8_resync(src, pos).unwrap_or((b' ', next))),
        n => {
            let (cp, after) = utf8_accumulate(src, lead, next, n as usize)?;
            Some((unicode_to_ascii(cp), after))
        }
    }
}

/// Read `n` continuation bytes after `lead`; on a short or broken sequence the
/// result is a space ending where the sequence broke off.
fn utf8_accumulate(
    src: &mut TransferSource<'_, '_>,
    lead: u8,
    mut pos: usize,
    n: usize,
) -> Option<(u32, usize)> {
    let mut cp = u32::from(lead);
    for _ in 0..n {
        let Some((b, next)) = src.byte(pos) else {
            return Some((u32::from(b' '), src.end));
        };
        if !is_utf8_continuation(b) {
            return Some((u32::from(b' '), pos));
        }
        cp = (cp << 6).wrapping_add(u32::from(b));
        pos = next;
    }
    Some((cp.wrapping_sub(UTF8_OFFSETS[n]), pos))
}

/// Landed mid-sequence: back up to the lead byte and decode the whole
/// character, provided it covers `pos`. Only possible on raw bytes.
fn utf8_resync(src: &mut TransferSource<'_, '_>, pos: usize) -> Option<(u8, usize)> {
    let raw = src.raw()?;
    let floor = src.begin.max(pos.saturating_sub(5));
    let mut lead_pos = pos;
    while lead_pos > floor && is_utf8_continuation(raw[lead_pos]) {
        lead_pos -= 1;
    }
    let lead = raw[lead_pos];
    let n = UTF8_TRAILING[lead as usize];
    if n <= 0 || lead_pos + (n as usize) < pos {
        return None;
    }
    let (cp, after) = utf8_accumulate(src, lead, lead_pos + 1, n as usize)?;
    (after > pos).then(|| (unicode_to_ascii(cp), after))
}

fn utf16_to_ascii(
    src: &mut TransferSource<'_, '_>,
    pos: usize,
    big_endian: bool,
) -> Option<(u8, usize)> {
    let (b0, next) = src.byte(pos)?;
    let Some((b1, after)) = src.byte(next) else {
        return Some((b' ', src.end));
    };
    let unit = if big_endian {
        u16::from_be_bytes([b0, b1])
    } else {
        u16::from_le_bytes([b0, b1])
    };
    Some((unicode_to_ascii(u32::from(unit)), after))
}

/// Sextet value of a modified-Base64 character (RFC 2152: no `=` padding).
#[inline]
pub(crate) const fn utf7_sextet(b: u8) -> Option<u8> {
    match b {
        b'A'..=b'Z' => Some(b - b'A'),
        b'a'..=b'z' => Some(b - b'a' + 26),
        b'0'..=b'9' => Some(b - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Encoded characters per cached UTF-7 group: 8 sextets are 3 UTF-16 units.
const UTF7_GROUP: usize = 8;

/// Bound on the backward sync scan done for a cold position; a longer
/// alphabet run is taken as direct text.
const UTF7_SYNC_MAX: usize = 4096;

/// A modified-Base64 run: sextets in `[start, end)`, direct text from `after`.
#[derive(Debug, Clone, Copy)]
struct Utf7Run {
    start: usize,
    end: usize,
    after: usize,
}

/// UTF-7 decoder state for one iterator: the last decoded group, the run
/// it belongs to, and the next position known to be in direct mode.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Utf7State {
    group: GroupCache,
    run: Option<Utf7Run>,
    direct: Option<usize>,
}

impl Utf7State {
    pub(crate) const fn clear(&mut self) {
        self.group.clear();
        self.run = None;
        self.direct = None;
    }
}

/// Start of the run `pos` lies in, found by scanning back over alphabet
/// bytes: every byte in `[q, pos)` is in the alphabet, so the byte before
/// `q` (if any) ended any earlier run and `q` starts in direct mode.
fn utf7_run_start(buf: &[u8], begin: usize, pos: usize) -> Option<usize> {
    utf7_sextet(buf[pos])?;
    let floor = begin.max(pos.saturating_sub(UTF7_SYNC_MAX));
    let mut q = pos;
    while q > floor && utf7_sextet(buf[q - 1]).is_some() {
        q -= 1;
    }
    buf[q..pos].iter().position(|&b| b == b'+').map(|k| q + k + 1)
}

fn utf7_scan(buf: &[u8], start: usize, end: usize) -> Utf7Run {
    let mut run_end = start;
    while run_end < end && utf7_sextet(buf[run_end]).is_some() {
        run_end += 1;
    }
    let after = if run_end < end && buf[run_end] == b'-' { run_end + 1 } else { run_end };
    Utf7Run { start, end: run_end, after }
}

fn utf7_to_ascii(
    buf: &[u8],
    begin: usize,
    pos: usize,
    end: usize,
    state: &mut Utf7State,
) -> (u8, usize) {
    if let Some(hit) = state.group.lookup(pos) {
        return hit;
    }

    let run = match state.run.filter(|r| r.start <= pos && pos < r.end) {
        Some(run) => run,
        None => {
            let inside =
                if state.direct == Some(pos) { None } else { utf7_run_start(buf, begin, pos) };
            let start = match inside {
                Some(start) => start,
                None if buf[pos] == b'+' => {
                    if pos + 1 < end && buf[pos + 1] == b'-' {
                        state.direct = Some(pos + 2);
                        return (b'+', pos + 2);
                    }
                    pos + 1
                }
                None => {
                    state.direct = Some(pos + 1);
                    return (buf[pos], pos + 1);
                }
            };
            let run = utf7_scan(buf, start, end);
            if run.start == run.end {
                state.direct = Some(run.after);
                return (b' ', run.after);
            }
            state.run = Some(run);
            run
        }
    };

    let offset = pos.max(run.start) - run.start;
    let group_start = run.start + offset / UTF7_GROUP * UTF7_GROUP;
    let group_end = (group_start + UTF7_GROUP).min(run.end);

    let mut bits: u64 = 0;
    let mut nbits = 0u32;
    for &b in &buf[group_start..group_end] {
        bits = (bits << 6) | u64::from(utf7_sextet(b).unwrap_or(0));
        nbits += 6;
    }
    let mut chars = [b' '; 3];
    let mut len = 0;
    while nbits >= 16 && len < 3 {
        nbits -= 16;
        let unit = ((bits >> nbits) & 0xFFFF) as u32;
        chars[len] = unicode_to_ascii(unit);
        len += 1;
    }

    let stop = if group_end == run.end {
        state.direct = Some(run.after);
        run.after
    } else {
        group_end
    };
    if len == 0 {
        return (b' ', stop);
    }
    let starts = [group_start, group_start + 3, group_start + 6];
    // The opening '+' belongs to the run's first character.
    state.group = GroupCache::filled(group_start.min(pos), starts, chars, len, stop);
    state.group.lookup(pos).unwrap_or((b' ', stop))
}
