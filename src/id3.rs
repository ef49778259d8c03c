//! ID3v1 and ID3v2 tag tokenizer.
//!
//! ID3v2 frames are walked from the tag header; each frame's content is
//! resynchronized and/or inflated as its flags require, then text-like
//! frames are indexed tagged with a field name. A frame that can't be
//! processed is dropped; the walk always continues past its declared size.

use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;

use flate2::read::ZlibDecoder;
use once_cell::sync::Lazy;

use crate::charset::Charset;
use crate::encoded::EncodedCharRange;
use crate::format::collapse_title;
use crate::sink::{FieldMeta, MetaId, WordSink};
use crate::word::{index_text, index_words};

/// ID3v1 tags are the last 128 bytes of the file.
pub const ID3V1_SIZE: usize = 128;

const TAG_HEADER_SIZE: usize = 10;

/// Upper bound for a resynchronized or decompressed frame.
pub const FRAME_SCRATCH_MAX_SIZE: usize = 256 * 1024;

/// ID3v1 genres, including the Winamp extensions.
static GENRES: [&str; 148] = [
    "Blues", "Classic Rock", "Country", "Dance", "Disco", "Funk", "Grunge", "Hip-Hop", "Jazz",
    "Metal", "New Age", "Oldies", "Other", "Pop", "R&B", "Rap", "Reggae", "Rock", "Techno",
    "Industrial", "Alternative", "Ska", "Death Metal", "Pranks", "Soundtrack", "Euro-Techno",
    "Ambient", "Trip-Hop", "Vocal", "Jazz+Funk", "Fusion", "Trance", "Classical", "Instrumental",
    "Acid", "House", "Game", "Sound Clip", "Gospel", "Noise", "AlternRock", "Bass", "Soul",
    "Punk", "Space", "Meditative", "Instrumental Pop", "Instrumental Rock", "Ethnic", "Gothic",
    "Darkwave", "Techno-Industrial", "Electronic", "Pop-Folk", "Eurodance", "Dream",
    "Southern Rock", "Comedy", "Cult", "Gangsta", "Top 40", "Christian Rap", "Pop/Funk",
    "Jungle", "Native American", "Cabaret", "New Wave", "Psychadelic", "Rave", "Showtunes",
    "Trailer", "Lo-Fi", "Tribal", "Acid Punk", "Acid Jazz", "Polka", "Retro", "Musical",
    "Rock & Roll", "Hard Rock", "Folk", "Folk-Rock", "National Folk", "Swing", "Fast Fusion",
    "Bebob", "Latin", "Revival", "Celtic", "Bluegrass", "Avantgarde", "Gothic Rock",
    "Progressive Rock", "Psychedelic Rock", "Symphonic Rock", "Slow Rock", "Big Band", "Chorus",
    "Easy Listening", "Acoustic", "Humour", "Speech", "Chanson", "Opera", "Chamber Music",
    "Sonata", "Symphony", "Booty Bass", "Primus", "Porn Groove", "Satire", "Slow Jam", "Club",
    "Tango", "Samba", "Folklore", "Ballad", "Power Ballad", "Rhythmic Soul", "Freestyle", "Duet",
    "Punk Rock", "Drum Solo", "A capella", "Euro-House", "Dance Hall", "Goa", "Drum & Bass",
    "Club-House", "Hardcore", "Terror", "Indie", "BritPop", "Afro-Punk", "Polsk Punk", "Beat",
    "Christian Gangsta Rap", "Heavy Metal", "Black Metal", "Crossover",
    "Contemporary Christian", "Christian Rock", "Merengue", "Salsa", "Thrash Metal", "Anime",
    "JPop", "Synthpop",
];

pub fn genre(index: usize) -> Option<&'static str> {
    GENRES.get(index).copied()
}

/// Field names for well-known frames (both v2.2 and v2.3+ ids).
static FRAME_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("TIT2", "title"),
        ("TT2", "title"),
        ("TIT3", "subtitle"),
        ("TT3", "subtitle"),
        ("TPE1", "artist"),
        ("TP1", "artist"),
        ("TPE2", "band"),
        ("TP2", "band"),
        ("TPE3", "conductor"),
        ("TP3", "conductor"),
        ("TALB", "album"),
        ("TAL", "album"),
        ("TCOM", "composer"),
        ("TCM", "composer"),
        ("TEXT", "lyricist"),
        ("TXT", "lyricist"),
        ("TYER", "year"),
        ("TYE", "year"),
        ("TDRC", "year"),
        ("TCON", "genre"),
        ("TCO", "genre"),
        ("COMM", "comment"),
        ("COM", "comment"),
        ("USLT", "lyrics"),
        ("ULT", "lyrics"),
        ("TPUB", "publisher"),
        ("TPB", "publisher"),
        ("TCOP", "copyright"),
        ("TCR", "copyright"),
    ]
    .into_iter()
    .collect()
});

/// Meta names for the synchronized-lyrics content type byte.
const SYNC_CONTENT_TYPES: [&str; 9] = [
    "other", "lyrics", "transcription", "movement", "events", "chord", "trivia", "webpage",
    "image",
];

/// Decode a 7-bits-per-byte synchsafe integer.
pub fn synchsafe(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0, |acc, &b| (acc << 7) | u32::from(b & 0x7F))
}

fn big_endian(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u32::from(b))
}

/// Remove the `00` of every `FF 00` pair.
fn resync(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut previous = 0u8;
    for &b in data {
        if !(previous == 0xFF && b == 0x00) {
            out.push(b);
        }
        previous = b;
    }
    out
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, &'static str> {
    let mut out = Vec::new();
    ZlibDecoder::new(data)
        .take(FRAME_SCRATCH_MAX_SIZE as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|_| "decompression failed")?;
    if out.len() > FRAME_SCRATCH_MAX_SIZE {
        return Err("decompressed frame too large");
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy)]
struct TagHeader {
    major: u8,
    unsynchronized: bool,
    extended: bool,
    size: usize,
}

impl TagHeader {
    fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..TAG_HEADER_SIZE)?;
        if &header[..3] != b"ID3" || !(2..=4).contains(&header[3]) {
            return None;
        }
        let flags = header[5];
        Some(Self {
            major: header[3],
            unsynchronized: flags & 0x80 != 0,
            extended: flags & 0x40 != 0,
            size: synchsafe(&header[6..10]) as usize,
        })
    }
}

#[derive(Debug)]
struct FrameHeader {
    id: String,
    header_len: usize,
    size: usize,
    compressed: bool,
    encrypted: bool,
    grouped: bool,
    unsynchronized: bool,
    data_length: bool,
}

#[derive(Debug)]
enum FrameStep {
    Frame(FrameHeader),
    EndOfFrames,
}

fn parse_frame_header(body: &[u8], pos: usize, major: u8) -> FrameStep {
    let (id_len, header_len) = if major == 2 { (3, 6) } else { (4, 10) };
    let Some(header) = body.get(pos..pos + header_len) else {
        return FrameStep::EndOfFrames;
    };
    let id = &header[..id_len];
    if id.iter().all(|&b| b == 0) || id.starts_with(b"3DI") {
        return FrameStep::EndOfFrames;
    }
    if !id.iter().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()) {
        return FrameStep::EndOfFrames;
    }
    let id = String::from_utf8_lossy(id).into_owned();
    let mut frame = FrameHeader {
        id,
        header_len,
        size: 0,
        compressed: false,
        encrypted: false,
        grouped: false,
        unsynchronized: false,
        data_length: false,
    };
    match major {
        2 => frame.size = big_endian(&header[3..6]) as usize,
        3 => {
            frame.size = big_endian(&header[4..8]) as usize;
            let format = header[9];
            frame.compressed = format & 0x80 != 0;
            frame.encrypted = format & 0x40 != 0;
            frame.grouped = format & 0x20 != 0;
        }
        _ => {
            frame.size = synchsafe(&header[4..8]) as usize;
            let format = header[9];
            frame.grouped = format & 0x40 != 0;
            frame.compressed = format & 0x08 != 0;
            frame.encrypted = format & 0x04 != 0;
            frame.unsynchronized = format & 0x02 != 0;
            frame.data_length = format & 0x01 != 0;
        }
    }
    FrameStep::Frame(frame)
}

/// Strip the frame's extra header fields and undo resynchronization and
/// compression. Errors name why the frame is dropped.
fn frame_content<'a>(
    raw: &'a [u8],
    frame: &FrameHeader,
    tag: &TagHeader,
) -> Result<Cow<'a, [u8]>, &'static str> {
    if frame.encrypted {
        return Err("encrypted");
    }
    let skip = if tag.major == 3 {
        usize::from(frame.compressed) * 4 + usize::from(frame.grouped)
    } else {
        usize::from(frame.grouped) + usize::from(frame.data_length) * 4
    };
    let data = raw.get(skip..).ok_or("truncated")?;

    let mut content = Cow::Borrowed(data);
    if tag.major >= 4 && (frame.unsynchronized || tag.unsynchronized) {
        if data.len() > FRAME_SCRATCH_MAX_SIZE {
            return Err("frame too large to resynchronize");
        }
        content = Cow::Owned(resync(data));
    }
    if frame.compressed {
        content = Cow::Owned(inflate(&content)?);
    }
    Ok(content)
}

/// Call `f` with the id and processed content of every ID3v2 frame.
fn for_each_frame(bytes: &[u8], f: &mut dyn FnMut(&str, &[u8])) {
    let Some(tag) = TagHeader::parse(bytes) else { return };
    let end = (TAG_HEADER_SIZE + tag.size).min(bytes.len());
    let raw = &bytes[TAG_HEADER_SIZE..end];
    let resynced;
    let body: &[u8] = if tag.unsynchronized && tag.major < 4 {
        resynced = resync(raw);
        &resynced
    } else {
        raw
    };

    let mut pos = 0;
    if tag.extended && tag.major >= 3 {
        let Some(size) = body.get(..4) else { return };
        pos = if tag.major == 3 { 4 + big_endian(size) as usize } else { synchsafe(size) as usize };
    }
    loop {
        let frame = match parse_frame_header(body, pos, tag.major) {
            FrameStep::Frame(frame) => frame,
            FrameStep::EndOfFrames => break,
        };
        let content_begin = pos + frame.header_len;
        let content_end = content_begin.saturating_add(frame.size).min(body.len());
        pos = content_begin.saturating_add(frame.size);
        let raw = body.get(content_begin..content_end).unwrap_or_default();
        match frame_content(raw, &frame, &tag) {
            Ok(content) => f(&frame.id, &content),
            Err(reason) => tracing::debug!(frame = %frame.id, reason, "Dropping ID3 frame"),
        }
    }
}

/// A text field of the given ID3 text encoding.
fn text_range(encoding: u8, text: &[u8]) -> EncodedCharRange<'_> {
    let range = EncodedCharRange::new(text);
    match encoding {
        1 => match text {
            [0xFF, 0xFE, ..] => range.sub_range(2, text.len()).with_charset(Charset::Utf16Le),
            [0xFE, 0xFF, ..] => range.sub_range(2, text.len()).with_charset(Charset::Utf16Be),
            _ => range.with_charset(Charset::Utf16Be),
        },
        2 => range.with_charset(Charset::Utf16Be),
        3 => range.with_charset(Charset::Utf8),
        _ => range.with_charset(Charset::Iso8859_1),
    }
}

/// Split at the first string terminator: one NUL, or an aligned NUL pair
/// for the UTF-16 encodings.
fn split_terminated(encoding: u8, data: &[u8]) -> (&[u8], &[u8]) {
    if matches!(encoding, 1 | 2) {
        let at = data.chunks_exact(2).position(|pair| pair == [0, 0]).map(|i| i * 2);
        match at {
            Some(i) => (&data[..i], &data[i + 2..]),
            None => (data, &[]),
        }
    } else {
        match data.iter().position(|&b| b == 0) {
            Some(i) => (&data[..i], &data[i + 1..]),
            None => (data, &[]),
        }
    }
}

/// Replace `(N)` and bare numeric genre references by genre names.
fn expand_genres(text: &str) -> String {
    let mut out = String::new();
    for piece in text.split('\0') {
        let mut rest = piece.trim();
        while let Some(inner) = rest.strip_prefix('(') {
            let Some(close) = inner.find(')') else { break };
            let reference = &inner[..close];
            let name = match reference {
                "RX" => Some("Remix"),
                "CR" => Some("Cover"),
                n => n.parse().ok().and_then(genre),
            };
            if let Some(name) = name {
                out.push_str(name);
                out.push(' ');
            }
            rest = &inner[close + 1..];
        }
        let rest = rest.trim();
        match rest.parse().ok().and_then(genre) {
            Some(name) => out.push_str(name),
            None => out.push_str(rest),
        }
        out.push(' ');
    }
    out
}

fn frame_name(id: &str) -> Cow<'static, str> {
    FRAME_NAMES.get(id).map_or_else(|| Cow::Owned(id.to_ascii_lowercase()), |&n| Cow::Borrowed(n))
}

fn field_meta(sink: &mut dyn WordSink, name: &str) -> Option<Option<MetaId>> {
    match sink.field(name) {
        FieldMeta::Skip => None,
        FieldMeta::Index(meta) => Some(meta),
    }
}

fn index_frame(id: &str, content: &[u8], sink: &mut dyn WordSink) {
    let Some((&encoding, data)) = content.split_first() else { return };
    match id {
        "COMM" | "COM" | "USLT" | "ULT" => {
            let Some(meta) = field_meta(sink, &frame_name(id)) else { return };
            let text = data.get(3..).unwrap_or_default();
            index_words(text_range(encoding, text), meta, sink);
        }
        "TCON" | "TCO" => {
            let Some(meta) = field_meta(sink, &frame_name(id)) else { return };
            let text = text_range(encoding, data).decode_to_string();
            index_text(expand_genres(&text).as_bytes(), meta, sink);
        }
        "SYLT" | "SLT" => {
            // language (3), timestamp format (1), content type (1)
            let Some(header) = data.get(..5) else { return };
            let name = SYNC_CONTENT_TYPES.get(usize::from(header[4])).copied().unwrap_or("lyrics");
            let Some(meta) = field_meta(sink, name) else { return };
            let (descriptor, mut rest) = split_terminated(encoding, &data[5..]);
            index_words(text_range(encoding, descriptor), meta, sink);
            while !rest.is_empty() {
                let (text, after) = split_terminated(encoding, rest);
                index_words(text_range(encoding, text), meta, sink);
                rest = after.get(4..).unwrap_or_default();
            }
        }
        _ if id.starts_with('T') => {
            let Some(meta) = field_meta(sink, &frame_name(id)) else { return };
            index_words(text_range(encoding, data), meta, sink);
        }
        _ => {}
    }
}

/// ID3v1 fields: (name, offset, width).
const V1_FIELDS: [(&str, usize, usize); 5] = [
    ("title", 3, 30),
    ("artist", 33, 30),
    ("album", 63, 30),
    ("year", 93, 4),
    ("comment", 97, 30),
];

fn v1_tag(bytes: &[u8]) -> Option<&[u8]> {
    let tag = bytes.get(bytes.len().checked_sub(ID3V1_SIZE)?..)?;
    tag.starts_with(b"TAG").then_some(tag)
}

fn v1_field(tag: &[u8], offset: usize, width: usize) -> &[u8] {
    let field = &tag[offset..offset + width];
    let len = field.iter().position(|&b| b == 0).unwrap_or(width);
    &field[..len]
}

fn index_v1(tag: &[u8], sink: &mut dyn WordSink) {
    for (name, offset, width) in V1_FIELDS {
        let Some(meta) = field_meta(sink, name) else { continue };
        let text = v1_field(tag, offset, width);
        index_words(EncodedCharRange::new(text).with_charset(Charset::Iso8859_1), meta, sink);
    }
    if let Some(name) = genre(usize::from(tag[127])) {
        if let Some(meta) = field_meta(sink, "genre") {
            index_text(name.as_bytes(), meta, sink);
        }
    }
}

/// Index the ID3v2 and ID3v1 tags of an audio file.
pub fn tokenize(range: EncodedCharRange<'_>, sink: &mut dyn WordSink) {
    let bytes = range.raw_bytes();
    for_each_frame(bytes, &mut |id: &str, content: &[u8]| index_frame(id, content, sink));
    if let Some(tag) = v1_tag(bytes) {
        index_v1(tag, sink);
    }
}

/// The title frame of the ID3v2 tag, else the ID3v1 title.
pub fn find_title(range: EncodedCharRange<'_>, max_size: usize) -> Option<String> {
    let bytes = range.raw_bytes();
    let mut title = None;
    for_each_frame(bytes, &mut |id: &str, content: &[u8]| {
        if title.is_none() && matches!(id, "TIT2" | "TT2") {
            if let Some((&encoding, data)) = content.split_first() {
                title = Some(text_range(encoding, data).decode_to_string());
            }
        }
    });
    let title = title.or_else(|| {
        let field = v1_field(v1_tag(bytes)?, 3, 30);
        Some(EncodedCharRange::new(field).with_charset(Charset::Iso8859_1).decode_to_string())
    })?;
    collapse_title(title.replace('\0', " ").as_bytes(), max_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::RecordingSink;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn synchsafe_bytes(n: usize) -> [u8; 4] {
        [(n >> 21) as u8 & 0x7F, (n >> 14) as u8 & 0x7F, (n >> 7) as u8 & 0x7F, n as u8 & 0x7F]
    }

    fn tag(major: u8, flags: u8, frames: &[u8]) -> Vec<u8> {
        let mut out = b"ID3".to_vec();
        out.extend_from_slice(&[major, 0, flags]);
        out.extend_from_slice(&synchsafe_bytes(frames.len()));
        out.extend_from_slice(frames);
        out
    }

    fn frame_v3(id: &[u8; 4], format: u8, content: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&(content.len() as u32).to_be_bytes());
        out.extend_from_slice(&[0, format]);
        out.extend_from_slice(content);
        out
    }

    fn frame_v4(id: &[u8; 4], format: u8, content: &[u8]) -> Vec<u8> {
        let mut out = id.to_vec();
        out.extend_from_slice(&synchsafe_bytes(content.len()));
        out.extend_from_slice(&[0, format]);
        out.extend_from_slice(content);
        out
    }

    fn tokenized(bytes: &[u8]) -> RecordingSink {
        let mut sink = RecordingSink::default();
        tokenize(EncodedCharRange::new(bytes), &mut sink);
        sink
    }

    #[test]
    fn test_synchsafe() {
        assert_eq!(synchsafe(&[0x00, 0x00, 0x02, 0x01]), 257);
        assert_eq!(synchsafe(&[0x7F, 0x7F, 0x7F, 0x7F]), 0x0FFF_FFFF);
    }

    #[test]
    fn test_genre_table() {
        assert_eq!(genre(0), Some("Blues"));
        assert_eq!(genre(17), Some("Rock"));
        assert_eq!(genre(125), Some("Dance Hall"));
        assert_eq!(genre(147), Some("Synthpop"));
        assert_eq!(genre(148), None);
    }

    #[test]
    fn test_id3v1() {
        let mut v1 = vec![0u8; ID3V1_SIZE];
        v1[..3].copy_from_slice(b"TAG");
        v1[3..13].copy_from_slice(b"Song Title");
        v1[33..44].copy_from_slice(b"Artist Name");
        v1[63..68].copy_from_slice(b"Album");
        v1[93..97].copy_from_slice(b"1999");
        v1[97..101].copy_from_slice(b"Nice");
        v1[127] = 17;
        let mut file = b"\xFF\xFBmpeg frames".to_vec();
        file.extend_from_slice(&v1);

        let sink = tokenized(&file);
        assert_eq!(sink.words_in("title"), ["Song", "Title"]);
        assert_eq!(sink.words_in("artist"), ["Artist", "Name"]);
        assert_eq!(sink.words_in("year"), ["1999"]);
        assert_eq!(sink.words_in("genre"), ["Rock"]);
    }

    #[test]
    fn test_id3v23_frames() {
        let mut frames = frame_v3(b"TIT2", 0, b"\x00Hello World");
        frames.extend(frame_v3(b"COMM", 0, b"\x00engdesc\x00Great track"));
        frames.extend(frame_v3(b"TCON", 0, b"\x00(17)31"));
        frames.extend(frame_v3(b"APIC", 0, b"\x00image/png\x00binary"));
        frames.extend([0u8; 16]);
        let sink = tokenized(&tag(3, 0, &frames));
        assert_eq!(sink.words_in("title"), ["Hello", "World"]);
        assert_eq!(sink.words_in("comment"), ["desc", "Great", "track"]);
        assert_eq!(sink.words_in("genre"), ["Rock", "Trance"]);
        assert_eq!(sink.all().len(), 7);
    }

    #[test]
    fn test_id3v24_utf16_with_bom() {
        let text = [1, 0xFF, 0xFE, b'H', 0, b'i', 0, b'!', 0, b'x', 0];
        let sink = tokenized(&tag(4, 0, &frame_v4(b"TPE1", 0, &text)));
        assert_eq!(sink.words_in("artist"), ["Hi", "x"]);
    }

    #[test]
    fn test_id3v22_frames() {
        let mut frames = b"TT2".to_vec();
        frames.extend_from_slice(&[0, 0, 6]);
        frames.extend_from_slice(b"\x00Short");
        let sink = tokenized(&tag(2, 0, &frames));
        assert_eq!(sink.words_in("title"), ["Short"]);
    }

    #[test]
    fn test_compressed_frame() {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"\x00Compressed Album").unwrap();
        let compressed = encoder.finish().unwrap();
        let mut content = 17u32.to_be_bytes().to_vec();
        content.extend_from_slice(&compressed);
        let sink = tokenized(&tag(3, 0, &frame_v3(b"TALB", 0x80, &content)));
        assert_eq!(sink.words_in("album"), ["Compressed", "Album"]);
    }

    #[test]
    fn test_bad_frames_are_skipped() {
        let mut frames = frame_v3(b"TIT2", 0x40, b"\x01\x00secret");
        frames.extend(frame_v3(b"TALB", 0x80, b"\x00\x00\x00\x05not zlib"));
        frames.extend(frame_v3(b"TCOM", 0, b""));
        frames.extend(frame_v3(b"TPE1", 0, b"\x00After"));
        let sink = tokenized(&tag(3, 0, &frames));
        assert_eq!(sink.all(), ["After"]);
    }

    #[test]
    fn test_tag_unsynchronization() {
        // On disk the frame content carries an extra 00 after FF.
        let mut frames = b"TPE1".to_vec();
        frames.extend_from_slice(&[0, 0, 0, 7, 0, 0]);
        frames.extend_from_slice(b"\x00M\xFF\x00tley");
        let sink = tokenized(&tag(3, 0x80, &frames));
        assert_eq!(sink.words_in("artist"), ["Mytley"]);
    }

    #[test]
    fn test_synchronized_lyrics() {
        let mut content = b"\x00eng\x02\x01".to_vec();
        content.extend_from_slice(b"Verse\x00");
        content.extend_from_slice(b"Hello\x00\x00\x00\x00\x10");
        content.extend_from_slice(b"Again\x00\x00\x00\x00\x20");
        let sink = tokenized(&tag(3, 0, &frame_v3(b"SYLT", 0, &content)));
        assert_eq!(sink.words_in("lyrics"), ["Verse", "Hello", "Again"]);
    }

    #[test]
    fn test_footer_ends_frames() {
        let mut frames = frame_v4(b"TIT2", 0, b"\x03Before");
        frames.extend_from_slice(b"3DI\x04\x00\x00\x00\x00\x00\x00");
        frames.extend(frame_v4(b"TALB", 0, b"\x03Hidden"));
        let sink = tokenized(&tag(4, 0, &frames));
        assert_eq!(sink.all(), ["Before"]);
    }

    #[test]
    fn test_find_title() {
        let bytes = tag(3, 0, &frame_v3(b"TIT2", 0, b"\x00  A  Title "));
        assert_eq!(find_title(EncodedCharRange::new(&bytes), 100).as_deref(), Some("A Title"));
        assert_eq!(find_title(EncodedCharRange::new(b"no tags here"), 100), None);
    }
}
