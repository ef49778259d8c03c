use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::fs;
use tempfile::tempdir;

use textsieve::{
    Charset, EncodedCharRange, Encoding, Extractor, ExtractorConfig, FileFormat, FileWords,
    TokenizerConfig, WordCollector, extract,
};

/// Build a document of roughly `paragraphs` paragraphs in the given format.
fn sample_document(format: FileFormat, paragraphs: usize) -> Vec<u8> {
    let mut out = String::new();
    match format {
        FileFormat::Html => out.push_str("<html><head><title>Bench</title></head><body>"),
        FileFormat::Rtf => out.push_str(r"{\rtf1\ansi\deff0 "),
        FileFormat::Mail => {
            out.push_str("Subject: Benchmark message\nContent-Type: text/plain\n\n");
        }
        FileFormat::Man => out.push_str(".TH BENCH 1\n.SH DESCRIPTION\n"),
        _ => {}
    }
    for i in 0..paragraphs {
        let line =
            format!("Paragraph {i} covers encoded characters and word extraction details.");
        match format {
            FileFormat::Html => {
                out.push_str(&format!("<p class=\"body\">{line} caf&eacute; &amp; more</p>\n"));
            }
            FileFormat::Latex => out.push_str(&format!("\\section{{Part {i}}} {line} caf\\'e\n\n")),
            FileFormat::Rtf => out.push_str(&format!("{{\\b {line}}} caf\\'e9\\par\n")),
            FileFormat::Man => out.push_str(&format!(".B bold\n{line} \\fIitalic\\fR\n")),
            _ => out.push_str(&format!("{line}\n")),
        }
    }
    match format {
        FileFormat::Html => out.push_str("</body></html>"),
        FileFormat::Rtf => out.push('}'),
        _ => {}
    }
    out.into_bytes()
}

fn benchmark_tokenizers(c: &mut Criterion) {
    let config = TokenizerConfig::default();
    let mut group = c.benchmark_group("tokenize");

    for format in [
        FileFormat::Text,
        FileFormat::Html,
        FileFormat::Latex,
        FileFormat::Rtf,
        FileFormat::Mail,
        FileFormat::Man,
    ] {
        let doc = sample_document(format, 500);

        // Verify the tokenizer produces words before benchmarking (correctness check)
        let mut check = WordCollector::default();
        extract(format, &doc, &config, &mut check);
        assert!(
            check.words().len() >= 500,
            "{format} tokenizer produced only {} words - tokenizer may be broken!",
            check.words().len()
        );

        group.throughput(Throughput::Bytes(doc.len() as u64));
        group.bench_with_input(BenchmarkId::new("format", format), &doc, |b, doc| {
            b.iter(|| {
                let mut sink = WordCollector::default();
                extract(format, doc, &config, &mut sink);
                sink.words().len()
            });
        });
    }

    group.finish();
}

fn benchmark_decoders(c: &mut Criterion) {
    let text = "Gr\u{fc}\u{df}e aus K\u{f6}ln, caf\u{e9} cr\u{e8}me. ".repeat(2000);
    let utf16: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let qp: String = text
        .bytes()
        .map(|b| {
            if b.is_ascii() && b != b'=' {
                (b as char).to_string()
            } else {
                format!("={b:02X}")
            }
        })
        .collect();

    let mut group = c.benchmark_group("decode");
    group.bench_function("utf8", |b| {
        b.iter(|| {
            EncodedCharRange::new(text.as_bytes()).with_charset(Charset::Utf8).iter().count()
        });
    });
    group.bench_function("utf16le", |b| {
        b.iter(|| EncodedCharRange::new(&utf16).with_charset(Charset::Utf16Le).iter().count());
    });
    group.bench_function("quoted_printable_utf8", |b| {
        b.iter(|| {
            EncodedCharRange::new(qp.as_bytes())
                .with_charset(Charset::Utf8)
                .with_encoding(Encoding::QuotedPrintable)
                .iter()
                .count()
        });
    });
    group.finish();
}

fn benchmark_extract_tree(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    for i in 0..200 {
        let html = sample_document(FileFormat::Html, 20);
        fs::write(dir.path().join(format!("page_{i}.html")), html).unwrap();
        let text = sample_document(FileFormat::Text, 20);
        fs::write(dir.path().join(format!("notes_{i}.txt")), text).unwrap();
    }

    let extractor = Extractor::new(dir.path(), ExtractorConfig::default());
    c.bench_function("extract_tree_400_files", |b| {
        b.iter(|| {
            let mut words = 0usize;
            extractor
                .extract_path(dir.path(), &mut |file: FileWords| {
                    words += file.words.len();
                    Ok(())
                })
                .unwrap();
            words
        });
    });
}

criterion_group!(benches, benchmark_tokenizers, benchmark_decoders, benchmark_extract_tree);
criterion_main!(benches);
