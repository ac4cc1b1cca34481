//! File sniffing: delimiter and encoding checks on a leading sample.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::debug;

use crate::error::{IngestError, Result};

/// Number of leading bytes inspected.
pub const SAMPLE_SIZE: usize = 4096;

/// Delimiters considered, in tie-break order.
pub const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Top-level domain passed to the charset detector; client files are mostly
/// produced by Russian-language spreadsheet exports.
const DETECTOR_TLD_HINT: &[u8] = b"ru";

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvAnalysis {
    pub delimiter: u8,
    pub encoding: &'static Encoding,
    pub has_utf8_bom: bool,
    pub sample_len: usize,
}

/// Most frequent candidate delimiter in `sample`; `,` when none occurs.
pub fn detect_delimiter(sample: &[u8]) -> u8 {
    let mut best = (b',', 0usize);
    for candidate in DELIMITER_CANDIDATES {
        let count = sample.iter().filter(|&&byte| byte == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

/// Character encoding of `sample`.
///
/// Samples that are valid UTF-8 (allowing a sequence cut off by the sample
/// boundary) are UTF-8; anything else goes to the detector.
pub fn detect_encoding(sample: &[u8]) -> &'static Encoding {
    let utf8 = match std::str::from_utf8(sample) {
        Ok(_) => true,
        Err(err) => err.error_len().is_none(),
    };
    if utf8 {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(sample, true);
    detector.guess(Some(DETECTOR_TLD_HINT), false)
}

/// Read the leading sample of `path`, reject UTF-16 and detect the encoding
/// and delimiter.
pub fn analyze_file(path: &Path) -> Result<CsvAnalysis> {
    let mut file = File::open(path).map_err(|err| IngestError::io(path, err))?;
    let mut sample = Vec::with_capacity(SAMPLE_SIZE);
    file.by_ref()
        .take(SAMPLE_SIZE as u64)
        .read_to_end(&mut sample)
        .map_err(|err| IngestError::io(path, err))?;

    if let Some(encoding) = utf16_bom(&sample) {
        return Err(IngestError::UnsupportedEncoding {
            path: path.to_path_buf(),
            encoding,
        });
    }

    let analysis = CsvAnalysis {
        delimiter: detect_delimiter(&sample),
        encoding: detect_encoding(&sample),
        has_utf8_bom: sample.starts_with(&UTF8_BOM),
        sample_len: sample.len(),
    };
    debug!(
        path = %path.display(),
        delimiter = %char::from(analysis.delimiter).escape_default(),
        encoding = analysis.encoding.name(),
        bom = analysis.has_utf8_bom,
        "file analyzed"
    );
    Ok(analysis)
}

fn utf16_bom(sample: &[u8]) -> Option<&'static str> {
    match sample {
        [0xFF, 0xFE, ..] => Some("UTF-16 LE"),
        [0xFE, 0xFF, ..] => Some("UTF-16 BE"),
        _ => None,
    }
}
