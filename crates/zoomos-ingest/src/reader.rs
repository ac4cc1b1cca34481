//! Batched CSV row reading.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, warn};
use zoomos_model::{BATCH_SIZE_FILE_RECORD, Row};

use crate::analyzer::{CsvAnalysis, analyze_file};
use crate::decode::DecodingReader;
use crate::error::{IngestError, Result};

/// Maximum file size accepted for ingestion (500 MB).
pub const MAX_CSV_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Streams a delimited file as batches of rows.
///
/// Bytes are transcoded from the detected encoding to UTF-8 before parsing.
/// Header names have any BOM removed and are trimmed; values are trimmed.
/// Records shorter than the header simply lack the trailing columns, and
/// fields beyond the header are dropped.
pub struct CsvRowReader {
    path: PathBuf,
    analysis: CsvAnalysis,
    headers: Vec<String>,
    reader: csv::Reader<DecodingReader<File>>,
    batch_size: usize,
    rows_read: usize,
    done: bool,
}

impl CsvRowReader {
    pub fn open(path: &Path) -> Result<Self> {
        check_file_size(path, MAX_CSV_FILE_SIZE)?;
        let analysis = analyze_file(path)?;
        let file = File::open(path).map_err(|err| IngestError::io(path, err))?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(analysis.delimiter)
            .flexible(true)
            .from_reader(DecodingReader::new(file, analysis.encoding));

        let headers = reader
            .headers()
            .map_err(|source| csv_error(path, source))?
            .clone();
        if headers.is_empty() {
            return Err(IngestError::EmptyCsv {
                path: path.to_path_buf(),
            });
        }
        let headers = normalize_headers(path, &headers)?;
        debug!(
            path = %path.display(),
            encoding = analysis.encoding.name(),
            columns = headers.len(),
            "opened data file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            analysis,
            headers,
            reader,
            batch_size: BATCH_SIZE_FILE_RECORD,
            rows_read: 0,
            done: false,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn analysis(&self) -> CsvAnalysis {
        self.analysis
    }

    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    fn to_row(&self, record: &StringRecord) -> Row {
        if record.len() > self.headers.len() {
            warn!(
                path = %self.path.display(),
                line = record.position().map(|position| position.line()),
                fields = record.len(),
                columns = self.headers.len(),
                "record has more fields than the header; extra fields dropped"
            );
        }
        self.headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.clone(), value.trim().to_string()))
            .collect()
    }
}

impl Iterator for CsvRowReader {
    type Item = Result<Vec<Row>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut batch = Vec::with_capacity(self.batch_size.min(1024));
        let mut record = StringRecord::new();
        while batch.len() < self.batch_size {
            match self.reader.read_record(&mut record) {
                Ok(true) => {
                    // Blank lines are skipped by the csv reader; all-empty records are not.
                    if record.iter().all(|value| value.trim().is_empty()) {
                        continue;
                    }
                    batch.push(self.to_row(&record));
                }
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(source) => {
                    self.done = true;
                    return Some(Err(csv_error(&self.path, source)));
                }
            }
        }
        self.rows_read += batch.len();
        if batch.is_empty() { None } else { Some(Ok(batch)) }
    }
}

/// Read a whole file into memory.
pub fn read_all_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = CsvRowReader::open(path)?;
    let mut rows = Vec::new();
    for batch in reader.by_ref() {
        rows.extend(batch?);
    }
    debug!(path = %path.display(), rows = reader.rows_read(), "data file read");
    Ok(rows)
}

fn check_file_size(path: &Path, max_size: u64) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|err| IngestError::io(path, err))?;
    if metadata.len() > max_size {
        return Err(IngestError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size,
        });
    }
    Ok(())
}

fn normalize_headers(path: &Path, headers: &StringRecord) -> Result<Vec<String>> {
    headers
        .iter()
        .enumerate()
        .map(|(position, header)| {
            let name = header.trim_matches('\u{feff}').trim();
            if name.is_empty() {
                return Err(IngestError::EmptyColumnName {
                    path: path.to_path_buf(),
                    position: position + 1,
                });
            }
            Ok(name.to_string())
        })
        .collect()
}

fn csv_error(path: &Path, source: csv::Error) -> IngestError {
    IngestError::CsvParse {
        path: path.to_path_buf(),
        source,
    }
}
