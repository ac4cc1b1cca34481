//! Reading client data files into rows.
//!
//! Files are sniffed for their delimiter and character encoding, transcoded
//! to UTF-8 and then streamed as batches of [`Row`](zoomos_model::Row)s.

pub mod analyzer;
pub mod decode;
pub mod error;
pub mod reader;

pub use analyzer::{
    CsvAnalysis, DELIMITER_CANDIDATES, SAMPLE_SIZE, analyze_file, detect_delimiter, detect_encoding,
};
pub use decode::DecodingReader;
pub use error::{IngestError, Result};
pub use reader::{CsvRowReader, MAX_CSV_FILE_SIZE, read_all_rows};
