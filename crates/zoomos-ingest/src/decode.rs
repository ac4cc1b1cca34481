//! Transcoding of client files to UTF-8 ahead of CSV parsing.

use std::io::{self, Read};

use encoding_rs::{CoderResult, Decoder, Encoding};

const INPUT_CHUNK: usize = 8 * 1024;

/// A [`Read`] adapter that yields the UTF-8 form of an encoded byte stream.
///
/// A leading BOM of the detected encoding is removed. Malformed sequences
/// become U+FFFD.
pub struct DecodingReader<R> {
    inner: R,
    decoder: Decoder,
    input: Vec<u8>,
    input_start: usize,
    output: Vec<u8>,
    output_start: usize,
    output_end: usize,
    eof: bool,
    finished: bool,
}

impl<R: Read> DecodingReader<R> {
    pub fn new(inner: R, encoding: &'static Encoding) -> Self {
        let decoder = encoding.new_decoder_with_bom_removal();
        let output_len = decoder
            .max_utf8_buffer_length(INPUT_CHUNK)
            .unwrap_or(INPUT_CHUNK * 3)
            .max(INPUT_CHUNK);
        Self {
            inner,
            decoder,
            input: Vec::with_capacity(INPUT_CHUNK),
            input_start: 0,
            output: vec![0; output_len],
            output_start: 0,
            output_end: 0,
            eof: false,
            finished: false,
        }
    }

    /// Decode the next chunk into the output buffer. Returns `false` once
    /// the stream is exhausted.
    fn fill_output(&mut self) -> io::Result<bool> {
        while self.output_start == self.output_end {
            if self.finished {
                return Ok(false);
            }
            if self.input_start == self.input.len() && !self.eof {
                self.input.clear();
                self.input_start = 0;
                let read = (&mut self.inner)
                    .take(INPUT_CHUNK as u64)
                    .read_to_end(&mut self.input)?;
                self.eof = read == 0;
            }

            let (result, read, written, _) = self.decoder.decode_to_utf8(
                &self.input[self.input_start..],
                &mut self.output,
                self.eof,
            );
            self.input_start += read;
            self.output_start = 0;
            self.output_end = written;
            if self.eof && result == CoderResult::InputEmpty {
                self.finished = true;
            }
        }
        Ok(true)
    }
}

impl<R: Read> Read for DecodingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || !self.fill_output()? {
            return Ok(0);
        }
        let available = &self.output[self.output_start..self.output_end];
        let count = available.len().min(buf.len());
        buf[..count].copy_from_slice(&available[..count]);
        self.output_start += count;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8], encoding: &'static Encoding) -> String {
        let mut text = String::new();
        DecodingReader::new(bytes, encoding)
            .read_to_string(&mut text)
            .expect("decode");
        text
    }

    #[test]
    fn transcodes_windows_1251() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("Цена;Регион\n89,90;Минск\n");
        assert_eq!(
            decode_all(&bytes, encoding_rs::WINDOWS_1251),
            "Цена;Регион\n89,90;Минск\n"
        );
    }

    #[test]
    fn strips_utf8_bom_and_replaces_malformed_bytes() {
        assert_eq!(decode_all(b"\xEF\xBB\xBFa;b\n", encoding_rs::UTF_8), "a;b\n");
        assert_eq!(decode_all(b"a\xFFb", encoding_rs::UTF_8), "a\u{FFFD}b");
    }

    #[test]
    fn spans_many_input_chunks() {
        let line = "Товар;Цена\n".repeat(INPUT_CHUNK / 4);
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode(&line);
        assert!(bytes.len() > INPUT_CHUNK);
        assert_eq!(decode_all(&bytes, encoding_rs::WINDOWS_1251), line);
    }
}
