//! Newline-delimited frame reader.

use std::io::{self, BufRead, BufReader, Read};

use crate::dispatch::DispatchError;

/// Largest accepted request line, excluding the newline.
pub(crate) const MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into newline-terminated frames.
pub(crate) struct FrameReader<R> {
    reader: BufReader<R>,
    max_frame_bytes: usize,
}

impl<R: Read> FrameReader<R> {
    pub(crate) fn new(inner: R, max_frame_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(inner),
            max_frame_bytes,
        }
    }

    /// Reads the next frame, including its newline when present.
    ///
    /// Returns `Ok(None)` at end of stream. A final unterminated line is
    /// returned as a frame.
    pub(crate) fn next_frame(&mut self) -> Result<Option<Vec<u8>>, DispatchError> {
        let mut frame = Vec::new();
        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            };
            if available.is_empty() {
                return Ok((!frame.is_empty()).then_some(frame));
            }

            let newline = available.iter().position(|byte| *byte == b'\n');
            let chunk = newline.map_or(available, |pos| &available[..=pos]);
            frame.extend_from_slice(chunk);
            let consumed = chunk.len();
            self.reader.consume(consumed);

            let content_len = frame.len() - usize::from(newline.is_some());
            if content_len > self.max_frame_bytes {
                return Err(DispatchError::request_too_large(
                    content_len,
                    self.max_frame_bytes,
                ));
            }
            if newline.is_some() {
                return Ok(Some(frame));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn frames(input: &[u8], max: usize) -> Vec<Result<Vec<u8>, String>> {
        let mut reader = FrameReader::new(Cursor::new(input.to_vec()), max);
        let mut out = Vec::new();
        loop {
            match reader.next_frame() {
                Ok(Some(frame)) => out.push(Ok(frame)),
                Ok(None) => return out,
                Err(error) => {
                    out.push(Err(error.error_code().to_owned()));
                    return out;
                }
            }
        }
    }

    #[test]
    fn splits_on_newlines_and_keeps_trailing_line() {
        let out = frames(b"one\ntwo\nthree", 64);
        assert_eq!(
            out,
            vec![
                Ok(b"one\n".to_vec()),
                Ok(b"two\n".to_vec()),
                Ok(b"three".to_vec()),
            ]
        );
    }

    #[rstest]
    #[case(b"12345\n".as_slice(), true)]
    #[case(b"123456\n".as_slice(), false)]
    #[case(b"1234567890".as_slice(), false)]
    fn enforces_the_frame_limit(#[case] input: &[u8], #[case] accepted: bool) {
        let out = frames(input, 5);
        assert_eq!(out.len(), 1);
        if accepted {
            assert!(out[0].is_ok());
        } else {
            assert_eq!(out[0], Err("REQUEST_TOO_LARGE".to_owned()));
        }
    }

    #[test]
    fn empty_stream_has_no_frames() {
        assert!(frames(b"", 8).is_empty());
    }
}
