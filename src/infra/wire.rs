// ============================================================
// Layer 6 — Inference Wire Codec
// ============================================================
// Request framing (one message per window):
//
//   Binary (default)
//     ┌──────────────┬──────────────────────────────────────┐
//     │ u32 BE length│ length bytes: T·F × f32 bit patterns │
//     └──────────────┴──────────────────────────────────────┘
//     Each value is a big-endian u32 holding IEEE-754 bits.
//     A length other than T·F·4 is read and thrown away; the
//     connection stays usable for the next message.
//
//   Text (legacy)
//     One line per window, values separated by commas and/or
//     whitespace. Values are taken positionally: missing or
//     malformed entries read as 0.0, extras are ignored.
//
// Response: "<class_index>,<confidence>\n", confidence with four
// decimals. "-1,0.0000\n" means no model is loaded and
// "-2,0.0000\n" means the loaded model failed on that window.

use std::io::{self, BufRead, Read};

use crate::domain::sample::Classification;

/// Reply sent when there is no model to classify with.
pub const NO_MODEL_RESPONSE: &str = "-1,0.0000\n";

/// Reply sent when the loaded model could not classify a window.
pub const CLASSIFY_ERROR_RESPONSE: &str = "-2,0.0000\n";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WireFormat {
    #[default]
    Binary,
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// A complete window of `T·F` values
    Window(Vec<f32>),
    /// A binary message of the wrong size, already drained
    Discarded { declared: usize, expected: usize },
}

/// Reads framed windows from a byte stream.
pub struct MessageReader<R> {
    reader: R,
    format: WireFormat,
    window_len: usize,
}

impl<R: BufRead> MessageReader<R> {
    pub fn new(reader: R, format: WireFormat, window_len: usize) -> Self {
        Self { reader, format, window_len }
    }

    /// Next message, or `Ok(None)` once the peer has closed the stream.
    pub fn next_message(&mut self) -> io::Result<Option<Message>> {
        match self.format {
            WireFormat::Binary => self.next_binary(),
            WireFormat::Text => self.next_text(),
        }
    }

    fn next_binary(&mut self) -> io::Result<Option<Message>> {
        let mut prefix = [0u8; 4];
        if !fill_or_eof(&mut self.reader, &mut prefix)? {
            return Ok(None);
        }
        let declared = u32::from_be_bytes(prefix) as usize;
        let expected = self.window_len * 4;

        if declared != expected {
            io::copy(&mut (&mut self.reader).take(declared as u64), &mut io::sink())?;
            return Ok(Some(Message::Discarded { declared, expected }));
        }

        let mut payload = vec![0u8; expected];
        self.reader.read_exact(&mut payload)?;
        Ok(Some(Message::Window(decode_be_f32(&payload))))
    }

    fn next_text(&mut self) -> io::Result<Option<Message>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            if !line.trim().is_empty() {
                break;
            }
        }
        Ok(Some(Message::Window(parse_text_window(&line, self.window_len))))
    }
}

/// Fill `buf` completely. Returns `false` if the stream ended before
/// the first byte; ending part-way through is an `UnexpectedEof` error.
fn fill_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// Big-endian IEEE-754 bit patterns → floats.
pub fn decode_be_f32(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_bits(u32::from_be_bytes([c[0], c[1], c[2], c[3]])))
        .collect()
}

/// Exactly `window_len` values from one text line.
pub fn parse_text_window(line: &str, window_len: usize) -> Vec<f32> {
    let mut tokens = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty());
    (0..window_len)
        .map(|_| tokens.next().and_then(|t| t.parse::<f32>().ok()).unwrap_or(0.0))
        .collect()
}

/// Response line for a classification result.
pub fn format_response(result: Option<&Classification>) -> String {
    match result {
        Some(c) => format!("{},{:.4}\n", c.class_index, c.confidence),
        None => NO_MODEL_RESPONSE.to_string(),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    /// Length-prefixed binary frame for `values`.
    pub(crate) fn encode_window(values: &[f32]) -> Vec<u8> {
        let mut out = ((values.len() * 4) as u32).to_be_bytes().to_vec();
        for v in values {
            out.extend_from_slice(&v.to_bits().to_be_bytes());
        }
        out
    }

    #[test]
    fn test_binary_window_decodes() {
        let bytes = encode_window(&[1.5, -2.0, 0.25]);
        let mut reader = MessageReader::new(Cursor::new(bytes), WireFormat::Binary, 3);
        assert_eq!(reader.next_message().unwrap(), Some(Message::Window(vec![1.5, -2.0, 0.25])));
        assert_eq!(reader.next_message().unwrap(), None);
    }

    #[test]
    fn test_wrong_length_is_discarded_and_stream_recovers() {
        let mut bytes = encode_window(&[9.0, 9.0]);
        bytes.extend(encode_window(&[1.0, 2.0, 3.0]));
        let mut reader = MessageReader::new(Cursor::new(bytes), WireFormat::Binary, 3);

        assert_eq!(
            reader.next_message().unwrap(),
            Some(Message::Discarded { declared: 8, expected: 12 })
        );
        assert_eq!(reader.next_message().unwrap(), Some(Message::Window(vec![1.0, 2.0, 3.0])));
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let mut bytes = encode_window(&[1.0, 2.0, 3.0]);
        bytes.truncate(9);
        let mut reader = MessageReader::new(Cursor::new(bytes), WireFormat::Binary, 3);
        assert!(reader.next_message().is_err());
    }

    #[test]
    fn test_partial_prefix_is_an_error() {
        let mut reader = MessageReader::new(Cursor::new(vec![0u8, 0]), WireFormat::Binary, 3);
        assert_eq!(reader.next_message().unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_text_lines_are_parsed_positionally() {
        let input = "1.0, 2.5 abc\n\n4,5,6,7\n";
        let mut reader = MessageReader::new(Cursor::new(input), WireFormat::Text, 4);
        assert_eq!(reader.next_message().unwrap(), Some(Message::Window(vec![1.0, 2.5, 0.0, 0.0])));
        assert_eq!(reader.next_message().unwrap(), Some(Message::Window(vec![4.0, 5.0, 6.0, 7.0])));
        assert_eq!(reader.next_message().unwrap(), None);
    }

    #[test]
    fn test_response_formatting() {
        let c = Classification { class_index: 2, confidence: 0.876_54 };
        assert_eq!(format_response(Some(&c)), "2,0.8765\n");
        assert_eq!(format_response(None), "-1,0.0000\n");
    }
}
