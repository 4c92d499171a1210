//! uuencode codec (`x-uu` / `x-uuencode`).
//!
//! The decoder is deliberately forgiving, matching decades of mailer
//! behavior: anything before `begin` is skipped, lines containing lowercase
//! letters are assumed to be interleaved text, and lines whose declared
//! length disagrees with their width are dropped. The mode and filename on
//! the `begin` line are captured but never applied.

use tracing::{debug, warn};

use crate::codec::Codec;
use crate::error::{MimeError, Result};
use crate::stream::{split_eol, Stream};

/// Decoded payload bytes per encoded line.
const BYTES_PER_LINE: usize = 45;

/// uuencode decoder/encoder.
#[derive(Default)]
pub struct Uuencode {
    filename: Option<String>,
}

impl Uuencode {
    /// An encoder that declares `filename` on its `begin` line.
    ///
    /// The registry builds the no-filename variant; callers encoding an
    /// attachment pass the head's recommended filename here.
    pub fn with_filename(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
        }
    }
}

/// Mode and filename captured from a `begin` line. Never applied.
#[derive(Debug, PartialEq, Eq)]
struct UuPreamble {
    mode: Option<u32>,
    filename: String,
}

impl Codec for Uuencode {
    fn decode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
        let mut line = Vec::new();

        // Skip everything up to the begin line.
        let preamble = loop {
            if input.read_line(&mut line)? == 0 {
                return Err(MimeError::NoBegin);
            }
            let (content, _) = split_eol(&line);
            if let Some(preamble) = parse_begin_line(content) {
                break preamble;
            }
        };
        debug!(
            mode = ?preamble.mode,
            filename = %preamble.filename,
            "uu begin line captured, mode and filename not applied"
        );

        let mut saw_end = false;
        let mut decoded = Vec::with_capacity(BYTES_PER_LINE);
        loop {
            if input.read_line(&mut line)? == 0 {
                break;
            }
            let (content, _) = split_eol(&line);
            if content.starts_with(b"end") {
                saw_end = true;
                break;
            }
            // Interleaved text heuristic: payload bytes are all in 32..=96,
            // so a lowercase letter marks a line that is not payload.
            if content.iter().any(u8::is_ascii_lowercase) {
                continue;
            }
            if content.is_empty() {
                continue;
            }
            let declared = (content[0].wrapping_sub(32) & 0o77) as usize;
            let payload = &content[1..];
            if (declared + 2) / 3 != payload.len() / 4 {
                warn!(
                    declared,
                    width = payload.len(),
                    "skipping uu line with inconsistent length byte"
                );
                continue;
            }

            decoded.clear();
            let mut remaining = declared;
            for quad in payload.chunks_exact(4) {
                if remaining == 0 {
                    break;
                }
                let v: Vec<u8> = quad.iter().map(|&c| c.wrapping_sub(32) & 0x3f).collect();
                let bytes = [
                    (v[0] << 2) | (v[1] >> 4),
                    (v[1] << 4) | (v[2] >> 2),
                    (v[2] << 6) | v[3],
                ];
                let take = remaining.min(3);
                decoded.extend_from_slice(&bytes[..take]);
                remaining -= take;
            }
            output.write(&decoded)?;
        }

        if !saw_end {
            warn!("uuencoded data ended without an 'end' line");
        }
        Ok(())
    }

    fn encode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
        let name = self.filename.as_deref().unwrap_or("");
        output.write(format!("begin 644 {name}\n").as_bytes())?;

        let mut chunk = [0u8; BYTES_PER_LINE];
        loop {
            let mut filled = 0;
            while filled < chunk.len() {
                let n = input.read(&mut chunk[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }

            let mut line = Vec::with_capacity(62);
            line.push(enc(filled as u8));
            for group in chunk[..filled].chunks(3) {
                let b0 = group[0];
                let b1 = group.get(1).copied().unwrap_or(0);
                let b2 = group.get(2).copied().unwrap_or(0);
                line.push(enc(b0 >> 2));
                line.push(enc(((b0 << 4) | (b1 >> 4)) & 0x3f));
                line.push(enc(((b1 << 2) | (b2 >> 6)) & 0x3f));
                line.push(enc(b2 & 0x3f));
            }
            line.push(b'\n');
            output.write(&line)?;

            if filled < chunk.len() {
                break;
            }
        }

        output.write(b"end\n")
    }
}

/// Map a sextet to its uuencode character, using backtick for zero.
#[inline]
fn enc(v: u8) -> u8 {
    let v = v & 0x3f;
    if v == 0 {
        b'`'
    } else {
        32 + v
    }
}

/// Recognize a `begin` line and capture its mode digits and filename token.
fn parse_begin_line(content: &[u8]) -> Option<UuPreamble> {
    let rest = content.strip_prefix(b"begin")?;
    let rest = std::str::from_utf8(rest).ok()?.trim_start();
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let (digits, rest) = rest.split_at(digits_end);
    let filename = rest
        .split_whitespace()
        .next()
        .unwrap_or("")
        .to_string();
    Some(UuPreamble {
        mode: digits.parse().ok(),
        filename,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemStream;

    fn decode(input: &[u8]) -> Result<Vec<u8>> {
        let mut src = MemStream::from_bytes(input);
        let mut dst = MemStream::new();
        Uuencode::default().decode(&mut src, &mut dst)?;
        Ok(dst.into_bytes())
    }

    fn encode(codec: &Uuencode, input: &[u8]) -> Vec<u8> {
        let mut src = MemStream::from_bytes(input);
        let mut dst = MemStream::new();
        codec.encode(&mut src, &mut dst).unwrap();
        dst.into_bytes()
    }

    #[test]
    fn test_parse_begin_line() {
        assert_eq!(
            parse_begin_line(b"begin 644 x.bin"),
            Some(UuPreamble {
                mode: Some(644),
                filename: "x.bin".to_string()
            })
        );
        assert_eq!(
            parse_begin_line(b"begin"),
            Some(UuPreamble {
                mode: None,
                filename: String::new()
            })
        );
        assert!(parse_begin_line(b"beginning of text").is_some());
        assert!(parse_begin_line(b"not a begin").is_none());
    }

    #[test]
    fn test_decode_known_vector() {
        let input = b"begin 644 cat.txt\n#0V%T\n`\nend\n";
        assert_eq!(decode(input).unwrap(), b"Cat");
    }

    #[test]
    fn test_encode_known_vector() {
        let out = encode(&Uuencode::with_filename("cat.txt"), b"Cat");
        assert_eq!(out, b"begin 644 cat.txt\n#0V%T\nend\n");
    }

    #[test]
    fn test_decode_skips_text_before_begin_and_lowercase_lines() {
        let input =
            b"mail header noise\n\nbegin 644 cat.txt\nplease see attached\n#0V%T\nend\n";
        assert_eq!(decode(input).unwrap(), b"Cat");
    }

    #[test]
    fn test_decode_skips_inconsistent_length_line() {
        // Declared length 3 but eight payload characters.
        let input = b"begin 644 x\n#0V%T0V%T\n#0V%T\nend\n";
        assert_eq!(decode(input).unwrap(), b"Cat");
    }

    #[test]
    fn test_decode_no_begin_is_an_error() {
        assert!(matches!(
            decode(b"JUST SOME TEXT\n"),
            Err(MimeError::NoBegin)
        ));
    }

    #[test]
    fn test_decode_missing_end_is_recovered() {
        assert_eq!(decode(b"begin 644 x\n#0V%T\n").unwrap(), b"Cat");
    }

    #[test]
    fn test_round_trip_binary_payload() {
        let payload: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let codec = Uuencode::with_filename("x.bin");
        let encoded = encode(&codec, &payload);
        let text = String::from_utf8(encoded.clone()).unwrap();
        assert!(text.starts_with("begin 644 x.bin\n"));
        assert!(text.ends_with("end\n"));
        assert_eq!(decode(&encoded).unwrap(), payload);
    }

    #[test]
    fn test_encoder_never_emits_lowercase_payload() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let encoded = encode(&Uuencode::default(), &payload);
        for line in encoded.split(|&b| b == b'\n').skip(1) {
            if line.starts_with(b"end") || line.is_empty() {
                continue;
            }
            assert!(!line.iter().any(u8::is_ascii_lowercase));
        }
    }
}
