//! The trivial codecs: `binary` and the line-oriented `7bit`/`8bit` pair.

use crate::codec::Codec;
use crate::error::Result;
use crate::stream::{split_eol, Eol, Stream};

/// Copy buffer size for verbatim transfers.
const COPY_CHUNK: usize = 8192;

/// `binary`: bytes pass through untouched in both directions.
pub struct Binary;

impl Codec for Binary {
    fn decode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
        copy_verbatim(input, output)
    }

    fn encode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
        copy_verbatim(input, output)
    }
}

/// `7bit` / `8bit`: line-oriented text.
///
/// Decoding normalizes `\r\n` terminators to `\n`; encoding emits lines as-is
/// with no wrapping. Bytes inside a line are never altered.
pub struct Text;

impl Codec for Text {
    fn decode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
        let mut line = Vec::new();
        loop {
            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let (content, eol) = split_eol(&line);
            output.write(content)?;
            match eol {
                Eol::None => {}
                Eol::Lf | Eol::CrLf => output.write(b"\n")?,
            }
        }
    }

    fn encode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
        copy_verbatim(input, output)
    }
}

fn copy_verbatim(input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
    let mut chunk = [0u8; COPY_CHUNK];
    loop {
        let n = input.read(&mut chunk)?;
        if n == 0 {
            return Ok(());
        }
        output.write(&chunk[..n])?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemStream;

    fn run(codec: &dyn Codec, decode: bool, input: &[u8]) -> Vec<u8> {
        let mut src = MemStream::from_bytes(input);
        let mut dst = MemStream::new();
        if decode {
            codec.decode(&mut src, &mut dst).unwrap();
        } else {
            codec.encode(&mut src, &mut dst).unwrap();
        }
        dst.into_bytes()
    }

    #[test]
    fn test_binary_preserves_everything() {
        let data = b"line\r\nwith\x00nul\nand no final newline";
        assert_eq!(run(&Binary, true, data), data);
        assert_eq!(run(&Binary, false, data), data);
    }

    #[test]
    fn test_text_decode_normalizes_crlf() {
        assert_eq!(run(&Text, true, b"a\r\nb\r\n"), b"a\nb\n");
        assert_eq!(run(&Text, true, b"a\nb\n"), b"a\nb\n");
    }

    #[test]
    fn test_text_decode_keeps_missing_final_terminator() {
        assert_eq!(run(&Text, true, b"a\r\nb"), b"a\nb");
    }

    #[test]
    fn test_text_encode_is_verbatim() {
        assert_eq!(run(&Text, false, b"a\nlonger line\n"), b"a\nlonger line\n");
    }
}
