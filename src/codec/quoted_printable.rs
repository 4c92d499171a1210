//! Quoted-printable codec for Content-Transfer-Encoding (RFC 1521).

use crate::codec::Codec;
use crate::error::Result;
use crate::stream::{split_eol, Eol, Stream};

/// Maximum output columns per encoded line, soft-break `=` included.
const LINE_WIDTH: usize = 76;

const HEX_DECODE: [i8; 256] = {
    let mut t = [-1i8; 256];
    let mut i = 0u8;
    while i < 10 {
        t[(b'0' + i) as usize] = i as i8;
        i += 1;
    }
    let mut i = 0u8;
    while i < 6 {
        t[(b'A' + i) as usize] = (10 + i) as i8;
        t[(b'a' + i) as usize] = (10 + i) as i8;
        i += 1;
    }
    t
};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Line-oriented quoted-printable decoder/encoder.
///
/// Decoding accepts lowercase hex and passes stray `=` through unchanged.
/// Encoding escapes everything outside printable ASCII, `=` itself, and
/// trailing whitespace, folding with soft breaks at 76 columns.
pub struct QuotedPrintable;

impl Codec for QuotedPrintable {
    fn decode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
        let mut line = Vec::new();
        let mut out = Vec::new();
        loop {
            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let (content, eol) = split_eol(&line);
            out.clear();

            let mut soft_break = false;
            let mut i = 0;
            while i < content.len() {
                let b = content[i];
                if b != b'=' {
                    out.push(b);
                    i += 1;
                    continue;
                }
                if i + 2 < content.len() {
                    let v1 = HEX_DECODE[content[i + 1] as usize];
                    let v2 = HEX_DECODE[content[i + 2] as usize];
                    if v1 >= 0 && v2 >= 0 {
                        out.push(((v1 as u8) << 4) | v2 as u8);
                        i += 3;
                        continue;
                    }
                } else if i + 1 == content.len() {
                    // `=` as the last byte of the line: soft line break.
                    soft_break = true;
                    i += 1;
                    continue;
                }
                // Stray `=`: pass it through.
                out.push(b);
                i += 1;
            }

            if !soft_break && eol != Eol::None {
                out.push(b'\n');
            }
            output.write(&out)?;
        }
    }

    fn encode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()> {
        let mut line = Vec::new();
        let mut out = Vec::new();
        loop {
            if input.read_line(&mut line)? == 0 {
                return Ok(());
            }
            let (content, eol) = split_eol(&line);
            out.clear();

            let trailing_ws = content
                .iter()
                .rev()
                .take_while(|&&b| b == b' ' || b == b'\t')
                .count();
            let hard_end = content.len() - trailing_ws;

            let mut col = 0;
            for (i, &b) in content.iter().enumerate() {
                let literal =
                    (b == b' ' || b == b'\t' || (33..=126).contains(&b) && b != b'=') && i < hard_end;
                let width = if literal { 1 } else { 3 };
                if col + width > LINE_WIDTH - 1 {
                    out.extend_from_slice(b"=\n");
                    col = 0;
                }
                if literal {
                    out.push(b);
                } else {
                    out.push(b'=');
                    out.push(HEX_DIGITS[(b >> 4) as usize]);
                    out.push(HEX_DIGITS[(b & 0x0f) as usize]);
                }
                col += width;
            }

            if eol != Eol::None {
                out.push(b'\n');
            }
            output.write(&out)?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemStream;

    fn decode(input: &[u8]) -> Vec<u8> {
        let mut src = MemStream::from_bytes(input);
        let mut dst = MemStream::new();
        QuotedPrintable.decode(&mut src, &mut dst).unwrap();
        dst.into_bytes()
    }

    fn encode(input: &[u8]) -> Vec<u8> {
        let mut src = MemStream::from_bytes(input);
        let mut dst = MemStream::new();
        QuotedPrintable.encode(&mut src, &mut dst).unwrap();
        dst.into_bytes()
    }

    #[test]
    fn test_decode_hex_escape() {
        assert_eq!(decode(b"caf=E9\n"), b"caf\xE9\n");
    }

    #[test]
    fn test_decode_lowercase_hex() {
        assert_eq!(decode(b"caf=e9\n"), b"caf\xE9\n");
    }

    #[test]
    fn test_decode_soft_break_joins_lines() {
        let input = b"A very long line that exceeds the column limit and must wrap=\nhere.";
        assert_eq!(
            decode(input),
            b"A very long line that exceeds the column limit and must wraphere."
        );
    }

    #[test]
    fn test_decode_hard_break_kept() {
        assert_eq!(decode(b"a\nb\n"), b"a\nb\n");
    }

    #[test]
    fn test_decode_stray_equals_passthrough() {
        assert_eq!(decode(b"a=zb\n"), b"a=zb\n");
        assert_eq!(decode(b"a=\x20b\n"), b"a= b\n");
    }

    #[test]
    fn test_encode_escapes_non_ascii_and_equals() {
        assert_eq!(encode(b"caf\xE9\n"), b"caf=E9\n");
        assert_eq!(encode(b"a=b\n"), b"a=3Db\n");
    }

    #[test]
    fn test_encode_escapes_trailing_whitespace() {
        assert_eq!(encode(b"hi \n"), b"hi=20\n");
        assert_eq!(encode(b"tab\t\n"), b"tab=09\n");
        // Interior whitespace stays literal.
        assert_eq!(encode(b"a b\n"), b"a b\n");
    }

    #[test]
    fn test_encode_folds_long_lines() {
        let input = [b"A".repeat(100), b"\n".to_vec()].concat();
        let encoded = encode(&input);
        assert_eq!(
            encoded,
            [b"A".repeat(75), b"=\n".to_vec(), b"A".repeat(25), b"\n".to_vec()].concat()
        );
        for line in encoded.split(|&b| b == b'\n') {
            assert!(line.len() <= 76);
        }
    }

    #[test]
    fn test_round_trip_text() {
        let input = b"Caf\xE9 con le\xF1a = good,\nsecond line  \nlast".to_vec();
        assert_eq!(decode(&encode(&input)), input);
    }
}
