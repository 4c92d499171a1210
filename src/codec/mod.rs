//! Content-transfer-encoding codecs.
//!
//! Every codec exposes the same pair of operations over [`Stream`]s and runs
//! until the input reports end of data. Codecs never look for multipart
//! boundaries; the parser stages encoded bodies into bounded temp streams
//! before handing them over.

pub mod base64;
pub mod identity;
pub mod quoted_printable;
pub mod uuencode;

use crate::error::Result;
use crate::stream::Stream;

/// A content-transfer-encoding decoder/encoder pair.
pub trait Codec {
    /// Decode everything in `input`, writing the raw bytes to `output`.
    fn decode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()>;

    /// Encode everything in `input`, writing encoded text to `output`.
    fn encode(&self, input: &mut dyn Stream, output: &mut dyn Stream) -> Result<()>;
}

/// Look up the codec for a content-transfer-encoding name.
///
/// The name is matched case-insensitively. Returns `None` for encodings this
/// crate does not know; the parser falls back to `binary` in that case.
pub fn for_encoding(name: &str) -> Option<Box<dyn Codec>> {
    match name.to_ascii_lowercase().as_str() {
        "binary" => Some(Box::new(identity::Binary)),
        "7bit" | "8bit" => Some(Box::new(identity::Text)),
        "base64" => Some(Box::new(base64::Base64)),
        "quoted-printable" => Some(Box::new(quoted_printable::QuotedPrintable)),
        "x-uu" | "x-uuencode" => Some(Box::new(uuencode::Uuencode::default())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_known_encodings() {
        for name in ["binary", "7bit", "8bit", "base64", "quoted-printable", "x-uu", "x-uuencode"] {
            assert!(for_encoding(name).is_some(), "missing codec for {name}");
        }
    }

    #[test]
    fn test_registry_is_case_insensitive() {
        assert!(for_encoding("Base64").is_some());
        assert!(for_encoding("QUOTED-PRINTABLE").is_some());
    }

    #[test]
    fn test_registry_unknown_encoding() {
        assert!(for_encoding("x-gzip64").is_none());
    }
}
