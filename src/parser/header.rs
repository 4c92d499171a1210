//! RFC 822 header field parsing: folding, field lookup, and MIME accessors.

use crate::error::Result;
use crate::stream::{split_eol, Stream};

/// A parsed message header.
///
/// Fields keep their input order; names are stored lowercased. Values are
/// unfolded (continuation lines joined with a single space) and trimmed.
#[derive(Debug, Clone)]
pub struct Head {
    fields: Vec<(String, String)>,
}

impl Head {
    /// Parse a header from `reader`, consuming through the blank separator
    /// line.
    ///
    /// Returns `None` when the input is already at end of data. A header
    /// terminated by end of input instead of a blank line is accepted. Lines
    /// that are neither a `name: value` field nor a continuation are silently
    /// skipped, the way tolerant mail software treats mailbox noise.
    pub fn read_from(reader: &mut dyn Stream) -> Result<Option<Head>> {
        let mut line = Vec::new();
        let mut fields: Vec<(String, String)> = Vec::new();
        let mut saw_input = false;

        loop {
            if reader.read_line(&mut line)? == 0 {
                if !saw_input {
                    return Ok(None);
                }
                break;
            }
            saw_input = true;
            let (content, _) = split_eol(&line);
            if content.is_empty() {
                break;
            }

            let text = String::from_utf8_lossy(content);
            if text.starts_with(' ') || text.starts_with('\t') {
                // Continuation line
                if let Some(last) = fields.last_mut() {
                    last.1.push(' ');
                    last.1.push_str(text.trim());
                }
            } else if let Some(colon) = text.find(':') {
                let name = text[..colon].trim().to_lowercase();
                let value = text[colon + 1..].trim().to_string();
                fields.push((name, value));
            }
        }

        Ok(Some(Head { fields }))
    }

    /// The `index`-th value of the named field (case-insensitive), if any.
    pub fn get(&self, name: &str, index: usize) -> Option<&str> {
        let name = name.to_lowercase();
        self.fields
            .iter()
            .filter(|(k, _)| *k == name)
            .nth(index)
            .map(|(_, v)| v.as_str())
    }

    /// Number of occurrences of the named field.
    pub fn count(&self, name: &str) -> usize {
        let name = name.to_lowercase();
        self.fields.iter().filter(|(k, _)| *k == name).count()
    }

    /// The `(type, subtype)` of the content-type field, lowercased.
    ///
    /// Defaults to `("text", "plain")` when the field is absent or empty.
    pub fn mime_type(&self) -> (String, String) {
        let value = self.get("content-type", 0).unwrap_or_default();
        let full = value.split(';').next().unwrap_or("").trim().to_lowercase();
        if full.is_empty() {
            return ("text".to_string(), "plain".to_string());
        }
        match full.split_once('/') {
            Some((ty, sub)) => (ty.trim().to_string(), sub.trim().to_string()),
            None => (full, String::new()),
        }
    }

    /// The content-transfer-encoding, lowercased; `"binary"` when absent.
    pub fn mime_encoding(&self) -> String {
        let value = self
            .get("content-transfer-encoding", 0)
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if value.is_empty() {
            "binary".to_string()
        } else {
            value
        }
    }

    /// The multipart boundary parameter, unquoted. `None` when absent or
    /// empty.
    pub fn multipart_boundary(&self) -> Option<String> {
        self.param("content-type", "boundary")
            .filter(|b| !b.is_empty())
    }

    /// The filename suggested by the header: the content-disposition
    /// `filename` parameter, falling back to the content-type `name`.
    pub fn recommended_filename(&self) -> Option<String> {
        self.param("content-disposition", "filename")
            .or_else(|| self.param("content-type", "name"))
            .filter(|f| !f.is_empty())
    }

    /// A `; name=value` parameter of a structured field, unquoted.
    pub fn param(&self, field: &str, name: &str) -> Option<String> {
        let value = self.get(field, 0)?;
        for piece in split_outside_quotes(value).into_iter().skip(1) {
            if let Some((key, val)) = piece.split_once('=') {
                if key.trim().eq_ignore_ascii_case(name) {
                    return Some(unquote(val.trim()));
                }
            }
        }
        None
    }
}

/// Split a structured field value on `;`, ignoring semicolons inside
/// double-quoted strings.
fn split_outside_quotes(value: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                pieces.push(value[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    pieces.push(value[start..].trim());
    pieces
}

/// Strip surrounding double quotes and resolve backslash escapes.
fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value);
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemStream;

    fn head_of(raw: &[u8]) -> Head {
        let mut s = MemStream::from_bytes(raw);
        Head::read_from(&mut s).unwrap().unwrap()
    }

    #[test]
    fn test_read_stops_at_blank_line() {
        let mut s = MemStream::from_bytes(&b"Subject: hi\n\nbody\n"[..]);
        let head = Head::read_from(&mut s).unwrap().unwrap();
        assert_eq!(head.get("subject", 0), Some("hi"));
        // The body is still in the stream.
        let mut line = Vec::new();
        s.read_line(&mut line).unwrap();
        assert_eq!(line, b"body\n");
    }

    #[test]
    fn test_read_handles_crlf() {
        let head = head_of(b"Subject: hi\r\nX-One: 1\r\n\r\n");
        assert_eq!(head.get("subject", 0), Some("hi"));
        assert_eq!(head.get("x-one", 0), Some("1"));
    }

    #[test]
    fn test_read_at_eof_returns_none() {
        let mut s = MemStream::new();
        assert!(Head::read_from(&mut s).unwrap().is_none());
    }

    #[test]
    fn test_unfolds_continuation_lines() {
        let head = head_of(b"Subject: a long\n\tfolded value\n\n");
        assert_eq!(head.get("subject", 0), Some("a long folded value"));
    }

    #[test]
    fn test_get_with_index() {
        let head = head_of(b"Received: first\nReceived: second\n\n");
        assert_eq!(head.get("received", 0), Some("first"));
        assert_eq!(head.get("Received", 1), Some("second"));
        assert_eq!(head.get("received", 2), None);
        assert_eq!(head.count("received"), 2);
    }

    #[test]
    fn test_junk_lines_are_skipped() {
        let head = head_of(b"no colon here\nSubject: ok\n\n");
        assert_eq!(head.get("subject", 0), Some("ok"));
        assert_eq!(head.count("subject"), 1);
    }

    #[test]
    fn test_mime_type_default_and_case() {
        assert_eq!(
            head_of(b"Subject: x\n\n").mime_type(),
            ("text".to_string(), "plain".to_string())
        );
        assert_eq!(
            head_of(b"Content-type: Image/GIF\n\n").mime_type(),
            ("image".to_string(), "gif".to_string())
        );
    }

    #[test]
    fn test_mime_encoding_default_binary() {
        assert_eq!(head_of(b"Subject: x\n\n").mime_encoding(), "binary");
        assert_eq!(
            head_of(b"Content-transfer-encoding: BASE64\n\n").mime_encoding(),
            "base64"
        );
    }

    #[test]
    fn test_boundary_plain_and_quoted() {
        let head = head_of(b"Content-type: multipart/mixed; boundary=abc-123\n\n");
        assert_eq!(head.multipart_boundary().as_deref(), Some("abc-123"));
        let head = head_of(b"Content-type: multipart/mixed; boundary=\"gc0p4Jq0M;2Yt08jU\"\n\n");
        assert_eq!(head.multipart_boundary().as_deref(), Some("gc0p4Jq0M;2Yt08jU"));
    }

    #[test]
    fn test_boundary_absent() {
        assert!(head_of(b"Content-type: multipart/mixed\n\n")
            .multipart_boundary()
            .is_none());
        assert!(head_of(b"Content-type: multipart/mixed; boundary=\"\"\n\n")
            .multipart_boundary()
            .is_none());
    }

    #[test]
    fn test_recommended_filename_fallback() {
        let head = head_of(
            b"Content-type: image/gif; name=\"ct.gif\"\nContent-disposition: attachment; filename=\"cd.gif\"\n\n",
        );
        assert_eq!(head.recommended_filename().as_deref(), Some("cd.gif"));
        let head = head_of(b"Content-type: image/gif; name=ct.gif\n\n");
        assert_eq!(head.recommended_filename().as_deref(), Some("ct.gif"));
        assert!(head_of(b"Content-type: image/gif\n\n")
            .recommended_filename()
            .is_none());
    }

    #[test]
    fn test_param_with_escapes() {
        let head = head_of(b"Content-disposition: attachment; filename=\"a \\\"b\\\".txt\"\n\n");
        assert_eq!(head.recommended_filename().as_deref(), Some("a \"b\".txt"));
    }
}
