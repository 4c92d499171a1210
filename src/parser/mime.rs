//! Recursive-descent MIME parser.
//!
//! One pass over a [`Stream`] produces an [`Entity`] tree. The parser reads
//! line-by-line, tolerant of mixed `\n` and `\r\n` terminators; boundary
//! lines are matched byte-exactly after stripping the terminator. Encoded
//! leaf bodies are staged through an anonymous temp file so the codecs see
//! bounded, rewindable input and never need to know about boundaries.

use std::io::SeekFrom;

use tracing::warn;

use crate::body::Body;
use crate::codec::{self, Codec};
use crate::config::{NestedMessageMode, ParserConfig};
use crate::entity::Entity;
use crate::error::{MimeError, Result};
use crate::parser::header::Head;
use crate::stream::{split_eol, Eol, FileStream, Stream};

/// How scanning one part's body ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminal {
    /// End of input.
    Eof,
    /// The enclosing multipart's `--boundary` line.
    Delim,
    /// The enclosing multipart's `--boundary--` line.
    Close,
}

/// The delimiter pair derived from a raw boundary parameter.
struct Boundary {
    delim: Vec<u8>,
    close: Vec<u8>,
}

impl Boundary {
    fn new(raw: &str) -> Self {
        let delim = format!("--{raw}").into_bytes();
        let mut close = delim.clone();
        close.extend_from_slice(b"--");
        Self { delim, close }
    }
}

/// Policy hook: allocate the body sink for a leaf about to be decoded.
pub type BodyPolicy = Box<dyn FnMut(&Head) -> Body>;

/// Streaming MIME parser.
///
/// Reusable across messages; each [`read`](Self::read) call parses one
/// message and returns its entity tree. On failure the first header parsed
/// is kept available through [`last_head`](Self::last_head) so callers can
/// still identify the offending message.
pub struct MimeParser {
    config: ParserConfig,
    body_policy: BodyPolicy,
    last_head: Option<Head>,
}

impl Default for MimeParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeParser {
    /// A parser with default configuration and in-memory bodies.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// A parser with the given configuration.
    pub fn with_config(config: ParserConfig) -> Self {
        Self {
            config,
            body_policy: Box::new(|_| Body::memory()),
            last_head: None,
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Replace the body allocation policy.
    ///
    /// The policy is consulted once per leaf, with the leaf's header, and
    /// decides where that leaf's decoded bytes live (memory, a file, ...).
    pub fn set_body_policy(&mut self, policy: impl FnMut(&Head) -> Body + 'static) {
        self.body_policy = Box::new(policy);
    }

    /// Parse one message from `input` into an entity tree.
    pub fn read(&mut self, input: &mut dyn Stream) -> Result<Entity> {
        self.last_head = None;
        let (entity, _) = self.parse_part(input, None, 0)?;
        Ok(entity)
    }

    /// The top-level header of the message last passed to `read`, if one was
    /// parsed before any failure.
    pub fn last_head(&self) -> Option<&Head> {
        self.last_head.as_ref()
    }

    /// Parse one part: its header, then its body or children, up to the
    /// enclosing boundary (or end of input when there is none).
    fn parse_part(
        &mut self,
        reader: &mut dyn Stream,
        outer: Option<&Boundary>,
        depth: usize,
    ) -> Result<(Entity, Terminal)> {
        if depth >= self.config.max_depth {
            return Err(MimeError::TooDeep {
                max_depth: self.config.max_depth,
            });
        }

        let head = Head::read_from(reader)?.ok_or(MimeError::BadHeader)?;
        if self.last_head.is_none() {
            self.last_head = Some(head.clone());
        }

        let (mime_type, _) = head.mime_type();
        if mime_type == "multipart" {
            self.parse_multipart(head, reader, outer, depth)
        } else {
            self.parse_leaf(head, reader, outer, depth)
        }
    }

    fn parse_multipart(
        &mut self,
        head: Head,
        reader: &mut dyn Stream,
        outer: Option<&Boundary>,
        depth: usize,
    ) -> Result<(Entity, Terminal)> {
        let raw = head.multipart_boundary().ok_or(MimeError::MissingBoundary)?;
        let inner = Boundary::new(&raw);
        let mut entity = Entity::new(head);

        parse_preamble(&inner, reader)?;
        loop {
            let (child, state) = self.parse_part(reader, Some(&inner), depth + 1)?;
            if state == Terminal::Eof {
                return Err(MimeError::UnexpectedEof {
                    section: "multipart body",
                });
            }
            entity.add_part(child);
            if state == Terminal::Close {
                break;
            }
        }

        let terminal = parse_epilogue(outer, reader)?;
        Ok((entity, terminal))
    }

    fn parse_leaf(
        &mut self,
        head: Head,
        reader: &mut dyn Stream,
        outer: Option<&Boundary>,
        depth: usize,
    ) -> Result<(Entity, Terminal)> {
        let encoding = head.mime_encoding();
        let codec: Box<dyn Codec> = match codec::for_encoding(&encoding) {
            Some(codec) => codec,
            None => {
                warn!(
                    encoding = %encoding,
                    "no decoder for content-transfer-encoding, treating as binary"
                );
                Box::new(codec::identity::Binary)
            }
        };

        match outer {
            Some(bound) => {
                // Stage the encoded body so the codec sees bounded input.
                let mut staged = FileStream::temp()?;
                let terminal = parse_to_bound(bound, reader, &mut staged)?;
                staged.flush()?;
                staged.seek(SeekFrom::Start(0))?;
                let entity = self.finish_leaf(head, codec.as_ref(), &encoding, &mut staged, depth)?;
                Ok((entity, terminal))
            }
            None => {
                // No enclosing boundary: the rest of the stream is the body.
                let entity = self.finish_leaf(head, codec.as_ref(), &encoding, reader, depth)?;
                Ok((entity, Terminal::Eof))
            }
        }
    }

    /// Decode a staged leaf body into its final sink, or reparse it as a
    /// nested message when configured to.
    fn finish_leaf(
        &mut self,
        head: Head,
        codec: &dyn Codec,
        encoding: &str,
        encoded: &mut dyn Stream,
        depth: usize,
    ) -> Result<Entity> {
        let (ty, subty) = head.mime_type();
        let nested = self.config.nested_message_mode != NestedMessageMode::Off
            && ty == "message"
            && subty == "rfc822";

        if nested {
            let mut decoded = FileStream::temp()?;
            run_decode(codec, encoding, encoded, &mut decoded)?;
            decoded.flush()?;
            decoded.seek(SeekFrom::Start(0))?;
            let (inner, _) = self.parse_part(&mut decoded, None, depth + 1)?;
            return Ok(match self.config.nested_message_mode {
                NestedMessageMode::Replace => inner,
                _ => {
                    let mut envelope = Entity::new(head);
                    envelope.add_part(inner);
                    envelope
                }
            });
        }

        let mut body = (self.body_policy)(&head);
        body.set_binary(!textlike(&head));
        {
            let mut writer = body.open_write()?;
            run_decode(codec, encoding, encoded, &mut writer)?;
            writer.close()?;
        }
        let mut entity = Entity::new(head);
        entity.attach_body(body);
        Ok(entity)
    }
}

/// `true` when the primary type is handled as text by body sinks.
fn textlike(head: &Head) -> bool {
    let (ty, _) = head.mime_type();
    ty == "text" || ty == "message"
}

fn run_decode(
    codec: &dyn Codec,
    encoding: &str,
    input: &mut dyn Stream,
    output: &mut dyn Stream,
) -> Result<()> {
    codec.decode(input, output).map_err(|e| match e {
        e @ (MimeError::Io { .. } | MimeError::NoBegin) => e,
        other => MimeError::DecodeFailed {
            encoding: encoding.to_string(),
            reason: other.to_string(),
        },
    })
}

/// Copy body lines to `output` until the boundary line.
///
/// The end-of-line immediately preceding the boundary belongs to the
/// boundary, not the payload, so each line's terminator is held back and
/// only written once the next line proves it was not the last.
fn parse_to_bound(
    bound: &Boundary,
    reader: &mut dyn Stream,
    output: &mut dyn Stream,
) -> Result<Terminal> {
    let mut held_eol = Eol::None;
    let mut line = Vec::new();
    loop {
        if reader.read_line(&mut line)? == 0 {
            return Err(MimeError::UnexpectedEof {
                section: "part body",
            });
        }
        let (content, eol) = split_eol(&line);
        if content == bound.delim.as_slice() {
            return Ok(Terminal::Delim);
        }
        if content == bound.close.as_slice() {
            return Ok(Terminal::Close);
        }
        output.write(held_eol.as_bytes())?;
        output.write(content)?;
        held_eol = eol;
    }
}

/// Discard preamble lines until the first part's opening delimiter.
fn parse_preamble(bound: &Boundary, reader: &mut dyn Stream) -> Result<()> {
    let mut line = Vec::new();
    loop {
        if reader.read_line(&mut line)? == 0 {
            return Err(MimeError::UnexpectedEof {
                section: "multipart preamble",
            });
        }
        let (content, _) = split_eol(&line);
        if content == bound.delim.as_slice() {
            return Ok(());
        }
        if content == bound.close.as_slice() {
            return Err(MimeError::EmptyMultipart);
        }
    }
}

/// Discard epilogue lines until the enclosing boundary, or to end of input
/// when there is no enclosing multipart.
fn parse_epilogue(outer: Option<&Boundary>, reader: &mut dyn Stream) -> Result<Terminal> {
    let mut line = Vec::new();
    loop {
        if reader.read_line(&mut line)? == 0 {
            return Ok(Terminal::Eof);
        }
        if let Some(bound) = outer {
            let (content, _) = split_eol(&line);
            if content == bound.delim.as_slice() {
                return Ok(Terminal::Delim);
            }
            if content == bound.close.as_slice() {
                return Ok(Terminal::Close);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::MemStream;

    fn scan(bound: &Boundary, input: &[u8]) -> Result<(Vec<u8>, Terminal)> {
        let mut src = MemStream::from_bytes(input);
        let mut dst = MemStream::new();
        let terminal = parse_to_bound(bound, &mut src, &mut dst)?;
        Ok((dst.into_bytes(), terminal))
    }

    #[test]
    fn test_boundary_strings() {
        let b = Boundary::new("xyz");
        assert_eq!(b.delim, b"--xyz");
        assert_eq!(b.close, b"--xyz--");
    }

    #[test]
    fn test_scan_drops_eol_before_boundary() {
        let b = Boundary::new("b");
        let (payload, t) = scan(&b, b"A\nB\n--b\n").unwrap();
        assert_eq!(payload, b"A\nB");
        assert_eq!(t, Terminal::Delim);
    }

    #[test]
    fn test_scan_crlf_payload_preserved() {
        let b = Boundary::new("b");
        let (payload, t) = scan(&b, b"A\r\nB\r\n--b--\r\n").unwrap();
        assert_eq!(payload, b"A\r\nB");
        assert_eq!(t, Terminal::Close);
    }

    #[test]
    fn test_scan_boundary_on_first_line_gives_empty_payload() {
        let b = Boundary::new("b");
        let (payload, t) = scan(&b, b"--b\nrest\n").unwrap();
        assert_eq!(payload, b"");
        assert_eq!(t, Terminal::Delim);
    }

    #[test]
    fn test_scan_trailing_whitespace_disqualifies_boundary() {
        let b = Boundary::new("b");
        let (payload, t) = scan(&b, b"--b \n--b\n").unwrap();
        assert_eq!(payload, b"--b ");
        assert_eq!(t, Terminal::Delim);
    }

    #[test]
    fn test_scan_eof_without_boundary() {
        let b = Boundary::new("b");
        assert!(matches!(
            scan(&b, b"no terminator here\n"),
            Err(MimeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_preamble_rejects_immediate_close() {
        let b = Boundary::new("b");
        let mut src = MemStream::from_bytes(&b"preamble\n--b--\n"[..]);
        assert!(matches!(
            parse_preamble(&b, &mut src),
            Err(MimeError::EmptyMultipart)
        ));
    }

    #[test]
    fn test_epilogue_without_outer_consumes_to_eof() {
        let mut src = MemStream::from_bytes(&b"junk\nmore junk\n"[..]);
        assert_eq!(parse_epilogue(None, &mut src).unwrap(), Terminal::Eof);
        let mut line = Vec::new();
        assert_eq!(src.read_line(&mut line).unwrap(), 0);
    }

    #[test]
    fn test_epilogue_with_outer_stops_at_delimiter() {
        let b = Boundary::new("outer");
        let mut src = MemStream::from_bytes(&b"junk\n--outer\n"[..]);
        assert_eq!(parse_epilogue(Some(&b), &mut src).unwrap(), Terminal::Delim);
    }
}
