//! Stream adaptors: one byte-oriented interface over files, buffers, and line arrays.
//!
//! The parser and the codecs target only the [`Stream`] trait. Adaptors never
//! translate line endings; multipart boundary matching depends on seeing the
//! raw CR/LF bytes exactly as they appear in the input.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{MimeError, Result};

/// Size of the internal read buffer for file-backed streams.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// A uniform byte stream: the read/write/seek/getline capability set.
///
/// `read_line` returns the next line *including* its terminator (`\n` or
/// `\r\n`), or 0 at end of input. A final line with no terminator is returned
/// as-is. `write` writes the whole buffer or fails.
pub trait Stream {
    /// Read up to `buf.len()` bytes. Returns 0 at end of input.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Read the next line into `line` (cleared first), terminator included.
    ///
    /// Returns the number of bytes read; 0 means end of input.
    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize>;

    /// Write all of `buf`.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Flush buffered writes to the underlying destination.
    fn flush(&mut self) -> Result<()>;

    /// Reposition the stream. Returns the new position from the start.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Current position from the start of the stream.
    fn tell(&mut self) -> Result<u64>;

    /// Release the stream. Further use is an error or yields end of input.
    fn close(&mut self) -> Result<()>;

    /// Fill `buf` exactly, failing if the input ends first.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(MimeError::io(
                    "read_exact",
                    std::io::ErrorKind::UnexpectedEof.into(),
                ));
            }
            filled += n;
        }
        Ok(())
    }
}

// ── File streams ────────────────────────────────────────────────

/// Buffered stream over a [`File`].
///
/// Reads are buffered; the buffer is discarded (with position compensation)
/// whenever the caller writes or seeks, so write-then-rewind-then-read works
/// the way temp staging needs it to.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    buf: Vec<u8>,
    pos: usize,
}

impl FileStream {
    /// Open an existing file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| MimeError::io(path.display().to_string(), e))?;
        Ok(Self::from_file(file))
    }

    /// Create (truncating) a file open for both writing and reading back.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| MimeError::io(path.display().to_string(), e))?;
        Ok(Self::from_file(file))
    }

    /// An anonymous temporary file, unlinked by the OS when dropped.
    pub fn temp() -> Result<Self> {
        let file = tempfile::tempfile().map_err(|e| MimeError::io("temp file", e))?;
        Ok(Self::from_file(file))
    }

    /// Wrap an already-open file handle.
    pub fn from_file(file: File) -> Self {
        Self {
            file,
            buf: Vec::new(),
            pos: 0,
        }
    }

    /// Bytes buffered but not yet consumed by the caller.
    fn pending(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Refill the read buffer. Returns 0 at end of file.
    fn fill(&mut self) -> Result<usize> {
        self.buf.resize(READ_BUFFER_SIZE, 0);
        self.pos = 0;
        let n = self
            .file
            .read(&mut self.buf)
            .map_err(|e| MimeError::io("file stream", e))?;
        self.buf.truncate(n);
        Ok(n)
    }

    /// Drop buffered bytes, moving the file cursor back over them.
    fn discard_buffer(&mut self) -> Result<()> {
        let pending = self.pending();
        if pending > 0 {
            self.file
                .seek(SeekFrom::Current(-(pending as i64)))
                .map_err(|e| MimeError::io("file stream", e))?;
        }
        self.buf.clear();
        self.pos = 0;
        Ok(())
    }
}

impl Stream for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.pending() > 0 {
            let n = self.pending().min(buf.len());
            buf[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }
        self.file
            .read(buf)
            .map_err(|e| MimeError::io("file stream", e))
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize> {
        line.clear();
        loop {
            if self.pending() == 0 && self.fill()? == 0 {
                return Ok(line.len());
            }
            match find_newline(&self.buf[self.pos..]) {
                Some(i) => {
                    line.extend_from_slice(&self.buf[self.pos..self.pos + i + 1]);
                    self.pos += i + 1;
                    return Ok(line.len());
                }
                None => {
                    line.extend_from_slice(&self.buf[self.pos..]);
                    self.pos = self.buf.len();
                }
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.discard_buffer()?;
        self.file
            .write_all(buf)
            .map_err(|e| MimeError::io("file stream", e))
    }

    fn flush(&mut self) -> Result<()> {
        self.file
            .flush()
            .map_err(|e| MimeError::io("file stream", e))
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        // A relative seek must account for read-ahead still in the buffer.
        let pos = match pos {
            SeekFrom::Current(d) => SeekFrom::Current(d - self.pending() as i64),
            other => other,
        };
        self.buf.clear();
        self.pos = 0;
        self.file
            .seek(pos)
            .map_err(|e| MimeError::io("file stream", e))
    }

    fn tell(&mut self) -> Result<u64> {
        let at = self
            .file
            .stream_position()
            .map_err(|e| MimeError::io("file stream", e))?;
        Ok(at - self.pending() as u64)
    }

    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

// ── Memory streams ──────────────────────────────────────────────

/// Growable in-memory byte buffer with a cursor.
#[derive(Debug, Default, Clone)]
pub struct MemStream {
    buf: Vec<u8>,
    pos: usize,
}

impl MemStream {
    /// An empty stream positioned at the start.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stream over existing bytes, positioned at the start.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            buf: bytes.into(),
            pos: 0,
        }
    }

    /// The full content, independent of the cursor.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the stream, returning its content.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Content length in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// `true` if no bytes have been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Move the cursor back to the start.
    pub(crate) fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Discard all content and rewind.
    pub(crate) fn truncate(&mut self) {
        self.buf.clear();
        self.pos = 0;
    }
}

impl Stream for MemStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        let n = rest.len().min(buf.len());
        buf[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize> {
        line.clear();
        let rest = &self.buf[self.pos.min(self.buf.len())..];
        if rest.is_empty() {
            return Ok(0);
        }
        let end = match find_newline(rest) {
            Some(i) => i + 1,
            None => rest.len(),
        };
        line.extend_from_slice(&rest[..end]);
        self.pos += end;
        Ok(end)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if self.pos > self.buf.len() {
            // Seek past end followed by a write pads with zeros, like a file.
            self.buf.resize(self.pos, 0);
        }
        let overlap = (self.buf.len() - self.pos).min(buf.len());
        self.buf[self.pos..self.pos + overlap].copy_from_slice(&buf[..overlap]);
        self.buf.extend_from_slice(&buf[overlap..]);
        self.pos += buf.len();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(d) => self.pos as i64 + d,
            SeekFrom::End(d) => self.buf.len() as i64 + d,
        };
        if target < 0 {
            return Err(MimeError::io(
                "memory stream",
                std::io::ErrorKind::InvalidInput.into(),
            ));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }

    fn tell(&mut self) -> Result<u64> {
        Ok(self.pos as u64)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

// ── Line streams ────────────────────────────────────────────────

/// Read-only adaptor over a sequence of owned lines.
///
/// Lines are used verbatim: callers include the terminators they want the
/// parser to see. One entry is one line.
#[derive(Debug, Default, Clone)]
pub struct LineStream {
    lines: Vec<Vec<u8>>,
    line: usize,
    off: usize,
}

impl LineStream {
    /// Build a stream from any iterable of line buffers.
    pub fn new<I, L>(lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Vec<u8>>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            line: 0,
            off: 0,
        }
    }
}

impl Stream for LineStream {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() && self.line < self.lines.len() {
            let src = &self.lines[self.line][self.off..];
            let n = src.len().min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&src[..n]);
            filled += n;
            self.off += n;
            if self.off >= self.lines[self.line].len() {
                self.line += 1;
                self.off = 0;
            }
        }
        Ok(filled)
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize> {
        line.clear();
        if self.line >= self.lines.len() {
            return Ok(0);
        }
        line.extend_from_slice(&self.lines[self.line][self.off..]);
        self.line += 1;
        self.off = 0;
        Ok(line.len())
    }

    fn write(&mut self, _buf: &[u8]) -> Result<()> {
        Err(MimeError::Unsupported("write on a line stream"))
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let total: u64 = self.lines.iter().map(|l| l.len() as u64).sum();
        let target = match pos {
            SeekFrom::Start(n) => n as i64,
            SeekFrom::Current(d) => self.tell()? as i64 + d,
            SeekFrom::End(d) => total as i64 + d,
        };
        if target < 0 {
            return Err(MimeError::io(
                "line stream",
                std::io::ErrorKind::InvalidInput.into(),
            ));
        }
        let mut remaining = target as u64;
        self.line = self.lines.len();
        self.off = 0;
        for (i, l) in self.lines.iter().enumerate() {
            if remaining < l.len() as u64 {
                self.line = i;
                self.off = remaining as usize;
                break;
            }
            remaining -= l.len() as u64;
        }
        Ok(target as u64)
    }

    fn tell(&mut self) -> Result<u64> {
        let before: u64 = self.lines[..self.line].iter().map(|l| l.len() as u64).sum();
        Ok(before + self.off as u64)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn find_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// The end-of-line sequence carried by one raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eol {
    /// Final line of input with no terminator.
    None,
    Lf,
    CrLf,
}

impl Eol {
    pub(crate) fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::None => b"",
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
        }
    }
}

/// Split a raw line into its content and its end-of-line sequence.
pub(crate) fn split_eol(line: &[u8]) -> (&[u8], Eol) {
    if let Some(rest) = line.strip_suffix(b"\r\n") {
        (rest, Eol::CrLf)
    } else if let Some(rest) = line.strip_suffix(b"\n") {
        (rest, Eol::Lf)
    } else {
        (line, Eol::None)
    }
}
