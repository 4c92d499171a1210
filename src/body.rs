//! Body sinks: write-then-read storage for a decoded leaf body.
//!
//! Two backings: an in-memory buffer and an on-disk file. The parser obtains
//! bodies from a caller-supplied policy, fills them exactly once, and hands
//! them back attached to the entity tree. Once writing finishes the content
//! is immutable; reopening for reading yields the same bytes.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::stream::{FileStream, MemStream, Stream};

/// Storage destination for one decoded leaf body.
#[derive(Debug)]
pub struct Body {
    kind: BodyKind,
    binary: bool,
}

#[derive(Debug)]
enum BodyKind {
    Memory(MemStream),
    File(PathBuf),
}

impl Body {
    /// A body backed by an in-memory buffer.
    pub fn memory() -> Self {
        Self {
            kind: BodyKind::Memory(MemStream::new()),
            binary: false,
        }
    }

    /// A body backed by a file at `path` (created on first write).
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: BodyKind::File(path.into()),
            binary: false,
        }
    }

    /// Mark the content as binary rather than text.
    ///
    /// Documentation only: the flag never alters the stored bytes.
    pub fn set_binary(&mut self, binary: bool) {
        self.binary = binary;
    }

    /// `true` if the content was declared binary.
    pub fn is_binary(&self) -> bool {
        self.binary
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        match &self.kind {
            BodyKind::Memory(_) => None,
            BodyKind::File(path) => Some(path),
        }
    }

    /// Content size in bytes.
    pub fn size(&self) -> Result<u64> {
        match &self.kind {
            BodyKind::Memory(buf) => Ok(buf.len() as u64),
            BodyKind::File(path) => {
                let meta = std::fs::metadata(path)
                    .map_err(|e| crate::error::MimeError::io(path.display().to_string(), e))?;
                Ok(meta.len())
            }
        }
    }

    /// Open the body for writing, discarding any previous content.
    pub fn open_write(&mut self) -> Result<BodyHandle<'_>> {
        match &mut self.kind {
            BodyKind::Memory(buf) => {
                buf.truncate();
                Ok(BodyHandle::Memory(buf))
            }
            BodyKind::File(path) => Ok(BodyHandle::File(FileStream::create(path)?)),
        }
    }

    /// Open the body for reading from the start.
    pub fn open_read(&mut self) -> Result<BodyHandle<'_>> {
        match &mut self.kind {
            BodyKind::Memory(buf) => {
                buf.rewind();
                Ok(BodyHandle::Memory(buf))
            }
            BodyKind::File(path) => Ok(BodyHandle::File(FileStream::open(path)?)),
        }
    }

    /// Read the whole content into a fresh buffer.
    pub fn bytes(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut reader = self.open_read()?;
        let mut chunk = [0u8; 8192];
        loop {
            let n = reader.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&chunk[..n]);
        }
        Ok(out)
    }
}

/// An open read or write handle on a [`Body`].
#[derive(Debug)]
pub enum BodyHandle<'a> {
    Memory(&'a mut MemStream),
    File(FileStream),
}

impl Stream for BodyHandle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            Self::Memory(s) => s.read(buf),
            Self::File(s) => s.read(buf),
        }
    }

    fn read_line(&mut self, line: &mut Vec<u8>) -> Result<usize> {
        match self {
            Self::Memory(s) => s.read_line(line),
            Self::File(s) => s.read_line(line),
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        match self {
            Self::Memory(s) => s.write(buf),
            Self::File(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            Self::Memory(s) => s.flush(),
            Self::File(s) => s.flush(),
        }
    }

    fn seek(&mut self, pos: std::io::SeekFrom) -> Result<u64> {
        match self {
            Self::Memory(s) => s.seek(pos),
            Self::File(s) => s.seek(pos),
        }
    }

    fn tell(&mut self) -> Result<u64> {
        match self {
            Self::Memory(s) => s.tell(),
            Self::File(s) => s.tell(),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::Memory(s) => s.close(),
            Self::File(s) => s.close(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_body_write_then_read() {
        let mut body = Body::memory();
        {
            let mut w = body.open_write().unwrap();
            w.write(b"decoded bytes").unwrap();
            w.close().unwrap();
        }
        assert_eq!(body.size().unwrap(), 13);
        assert_eq!(body.bytes().unwrap(), b"decoded bytes");
        // Reopening yields the same bytes.
        assert_eq!(body.bytes().unwrap(), b"decoded bytes");
    }

    #[test]
    fn test_memory_body_rewrite_truncates() {
        let mut body = Body::memory();
        body.open_write().unwrap().write(b"long first draft").unwrap();
        body.open_write().unwrap().write(b"short").unwrap();
        assert_eq!(body.bytes().unwrap(), b"short");
    }

    #[test]
    fn test_file_body_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("part.bin");
        let mut body = Body::file(&path);
        {
            let mut w = body.open_write().unwrap();
            w.write(b"on disk").unwrap();
            w.flush().unwrap();
        }
        assert_eq!(body.path(), Some(path.as_path()));
        assert_eq!(body.size().unwrap(), 7);
        assert_eq!(body.bytes().unwrap(), b"on disk");
    }

    #[test]
    fn test_binary_flag_does_not_touch_bytes() {
        let mut body = Body::memory();
        body.open_write().unwrap().write(b"\r\nraw\r\n").unwrap();
        body.set_binary(true);
        assert!(body.is_binary());
        assert_eq!(body.bytes().unwrap(), b"\r\nraw\r\n");
    }
}
