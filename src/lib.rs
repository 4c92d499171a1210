//! `mimetree` — streaming MIME message parsing.
//!
//! This crate turns an RFC-822/RFC-1521 byte stream into a tree of entities
//! (headers plus decoded bodies) and provides the content-transfer-encoding
//! codecs the parser uses to materialize each leaf part.

pub mod body;
pub mod codec;
pub mod config;
pub mod entity;
pub mod error;
pub mod parser;
pub mod stream;
