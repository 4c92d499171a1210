//! Parser configuration.
//!
//! Plain data, serde-ready so a host application can embed it in its own
//! config file. The output-body policy is a callback on the parser itself
//! (see [`crate::parser::mime::MimeParser::set_body_policy`]) and is not part
//! of this struct.

use serde::{Deserialize, Serialize};

/// Default limit on multipart nesting depth.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Configuration for a [`crate::parser::mime::MimeParser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// How `message/rfc822` leaves are handled.
    pub nested_message_mode: NestedMessageMode,
    /// Maximum multipart nesting depth before the parse fails.
    pub max_depth: usize,
}

/// Handling of `message/rfc822` leaf bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestedMessageMode {
    /// Treat the nested message as an opaque leaf body.
    Off,
    /// Reparse it; the inner message becomes the sole child of the envelope.
    Nest,
    /// Reparse it; the inner message replaces the envelope entirely, and the
    /// envelope headers are lost.
    Replace,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            nested_message_mode: NestedMessageMode::Off,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl Default for NestedMessageMode {
    fn default() -> Self {
        Self::Off
    }
}
