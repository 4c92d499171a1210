//! The entity tree: the parse result handed back to callers.
//!
//! A leaf entity carries a header and one decoded body; a multipart container
//! carries a header and an ordered list of child entities. The tree is never
//! mutated after the parser returns it.

use std::io::Write;

use crate::body::Body;
use crate::parser::header::Head;

/// One node of the parse tree.
#[derive(Debug)]
pub struct Entity {
    head: Head,
    body: Option<Body>,
    parts: Vec<Entity>,
    content_type: (String, String),
}

impl Entity {
    /// Create an entity around a parsed header. The content type is cached
    /// from the header at construction.
    pub fn new(head: Head) -> Self {
        let content_type = head.mime_type();
        Self {
            head,
            body: None,
            parts: Vec::new(),
            content_type,
        }
    }

    /// The entity's header.
    pub fn head(&self) -> &Head {
        &self.head
    }

    /// The decoded body, present on leaves after a successful parse.
    pub fn body(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Mutable access to the body, for reading its content.
    pub fn body_mut(&mut self) -> Option<&mut Body> {
        self.body.as_mut()
    }

    pub(crate) fn attach_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// Child entities, in input order. Empty for leaves.
    pub fn parts(&self) -> &[Entity] {
        &self.parts
    }

    /// The `i`-th child entity, if any.
    pub fn part(&self, i: usize) -> Option<&Entity> {
        self.parts.get(i)
    }

    /// Mutable access to the `i`-th child entity.
    pub fn part_mut(&mut self, i: usize) -> Option<&mut Entity> {
        self.parts.get_mut(i)
    }

    /// Append a child entity.
    pub fn add_part(&mut self, child: Entity) {
        self.parts.push(child);
    }

    /// Cached `(type, subtype)` pair, lowercased.
    pub fn content_type(&self) -> (&str, &str) {
        (&self.content_type.0, &self.content_type.1)
    }

    /// `true` if this entity is a multipart container.
    pub fn is_multipart(&self) -> bool {
        self.content_type.0 == "multipart"
    }

    /// Write a one-line-per-node outline of the tree, for diagnostics.
    ///
    /// The output is not round-trippable; it only shows structure.
    pub fn dump_skeleton<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        self.dump_indented(out, 0)
    }

    fn dump_indented<W: Write>(&self, out: &mut W, depth: usize) -> std::io::Result<()> {
        let pad = "    ".repeat(depth);
        writeln!(
            out,
            "{pad}content-type: {}/{}",
            self.content_type.0, self.content_type.1
        )?;
        writeln!(out, "{pad}encoding: {}", self.head.mime_encoding())?;
        match &self.body {
            Some(body) => {
                let size = body.size().map(|n| n.to_string()).unwrap_or_default();
                match body.path() {
                    Some(path) => {
                        writeln!(out, "{pad}body-file: {} ({size} bytes)", path.display())?
                    }
                    None => writeln!(out, "{pad}body: in core ({size} bytes)")?,
                }
            }
            None => writeln!(out, "{pad}body: none")?,
        }
        if !self.parts.is_empty() {
            writeln!(out, "{pad}parts: {}", self.parts.len())?;
            for part in &self.parts {
                part.dump_indented(out, depth + 1)?;
            }
        }
        Ok(())
    }
}
