//! Field paths address a (possibly nested) field inside a document.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Reserved field path naming the document id in queries
pub const DOCUMENT_ID_FIELD: &str = "__name__";

/// Characters that must be back-quoted in a dotted field path.
const RESERVED_CHARS: &[char] = &['~', '*', '/', '[', ']'];

/// A non-empty list of field names.
///
/// The dotted string form quotes every segment that is not a plain
/// identifier: `` a.`b.c`.d `` has the three segments `a`, `b.c`, `d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Builds a field path from literal segments. No segment is split on dots.
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(Error::invalid_argument("field path must not be empty"));
        }
        if segments.iter().any(String::is_empty) {
            return Err(Error::invalid_argument(
                "field path segments must not be empty",
            ));
        }
        Ok(Self { segments })
    }

    /// The path naming the document id.
    pub fn document_id() -> Self {
        Self {
            segments: vec![DOCUMENT_ID_FIELD.to_string()],
        }
    }

    /// Parses a dotted field path, honouring back-quoted segments.
    pub fn parse(dotted: &str) -> Result<Self> {
        let invalid = || Error::invalid_argument(format!("invalid field path {dotted:?}"));

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = dotted.chars().peekable();
        let mut quoted_segment = false;

        while let Some(c) = chars.next() {
            match c {
                '`' if current.is_empty() && !quoted_segment => {
                    quoted_segment = true;
                    let mut closed = false;
                    while let Some(q) = chars.next() {
                        match q {
                            '\\' => current.push(chars.next().ok_or_else(invalid)?),
                            '`' => {
                                closed = true;
                                break;
                            }
                            other => current.push(other),
                        }
                    }
                    if !closed {
                        return Err(invalid());
                    }
                    if !matches!(chars.peek(), None | Some('.')) {
                        return Err(invalid());
                    }
                }
                '.' => {
                    if current.is_empty() {
                        return Err(invalid());
                    }
                    segments.push(std::mem::take(&mut current));
                    quoted_segment = false;
                }
                c if RESERVED_CHARS.contains(&c) || c == '`' => return Err(invalid()),
                c => current.push(c),
            }
        }

        if current.is_empty() {
            return Err(invalid());
        }
        segments.push(current);
        Ok(Self { segments })
    }

    /// The individual segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; field paths have at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when `self` equals `other` or is an ancestor of it.
    pub fn is_prefix_of(&self, other: &FieldPath) -> bool {
        other.segments.len() >= self.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// A copy with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            if is_simple_segment(segment) {
                f.write_str(segment)?;
            } else {
                let escaped = segment.replace('\\', "\\\\").replace('`', "\\`");
                write!(f, "`{escaped}`")?;
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}
