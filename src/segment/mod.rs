//! Segment model for decoded mappings
//!
//! A decoded source map is an ordered sequence of rows, one per generated
//! line, each holding the [`Segment`]s whose generated line is that row
//! (0-based). A segment either stands alone in the generated output or
//! links back to an original position, optionally carrying a symbol name.
//!
//! On the wire a segment is a 1-, 4-, or 5-element array of numbers:
//! `[genCol]`, `[genCol, sourceIdx, srcLine, srcCol]`, or
//! `[genCol, sourceIdx, srcLine, srcCol, nameIdx]`. The serde
//! implementations below preserve that shape.

use std::fmt;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The original-side fields of a mapped segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalLocation {
    /// Index into the envelope's `sources` list.
    pub source: u32,
    /// 0-based line in the original source.
    pub line: u32,
    /// 0-based column in the original source.
    pub column: u32,
    /// Optional index into the envelope's `names` list.
    pub name: Option<u32>,
}

/// A single mapping entry within a generated line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// 0-based column in the generated output.
    pub column: u32,
    /// Original position this segment maps to, if any.
    pub origin: Option<OriginalLocation>,
}

impl Segment {
    /// An unmapped point in the generated output.
    pub fn unmapped(column: u32) -> Self {
        Segment {
            column,
            origin: None,
        }
    }

    /// A segment mapped to a source position without a name.
    pub fn mapped(column: u32, source: u32, src_line: u32, src_column: u32) -> Self {
        Segment {
            column,
            origin: Some(OriginalLocation {
                source,
                line: src_line,
                column: src_column,
                name: None,
            }),
        }
    }

    /// A segment mapped to a source position with a symbol name.
    pub fn named(column: u32, source: u32, src_line: u32, src_column: u32, name: u32) -> Self {
        Segment {
            column,
            origin: Some(OriginalLocation {
                source,
                line: src_line,
                column: src_column,
                name: Some(name),
            }),
        }
    }

    /// Number of wire fields this segment occupies (1, 4, or 5).
    pub fn arity(&self) -> usize {
        match self.origin {
            None => 1,
            Some(o) if o.name.is_some() => 5,
            Some(_) => 4,
        }
    }
}

/// Check that a row is non-decreasing in generated column.
pub fn is_sorted(row: &[Segment]) -> bool {
    row.windows(2).all(|pair| pair[0].column <= pair[1].column)
}

/// Stable-sort every row that is out of order.
///
/// Rows that are already sorted are left untouched, so maps produced by
/// well-behaved tools pay only the inspection cost.
pub fn maybe_sort(rows: &mut [Vec<Segment>]) {
    for row in rows {
        if !is_sorted(row) {
            row.sort_by_key(|seg| seg.column);
        }
    }
}

impl Serialize for Segment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.arity()))?;
        seq.serialize_element(&self.column)?;
        if let Some(o) = &self.origin {
            seq.serialize_element(&o.source)?;
            seq.serialize_element(&o.line)?;
            seq.serialize_element(&o.column)?;
            if let Some(name) = o.name {
                seq.serialize_element(&name)?;
            }
        }
        seq.end()
    }
}

struct SegmentVisitor;

impl<'de> Visitor<'de> for SegmentVisitor {
    type Value = Segment;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a mapping segment of 1, 4, or 5 integers")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Segment, A::Error>
    where
        A: SeqAccess<'de>,
    {
        use serde::de::Error;

        let column: u32 = seq
            .next_element()?
            .ok_or_else(|| A::Error::invalid_length(0, &self))?;

        let source: Option<u32> = seq.next_element()?;
        let origin = match source {
            None => None,
            Some(source) => {
                let line: u32 = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(2, &self))?;
                let src_column: u32 = seq
                    .next_element()?
                    .ok_or_else(|| A::Error::invalid_length(3, &self))?;
                let name: Option<u32> = seq.next_element()?;
                Some(OriginalLocation {
                    source,
                    line,
                    column: src_column,
                    name,
                })
            }
        };

        if seq.next_element::<u32>()?.is_some() {
            return Err(A::Error::custom("segment has more than 5 fields"));
        }

        Ok(Segment { column, origin })
    }
}

impl<'de> Deserialize<'de> for Segment {
    fn deserialize<D>(deserializer: D) -> Result<Segment, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(SegmentVisitor)
    }
}
