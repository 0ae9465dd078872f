//! Source Map V3 envelope types
//!
//! The JSON wire format, in its three accepted shapes: a standard map
//! with an encoded `mappings` string, a standard map with decoded
//! mappings (arrays of segment tuples), and a sectioned index map whose
//! `sections` recursively hold further inputs.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::segment::Segment;
use crate::vlq;

/// A standard map with VLQ-encoded mappings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    /// Source map version (always 3).
    pub version: u32,
    /// The generated file this source map is associated with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// An optional prefix applied when resolving `sources`.
    #[serde(rename = "sourceRoot", skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Original source file names (entries may be null).
    pub sources: Vec<Option<String>>,
    /// Optional original source contents, parallel to `sources`.
    #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    /// Symbol names referenced by mappings.
    #[serde(default)]
    pub names: Vec<String>,
    /// VLQ-encoded mappings string.
    pub mappings: String,
}

/// A standard map whose mappings are already decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSourceMap {
    /// Source map version (always 3).
    pub version: u32,
    /// The generated file this source map is associated with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// An optional prefix applied when resolving `sources`.
    #[serde(rename = "sourceRoot", skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,
    /// Original source file names (entries may be null).
    pub sources: Vec<Option<String>>,
    /// Optional original source contents, parallel to `sources`.
    #[serde(rename = "sourcesContent", skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,
    /// Symbol names referenced by mappings.
    #[serde(default)]
    pub names: Vec<String>,
    /// Decoded mapping rows, one per generated line.
    pub mappings: Vec<Vec<Segment>>,
}

/// Offset of a section within the composed generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionOffset {
    /// 0-based generated line the section starts at.
    pub line: u32,
    /// 0-based generated column the section starts at.
    pub column: u32,
}

/// One entry of a sectioned map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub offset: SectionOffset,
    pub map: Box<SourceMapInput>,
}

/// An index map composed of offset-shifted child maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionedSourceMap {
    /// Source map version (always 3).
    pub version: u32,
    /// The generated file this source map is associated with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sections: Vec<Section>,
}

/// Any of the accepted source map input shapes.
///
/// Deserialization picks the variant from the JSON structure: a
/// `sections` list, a string `mappings`, or an array `mappings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceMapInput {
    Sectioned(SectionedSourceMap),
    Encoded(SourceMap),
    Decoded(DecodedSourceMap),
}

impl From<SourceMap> for SourceMapInput {
    fn from(map: SourceMap) -> Self {
        SourceMapInput::Encoded(map)
    }
}

impl From<DecodedSourceMap> for SourceMapInput {
    fn from(map: DecodedSourceMap) -> Self {
        SourceMapInput::Decoded(map)
    }
}

impl From<SectionedSourceMap> for SourceMapInput {
    fn from(map: SectionedSourceMap) -> Self {
        SourceMapInput::Sectioned(map)
    }
}

impl SourceMap {
    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode the `mappings` string, yielding the decoded envelope.
    pub fn decode(&self) -> Result<DecodedSourceMap> {
        Ok(DecodedSourceMap {
            version: self.version,
            file: self.file.clone(),
            source_root: self.source_root.clone(),
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: self.names.clone(),
            mappings: vlq::decode_mappings(&self.mappings)?,
        })
    }
}

impl DecodedSourceMap {
    /// Encode the mapping rows, yielding the standard envelope.
    pub fn encode(&self) -> SourceMap {
        SourceMap {
            version: self.version,
            file: self.file.clone(),
            source_root: self.source_root.clone(),
            sources: self.sources.clone(),
            sources_content: self.sources_content.clone(),
            names: self.names.clone(),
            mappings: vlq::encode_mappings(&self.mappings),
        }
    }
}
