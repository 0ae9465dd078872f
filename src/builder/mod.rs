//! Incremental source map construction
//!
//! [`SourceMapBuilder`] accumulates mapping rows together with interned
//! `sources` and `names` tables, then produces a decoded envelope. The
//! remapper and the sectioned-map flattener assemble their outputs
//! through it.

use rustc_hash::FxHashMap as HashMap;

use crate::envelope::DecodedSourceMap;
use crate::segment::{self, Segment};

/// An insertion-ordered string table with O(1) membership.
#[derive(Debug, Default)]
pub(crate) struct UniqueTable {
    indexes: HashMap<String, u32>,
    items: Vec<String>,
}

impl UniqueTable {
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(&index) = self.indexes.get(value) {
            return index;
        }
        let index = self.items.len() as u32;
        self.indexes.insert(value.to_string(), index);
        self.items.push(value.to_string());
        index
    }

    pub fn into_items(self) -> Vec<String> {
        self.items
    }
}

/// Builder for incremental source map construction.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    file: Option<String>,
    source_root: Option<String>,
    sources: UniqueTable,
    sources_content: Vec<Option<String>>,
    names: UniqueTable,
    mappings: Vec<Vec<Segment>>,
}

impl SourceMapBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the generated file name.
    pub fn set_file(&mut self, file: &str) {
        self.file = Some(file.to_string());
    }

    /// Set the source root prefix.
    pub fn set_source_root(&mut self, source_root: &str) {
        self.source_root = Some(source_root.to_string());
    }

    /// Add a source file and return its index. Repeated sources return
    /// the index assigned on first insertion.
    pub fn add_source(&mut self, source: &str) -> u32 {
        let index = self.sources.intern(source);
        if index as usize == self.sources_content.len() {
            self.sources_content.push(None);
        }
        index
    }

    /// Set the content for a source at the given index.
    pub fn set_source_content(&mut self, index: u32, content: Option<&str>) {
        if let Some(slot) = self.sources_content.get_mut(index as usize) {
            *slot = content.map(str::to_string);
        }
    }

    /// Add a symbol name and return its index.
    pub fn add_name(&mut self, name: &str) -> u32 {
        self.names.intern(name)
    }

    /// Append a segment to the given generated line, growing the row
    /// list as needed.
    pub fn add_segment(&mut self, generated_line: u32, segment: Segment) {
        let line = generated_line as usize;
        while self.mappings.len() <= line {
            self.mappings.push(Vec::new());
        }
        self.mappings[line].push(segment);
    }

    /// Consume the builder and produce a decoded envelope.
    ///
    /// Rows are stable-sorted by generated column; `sourcesContent` is
    /// emitted only when at least one entry is present.
    pub fn build(self) -> DecodedSourceMap {
        let mut mappings = self.mappings;
        segment::maybe_sort(&mut mappings);

        let sources_content = if self.sources_content.iter().any(Option::is_some) {
            Some(self.sources_content)
        } else {
            None
        };

        DecodedSourceMap {
            version: 3,
            file: self.file,
            source_root: self.source_root,
            sources: self.sources.into_items().into_iter().map(Some).collect(),
            sources_content,
            names: self.names.into_items(),
            mappings,
        }
    }
}
