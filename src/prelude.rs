//! Prelude module for convenient imports
//!
//! This module provides the most commonly used types for working with
//! sourcetrace. Import everything from this module for quick access:
//!
//! ```no_run
//! use sourcetrace::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let map = TraceMap::from_json(r#"{"version":3,"sources":[],"names":[],"mappings":""}"#, None)?;
//!     println!("{} sources", map.sources.len());
//!     Ok(())
//! }
//! ```

// Tracing
pub use crate::trace::{
    GeneratedNeedle, GeneratedPosition, MappingItem, OriginalNeedle, OriginalPosition,
    ReverseSegment, TraceMap,
};

// Error handling
pub use crate::error::{Error, Result};

// Search bias
pub use crate::search::Bias;

// Envelope types
pub use crate::envelope::{
    DecodedSourceMap, Section, SectionOffset, SectionedSourceMap, SourceMap, SourceMapInput,
};

// Segments
pub use crate::segment::{OriginalLocation, Segment};

// Map construction
pub use crate::builder::SourceMapBuilder;

// Remapping
pub use crate::remap::{remap, LoaderContext, RemapOptions, RemappedMap};

// Resolution
pub use crate::resolve::{resolve, strip_filename};

// Version constant
pub use crate::VERSION;
