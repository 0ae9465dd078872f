//! Sourcetrace: a source map tracing and remapping toolkit
//!
//! Sourcetrace reads, queries, composes, and writes
//! [Source Map V3](https://sourcemaps.info/spec.html) files. It is built
//! around three cores: a streaming VLQ codec between the compact
//! `mappings` string and decoded segment rows, a binary-search tracer
//! with monotonic memoization over both query directions, and a
//! remapper that flattens a chain of maps down to the ultimate original
//! sources.
//!
//! # Features
//!
//! - **VLQ codec**: bidirectional, delta-tracked conversion of the
//!   `mappings` field
//! - **TraceMap**: lazy decode/encode with generated→original and
//!   original→generated queries and bias control
//! - **Sectioned maps**: index maps flatten transparently into a single
//!   tracer
//! - **Remapper**: loader-driven transitive composition of map chains
//!
//! # Example
//!
//! ```no_run
//! use sourcetrace::{GeneratedNeedle, TraceMap};
//!
//! fn main() -> sourcetrace::Result<()> {
//!     let json = std::fs::read_to_string("bundle.js.map").unwrap();
//!     let map = TraceMap::from_json(&json, None)?;
//!     if let Some(pos) = map.original_position_for(GeneratedNeedle::new(1, 42))? {
//!         println!("{}:{}:{}", pos.source, pos.line, pos.column);
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod envelope;
pub mod remap;
pub mod resolve;
pub mod search;
pub mod section;
pub mod segment;
pub mod trace;
pub mod vlq;
pub mod prelude;

mod error;

pub use error::{Error, Result};
pub use search::Bias;
pub use trace::{GeneratedNeedle, GeneratedPosition, OriginalNeedle, OriginalPosition, TraceMap};

/// Sourcetrace version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
