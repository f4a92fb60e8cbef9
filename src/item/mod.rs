/// Rows and records tagged with the line they came from.
pub mod line;

/// An `ItemReader` over any iterator, for in-memory row sources.
pub mod iter;

/// Normalizes raw rows: trimming, blank skipping, sentinel rows and a row handler.
pub mod list_reader;

/// Field name resolution and validation.
pub mod fields;

/// Setter and getter tables for object records.
pub mod object;

/// Maps rows to dictionaries or objects keyed by field name.
pub mod map_reader;

/// Turns dictionaries or objects back into rows.
pub mod flatten;

/// Writes records as rows, with or without a header, optionally minimized.
pub mod writer;

/// This module provides CSV row sources and sinks.
pub mod csv;

#[cfg(feature = "logger")]
/// This module provides a logger row sink, useful for debugging purposes.
pub mod logger;
