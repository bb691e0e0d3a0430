//! FIT import pipeline.
//!
//! 1. [`parse`] decodes a file through a [`MessageDecoder`] and partitions the
//!    messages by kind.
//! 2. [`coerce`] and [`mapping`] normalize raw field values and vocabulary.
//! 3. [`extract`] builds the typed workout graph, with [`route`] encoding the
//!    GPS track.
//! 4. [`importer::FitImporter`] hashes, deduplicates and persists the graph
//!    atomically.

pub mod coerce;
pub mod extract;
pub mod importer;
pub mod mapping;
pub mod parse;
pub mod route;
pub mod types;

pub use importer::{DEFAULT_RECORD_BATCH_SIZE, FitImporter, file_sha256};
pub use parse::{FitparserDecoder, MessageDecoder, message, partition};
pub use types::{
    DecodedFit, FieldMap, FieldValue, ImportOptions, ImportOutcome, MessageKind, RawMessage,
};
