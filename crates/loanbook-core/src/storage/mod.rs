//! Storage layer
//!
//! Flat line-record files, one per resource:
//!
//! - **RecordFile**: raw lines with append, atomic rewrite and in-place update
//! - **codec**: positional line formats for each record type
//! - **Table**: typed load/append/replace over a `RecordFile`

pub mod codec;
pub mod error;
pub mod file;
pub mod table;

pub use codec::{LineRecord, MalformedRecord};
pub use error::{StorageError, StorageResult};
pub use file::RecordFile;
pub use table::Table;
