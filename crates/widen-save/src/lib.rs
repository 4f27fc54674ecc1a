//! Binary save format for the widen capacity-migration engine.
//!
//! Mirrors how the host persists its path units: a header with the
//! persisted-state metadata map, followed by one record per arena slot.
//!
//! # Format
//!
//! ```text
//! [MAGIC "WDEN"] [VERSION u8]
//! [has_metadata u8] ([count u32] ([key str] [value u8])*)?
//! [Unit 0] [Unit 1] ... [Unit N-1]
//! ```
//!
//! The unit section does not record `N`. A reader must already know how
//! many records the writer's arena held, which is what the capacity flag
//! in the metadata map is for.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod metadata;
pub mod reader;
pub mod writer;

pub use error::SaveError;
pub use metadata::SaveMetadata;
pub use reader::SaveReader;
pub use writer::SaveWriter;

/// Magic bytes at the start of every save.
pub const MAGIC: [u8; 4] = *b"WDEN";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;
