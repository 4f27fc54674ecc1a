//! Save writer.

use std::io::Write;

use widen_arena::UnitArena;

use crate::codec::{encode_header, encode_unit};
use crate::error::SaveError;
use crate::metadata::SaveMetadata;

/// Writes a save to a byte stream.
///
/// The header (including metadata) is written on construction; the unit
/// section follows with [`write_units`](Self::write_units).
pub struct SaveWriter<W: Write> {
    writer: W,
    records_written: usize,
}

impl<W: Write> SaveWriter<W> {
    /// Create a writer, immediately writing the header.
    pub fn new(mut writer: W, metadata: Option<&SaveMetadata>) -> Result<Self, SaveError> {
        encode_header(&mut writer, metadata)?;
        Ok(Self {
            writer,
            records_written: 0,
        })
    }

    /// Write one record per arena slot, in index order.
    pub fn write_units(&mut self, arena: &UnitArena) -> Result<usize, SaveError> {
        for unit in arena.units() {
            encode_unit(&mut self.writer, unit)?;
        }
        self.records_written += arena.capacity();
        Ok(arena.capacity())
    }

    /// Number of unit records written so far.
    pub fn records_written(&self) -> usize {
        self.records_written
    }

    /// Flush and return the underlying sink.
    pub fn finish(mut self) -> Result<W, SaveError> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
