//! Save reader.
//!
//! [`SaveReader`] validates the header on construction and exposes the
//! metadata immediately, so the capacity decision can be made before the
//! arena is allocated. Unit records are read afterwards into whatever
//! arena the caller supplies.

use std::io::{ErrorKind, Read};

use widen_arena::UnitArena;
use widen_core::UnitId;

use crate::codec::{decode_header, decode_unit};
use crate::error::SaveError;
use crate::metadata::SaveMetadata;

/// Reads a save from a byte stream.
pub struct SaveReader<R: Read> {
    reader: R,
    metadata: Option<SaveMetadata>,
    records_read: usize,
}

impl<R: Read> SaveReader<R> {
    /// Open a save stream, reading and validating the header.
    pub fn open(mut reader: R) -> Result<Self, SaveError> {
        let metadata = decode_header(&mut reader)?;
        Ok(Self {
            reader,
            metadata,
            records_read: 0,
        })
    }

    /// Metadata map from the header, if the save carries one.
    pub fn metadata(&self) -> Option<&SaveMetadata> {
        self.metadata.as_ref()
    }

    /// Read `count` unit records into slots `[0, count)` of `arena`.
    ///
    /// The free-list is rebuilt for the slots read: every non-created
    /// record among them is released. Slots at or beyond `count` are left
    /// untouched and are not on the free-list afterwards; an arena larger
    /// than the save needs a reconciliation pass.
    pub fn read_units(&mut self, arena: &mut UnitArena, count: usize) -> Result<usize, SaveError> {
        if count > arena.capacity() {
            return Err(SaveError::CapacityMismatch {
                records: count,
                capacity: arena.capacity(),
            });
        }
        arena.clear_unused();
        for index in 0..count {
            let unit = decode_unit(&mut self.reader)?;
            let id = UnitId(index as u32);
            if let Some(slot) = arena.get_mut(id) {
                *slot = unit;
            }
        }
        for index in 0..count {
            let id = UnitId(index as u32);
            if arena.get(id).is_some_and(|u| !u.is_created()) {
                arena.release_unit(id)?;
            }
        }
        self.records_read += count;
        Ok(count)
    }

    /// Number of unit records read so far.
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Consume the reader, failing if any bytes remain unread.
    pub fn finish(mut self) -> Result<(), SaveError> {
        let mut probe = [0u8; 1];
        loop {
            match self.reader.read(&mut probe) {
                Ok(0) => return Ok(()),
                Ok(_) => return Err(SaveError::TrailingData),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(SaveError::Io(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::SaveWriter;
    use widen_arena::Unit;

    fn populated(capacity: u32, paths: &[usize]) -> UnitArena {
        let mut arena = UnitArena::new(capacity).unwrap();
        for (i, len) in paths.iter().enumerate() {
            let positions: Vec<u32> = (0..*len as u32).map(|p| p + i as u32 * 100).collect();
            arena.allocate_path(&positions).unwrap();
        }
        arena
    }

    fn created(arena: &UnitArena) -> Vec<(usize, Unit)> {
        arena
            .units()
            .iter()
            .enumerate()
            .filter(|(_, u)| u.is_created())
            .map(|(i, u)| (i, *u))
            .collect()
    }

    fn save(arena: &UnitArena, metadata: Option<&SaveMetadata>) -> Vec<u8> {
        let mut writer = SaveWriter::new(Vec::new(), metadata).unwrap();
        writer.write_units(arena).unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn same_size_round_trip_preserves_records() {
        let source = populated(64, &[5, 30, 12]);
        let bytes = save(&source, None);

        let mut reader = SaveReader::open(bytes.as_slice()).unwrap();
        assert!(reader.metadata().is_none());
        let mut target = UnitArena::new(64).unwrap();
        reader.read_units(&mut target, 64).unwrap();
        reader.finish().unwrap();

        // Free-list links of unused slots are not persisted; compare created records.
        assert_eq!(created(&source), created(&target));
        assert_eq!(target.live_count(), source.live_count());
        assert!(target.audit().is_consistent());
    }

    #[test]
    fn reading_into_larger_arena_orphans_the_tail() {
        let source = populated(16, &[20]);
        let bytes = save(&source, None);

        let mut reader = SaveReader::open(bytes.as_slice()).unwrap();
        let mut target = UnitArena::new(32).unwrap();
        reader.read_units(&mut target, 16).unwrap();
        reader.finish().unwrap();

        let audit = target.audit();
        assert_eq!(audit.orphaned.len(), 16);
        assert_eq!(audit.orphaned[0], UnitId(16));
    }

    #[test]
    fn short_read_leaves_trailing_data() {
        let bytes = save(&populated(16, &[]), None);
        let mut reader = SaveReader::open(bytes.as_slice()).unwrap();
        let mut target = UnitArena::new(16).unwrap();
        reader.read_units(&mut target, 8).unwrap();
        assert!(matches!(reader.finish(), Err(SaveError::TrailingData)));
    }

    #[test]
    fn over_read_is_an_error() {
        let bytes = save(&populated(8, &[]), None);
        let mut reader = SaveReader::open(bytes.as_slice()).unwrap();
        let mut target = UnitArena::new(16).unwrap();
        assert!(matches!(
            reader.read_units(&mut target, 16),
            Err(SaveError::Io(_))
        ));
        let mut reader = SaveReader::open(bytes.as_slice()).unwrap();
        let mut small = UnitArena::new(4).unwrap();
        assert!(matches!(
            reader.read_units(&mut small, 8),
            Err(SaveError::CapacityMismatch {
                records: 8,
                capacity: 4
            })
        ));
    }

    #[test]
    fn metadata_survives_round_trip() {
        let mut map = SaveMetadata::new();
        map.set("User/More PathUnits x2", true);
        let bytes = save(&populated(4, &[]), Some(&map));
        let reader = SaveReader::open(bytes.as_slice()).unwrap();
        assert_eq!(reader.metadata(), Some(&map));
    }
}
