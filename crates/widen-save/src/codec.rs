//! Binary encode/decode for the save format.
//!
//! All integers are little-endian. Strings are length-prefixed with a
//! `u32` length. The unit section carries no record count: the reader is
//! told how many records to expect.

use std::io::{Read, Write};

use widen_arena::{Unit, POSITIONS_PER_UNIT};

use crate::error::SaveError;
use crate::metadata::SaveMetadata;
use crate::{FORMAT_VERSION, MAGIC};

/// Longest string, in bytes, a save may carry. Metadata keys are short;
/// anything longer is a corrupt length prefix.
pub const MAX_STRING_LEN: usize = 4096;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), SaveError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), SaveError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f32.
pub fn write_f32_le(w: &mut dyn Write, v: f32) -> Result<(), SaveError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a length-prefixed UTF-8 string (u32 length + bytes).
pub fn write_length_prefixed_str(w: &mut dyn Write, s: &str) -> Result<(), SaveError> {
    if s.len() > MAX_STRING_LEN {
        return Err(SaveError::MalformedRecord {
            detail: format!("string of {} bytes exceeds {MAX_STRING_LEN}", s.len()),
        });
    }
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, SaveError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, SaveError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian f32.
pub fn read_f32_le(r: &mut dyn Read) -> Result<f32, SaveError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

/// Read a length-prefixed UTF-8 string.
pub fn read_length_prefixed_str(r: &mut dyn Read) -> Result<String, SaveError> {
    let len = read_u32_le(r)? as usize;
    if len > MAX_STRING_LEN {
        return Err(SaveError::MalformedRecord {
            detail: format!("string length {len} exceeds {MAX_STRING_LEN}"),
        });
    }
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| SaveError::MalformedRecord {
        detail: format!("invalid UTF-8 string: {e}"),
    })
}

// ── Header encode/decode ────────────────────────────────────────

/// Encode the save header: magic, version, and the optional metadata map.
pub fn encode_header(w: &mut dyn Write, metadata: Option<&SaveMetadata>) -> Result<(), SaveError> {
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;

    // Presence flag + map
    match metadata {
        Some(map) => {
            write_u8(w, 1)?;
            write_u32_le(w, map.len() as u32)?;
            for (key, value) in map.iter() {
                write_length_prefixed_str(w, key)?;
                write_u8(w, u8::from(value))?;
            }
        }
        None => write_u8(w, 0)?,
    }
    Ok(())
}

/// Decode and validate the save header, returning the metadata map.
pub fn decode_header(r: &mut dyn Read) -> Result<Option<SaveMetadata>, SaveError> {
    let mut magic = [0u8; 4];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(SaveError::InvalidMagic);
    }

    let version = read_u8(r)?;
    if version != FORMAT_VERSION {
        return Err(SaveError::UnsupportedVersion { found: version });
    }

    match read_u8(r)? {
        0 => Ok(None),
        1 => {
            let count = read_u32_le(r)? as usize;
            let mut map = SaveMetadata::new();
            for _ in 0..count {
                let key = read_length_prefixed_str(r)?;
                let value = read_bool(r)?;
                map.set(key, value);
            }
            Ok(Some(map))
        }
        other => Err(SaveError::MalformedRecord {
            detail: format!("metadata presence flag {other}"),
        }),
    }
}

fn read_bool(r: &mut dyn Read) -> Result<bool, SaveError> {
    match read_u8(r)? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(SaveError::MalformedRecord {
            detail: format!("invalid bool byte {other}"),
        }),
    }
}

// ── Unit record encode/decode ───────────────────────────────────

/// Encode one unit record.
///
/// Unused units are a single flags byte. Created units follow it with
/// their path data and chain link.
pub fn encode_unit(w: &mut dyn Write, unit: &Unit) -> Result<(), SaveError> {
    write_u8(w, unit.simulation_flags)?;
    if !unit.is_created() {
        return Ok(());
    }
    write_u8(w, unit.path_find_flags)?;
    write_u8(w, unit.position_count)?;
    write_u8(w, unit.reference_count)?;
    write_u32_le(w, unit.raw_link())?;
    write_f32_le(w, unit.length)?;
    for position in unit.positions() {
        write_u32_le(w, *position)?;
    }
    Ok(())
}

/// Decode one unit record.
pub fn decode_unit(r: &mut dyn Read) -> Result<Unit, SaveError> {
    let simulation_flags = read_u8(r)?;
    let mut unit = Unit::default();
    unit.simulation_flags = simulation_flags;
    if !unit.is_created() {
        return Ok(unit);
    }
    unit.path_find_flags = read_u8(r)?;
    unit.position_count = read_u8(r)?;
    if unit.position_count as usize > POSITIONS_PER_UNIT {
        return Err(SaveError::MalformedRecord {
            detail: format!(
                "position count {} exceeds {POSITIONS_PER_UNIT}",
                unit.position_count
            ),
        });
    }
    unit.reference_count = read_u8(r)?;
    unit.set_raw_link(read_u32_le(r)?);
    unit.length = read_f32_le(r)?;
    for slot in unit.positions.iter_mut().take(unit.position_count as usize) {
        *slot = read_u32_le(r)?;
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use widen_arena::FLAG_CREATED;
    use widen_core::UnitId;

    #[test]
    fn header_with_and_without_metadata() {
        let mut buf = Vec::new();
        encode_header(&mut buf, None).unwrap();
        assert_eq!(decode_header(&mut buf.as_slice()).unwrap(), None);

        let mut map = SaveMetadata::new();
        map.set("User/Other", false);
        map.set("User/More PathUnits x2", true);
        let mut buf = Vec::new();
        encode_header(&mut buf, Some(&map)).unwrap();
        assert_eq!(decode_header(&mut buf.as_slice()).unwrap(), Some(map));
    }

    #[test]
    fn bad_magic_and_version_rejected() {
        let mut buf = b"PATH".to_vec();
        buf.push(FORMAT_VERSION);
        assert!(matches!(
            decode_header(&mut buf.as_slice()),
            Err(SaveError::InvalidMagic)
        ));
        let mut buf = MAGIC.to_vec();
        buf.push(99);
        assert!(matches!(
            decode_header(&mut buf.as_slice()),
            Err(SaveError::UnsupportedVersion { found: 99 })
        ));
    }

    #[test]
    fn invalid_presence_flag_rejected() {
        let mut buf = MAGIC.to_vec();
        buf.extend([FORMAT_VERSION, 7]);
        assert!(matches!(
            decode_header(&mut buf.as_slice()),
            Err(SaveError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn corrupt_string_length_rejected_before_allocating() {
        let mut buf = MAGIC.to_vec();
        buf.extend([FORMAT_VERSION, 1]);
        buf.extend(1u32.to_le_bytes());
        buf.extend(u32::MAX.to_le_bytes());
        assert!(matches!(
            decode_header(&mut buf.as_slice()),
            Err(SaveError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn overlong_key_is_not_written() {
        let mut map = SaveMetadata::new();
        map.set("k".repeat(MAX_STRING_LEN + 1), true);
        let mut buf = Vec::new();
        assert!(matches!(
            encode_header(&mut buf, Some(&map)),
            Err(SaveError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn unused_unit_is_one_byte() {
        let mut buf = Vec::new();
        encode_unit(&mut buf, &Unit::default()).unwrap();
        assert_eq!(buf, vec![0]);
        assert_eq!(decode_unit(&mut buf.as_slice()).unwrap(), Unit::default());
    }

    #[test]
    fn created_unit_keeps_link_and_positions() {
        let mut unit = Unit::default();
        unit.simulation_flags = FLAG_CREATED;
        unit.path_find_flags = 3;
        unit.position_count = 2;
        unit.reference_count = 1;
        unit.length = 12.25;
        unit.positions[0] = 11;
        unit.positions[1] = 22;
        unit.set_next_unit(Some(UnitId(400_000)));

        let mut buf = Vec::new();
        encode_unit(&mut buf, &unit).unwrap();
        assert_eq!(buf.len(), 1 + 3 + 4 + 4 + 2 * 4);
        assert_eq!(decode_unit(&mut buf.as_slice()).unwrap(), unit);
    }

    #[test]
    fn oversized_position_count_rejected() {
        let buf = [FLAG_CREATED, 0, 13, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            decode_unit(&mut buf.as_slice()),
            Err(SaveError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn truncated_unit_is_io_error() {
        let buf = [FLAG_CREATED, 0, 1];
        assert!(matches!(
            decode_unit(&mut buf.as_slice()),
            Err(SaveError::Io(_))
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decoded_record_reencodes_to_consumed_bytes(
                bytes in proptest::collection::vec(any::<u8>(), 0..80),
            ) {
                let mut cursor = bytes.as_slice();
                if let Ok(unit) = decode_unit(&mut cursor) {
                    let consumed = bytes.len() - cursor.len();
                    let mut buf = Vec::new();
                    encode_unit(&mut buf, &unit).unwrap();
                    prop_assert_eq!(buf.as_slice(), &bytes[..consumed]);
                }
            }
        }
    }
}
