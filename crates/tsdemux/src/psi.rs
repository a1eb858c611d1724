//! Shared PSI section framing.
//!
//! Section buffers handed to the table decoders start at the `pointer_field`
//! byte of the packet payload that opened the section.

use crate::bitstream::{BitCursor, BitWriter};
use crate::crc32::{mpeg2_crc32, verify_section_crc32};
use crate::{Result, TsError};
use serde::Serialize;

pub const PAT_TABLE_ID: u8 = 0x00;
pub const PMT_TABLE_ID: u8 = 0x02;

/// Bytes following `section_length` that are not table entries:
/// extension(2) + version byte(1) + section numbers(2) + CRC(4).
pub(crate) const SECTION_OVERHEAD: u16 = 9;

/// Fail with [`TsError::ReservedBits`] unless the next `n` bits equal `expected`.
pub(crate) fn expect_bits(
    cursor: &mut BitCursor<'_>,
    n: usize,
    expected: u64,
    field: &'static str,
) -> Result<()> {
    let actual = cursor.read_bits(n)?;
    if actual != expected {
        return Err(TsError::ReservedBits {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Long-form section prologue shared by PAT and PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionHeader {
    pub pointer_field: u8,
    pub table_id: u8,
    pub section_length: u16,
    /// `transport_stream_id` for a PAT, `program_number` for a PMT.
    pub table_id_extension: u16,
    pub version: u8,
    pub current_next_indicator: bool,
    pub section_number: u8,
    pub last_section_number: u8,
}

impl SectionHeader {
    /// Read from the pointer field through `last_section_number`.
    pub fn read(cursor: &mut BitCursor<'_>, expected_table_id: u8) -> Result<Self> {
        let pointer_field = cursor.read_u8()?;
        cursor.skip_bytes(pointer_field as usize)?;

        let table_id = cursor.read_u8()?;
        if table_id != expected_table_id {
            return Err(TsError::InvalidTableId {
                expected: expected_table_id,
                actual: table_id,
            });
        }
        expect_bits(cursor, 1, 1, "section_syntax_indicator")?;
        expect_bits(cursor, 1, 0, "private_indicator")?;
        expect_bits(cursor, 2, 0b11, "reserved")?;
        expect_bits(cursor, 2, 0b00, "section_length unused bits")?;
        let section_length = cursor.read_bits(10)? as u16;

        if section_length < SECTION_OVERHEAD {
            return Err(TsError::InvalidSectionLength(section_length));
        }
        let available = cursor.bits_remaining() / 8;
        if section_length as usize > available {
            return Err(TsError::InsufficientData {
                expected: section_length as usize,
                actual: available,
            });
        }

        let table_id_extension = cursor.read_u16()?;
        expect_bits(cursor, 2, 0b11, "reserved")?;
        let version = cursor.read_bits(5)? as u8;
        let current_next_indicator = cursor.read_flag()?;
        let section_number = cursor.read_u8()?;
        let last_section_number = cursor.read_u8()?;

        Ok(SectionHeader {
            pointer_field,
            table_id,
            section_length,
            table_id_extension,
            version,
            current_next_indicator,
            section_number,
            last_section_number,
        })
    }

    /// Write with a zero pointer field. `section_length` is taken as given.
    pub(crate) fn write(&self, writer: &mut BitWriter) {
        writer.write_byte(0);
        writer.write_byte(self.table_id);
        writer.put_bits(0b1011, 4);
        writer.put_bits(0b00, 2);
        writer.put_bits(self.section_length as u64, 10);
        writer.write_u16(self.table_id_extension);
        writer.put_bits(0b11, 2);
        writer.put_bits(self.version as u64, 5);
        writer.write_flag(self.current_next_indicator);
        writer.write_byte(self.section_number);
        writer.write_byte(self.last_section_number);
    }
}

/// Append the CRC over everything after the pointer field.
pub(crate) fn seal_section(mut bytes: Vec<u8>) -> (Vec<u8>, u32) {
    let crc = mpeg2_crc32(bytes.get(1..).unwrap_or(&[]));
    bytes.extend_from_slice(&crc.to_be_bytes());
    (bytes, crc)
}

/// Total bytes (pointer field included) the section at the head of `buf`
/// declares, or `None` if the prologue is not buffered yet.
///
/// The 12-bit length mask serves both PSI and SCTE-35 sections.
pub fn section_span(buf: &[u8]) -> Option<usize> {
    let pointer = *buf.first()? as usize;
    let start = 1 + pointer;
    let hi = *buf.get(start + 1)? as usize;
    let lo = *buf.get(start + 2)? as usize;
    Some(start + 3 + (((hi & 0x0F) << 8) | lo))
}

/// Whether `buf` holds the complete section it declares.
pub fn ready_for_parse(buf: &[u8]) -> bool {
    section_span(buf).is_some_and(|span| span <= buf.len())
}

/// Version of the section at the head of `buf` without a full parse.
pub fn peek_version(buf: &[u8]) -> Result<u8> {
    let mut cursor = BitCursor::new(buf);
    let pointer = cursor.read_u8()? as usize;
    cursor.skip_bytes(pointer + 5)?;
    cursor.skip_bits(2)?;
    Ok(cursor.read_bits(5)? as u8)
}

/// The section bytes from `table_id` through the CRC.
pub fn section_bytes(buf: &[u8]) -> Result<&[u8]> {
    let span = section_span(buf).ok_or(TsError::InsufficientData {
        expected: 4,
        actual: buf.len(),
    })?;
    let start = 1 + buf.first().copied().unwrap_or(0) as usize;
    buf.get(start..span).ok_or(TsError::InsufficientData {
        expected: span,
        actual: buf.len(),
    })
}

/// Check the CRC-32 of the section at the head of `buf`.
pub fn verify_crc(buf: &[u8]) -> Result<()> {
    verify_section_crc32(section_bytes(buf)?)
}

/// Tables that carry a `version_number`.
pub trait Versioned {
    fn version(&self) -> u8;
}

/// Result of decoding a table against the last version seen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// First sighting or a new version.
    Updated(T),
    /// Same version as last time; nothing to emit.
    Unchanged { version: u8 },
}

impl<T: Versioned> ParseOutcome<T> {
    pub fn new(table: T, last_version: Option<u8>) -> Self {
        let version = table.version();
        if last_version == Some(version) {
            ParseOutcome::Unchanged { version }
        } else {
            ParseOutcome::Updated(table)
        }
    }
}

impl<T> ParseOutcome<T> {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, ParseOutcome::Unchanged { .. })
    }

    pub fn updated(self) -> Option<T> {
        match self {
            ParseOutcome::Updated(table) => Some(table),
            ParseOutcome::Unchanged { .. } => None,
        }
    }
}
