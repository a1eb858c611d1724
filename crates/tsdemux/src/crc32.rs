//! CRC-32/MPEG-2 as used by PSI and SCTE-35 sections.
//!
//! Polynomial 0x04C11DB7, init 0xFFFFFFFF, no reflection, no final XOR.
//! Not interchangeable with the zlib CRC-32.

use crate::{Result, TsError};

const CRC32_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0u32;
    while i < 256 {
        let mut crc = i << 24;
        let mut j = 0;
        while j < 8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ 0x04C1_1DB7
            } else {
                crc << 1
            };
            j += 1;
        }
        table[i as usize] = crc;
        i += 1;
    }
    table
};

/// Compute the CRC-32/MPEG-2 of `data`.
pub fn mpeg2_crc32(data: &[u8]) -> u32 {
    data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
        (crc << 8) ^ CRC32_TABLE[((crc >> 24) ^ byte as u32) as usize]
    })
}

/// A section is valid when the CRC over all of it, stored CRC included, is zero.
pub fn validate_section_crc32(section: &[u8]) -> bool {
    mpeg2_crc32(section) == 0
}

/// Check the trailing CRC of a complete section.
pub fn verify_section_crc32(section: &[u8]) -> Result<()> {
    if section.len() < 4 {
        return Err(TsError::InsufficientData {
            expected: 4,
            actual: section.len(),
        });
    }
    let (body, tail) = section.split_at(section.len() - 4);
    let expected = u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]]);
    let calculated = mpeg2_crc32(body);
    if expected != calculated {
        return Err(TsError::Crc32Mismatch {
            expected,
            calculated,
        });
    }
    Ok(())
}

/// Append the CRC of everything already in `section`.
pub(crate) fn append_crc32(section: &mut Vec<u8>) -> u32 {
    let crc = mpeg2_crc32(section);
    section.extend_from_slice(&crc.to_be_bytes());
    crc
}
