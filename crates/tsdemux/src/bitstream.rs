//! MSB-first bit reader and writer.
//!
//! Every decoder in this crate reads through [`BitCursor`]. Reads past the end of
//! the buffer fail with [`TsError::OutOfBounds`] and leave the cursor untouched.

use crate::{Result, TsError};

/// Render bytes as lowercase two-digit hex separated by single spaces.
pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cursor over an immutable byte slice with a sub-byte bit offset.
///
/// `bit_offset` counts the bits already consumed from the current byte,
/// starting at the most significant bit.
#[derive(Debug, Clone)]
pub struct BitCursor<'a> {
    data: &'a [u8],
    position: usize,
    bit_offset: u8,
    marker: Option<(usize, u8)>,
}

impl<'a> BitCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BitCursor {
            data,
            position: 0,
            bit_offset: 0,
            marker: None,
        }
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bits already consumed from the byte at [`position`](Self::position).
    pub fn bit_offset(&self) -> u8 {
        self.bit_offset
    }

    pub fn bits_consumed(&self) -> usize {
        self.position * 8 + self.bit_offset as usize
    }

    pub fn bits_remaining(&self) -> usize {
        self.data.len() * 8 - self.bits_consumed()
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    /// Total length of the underlying buffer in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn ensure(&self, bits: usize) -> Result<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(TsError::OutOfBounds {
                requested: bits,
                available,
            });
        }
        Ok(())
    }

    /// Read `n` bits (at most 64) MSB-first, crossing byte boundaries as needed.
    pub fn read_bits(&mut self, n: usize) -> Result<u64> {
        if n > 64 {
            return Err(TsError::InvalidBitWidth(n));
        }
        self.ensure(n)?;

        let mut value: u64 = 0;
        let mut remaining = n;
        while remaining > 0 {
            let byte = self.data[self.position];
            let available = 8 - self.bit_offset as usize;
            let take = remaining.min(available);
            let mask = ((1u16 << take) - 1) as u8;
            let bits = (byte >> (available - take)) & mask;

            value = (value << take) | bits as u64;
            self.bit_offset += take as u8;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.position += 1;
            }
            remaining -= take;
        }

        Ok(value)
    }

    /// Same as [`read_bits`](Self::read_bits) without advancing.
    pub fn peek_bits(&mut self, n: usize) -> Result<u64> {
        let (position, bit_offset) = (self.position, self.bit_offset);
        let value = self.read_bits(n);
        self.position = position;
        self.bit_offset = bit_offset;
        value
    }

    pub fn read_flag(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bits(8)? as u8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_bits(16)? as u16)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_bits(32)? as u32)
    }

    pub fn skip_bits(&mut self, n: usize) -> Result<()> {
        self.ensure(n)?;
        let target = self.bits_consumed() + n;
        self.position = target / 8;
        self.bit_offset = (target % 8) as u8;
        Ok(())
    }

    pub fn skip_bytes(&mut self, n: usize) -> Result<()> {
        let bits = n.checked_mul(8).ok_or(TsError::OutOfBounds {
            requested: usize::MAX,
            available: self.bits_remaining(),
        })?;
        self.skip_bits(bits)
    }

    /// Read `n` whole bytes. Works at any bit offset.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        self.ensure(n.saturating_mul(8))?;
        if self.is_byte_aligned() {
            let bytes = self.data[self.position..self.position + n].to_vec();
            self.position += n;
            return Ok(bytes);
        }
        (0..n).map(|_| self.read_u8()).collect()
    }

    /// Read `n` bytes as space-separated lowercase hex, e.g. `"65 6e 67 00"`.
    pub fn read_hex(&mut self, n: usize) -> Result<String> {
        Ok(hex_string(&self.read_bytes(n)?))
    }

    /// Read `n` bytes as characters.
    pub fn read_char(&mut self, n: usize) -> Result<String> {
        Ok(self.read_bytes(n)?.into_iter().map(char::from).collect())
    }

    /// Bytes from the current byte position to the end of the buffer.
    ///
    /// A partially consumed byte is included.
    pub fn remaining_buffer(&self) -> &'a [u8] {
        self.data.get(self.position..).unwrap_or(&[])
    }

    /// Remember the current position. Only one marker is kept.
    pub fn set_marker(&mut self) {
        self.marker = Some((self.position, self.bit_offset));
    }

    /// Return to the marker set by [`set_marker`](Self::set_marker) and clear it.
    pub fn restore_marker(&mut self) -> Result<()> {
        let (position, bit_offset) = self.marker.take().ok_or(TsError::MarkerNotSet)?;
        self.position = position;
        self.bit_offset = bit_offset;
        Ok(())
    }
}

/// MSB-first bit writer backed by a growable buffer.
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    bit_offset: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        BitWriter {
            data: Vec::with_capacity(bytes),
            bit_offset: 0,
        }
    }

    /// Write the low `n` bits of `value` (at most 64), MSB-first.
    pub fn write_bits(&mut self, value: u64, n: usize) -> Result<()> {
        if n > 64 {
            return Err(TsError::InvalidBitWidth(n));
        }
        self.put_bits(value, n);
        Ok(())
    }

    /// Infallible form of [`write_bits`](Self::write_bits) for fixed-width
    /// fields. Widths above 64 are clamped.
    pub(crate) fn put_bits(&mut self, value: u64, n: usize) {
        let mut remaining = n.min(64);
        while remaining > 0 {
            if self.bit_offset == 0 {
                self.data.push(0);
            }
            let free = 8 - self.bit_offset as usize;
            let take = remaining.min(free);
            let chunk = ((value >> (remaining - take)) & ((1u64 << take) - 1)) as u8;
            if let Some(last) = self.data.last_mut() {
                *last |= chunk << (free - take);
            }
            self.bit_offset = ((self.bit_offset as usize + take) % 8) as u8;
            remaining -= take;
        }
    }

    pub fn write_flag(&mut self, flag: bool) {
        self.put_bits(flag as u64, 1);
    }

    pub fn write_byte(&mut self, value: u8) {
        self.put_bits(value as u64, 8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.put_bits(value as u64, 16);
    }

    pub fn write_u32(&mut self, value: u32) {
        self.put_bits(value as u64, 32);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.bit_offset == 0 {
            self.data.extend_from_slice(bytes);
        } else {
            for &b in bytes {
                self.write_byte(b);
            }
        }
    }

    pub fn is_byte_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    pub fn bits_written(&self) -> usize {
        match self.bit_offset {
            0 => self.data.len() * 8,
            offset => (self.data.len() - 1) * 8 + offset as usize,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Finish writing. A trailing partial byte is zero-padded.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_within_byte() {
        let data = [0b1010_1010, 0b1111_0000];
        let mut cursor = BitCursor::new(&data);
        assert_eq!(cursor.read_bits(4).unwrap(), 0b1010);
        assert_eq!(cursor.read_bits(4).unwrap(), 0b1010);
        assert_eq!(cursor.read_bits(8).unwrap(), 0b1111_0000);
        assert_eq!(cursor.bits_remaining(), 0);
    }

    #[test]
    fn test_read_bits_across_bytes() {
        let data = [0b1010_1010, 0b1111_0000];
        let mut cursor = BitCursor::new(&data);
        assert_eq!(cursor.read_bits(6).unwrap(), 0b101010);
        assert_eq!(cursor.read_bits(6).unwrap(), 0b101111);
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.bit_offset(), 4);
    }

    #[test]
    fn test_read_33_bit_pcr_base() {
        let data = [0x0e, 0x26, 0xe0, 0x33, 0x7e, 0x11];
        let mut cursor = BitCursor::new(&data);
        assert_eq!(cursor.read_bits(33).unwrap(), 474_857_574);
        assert_eq!(cursor.read_bits(6).unwrap(), 0x3F);
        assert_eq!(cursor.read_bits(9).unwrap(), 17);
    }

    #[test]
    fn test_read_full_64_bits() {
        let data = [0x01, 0x23, 0x45, 0x67, 0x89, 0xAB, 0xCD, 0xEF, 0xFF];
        let mut cursor = BitCursor::new(&data);
        assert_eq!(cursor.read_bits(64).unwrap(), 0x0123_4567_89AB_CDEF);

        let mut cursor = BitCursor::new(&data);
        cursor.read_bits(4).unwrap();
        assert_eq!(cursor.read_bits(64).unwrap(), 0x1234_5678_9ABC_DEFF);
    }

    #[test]
    fn test_out_of_bounds_is_error_and_does_not_move() {
        let data = [0xFF, 0x00];
        let mut cursor = BitCursor::new(&data);
        cursor.read_bits(12).unwrap();

        let err = cursor.read_bits(5).unwrap_err();
        assert!(matches!(
            err,
            TsError::OutOfBounds {
                requested: 5,
                available: 4
            }
        ));
        assert_eq!(cursor.bits_consumed(), 12);
        assert_eq!(cursor.read_bits(4).unwrap(), 0);
        assert!(cursor.read_bits(1).is_err());
        assert!(BitCursor::new(&[]).read_u8().is_err());
    }

    #[test]
    fn test_width_above_64_rejected() {
        let data = [0u8; 16];
        let mut cursor = BitCursor::new(&data);
        assert!(matches!(
            cursor.read_bits(65),
            Err(TsError::InvalidBitWidth(65))
        ));
        assert!(matches!(
            BitWriter::new().write_bits(0, 100),
            Err(TsError::InvalidBitWidth(100))
        ));
    }

    #[test]
    fn test_peek_does_not_advance() {
        let data = [0xAB, 0xCD];
        let mut cursor = BitCursor::new(&data);
        assert_eq!(cursor.peek_bits(12).unwrap(), 0xABC);
        assert_eq!(cursor.bits_consumed(), 0);
        assert_eq!(cursor.read_u16().unwrap(), 0xABCD);
    }

    #[test]
    fn test_marker_roundtrip() {
        let data = [0x12, 0x34, 0x56];
        let mut cursor = BitCursor::new(&data);
        cursor.read_bits(3).unwrap();
        cursor.set_marker();
        cursor.read_bits(13).unwrap();
        cursor.restore_marker().unwrap();
        assert_eq!(cursor.bits_consumed(), 3);
        assert!(matches!(cursor.restore_marker(), Err(TsError::MarkerNotSet)));
    }

    #[test]
    fn test_read_hex_and_char() {
        let data = [0x45, 0x4E, 0x47];
        assert_eq!(BitCursor::new(&data).read_hex(3).unwrap(), "45 4e 47");
        assert_eq!(BitCursor::new(&data).read_char(3).unwrap(), "ENG");

        let padded = [0x65, 0x6e, 0x67, 0x00];
        assert_eq!(BitCursor::new(&padded).read_hex(4).unwrap(), "65 6e 67 00");
    }

    #[test]
    fn test_unaligned_read_bytes() {
        let data = [0x0F, 0xF0, 0x0F];
        let mut cursor = BitCursor::new(&data);
        cursor.read_bits(4).unwrap();
        assert_eq!(cursor.read_bytes(2).unwrap(), vec![0xFF, 0x00]);
        assert!(cursor.read_bytes(1).is_err());
    }

    #[test]
    fn test_skip_and_remaining_buffer() {
        let data = [1, 2, 3, 4, 5];
        let mut cursor = BitCursor::new(&data);
        cursor.skip_bytes(2).unwrap();
        assert_eq!(cursor.remaining_buffer(), &[3, 4, 5]);
        assert!(cursor.skip_bits(25).is_err());
        cursor.skip_bits(24).unwrap();
        assert!(cursor.remaining_buffer().is_empty());
    }

    #[test]
    fn test_writer_packs_fields_msb_first() {
        let mut writer = BitWriter::new();
        writer.write_byte(0x47);
        writer.write_flag(false);
        writer.write_flag(false);
        writer.write_flag(false);
        writer.write_bits(911, 13).unwrap();
        writer.write_bits(0, 2).unwrap();
        writer.write_bits(1, 2).unwrap();
        writer.write_bits(15, 4).unwrap();
        assert!(writer.is_byte_aligned());
        assert_eq!(writer.into_bytes(), vec![0x47, 0x03, 0x8f, 0x1f]);
    }

    #[test]
    fn test_writer_masks_and_pads() {
        let mut writer = BitWriter::new();
        writer.write_bits(0xFFFF, 4).unwrap();
        assert_eq!(writer.bits_written(), 4);
        writer.write_bits(0x1_2345_6789, 33).unwrap();
        assert_eq!(writer.bits_written(), 37);

        let bytes = writer.into_bytes();
        let mut cursor = BitCursor::new(&bytes);
        assert_eq!(cursor.read_bits(4).unwrap(), 0xF);
        assert_eq!(cursor.read_bits(33).unwrap(), 0x1_2345_6789);
        assert_eq!(cursor.read_bits(3).unwrap(), 0);
    }
}
