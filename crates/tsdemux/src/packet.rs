use crate::adaptation_field::{AdaptationField, Pcr};
use crate::bitstream::BitCursor;
use crate::{Result, TsError};
use bytes::Bytes;
use serde::Serialize;

/// Size of one transport stream packet.
pub const TS_PACKET_SIZE: usize = 188;

pub const SYNC_BYTE: u8 = 0x47;

/// PAT PID (always 0x0000)
pub const PID_PAT: u16 = 0x0000;

/// CAT PID (always 0x0001)
pub const PID_CAT: u16 = 0x0001;

/// Last of the PIDs reserved for fixed tables (CAT, TSDT, NIT, SDT, ...).
pub const PID_RESERVED_MAX: u16 = 0x001F;

/// NULL PID (always 0x1FFF)
pub const PID_NULL: u16 = 0x1FFF;

/// Fixed 4-byte transport stream packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TsHeader {
    /// Transport Error Indicator
    pub transport_error_indicator: bool,
    /// Payload Unit Start Indicator
    pub payload_unit_start_indicator: bool,
    /// Transport Priority
    pub transport_priority: bool,
    /// Packet Identifier
    pub pid: u16,
    /// Transport Scrambling Control
    pub transport_scrambling_control: u8,
    /// Adaptation Field Control
    pub adaptation_field_control: u8,
    /// Continuity Counter
    pub continuity_counter: u8,
}

impl TsHeader {
    pub fn parse(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let sync_byte = cursor.read_u8()?;
        if sync_byte != SYNC_BYTE {
            return Err(TsError::SyncByteMismatch(sync_byte));
        }

        Ok(TsHeader {
            transport_error_indicator: cursor.read_flag()?,
            payload_unit_start_indicator: cursor.read_flag()?,
            transport_priority: cursor.read_flag()?,
            pid: cursor.read_bits(13)? as u16,
            transport_scrambling_control: cursor.read_bits(2)? as u8,
            adaptation_field_control: cursor.read_bits(2)? as u8,
            continuity_counter: cursor.read_bits(4)? as u8,
        })
    }

    pub fn serialize(&self) -> [u8; 4] {
        [
            SYNC_BYTE,
            (self.transport_error_indicator as u8) << 7
                | (self.payload_unit_start_indicator as u8) << 6
                | (self.transport_priority as u8) << 5
                | ((self.pid >> 8) as u8 & 0x1F),
            self.pid as u8,
            (self.transport_scrambling_control & 0x03) << 6
                | (self.adaptation_field_control & 0x03) << 4
                | (self.continuity_counter & 0x0F),
        ]
    }

    /// Check if this packet has a payload
    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & 0x01 != 0
    }

    /// Check if this packet has an adaptation field
    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & 0x02 != 0
    }

    pub fn is_scrambled(&self) -> bool {
        self.transport_scrambling_control != 0
    }
}

/// Transport Stream packet split into header, adaptation field and payload.
#[derive(Debug, Clone)]
pub struct TsPacket {
    pub header: TsHeader,
    pub adaptation_field: Option<AdaptationField>,
    pub payload: Option<Bytes>,
}

impl TsPacket {
    /// Parse a TS packet from 188 bytes
    pub fn parse(data: Bytes) -> Result<Self> {
        if data.len() != TS_PACKET_SIZE {
            return Err(TsError::InvalidPacketSize(data.len()));
        }

        let mut cursor = BitCursor::new(&data);
        let header = TsHeader::parse(&mut cursor)?;

        let adaptation_field = if header.has_adaptation_field() {
            Some(AdaptationField::parse(&mut cursor)?)
        } else {
            None
        };

        let offset = cursor.position();
        let payload = if header.has_payload() && offset < data.len() {
            Some(data.slice(offset..))
        } else {
            None
        };

        Ok(TsPacket {
            header,
            adaptation_field,
            payload,
        })
    }

    pub fn pid(&self) -> u16 {
        self.header.pid
    }

    pub fn pcr(&self) -> Option<Pcr> {
        self.adaptation_field.as_ref().and_then(|af| af.pcr)
    }

    /// Check if this packet contains a random access indicator
    pub fn has_random_access_indicator(&self) -> bool {
        self.adaptation_field
            .as_ref()
            .is_some_and(|af| af.random_access_indicator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let bytes = [0x47, 0x03, 0x8f, 0x1f];
        let header = TsHeader::parse(&mut BitCursor::new(&bytes)).unwrap();
        assert_eq!(header.pid, 911);
        assert_eq!(header.adaptation_field_control, 1);
        assert_eq!(header.continuity_counter, 15);
        assert!(!header.transport_error_indicator);
        assert!(!header.payload_unit_start_indicator);
        assert!(!header.transport_priority);
        assert_eq!(header.transport_scrambling_control, 0);
        assert!(header.has_payload());
        assert!(!header.has_adaptation_field());
        assert_eq!(header.serialize(), bytes);
    }

    #[test]
    fn test_header_serialize_all_bits() {
        let header = TsHeader {
            transport_error_indicator: true,
            payload_unit_start_indicator: true,
            transport_priority: true,
            pid: 0x1FFF,
            transport_scrambling_control: 3,
            adaptation_field_control: 3,
            continuity_counter: 9,
        };
        let bytes = header.serialize();
        assert_eq!(bytes, [0x47, 0xFF, 0xFF, 0xF9]);
        assert_eq!(TsHeader::parse(&mut BitCursor::new(&bytes)).unwrap(), header);
        assert!(header.is_scrambled());
    }

    #[test]
    fn test_invalid_sync_byte() {
        let mut data = vec![0u8; TS_PACKET_SIZE];
        data[0] = 0x46;
        assert!(matches!(
            TsPacket::parse(data.into()),
            Err(TsError::SyncByteMismatch(0x46))
        ));
    }

    #[test]
    fn test_invalid_packet_size() {
        assert!(matches!(
            TsPacket::parse(Bytes::from(vec![0x47; 100])),
            Err(TsError::InvalidPacketSize(100))
        ));
    }

    #[test]
    fn test_payload_only_packet() {
        let mut data = vec![0u8; TS_PACKET_SIZE];
        data[..4].copy_from_slice(&[0x47, 0x40, 0x00, 0x10]);
        data[4] = 0xAB;

        let packet = TsPacket::parse(data.into()).unwrap();
        assert_eq!(packet.pid(), PID_PAT);
        assert!(packet.header.payload_unit_start_indicator);
        assert!(packet.adaptation_field.is_none());
        let payload = packet.payload.unwrap();
        assert_eq!(payload.len(), 184);
        assert_eq!(payload[0], 0xAB);
    }

    #[test]
    fn test_packet_with_pcr_adaptation_field() {
        let mut data = vec![0xFFu8; TS_PACKET_SIZE];
        data[..4].copy_from_slice(&[0x47, 0x01, 0x00, 0x30]);
        data[4..12].copy_from_slice(&[0x07, 0x50, 0x00, 0x04, 0xce, 0xcd, 0x7e, 0xf3]);

        let packet = TsPacket::parse(data.into()).unwrap();
        assert_eq!(packet.pid(), 0x100);
        assert!(packet.has_random_access_indicator());
        assert_eq!(packet.pcr().map(|p| p.as_27mhz()), Some(189_051_243));
        assert_eq!(packet.payload.map(|p| p.len()), Some(176));
    }

    #[test]
    fn test_adaptation_field_filling_packet() {
        let mut data = vec![0xFFu8; TS_PACKET_SIZE];
        data[..4].copy_from_slice(&[0x47, 0x01, 0x00, 0x20]);
        data[4] = 183;
        data[5] = 0x00;

        let packet = TsPacket::parse(data.into()).unwrap();
        assert_eq!(packet.adaptation_field.unwrap().stuffing_len, 182);
        assert!(packet.payload.is_none());
    }

    #[test]
    fn test_oversized_adaptation_field_is_error() {
        let mut data = vec![0u8; TS_PACKET_SIZE];
        data[..4].copy_from_slice(&[0x47, 0x01, 0x00, 0x30]);
        data[4] = 200;
        assert!(matches!(
            TsPacket::parse(data.into()),
            Err(TsError::OutOfBounds { .. })
        ));
    }
}
