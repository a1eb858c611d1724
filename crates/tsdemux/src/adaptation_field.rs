use crate::bitstream::{BitCursor, BitWriter, hex_string};
use crate::{Result, TsError};
use serde::Serialize;

/// Tag of an EBP (encoder boundary point) private data record.
pub const EBP_TAG: u8 = 0xDF;
const EBP_FORMAT_ID: &[u8; 4] = b"EBP0";

/// Program Clock Reference (PCR): 33-bit base @ 90kHz + 9-bit extension @ 27MHz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pcr {
    /// 33-bit base value at 90 kHz
    pub base: u64,
    /// 9-bit extension value at 27 MHz
    pub extension: u16,
}

impl Pcr {
    pub fn from_27mhz(value: u64) -> Self {
        Pcr {
            base: (value / 300) & 0x1_FFFF_FFFF,
            extension: (value % 300) as u16,
        }
    }

    /// Layout: base(33) reserved(6) extension(9).
    pub fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let base = cursor.read_bits(33)?;
        cursor.skip_bits(6)?;
        let extension = cursor.read_bits(9)? as u16;
        Ok(Pcr { base, extension })
    }

    pub fn write(&self, writer: &mut BitWriter) {
        writer.put_bits(self.base, 33);
        writer.put_bits(0x3F, 6);
        writer.put_bits(self.extension as u64, 9);
    }

    /// Full PCR value at 27 MHz resolution.
    pub fn as_27mhz(&self) -> u64 {
        self.base * 300 + self.extension as u64
    }

    /// PCR as seconds (floating point).
    pub fn as_seconds(&self) -> f64 {
        self.as_27mhz() as f64 / 27_000_000.0
    }
}

/// Decoded adaptation field.
///
/// `length` is the raw `adaptation_field_length` byte; the field occupies
/// `length + 1` bytes of the packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdaptationField {
    pub length: u8,
    pub discontinuity_indicator: bool,
    pub random_access_indicator: bool,
    pub elementary_stream_priority_indicator: bool,
    pub pcr: Option<Pcr>,
    pub opcr: Option<Pcr>,
    pub splice_countdown: Option<i8>,
    pub transport_private_data: Option<Vec<u8>>,
    /// Raw `adaptation_field_extension` bytes after its length byte.
    pub extension: Option<Vec<u8>>,
    pub stuffing_len: usize,
}

impl AdaptationField {
    /// Parse starting at the length byte. Exactly `length` bytes are consumed
    /// after it whatever flags are set.
    pub fn parse(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let length = cursor.read_u8()?;
        if length == 0 {
            return Ok(AdaptationField::default());
        }

        let body = cursor.read_bytes(length as usize)?;
        let mut field = BitCursor::new(&body);

        let discontinuity_indicator = field.read_flag()?;
        let random_access_indicator = field.read_flag()?;
        let elementary_stream_priority_indicator = field.read_flag()?;
        let pcr_flag = field.read_flag()?;
        let opcr_flag = field.read_flag()?;
        let splicing_point_flag = field.read_flag()?;
        let transport_private_data_flag = field.read_flag()?;
        let extension_flag = field.read_flag()?;

        let pcr = if pcr_flag {
            Some(Pcr::read(&mut field)?)
        } else {
            None
        };
        let opcr = if opcr_flag {
            Some(Pcr::read(&mut field)?)
        } else {
            None
        };
        let splice_countdown = if splicing_point_flag {
            Some(field.read_u8()? as i8)
        } else {
            None
        };
        let transport_private_data = if transport_private_data_flag {
            let len = field.read_u8()? as usize;
            Some(field.read_bytes(len)?)
        } else {
            None
        };
        let extension = if extension_flag {
            let len = field.read_u8()? as usize;
            Some(field.read_bytes(len)?)
        } else {
            None
        };

        let stuffing_len = field.bits_remaining() / 8;

        Ok(AdaptationField {
            length,
            discontinuity_indicator,
            random_access_indicator,
            elementary_stream_priority_indicator,
            pcr,
            opcr,
            splice_countdown,
            transport_private_data,
            extension,
            stuffing_len,
        })
    }

    /// Bytes occupied in the packet, length byte included.
    pub fn size(&self) -> usize {
        self.length as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Re-encode the field, length byte first. Stuffing is written as 0xFF.
    pub fn serialize(&self) -> Vec<u8> {
        let has_content = self.discontinuity_indicator
            || self.random_access_indicator
            || self.elementary_stream_priority_indicator
            || self.pcr.is_some()
            || self.opcr.is_some()
            || self.splice_countdown.is_some()
            || self.transport_private_data.is_some()
            || self.extension.is_some()
            || self.stuffing_len > 0;
        if !has_content {
            return vec![0x00];
        }

        let mut writer = BitWriter::with_capacity(self.size());
        writer.write_byte(0);
        writer.write_flag(self.discontinuity_indicator);
        writer.write_flag(self.random_access_indicator);
        writer.write_flag(self.elementary_stream_priority_indicator);
        writer.write_flag(self.pcr.is_some());
        writer.write_flag(self.opcr.is_some());
        writer.write_flag(self.splice_countdown.is_some());
        writer.write_flag(self.transport_private_data.is_some());
        writer.write_flag(self.extension.is_some());

        if let Some(pcr) = &self.pcr {
            pcr.write(&mut writer);
        }
        if let Some(opcr) = &self.opcr {
            opcr.write(&mut writer);
        }
        if let Some(countdown) = self.splice_countdown {
            writer.write_byte(countdown as u8);
        }
        for block in [&self.transport_private_data, &self.extension]
            .into_iter()
            .flatten()
        {
            writer.write_byte(block.len() as u8);
            writer.write_bytes(block);
        }
        writer.write_bytes(&vec![0xFF; self.stuffing_len]);

        let mut out = writer.into_bytes();
        let length = (out.len() - 1) as u8;
        if let Some(first) = out.first_mut() {
            *first = length;
        }
        out
    }

    /// Decode transport private data as a list of tag/length records.
    pub fn private_data_records(&self) -> Result<Vec<PrivateData>> {
        let Some(data) = &self.transport_private_data else {
            return Ok(Vec::new());
        };
        let mut cursor = BitCursor::new(data);
        let mut records = Vec::new();
        while cursor.bits_remaining() > 0 {
            records.push(PrivateData::read(&mut cursor)?);
        }
        Ok(records)
    }
}

/// One record from the adaptation field's transport private data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrivateData {
    Ebp(EbpRecord),
    Generic { tag: u8, data: String },
}

impl PrivateData {
    fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let tag = cursor.read_u8()?;
        let len = cursor.read_u8()? as usize;
        let body = cursor.read_bytes(len)?;

        if tag == EBP_TAG && body.starts_with(EBP_FORMAT_ID) {
            let mut record = BitCursor::new(&body);
            record.skip_bytes(EBP_FORMAT_ID.len())?;
            return Ok(PrivateData::Ebp(EbpRecord::read(&mut record)?));
        }
        Ok(PrivateData::Generic {
            tag,
            data: hex_string(&body),
        })
    }
}

/// Encoder boundary point marker carried in transport private data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EbpRecord {
    pub fragment: bool,
    pub segment: bool,
    pub concealment: bool,
    pub sap_type: Option<u8>,
    pub grouping_ids: Vec<u8>,
    pub acquisition_time: Option<u64>,
    pub extension_partition: Option<u8>,
}

impl EbpRecord {
    fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let fragment = cursor.read_flag()?;
        let segment = cursor.read_flag()?;
        let sap_flag = cursor.read_flag()?;
        let grouping_flag = cursor.read_flag()?;
        let time_flag = cursor.read_flag()?;
        let concealment = cursor.read_flag()?;
        cursor.skip_bits(1)?;
        let extension_flag = cursor.read_flag()?;

        let mut partition_flag = false;
        if extension_flag {
            partition_flag = cursor.read_flag()?;
            cursor.skip_bits(7)?;
        }

        let sap_type = if sap_flag {
            let sap = cursor.read_bits(3)? as u8;
            cursor.skip_bits(5)?;
            Some(sap)
        } else {
            None
        };

        let mut grouping_ids = Vec::new();
        if grouping_flag {
            loop {
                let more = cursor.read_flag()?;
                grouping_ids.push(cursor.read_bits(7)? as u8);
                if !more {
                    break;
                }
            }
        }

        let acquisition_time = if time_flag {
            Some(cursor.read_bits(64)?)
        } else {
            None
        };
        let extension_partition = if partition_flag {
            Some(cursor.read_u8()?)
        } else {
            None
        };

        Ok(EbpRecord {
            fragment,
            segment,
            concealment,
            sap_type,
            grouping_ids,
            acquisition_time,
            extension_partition,
        })
    }
}

impl TryFrom<&[u8]> for AdaptationField {
    type Error = TsError;

    fn try_from(data: &[u8]) -> Result<Self> {
        AdaptationField::parse(&mut BitCursor::new(data))
    }
}
