use crate::bitstream::BitCursor;
use crate::{Result, TsError};
use serde::Serialize;

/// Video stream ID range (0xE0..=0xEF)
pub const STREAM_ID_VIDEO_MIN: u8 = 0xE0;
/// Video stream ID range (0xE0..=0xEF)
pub const STREAM_ID_VIDEO_MAX: u8 = 0xEF;
/// Audio stream ID range (0xC0..=0xDF)
pub const STREAM_ID_AUDIO_MIN: u8 = 0xC0;
/// Audio stream ID range (0xC0..=0xDF)
pub const STREAM_ID_AUDIO_MAX: u8 = 0xDF;
/// Padding stream
pub const STREAM_ID_PADDING: u8 = 0xBE;

const START_CODE_PREFIX: u64 = 0x00_0001;

/// Fixed prefix: start code (3), stream_id (1), PES_packet_length (2).
pub const PES_PREFIX_LEN: usize = 6;

/// Check if a stream_id has an optional PES header (PTS/DTS fields).
fn has_optional_pes_header(stream_id: u8) -> bool {
    // Per ISO 13818-1 Table 2-18, these stream IDs do NOT have optional header:
    !matches!(
        stream_id,
        0xBC   // program_stream_map
        | 0xBE // padding_stream
        | 0xBF // private_stream_2
        | 0xF0 // ECM_stream
        | 0xF1 // EMM_stream
        | 0xFF // program_stream_directory
        | 0xF2 // DSMCC_stream
        | 0xF8 // ITU-T Rec. H.222.1 type E
    )
}

/// Read a 33-bit PTS/DTS split into 3/15/15-bit segments behind a 4-bit sync nibble.
fn read_timestamp(cursor: &mut BitCursor<'_>, field: &'static str, sync: u8) -> Result<u64> {
    let actual = cursor.read_bits(4)? as u8;
    if actual != sync {
        return Err(TsError::TimestampSyncMismatch {
            field,
            expected: sync,
            actual,
        });
    }
    let high = cursor.read_bits(3)?;
    cursor.skip_bits(1)?;
    let mid = cursor.read_bits(15)?;
    cursor.skip_bits(1)?;
    let low = cursor.read_bits(15)?;
    cursor.skip_bits(1)?;
    Ok((high << 30) | (mid << 15) | low)
}

/// Elementary stream clock reference in 27 MHz ticks.
fn read_escr(cursor: &mut BitCursor<'_>) -> Result<u64> {
    cursor.skip_bits(2)?;
    let high = cursor.read_bits(3)?;
    cursor.skip_bits(1)?;
    let mid = cursor.read_bits(15)?;
    cursor.skip_bits(1)?;
    let low = cursor.read_bits(15)?;
    cursor.skip_bits(1)?;
    let extension = cursor.read_bits(9)?;
    cursor.skip_bits(1)?;
    Ok(((high << 30) | (mid << 15) | low) * 300 + extension)
}

/// DSM trick mode control and its 5-bit qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrickMode {
    pub control: u8,
    pub qualifier: u8,
}

/// PES optional header fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PesOptionalHeader {
    pub scrambling_control: u8,
    pub priority: bool,
    pub data_alignment_indicator: bool,
    pub copyright: bool,
    pub original_or_copy: bool,
    /// PES_header_data_length
    pub header_data_length: u8,
    /// 90 kHz
    pub pts: Option<u64>,
    /// 90 kHz; equals `pts` when only a PTS is sent
    pub dts: Option<u64>,
    /// 27 MHz
    pub escr: Option<u64>,
    /// Bytes per second
    pub es_rate: Option<u32>,
    pub trick_mode: Option<TrickMode>,
    pub additional_copy_info: Option<u8>,
    pub previous_pes_crc: Option<u16>,
    pub extension_flag: bool,
}

impl PesOptionalHeader {
    fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let marker = cursor.read_bits(2)? as u8;
        if marker != 0b10 {
            return Err(TsError::InvalidPesMarker(marker));
        }
        let scrambling_control = cursor.read_bits(2)? as u8;
        let priority = cursor.read_flag()?;
        let data_alignment_indicator = cursor.read_flag()?;
        let copyright = cursor.read_flag()?;
        let original_or_copy = cursor.read_flag()?;
        let pts_dts_flags = cursor.read_bits(2)? as u8;
        let escr_flag = cursor.read_flag()?;
        let es_rate_flag = cursor.read_flag()?;
        let trick_mode_flag = cursor.read_flag()?;
        let additional_copy_info_flag = cursor.read_flag()?;
        let crc_flag = cursor.read_flag()?;
        let extension_flag = cursor.read_flag()?;
        let header_data_length = cursor.read_u8()?;
        let fields_start = cursor.bits_consumed();

        let (pts, dts) = match pts_dts_flags {
            0b00 => (None, None),
            0b10 => {
                let pts = read_timestamp(cursor, "PTS", 0b0010)?;
                (Some(pts), Some(pts))
            }
            0b11 => {
                let pts = read_timestamp(cursor, "PTS", 0b0011)?;
                let dts = read_timestamp(cursor, "DTS", 0b0001)?;
                (Some(pts), Some(dts))
            }
            flags => return Err(TsError::InvalidPtsDtsFlags(flags)),
        };

        let escr = if escr_flag {
            Some(read_escr(cursor)?)
        } else {
            None
        };
        let es_rate = if es_rate_flag {
            cursor.skip_bits(1)?;
            let rate = cursor.read_bits(22)? as u32;
            cursor.skip_bits(1)?;
            Some(rate * 50)
        } else {
            None
        };
        let trick_mode = if trick_mode_flag {
            Some(TrickMode {
                control: cursor.read_bits(3)? as u8,
                qualifier: cursor.read_bits(5)? as u8,
            })
        } else {
            None
        };
        let additional_copy_info = if additional_copy_info_flag {
            cursor.skip_bits(1)?;
            Some(cursor.read_bits(7)? as u8)
        } else {
            None
        };
        let previous_pes_crc = if crc_flag {
            Some(cursor.read_u16()?)
        } else {
            None
        };

        let consumed = (cursor.bits_consumed() - fields_start) / 8;
        let declared = header_data_length as usize;
        if consumed > declared {
            return Err(TsError::PesHeaderOverrun {
                header_length: header_data_length,
            });
        }
        // Extension fields and stuffing.
        cursor.skip_bytes(declared - consumed)?;

        Ok(PesOptionalHeader {
            scrambling_control,
            priority,
            data_alignment_indicator,
            copyright,
            original_or_copy,
            header_data_length,
            pts,
            dts,
            escr,
            es_rate,
            trick_mode,
            additional_copy_info,
            previous_pes_crc,
            extension_flag,
        })
    }

    /// Bytes occupied by the optional header, flag bytes included.
    pub fn length(&self) -> usize {
        self.header_data_length as usize + 3
    }

    pub fn is_scrambled(&self) -> bool {
        self.scrambling_control != 0
    }
}

/// Decoded PES header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PesHeader {
    pub stream_id: u8,
    /// PES_packet_length as sent; 0 means unbounded
    pub declared_length: u16,
    /// Elementary stream bytes following the headers
    pub packet_length: usize,
    pub optional_header: Option<PesOptionalHeader>,
}

impl PesHeader {
    /// Parse PES header from a byte slice starting with the PES start code (0x000001).
    ///
    /// An unbounded packet takes its length from the rest of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = BitCursor::new(data);
        if cursor.read_bits(24)? != START_CODE_PREFIX {
            return Err(TsError::InvalidPesStartCode);
        }
        let stream_id = cursor.read_u8()?;
        let declared_length = cursor.read_u16()?;

        let optional_header = if has_optional_pes_header(stream_id) {
            Some(PesOptionalHeader::read(&mut cursor)?)
        } else {
            None
        };

        let body = match declared_length {
            0 => data.len() - PES_PREFIX_LEN,
            n => n as usize,
        };
        let header = optional_header.as_ref().map_or(0, |h| h.length());
        let packet_length = body.checked_sub(header).ok_or(TsError::InvalidPesLength {
            declared: body,
            header,
        })?;

        Ok(PesHeader {
            stream_id,
            declared_length,
            packet_length,
            optional_header,
        })
    }

    /// Bytes before the elementary stream data.
    pub fn header_size(&self) -> usize {
        PES_PREFIX_LEN + self.optional_header.as_ref().map_or(0, |h| h.length())
    }

    pub fn pts(&self) -> Option<u64> {
        self.optional_header.as_ref().and_then(|h| h.pts)
    }

    pub fn dts(&self) -> Option<u64> {
        self.optional_header.as_ref().and_then(|h| h.dts)
    }

    /// Convert PTS to seconds.
    pub fn pts_seconds(&self) -> Option<f64> {
        self.pts().map(|pts| pts as f64 / 90_000.0)
    }

    /// Convert DTS to seconds.
    pub fn dts_seconds(&self) -> Option<f64> {
        self.dts().map(|dts| dts as f64 / 90_000.0)
    }

    /// Elementary stream bytes of `data`, clipped to what is present.
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        let start = self.header_size().min(data.len());
        let end = (start + self.packet_length).min(data.len());
        &data[start..end]
    }

    /// Check if this is a video stream.
    pub fn is_video(&self) -> bool {
        (STREAM_ID_VIDEO_MIN..=STREAM_ID_VIDEO_MAX).contains(&self.stream_id)
    }

    /// Check if this is an audio stream.
    pub fn is_audio(&self) -> bool {
        (STREAM_ID_AUDIO_MIN..=STREAM_ID_AUDIO_MAX).contains(&self.stream_id)
    }
}

/// Total size of a bounded PES packet once its prefix is buffered.
pub fn expected_packet_size(buf: &[u8]) -> Option<usize> {
    match buf.get(4..PES_PREFIX_LEN)? {
        [0, 0] => None,
        &[hi, lo] => Some(PES_PREFIX_LEN + u16::from_be_bytes([hi, lo]) as usize),
        _ => None,
    }
}
