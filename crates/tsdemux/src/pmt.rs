use crate::bitstream::{BitCursor, BitWriter};
use crate::descriptor::{Descriptor, descriptor_loop_size, read_descriptor_loop};
use crate::psi::{
    PMT_TABLE_ID, ParseOutcome, SECTION_OVERHEAD, SectionHeader, Versioned, expect_bits,
    seal_section, verify_crc,
};
use crate::{Result, TsError};
use serde::Serialize;

/// Fixed bytes of an elementary stream entry before its descriptors.
const STREAM_ENTRY_LEN: i64 = 5;

/// Elementary stream entry in a PMT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PmtStream {
    pub pid: u16,
    pub stream_type: u8,
    pub descriptors: Vec<Descriptor>,
}

impl PmtStream {
    /// Whether a descriptor announces SCTE-35 cue messages on this stream.
    pub fn has_cue_marker(&self) -> bool {
        self.descriptors.iter().any(Descriptor::is_cue_marker)
    }
}

/// Program Map Table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pmt {
    pub program_number: u16,
    pub version: u8,
    pub current_next_indicator: bool,
    pub pcr_pid: u16,
    pub program_descriptors: Vec<Descriptor>,
    pub streams: Vec<PmtStream>,
    pub crc32: u32,
}

impl Versioned for Pmt {
    fn version(&self) -> u8 {
        self.version
    }
}

impl Pmt {
    /// Parse a PMT section starting at its pointer field.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = BitCursor::new(data);
        let header = SectionHeader::read(&mut cursor, PMT_TABLE_ID)?;

        expect_bits(&mut cursor, 3, 0b111, "reserved")?;
        let pcr_pid = cursor.read_bits(13)? as u16;
        expect_bits(&mut cursor, 4, 0b1111, "reserved")?;
        expect_bits(&mut cursor, 2, 0b00, "program_info_length unused bits")?;
        let program_info_length = cursor.read_bits(10)? as usize;

        let mut remaining = header.section_length as i64
            - SECTION_OVERHEAD as i64
            - 4
            - program_info_length as i64;
        if remaining < 0 {
            return Err(TsError::InvalidSectionLength(header.section_length));
        }
        let program_descriptors = read_descriptor_loop(&mut cursor, program_info_length)?;

        let mut streams = Vec::new();
        while remaining > 0 {
            let stream_type = cursor.read_u8()?;
            expect_bits(&mut cursor, 3, 0b111, "reserved")?;
            let pid = cursor.read_bits(13)? as u16;
            expect_bits(&mut cursor, 4, 0b1111, "reserved")?;
            expect_bits(&mut cursor, 2, 0b00, "ES_info_length unused bits")?;
            let es_info_length = cursor.read_bits(10)? as usize;
            let descriptors = read_descriptor_loop(&mut cursor, es_info_length)?;

            remaining -= STREAM_ENTRY_LEN + es_info_length as i64;
            streams.push(PmtStream {
                pid,
                stream_type,
                descriptors,
            });
        }
        if remaining != 0 {
            return Err(TsError::InvalidSectionLength(header.section_length));
        }
        let crc32 = cursor.read_u32()?;

        Ok(Pmt {
            program_number: header.table_id_extension,
            version: header.version,
            current_next_indicator: header.current_next_indicator,
            pcr_pid,
            program_descriptors,
            streams,
            crc32,
        })
    }

    /// Parse PMT with CRC-32/MPEG-2 validation.
    pub fn parse_with_crc(data: &[u8]) -> Result<Self> {
        verify_crc(data)?;
        Self::parse(data)
    }

    /// Parse and compare against the last version seen for this program.
    pub fn parse_update(data: &[u8], last_version: Option<u8>) -> Result<ParseOutcome<Pmt>> {
        Ok(ParseOutcome::new(Self::parse(data)?, last_version))
    }

    pub fn stream(&self, pid: u16) -> Option<&PmtStream> {
        self.streams.iter().find(|s| s.pid == pid)
    }

    /// Encode as a section with a zero pointer field and a fresh CRC.
    pub fn serialize(&self) -> Vec<u8> {
        let program_info_length = descriptor_loop_size(&self.program_descriptors);
        let streams_length: usize = self
            .streams
            .iter()
            .map(|s| STREAM_ENTRY_LEN as usize + descriptor_loop_size(&s.descriptors))
            .sum();
        let header = SectionHeader {
            pointer_field: 0,
            table_id: PMT_TABLE_ID,
            section_length: (SECTION_OVERHEAD as usize + 4 + program_info_length + streams_length)
                as u16,
            table_id_extension: self.program_number,
            version: self.version,
            current_next_indicator: self.current_next_indicator,
            section_number: 0,
            last_section_number: 0,
        };

        let mut writer = BitWriter::with_capacity(header.section_length as usize + 4);
        header.write(&mut writer);
        writer.put_bits(0b111, 3);
        writer.put_bits(self.pcr_pid as u64, 13);
        writer.put_bits(0b1111_00, 6);
        writer.put_bits(program_info_length as u64, 10);
        for descriptor in &self.program_descriptors {
            descriptor.write(&mut writer);
        }
        for stream in &self.streams {
            writer.write_byte(stream.stream_type);
            writer.put_bits(0b111, 3);
            writer.put_bits(stream.pid as u64, 13);
            writer.put_bits(0b1111_00, 6);
            writer.put_bits(descriptor_loop_size(&stream.descriptors) as u64, 10);
            for descriptor in &stream.descriptors {
                descriptor.write(&mut writer);
            }
        }
        seal_section(writer.into_bytes()).0
    }
}
