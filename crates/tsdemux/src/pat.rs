use crate::bitstream::{BitCursor, BitWriter};
use crate::psi::{
    PAT_TABLE_ID, ParseOutcome, SECTION_OVERHEAD, SectionHeader, Versioned, expect_bits,
    seal_section, verify_crc,
};
use crate::{Result, TsError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Program Association Table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pat {
    pub table_id: u8,
    pub transport_stream_id: u16,
    pub version: u8,
    pub current_next_indicator: bool,
    pub section_number: u8,
    pub last_section_number: u8,
    /// program_number -> PMT PID
    pub program_map: BTreeMap<u16, u16>,
    /// PID of the NIT, announced under program number 0.
    pub network_pid: Option<u16>,
    pub crc32: u32,
}

impl Versioned for Pat {
    fn version(&self) -> u8 {
        self.version
    }
}

impl Pat {
    /// Parse a PAT section starting at its pointer field.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = BitCursor::new(data);
        let header = SectionHeader::read(&mut cursor, PAT_TABLE_ID)?;

        let entries_len = header.section_length - SECTION_OVERHEAD;
        if entries_len % 4 != 0 {
            return Err(TsError::InvalidSectionLength(header.section_length));
        }

        let mut program_map = BTreeMap::new();
        let mut network_pid = None;
        for _ in 0..entries_len / 4 {
            let program_number = cursor.read_u16()?;
            expect_bits(&mut cursor, 3, 0b111, "reserved")?;
            let pid = cursor.read_bits(13)? as u16;
            if program_number == 0 {
                network_pid = Some(pid);
            } else {
                program_map.insert(program_number, pid);
            }
        }
        let crc32 = cursor.read_u32()?;

        Ok(Pat {
            table_id: header.table_id,
            transport_stream_id: header.table_id_extension,
            version: header.version,
            current_next_indicator: header.current_next_indicator,
            section_number: header.section_number,
            last_section_number: header.last_section_number,
            program_map,
            network_pid,
            crc32,
        })
    }

    /// Parse PAT with CRC-32/MPEG-2 validation.
    pub fn parse_with_crc(data: &[u8]) -> Result<Self> {
        verify_crc(data)?;
        Self::parse(data)
    }

    /// Parse and compare against the last version seen for this stream.
    pub fn parse_update(data: &[u8], last_version: Option<u8>) -> Result<ParseOutcome<Pat>> {
        Ok(ParseOutcome::new(Self::parse(data)?, last_version))
    }

    /// PMT PID of a program.
    pub fn pmt_pid(&self, program_number: u16) -> Option<u16> {
        self.program_map.get(&program_number).copied()
    }

    /// Program carried on a PMT PID.
    pub fn program_for_pid(&self, pid: u16) -> Option<u16> {
        self.program_map
            .iter()
            .find_map(|(&program, &pmt_pid)| (pmt_pid == pid).then_some(program))
    }

    /// Encode as a section with a zero pointer field and a fresh CRC.
    pub fn serialize(&self) -> Vec<u8> {
        let entries = self.program_map.len() + self.network_pid.is_some() as usize;
        let header = SectionHeader {
            pointer_field: 0,
            table_id: self.table_id,
            section_length: SECTION_OVERHEAD + (entries * 4) as u16,
            table_id_extension: self.transport_stream_id,
            version: self.version,
            current_next_indicator: self.current_next_indicator,
            section_number: self.section_number,
            last_section_number: self.last_section_number,
        };

        let mut writer = BitWriter::with_capacity(13 + entries * 4);
        header.write(&mut writer);
        let network = self.network_pid.map(|pid| (0u16, pid));
        for (program_number, pid) in network.into_iter().chain(
            self.program_map
                .iter()
                .map(|(&program, &pid)| (program, pid)),
        ) {
            writer.write_u16(program_number);
            writer.put_bits(0b111, 3);
            writer.put_bits(pid as u64, 13);
        }
        seal_section(writer.into_bytes()).0
    }
}
