//! Units emitted by the demux pipe.

use crate::Result;
use crate::pat::Pat;
use crate::pes::PesHeader;
use crate::pmt::Pmt;
use crate::scte35::SpliceInfoSection;
use bytes::Bytes;
use serde::Serialize;

/// A decoded PSI or SCTE-35 table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum PsiTable {
    Pat(Pat),
    Pmt(Pmt),
    Splice(SpliceInfoSection),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableUnit {
    pub pid: u16,
    /// Index of the packet that started the section.
    pub packet_index: u64,
    /// Program clock at `packet_index`, in 27 MHz ticks.
    pub pcr: Option<i64>,
    #[serde(flatten)]
    pub table: PsiTable,
}

/// A completed PES packet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PesUnit {
    pub pid: u16,
    pub program_number: u16,
    pub stream_type: u8,
    /// Index of the packet that started the PES packet.
    pub start_index: u64,
    /// Index of the packet that completed it.
    pub end_index: u64,
    pub header: PesHeader,
    /// Random access indicator of the starting packet.
    pub random_access: bool,
    /// Program clock at `start_index`, in 27 MHz ticks.
    pub pcr: Option<i64>,
    /// `dts - pcr / 300` in 90 kHz ticks.
    pub delay: Option<i64>,
    /// Elementary stream bytes.
    #[serde(skip)]
    pub payload: Bytes,
}

impl PesUnit {
    pub fn pts(&self) -> Option<u64> {
        self.header.pts()
    }

    pub fn dts(&self) -> Option<u64> {
        self.header.dts()
    }

    pub fn size(&self) -> usize {
        self.payload.len()
    }

    pub fn csv_header() -> &'static str {
        "pid,program,stream_type,start_index,end_index,pts,dts,pcr,delay,size,random_access"
    }

    /// One CSV row; absent values are left empty.
    pub fn to_csv_row(&self) -> String {
        fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }

        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.pid,
            self.program_number,
            self.stream_type,
            self.start_index,
            self.end_index,
            opt(self.pts()),
            opt(self.dts()),
            opt(self.pcr),
            opt(self.delay),
            self.size(),
            self.random_access as u8,
        )
    }
}

/// A packet emitted without decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassthroughUnit {
    pub pid: u16,
    pub packet_index: u64,
    /// The whole packet in passthrough mode, otherwise its payload.
    #[serde(skip)]
    pub data: Bytes,
}

/// Output of [`DemuxPipe::fetch_unit`](crate::DemuxPipe::fetch_unit).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodedUnit {
    Table(TableUnit),
    Pes(PesUnit),
    Passthrough(PassthroughUnit),
}

impl DecodedUnit {
    pub fn pid(&self) -> u16 {
        match self {
            DecodedUnit::Table(unit) => unit.pid,
            DecodedUnit::Pes(unit) => unit.pid,
            DecodedUnit::Passthrough(unit) => unit.pid,
        }
    }

    /// Index of the packet that started the unit.
    pub fn packet_index(&self) -> u64 {
        match self {
            DecodedUnit::Table(unit) => unit.packet_index,
            DecodedUnit::Pes(unit) => unit.start_index,
            DecodedUnit::Passthrough(unit) => unit.packet_index,
        }
    }

    pub fn as_table(&self) -> Option<&PsiTable> {
        match self {
            DecodedUnit::Table(unit) => Some(&unit.table),
            _ => None,
        }
    }

    pub fn as_pes(&self) -> Option<&PesUnit> {
        match self {
            DecodedUnit::Pes(unit) => Some(unit),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn pes_unit() -> PesUnit {
        let data = [
            0x00, 0x00, 0x01, 0xe0, 0x00, 0x0b, 0x80, 0x80, 0x05, 0x21, 0x00, 0x05, 0xbf, 0x21,
            0xaa, 0xbb,
        ];
        PesUnit {
            pid: 0x100,
            program_number: 1,
            stream_type: 0x1b,
            start_index: 10,
            end_index: 12,
            header: PesHeader::parse(&data).unwrap(),
            random_access: true,
            pcr: Some(27_000_000),
            delay: Some(-10),
            payload: Bytes::from_static(&[0xaa, 0xbb]),
        }
    }

    #[test]
    fn test_csv_row() {
        let unit = pes_unit();
        assert_eq!(unit.pts(), Some(90_000));
        assert_eq!(unit.dts(), Some(90_000));
        assert_eq!(
            unit.to_csv_row(),
            "256,1,27,10,12,90000,90000,27000000,-10,2,1"
        );
        assert_eq!(
            PesUnit::csv_header().split(',').count(),
            unit.to_csv_row().split(',').count()
        );
    }

    #[test]
    fn test_csv_row_missing_values() {
        let mut unit = pes_unit();
        unit.pcr = None;
        unit.delay = None;
        assert!(unit.to_csv_row().contains(",90000,90000,,,2,"));
    }

    #[test]
    fn test_table_json() {
        let unit = DecodedUnit::Table(TableUnit {
            pid: 0,
            packet_index: 3,
            pcr: None,
            table: PsiTable::Pat(Pat {
                table_id: 0,
                transport_stream_id: 1,
                version: 2,
                current_next_indicator: true,
                section_number: 0,
                last_section_number: 0,
                program_map: BTreeMap::from([(1, 0x1000)]),
                network_pid: None,
                crc32: 0,
            }),
        });
        let value: serde_json::Value = serde_json::from_str(&unit.to_json().unwrap()).unwrap();
        assert_eq!(value["kind"], "table");
        assert_eq!(value["table"], "pat");
        assert_eq!(value["version"], 2);
        assert_eq!(value["program_map"]["1"], 4096);
        assert_eq!(unit.packet_index(), 3);
        assert!(unit.as_table().is_some());
        assert!(unit.as_pes().is_none());
    }

    #[test]
    fn test_pes_json_skips_payload() {
        let unit = DecodedUnit::Pes(pes_unit());
        let value: serde_json::Value = serde_json::from_str(&unit.to_json().unwrap()).unwrap();
        assert_eq!(value["kind"], "pes");
        assert_eq!(value["pid"], 256);
        assert_eq!(value["header"]["stream_id"], 224);
        assert!(value.get("payload").is_none());
    }
}
