use crate::bitstream::BitCursor;
use crate::psi::verify_crc;
use crate::{Result, TsError};
use serde::Serialize;

/// SCTE-35 table ID
pub const SCTE35_TABLE_ID: u8 = 0xFC;

/// Stream type assigned to SCTE-35 cue messages.
pub const SCTE35_STREAM_TYPE: u8 = 0x86;

/// `splice_command_length` value meaning "derive from the command".
const COMMAND_LENGTH_UNSPECIFIED: u16 = 0xFFF;

const PTS_MASK: u64 = 0x1_FFFF_FFFF;

/// SCTE-35 splice command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpliceCommandType {
    SpliceNull,
    SpliceSchedule,
    SpliceInsert,
    TimeSignal,
    BandwidthReservation,
    PrivateCommand,
    Unknown(u8),
}

impl From<u8> for SpliceCommandType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => SpliceCommandType::SpliceNull,
            0x04 => SpliceCommandType::SpliceSchedule,
            0x05 => SpliceCommandType::SpliceInsert,
            0x06 => SpliceCommandType::TimeSignal,
            0x07 => SpliceCommandType::BandwidthReservation,
            0xFF => SpliceCommandType::PrivateCommand,
            v => SpliceCommandType::Unknown(v),
        }
    }
}

impl From<SpliceCommandType> for u8 {
    fn from(value: SpliceCommandType) -> Self {
        match value {
            SpliceCommandType::SpliceNull => 0x00,
            SpliceCommandType::SpliceSchedule => 0x04,
            SpliceCommandType::SpliceInsert => 0x05,
            SpliceCommandType::TimeSignal => 0x06,
            SpliceCommandType::BandwidthReservation => 0x07,
            SpliceCommandType::PrivateCommand => 0xFF,
            SpliceCommandType::Unknown(v) => v,
        }
    }
}

/// Read a splice_time() structure.
fn read_splice_time(cursor: &mut BitCursor<'_>) -> Result<Option<u64>> {
    if cursor.read_flag()? {
        cursor.skip_bits(6)?;
        Ok(Some(cursor.read_bits(33)?))
    } else {
        cursor.skip_bits(7)?;
        Ok(None)
    }
}

/// Break duration in a splice event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakDuration {
    pub auto_return: bool,
    /// Duration in 90kHz ticks (33-bit)
    pub duration: u64,
}

impl BreakDuration {
    fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let auto_return = cursor.read_flag()?;
        cursor.skip_bits(6)?;
        let duration = cursor.read_bits(33)?;
        Ok(BreakDuration {
            auto_return,
            duration,
        })
    }
}

/// Per-component splice point for component-level splicing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpliceComponent {
    pub component_tag: u8,
    /// PTS for splice_insert, UTC seconds for splice_schedule
    pub splice_time: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventTiming {
    /// splice_time() structures carrying a PTS
    Pts,
    /// 32-bit UTC seconds
    Utc,
}

/// A splice event as carried by splice_insert and splice_schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpliceEvent {
    pub splice_event_id: u32,
    pub splice_event_cancel_indicator: bool,
    pub out_of_network_indicator: bool,
    pub program_splice_flag: bool,
    pub duration_flag: bool,
    pub splice_immediate_flag: bool,
    /// PTS for splice_insert, UTC seconds for splice_schedule
    pub splice_time: Option<u64>,
    pub components: Vec<SpliceComponent>,
    pub break_duration: Option<BreakDuration>,
    pub unique_program_id: u16,
    pub avail_num: u8,
    pub avails_expected: u8,
}

impl SpliceEvent {
    fn read(cursor: &mut BitCursor<'_>, timing: EventTiming) -> Result<Self> {
        let mut event = SpliceEvent {
            splice_event_id: cursor.read_u32()?,
            splice_event_cancel_indicator: cursor.read_flag()?,
            ..Default::default()
        };
        cursor.skip_bits(7)?;
        if event.splice_event_cancel_indicator {
            return Ok(event);
        }

        event.out_of_network_indicator = cursor.read_flag()?;
        event.program_splice_flag = cursor.read_flag()?;
        event.duration_flag = cursor.read_flag()?;
        let immediate = cursor.read_flag()?;
        cursor.skip_bits(4)?;
        // The bit is reserved in splice_schedule.
        event.splice_immediate_flag = timing == EventTiming::Pts && immediate;

        let immediate = event.splice_immediate_flag;
        let read_time = move |cursor: &mut BitCursor<'_>| -> Result<Option<u64>> {
            match timing {
                EventTiming::Utc => Ok(Some(cursor.read_u32()? as u64)),
                EventTiming::Pts if immediate => Ok(None),
                EventTiming::Pts => read_splice_time(cursor),
            }
        };

        if event.program_splice_flag {
            event.splice_time = read_time(cursor)?;
        } else {
            let count = cursor.read_u8()?;
            for _ in 0..count {
                let component_tag = cursor.read_u8()?;
                let splice_time = read_time(cursor)?;
                event.components.push(SpliceComponent {
                    component_tag,
                    splice_time,
                });
            }
        }

        if event.duration_flag {
            event.break_duration = Some(BreakDuration::read(cursor)?);
        }
        event.unique_program_id = cursor.read_u16()?;
        event.avail_num = cursor.read_u8()?;
        event.avails_expected = cursor.read_u8()?;
        Ok(event)
    }

    /// Splice times named by this event: the program time, else component times.
    pub fn splice_times(&self) -> Vec<u64> {
        match self.splice_time {
            Some(time) => vec![time],
            None => self
                .components
                .iter()
                .filter_map(|c| c.splice_time)
                .collect(),
        }
    }
}

/// SCTE-35 time signal command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSignal {
    pub splice_time: Option<u64>,
}

/// splice_schedule(): events with UTC splice times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpliceSchedule {
    pub events: Vec<SpliceEvent>,
}

/// private_command(): a registered identifier and opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrivateCommand {
    pub identifier: String,
    pub data: String,
}

/// Parsed splice command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpliceCommand {
    SpliceNull,
    SpliceSchedule(SpliceSchedule),
    SpliceInsert(SpliceEvent),
    TimeSignal(TimeSignal),
    BandwidthReservation,
    PrivateCommand(PrivateCommand),
}

impl SpliceCommand {
    fn read(cursor: &mut BitCursor<'_>, command_type: u8, length: u16) -> Result<Self> {
        Ok(match SpliceCommandType::from(command_type) {
            SpliceCommandType::SpliceNull => SpliceCommand::SpliceNull,
            SpliceCommandType::SpliceSchedule => {
                let count = cursor.read_u8()?;
                let events = (0..count)
                    .map(|_| SpliceEvent::read(cursor, EventTiming::Utc))
                    .collect::<Result<Vec<_>>>()?;
                SpliceCommand::SpliceSchedule(SpliceSchedule { events })
            }
            SpliceCommandType::SpliceInsert => {
                SpliceCommand::SpliceInsert(SpliceEvent::read(cursor, EventTiming::Pts)?)
            }
            SpliceCommandType::TimeSignal => SpliceCommand::TimeSignal(TimeSignal {
                splice_time: read_splice_time(cursor)?,
            }),
            SpliceCommandType::BandwidthReservation => SpliceCommand::BandwidthReservation,
            SpliceCommandType::PrivateCommand => {
                if length == COMMAND_LENGTH_UNSPECIFIED || length < 4 {
                    return Err(TsError::InvalidScte35(format!(
                        "private_command needs an explicit length, got {length}"
                    )));
                }
                SpliceCommand::PrivateCommand(PrivateCommand {
                    identifier: cursor.read_char(4)?,
                    data: cursor.read_hex(length as usize - 4)?,
                })
            }
            SpliceCommandType::Unknown(v) => return Err(TsError::UnsupportedSpliceCommand(v)),
        })
    }

    pub fn command_type(&self) -> SpliceCommandType {
        match self {
            SpliceCommand::SpliceNull => SpliceCommandType::SpliceNull,
            SpliceCommand::SpliceSchedule(_) => SpliceCommandType::SpliceSchedule,
            SpliceCommand::SpliceInsert(_) => SpliceCommandType::SpliceInsert,
            SpliceCommand::TimeSignal(_) => SpliceCommandType::TimeSignal,
            SpliceCommand::BandwidthReservation => SpliceCommandType::BandwidthReservation,
            SpliceCommand::PrivateCommand(_) => SpliceCommandType::PrivateCommand,
        }
    }
}

/// Entry of the splice descriptor loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpliceDescriptor {
    pub tag: u8,
    pub identifier: String,
    pub data: String,
}

impl SpliceDescriptor {
    fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let tag = cursor.read_u8()?;
        let length = cursor.read_u8()? as usize;
        if length < 4 {
            return Err(TsError::InvalidScte35(format!(
                "splice descriptor 0x{tag:02X} shorter than its identifier"
            )));
        }
        Ok(SpliceDescriptor {
            tag,
            identifier: cursor.read_char(4)?,
            data: cursor.read_hex(length - 4)?,
        })
    }
}

/// Top-level SCTE-35 splice info section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpliceInfoSection {
    pub table_id: u8,
    pub section_syntax_indicator: bool,
    pub private_indicator: bool,
    pub sap_type: u8,
    pub section_length: u16,
    pub protocol_version: u8,
    pub encrypted_packet: bool,
    pub encryption_algorithm: u8,
    pub pts_adjustment: u64,
    pub cw_index: u8,
    pub tier: u16,
    pub splice_command_length: u16,
    pub splice_command_type: u8,
    pub splice_command: SpliceCommand,
    pub descriptors: Vec<SpliceDescriptor>,
    pub crc32: u32,
}

impl SpliceInfoSection {
    /// Parse a splice_info_section starting at its pointer field.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut cursor = BitCursor::new(data);
        let pointer_field = cursor.read_u8()?;
        cursor.skip_bytes(pointer_field as usize)?;
        let section_start = cursor.position();

        let table_id = cursor.read_u8()?;
        if table_id != SCTE35_TABLE_ID {
            return Err(TsError::InvalidTableId {
                expected: SCTE35_TABLE_ID,
                actual: table_id,
            });
        }
        let section_syntax_indicator = cursor.read_flag()?;
        let private_indicator = cursor.read_flag()?;
        let sap_type = cursor.read_bits(2)? as u8;
        let section_length = cursor.read_bits(12)? as u16;
        let section_end = section_start + 3 + section_length as usize;
        if section_end > data.len() {
            return Err(TsError::InsufficientData {
                expected: section_end,
                actual: data.len(),
            });
        }

        let protocol_version = cursor.read_u8()?;
        if protocol_version != 0 {
            return Err(TsError::InvalidScte35(format!(
                "unsupported protocol_version {protocol_version}"
            )));
        }
        let encrypted_packet = cursor.read_flag()?;
        if encrypted_packet {
            return Err(TsError::InvalidScte35("encrypted section".to_string()));
        }
        let encryption_algorithm = cursor.read_bits(6)? as u8;
        let pts_adjustment = cursor.read_bits(33)?;
        let cw_index = cursor.read_u8()?;
        let tier = cursor.read_bits(12)? as u16;
        let splice_command_length = cursor.read_bits(12)? as u16;
        let splice_command_type = cursor.read_u8()?;

        let command_start = cursor.position();
        let splice_command =
            SpliceCommand::read(&mut cursor, splice_command_type, splice_command_length)?;
        if splice_command_length != COMMAND_LENGTH_UNSPECIFIED {
            let consumed = cursor.position() - command_start;
            let declared = splice_command_length as usize;
            if consumed > declared {
                return Err(TsError::InvalidScte35(format!(
                    "splice command used {consumed} bytes of {declared}"
                )));
            }
            cursor.skip_bytes(declared - consumed)?;
        }

        let descriptor_loop_length = cursor.read_u16()? as usize;
        let loop_end = cursor.position() + descriptor_loop_length;
        let mut descriptors = Vec::new();
        while cursor.position() < loop_end {
            descriptors.push(SpliceDescriptor::read(&mut cursor)?);
        }
        if cursor.position() != loop_end {
            return Err(TsError::InvalidScte35(
                "splice descriptor overruns its loop".to_string(),
            ));
        }

        // Skip alignment stuffing up to the CRC.
        let crc_start = section_end - 4;
        let position = cursor.position();
        if position > crc_start {
            return Err(TsError::InvalidSectionLength(section_length));
        }
        cursor.skip_bytes(crc_start - position)?;
        let crc32 = cursor.read_u32()?;

        Ok(SpliceInfoSection {
            table_id,
            section_syntax_indicator,
            private_indicator,
            sap_type,
            section_length,
            protocol_version,
            encrypted_packet,
            encryption_algorithm,
            pts_adjustment,
            cw_index,
            tier,
            splice_command_length,
            splice_command_type,
            splice_command,
            descriptors,
            crc32,
        })
    }

    /// Parse with CRC-32/MPEG-2 validation.
    pub fn parse_with_crc(data: &[u8]) -> Result<Self> {
        verify_crc(data)?;
        Self::parse(data)
    }

    pub fn command_type(&self) -> SpliceCommandType {
        self.splice_command.command_type()
    }

    /// Splice points named by the command.
    ///
    /// splice_insert and time_signal yield their resolved PTS, splice_schedule
    /// the UTC times of all its events, other commands nothing.
    pub fn splice_pts(&self) -> Vec<u64> {
        match &self.splice_command {
            SpliceCommand::SpliceInsert(event) => event.splice_times(),
            SpliceCommand::SpliceSchedule(schedule) => schedule
                .events
                .iter()
                .flat_map(SpliceEvent::splice_times)
                .collect(),
            SpliceCommand::TimeSignal(signal) => signal.splice_time.into_iter().collect(),
            SpliceCommand::SpliceNull
            | SpliceCommand::BandwidthReservation
            | SpliceCommand::PrivateCommand(_) => Vec::new(),
        }
    }

    /// [`splice_pts`](Self::splice_pts) with `pts_adjustment` applied modulo 2^33.
    ///
    /// Schedule times are UTC and are returned unchanged.
    pub fn adjusted_splice_pts(&self) -> Vec<u64> {
        let times = self.splice_pts();
        if matches!(self.splice_command, SpliceCommand::SpliceSchedule(_)) {
            return times;
        }
        times
            .into_iter()
            .map(|pts| (pts + self.pts_adjustment) & PTS_MASK)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc32::mpeg2_crc32;

    const SPLICE_INSERT: [u8; 41] = [
        0x00, 0xfc, 0x30, 0x25, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xf0, 0x14,
        0x05, 0x00, 0x00, 0x00, 0x02, 0x7f, 0xef, 0xfe, 0x00, 0x2e, 0xb0, 0x30, 0xfe, 0x00,
        0x14, 0x99, 0x70, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0xbb, 0x9e, 0x64, 0x39,
    ];

    /// Wrap a command in a splice_info_section with a valid CRC.
    fn build_section(command_type: u8, command: &[u8], descriptors: &[u8]) -> Vec<u8> {
        let section_length = 11 + command.len() + 2 + descriptors.len() + 4;
        let mut section = vec![
            0xfc,
            0x30 | (section_length >> 8) as u8,
            section_length as u8,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0x00,
            0xff,
            0xf0 | (command.len() >> 8) as u8,
            command.len() as u8,
            command_type,
        ];
        section.extend_from_slice(command);
        section.extend_from_slice(&(descriptors.len() as u16).to_be_bytes());
        section.extend_from_slice(descriptors);
        let crc = mpeg2_crc32(&section);
        section.extend_from_slice(&crc.to_be_bytes());
        let mut out = vec![0x00];
        out.extend_from_slice(&section);
        out
    }

    #[test]
    fn test_splice_insert() {
        let section = SpliceInfoSection::parse_with_crc(&SPLICE_INSERT).unwrap();
        assert_eq!(section.section_length, 37);
        assert_eq!(section.sap_type, 3);
        assert_eq!(section.tier, 4095);
        assert_eq!(section.splice_command_length, 20);
        assert_eq!(section.command_type(), SpliceCommandType::SpliceInsert);
        assert_eq!(section.crc32, 0xbb9e_6439);

        let SpliceCommand::SpliceInsert(event) = &section.splice_command else {
            panic!("expected splice_insert, got {:?}", section.splice_command);
        };
        assert_eq!(event.splice_event_id, 2);
        assert!(event.out_of_network_indicator);
        assert!(event.program_splice_flag);
        assert!(event.duration_flag);
        assert!(!event.splice_immediate_flag);
        assert_eq!(event.splice_time, Some(3_059_760));
        assert_eq!(
            event.break_duration,
            Some(BreakDuration {
                auto_return: true,
                duration: 1_350_000
            })
        );
        assert_eq!(event.unique_program_id, 1);
        assert_eq!(event.avail_num, 0);
        assert_eq!(event.avails_expected, 1);
        assert_eq!(section.splice_pts(), vec![3_059_760]);
    }

    #[test]
    fn test_splice_null() {
        let bytes = build_section(0x00, &[], &[]);
        let section = SpliceInfoSection::parse_with_crc(&bytes).unwrap();
        assert_eq!(section.section_length, 17);
        assert_eq!(section.splice_command, SpliceCommand::SpliceNull);
        assert!(section.splice_pts().is_empty());
    }

    #[test]
    fn test_time_signal_with_adjustment() {
        let mut bytes = build_section(0x06, &[0xfe, 0x00, 0x00, 0x00, 0x10], &[]);
        // pts_adjustment = 2^33 - 1
        bytes[5] = 0x01;
        bytes[6..10].copy_from_slice(&[0xff; 4]);
        let section = SpliceInfoSection::parse(&bytes).unwrap();
        assert_eq!(section.pts_adjustment, PTS_MASK);
        assert_eq!(section.splice_pts(), vec![16]);
        assert_eq!(section.adjusted_splice_pts(), vec![15]);
    }

    #[test]
    fn test_time_signal_without_time() {
        let bytes = build_section(0x06, &[0x7f], &[]);
        let section = SpliceInfoSection::parse_with_crc(&bytes).unwrap();
        assert_eq!(
            section.splice_command,
            SpliceCommand::TimeSignal(TimeSignal { splice_time: None })
        );
        assert!(section.splice_pts().is_empty());
    }

    #[test]
    fn test_component_splice_insert() {
        let command = [
            0x00, 0x00, 0x00, 0x07, 0x7f, // event 7, not cancelled
            0x8f, // out of network, component splice, no duration, not immediate
            0x02, // two components
            0x01, 0xfe, 0x00, 0x00, 0x00, 0x64, // tag 1 at 100
            0x02, 0x7f, // tag 2 without time
            0x00, 0x05, 0x01, 0x02,
        ];
        let bytes = build_section(0x05, &command, &[]);
        let section = SpliceInfoSection::parse_with_crc(&bytes).unwrap();
        let SpliceCommand::SpliceInsert(event) = &section.splice_command else {
            panic!("expected splice_insert");
        };
        assert!(!event.program_splice_flag);
        assert_eq!(event.components.len(), 2);
        assert_eq!(event.components[1].splice_time, None);
        assert_eq!(event.unique_program_id, 5);
        assert_eq!(section.splice_pts(), vec![100]);
    }

    #[test]
    fn test_cancelled_event() {
        let command = [0x00, 0x00, 0x00, 0x09, 0xff];
        let bytes = build_section(0x05, &command, &[]);
        let section = SpliceInfoSection::parse_with_crc(&bytes).unwrap();
        let SpliceCommand::SpliceInsert(event) = &section.splice_command else {
            panic!("expected splice_insert");
        };
        assert!(event.splice_event_cancel_indicator);
        assert!(section.splice_pts().is_empty());
    }

    #[test]
    fn test_splice_schedule_utc_times() {
        let command = [
            0x02, // two events
            0x00, 0x00, 0x00, 0x01, 0x7f, 0xcf, 0x5f, 0x5e, 0x10, 0x00, 0x00, 0x01, 0x00, 0x01,
            0x00, 0x00, 0x00, 0x02, 0x7f, 0x8f, 0x01, 0x03, 0x5f, 0x5e, 0x10, 0x20, 0x00, 0x02,
            0x00, 0x01,
        ];
        let bytes = build_section(0x04, &command, &[]);
        let section = SpliceInfoSection::parse_with_crc(&bytes).unwrap();
        let SpliceCommand::SpliceSchedule(schedule) = &section.splice_command else {
            panic!("expected splice_schedule");
        };
        assert_eq!(schedule.events.len(), 2);
        assert_eq!(schedule.events[1].components[0].component_tag, 3);
        assert_eq!(section.splice_pts(), vec![0x5f5e_1000, 0x5f5e_1020]);
        assert_eq!(section.adjusted_splice_pts(), section.splice_pts());
    }

    #[test]
    fn test_private_command_and_descriptor() {
        let command = [b'A', b'B', b'C', b'D', 0x01, 0x02];
        let descriptors = [0x00, 0x08, b'C', b'U', b'E', b'I', 0x00, 0x00, 0x00, 0x2a];
        let bytes = build_section(0xff, &command, &descriptors);
        let section = SpliceInfoSection::parse_with_crc(&bytes).unwrap();
        assert_eq!(
            section.splice_command,
            SpliceCommand::PrivateCommand(PrivateCommand {
                identifier: "ABCD".to_string(),
                data: "01 02".to_string()
            })
        );
        assert_eq!(section.descriptors.len(), 1);
        assert_eq!(section.descriptors[0].identifier, "CUEI");
        assert_eq!(section.descriptors[0].data, "00 00 00 2a");
    }

    #[test]
    fn test_bandwidth_reservation() {
        let bytes = build_section(0x07, &[], &[]);
        let section = SpliceInfoSection::parse_with_crc(&bytes).unwrap();
        assert_eq!(section.splice_command, SpliceCommand::BandwidthReservation);
    }

    #[test]
    fn test_unknown_command_type() {
        let bytes = build_section(0x42, &[], &[]);
        assert!(matches!(
            SpliceInfoSection::parse(&bytes),
            Err(TsError::UnsupportedSpliceCommand(0x42))
        ));
    }

    #[test]
    fn test_encrypted_and_protocol_rejected() {
        let mut bytes = SPLICE_INSERT;
        bytes[5] = 0x80;
        assert!(matches!(
            SpliceInfoSection::parse(&bytes),
            Err(TsError::InvalidScte35(_))
        ));
        let mut bytes = SPLICE_INSERT;
        bytes[4] = 0x01;
        assert!(matches!(
            SpliceInfoSection::parse(&bytes),
            Err(TsError::InvalidScte35(_))
        ));
    }

    #[test]
    fn test_unspecified_command_length() {
        let mut bytes = SPLICE_INSERT.to_vec();
        bytes[12] = 0xff;
        bytes[13] = 0xff;
        let section = SpliceInfoSection::parse(&bytes).unwrap();
        assert_eq!(section.splice_command_length, 0xfff);
        assert_eq!(section.splice_pts(), vec![3_059_760]);
    }

    #[test]
    fn test_wrong_table_and_truncation() {
        let mut bytes = SPLICE_INSERT;
        bytes[1] = 0x02;
        assert!(matches!(
            SpliceInfoSection::parse(&bytes),
            Err(TsError::InvalidTableId { .. })
        ));
        for len in [0, 3, 14, 30, 40] {
            assert!(SpliceInfoSection::parse(&SPLICE_INSERT[..len]).is_err());
        }
    }

    #[test]
    fn test_crc_mismatch() {
        let mut bytes = SPLICE_INSERT;
        bytes[20] = 0x6f;
        assert!(matches!(
            SpliceInfoSection::parse_with_crc(&bytes),
            Err(TsError::Crc32Mismatch { .. })
        ));
    }
}
