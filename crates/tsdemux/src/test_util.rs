//! Packet and section builders shared by the unit tests.

use crate::adaptation_field::{AdaptationField, Pcr};
use crate::descriptor::Descriptor;
use crate::packet::{TS_PACKET_SIZE, TsHeader};
use crate::pat::Pat;
use crate::pmt::{Pmt, PmtStream};
use bytes::Bytes;
use std::collections::BTreeMap;

const PAYLOAD_CAPACITY: usize = TS_PACKET_SIZE - 4;

/// splice_insert for event 2 at PTS 3059760, pointer field included.
pub(crate) const SPLICE_INSERT: [u8; 41] = [
    0x00, 0xfc, 0x30, 0x25, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xf0, 0x14, 0x05,
    0x00, 0x00, 0x00, 0x02, 0x7f, 0xef, 0xfe, 0x00, 0x2e, 0xb0, 0x30, 0xfe, 0x00, 0x14, 0x99,
    0x70, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0xbb, 0x9e, 0x64, 0x39,
];

pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Options for [`packet`] beyond PID, PUSI and counter.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PacketOptions {
    /// PCR in 27 MHz ticks.
    pub pcr: Option<u64>,
    pub random_access: bool,
    pub scrambling_control: u8,
}

/// One 188-byte packet. Short payloads are padded with adaptation stuffing.
pub(crate) fn packet(
    pid: u16,
    pusi: bool,
    cc: u8,
    payload: &[u8],
    options: PacketOptions,
) -> Bytes {
    assert!(payload.len() <= PAYLOAD_CAPACITY, "payload too large");
    let flagged = options.pcr.is_some() || options.random_access;
    let needs_af = flagged || payload.len() < PAYLOAD_CAPACITY;

    let af = if !needs_af {
        Vec::new()
    } else if flagged {
        let base = if options.pcr.is_some() { 8 } else { 2 };
        let room = PAYLOAD_CAPACITY - payload.len();
        assert!(room >= base, "payload leaves no room for the adaptation field");
        AdaptationField {
            random_access_indicator: options.random_access,
            pcr: options.pcr.map(Pcr::from_27mhz),
            stuffing_len: room - base,
            ..Default::default()
        }
        .serialize()
    } else {
        let length = PAYLOAD_CAPACITY - payload.len() - 1;
        let mut af = vec![length as u8];
        if length > 0 {
            af.push(0x00);
            af.resize(length + 1, 0xFF);
        }
        af
    };

    let adaptation_field_control = match (af.is_empty(), payload.is_empty()) {
        (true, _) => 0b01,
        (false, true) => 0b10,
        (false, false) => 0b11,
    };
    let header = TsHeader {
        transport_error_indicator: false,
        payload_unit_start_indicator: pusi,
        transport_priority: false,
        pid,
        transport_scrambling_control: options.scrambling_control,
        adaptation_field_control,
        continuity_counter: cc & 0x0F,
    };

    let mut out = Vec::with_capacity(TS_PACKET_SIZE);
    out.extend_from_slice(&header.serialize());
    out.extend_from_slice(&af);
    out.extend_from_slice(payload);
    assert_eq!(out.len(), TS_PACKET_SIZE);
    Bytes::from(out)
}

/// Payload-only packet.
pub(crate) fn simple_packet(pid: u16, pusi: bool, cc: u8, payload: &[u8]) -> Bytes {
    packet(pid, pusi, cc, payload, PacketOptions::default())
}

/// Split a unit into packets, the first one flagged PUSI.
pub(crate) fn packetize(pid: u16, first_cc: u8, unit: &[u8]) -> Vec<Bytes> {
    unit.chunks(PAYLOAD_CAPACITY)
        .enumerate()
        .map(|(i, chunk)| simple_packet(pid, i == 0, first_cc.wrapping_add(i as u8), chunk))
        .collect()
}

pub(crate) fn pat_section(version: u8, programs: &[(u16, u16)]) -> Vec<u8> {
    Pat {
        table_id: 0,
        transport_stream_id: 1,
        version,
        current_next_indicator: true,
        section_number: 0,
        last_section_number: 0,
        program_map: programs.iter().copied().collect::<BTreeMap<_, _>>(),
        network_pid: None,
        crc32: 0,
    }
    .serialize()
}

/// PMT with `(pid, stream_type)` entries.
pub(crate) fn pmt_section(
    program_number: u16,
    version: u8,
    pcr_pid: u16,
    streams: &[(u16, u8)],
) -> Vec<u8> {
    pmt_with_descriptors(
        program_number,
        version,
        pcr_pid,
        streams
            .iter()
            .map(|&(pid, stream_type)| (pid, stream_type, Vec::new()))
            .collect(),
    )
}

pub(crate) fn pmt_with_descriptors(
    program_number: u16,
    version: u8,
    pcr_pid: u16,
    streams: Vec<(u16, u8, Vec<Descriptor>)>,
) -> Vec<u8> {
    Pmt {
        program_number,
        version,
        current_next_indicator: true,
        pcr_pid,
        program_descriptors: Vec::new(),
        streams: streams
            .into_iter()
            .map(|(pid, stream_type, descriptors)| PmtStream {
                pid,
                stream_type,
                descriptors,
            })
            .collect(),
        crc32: 0,
    }
    .serialize()
}

pub(crate) fn encode_timestamp(sync: u8, ts: u64) -> [u8; 5] {
    [
        (sync << 4) | (((ts >> 30) as u8 & 0x07) << 1) | 0x01,
        (ts >> 22) as u8,
        ((ts >> 15) as u8 & 0x7F) << 1 | 0x01,
        (ts >> 7) as u8,
        ((ts as u8) & 0x7F) << 1 | 0x01,
    ]
}

/// PES packet with an optional header. `bounded` controls whether
/// PES_packet_length is set or left at 0.
pub(crate) fn pes_packet(
    stream_id: u8,
    pts: Option<u64>,
    dts: Option<u64>,
    payload: &[u8],
    bounded: bool,
) -> Vec<u8> {
    let mut optional = Vec::new();
    let flags = match (pts, dts) {
        (Some(pts), Some(dts)) => {
            optional.extend_from_slice(&encode_timestamp(0b0011, pts));
            optional.extend_from_slice(&encode_timestamp(0b0001, dts));
            0xC0
        }
        (Some(pts), None) => {
            optional.extend_from_slice(&encode_timestamp(0b0010, pts));
            0x80
        }
        _ => 0x00,
    };

    let length = if bounded {
        (3 + optional.len() + payload.len()) as u16
    } else {
        0
    };
    let mut out = vec![0x00, 0x00, 0x01, stream_id];
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&[0x80, flags, optional.len() as u8]);
    out.extend_from_slice(&optional);
    out.extend_from_slice(payload);
    out
}
