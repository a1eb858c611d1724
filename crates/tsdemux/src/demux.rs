//! Packet-driven demultiplexer.
//!
//! [`DemuxPipe`] takes one 188-byte packet at a time, routes it by PID, and
//! reassembles PAT, PMT, SCTE-35 sections and PES packets. Completed units
//! are queued until [`DemuxPipe::fetch_unit`] drains them.

use crate::clock::ProgramClock;
use crate::config::{DemuxConfig, DemuxMode};
use crate::continuity::{ContinuityMode, ContinuityStatus, ContinuityTracker};
use crate::packet::{PID_NULL, PID_PAT, PID_RESERVED_MAX, SYNC_BYTE, TS_PACKET_SIZE, TsPacket};
use crate::pat::Pat;
use crate::pes::{PesHeader, expected_packet_size};
use crate::pmt::Pmt;
use crate::psi::ready_for_parse;
use crate::scte35::{SpliceCommandType, SpliceInfoSection};
use crate::stream_type::{StandardStreamTypes, StreamKind, StreamTypeRegistry};
use crate::summary::StreamSummary;
use crate::unit::{DecodedUnit, PassthroughUnit, PesUnit, PsiTable, TableUnit};
use crate::{Result, TsError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use memchr::memchr;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use tracing::{debug, info, warn};

/// 27 MHz ticks per 90 kHz tick.
const PCR_TICKS_PER_PTS: i64 = 300;

/// Advisory conditions collected while demultiplexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Continuity {
        pid: u16,
        packet_index: u64,
        status: ContinuityStatus,
    },
    /// Continuation packet without a preceding unit start.
    OrphanContinuation { pid: u16, packet_index: u64 },
    /// A completed unit failed to decode and was dropped.
    DecodeFailed {
        pid: u16,
        packet_index: u64,
        error: String,
    },
    VersionChanged {
        pid: u16,
        from: u8,
        to: u8,
    },
    /// Same version as the table in use but different content.
    StaleVersion { pid: u16, version: u8 },
    /// Section assembly exceeded `max_section_size` and was discarded.
    OversizedBuffer {
        pid: u16,
        packet_index: u64,
        size: usize,
    },
}

/// Splice points announced by a decoded SCTE-35 section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceNotification {
    pub pid: u16,
    pub packet_index: u64,
    pub command_type: SpliceCommandType,
    pub splice_pts: Vec<u64>,
}

/// Receiver of [`SpliceNotification`]s.
pub trait SpliceListener: Send {
    fn on_splice(&mut self, notification: &SpliceNotification);
}

impl<F> SpliceListener for F
where
    F: FnMut(&SpliceNotification) + Send,
{
    fn on_splice(&mut self, notification: &SpliceNotification) {
        self(notification)
    }
}

/// Elementary stream registered by a PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamInfo {
    pub program_number: u16,
    pub stream_type: u8,
    pub kind: StreamKind,
}

#[derive(Debug)]
struct Program {
    pmt_pid: u16,
    pmt: Option<Pmt>,
    clock: ProgramClock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Pat,
    Pmt,
    Splice { program_number: u16 },
    Pes { program_number: u16, stream_type: u8 },
}

impl Target {
    fn is_section(&self) -> bool {
        !matches!(self, Target::Pes { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Assemble(Target),
    Passthrough,
    Ignore,
}

/// A unit being reassembled on one PID.
#[derive(Debug)]
struct Assembly {
    target: Target,
    buf: BytesMut,
    start_index: u64,
    last_index: u64,
    random_access: bool,
}

impl Assembly {
    fn is_ready(&self) -> bool {
        if self.target.is_section() {
            ready_for_parse(&self.buf)
        } else {
            expected_packet_size(&self.buf).is_some_and(|size| self.buf.len() >= size)
        }
    }
}

/// Queued unit plus the program whose clock stamps it.
#[derive(Debug)]
struct Pending {
    unit: DecodedUnit,
    program_number: Option<u16>,
}

/// MPEG-2 transport stream demultiplexer.
pub struct DemuxPipe {
    config: DemuxConfig,
    registry: Box<dyn StreamTypeRegistry>,
    listeners: Vec<Box<dyn SpliceListener>>,

    pat: Option<Pat>,
    /// PMT PID -> program number
    pmt_pids: HashMap<u16, u16>,
    programs: BTreeMap<u16, Program>,
    streams: HashMap<u16, StreamInfo>,

    assemblies: HashMap<u16, Assembly>,
    output: VecDeque<Pending>,
    diagnostics: Vec<Diagnostic>,

    continuity: ContinuityTracker,
    packet_counts: BTreeMap<u16, u64>,
    first_index: Option<u64>,
    last_index: Option<u64>,
    next_index: u64,
    discarded_units: usize,
}

impl Default for DemuxPipe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DemuxPipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DemuxPipe")
            .field("config", &self.config)
            .field("pat", &self.pat)
            .field("streams", &self.streams)
            .field("pending_units", &self.output.len())
            .finish_non_exhaustive()
    }
}

impl DemuxPipe {
    pub fn new() -> Self {
        Self {
            config: DemuxConfig::default(),
            registry: Box::new(StandardStreamTypes),
            listeners: Vec::new(),
            pat: None,
            pmt_pids: HashMap::new(),
            programs: BTreeMap::new(),
            streams: HashMap::new(),
            assemblies: HashMap::new(),
            output: VecDeque::new(),
            diagnostics: Vec::new(),
            continuity: ContinuityTracker::new(),
            packet_counts: BTreeMap::new(),
            first_index: None,
            last_index: None,
            next_index: 0,
            discarded_units: 0,
        }
    }

    pub fn with_config(mut self, config: DemuxConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable or disable CRC-32/MPEG-2 validation on PSI and SCTE-35 sections.
    pub fn with_crc_validation(mut self, enable: bool) -> Self {
        self.config.validate_crc = enable;
        self
    }

    pub fn with_continuity_mode(mut self, mode: ContinuityMode) -> Self {
        self.config.continuity_mode = mode;
        self
    }

    pub fn with_mode(mut self, mode: DemuxMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_registry<R: StreamTypeRegistry + 'static>(mut self, registry: R) -> Self {
        self.registry = Box::new(registry);
        self
    }

    pub fn add_splice_listener<L: SpliceListener + 'static>(&mut self, listener: L) {
        self.listeners.push(Box::new(listener));
    }

    pub fn config(&self) -> &DemuxConfig {
        &self.config
    }

    pub fn pat(&self) -> Option<&Pat> {
        self.pat.as_ref()
    }

    pub fn pmt(&self, program_number: u16) -> Option<&Pmt> {
        self.programs.get(&program_number)?.pmt.as_ref()
    }

    pub fn stream(&self, pid: u16) -> Option<&StreamInfo> {
        self.streams.get(&pid)
    }

    pub fn clock(&self, program_number: u16) -> Option<&ProgramClock> {
        self.programs.get(&program_number).map(|p| &p.clock)
    }

    pub fn packet_count(&self, pid: u16) -> u64 {
        self.packet_counts.get(&pid).copied().unwrap_or(0)
    }

    pub fn pending_units(&self) -> usize {
        self.output.len()
    }

    pub fn continuity_issue_count(&self) -> usize {
        self.continuity.issue_count()
    }

    pub fn continuity_duplicate_count(&self) -> usize {
        self.continuity.duplicate_count()
    }

    pub fn continuity_discontinuity_count(&self) -> usize {
        self.continuity.discontinuity_count()
    }

    /// Human-readable name of a PMT stream type.
    pub fn query_stream_type(&self, stream_type: u8) -> &str {
        self.registry.describe(stream_type)
    }

    pub fn drain_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Deliver one 188-byte packet.
    ///
    /// Fails for a malformed packet and, in strict continuity mode, for a
    /// continuity violation once the packet has been processed.
    pub fn deliver(&mut self, packet: Bytes, packet_index: u64) -> Result<()> {
        let parsed = TsPacket::parse(packet.clone())?;
        self.process(parsed, packet, packet_index)
    }

    /// Deliver a contiguous buffer of packets, resynchronising on the next
    /// sync byte after a malformed packet. A sync byte only starts a packet
    /// when another one follows 188 bytes later or the buffer ends first.
    /// Returns the packets delivered.
    pub fn deliver_chunk(&mut self, data: Bytes) -> Result<usize> {
        let mut remaining = data;
        let mut delivered = 0;

        while !remaining.is_empty() {
            let Some(sync_offset) = memchr(SYNC_BYTE, &remaining) else {
                break;
            };
            remaining.advance(sync_offset);
            if remaining.len() < TS_PACKET_SIZE {
                break;
            }
            if !packet_starts_at_head(&remaining) {
                debug!("Skipping sync byte without a following packet");
                remaining.advance(1);
                continue;
            }

            let chunk = remaining.slice(..TS_PACKET_SIZE);
            match TsPacket::parse(chunk.clone()) {
                Ok(packet) => {
                    let index = self.next_index;
                    remaining.advance(TS_PACKET_SIZE);
                    delivered += 1;
                    self.process(packet, chunk, index)?;
                }
                Err(e) => {
                    debug!(error = %e, "Skipping byte while resynchronising");
                    remaining.advance(1);
                }
            }
        }

        Ok(delivered)
    }

    fn process(&mut self, packet: TsPacket, raw: Bytes, packet_index: u64) -> Result<()> {
        let pid = packet.pid();
        self.first_index.get_or_insert(packet_index);
        self.last_index = Some(packet_index);
        self.next_index = self.next_index.max(packet_index + 1);
        *self.packet_counts.entry(pid).or_default() += 1;

        let status = if self.config.continuity_mode == ContinuityMode::Disabled {
            ContinuityStatus::Ok
        } else {
            self.continuity.check(&packet.header)
        };

        if packet.header.is_scrambled() {
            debug!(pid, packet_index, "Dropping scrambled packet");
        } else if self.config.mode == DemuxMode::Passthrough {
            self.push_unit(
                DecodedUnit::Passthrough(PassthroughUnit {
                    pid,
                    packet_index,
                    data: raw,
                }),
                None,
            );
        } else {
            self.update_clocks(&packet, packet_index);
            self.dispatch(packet, packet_index);
        }

        self.handle_continuity_status(pid, packet_index, status)
    }

    fn handle_continuity_status(
        &mut self,
        pid: u16,
        packet_index: u64,
        status: ContinuityStatus,
    ) -> Result<()> {
        if !status.is_issue() {
            return Ok(());
        }
        warn!(pid, packet_index, ?status, "Continuity counter issue");
        self.diagnostics.push(Diagnostic::Continuity {
            pid,
            packet_index,
            status,
        });

        if self.config.continuity_mode != ContinuityMode::Strict {
            return Ok(());
        }
        match status {
            ContinuityStatus::Discontinuity { expected, actual } => Err(TsError::ContinuityError {
                pid,
                expected,
                actual,
            }),
            _ => Err(TsError::DuplicatePacket {
                pid,
                cc: self.continuity.last_counter(pid).unwrap_or(0),
            }),
        }
    }

    /// Feed the PCR of a packet to every program it clocks.
    fn update_clocks(&mut self, packet: &TsPacket, packet_index: u64) {
        let Some(pcr) = packet.pcr() else {
            return;
        };
        let pid = packet.pid();
        let pes_program = self
            .streams
            .get(&pid)
            .filter(|s| s.kind.is_pes())
            .map(|s| s.program_number);

        for (&program_number, program) in self.programs.iter_mut() {
            let on_pcr_pid = program.pmt.as_ref().is_some_and(|pmt| pmt.pcr_pid == pid);
            if on_pcr_pid || pes_program == Some(program_number) {
                program.clock.update(Some(pcr.as_27mhz()), packet_index);
            }
        }
    }

    fn route(&self, pid: u16) -> Route {
        if pid == PID_PAT {
            return Route::Assemble(Target::Pat);
        }
        if pid <= PID_RESERVED_MAX || pid == PID_NULL {
            return Route::Ignore;
        }
        if self.pmt_pids.contains_key(&pid) {
            return Route::Assemble(Target::Pmt);
        }

        let passthrough = if self.config.emit_passthrough {
            Route::Passthrough
        } else {
            Route::Ignore
        };
        let Some(info) = self.streams.get(&pid) else {
            return passthrough;
        };
        match info.kind {
            StreamKind::Splice => Route::Assemble(Target::Splice {
                program_number: info.program_number,
            }),
            StreamKind::Video | StreamKind::Audio if self.config.mode == DemuxMode::PsiOnly => {
                Route::Ignore
            }
            StreamKind::Video | StreamKind::Audio => Route::Assemble(Target::Pes {
                program_number: info.program_number,
                stream_type: info.stream_type,
            }),
            StreamKind::Other => passthrough,
        }
    }

    fn dispatch(&mut self, packet: TsPacket, packet_index: u64) {
        let pid = packet.pid();
        let random_access = packet.has_random_access_indicator();
        let pusi = packet.header.payload_unit_start_indicator;
        let Some(payload) = packet.payload else {
            return;
        };

        match self.route(pid) {
            Route::Assemble(target) => {
                self.assemble(pid, target, payload, pusi, random_access, packet_index)
            }
            Route::Passthrough => self.push_unit(
                DecodedUnit::Passthrough(PassthroughUnit {
                    pid,
                    packet_index,
                    data: payload,
                }),
                self.streams.get(&pid).map(|s| s.program_number),
            ),
            Route::Ignore => {}
        }
    }

    fn assemble(
        &mut self,
        pid: u16,
        target: Target,
        payload: Bytes,
        pusi: bool,
        random_access: bool,
        packet_index: u64,
    ) {
        if pusi {
            let body = if target.is_section() {
                // Bytes before the pointer target complete the previous section.
                let pointer = payload.first().copied().unwrap_or(0) as usize;
                let section_start = (1 + pointer).min(payload.len());
                if let Some(mut previous) = self.assemblies.remove(&pid) {
                    previous
                        .buf
                        .extend_from_slice(payload.get(1..section_start).unwrap_or_default());
                    previous.last_index = packet_index;
                    self.finalize(pid, previous);
                }
                let rest = payload.get(section_start..).unwrap_or_default();
                let mut body = BytesMut::with_capacity(1 + rest.len());
                body.put_u8(0);
                body.extend_from_slice(rest);
                body
            } else {
                if let Some(previous) = self.assemblies.remove(&pid) {
                    self.finalize(pid, previous);
                }
                BytesMut::from(&payload[..])
            };

            self.assemblies.insert(
                pid,
                Assembly {
                    target,
                    buf: body,
                    start_index: packet_index,
                    last_index: packet_index,
                    random_access,
                },
            );
        } else {
            let Some(assembly) = self.assemblies.get_mut(&pid) else {
                warn!(pid, packet_index, "Dropping continuation packet without a unit start");
                self.diagnostics
                    .push(Diagnostic::OrphanContinuation { pid, packet_index });
                return;
            };
            assembly.buf.extend_from_slice(&payload);
            assembly.last_index = packet_index;
        }

        let Some(assembly) = self.assemblies.get(&pid) else {
            return;
        };
        let size = assembly.buf.len();
        if assembly.target.is_section() && size > self.config.max_section_size {
            warn!(pid, packet_index, size, "Discarding oversized section buffer");
            self.assemblies.remove(&pid);
            self.diagnostics.push(Diagnostic::OversizedBuffer {
                pid,
                packet_index,
                size,
            });
            return;
        }
        if assembly.is_ready()
            && let Some(assembly) = self.assemblies.remove(&pid)
        {
            self.finalize(pid, assembly);
        }
    }

    /// Decode a completed unit. Failures become diagnostics.
    fn finalize(&mut self, pid: u16, assembly: Assembly) {
        let packet_index = assembly.start_index;
        let result = match assembly.target {
            Target::Pat => self.finalize_pat(pid, &assembly),
            Target::Pmt => self.finalize_pmt(pid, &assembly),
            Target::Splice { program_number } => {
                self.finalize_splice(pid, program_number, &assembly)
            }
            Target::Pes {
                program_number,
                stream_type,
            } => self.finalize_pes(pid, program_number, stream_type, assembly),
        };

        if let Err(e) = result {
            warn!(pid, packet_index, error = %e, "Dropping undecodable unit");
            self.diagnostics.push(Diagnostic::DecodeFailed {
                pid,
                packet_index,
                error: e.to_string(),
            });
        }
    }

    fn finalize_pat(&mut self, pid: u16, assembly: &Assembly) -> Result<()> {
        let pat = if self.config.validate_crc {
            Pat::parse_with_crc(&assembly.buf)?
        } else {
            Pat::parse(&assembly.buf)?
        };

        if let Some(current) = &self.pat {
            if current.version == pat.version {
                let old_crc = current.crc32;
                self.check_stale(pid, pat.version, old_crc, pat.crc32);
                return Ok(());
            }
            info!(pid, from = current.version, to = pat.version, "PAT version change");
            self.diagnostics.push(Diagnostic::VersionChanged {
                pid,
                from: current.version,
                to: pat.version,
            });
        }
        info!(
            pid,
            version = pat.version,
            programs = pat.program_map.len(),
            "PAT updated"
        );

        self.apply_pat(&pat);
        self.pat = Some(pat.clone());
        self.push_unit(
            DecodedUnit::Table(TableUnit {
                pid,
                packet_index: assembly.start_index,
                pcr: None,
                table: PsiTable::Pat(pat),
            }),
            None,
        );
        Ok(())
    }

    /// Replace the program list. Clocks and streams survive for programs
    /// whose PMT PID is unchanged; their PMT is reloaded. PIDs of removed
    /// programs are purged.
    fn apply_pat(&mut self, pat: &Pat) {
        let pmt_pids: HashMap<u16, u16> = pat
            .program_map
            .iter()
            .map(|(&program_number, &pmt_pid)| (pmt_pid, program_number))
            .collect();
        let old_pmt_pids = std::mem::replace(&mut self.pmt_pids, pmt_pids);

        self.programs
            .retain(|number, program| pat.pmt_pid(*number) == Some(program.pmt_pid));
        for program in self.programs.values_mut() {
            program.pmt = None;
        }

        let programs = &self.programs;
        let mut removed: Vec<u16> = old_pmt_pids
            .into_keys()
            .filter(|pid| !self.pmt_pids.contains_key(pid))
            .collect();
        removed.extend(
            self.streams
                .iter()
                .filter(|(_, stream)| !programs.contains_key(&stream.program_number))
                .map(|(&pid, _)| pid),
        );
        self.streams
            .retain(|_, stream| programs.contains_key(&stream.program_number));
        for pid in removed {
            if !self.pmt_pids.contains_key(&pid) && !self.streams.contains_key(&pid) {
                self.purge_pid(pid);
            }
        }

        let max_samples = self.config.max_pcr_samples;
        for (&program_number, &pmt_pid) in &pat.program_map {
            self.programs
                .entry(program_number)
                .or_insert_with(|| Program {
                    pmt_pid,
                    pmt: None,
                    clock: ProgramClock::new(max_samples),
                });
        }
    }

    fn finalize_pmt(&mut self, pid: u16, assembly: &Assembly) -> Result<()> {
        let pmt = if self.config.validate_crc {
            Pmt::parse_with_crc(&assembly.buf)?
        } else {
            Pmt::parse(&assembly.buf)?
        };
        let program_number = pmt.program_number;

        let Some(program) = self
            .programs
            .get(&program_number)
            .filter(|p| p.pmt_pid == pid)
        else {
            debug!(pid, program_number, "Ignoring PMT of a program not announced on this PID");
            return Ok(());
        };
        if let Some(current) = &program.pmt {
            if current.version == pmt.version {
                let (version, old_crc) = (current.version, current.crc32);
                self.check_stale(pid, version, old_crc, pmt.crc32);
                return Ok(());
            }
            info!(pid, program_number, from = current.version, to = pmt.version, "PMT version change");
            self.diagnostics.push(Diagnostic::VersionChanged {
                pid,
                from: current.version,
                to: pmt.version,
            });
        }

        let previous: Vec<u16> = self
            .streams
            .iter()
            .filter(|(_, stream)| stream.program_number == program_number)
            .map(|(&pid, _)| pid)
            .collect();
        self.streams
            .retain(|_, stream| stream.program_number != program_number);
        info!(
            pid,
            program_number,
            version = pmt.version,
            pcr_pid = pmt.pcr_pid,
            "PMT updated"
        );
        for stream in &pmt.streams {
            let kind = if stream.has_cue_marker() {
                StreamKind::Splice
            } else {
                self.registry.kind(stream.stream_type)
            };
            info!(
                program_number,
                pid = stream.pid,
                stream_type = stream.stream_type,
                description = self.registry.describe(stream.stream_type),
                ?kind,
                "Elementary stream"
            );
            self.streams.insert(
                stream.pid,
                StreamInfo {
                    program_number,
                    stream_type: stream.stream_type,
                    kind,
                },
            );
        }

        for pid in previous {
            if !self.streams.contains_key(&pid) && !self.pmt_pids.contains_key(&pid) {
                self.purge_pid(pid);
            }
        }

        if let Some(program) = self.programs.get_mut(&program_number) {
            program.pmt = Some(pmt.clone());
        }
        self.push_unit(
            DecodedUnit::Table(TableUnit {
                pid,
                packet_index: assembly.start_index,
                pcr: None,
                table: PsiTable::Pmt(pmt),
            }),
            Some(program_number),
        );
        Ok(())
    }

    /// Forget all state of a PID no table lists any more.
    fn purge_pid(&mut self, pid: u16) {
        if self.assemblies.remove(&pid).is_some() {
            debug!(pid, "Dropping partial unit of a removed stream");
        }
        self.continuity.forget(pid);
        for program in self.programs.values_mut() {
            program.clock.forget_stream(pid);
        }
    }

    fn check_stale(&mut self, pid: u16, version: u8, current_crc: u32, new_crc: u32) {
        if current_crc == new_crc {
            debug!(pid, version, "Table repeated");
            return;
        }
        warn!(pid, version, "Table content changed without a version change");
        self.diagnostics
            .push(Diagnostic::StaleVersion { pid, version });
    }

    fn finalize_splice(
        &mut self,
        pid: u16,
        program_number: u16,
        assembly: &Assembly,
    ) -> Result<()> {
        let section = if self.config.validate_crc {
            SpliceInfoSection::parse_with_crc(&assembly.buf)?
        } else {
            SpliceInfoSection::parse(&assembly.buf)?
        };

        let notification = SpliceNotification {
            pid,
            packet_index: assembly.start_index,
            command_type: section.command_type(),
            splice_pts: section.splice_pts(),
        };
        debug!(
            pid,
            packet_index = assembly.start_index,
            command = ?notification.command_type,
            splice_pts = ?notification.splice_pts,
            "SCTE-35 section"
        );
        for listener in &mut self.listeners {
            listener.on_splice(&notification);
        }

        self.push_unit(
            DecodedUnit::Table(TableUnit {
                pid,
                packet_index: assembly.start_index,
                pcr: None,
                table: PsiTable::Splice(section),
            }),
            Some(program_number),
        );
        Ok(())
    }

    fn finalize_pes(
        &mut self,
        pid: u16,
        program_number: u16,
        stream_type: u8,
        assembly: Assembly,
    ) -> Result<()> {
        let mut data = assembly.buf.freeze();
        if let Some(size) = expected_packet_size(&data)
            && size < data.len()
        {
            data.truncate(size);
        }
        let header = PesHeader::parse(&data)?;
        let payload = data.slice_ref(header.payload(&data));
        debug!(
            pid,
            packet_index = assembly.start_index,
            pts = ?header.pts(),
            size = payload.len(),
            "PES unit"
        );

        self.push_unit(
            DecodedUnit::Pes(PesUnit {
                pid,
                program_number,
                stream_type,
                start_index: assembly.start_index,
                end_index: assembly.last_index,
                header,
                random_access: assembly.random_access,
                pcr: None,
                delay: None,
                payload,
            }),
            Some(program_number),
        );
        Ok(())
    }

    fn push_unit(&mut self, unit: DecodedUnit, program_number: Option<u16>) {
        self.output.push_back(Pending {
            unit,
            program_number,
        });
    }

    /// Next decoded unit, stamped with the program clock at its start.
    ///
    /// PES units also get `delay = dts - pcr / 300` in 90 kHz ticks. Tables
    /// without a program use the first program's clock.
    pub fn fetch_unit(&mut self) -> Option<DecodedUnit> {
        let Pending {
            mut unit,
            program_number,
        } = self.output.pop_front()?;

        let program_number = program_number.or_else(|| self.programs.keys().next().copied());
        let Some(clock) = program_number
            .and_then(|number| self.programs.get_mut(&number))
            .map(|program| &mut program.clock)
        else {
            return Some(unit);
        };

        match &mut unit {
            DecodedUnit::Pes(pes) => {
                pes.pcr = clock
                    .request_pcr(Some(pes.pid), pes.start_index)
                    .map(|estimate| estimate.value);
                pes.delay = match (pes.dts(), pes.pcr) {
                    (Some(dts), Some(pcr)) => Some(dts as i64 - pcr / PCR_TICKS_PER_PTS),
                    _ => None,
                };
            }
            DecodedUnit::Table(table) => {
                table.pcr = clock
                    .pcr_at(table.packet_index)
                    .map(|estimate| estimate.value);
            }
            DecodedUnit::Passthrough(_) => {}
        }
        Some(unit)
    }

    /// Discard partial units and report per-PID statistics.
    ///
    /// Duration comes from the first program's clock over the delivered
    /// packet range. Queued units stay fetchable.
    pub fn end_of_stream(&mut self) -> StreamSummary {
        let discarded = self.assemblies.len();
        if discarded > 0 {
            warn!(discarded, "Discarding partial units at end of stream");
        }
        self.assemblies.clear();
        self.discarded_units += discarded;

        let duration = self.stream_duration();
        let summary = StreamSummary::new(
            &self.packet_counts,
            duration,
            self.discarded_units,
            self.continuity.issue_count(),
        );
        info!(
            packets = summary.total_packets,
            duration_secs = ?summary.duration_secs,
            discarded = summary.discarded_units,
            "End of stream"
        );
        summary
    }

    /// 27 MHz ticks spanned by the delivered packets.
    fn stream_duration(&mut self) -> Option<i64> {
        let (first, last) = (self.first_index?, self.last_index?);
        let clock = &mut self.programs.values_mut().next()?.clock;
        let start = clock.request_pcr(None, first)?.value;
        let end = clock.request_pcr(None, last + 1)?.value;
        Some(end - start)
    }
}

/// Whether `data` opens with a packet: a sync byte here and another one
/// packet later, unless the buffer ends before that.
fn packet_starts_at_head(data: &[u8]) -> bool {
    if data.first() != Some(&SYNC_BYTE) {
        return false;
    }
    match data.get(TS_PACKET_SIZE) {
        Some(&next) => next == SYNC_BYTE,
        None => true,
    }
}
