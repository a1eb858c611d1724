//! MPEG-2 Transport Stream demultiplexer.
//!
//! Packets are fed one at a time (or as a contiguous chunk) into a
//! [`DemuxPipe`], which tracks the PAT and PMTs, reassembles PES packets and
//! SCTE-35 sections, and keeps a per-program clock from PCR samples so that
//! every emitted unit can be stamped with the system clock at its start.

pub mod adaptation_field;
pub mod bitstream;
pub mod clock;
pub mod config;
pub mod continuity;
pub mod crc32;
pub mod demux;
pub mod descriptor;
pub mod error;
pub mod packet;
pub mod pat;
pub mod pes;
pub mod pmt;
pub mod psi;
pub mod scte35;
pub mod stream_type;
pub mod summary;
pub mod unit;

#[cfg(test)]
mod test_util;

pub use adaptation_field::{AdaptationField, Pcr};
pub use bitstream::{BitCursor, BitWriter};
pub use clock::{EstimateKind, PcrEstimate, ProgramClock};
pub use config::{DemuxConfig, DemuxMode};
pub use continuity::{ContinuityMode, ContinuityStatus, ContinuityTracker};
pub use crc32::{mpeg2_crc32, validate_section_crc32};
pub use demux::{DemuxPipe, Diagnostic, SpliceListener, SpliceNotification, StreamInfo};
pub use descriptor::{Descriptor, LanguageEntry};
pub use error::TsError;
pub use packet::{PID_CAT, PID_NULL, PID_PAT, TS_PACKET_SIZE, TsHeader, TsPacket};
pub use pat::Pat;
pub use pes::PesHeader;
pub use pmt::{Pmt, PmtStream};
pub use scte35::{
    BreakDuration, SpliceCommand, SpliceCommandType, SpliceDescriptor, SpliceEvent,
    SpliceInfoSection, TimeSignal,
};
pub use stream_type::{StandardStreamTypes, StreamKind, StreamTypeRegistry};
pub use summary::{PidStats, StreamSummary};
pub use unit::{DecodedUnit, PassthroughUnit, PesUnit, PsiTable, TableUnit};

/// Result type for demultiplexing operations
pub type Result<T> = std::result::Result<T, TsError>;
