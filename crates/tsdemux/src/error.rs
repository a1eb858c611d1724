//! Error types for transport stream demultiplexing.

use thiserror::Error;

/// Errors that can occur while decoding or demultiplexing a transport stream.
#[derive(Error, Debug)]
pub enum TsError {
    /// A read requested more bits than remain in the buffer.
    #[error("out of bounds: requested {requested} bits, {available} available")]
    OutOfBounds {
        /// Number of bits requested.
        requested: usize,
        /// Number of bits left in the buffer.
        available: usize,
    },

    /// A single read or write wider than 64 bits.
    #[error("invalid bit width: {0}")]
    InvalidBitWidth(usize),

    /// `restore_marker` was called without a preceding `set_marker`.
    #[error("bit cursor marker is not set")]
    MarkerNotSet,

    #[error("invalid packet size: {0}")]
    InvalidPacketSize(usize),

    #[error("sync byte mismatch: expected 0x47, got 0x{0:02X}")]
    SyncByteMismatch(u8),

    #[error("insufficient data: expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    #[error("invalid table id: expected 0x{expected:02X}, got 0x{actual:02X}")]
    InvalidTableId { expected: u8, actual: u8 },

    /// A fixed-value field did not hold its mandated value.
    #[error("{field}: expected {expected:#b}, got {actual:#b}")]
    ReservedBits {
        field: &'static str,
        expected: u64,
        actual: u64,
    },

    #[error("invalid section length: {0}")]
    InvalidSectionLength(u16),

    /// A descriptor loop did not consume exactly its declared length.
    #[error("descriptor loop ended with {remaining} bytes unaccounted")]
    DescriptorLoopMismatch { remaining: i64 },

    #[error("CRC-32 mismatch: expected 0x{expected:08X}, calculated 0x{calculated:08X}")]
    Crc32Mismatch { expected: u32, calculated: u32 },

    #[error("invalid PES start code")]
    InvalidPesStartCode,

    #[error("invalid PES optional header marker: {0:#04b}")]
    InvalidPesMarker(u8),

    #[error("forbidden PTS/DTS flags: {0:#04b}")]
    InvalidPtsDtsFlags(u8),

    #[error("{field} sync nibble mismatch: expected {expected:#06b}, got {actual:#06b}")]
    TimestampSyncMismatch {
        field: &'static str,
        expected: u8,
        actual: u8,
    },

    /// Optional PES fields consumed more bytes than `PES_header_data_length`.
    #[error("PES optional fields overrun header length {header_length}")]
    PesHeaderOverrun { header_length: u8 },

    #[error("PES packet length {declared} shorter than optional header {header}")]
    InvalidPesLength { declared: usize, header: usize },

    #[error("invalid SCTE-35 section: {0}")]
    InvalidScte35(String),

    #[error("unsupported splice command type: 0x{0:02X}")]
    UnsupportedSpliceCommand(u8),

    #[error("continuity error on PID {pid}: expected {expected}, got {actual}")]
    ContinuityError { pid: u16, expected: u8, actual: u8 },

    #[error("duplicate packet on PID {pid} with CC {cc}")]
    DuplicatePacket { pid: u16, cc: u8 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
