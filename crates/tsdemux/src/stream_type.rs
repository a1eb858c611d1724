//! Stream type names and routing classes.

use crate::scte35::SCTE35_STREAM_TYPE;
use serde::Serialize;

/// How the demux pipe handles a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StreamKind {
    /// Assembled as PES.
    Video,
    /// Assembled as PES.
    Audio,
    /// Assembled as SCTE-35 sections.
    Splice,
    /// Not decoded.
    Other,
}

impl StreamKind {
    pub fn is_pes(&self) -> bool {
        matches!(self, StreamKind::Video | StreamKind::Audio)
    }

    /// Classify a description by its last word.
    pub fn from_description(description: &str) -> Self {
        match description.rsplit(' ').next() {
            Some("video") => StreamKind::Video,
            Some("audio") => StreamKind::Audio,
            _ => StreamKind::Other,
        }
    }
}

/// Lookup of human-readable stream type descriptions.
pub trait StreamTypeRegistry: Send + Sync {
    fn describe(&self, stream_type: u8) -> &str;

    fn kind(&self, stream_type: u8) -> StreamKind {
        if stream_type == SCTE35_STREAM_TYPE {
            return StreamKind::Splice;
        }
        StreamKind::from_description(self.describe(stream_type))
    }
}

/// ISO/IEC 13818-1 and common ATSC/Blu-ray assignments.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardStreamTypes;

impl StandardStreamTypes {
    pub const fn name(stream_type: u8) -> &'static str {
        match stream_type {
            0x00 => "Reserved",
            0x01 => "MPEG 1 video",
            0x02 => "MPEG 2 video",
            0x03 => "MPEG 1 audio",
            0x04 => "MPEG 2 audio",
            0x05 => "MPEG 2 table data",
            0x06 => "(AC-3/ DVB subtitle) packetized data for MPEG-2",
            0x07 => "MHEG",
            0x08 => "DSM CC",
            0x09 => "H.222 and ISO/IEC 13818-1'11172-1 auxiliary data",
            0x0A => "DSM CC multiprotocol encapsulation",
            0x0B => "DSM CC U-N messages",
            0x0C => "DSM CC stream descriptors",
            0x0D => "DSM CC tabled data",
            0x0E => "13818-1 auxiliary data",
            0x0F => "ADTS AAC audio",
            0x10 => "MPEG-4 H.263 based video",
            0x11 => "MPEG-4 LOAD multi-format framed audio",
            0x12 => "MPEG-4 FlexMux in a packetized stream",
            0x13 => "MPEG-4 FlexMux in ISO/IEC 14496 tables",
            0x14 => "DSM CC synchronized download protocol",
            0x15 => "Packetized metadata",
            0x16 => "Sectioned metadata",
            0x17 => "DSM CC Data Carousel metadata",
            0x18 => "DSM CC Object Carousel metadata",
            0x19 => "Synchronized download protocol metadata",
            0x1A => "IPMP",
            0x1B => "H.264 video",
            0x1C => "MPEG-4 raw audio",
            0x1D => "MPEG-4 text data",
            0x1E => "MPEG-4 auxiliary video",
            0x1F | 0x20 => "MPEG-4 AVC video",
            0x21 => "JPEG 2000 video",
            0x22 | 0x23 => "Reserved",
            0x24 => "H.265 UHD video",
            0x25..=0x7E => "Reserved",
            0x7F => "IPMP (DRM)",
            0x80 => "H.262 DigiCipher II",
            0x81 => "(ATSC and Bluray) AC-3 audio",
            0x82 => "SCTE subtitle data",
            0x83 => "(Bluray) Dolby TrueHD loseless audio",
            0x84 => "(Bluray) Dolby Digital Plus audio",
            0x85 => "(Bluray) DTS 8 channel audio",
            0x86 => "SCTE-35 DPI data",
            0x87 => "E-AC-3 audio",
            0x88..=0x8F => "Private",
            0x90 => "(Bluray) presentation graphic data",
            0x91 => "ATSC DSM CC network resources table data",
            0x92 => "N/A",
            _ => "User private",
        }
    }
}

impl StreamTypeRegistry for StandardStreamTypes {
    fn describe(&self, stream_type: u8) -> &str {
        Self::name(stream_type)
    }
}
