use crate::bitstream::{BitCursor, BitWriter, hex_string};
use crate::{Result, TsError};
use serde::Serialize;

/// Registration descriptor (tag 0x05)
pub const TAG_REGISTRATION: u8 = 0x05;
/// ISO 639 language descriptor (tag 0x0A)
pub const TAG_ISO_639_LANGUAGE: u8 = 0x0A;
/// SCTE-35 cue identifier descriptor (tag 0x8A)
pub const TAG_CUE_IDENTIFIER: u8 = 0x8A;

/// Registration format identifier announcing SCTE-35 cue messages.
pub const CUEI_FORMAT_ID: [u8; 4] = *b"CUEI";

/// A PSI descriptor. `content` is the payload as space-separated hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Descriptor {
    pub tag: u8,
    pub content: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl Descriptor {
    pub fn new(tag: u8, data: Vec<u8>) -> Self {
        Descriptor {
            tag,
            content: hex_string(&data),
            data,
        }
    }

    /// Read one `[tag][length][payload]` descriptor.
    pub fn read(cursor: &mut BitCursor<'_>) -> Result<Self> {
        let tag = cursor.read_u8()?;
        let length = cursor.read_u8()? as usize;
        let data = cursor.read_bytes(length)?;
        Ok(Descriptor::new(tag, data))
    }

    pub fn write(&self, writer: &mut BitWriter) {
        writer.write_byte(self.tag);
        writer.write_byte(self.data.len() as u8);
        writer.write_bytes(&self.data);
    }

    /// Encoded size, tag and length bytes included.
    pub fn size(&self) -> usize {
        self.data.len() + 2
    }

    /// Format identifier of a registration descriptor.
    pub fn registration(&self) -> Option<[u8; 4]> {
        if self.tag != TAG_REGISTRATION {
            return None;
        }
        match self.data.get(..4) {
            Some(&[a, b, c, d]) => Some([a, b, c, d]),
            _ => None,
        }
    }

    /// Whether this descriptor marks the stream as carrying SCTE-35.
    pub fn is_cue_marker(&self) -> bool {
        self.tag == TAG_CUE_IDENTIFIER || self.registration() == Some(CUEI_FORMAT_ID)
    }

    /// Entries of an ISO 639 language descriptor.
    pub fn languages(&self) -> Vec<LanguageEntry> {
        if self.tag != TAG_ISO_639_LANGUAGE {
            return Vec::new();
        }
        self.data
            .chunks_exact(4)
            .map(|entry| LanguageEntry {
                language_code: [entry[0], entry[1], entry[2]],
                audio_type: entry[3],
            })
            .collect()
    }
}

/// A single ISO 639 language entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageEntry {
    /// 3-character ISO 639-2/T language code (e.g., b"eng", b"fra")
    pub language_code: [u8; 3],
    /// Audio type: 0=undefined, 1=clean effects, 2=hearing impaired, 3=visual impaired commentary
    pub audio_type: u8,
}

/// Read a descriptor loop of `loop_length` bytes.
///
/// Each descriptor is charged its size against the loop length, which must
/// land on exactly zero.
pub fn read_descriptor_loop(
    cursor: &mut BitCursor<'_>,
    loop_length: usize,
) -> Result<Vec<Descriptor>> {
    let mut remaining = loop_length as i64;
    let mut descriptors = Vec::new();
    while remaining > 0 {
        let descriptor = Descriptor::read(cursor)?;
        remaining -= descriptor.size() as i64;
        descriptors.push(descriptor);
    }
    if remaining != 0 {
        return Err(TsError::DescriptorLoopMismatch { remaining });
    }
    Ok(descriptors)
}

/// Total encoded size of a descriptor list.
pub fn descriptor_loop_size(descriptors: &[Descriptor]) -> usize {
    descriptors.iter().map(Descriptor::size).sum()
}
