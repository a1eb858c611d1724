use crate::clock::DEFAULT_MAX_PCR_SAMPLES;
use crate::continuity::ContinuityMode;
use serde::{Deserialize, Serialize};

/// Largest PSI or SCTE-35 assembly buffer kept per PID.
pub const MAX_PSI_BUFFER_SIZE: usize = 64 * 1024;

/// What the demux pipe decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemuxMode {
    /// Tables, SCTE-35 and PES units.
    #[default]
    Full,
    /// Tables and SCTE-35; PES is never assembled but still feeds the clock.
    PsiOnly,
    /// Every clear packet is emitted verbatim.
    Passthrough,
}

/// Demux pipe settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemuxConfig {
    pub mode: DemuxMode,
    /// Verify CRC-32/MPEG-2 on PAT, PMT and SCTE-35 sections.
    pub validate_crc: bool,
    pub continuity_mode: ContinuityMode,
    /// Emit payloads of undecoded streams as passthrough units.
    pub emit_passthrough: bool,
    pub max_section_size: usize,
    pub max_pcr_samples: usize,
}

impl Default for DemuxConfig {
    fn default() -> Self {
        Self {
            mode: DemuxMode::Full,
            validate_crc: false,
            continuity_mode: ContinuityMode::Warn,
            emit_passthrough: false,
            max_section_size: MAX_PSI_BUFFER_SIZE,
            max_pcr_samples: DEFAULT_MAX_PCR_SAMPLES,
        }
    }
}
