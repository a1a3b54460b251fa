//! Request opcodes understood by the remote-control server.
//!
//! Opcodes 0-15 drive acquisition and the four spectra. 16 and 17 are
//! read-only queries for the server's settings and version.

use std::fmt;

use serde::Serialize;

/// One of the histograms maintained by the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectrumKind {
    /// Start A, stop B.
    Ab,
    /// Start B, stop A.
    Ba,
    /// A-B and B-A combined.
    Merged,
    /// Prompt (coincidence) spectrum.
    Prompt,
}

impl SpectrumKind {
    /// All spectra, in opcode order.
    pub const ALL: [SpectrumKind; 4] = [
        SpectrumKind::Ab,
        SpectrumKind::Ba,
        SpectrumKind::Merged,
        SpectrumKind::Prompt,
    ];

    /// Display name as used by the instrument software.
    pub fn name(self) -> &'static str {
        match self {
            SpectrumKind::Ab => "AB",
            SpectrumKind::Ba => "BA",
            SpectrumKind::Merged => "merged",
            SpectrumKind::Prompt => "prompt",
        }
    }

    fn offset(self) -> u16 {
        match self {
            SpectrumKind::Ab => 0,
            SpectrumKind::Ba => 1,
            SpectrumKind::Merged => 2,
            SpectrumKind::Prompt => 3,
        }
    }
}

impl fmt::Display for SpectrumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a reset request clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResetTarget {
    /// All four spectra at once.
    All,
    /// A single spectrum.
    Spectrum(SpectrumKind),
}

impl fmt::Display for ResetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResetTarget::All => f.write_str("all"),
            ResetTarget::Spectrum(kind) => kind.fmt(f),
        }
    }
}

/// Numeric request code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Opcode {
    StartAcquisition = 0,
    StopAcquisition = 1,
    IsAcquisitionRunning = 2,
    ResetAllSpectra = 3,
    ResetAb = 4,
    ResetBa = 5,
    ResetMerged = 6,
    ResetPrompt = 7,
    DataAb = 8,
    DataBa = 9,
    DataMerged = 10,
    DataPrompt = 11,
    CountsAb = 12,
    CountsBa = 13,
    CountsMerged = 14,
    CountsPrompt = 15,
    Settings = 16,
    ServerVersion = 17,
}

impl Opcode {
    /// Every opcode, in numeric order.
    pub const ALL: [Opcode; 18] = [
        Opcode::StartAcquisition,
        Opcode::StopAcquisition,
        Opcode::IsAcquisitionRunning,
        Opcode::ResetAllSpectra,
        Opcode::ResetAb,
        Opcode::ResetBa,
        Opcode::ResetMerged,
        Opcode::ResetPrompt,
        Opcode::DataAb,
        Opcode::DataBa,
        Opcode::DataMerged,
        Opcode::DataPrompt,
        Opcode::CountsAb,
        Opcode::CountsBa,
        Opcode::CountsMerged,
        Opcode::CountsPrompt,
        Opcode::Settings,
        Opcode::ServerVersion,
    ];

    /// Wire value.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Look up an opcode by wire value.
    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Opcode that resets `target`.
    pub fn reset(target: ResetTarget) -> Self {
        match target {
            ResetTarget::All => Opcode::ResetAllSpectra,
            ResetTarget::Spectrum(kind) => Self::ALL[usize::from(4 + kind.offset())],
        }
    }

    /// Opcode that fetches the full histogram of `kind`.
    pub fn data(kind: SpectrumKind) -> Self {
        Self::ALL[usize::from(8 + kind.offset())]
    }

    /// Opcode that fetches the integral counts of `kind`.
    pub fn counts(kind: SpectrumKind) -> Self {
        Self::ALL[usize::from(12 + kind.offset())]
    }

    /// Short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Opcode::StartAcquisition => "start acquisition",
            Opcode::StopAcquisition => "stop acquisition",
            Opcode::IsAcquisitionRunning => "acquisition running?",
            Opcode::ResetAllSpectra => "reset all spectra",
            Opcode::ResetAb => "reset AB spectrum",
            Opcode::ResetBa => "reset BA spectrum",
            Opcode::ResetMerged => "reset merged spectrum",
            Opcode::ResetPrompt => "reset prompt spectrum",
            Opcode::DataAb => "data of AB spectrum",
            Opcode::DataBa => "data of BA spectrum",
            Opcode::DataMerged => "data of merged spectrum",
            Opcode::DataPrompt => "data of prompt spectrum",
            Opcode::CountsAb => "counts of AB spectrum",
            Opcode::CountsBa => "counts of BA spectrum",
            Opcode::CountsMerged => "counts of merged spectrum",
            Opcode::CountsPrompt => "counts of prompt spectrum",
            Opcode::Settings => "settings document",
            Opcode::ServerVersion => "server version",
        }
    }
}

impl TryFrom<u16> for Opcode {
    type Error = u16;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(code)
    }
}

impl From<Opcode> for u16 {
    fn from(opcode: Opcode) -> Self {
        opcode.code()
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code(), self.description())
    }
}
