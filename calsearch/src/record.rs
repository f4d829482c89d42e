//! Exposure metadata consumed by the association engine.
//!
//! One [`MetadataRecord`] exists per exposure file. Records are produced by the
//! header ingestion step and are read-only from the engine's point of view; the
//! position of a record in the run's collection is its identity everywhere
//! downstream.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::kind::CalibrationKind;

/// Seconds in one day, for converting exposure durations to MJD offsets
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Spectrograph arm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    Blue,
    Red,
}

impl Arm {
    pub fn label(&self) -> &'static str {
        match self {
            Arm::Blue => "blue",
            Arm::Red => "red",
        }
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Instrument mode label (dichroic or single-arm)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentMode {
    #[serde(rename = "dic")]
    Dichroic,
    #[serde(rename = "blue")]
    Blue,
    #[serde(rename = "red")]
    Red,
    /// Not applicable (bias frames)
    #[serde(rename = "NA")]
    NotApplicable,
}

impl InstrumentMode {
    pub fn label(&self) -> &'static str {
        match self {
            InstrumentMode::Dichroic => "dic",
            InstrumentMode::Blue => "blue",
            InstrumentMode::Red => "red",
            InstrumentMode::NotApplicable => "NA",
        }
    }
}

/// CCD on-chip binning factors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binning {
    pub x: u32,
    pub y: u32,
}

impl Binning {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Binning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.x, self.y)
    }
}

/// Observation category assigned during ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    Science,
    Bias,
    Flat,
    Wavelength,
    OrderDefinition,
    FormatCheck,
    Standard,
    /// Engineering test exposure, never associated
    Test,
    /// Target acquisition image, never associated
    Acquisition,
}

impl ObservationType {
    /// Type tag used in link file names (`sci`, `cal`, `wav`, ...)
    ///
    /// Bias and flat frames share the `cal` tag; their object name
    /// (`bias`/`flat`) disambiguates them.
    pub fn tag(&self) -> &'static str {
        match self {
            ObservationType::Science => "sci",
            ObservationType::Bias | ObservationType::Flat => "cal",
            ObservationType::Wavelength => "wav",
            ObservationType::OrderDefinition => "ord",
            ObservationType::FormatCheck => "fmt",
            ObservationType::Standard => "std",
            ObservationType::Test => "tst",
            ObservationType::Acquisition => "aqu",
        }
    }

    /// Calibration kind this observation can serve as, if any
    pub fn calibration_kind(&self) -> Option<CalibrationKind> {
        match self {
            ObservationType::Bias => Some(CalibrationKind::Bias),
            ObservationType::Flat => Some(CalibrationKind::Flat),
            ObservationType::Wavelength => Some(CalibrationKind::Wavelength),
            ObservationType::OrderDefinition => Some(CalibrationKind::OrderDefinition),
            ObservationType::FormatCheck => Some(CalibrationKind::FormatCheck),
            ObservationType::Standard => Some(CalibrationKind::Standard),
            ObservationType::Science | ObservationType::Test | ObservationType::Acquisition => {
                None
            }
        }
    }
}

/// Exposure and detector timing, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExposureTiming {
    pub exposure_s: f64,
    pub readout_s: f64,
    pub transfer_s: f64,
}

impl ExposureTiming {
    pub fn new(exposure_s: f64, readout_s: f64, transfer_s: f64) -> Self {
        Self {
            exposure_s,
            readout_s,
            transfer_s,
        }
    }

    /// Time the detector is busy: exposure plus the longer of readout and transfer
    pub fn occupied_seconds(&self) -> f64 {
        self.exposure_s + self.readout_s.max(self.transfer_s)
    }

    /// MJD at which an exposure started at `start_mjd` releases the detector
    pub fn end_mjd(&self, start_mjd: f64) -> f64 {
        start_mjd + self.occupied_seconds() / SECONDS_PER_DAY
    }
}

/// Instrument configuration shared by exposures taken in the same setting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstrumentSetup {
    pub arm: Arm,
    pub binning: Binning,
    /// Slit width in arcseconds (0 for bias frames)
    pub slit_width: f64,
    /// Grating encoder position
    pub encoder: i32,
    /// Central-wavelength band label, compared as a string
    pub central_wavelength: String,
    pub mode: InstrumentMode,
}

impl fmt::Display for InstrumentSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} arm, cwl {}, mode {}, binning {}, slit {:.1}\", encoder {}",
            self.arm,
            self.central_wavelength,
            self.mode.label(),
            self.binning,
            self.slit_width,
            self.encoder
        )
    }
}

/// Header facts for one exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Source file name, used only for messages and naming
    pub file: String,
    /// Canonicalised object name (`bias`, `flat`, `thar`, or a target name)
    pub object: String,
    pub obs_type: ObservationType,
    /// Start time (MJD)
    pub mjd: f64,
    /// End of exposure plus readout/transfer (MJD)
    pub mjd_end: f64,
    pub setup: InstrumentSetup,
}

impl MetadataRecord {
    /// Create a record, deriving the end time from the exposure timing
    pub fn new(
        file: impl Into<String>,
        object: impl Into<String>,
        obs_type: ObservationType,
        mjd: f64,
        timing: ExposureTiming,
        setup: InstrumentSetup,
    ) -> Self {
        Self {
            file: file.into(),
            object: object.into(),
            obs_type,
            mjd,
            mjd_end: timing.end_mjd(mjd),
            setup,
        }
    }

    pub fn is_science(&self) -> bool {
        self.obs_type == ObservationType::Science
    }

    /// Start and end MJD
    pub fn span(&self) -> (f64, f64) {
        (self.mjd, self.mjd_end)
    }

    /// Midpoint of the occupied interval
    pub fn midpoint(&self) -> f64 {
        0.5 * (self.mjd + self.mjd_end)
    }
}

/// Stable sort of records by ascending start time.
///
/// Records with equal start times keep their relative order.
pub fn sort_by_start(records: &mut [MetadataRecord]) {
    records.sort_by(|a, b| a.mjd.total_cmp(&b.mjd));
}

/// Index of the first record that starts before its predecessor
pub fn first_out_of_order(records: &[MetadataRecord]) -> Option<usize> {
    records
        .windows(2)
        .position(|pair| pair[1].mjd < pair[0].mjd)
        .map(|i| i + 1)
}
