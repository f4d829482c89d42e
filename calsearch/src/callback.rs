use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::kind::CalibrationKind;

const HOURS_PER_DAY: f64 = 24.0;

/// How loudly a condition should be presented downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// Non-fatal conditions raised while associating one science exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum Condition {
    /// No eligible candidates for a requested kind
    NotFound { requested: usize },
    /// Fewer eligible candidates than requested
    Underfilled { requested: usize, found: usize },
    /// Candidate and science time ranges overlap; midpoint distance used
    OverlapAnomaly {
        candidate_index: usize,
        candidate_span: (f64, f64),
        science_span: (f64, f64),
        dmjd: f64,
    },
    /// Second-nearest wavelength frame promoted for matching the grating encoder
    EncoderPreference {
        preferred_index: usize,
        preferred_dmjd: f64,
        passed_over_index: usize,
        passed_over_dmjd: f64,
    },
    /// Attached wavelength frame promoted ahead of nearer candidates
    AttachedPreference {
        preferred_index: usize,
        preferred_dmjd: f64,
        passed_over_index: usize,
        passed_over_dmjd: f64,
    },
}

impl Condition {
    pub fn severity(&self) -> Severity {
        match self {
            Condition::NotFound { .. }
            | Condition::Underfilled { .. }
            | Condition::OverlapAnomaly { .. } => Severity::Warning,
            Condition::EncoderPreference { .. } | Condition::AttachedPreference { .. } => {
                Severity::Info
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::NotFound { requested } => {
                write!(f, "none found in calibration period ({requested} requested)")
            }
            Condition::Underfilled { requested, found } => {
                write!(f, "{requested} requested but only {found} found")
            }
            Condition::OverlapAnomaly {
                candidate_index,
                candidate_span,
                science_span,
                dmjd,
            } => write!(
                f,
                "record {candidate_index} (MJD {:.6}-{:.6}) overlaps science exposure (MJD {:.6}-{:.6}); using midpoint separation {dmjd:.6} d",
                candidate_span.0, candidate_span.1, science_span.0, science_span.1
            ),
            Condition::EncoderPreference {
                preferred_index,
                preferred_dmjd,
                passed_over_index,
                passed_over_dmjd,
            } => write!(
                f,
                "selected record {preferred_index} ({:.3} h away) over record {passed_over_index} ({:.3} h away) because it shares the science grating encoder value",
                preferred_dmjd * HOURS_PER_DAY,
                passed_over_dmjd * HOURS_PER_DAY
            ),
            Condition::AttachedPreference {
                preferred_index,
                preferred_dmjd,
                passed_over_index,
                passed_over_dmjd,
            } => write!(
                f,
                "selected attached record {preferred_index} ({:.3} h after exposure) over nearest record {passed_over_index} ({:.3} h away)",
                preferred_dmjd * HOURS_PER_DAY,
                passed_over_dmjd * HOURS_PER_DAY
            ),
        }
    }
}

/// A condition tagged with where it was raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationEvent {
    pub kind: CalibrationKind,
    /// Record index of the science exposure being associated
    pub science_index: usize,
    pub severity: Severity,
    pub condition: Condition,
}

impl AssociationEvent {
    pub fn new(kind: CalibrationKind, science_index: usize, condition: Condition) -> Self {
        Self {
            kind,
            science_index,
            severity: condition.severity(),
            condition,
        }
    }

    /// Forward to the `log` facade at the event's severity
    pub fn log(&self) {
        match self.severity {
            Severity::Info => log::info!("{self}"),
            Severity::Warning => log::warn!("{self}"),
        }
    }
}

impl fmt::Display for AssociationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for science record {}: {}",
            self.kind, self.science_index, self.condition
        )
    }
}

/// Callback ID for registration/deregistration
pub type CallbackId = u64;

/// Callback function type
pub type AssociationCallback = Arc<dyn Fn(&AssociationEvent) + Send + Sync>;
