use serde::{Deserialize, Serialize};

use crate::error::AssociationError;
use crate::kind::{CalibrationKind, PerKind};

/// Maximum number of frames of any one kind associated with a science exposure
pub const NCALMAX: usize = 20;

/// Candidate capacity per unit of the largest quota
pub const CANDIDATE_BLOCKS: usize = 1000;

pub const DEFAULT_WINDOW_BACKWARD_HOURS: f64 = 12.0;
pub const DEFAULT_WINDOW_FORWARD_HOURS: f64 = 12.0;

const HOURS_PER_DAY: f64 = 24.0;

/// Default quotas: 5 biases, 5 flats, one each of wav/ord/fmt, no standards
pub fn default_quotas() -> PerKind<usize> {
    PerKind {
        bias: 5,
        flat: 5,
        wavelength: 1,
        order_definition: 1,
        format_check: 1,
        standard: 0,
    }
}

/// How the first wavelength frames are chosen among time-sorted candidates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WavelengthStrategy {
    /// Encoder tie-break between the two nearest candidates
    #[default]
    NearestPair,
    /// Promote the nearest encoder-matching frame taken within
    /// `attached_window_hours` after the science exposure ends, from anywhere
    /// in the candidate list; otherwise keep nearest-first order
    AttachedScan { attached_window_hours: f64 },
}

/// Policy as supplied by the caller, with every field optional.
///
/// Missing values and the legacy negative "unset" sentinels resolve to the
/// documented defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyRequest {
    pub window_backward_hours: Option<f64>,
    pub window_forward_hours: Option<f64>,
    pub bias: Option<i64>,
    pub flat: Option<i64>,
    pub wavelength: Option<i64>,
    pub order_definition: Option<i64>,
    pub format_check: Option<i64>,
    pub standard: Option<i64>,
    pub candidate_capacity: Option<usize>,
    pub wavelength_strategy: Option<WavelengthStrategy>,
}

impl PolicyRequest {
    fn requested_quota(&self, kind: CalibrationKind) -> Option<i64> {
        match kind {
            CalibrationKind::Bias => self.bias,
            CalibrationKind::Flat => self.flat,
            CalibrationKind::Wavelength => self.wavelength,
            CalibrationKind::OrderDefinition => self.order_definition,
            CalibrationKind::FormatCheck => self.format_check,
            CalibrationKind::Standard => self.standard,
        }
    }

    /// Resolve unset fields to defaults and validate the result
    pub fn resolve(&self) -> Result<AssociationPolicy, AssociationError> {
        let defaults = default_quotas();
        let quotas = PerKind::from_fn(|kind| match self.requested_quota(kind) {
            Some(n) if n >= 0 => n as usize,
            _ => *defaults.get(kind),
        });

        let backward = resolve_hours(self.window_backward_hours, DEFAULT_WINDOW_BACKWARD_HOURS);
        let forward = resolve_hours(self.window_forward_hours, DEFAULT_WINDOW_FORWARD_HOURS);

        let mut policy = AssociationPolicy::from_hours(backward, forward, quotas);
        if let Some(capacity) = self.candidate_capacity {
            policy.candidate_capacity = capacity;
        }
        if let Some(strategy) = self.wavelength_strategy {
            policy.wavelength_strategy = strategy;
        }

        policy.validate()?;
        Ok(policy)
    }
}

fn resolve_hours(requested: Option<f64>, default: f64) -> f64 {
    match requested {
        Some(hours) if hours < 0.0 => default,
        Some(hours) => hours,
        None => default,
    }
}

/// Resolved configuration for one association run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationPolicy {
    /// Search window before the science start (days)
    pub window_backward_days: f64,
    /// Search window after the science start (days)
    pub window_forward_days: f64,
    /// Requested number of frames per kind
    pub quotas: PerKind<usize>,
    /// Upper bound on eligible candidates for one kind and one science exposure
    pub candidate_capacity: usize,
    pub wavelength_strategy: WavelengthStrategy,
}

impl Default for AssociationPolicy {
    fn default() -> Self {
        Self::from_hours(
            DEFAULT_WINDOW_BACKWARD_HOURS,
            DEFAULT_WINDOW_FORWARD_HOURS,
            default_quotas(),
        )
    }
}

impl AssociationPolicy {
    /// Build a policy from windows in hours; capacity follows the largest quota
    pub fn from_hours(backward_hours: f64, forward_hours: f64, quotas: PerKind<usize>) -> Self {
        let candidate_capacity = CANDIDATE_BLOCKS * quotas.largest().max(1);
        Self {
            window_backward_days: backward_hours / HOURS_PER_DAY,
            window_forward_days: forward_hours / HOURS_PER_DAY,
            quotas,
            candidate_capacity,
            wavelength_strategy: WavelengthStrategy::default(),
        }
    }

    /// Parse a [`PolicyRequest`] from JSON and resolve it
    pub fn from_json(json: &str) -> Result<Self, AssociationError> {
        let request: PolicyRequest = serde_json::from_str(json)?;
        request.resolve()
    }

    pub fn quota(&self, kind: CalibrationKind) -> usize {
        *self.quotas.get(kind)
    }

    /// Check the policy before any association work starts
    pub fn validate(&self) -> Result<(), AssociationError> {
        for (name, days) in [
            ("backward", self.window_backward_days),
            ("forward", self.window_forward_days),
        ] {
            // Inclusion is strict, so a zero-width window can never hold a candidate
            if !days.is_finite() || days <= 0.0 {
                return Err(AssociationError::InvalidPolicy(format!(
                    "{name} search window must be a finite positive duration, got {days} days"
                )));
            }
        }

        for (kind, quota) in self.quotas.iter() {
            if *quota > NCALMAX {
                return Err(AssociationError::InvalidPolicy(format!(
                    "{quota} {kind} frames requested, at most {NCALMAX} allowed"
                )));
            }
        }

        let largest = self.quotas.largest();
        if self.candidate_capacity < largest {
            return Err(AssociationError::InvalidPolicy(format!(
                "candidate capacity {} is smaller than the largest quota {largest}",
                self.candidate_capacity
            )));
        }

        if let WavelengthStrategy::AttachedScan {
            attached_window_hours,
        } = self.wavelength_strategy
        {
            let attached_days = attached_window_hours / HOURS_PER_DAY;
            if !attached_days.is_finite()
                || attached_days <= 0.0
                || attached_days > self.window_forward_days
            {
                return Err(AssociationError::InvalidPolicy(format!(
                    "attached window of {attached_window_hours} h must be positive and within the forward search window"
                )));
            }
        }

        if self.quota(CalibrationKind::Standard) > 1 {
            log::warn!(
                "{} standards requested per science exposure; all are selected but only the first is named as the exposure's standard",
                self.quota(CalibrationKind::Standard)
            );
        }

        Ok(())
    }

    /// Attached window in days, when the attached-scan strategy is selected
    pub fn attached_window_days(&self) -> Option<f64> {
        match self.wavelength_strategy {
            WavelengthStrategy::NearestPair => None,
            WavelengthStrategy::AttachedScan {
                attached_window_hours,
            } => Some(attached_window_hours / HOURS_PER_DAY),
        }
    }
}
