//! Calibration candidate eligibility
//!
//! This module decides whether a calibration record may serve a given science
//! record. Every kind shares the strict time window; the per-kind setup
//! constraints are data in [`KindRules`] rather than separate code paths.

use crate::config::AssociationPolicy;
use crate::distance::DistanceMetric;
use crate::kind::CalibrationKind;
use crate::record::MetadataRecord;

/// Setup constraints and ranking metric for one calibration kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindRules {
    pub kind: CalibrationKind,
    pub same_arm: bool,
    pub same_central_wavelength: bool,
    pub same_mode: bool,
    pub same_binning: bool,
    pub same_slit_width: bool,
    pub metric: DistanceMetric,
}

impl KindRules {
    pub const fn for_kind(kind: CalibrationKind) -> Self {
        // Bias frames carry no grating setting; every other kind must match
        // the science setting (wavelength label and mode).
        let setting = !matches!(kind, CalibrationKind::Bias);
        Self {
            kind,
            same_arm: matches!(kind, CalibrationKind::Bias),
            same_central_wavelength: setting,
            same_mode: setting,
            same_binning: true,
            same_slit_width: matches!(kind, CalibrationKind::Flat | CalibrationKind::Wavelength),
            metric: match kind {
                CalibrationKind::Standard => DistanceMetric::Start,
                _ => DistanceMetric::Interval,
            },
        }
    }
}

/// Whether `candidate` was recorded as a frame of `kind`
pub fn is_of_kind(kind: CalibrationKind, candidate: &MetadataRecord) -> bool {
    candidate.obs_type.calibration_kind() == Some(kind)
}

/// Strict search window around the science start time.
///
/// Candidates starting exactly on either window edge are excluded.
pub fn is_within_window(
    science: &MetadataRecord,
    candidate: &MetadataRecord,
    policy: &AssociationPolicy,
) -> bool {
    candidate.mjd > science.mjd - policy.window_backward_days
        && candidate.mjd < science.mjd + policy.window_forward_days
}

/// Instrument setup compatibility under the kind's rules
pub fn matches_setup(rules: &KindRules, science: &MetadataRecord, candidate: &MetadataRecord) -> bool {
    let sci = &science.setup;
    let cal = &candidate.setup;

    (!rules.same_arm || cal.arm == sci.arm)
        && (!rules.same_central_wavelength || cal.central_wavelength == sci.central_wavelength)
        && (!rules.same_mode || cal.mode == sci.mode)
        && (!rules.same_binning || cal.binning == sci.binning)
        && (!rules.same_slit_width || cal.slit_width == sci.slit_width)
}

/// Full eligibility test for one candidate against one science record
pub fn is_eligible(
    rules: &KindRules,
    science_index: usize,
    science: &MetadataRecord,
    candidate_index: usize,
    candidate: &MetadataRecord,
    policy: &AssociationPolicy,
) -> bool {
    candidate_index != science_index
        && is_of_kind(rules.kind, candidate)
        && is_within_window(science, candidate, policy)
        && matches_setup(rules, science, candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        Arm, Binning, ExposureTiming, InstrumentMode, InstrumentSetup, ObservationType,
    };

    fn red_setup() -> InstrumentSetup {
        InstrumentSetup {
            arm: Arm::Red,
            binning: Binning::new(2, 2),
            slit_width: 0.8,
            encoder: 42,
            central_wavelength: "580".to_string(),
            mode: InstrumentMode::Red,
        }
    }

    fn record(obs_type: ObservationType, mjd: f64, setup: InstrumentSetup) -> MetadataRecord {
        MetadataRecord::new(
            "f.fits",
            "obj",
            obs_type,
            mjd,
            ExposureTiming::default(),
            setup,
        )
    }

    fn bias_setup(arm: Arm) -> InstrumentSetup {
        InstrumentSetup {
            arm,
            binning: Binning::new(2, 2),
            slit_width: 0.0,
            encoder: 0,
            central_wavelength: arm.label().to_string(),
            mode: InstrumentMode::NotApplicable,
        }
    }

    #[test]
    fn test_rule_table() {
        let bias = KindRules::for_kind(CalibrationKind::Bias);
        assert!(bias.same_arm && bias.same_binning);
        assert!(!bias.same_central_wavelength && !bias.same_mode && !bias.same_slit_width);

        for kind in [CalibrationKind::Flat, CalibrationKind::Wavelength] {
            let rules = KindRules::for_kind(kind);
            assert!(rules.same_central_wavelength && rules.same_mode);
            assert!(rules.same_binning && rules.same_slit_width);
            assert!(!rules.same_arm);
            assert_eq!(rules.metric, DistanceMetric::Interval);
        }

        for kind in [
            CalibrationKind::OrderDefinition,
            CalibrationKind::FormatCheck,
            CalibrationKind::Standard,
        ] {
            let rules = KindRules::for_kind(kind);
            assert!(rules.same_central_wavelength && rules.same_mode && rules.same_binning);
            assert!(!rules.same_slit_width);
        }

        assert_eq!(
            KindRules::for_kind(CalibrationKind::Standard).metric,
            DistanceMetric::Start
        );
    }

    #[test]
    fn test_window_is_strict() {
        let policy = AssociationPolicy::default();
        let science = record(ObservationType::Science, 100.0, red_setup());

        let on_back_edge = record(ObservationType::Flat, 99.5, red_setup());
        let on_front_edge = record(ObservationType::Flat, 100.5, red_setup());
        let inside = record(ObservationType::Flat, 100.49, red_setup());

        assert!(!is_within_window(&science, &on_back_edge, &policy));
        assert!(!is_within_window(&science, &on_front_edge, &policy));
        assert!(is_within_window(&science, &inside, &policy));
    }

    #[test]
    fn test_bias_matches_arm_and_binning_only() {
        let rules = KindRules::for_kind(CalibrationKind::Bias);
        let science = record(ObservationType::Science, 100.0, red_setup());

        let red_bias = record(ObservationType::Bias, 99.9, bias_setup(Arm::Red));
        let blue_bias = record(ObservationType::Bias, 99.9, bias_setup(Arm::Blue));
        let mut binned_bias = red_bias.clone();
        binned_bias.setup.binning = Binning::new(1, 1);

        assert!(matches_setup(&rules, &science, &red_bias));
        assert!(!matches_setup(&rules, &science, &blue_bias));
        assert!(!matches_setup(&rules, &science, &binned_bias));
    }

    #[test]
    fn test_slit_width_only_constrains_flat_and_wavelength() {
        let science = record(ObservationType::Science, 100.0, red_setup());
        let mut wide = red_setup();
        wide.slit_width = 1.2;

        let flat = record(ObservationType::Flat, 99.9, wide.clone());
        let ord = record(ObservationType::OrderDefinition, 99.9, wide.clone());
        let wav = record(ObservationType::Wavelength, 99.9, wide);

        assert!(!matches_setup(
            &KindRules::for_kind(CalibrationKind::Flat),
            &science,
            &flat
        ));
        assert!(!matches_setup(
            &KindRules::for_kind(CalibrationKind::Wavelength),
            &science,
            &wav
        ));
        assert!(matches_setup(
            &KindRules::for_kind(CalibrationKind::OrderDefinition),
            &science,
            &ord
        ));
    }

    #[test]
    fn test_mode_and_wavelength_label_must_match() {
        let rules = KindRules::for_kind(CalibrationKind::FormatCheck);
        let science = record(ObservationType::Science, 100.0, red_setup());

        let mut dichroic = red_setup();
        dichroic.mode = InstrumentMode::Dichroic;
        let mut other_setting = red_setup();
        other_setting.central_wavelength = "860".to_string();

        assert!(!matches_setup(
            &rules,
            &science,
            &record(ObservationType::FormatCheck, 99.9, dichroic)
        ));
        assert!(!matches_setup(
            &rules,
            &science,
            &record(ObservationType::FormatCheck, 99.9, other_setting)
        ));
    }

    #[test]
    fn test_record_never_serves_itself() {
        let rules = KindRules::for_kind(CalibrationKind::Standard);
        let policy = AssociationPolicy::default();
        let standard = record(ObservationType::Standard, 100.0, red_setup());
        let science = record(ObservationType::Science, 100.0, red_setup());

        assert!(!is_eligible(&rules, 3, &standard, 3, &standard, &policy));
        assert!(is_eligible(&rules, 0, &science, 3, &standard, &policy));
        assert!(!is_eligible(&rules, 3, &standard, 0, &science, &policy));

        let later = record(ObservationType::Standard, 100.1, red_setup());
        assert!(is_eligible(&rules, 0, &science, 1, &later, &policy));
    }
}
