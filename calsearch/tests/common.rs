//! Common utilities for calsearch tests
#![allow(dead_code)]

use calsearch::record::{
    sort_by_start, Arm, Binning, ExposureTiming, InstrumentMode, InstrumentSetup, MetadataRecord,
    ObservationType,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Blue-arm 437 nm setting with a 1 arcsec slit
pub fn blue_setup(encoder: i32) -> InstrumentSetup {
    InstrumentSetup {
        arm: Arm::Blue,
        binning: Binning::new(1, 1),
        slit_width: 1.0,
        encoder,
        central_wavelength: "437".to_string(),
        mode: InstrumentMode::Blue,
    }
}

/// Red-arm 580 nm setting with a 0.8 arcsec slit
pub fn red_setup(encoder: i32) -> InstrumentSetup {
    InstrumentSetup {
        arm: Arm::Red,
        binning: Binning::new(2, 2),
        slit_width: 0.8,
        encoder,
        central_wavelength: "580".to_string(),
        mode: InstrumentMode::Red,
    }
}

/// Bias frames carry the arm as their wavelength label and no mode
pub fn bias_setup_like(setup: &InstrumentSetup) -> InstrumentSetup {
    InstrumentSetup {
        arm: setup.arm,
        binning: setup.binning,
        slit_width: 0.0,
        encoder: 0,
        central_wavelength: setup.arm.label().to_string(),
        mode: InstrumentMode::NotApplicable,
    }
}

fn default_object(obs_type: ObservationType) -> &'static str {
    match obs_type {
        ObservationType::Bias => "bias",
        ObservationType::Flat | ObservationType::OrderDefinition => "flat",
        ObservationType::Wavelength | ObservationType::FormatCheck => "thar",
        ObservationType::Standard => "hd49798",
        ObservationType::Science => "target",
        ObservationType::Test => "test",
        ObservationType::Acquisition => "acq",
    }
}

/// Record occupying exactly `[start, end]`
pub fn spanning(
    obs_type: ObservationType,
    start: f64,
    end: f64,
    setup: InstrumentSetup,
) -> MetadataRecord {
    let mut record = MetadataRecord::new(
        format!("{}_{start:.5}.fits", obs_type.tag()),
        default_object(obs_type),
        obs_type,
        start,
        ExposureTiming::default(),
        setup,
    );
    record.mjd_end = end;
    record
}

/// Short (one minute) exposure starting at `start`
pub fn short(obs_type: ObservationType, start: f64, setup: InstrumentSetup) -> MetadataRecord {
    spanning(obs_type, start, start + 60.0 / 86_400.0, setup)
}

pub fn with_object(mut record: MetadataRecord, object: &str) -> MetadataRecord {
    record.object = object.to_string();
    record
}

/// Parameters for a synthetic multi-night observing run
#[derive(Debug, Clone)]
pub struct SyntheticRunConfig {
    pub nights: usize,
    pub science_per_night: usize,
    pub calibrations_per_block: usize,
    pub seed: u64,
}

impl Default for SyntheticRunConfig {
    fn default() -> Self {
        Self {
            nights: 3,
            science_per_night: 6,
            calibrations_per_block: 3,
            seed: 42,
        }
    }
}

fn push_exposure(
    rng: &mut ChaCha8Rng,
    records: &mut Vec<MetadataRecord>,
    obs_type: ObservationType,
    object: &str,
    start: f64,
    setup: &InstrumentSetup,
) {
    let mut setup = if obs_type == ObservationType::Bias {
        bias_setup_like(setup)
    } else {
        setup.clone()
    };
    if obs_type != ObservationType::Bias {
        setup.encoder = 1000 + rng.gen_range(0..3);
    }
    let exposure_s = match obs_type {
        ObservationType::Science => rng.gen_range(600.0..3600.0),
        ObservationType::Bias => 0.0,
        _ => rng.gen_range(1.0..60.0),
    };
    let timing = ExposureTiming::new(exposure_s, 40.0, rng.gen_range(10.0..50.0));
    records.push(MetadataRecord::new(
        format!("UVES.{start:.6}.fits"),
        object,
        obs_type,
        start,
        timing,
        setup,
    ));
}

/// Generate a sorted observing run.
///
/// Each night has an evening and a morning calibration block for both the
/// blue and red settings, science exposures on a handful of targets, some
/// standards, and wavelength frames attached to a few science exposures.
/// Encoder values vary so that wavelength tie-breaks are exercised.
pub fn synthetic_run(config: &SyntheticRunConfig) -> Vec<MetadataRecord> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let targets = ["qso0001", "qso0002", "ngc1399"];
    let settings = [blue_setup(0), red_setup(0)];
    let mut records = Vec::new();

    let calibration_types = [
        ObservationType::Bias,
        ObservationType::Flat,
        ObservationType::Wavelength,
        ObservationType::OrderDefinition,
        ObservationType::FormatCheck,
    ];

    for night in 0..config.nights {
        let base = 60_000.0 + night as f64;

        for block_start in [base - 0.2, base + 0.45] {
            for setup in &settings {
                for obs_type in calibration_types {
                    for _ in 0..config.calibrations_per_block {
                        let start = block_start + rng.gen_range(0.0..0.08);
                        push_exposure(
                            &mut rng,
                            &mut records,
                            obs_type,
                            default_object(obs_type),
                            start,
                            setup,
                        );
                    }
                }
            }
        }

        for _ in 0..config.science_per_night {
            let setup = &settings[rng.gen_range(0..settings.len())];
            let target = targets[rng.gen_range(0..targets.len())];
            let start = base + rng.gen_range(0.0..0.35);
            push_exposure(
                &mut rng,
                &mut records,
                ObservationType::Science,
                target,
                start,
                setup,
            );

            if rng.gen_bool(0.5) {
                let attached = start + rng.gen_range(0.02..0.06);
                push_exposure(
                    &mut rng,
                    &mut records,
                    ObservationType::Wavelength,
                    "thar",
                    attached,
                    setup,
                );
            }
        }

        for setup in &settings {
            let start = base + rng.gen_range(0.0..0.4);
            push_exposure(
                &mut rng,
                &mut records,
                ObservationType::Standard,
                "hd49798",
                start,
                setup,
            );
        }
    }

    sort_by_start(&mut records);
    records
}
