//! Temporal distance between a science exposure and a calibration candidate.

use crate::record::MetadataRecord;

/// Which distance metric a calibration kind is ranked by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Gap between occupied intervals, midpoint separation on overlap
    Interval,
    /// Absolute difference of start times
    Start,
}

/// Distance in days, flagged when the intervals overlap
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    Separated(f64),
    /// Intervals overlap; value is the midpoint separation
    Overlapping(f64),
}

impl Distance {
    pub fn days(&self) -> f64 {
        match self {
            Distance::Separated(d) | Distance::Overlapping(d) => *d,
        }
    }

    pub fn is_overlap(&self) -> bool {
        matches!(self, Distance::Overlapping(_))
    }
}

/// Gap between the candidate and science intervals.
///
/// A candidate that ends before the science exposure starts is measured from
/// its end; one that starts after the science exposure ends is measured from
/// its start. Anything else overlaps and falls back to midpoint separation.
pub fn interval_distance(science: &MetadataRecord, candidate: &MetadataRecord) -> Distance {
    if candidate.mjd_end < science.mjd {
        Distance::Separated(science.mjd - candidate.mjd_end)
    } else if candidate.mjd > science.mjd_end {
        Distance::Separated(candidate.mjd - science.mjd_end)
    } else {
        Distance::Overlapping((candidate.midpoint() - science.midpoint()).abs())
    }
}

/// Absolute start-time difference; never reports overlap
pub fn start_distance(science: &MetadataRecord, candidate: &MetadataRecord) -> Distance {
    Distance::Separated((candidate.mjd - science.mjd).abs())
}

pub fn distance(
    metric: DistanceMetric,
    science: &MetadataRecord,
    candidate: &MetadataRecord,
) -> Distance {
    match metric {
        DistanceMetric::Interval => interval_distance(science, candidate),
        DistanceMetric::Start => start_distance(science, candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{
        Arm, Binning, ExposureTiming, InstrumentMode, InstrumentSetup, ObservationType,
    };
    use approx::assert_relative_eq;

    fn spanning(obs_type: ObservationType, start: f64, end: f64) -> MetadataRecord {
        let mut record = MetadataRecord::new(
            "f.fits",
            "obj",
            obs_type,
            start,
            ExposureTiming::default(),
            InstrumentSetup {
                arm: Arm::Blue,
                binning: Binning::new(1, 1),
                slit_width: 1.0,
                encoder: 0,
                central_wavelength: "437".to_string(),
                mode: InstrumentMode::Blue,
            },
        );
        record.mjd_end = end;
        record
    }

    #[test]
    fn test_candidate_before_science() {
        let science = spanning(ObservationType::Science, 100.0, 100.1);
        let bias = spanning(ObservationType::Bias, 99.5, 99.6);
        let d = interval_distance(&science, &bias);
        assert!(!d.is_overlap());
        assert_relative_eq!(d.days(), 0.4, epsilon = 1e-9);
    }

    #[test]
    fn test_candidate_after_science() {
        let science = spanning(ObservationType::Science, 100.0, 100.1);
        let flat = spanning(ObservationType::Flat, 100.3, 100.31);
        let d = interval_distance(&science, &flat);
        assert!(!d.is_overlap());
        assert_relative_eq!(d.days(), 0.2, epsilon = 1e-9);
    }

    #[test]
    fn test_nested_candidate_uses_midpoints() {
        let science = spanning(ObservationType::Science, 100.0, 100.1);
        let bias = spanning(ObservationType::Bias, 100.05, 100.08);
        let d = interval_distance(&science, &bias);
        assert!(d.is_overlap());
        assert_relative_eq!(d.days(), 0.015, epsilon = 1e-9);
    }

    #[test]
    fn test_touching_intervals_count_as_overlap() {
        let science = spanning(ObservationType::Science, 100.0, 100.1);
        let wav = spanning(ObservationType::Wavelength, 100.1, 100.2);
        let d = interval_distance(&science, &wav);
        assert!(d.is_overlap());
        assert_relative_eq!(d.days(), 0.1, epsilon = 1e-9);
    }

    #[test]
    fn test_start_metric_ignores_end_times() {
        let science = spanning(ObservationType::Science, 100.0, 100.1);
        let standard = spanning(ObservationType::Standard, 100.05, 100.08);
        let d = distance(DistanceMetric::Start, &science, &standard);
        assert!(!d.is_overlap());
        assert_relative_eq!(d.days(), 0.05, epsilon = 1e-9);

        let earlier = spanning(ObservationType::Standard, 99.8, 99.81);
        assert_relative_eq!(
            distance(DistanceMetric::Start, &science, &earlier).days(),
            0.2,
            epsilon = 1e-9
        );
    }
}
