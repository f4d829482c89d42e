use serde::{Deserialize, Serialize};

use crate::callback::Condition;
use crate::config::{AssociationPolicy, WavelengthStrategy};
use crate::distance::distance;
use crate::error::AssociationError;
use crate::filters::{self, KindRules};
use crate::kind::CalibrationKind;
use crate::record::MetadataRecord;

/// An eligible calibration record and its distance from the science exposure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub index: usize,
    /// Distance in days
    pub dmjd: f64,
}

#[derive(Debug, Clone)]
pub struct CandidateStats {
    pub count: usize,
    pub nearest_dmjd: f64,
    pub farthest_dmjd: f64,
}

impl CandidateStats {
    pub fn log(&self, note: &str) {
        log::debug!(
            "{}: count={}, nearest={:.4} h, farthest={:.4} h",
            note,
            self.count,
            self.nearest_dmjd * 24.0,
            self.farthest_dmjd * 24.0
        );
    }
}

pub fn calculate_candidate_stats(candidates: &[Candidate]) -> Option<CandidateStats> {
    if candidates.is_empty() {
        return None;
    }

    let nearest_dmjd = candidates
        .iter()
        .map(|c| c.dmjd)
        .fold(f64::INFINITY, f64::min);
    let farthest_dmjd = candidates
        .iter()
        .map(|c| c.dmjd)
        .fold(f64::NEG_INFINITY, f64::max);

    Some(CandidateStats {
        count: candidates.len(),
        nearest_dmjd,
        farthest_dmjd,
    })
}

/// Outcome of filling one kind's quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SelectionStatus {
    /// Quota was zero; no search performed
    NotRequested,
    Complete,
    Underfilled { found: usize, requested: usize },
    NotFound { requested: usize },
}

/// Selected record indices for one kind, in selection order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSelection {
    pub indices: Vec<usize>,
    pub status: SelectionStatus,
}

impl KindSelection {
    pub fn not_requested() -> Self {
        Self {
            indices: Vec::new(),
            status: SelectionStatus::NotRequested,
        }
    }

    pub fn found(&self) -> usize {
        self.indices.len()
    }

    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }
}

/// Gather eligible candidates for one kind, with their distances.
///
/// Overlapping candidates are measured by midpoint separation and reported
/// as [`Condition::OverlapAnomaly`]. Exceeding the policy's candidate capacity
/// is fatal.
pub fn collect_candidates(
    kind: CalibrationKind,
    science_index: usize,
    records: &[MetadataRecord],
    policy: &AssociationPolicy,
) -> Result<(Vec<Candidate>, Vec<Condition>), AssociationError> {
    let rules = KindRules::for_kind(kind);
    let science = &records[science_index];

    let mut candidates = Vec::new();
    let mut conditions = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if !filters::is_eligible(&rules, science_index, science, index, record, policy) {
            continue;
        }

        if candidates.len() == policy.candidate_capacity {
            return Err(AssociationError::CapacityExceeded {
                kind,
                capacity: policy.candidate_capacity,
                science_index,
            });
        }

        let d = distance(rules.metric, science, record);
        if d.is_overlap() {
            conditions.push(Condition::OverlapAnomaly {
                candidate_index: index,
                candidate_span: record.span(),
                science_span: science.span(),
                dmjd: d.days(),
            });
        }

        candidates.push(Candidate {
            index,
            dmjd: d.days(),
        });
    }

    Ok((candidates, conditions))
}

/// Stable ascending sort by distance
pub fn sort_by_distance(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| a.dmjd.total_cmp(&b.dmjd));
}

/// Encoder tie-break between the two nearest wavelength candidates.
///
/// Only a second-nearest frame that alone matches the science encoder is
/// reported. When both match, a frame taken after the exposure replaces one
/// taken before it without a condition.
pub fn prefer_encoder_match(
    science: &MetadataRecord,
    records: &[MetadataRecord],
    candidates: &mut [Candidate],
) -> Option<Condition> {
    if candidates.len() < 2 {
        return None;
    }
    let (nearest, second) = (candidates[0], candidates[1]);

    let encoder = science.setup.encoder;
    let nearest_record = &records[nearest.index];
    let second_record = &records[second.index];

    match (
        nearest_record.setup.encoder == encoder,
        second_record.setup.encoder == encoder,
    ) {
        (true, true) => {
            let nearest_after = nearest_record.mjd >= science.mjd_end;
            let second_after = second_record.mjd >= science.mjd_end;
            if second_after && !nearest_after {
                log::debug!(
                    "Both nearest wavelength frames match encoder {encoder}; taking record {} after the exposure over record {}",
                    second.index,
                    nearest.index
                );
                candidates.swap(0, 1);
            }
            None
        }
        (false, true) => {
            candidates.swap(0, 1);
            Some(Condition::EncoderPreference {
                preferred_index: second.index,
                preferred_dmjd: second.dmjd,
                passed_over_index: nearest.index,
                passed_over_dmjd: nearest.dmjd,
            })
        }
        _ => None,
    }
}

/// Promote the nearest attached, encoder-matching wavelength frame to the front.
///
/// A frame is attached when it starts at or after the science exposure ends
/// and less than `attached_window_days` later.
pub fn promote_attached(
    science: &MetadataRecord,
    records: &[MetadataRecord],
    candidates: &mut Vec<Candidate>,
    attached_window_days: f64,
) -> Option<Condition> {
    let position = candidates.iter().position(|c| {
        let record = &records[c.index];
        let lag = record.mjd - science.mjd_end;
        lag >= 0.0 && lag < attached_window_days && record.setup.encoder == science.setup.encoder
    })?;

    if position == 0 {
        return None;
    }

    let nearest = candidates[0];
    let attached = candidates.remove(position);
    candidates.insert(0, attached);

    Some(Condition::AttachedPreference {
        preferred_index: attached.index,
        preferred_dmjd: attached.dmjd,
        passed_over_index: nearest.index,
        passed_over_dmjd: nearest.dmjd,
    })
}

/// Select up to the quota of calibration frames of `kind` for one science record
pub fn select_calibrations(
    kind: CalibrationKind,
    science_index: usize,
    records: &[MetadataRecord],
    policy: &AssociationPolicy,
) -> Result<(KindSelection, Vec<Condition>), AssociationError> {
    let quota = policy.quota(kind);
    if quota == 0 {
        return Ok((KindSelection::not_requested(), Vec::new()));
    }

    let (mut candidates, mut conditions) =
        collect_candidates(kind, science_index, records, policy)?;

    if candidates.is_empty() {
        conditions.push(Condition::NotFound { requested: quota });
        return Ok((
            KindSelection {
                indices: Vec::new(),
                status: SelectionStatus::NotFound { requested: quota },
            },
            conditions,
        ));
    }

    sort_by_distance(&mut candidates);

    if let Some(stats) = calculate_candidate_stats(&candidates) {
        stats.log(&format!("{kind} candidates for science record {science_index}"));
    }

    if kind == CalibrationKind::Wavelength {
        let science = &records[science_index];
        let preference = match policy.wavelength_strategy {
            WavelengthStrategy::NearestPair => {
                prefer_encoder_match(science, records, &mut candidates)
            }
            WavelengthStrategy::AttachedScan { .. } => policy
                .attached_window_days()
                .and_then(|window| promote_attached(science, records, &mut candidates, window)),
        };
        conditions.extend(preference);
    }

    let found = candidates.len().min(quota);
    let status = if found < quota {
        conditions.push(Condition::Underfilled {
            requested: quota,
            found,
        });
        SelectionStatus::Underfilled {
            found,
            requested: quota,
        }
    } else {
        SelectionStatus::Complete
    };

    candidates.truncate(found);

    Ok((
        KindSelection {
            indices: candidates.iter().map(|c| c.index).collect(),
            status,
        },
        conditions,
    ))
}
