//! Names and groupings handed to the link, list and script writers.
//!
//! Everything here is a pure function of the records and an association run;
//! creating links and writing files is left to the caller.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::config::AssociationPolicy;
use crate::kind::CalibrationKind;
use crate::record::{Arm, MetadataRecord};
use crate::{AssociationResult, AssociationRun};

/// Kinds in the order their links and list entries follow the science frame
pub const LINK_ORDER: [CalibrationKind; 6] = [
    CalibrationKind::Standard,
    CalibrationKind::Wavelength,
    CalibrationKind::OrderDefinition,
    CalibrationKind::FormatCheck,
    CalibrationKind::Flat,
    CalibrationKind::Bias,
];

/// Role a linked frame plays in the reduction of one science exposure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameRole {
    Science,
    Calibration(CalibrationKind),
}

impl FrameRole {
    fn descriptor_stem(&self) -> &'static str {
        match self {
            FrameRole::Science => "SCIENCE",
            FrameRole::Calibration(kind) => match kind {
                CalibrationKind::Standard => "STANDARD",
                CalibrationKind::Wavelength => "ARC_LAMP",
                CalibrationKind::OrderDefinition => "ORDER_FLAT",
                CalibrationKind::FormatCheck => "ARC_LAMP_FORM",
                CalibrationKind::Flat => "FLAT",
                CalibrationKind::Bias => "BIAS",
            },
        }
    }

    /// Reduction steps that consume the frame, as listed in the SOF file
    pub fn reduction_steps(&self) -> &'static str {
        match self {
            FrameRole::Science => "sci",
            FrameRole::Calibration(kind) => match kind {
                CalibrationKind::Standard => "std",
                CalibrationKind::Wavelength => "wav1,wav2",
                CalibrationKind::OrderDefinition => "ord",
                CalibrationKind::FormatCheck => "pred",
                CalibrationKind::Flat => "flat",
                CalibrationKind::Bias => "bias",
            },
        }
    }
}

/// SOF frame descriptor, e.g. `ARC_LAMP_BLUE`
pub fn frame_descriptor(role: FrameRole, arm: Arm) -> String {
    format!("{}_{}", role.descriptor_stem(), arm.label().to_uppercase())
}

/// `{object}_{type}_{cwl}_{seq}.fits`
pub fn science_link_name(science: &MetadataRecord, sequence: u32) -> String {
    format!(
        "{}_{}_{}_{:02}.fits",
        science.object,
        science.obs_type.tag(),
        science.setup.central_wavelength,
        sequence
    )
}

/// `{calobject}_{caltype}_{scicwl}_{seq}_{n}.fits`, with `position` 1-based
pub fn calibration_link_name(
    calibration: &MetadataRecord,
    science: &MetadataRecord,
    sequence: u32,
    position: usize,
) -> String {
    format!(
        "{}_{}_{}_{:02}_{:02}.fits",
        calibration.object,
        calibration.obs_type.tag(),
        science.setup.central_wavelength,
        sequence,
        position
    )
}

pub fn info_file_name(science: &MetadataRecord, sequence: u32) -> String {
    format!(
        "{}/info_{}_{:02}.dat",
        science.object, science.setup.central_wavelength, sequence
    )
}

pub fn sof_file_name(science: &MetadataRecord, sequence: u32) -> String {
    format!(
        "{}/reduce_{}_{:02}.sof",
        science.object, science.setup.central_wavelength, sequence
    )
}

/// One symbolic link to create in the science object's directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub record_index: usize,
    pub role: FrameRole,
    /// Link file name within the object directory
    pub link_name: String,
    /// `{object}/{link_name}`
    pub link_path: String,
    /// File the link points at
    pub target: String,
    pub descriptor: String,
}

impl LinkEntry {
    /// Line for the science exposure's SOF file
    pub fn sof_line(&self) -> String {
        format!(
            "{} {} {}",
            self.link_name,
            self.descriptor,
            self.role.reduction_steps()
        )
    }
}

/// Links for one science exposure: the science frame, then its calibrations
/// in [`LINK_ORDER`], each kind in selection order.
pub fn link_plan(records: &[MetadataRecord], result: &AssociationResult) -> Vec<LinkEntry> {
    let science = &records[result.science_index];
    let entry = |record_index: usize, role: FrameRole, link_name: String| LinkEntry {
        record_index,
        role,
        link_path: format!("{}/{}", science.object, link_name),
        link_name,
        target: records[record_index].file.clone(),
        descriptor: frame_descriptor(role, result.arm),
    };

    let mut plan = vec![entry(
        result.science_index,
        FrameRole::Science,
        science_link_name(science, result.sequence),
    )];

    for kind in LINK_ORDER {
        for (position, &index) in result.indices(kind).iter().enumerate() {
            let name = calibration_link_name(&records[index], science, result.sequence, position + 1);
            plan.push(entry(index, FrameRole::Calibration(kind), name));
        }
    }

    plan
}

/// Files relevant to one science object, by record index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFileList {
    pub object: String,
    pub indices: Vec<usize>,
}

impl ObjectFileList {
    /// `{object}.list`
    pub fn file_name(&self) -> String {
        format!("{}.list", self.object)
    }

    pub fn files<'a>(&self, records: &'a [MetadataRecord]) -> Vec<&'a str> {
        self.indices
            .iter()
            .map(|&i| records[i].file.as_str())
            .collect()
    }
}

/// Group a run's frames per science object.
///
/// Objects appear in the order first seen. Within an object, each science
/// frame is followed by its calibrations in [`LINK_ORDER`]; a calibration
/// already listed for the object is not repeated.
pub fn object_file_lists(records: &[MetadataRecord], run: &AssociationRun) -> Vec<ObjectFileList> {
    let mut lists: Vec<ObjectFileList> = Vec::new();
    let mut seen: Vec<HashSet<usize>> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for result in run.iter() {
        let object = records[result.science_index].object.as_str();
        let slot = *positions.entry(object).or_insert_with(|| {
            lists.push(ObjectFileList {
                object: object.to_string(),
                indices: Vec::new(),
            });
            seen.push(HashSet::new());
            lists.len() - 1
        });

        lists[slot].indices.push(result.science_index);
        for kind in LINK_ORDER {
            for &index in result.indices(kind) {
                if seen[slot].insert(index) {
                    lists[slot].indices.push(index);
                }
            }
        }
    }

    lists
}

/// Which reduction script a science exposure can be given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "readiness", rename_all = "snake_case")]
pub enum ScriptReadiness {
    /// Every required calibration present
    Full,
    /// Standards requested but none found; flux calibration is skipped
    FullWithoutStandards,
    /// A required calibration is missing
    Degraded { missing: CalibrationKind },
}

const REQUIRED_KINDS: [CalibrationKind; 5] = [
    CalibrationKind::Bias,
    CalibrationKind::Flat,
    CalibrationKind::Wavelength,
    CalibrationKind::OrderDefinition,
    CalibrationKind::FormatCheck,
];

pub fn script_readiness(result: &AssociationResult, policy: &AssociationPolicy) -> ScriptReadiness {
    let counts = result.found_counts();

    if let Some(missing) = REQUIRED_KINDS
        .into_iter()
        .find(|&kind| *counts.get(kind) == 0)
    {
        return ScriptReadiness::Degraded { missing };
    }

    if policy.quota(CalibrationKind::Standard) > 0 && counts.standard == 0 {
        ScriptReadiness::FullWithoutStandards
    } else {
        ScriptReadiness::Full
    }
}
