//! Science exposure identification and per-object numbering.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::record::{Arm, MetadataRecord};

/// Facts derived once per science exposure before association
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScienceExposure {
    /// Position of the science record in the run's collection
    pub record_index: usize,
    pub arm: Arm,
    /// Slit-width identifier, e.g. `s08` for a 0.8 arcsec slit
    pub slit_id: String,
    /// 1-based count among exposures of the same object and central wavelength
    pub sequence: u32,
}

/// Slit identifier from the slit width in arcseconds
pub fn slit_identifier(slit_width: f64) -> String {
    format!("s{:02}", (10.01 * slit_width) as i32)
}

/// Identify science records in collection order and number them per object
/// and central wavelength.
pub fn collect_science(records: &[MetadataRecord]) -> Vec<ScienceExposure> {
    let mut counters: HashMap<(&str, &str), u32> = HashMap::new();

    records
        .iter()
        .enumerate()
        .filter(|(_, record)| record.is_science())
        .map(|(record_index, record)| {
            let counter = counters
                .entry((
                    record.object.as_str(),
                    record.setup.central_wavelength.as_str(),
                ))
                .or_insert(0);
            *counter += 1;

            log::debug!(
                "Science record {record_index}: {} #{} ({})",
                record.object,
                counter,
                record.setup
            );

            ScienceExposure {
                record_index,
                arm: record.setup.arm,
                slit_id: slit_identifier(record.setup.slit_width),
                sequence: *counter,
            }
        })
        .collect()
}
