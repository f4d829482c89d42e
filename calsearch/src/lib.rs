//! CALSEARCH - calibration association for echelle spectrograph observing runs
//!
//! Given the metadata of every exposure in a run, selects which bias, flat,
//! wavelength, order-definition, format-check and standard-star frames serve
//! each science exposure. Runs through states: Init -> Collected -> Done

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub mod callback;
pub mod config;
pub mod distance;
pub mod error;
pub mod filters;
pub mod kind;
pub mod naming;
pub mod record;
pub mod science;
pub mod selection;
pub mod state;

use crate::callback::{AssociationCallback, CallbackId};
use crate::science::ScienceExposure;

// Re-export commonly used types for external use
pub use crate::callback::{AssociationEvent, Condition, Severity};
pub use crate::config::{AssociationPolicy, PolicyRequest, WavelengthStrategy};
pub use crate::error::AssociationError;
pub use crate::kind::{CalibrationKind, PerKind};
pub use crate::record::{MetadataRecord, ObservationType};
pub use crate::selection::{KindSelection, SelectionStatus};
pub use crate::state::EngineState;

/// Calibration frames selected for one science exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssociationResult {
    /// Position of the science record in the run's collection
    pub science_index: usize,
    pub arm: record::Arm,
    pub slit_id: String,
    /// 1-based number among exposures of the same object and central wavelength
    pub sequence: u32,
    /// Object name of the first selected standard star.
    ///
    /// Only one standard is named per exposure even when more are selected;
    /// the remaining standards are still listed in `selections.standard`.
    pub standard_name: Option<String>,
    pub selections: PerKind<KindSelection>,
    /// Non-fatal conditions raised while associating this exposure
    pub events: Vec<AssociationEvent>,
}

impl AssociationResult {
    /// Selected record indices for one kind
    pub fn indices(&self, kind: CalibrationKind) -> &[usize] {
        &self.selections.get(kind).indices
    }

    /// Number of frames actually found per kind
    pub fn found_counts(&self) -> PerKind<usize> {
        self.selections.map(|_, selection| selection.found())
    }
}

/// Results of one association run, ordered by science record index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociationRun {
    pub results: Vec<AssociationResult>,
}

impl AssociationRun {
    /// Result for the science exposure at `science_index`
    pub fn get(&self, science_index: usize) -> Option<&AssociationResult> {
        self.results
            .binary_search_by_key(&science_index, |r| r.science_index)
            .ok()
            .map(|i| &self.results[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssociationResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Found counts keyed by science record index
    pub fn found_counts(&self) -> Vec<(usize, PerKind<usize>)> {
        self.results
            .iter()
            .map(|r| (r.science_index, r.found_counts()))
            .collect()
    }

    /// Every event raised during the run, in the order raised
    pub fn events(&self) -> impl Iterator<Item = &AssociationEvent> {
        self.results.iter().flat_map(|r| r.events.iter())
    }
}

/// Calibration association engine
pub struct AssociationEngine {
    /// Current state
    state: EngineState,
    /// Validated policy
    policy: AssociationPolicy,
    /// Science exposures identified in the current run
    science: Vec<ScienceExposure>,
    /// Registered callbacks
    callbacks: HashMap<CallbackId, AssociationCallback>,
    /// Next callback ID
    next_callback_id: CallbackId,
}

impl AssociationEngine {
    /// Create an engine, rejecting a misconfigured policy before any work
    pub fn new(policy: AssociationPolicy) -> Result<Self, AssociationError> {
        policy.validate()?;
        Ok(Self {
            state: EngineState::Init,
            policy,
            science: Vec::new(),
            callbacks: HashMap::new(),
            next_callback_id: 0,
        })
    }

    /// Register a callback for association events.
    ///
    /// Events are delivered as each science exposure is associated, so a run
    /// that later fails with a fatal error may already have delivered events
    /// for earlier exposures. Those exposures appear in no returned result.
    pub fn register_callback<F>(&mut self, callback: F) -> CallbackId
    where
        F: Fn(&AssociationEvent) + Send + Sync + 'static,
    {
        let callback_id = self.next_callback_id;
        self.next_callback_id += 1;

        self.callbacks.insert(callback_id, Arc::new(callback));
        callback_id
    }

    /// Deregister a callback
    pub fn deregister_callback(&mut self, callback_id: CallbackId) -> bool {
        self.callbacks.remove(&callback_id).is_some()
    }

    /// Get the number of registered callbacks
    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }

    /// Emit an event to all registered callbacks
    fn emit_event(&self, event: &AssociationEvent) {
        for callback in self.callbacks.values() {
            callback(event);
        }
    }

    /// Get the current state
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn policy(&self) -> &AssociationPolicy {
        &self.policy
    }

    /// Associate calibrations with every science exposure in `records`.
    ///
    /// Records must be in ascending start-time order. A fatal error leaves the
    /// engine in [`EngineState::Failed`] and no results are returned.
    pub fn run(&mut self, records: &[MetadataRecord]) -> Result<AssociationRun, AssociationError> {
        self.handle_start();

        let outcome = self
            .handle_collect(records)
            .and_then(|_| self.handle_associate(records));

        match outcome {
            Ok(run) => Ok(run),
            Err(e) => {
                log::error!("Association run aborted: {e}");
                self.science.clear();
                self.state = EngineState::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Reset to Init for a new run
    fn handle_start(&mut self) {
        if self.state != EngineState::Init {
            log::info!("Starting new association run from {:?}", self.state);
        }
        self.science.clear();
        self.state = EngineState::Init;
    }

    /// Check ordering and identify science exposures
    fn handle_collect(&mut self, records: &[MetadataRecord]) -> Result<(), AssociationError> {
        if let Some(index) = record::first_out_of_order(records) {
            return Err(AssociationError::UnsortedRecords { index });
        }

        self.science = science::collect_science(records);
        log::info!(
            "Collected {} science exposures from {} records",
            self.science.len(),
            records.len()
        );

        self.state = EngineState::Collected {
            science_exposures: self.science.len(),
        };
        Ok(())
    }

    /// Associate every collected science exposure, stopping at the first fatal error
    fn handle_associate(
        &mut self,
        records: &[MetadataRecord],
    ) -> Result<AssociationRun, AssociationError> {
        let mut results = Vec::with_capacity(self.science.len());
        for exposure in &self.science {
            results.push(self.associate_exposure(exposure, records)?);
        }

        log::info!("Associated {} science exposures", results.len());
        self.state = EngineState::Done {
            associated: results.len(),
        };
        Ok(AssociationRun { results })
    }

    fn associate_exposure(
        &self,
        exposure: &ScienceExposure,
        records: &[MetadataRecord],
    ) -> Result<AssociationResult, AssociationError> {
        let science_index = exposure.record_index;
        let mut events = Vec::new();

        let selections = PerKind::try_from_fn(|kind| {
            let (selection, conditions) =
                selection::select_calibrations(kind, science_index, records, &self.policy)?;

            for condition in conditions {
                let event = AssociationEvent::new(kind, science_index, condition);
                event.log();
                self.emit_event(&event);
                events.push(event);
            }
            Ok::<_, AssociationError>(selection)
        })?;

        let standard_name = selections
            .standard
            .first()
            .map(|index| records[index].object.clone());

        Ok(AssociationResult {
            science_index,
            arm: exposure.arm,
            slit_id: exposure.slit_id.clone(),
            sequence: exposure.sequence,
            standard_name,
            selections,
            events,
        })
    }
}
