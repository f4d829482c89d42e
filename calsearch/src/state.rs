use serde::{Deserialize, Serialize};

/// Association engine states
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineState {
    /// Waiting for a run
    Init,
    /// Science exposures identified and numbered
    Collected { science_exposures: usize },
    /// Every science exposure associated
    Done { associated: usize },
    /// Run aborted by a fatal error
    Failed { reason: String },
}

impl EngineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EngineState::Done { .. } | EngineState::Failed { .. })
    }
}
