use serde::{Deserialize, Serialize};

/// Closed error taxonomy (§7). `RiskReject`/`GateReject` are not carried here —
/// those are structured values returned alongside a match/admission, never
/// raised as errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineError {
    Config(String),
    Data(String),
    State(String),
    Runtime(String),
    Cancelled,
    Timeout,
    WorkerLost,
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "ConfigError",
            EngineError::Data(_) => "DataError",
            EngineError::State(_) => "StateError",
            EngineError::Runtime(_) => "RuntimeFailure",
            EngineError::Cancelled => "Cancelled",
            EngineError::Timeout => "Timeout",
            EngineError::WorkerLost => "WorkerLost",
        }
    }

    pub fn message(&self) -> String {
        match self {
            EngineError::Config(m)
            | EngineError::Data(m)
            | EngineError::State(m)
            | EngineError::Runtime(m) => m.clone(),
            EngineError::Cancelled => "job cancelled".to_string(),
            EngineError::Timeout => "wall-clock ceiling exceeded".to_string(),
            EngineError::WorkerLost => "worker process lost".to_string(),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for EngineError {}
