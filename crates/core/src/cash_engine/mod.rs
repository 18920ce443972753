//! Cash/balance convergence engine.

pub mod engine;
pub mod error;
pub mod types;


pub use engine::CashEngine;
pub use error::CashEngineError;
pub use types::{
    CheckKind, ConvergenceCheck, ConvergenceCheckMode, ConvergenceStatus, EngineConfig,
    MultiYearResult, RunSummary, UNBOUNDED_DIFFERENCE, YearOutcome,
};
