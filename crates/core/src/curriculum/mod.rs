//! Curriculum revenue and staff cost.

pub mod calculator;
pub mod error;
pub mod types;

pub use calculator::CurriculumCalculator;
pub use error::CurriculumError;
pub use types::{CombinedCurriculum, CurriculumRecord, CurriculumResult, CurriculumType, StaffCost};
