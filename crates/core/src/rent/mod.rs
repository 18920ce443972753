//! Rent models for the relocated campus.

pub mod calculator;
pub mod error;
pub mod types;

pub use calculator::{RentCalculator, RentProjection};
pub use error::RentError;
pub use types::{FixedEscalationConfig, PartnerModelConfig, RentModel, RevenueShareConfig};
