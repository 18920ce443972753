//! Core projection logic for Campusplan.
//!
//! This crate contains the financial projection engine for a dual-curriculum
//! school operator planning a campus relocation. Storage is reached only
//! through the traits in [`projection::store`].
//!
//! # Modules
//!
//! - `metrics` - Metric keys, records and derived P&L / balance sheet / cash flow fields
//! - `rent` - Rent models (fixed escalation, revenue share, partner yield)
//! - `curriculum` - Tuition revenue and staff cost for the FR and IB curricula
//! - `cash_engine` - Per-year convergence loop and the sequential multi-year driver
//! - `projection` - Orchestration: extraction, persistence, caching, background runs

pub mod cash_engine;
pub mod compounding;
pub mod curriculum;
pub mod metrics;
pub mod projection;
pub mod rent;
