//! Shared types and domain rules for the Rice Inventory Management System
//!
//! This crate holds everything that can be decided without touching the
//! database: the stock lifecycle, milling and release rules, lot code
//! derivation and the grouped aggregation used by the stock overview.
//! The backend persists what these rules decide; the WASM module reuses
//! them in the browser.

pub mod error;
pub mod models;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;
pub use validation::*;
