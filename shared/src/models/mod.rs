//! Domain models for the Rice Inventory Management System

mod bulk;
mod grouping;
mod lot;
mod milling;
mod reference;
mod release;
mod stock;

pub use bulk::*;
pub use grouping::*;
pub use lot::*;
pub use milling::*;
pub use reference::*;
pub use release::*;
pub use stock::*;
