//! Inventory engine services, one Postgres transaction per operation

pub mod bulk;
pub mod grouping;
pub mod import;
pub mod milling;
pub mod reference;
pub mod release;
pub mod stock;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use grouping::GroupingService;
pub use import::ImportService;
pub use milling::MillingService;
pub use reference::ReferenceService;
pub use release::ReleaseService;
pub use stock::StockService;
