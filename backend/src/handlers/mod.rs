//! HTTP request handlers

pub mod grouping;
pub mod health;
pub mod import;
pub mod milling;
pub mod reference;
pub mod release;
pub mod stock;

pub use grouping::*;
pub use health::*;
pub use import::*;
pub use milling::*;
pub use reference::*;
pub use release::*;
pub use stock::*;
