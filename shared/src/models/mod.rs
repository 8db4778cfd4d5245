//! Domain models for the Inventory Ledger platform

mod product;
mod stock;
mod warehouse;

pub use product::*;
pub use stock::*;
pub use warehouse::*;
