//! Business logic services for the Inventory Ledger platform

pub mod ledger;
pub mod warehouse;

pub use ledger::StockLedger;
pub use warehouse::WarehouseService;
