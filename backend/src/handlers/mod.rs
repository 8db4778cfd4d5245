//! HTTP request handlers

pub mod health;
pub mod stock;
pub mod warehouse;

pub use health::*;
pub use stock::*;
pub use warehouse::*;
