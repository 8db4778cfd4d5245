//! Shared types and models for the Inventory Ledger platform
//!
//! This crate contains the domain models, request payloads and the pure
//! stock arithmetic shared by the backend and any client tooling.

pub mod models;
pub mod validation;

pub use models::*;
pub use validation::*;
