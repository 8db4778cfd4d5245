//! Validation utilities for stock ledger requests
//!
//! These checks run before any transaction is opened, so a rejected
//! request never touches the store.

use uuid::Uuid;

use crate::models::{StockItemRequest, TransferItemRequest};

// ============================================================================
// Stock Ledger Validations
// ============================================================================

/// Validate an add-stock batch: non-empty, every quantity positive
pub fn validate_stock_items(items: &[StockItemRequest]) -> Result<(), &'static str> {
    if items.is_empty() {
        return Err("At least one stock item is required");
    }
    if items.iter().any(|item| item.quantity <= 0) {
        return Err("Stock quantity must be greater than 0");
    }
    Ok(())
}

/// Validate a transfer before any write
pub fn validate_transfer(
    from_warehouse_id: Uuid,
    to_warehouse_id: Uuid,
    items: &[TransferItemRequest],
) -> Result<(), &'static str> {
    if from_warehouse_id == to_warehouse_id {
        return Err("Source and destination warehouses cannot be the same");
    }
    if items.is_empty() {
        return Err("At least one product must be specified for transfer");
    }
    if items.iter().any(|item| item.transfer_quantity <= 0) {
        return Err("Transfer quantity must be greater than 0");
    }
    Ok(())
}

/// Validate the target of a set-absolute-quantity request
pub fn validate_new_quantity(new_quantity: i32) -> Result<(), &'static str> {
    if new_quantity < 0 {
        return Err("New quantity cannot be negative");
    }
    Ok(())
}

/// Validate a partial removal amount
pub fn validate_removal_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Removal quantity must be greater than 0");
    }
    Ok(())
}
