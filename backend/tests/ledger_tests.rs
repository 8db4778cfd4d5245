//! Stock ledger tests
//!
//! Tests for the warehouse stock ledger including:
//! - Add / remove / set-quantity / transfer scenarios
//! - Transfer conservation and whole-batch rejection
//! - Aggregate stock consistency across random operation sequences
//! - Rollback on store failures and deadlines
//! - Cache invalidation after commit

mod common;

use std::time::Duration;

use common::Fixture;
use inventory_ledger::config::LedgerConfig;
use inventory_ledger::error::AppError;
use inventory_ledger::store::{FailPoint, StockStore};
use proptest::prelude::*;
use shared::{StockItemRequest, TransferItemRequest};
use uuid::Uuid;

fn add(product_id: Uuid, quantity: i32) -> StockItemRequest {
    StockItemRequest {
        product_id,
        quantity,
    }
}

fn move_item(product_id: Uuid, transfer_quantity: i32) -> TransferItemRequest {
    TransferItemRequest {
        product_id,
        transfer_quantity,
    }
}

// ============================================================================
// Add Stock
// ============================================================================

#[tokio::test]
async fn test_add_stock_on_empty_state() {
    let f = Fixture::new().await;

    f.ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 10)])
        .await
        .unwrap();

    assert_eq!(f.qty(&f.w1, &f.p1).await, 10);
    assert_eq!(f.total_stock(&f.p1).await, 10);
}

#[tokio::test]
async fn test_add_stock_accumulates_and_repeats_in_batch() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 5).await;

    f.ledger
        .add_stock(
            f.w1.id,
            f.inventory_id,
            &[add(f.p1.id, 3), add(f.p2.id, 7), add(f.p1.id, 2)],
        )
        .await
        .unwrap();

    assert_eq!(f.qty(&f.w1, &f.p1).await, 10);
    assert_eq!(f.qty(&f.w1, &f.p2).await, 7);
    f.assert_aggregate(&f.p1).await;
    f.assert_aggregate(&f.p2).await;
}

#[tokio::test]
async fn test_add_stock_rejects_non_positive_quantity_without_writes() {
    let f = Fixture::new().await;

    let err = f
        .ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 4), add(f.p2.id, 0)])
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(f.qty(&f.w1, &f.p1).await, 0);
    assert_eq!(f.total_stock(&f.p1).await, 0);
}

#[tokio::test]
async fn test_add_stock_rejects_empty_batch() {
    let f = Fixture::new().await;
    let err = f.ledger.add_stock(f.w1.id, f.inventory_id, &[]).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_add_stock_unknown_product_rolls_back_batch() {
    let f = Fixture::new().await;

    let err = f
        .ledger
        .add_stock(
            f.w1.id,
            f.inventory_id,
            &[add(f.p1.id, 4), add(Uuid::new_v4(), 1)],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(f.qty(&f.w1, &f.p1).await, 0);
}

#[tokio::test]
async fn test_add_stock_cross_inventory_product_rejected() {
    let f = Fixture::new().await;
    let foreign = common::product(Uuid::new_v4(), "foreign", 10);
    f.store.seed_product(foreign.clone()).await;

    let err = f
        .ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(foreign.id, 1)])
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("does not belong"));
}

#[tokio::test]
async fn test_add_stock_missing_warehouse() {
    let f = Fixture::new().await;
    let err = f
        .ledger
        .add_stock(Uuid::new_v4(), f.inventory_id, &[add(f.p1.id, 1)])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_ceiling_not_enforced_on_add_by_default() {
    let f = Fixture::new().await;

    f.ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 25)])
        .await
        .unwrap();

    assert_eq!(f.total_stock(&f.p1).await, 25);
    assert_eq!(f.total_quantity(&f.p1).await, 20);
}

#[tokio::test]
async fn test_ceiling_enforced_on_add_when_enabled() {
    let f = Fixture::with_policy(LedgerConfig {
        enforce_ceiling_on_add: true,
        ..LedgerConfig::default()
    })
    .await;
    f.store.seed_link(f.w2.id, f.p1.id, 15).await;

    let err = f
        .ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 6)])
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("Only 5 units available"));
    assert_eq!(f.qty(&f.w1, &f.p1).await, 0);

    f.ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 5)])
        .await
        .unwrap();
    assert_eq!(f.total_stock(&f.p1).await, 20);
}

// ============================================================================
// Remove Stock
// ============================================================================

#[tokio::test]
async fn test_remove_stock_deletes_row_and_decrements_total() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 8).await;
    f.store.seed_link(f.w2.id, f.p1.id, 2).await;

    f.ledger
        .remove_stock(f.inventory_id, f.w1.id, f.p1.id)
        .await
        .unwrap();

    assert_eq!(f.store.link_quantity(f.w1.id, f.p1.id).await, None);
    assert_eq!(f.total_stock(&f.p1).await, 2);
    f.assert_aggregate(&f.p1).await;
}

#[tokio::test]
async fn test_remove_stock_is_idempotent() {
    let f = Fixture::new().await;

    for _ in 0..2 {
        f.ledger
            .remove_stock(f.inventory_id, f.w1.id, f.p1.id)
            .await
            .unwrap();
    }

    assert_eq!(f.total_stock(&f.p1).await, 0);
    assert!(f.cache.deleted().is_empty());
}

#[tokio::test]
async fn test_remove_stock_unknown_product_is_noop() {
    let f = Fixture::new().await;
    f.ledger
        .remove_stock(f.inventory_id, f.w1.id, Uuid::new_v4())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remove_stock_quantity_partial_and_to_zero() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 10).await;

    f.ledger
        .remove_stock_quantity(f.inventory_id, f.w1.id, f.p1.id, 4)
        .await
        .unwrap();
    assert_eq!(f.qty(&f.w1, &f.p1).await, 6);
    assert_eq!(f.total_stock(&f.p1).await, 6);

    f.ledger
        .remove_stock_quantity(f.inventory_id, f.w1.id, f.p1.id, 6)
        .await
        .unwrap();
    assert_eq!(f.store.link_quantity(f.w1.id, f.p1.id).await, None);
    f.assert_aggregate(&f.p1).await;
}

#[tokio::test]
async fn test_remove_stock_quantity_insufficient() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 3).await;

    let err = f
        .ledger
        .remove_stock_quantity(f.inventory_id, f.w1.id, f.p1.id, 5)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientStock {
            available: 3,
            requested: 5,
            ..
        }
    ));
    assert_eq!(f.qty(&f.w1, &f.p1).await, 3);
}

// ============================================================================
// Update Stock Quantity
// ============================================================================

#[tokio::test]
async fn test_update_quantity_raises_ceiling() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 6).await;

    f.ledger
        .update_stock_quantity(f.inventory_id, f.w1.id, f.p1.id, 50)
        .await
        .unwrap();

    assert_eq!(f.qty(&f.w1, &f.p1).await, 50);
    assert_eq!(f.total_quantity(&f.p1).await, 50);
    assert_eq!(f.total_stock(&f.p1).await, 6 + 44);
}

#[tokio::test]
async fn test_update_quantity_never_lowers_ceiling() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p2.id, 30).await;

    f.ledger
        .update_stock_quantity(f.inventory_id, f.w1.id, f.p2.id, 10)
        .await
        .unwrap();

    assert_eq!(f.total_quantity(&f.p2).await, 100);
    assert_eq!(f.total_stock(&f.p2).await, 10);
}

#[tokio::test]
async fn test_update_quantity_insert_and_delete_paths() {
    let f = Fixture::new().await;

    f.ledger
        .update_stock_quantity(f.inventory_id, f.w2.id, f.p3.id, 12)
        .await
        .unwrap();
    assert_eq!(f.qty(&f.w2, &f.p3).await, 12);
    assert_eq!(f.total_stock(&f.p3).await, 12);

    f.ledger
        .update_stock_quantity(f.inventory_id, f.w2.id, f.p3.id, 0)
        .await
        .unwrap();
    assert_eq!(f.store.link_quantity(f.w2.id, f.p3.id).await, None);
    assert_eq!(f.total_stock(&f.p3).await, 0);
}

#[tokio::test]
async fn test_update_quantity_rejects_negative() {
    let f = Fixture::new().await;
    let err = f
        .ledger
        .update_stock_quantity(f.inventory_id, f.w1.id, f.p1.id, -1)
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_update_quantity_cross_inventory_product_rejected() {
    let f = Fixture::new().await;
    let foreign = common::product(Uuid::new_v4(), "foreign", 10);
    f.store.seed_product(foreign.clone()).await;

    let err = f
        .ledger
        .update_stock_quantity(f.inventory_id, f.w1.id, foreign.id, 3)
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(f.store.link_quantity(f.w1.id, foreign.id).await, None);
}

#[tokio::test]
async fn test_update_quantity_store_failure_rolls_back_everything() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 6).await;
    f.store.inject_failure(Some(FailPoint::AdjustTotalStock));

    let err = f
        .ledger
        .update_stock_quantity(f.inventory_id, f.w1.id, f.p1.id, 50)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Store(_)));
    assert_eq!(f.qty(&f.w1, &f.p1).await, 6);
    assert_eq!(f.total_quantity(&f.p1).await, 20);
    assert_eq!(f.total_stock(&f.p1).await, 6);
    assert!(f.cache.deleted().is_empty());
}

// ============================================================================
// Transfer Stock
// ============================================================================

#[tokio::test]
async fn test_transfer_moves_stock() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 10).await;

    f.ledger
        .transfer_stock(f.inventory_id, f.w1.id, f.w2.id, &[move_item(f.p1.id, 4)])
        .await
        .unwrap();

    assert_eq!(f.qty(&f.w1, &f.p1).await, 6);
    assert_eq!(f.qty(&f.w2, &f.p1).await, 4);
    assert_eq!(f.total_stock(&f.p1).await, 10);
}

#[tokio::test]
async fn test_transfer_insufficient_stock_names_amounts() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 6).await;

    let err = f
        .ledger
        .transfer_stock(f.inventory_id, f.w1.id, f.w2.id, &[move_item(f.p1.id, 10)])
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("Available: 6, Requested: 10"));
    assert_eq!(f.qty(&f.w1, &f.p1).await, 6);
    assert_eq!(f.store.link_quantity(f.w2.id, f.p1.id).await, None);
}

#[tokio::test]
async fn test_transfer_whole_amount_deletes_source_row() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p2.id, 7).await;

    f.ledger
        .transfer_stock(f.inventory_id, f.w1.id, f.w2.id, &[move_item(f.p2.id, 7)])
        .await
        .unwrap();

    assert_eq!(f.store.link_quantity(f.w1.id, f.p2.id).await, None);
    assert_eq!(f.qty(&f.w2, &f.p2).await, 7);
    f.assert_aggregate(&f.p2).await;
}

#[tokio::test]
async fn test_transfer_batch_rejected_atomically() {
    let f = Fixture::new().await;
    let extra_a = common::product(f.inventory_id, "excelsa", 100);
    let extra_b = common::product(f.inventory_id, "geisha", 100);
    f.store.seed_product(extra_a.clone()).await;
    f.store.seed_product(extra_b.clone()).await;

    let products = [&f.p1, &f.p2, &f.p3, &extra_a, &extra_b];
    for p in products {
        f.store.seed_link(f.w1.id, p.id, 10).await;
    }

    let items = vec![
        move_item(f.p1.id, 5),
        move_item(f.p2.id, 5),
        move_item(f.p3.id, 11),
        move_item(extra_a.id, 5),
        move_item(extra_b.id, 5),
    ];
    let err = f
        .ledger
        .transfer_stock(f.inventory_id, f.w1.id, f.w2.id, &items)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { product_id, .. } if product_id == f.p3.id));
    for p in products {
        assert_eq!(f.qty(&f.w1, p).await, 10);
        assert_eq!(f.store.link_quantity(f.w2.id, p.id).await, None);
    }
}

#[tokio::test]
async fn test_transfer_repeated_product_sees_earlier_lines() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 5).await;

    let err = f
        .ledger
        .transfer_stock(
            f.inventory_id,
            f.w1.id,
            f.w2.id,
            &[move_item(f.p1.id, 3), move_item(f.p1.id, 3)],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        }
    ));
    assert_eq!(f.qty(&f.w1, &f.p1).await, 5);
}

#[tokio::test]
async fn test_transfer_precondition_failures() {
    let f = Fixture::new().await;

    let same = f
        .ledger
        .transfer_stock(f.inventory_id, f.w1.id, f.w1.id, &[move_item(f.p1.id, 1)])
        .await
        .unwrap_err();
    assert!(same.to_string().contains("cannot be the same"));

    let empty = f
        .ledger
        .transfer_stock(f.inventory_id, f.w1.id, f.w2.id, &[])
        .await
        .unwrap_err();
    assert!(empty.is_validation());

    let zero = f
        .ledger
        .transfer_stock(f.inventory_id, f.w1.id, f.w2.id, &[move_item(f.p1.id, 0)])
        .await
        .unwrap_err();
    assert!(zero.is_validation());
}

#[tokio::test]
async fn test_transfer_to_other_inventory_warehouse_rejected() {
    let f = Fixture::new().await;
    let foreign = common::warehouse(Uuid::new_v4(), "Elsewhere", 0);
    f.store.seed_warehouse(foreign.clone()).await;
    f.store.seed_link(f.w1.id, f.p1.id, 5).await;

    let err = f
        .ledger
        .transfer_stock(f.inventory_id, f.w1.id, foreign.id, &[move_item(f.p1.id, 1)])
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(f.qty(&f.w1, &f.p1).await, 5);
}

// ============================================================================
// Failures, Deadlines and Cache
// ============================================================================

#[tokio::test]
async fn test_commit_failure_leaves_state_and_cache_untouched() {
    let f = Fixture::new().await;
    f.store.inject_failure(Some(FailPoint::Commit));

    let err = f
        .ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 3)])
        .await
        .unwrap_err();

    assert!(!err.is_validation());
    assert_eq!(f.total_stock(&f.p1).await, 0);
    assert!(f.cache.deleted().is_empty());

    f.store.inject_failure(None);
    f.ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 3)])
        .await
        .unwrap();
    assert_eq!(f.total_stock(&f.p1).await, 3);
}

#[tokio::test]
async fn test_deadline_exceeded_returns_timeout() {
    let f = Fixture::with_policy(LedgerConfig {
        operation_timeout_ms: 50,
        ..LedgerConfig::default()
    })
    .await;

    // Hold the store so the ledger cannot get its transaction in time
    let blocker = f.store.begin().await.unwrap();
    let err = f
        .ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 3)])
        .await
        .unwrap_err();
    drop(blocker);

    assert!(matches!(err, AppError::Timeout(_)));
    assert!(!err.is_retryable());
    assert_eq!(f.total_stock(&f.p1).await, 0);
}

#[tokio::test]
async fn test_slow_commit_is_not_cut_off_by_deadline() {
    let f = Fixture::with_policy(LedgerConfig {
        operation_timeout_ms: 50,
        ..LedgerConfig::default()
    })
    .await;
    f.store.delay_commit(Some(Duration::from_millis(200)));

    f.ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 3)])
        .await
        .unwrap();

    assert_eq!(f.qty(&f.w1, &f.p1).await, 3);
    assert_eq!(f.total_stock(&f.p1).await, 3);
    let deleted = f.cache.deleted();
    assert!(deleted.contains(&format!("warehouse:{}", f.w1.id)));
    assert!(deleted.contains(&format!("warehouses:{}", f.inventory_id)));
}

#[tokio::test]
async fn test_update_quantity_total_overflow_rejected() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 5).await;

    let err = f
        .ledger
        .update_stock_quantity(f.inventory_id, f.w2.id, f.p1.id, i32::MAX)
        .await
        .unwrap_err();

    match err {
        AppError::Validation { field, message } => {
            assert_eq!(field, "newQuantity");
            assert_eq!(message, "Stock quantity is too large");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(f.store.link_quantity(f.w2.id, f.p1.id).await, None);
    assert_eq!(f.total_stock(&f.p1).await, 5);
    assert_eq!(f.total_quantity(&f.p1).await, 20);
    assert!(f.cache.deleted().is_empty());
}

#[tokio::test]
async fn test_transfer_invalidates_both_warehouses_and_products() {
    let f = Fixture::new().await;
    f.store.seed_link(f.w1.id, f.p1.id, 10).await;

    f.ledger
        .transfer_stock(f.inventory_id, f.w1.id, f.w2.id, &[move_item(f.p1.id, 1)])
        .await
        .unwrap();

    let deleted = f.cache.deleted();
    for key in [
        format!("warehouse:{}", f.w1.id),
        format!("warehouse:{}", f.w2.id),
        format!("warehouses:{}", f.inventory_id),
        format!("product:{}", f.p1.id),
        format!("products:{}", f.inventory_id),
    ] {
        assert!(deleted.contains(&key), "missing invalidation of {}", key);
    }
}

#[tokio::test]
async fn test_cache_failure_does_not_fail_mutation() {
    let f = Fixture::new().await;
    f.cache.fail();

    f.ledger
        .add_stock(f.w1.id, f.inventory_id, &[add(f.p1.id, 2)])
        .await
        .unwrap();

    assert_eq!(f.qty(&f.w1, &f.p1).await, 2);
    assert!(!f.cache.deleted().is_empty());
}

#[tokio::test]
async fn test_concurrent_adds_do_not_lose_updates() {
    let f = Fixture::new().await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let ledger = f.ledger.clone();
        let (warehouse_id, inventory_id, product_id) = (f.w1.id, f.inventory_id, f.p2.id);
        handles.push(tokio::spawn(async move {
            ledger
                .add_stock(warehouse_id, inventory_id, &[add(product_id, 1)])
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(f.qty(&f.w1, &f.p2).await, 20);
    f.assert_aggregate(&f.p2).await;
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add { warehouse: usize, product: usize, quantity: i32 },
    Remove { warehouse: usize, product: usize },
    RemoveSome { warehouse: usize, product: usize, quantity: i32 },
    Set { warehouse: usize, product: usize, quantity: i32 },
    Transfer { from: usize, product: usize, quantity: i32 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..2usize, 0..3usize, 1..50i32)
            .prop_map(|(warehouse, product, quantity)| Op::Add { warehouse, product, quantity }),
        (0..2usize, 0..3usize).prop_map(|(warehouse, product)| Op::Remove { warehouse, product }),
        (0..2usize, 0..3usize, 1..20i32).prop_map(|(warehouse, product, quantity)| {
            Op::RemoveSome { warehouse, product, quantity }
        }),
        (0..2usize, 0..3usize, 0..150i32)
            .prop_map(|(warehouse, product, quantity)| Op::Set { warehouse, product, quantity }),
        (0..2usize, 0..3usize, 1..30i32)
            .prop_map(|(from, product, quantity)| Op::Transfer { from, product, quantity }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Link rows always sum to the product's total stock, whatever mix
    /// of operations succeeded or was rejected
    #[test]
    fn prop_aggregate_consistency(ops in prop::collection::vec(op_strategy(), 1..25)) {
        tokio_test::block_on(async {
            let f = Fixture::new().await;
            let warehouses = [f.w1.id, f.w2.id];
            let products = [f.p1.clone(), f.p2.clone(), f.p3.clone()];

            for op in ops {
                let ceiling_before: Vec<i32> = {
                    let mut v = Vec::new();
                    for p in &products {
                        v.push(f.total_quantity(p).await);
                    }
                    v
                };

                let result = match op {
                    Op::Add { warehouse, product, quantity } => {
                        f.ledger
                            .add_stock(warehouses[warehouse], f.inventory_id, &[add(products[product].id, quantity)])
                            .await
                    }
                    Op::Remove { warehouse, product } => {
                        f.ledger
                            .remove_stock(f.inventory_id, warehouses[warehouse], products[product].id)
                            .await
                    }
                    Op::RemoveSome { warehouse, product, quantity } => {
                        f.ledger
                            .remove_stock_quantity(f.inventory_id, warehouses[warehouse], products[product].id, quantity)
                            .await
                    }
                    Op::Set { warehouse, product, quantity } => {
                        f.ledger
                            .update_stock_quantity(f.inventory_id, warehouses[warehouse], products[product].id, quantity)
                            .await
                    }
                    Op::Transfer { from, product, quantity } => {
                        f.ledger
                            .transfer_stock(
                                f.inventory_id,
                                warehouses[from],
                                warehouses[1 - from],
                                &[move_item(products[product].id, quantity)],
                            )
                            .await
                    }
                };

                if let Err(e) = result {
                    assert!(matches!(e, AppError::InsufficientStock { .. }), "unexpected error {:?}", e);
                }

                for (i, p) in products.iter().enumerate() {
                    f.assert_aggregate(p).await;
                    assert!(f.total_quantity(p).await >= ceiling_before[i]);
                }
            }
        });
    }

    /// A transfer conserves the pair total and never touches total stock
    #[test]
    fn prop_transfer_conservation(source in 0..60i32, dest in 0..60i32, amount in 1..80i32) {
        tokio_test::block_on(async {
            let f = Fixture::new().await;
            if source > 0 {
                f.store.seed_link(f.w1.id, f.p2.id, source).await;
            }
            if dest > 0 {
                f.store.seed_link(f.w2.id, f.p2.id, dest).await;
            }
            let stock_before = f.total_stock(&f.p2).await;

            let result = f
                .ledger
                .transfer_stock(f.inventory_id, f.w1.id, f.w2.id, &[move_item(f.p2.id, amount)])
                .await;

            let (src_after, dst_after) = (f.qty(&f.w1, &f.p2).await, f.qty(&f.w2, &f.p2).await);
            assert_eq!(src_after + dst_after, source + dest);
            assert_eq!(f.total_stock(&f.p2).await, stock_before);

            if amount <= source {
                assert!(result.is_ok());
                assert_eq!(src_after, source - amount);
                assert_eq!(dst_after, dest + amount);
            } else {
                assert!(result.is_err());
                assert_eq!(src_after, source);
            }
        });
    }
}
