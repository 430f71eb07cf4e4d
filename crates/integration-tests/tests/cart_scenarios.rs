//! Integration tests for cart behaviour through a running store.
//!
//! These drive a `CartStore` over in-memory storage the way the app's
//! screens do: add from the catalog, then adjust quantities from the cart.

#![allow(clippy::unwrap_used)]

use marketplace_cart::{CartError, MemoryStore, NewLineItem};
use marketplace_core::{Price, ProductId, Quantity};
use marketplace_integration_tests::{pairs, product, quantities, start};

// =============================================================================
// Reference Scenarios
// =============================================================================

#[tokio::test]
async fn test_add_to_empty_cart() {
    let cart = start(MemoryStore::new()).await;

    cart.add_to_cart(NewLineItem {
        id: ProductId::new("a"),
        title: "Shoe".to_owned(),
        image_url: "u".to_owned(),
        price: Price::from_cents(1000),
    })
    .await
    .unwrap();

    let snapshot = cart.cart().unwrap();
    assert_eq!(snapshot.len(), 1);
    let item = snapshot.get(&ProductId::new("a")).unwrap();
    assert_eq!(item.title, "Shoe");
    assert_eq!(item.image_url, "u");
    assert_eq!(item.price, Price::from_cents(1000));
    assert_eq!(item.quantity, Quantity::ONE);
}

#[tokio::test]
async fn test_add_same_product_twice() {
    let cart = start(MemoryStore::new()).await;

    cart.add_to_cart(product("a")).await.unwrap();
    cart.add_to_cart(product("a")).await.unwrap();

    assert_eq!(quantities(&cart), pairs(&[("a", 2)]));
}

#[tokio::test]
async fn test_decrement_twice_empties_cart() {
    let cart = start(MemoryStore::new()).await;
    cart.add_to_cart(product("a")).await.unwrap();
    cart.add_to_cart(product("a")).await.unwrap();

    cart.decrement(ProductId::new("a")).await.unwrap();
    assert_eq!(quantities(&cart), pairs(&[("a", 1)]));

    cart.decrement(ProductId::new("a")).await.unwrap();
    assert_eq!(quantities(&cart), pairs(&[]));
}

#[tokio::test]
async fn test_increment_unknown_product() {
    let cart = start(MemoryStore::new()).await;
    cart.add_to_cart(product("a")).await.unwrap();
    cart.add_to_cart(product("b")).await.unwrap();

    cart.increment(ProductId::new("z")).await.unwrap();

    assert_eq!(quantities(&cart), pairs(&[("a", 1), ("b", 1)]));
}

// =============================================================================
// Properties
// =============================================================================

#[tokio::test]
async fn test_ids_stay_unique_across_adds() {
    let cart = start(MemoryStore::new()).await;
    let sequence = ["c", "a", "c", "b", "a", "c", "d", "a"];

    for id in sequence {
        cart.add_to_cart(product(id)).await.unwrap();
    }

    assert_eq!(
        quantities(&cart),
        pairs(&[("c", 3), ("a", 3), ("b", 1), ("d", 1)])
    );
}

#[tokio::test]
async fn test_add_existing_is_increment_and_keeps_details() {
    let via_add = start(MemoryStore::new()).await;
    let via_increment = start(MemoryStore::new()).await;
    for cart in [&via_add, &via_increment] {
        cart.add_to_cart(product("a")).await.unwrap();
        cart.add_to_cart(product("b")).await.unwrap();
    }

    via_add
        .add_to_cart(NewLineItem {
            title: "Different title".to_owned(),
            image_url: "other".to_owned(),
            price: Price::from_cents(1),
            ..product("a")
        })
        .await
        .unwrap();
    via_increment.increment(ProductId::new("a")).await.unwrap();

    assert_eq!(*via_add.cart().unwrap(), *via_increment.cart().unwrap());
}

#[tokio::test]
async fn test_decrement_never_leaves_zero_quantities() {
    let cart = start(MemoryStore::new()).await;
    for id in ["a", "b", "b", "c"] {
        cart.add_to_cart(product(id)).await.unwrap();
    }

    for id in ["a", "b", "c", "a", "b", "x", "c"] {
        cart.decrement(ProductId::new(id)).await.unwrap();
        assert!(cart.cart().unwrap().iter().all(|item| item.quantity.get() > 0));
    }
    assert!(cart.cart().unwrap().is_empty());
}

#[tokio::test]
async fn test_miss_leaves_order_and_revision_untouched() {
    let cart = start(MemoryStore::new()).await;
    for id in ["b", "a", "c"] {
        cart.add_to_cart(product(id)).await.unwrap();
    }
    let before = cart.snapshot().unwrap();

    cart.decrement(ProductId::new("missing")).await.unwrap();
    cart.increment(ProductId::new("missing")).await.unwrap();

    let after = cart.snapshot().unwrap();
    assert_eq!(after.revision, before.revision);
    assert_eq!(quantities(&cart), pairs(&[("b", 1), ("a", 1), ("c", 1)]));
}

#[tokio::test]
async fn test_rapid_calls_from_many_tasks() {
    let cart = start(MemoryStore::new()).await;
    cart.add_to_cart(product("a")).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let cart = cart.clone();
        tasks.push(tokio::spawn(async move {
            cart.increment(ProductId::new("a")).await.unwrap();
            cart.add_to_cart(product(&format!("p{i}"))).await.unwrap();
            cart.add_to_cart(product("a")).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let snapshot = cart.cart().unwrap();
    assert_eq!(snapshot.len(), 21);
    assert_eq!(
        snapshot.get(&ProductId::new("a")).unwrap().quantity,
        Quantity::new(41)
    );
    assert_eq!(snapshot.total_quantity(), 61);
}

// =============================================================================
// Observation
// =============================================================================

#[tokio::test]
async fn test_subscriber_sees_every_revision_in_order() {
    let cart = start(MemoryStore::new()).await;
    let mut updates = cart.subscribe().unwrap();
    let start_revision = updates.borrow_and_update().revision;

    cart.add_to_cart(product("a")).await.unwrap();
    updates.changed().await.unwrap();
    assert_eq!(updates.borrow_and_update().revision, start_revision + 1);

    cart.decrement(ProductId::new("a")).await.unwrap();
    updates.changed().await.unwrap();
    let latest = updates.borrow_and_update().clone();
    assert_eq!(latest.revision, start_revision + 2);
    assert!(latest.cart.is_empty());
}

#[tokio::test]
async fn test_subtotal_tracks_quantities() {
    let cart = start(MemoryStore::new()).await;
    cart.add_to_cart(product("a")).await.unwrap();
    cart.add_to_cart(NewLineItem {
        price: Price::from_cents(250),
        ..product("b")
    })
    .await
    .unwrap();
    cart.increment(ProductId::new("b")).await.unwrap();

    let snapshot = cart.cart().unwrap();
    assert_eq!(snapshot.subtotal().to_string(), "15.00");
    assert_eq!(snapshot.total_quantity(), 3);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn test_every_clone_fails_fast_after_shutdown() {
    let cart = start(MemoryStore::new()).await;
    let screen = cart.clone();

    cart.shutdown().await.unwrap();

    assert!(matches!(screen.cart(), Err(CartError::Uninitialized)));
    assert!(matches!(screen.subscribe(), Err(CartError::Uninitialized)));
    assert!(matches!(
        screen.add_to_cart(product("a")).await,
        Err(CartError::Uninitialized)
    ));
    assert!(matches!(
        screen.decrement(ProductId::new("a")).await,
        Err(CartError::Uninitialized)
    ));
}
