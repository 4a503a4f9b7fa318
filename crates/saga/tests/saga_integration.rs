//! Integration tests for the checkout saga.

use common::{UserId, VariantId};
use domain::{
    Address, CheckoutDetails, DomainError, Money, OrderError, OrderRepository, OrderService,
    OrderStatus, PaymentStatus, StoreError,
};
use order_store::InMemoryOrderRepository;
use rust_decimal_macros::dec;
use saga::checkout::{
    STEP_CLEAR_CART, STEP_COMMIT_STOCK, STEP_FETCH_CART, STEP_FETCH_CATALOG, STEP_PERSIST_ORDER,
    STEP_PRICE_LINES,
};
use saga::{
    CallerContext, CartLine, CheckoutCoordinator, InMemoryCartGateway, InMemoryCatalogGateway,
    SagaError, SagaState, VariantPriceStock,
};

type TestCoordinator =
    CheckoutCoordinator<InMemoryOrderRepository, InMemoryCartGateway, InMemoryCatalogGateway>;

const USER: i64 = 42;

struct TestHarness {
    coordinator: TestCoordinator,
    repository: InMemoryOrderRepository,
    cart: InMemoryCartGateway,
    catalog: InMemoryCatalogGateway,
}

impl TestHarness {
    fn new() -> Self {
        let repository = InMemoryOrderRepository::new();
        let cart = InMemoryCartGateway::new();
        let catalog = InMemoryCatalogGateway::new();

        let coordinator = CheckoutCoordinator::new(
            OrderService::new(repository.clone()),
            cart.clone(),
            catalog.clone(),
        );

        Self {
            coordinator,
            repository,
            cart,
            catalog,
        }
    }

    async fn with_variant(self, id: i64, name: &str, price: Money, stock: i32) -> Self {
        self.catalog
            .add_variant(VariantPriceStock::new(id, name, price, stock))
            .await;
        self
    }

    async fn with_cart(self, lines: Vec<CartLine>) -> Self {
        self.cart.set_cart(USER, lines).await;
        self
    }

    fn caller() -> CallerContext {
        CallerContext::new(USER).with_authorization("Bearer token")
    }
}

fn details() -> CheckoutDetails {
    CheckoutDetails {
        shipping_address: Address {
            street: "12 Harbour Road".to_string(),
            address_line2: Some("Flat 3".to_string()),
            city: "Portsmouth".to_string(),
            state_or_province: "Hampshire".to_string(),
            postal_code: "PO1 2AB".to_string(),
            country: "UK".to_string(),
            contact_phone: "+44 23 9200 0000".to_string(),
        },
        billing_address: None,
        customer_email: "sam@example.com".to_string(),
        customer_name: "Sam Lee".to_string(),
        payment_method: "card".to_string(),
        shipping_method: Some("standard".to_string()),
    }
}

#[tokio::test]
async fn test_happy_path_creates_order_commits_stock_and_clears_cart() {
    let h = TestHarness::new()
        .with_variant(7, "Silk Scarf", Money::new(dec!(19.99)), 3)
        .await
        .with_cart(vec![CartLine::new(7, 1)])
        .await;

    let report = h
        .coordinator
        .create_order_with_report(TestHarness::caller(), details())
        .await;
    let order = report.result.unwrap();

    assert!(order.id().is_some());
    assert_eq!(order.user_id(), UserId::new(USER));
    assert_eq!(order.total_amount(), Money::new(dec!(19.99)));
    assert_eq!(order.status(), OrderStatus::PendingPayment);
    assert_eq!(order.payment_status(), PaymentStatus::Pending);
    assert_eq!(order.items().len(), 1);
    assert_eq!(order.items()[0].product_name, "Silk Scarf");
    assert!(order.status_logs().is_empty());
    assert_eq!(order.billing_address(), order.shipping_address());

    assert_eq!(h.catalog.stock_of(7).await, Some(2));
    assert!(h.cart.cart(USER).await.is_none());
    assert_eq!(h.repository.order_count().await, 1);

    assert_eq!(report.run.state(), SagaState::Completed);
    assert_eq!(
        report.run.completed_steps(),
        &[
            STEP_FETCH_CART,
            STEP_FETCH_CATALOG,
            STEP_PRICE_LINES,
            STEP_PERSIST_ORDER,
            STEP_COMMIT_STOCK,
            STEP_CLEAR_CART
        ]
    );
    assert!(report.run.id().is_some());
}

#[tokio::test]
async fn test_total_is_sum_of_catalog_price_times_quantity() {
    let mut stale = CartLine::new(1, 2);
    stale.unit_price = Some(Money::from_cents(100));

    let h = TestHarness::new()
        .with_variant(1, "Mug", Money::from_cents(899), 10)
        .await
        .with_variant(2, "Plate", Money::from_cents(1250), 10)
        .await
        .with_variant(3, "Bowl", Money::new(dec!(4.333)), 10)
        .await
        .with_cart(vec![stale, CartLine::new(2, 1), CartLine::new(3, 3)])
        .await;

    let order = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap();

    assert_eq!(order.items().len(), 3);
    assert_eq!(order.items()[0].unit_price, Money::from_cents(899));
    assert_eq!(order.items()[2].unit_price, Money::from_cents(433));
    assert_eq!(order.total_amount().amount(), dec!(43.47));
    assert_eq!(order.total_amount(), order.items_total());
    assert_eq!(order.total_quantity(), 6);
}

#[tokio::test]
async fn test_insufficient_stock_has_no_side_effects() {
    let h = TestHarness::new()
        .with_variant(1, "Mug", Money::from_cents(899), 5)
        .await
        .with_variant(2, "Scarf", Money::from_cents(1999), 0)
        .await
        .with_cart(vec![CartLine::new(1, 1), CartLine::new(2, 1)])
        .await;

    let err = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap_err();

    match err {
        SagaError::InsufficientStock {
            variant_id,
            product_name,
            requested,
            available,
        } => {
            assert_eq!(variant_id, VariantId::new(2));
            assert_eq!(product_name, "Scarf");
            assert_eq!(requested, 1);
            assert_eq!(available, 0);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    assert_eq!(h.repository.order_count().await, 0);
    assert!(h.catalog.stock_updates().await.is_empty());
    assert_eq!(h.catalog.stock_of(1).await, Some(5));
    assert!(h.cart.cart(USER).await.is_some());
    assert_eq!(h.cart.clear_calls().await, 0);
}

#[tokio::test]
async fn test_empty_or_missing_cart() {
    let h = TestHarness::new();

    let err = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap_err();
    assert!(matches!(err, SagaError::EmptyCart { user_id } if user_id == UserId::new(USER)));

    let h = h.with_cart(vec![]).await;
    let err = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap_err();
    assert!(matches!(err, SagaError::EmptyCart { .. }));
    assert_eq!(h.catalog.get_calls().await, 0);
    assert_eq!(h.repository.order_count().await, 0);
}

#[tokio::test]
async fn test_unknown_variant_is_product_unavailable() {
    let h = TestHarness::new()
        .with_cart(vec![CartLine::new(99, 1)])
        .await;

    let err = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap_err();

    assert!(
        matches!(err, SagaError::ProductUnavailable { variant_id } if variant_id == VariantId::new(99))
    );
    assert_eq!(h.repository.order_count().await, 0);
}

#[tokio::test]
async fn test_gateway_outages_before_commit_point() {
    let h = TestHarness::new()
        .with_variant(1, "Mug", Money::from_cents(899), 5)
        .await
        .with_cart(vec![CartLine::new(1, 1)])
        .await;

    h.cart.set_fail_on_get(true).await;
    let err = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap_err();
    assert!(matches!(err, SagaError::CartUnavailable(_)));

    h.cart.set_fail_on_get(false).await;
    h.catalog.set_fail_on_get(true).await;
    let err = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap_err();
    assert!(matches!(err, SagaError::CatalogUnavailable(_)));

    assert_eq!(h.repository.order_count().await, 0);
    assert!(h.catalog.stock_updates().await.is_empty());
}

#[tokio::test]
async fn test_stock_commit_failure_marks_order_failed() {
    let h = TestHarness::new()
        .with_variant(1, "Mug", Money::from_cents(899), 5)
        .await
        .with_variant(2, "Plate", Money::from_cents(1250), 5)
        .await
        .with_variant(3, "Bowl", Money::from_cents(650), 5)
        .await
        .with_cart(vec![
            CartLine::new(1, 1),
            CartLine::new(2, 2),
            CartLine::new(3, 1),
        ])
        .await;
    h.catalog.fail_set_stock_for(2).await;

    let report = h
        .coordinator
        .create_order_with_report(TestHarness::caller(), details())
        .await;

    let order_id = match report.result {
        Err(SagaError::StockCommitFailed {
            order_id,
            variant_id,
            ..
        }) => {
            assert_eq!(variant_id, VariantId::new(2));
            order_id
        }
        other => panic!("expected StockCommitFailed, got {other:?}"),
    };

    let stored = h.repository.find_by_id(order_id).await.unwrap().unwrap();
    assert_eq!(stored.status(), OrderStatus::Failed);
    assert_eq!(stored.status_logs().len(), 1);
    assert_eq!(stored.status_logs()[0].changed_by, "system");
    assert_eq!(
        stored.status_logs()[0].previous_status,
        Some(OrderStatus::PendingPayment)
    );

    // First commit went through, the failing one stopped the rest.
    assert_eq!(
        h.catalog.stock_updates().await,
        vec![(VariantId::new(1), 4), (VariantId::new(2), 3)]
    );
    assert_eq!(h.catalog.stock_of(3).await, Some(5));
    assert_eq!(h.cart.clear_calls().await, 0);

    assert_eq!(report.run.state(), SagaState::Failed);
    assert_eq!(report.run.failed_step(), Some(STEP_COMMIT_STOCK));
    assert!(
        report
            .run
            .compensated_steps()
            .contains(&STEP_PERSIST_ORDER.to_string())
    );
}

#[tokio::test]
async fn test_cart_clear_failure_still_succeeds() {
    let h = TestHarness::new()
        .with_variant(1, "Mug", Money::from_cents(899), 5)
        .await
        .with_cart(vec![CartLine::new(1, 2)])
        .await;
    h.cart.set_fail_on_clear(true).await;

    let report = h
        .coordinator
        .create_order_with_report(TestHarness::caller(), details())
        .await;

    let order = report.result.unwrap();
    assert_eq!(order.status(), OrderStatus::PendingPayment);
    assert_eq!(h.catalog.stock_of(1).await, Some(3));
    assert!(h.cart.cart(USER).await.is_some());
    assert_eq!(report.run.state(), SagaState::Completed);
    assert_eq!(report.run.skipped_steps(), &[STEP_CLEAR_CART]);
}

#[tokio::test]
async fn test_persist_failure_skips_stock_commit() {
    let h = TestHarness::new()
        .with_variant(1, "Mug", Money::from_cents(899), 5)
        .await
        .with_cart(vec![CartLine::new(1, 1)])
        .await;
    h.repository.set_fail_on_save(true).await;

    let err = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SagaError::Domain(DomainError::Store(StoreError::Backend(_)))
    ));
    assert!(h.catalog.stock_updates().await.is_empty());
    assert_eq!(h.cart.clear_calls().await, 0);
}

#[tokio::test]
async fn test_invalid_details_make_no_remote_calls() {
    let h = TestHarness::new()
        .with_variant(1, "Mug", Money::from_cents(899), 5)
        .await
        .with_cart(vec![CartLine::new(1, 1)])
        .await;
    let mut bad = details();
    bad.customer_email = "not-an-email".to_string();
    bad.shipping_address.city = "  ".to_string();

    let report = h
        .coordinator
        .create_order_with_report(TestHarness::caller(), bad)
        .await;

    match report.result {
        Err(SagaError::Validation(OrderError::Validation(violations))) => {
            assert_eq!(violations.len(), 2);
        }
        other => panic!("expected Validation, got {other:?}"),
    }
    assert_eq!(report.run.state(), SagaState::NotStarted);
    assert_eq!(h.cart.get_calls().await, 0);
    assert_eq!(h.catalog.get_calls().await, 0);
}

#[tokio::test]
async fn test_duplicate_variant_lines_commit_cumulative_stock() {
    let h = TestHarness::new()
        .with_variant(1, "Mug", Money::from_cents(899), 5)
        .await
        .with_cart(vec![CartLine::new(1, 2), CartLine::new(1, 3)])
        .await;

    let order = h
        .coordinator
        .create_order(TestHarness::caller(), details())
        .await
        .unwrap();

    assert_eq!(order.items().len(), 2);
    assert_eq!(h.catalog.get_calls().await, 1);
    assert_eq!(h.catalog.stock_of(1).await, Some(0));
}
