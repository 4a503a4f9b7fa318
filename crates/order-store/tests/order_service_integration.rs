//! Order service behaviour against the in-memory repository.

use common::{OrderId, PageRequest, UserId};
use domain::{
    Address, CheckoutDetails, DomainError, Money, Order, OrderError, OrderFilter, OrderItem,
    OrderRepository, OrderService, OrderStatus,
};
use order_store::InMemoryOrderRepository;

fn details() -> CheckoutDetails {
    CheckoutDetails {
        shipping_address: Address {
            street: "1 Main St".to_string(),
            address_line2: None,
            city: "Springfield".to_string(),
            state_or_province: "IL".to_string(),
            postal_code: "62701".to_string(),
            country: "US".to_string(),
            contact_phone: "5551234567".to_string(),
        },
        billing_address: None,
        customer_email: "jane@example.com".to_string(),
        customer_name: "Jane".to_string(),
        payment_method: "card".to_string(),
        shipping_method: None,
    }
}

async fn setup(user: i64) -> (OrderService<InMemoryOrderRepository>, OrderId) {
    let repo = InMemoryOrderRepository::new();
    let order = Order::place(
        UserId::new(user),
        &details(),
        vec![OrderItem::new(1, "Lamp", 1, Money::from_cents(4999))],
    )
    .unwrap();
    let id = repo.save(order).await.unwrap().id().unwrap();
    (OrderService::new(repo), id)
}

mod transitions {
    use super::*;

    #[tokio::test]
    async fn each_transition_adds_exactly_one_log() {
        let (service, id) = setup(1).await;

        for (step, status) in ["Paid", "processing", "SHIPPED", "Delivered"].iter().enumerate() {
            let before = service.get_order(id).await.unwrap().status();
            let order = service.transition(id, status, "admin").await.unwrap();
            assert_eq!(order.status_logs().len(), step + 1);
            let log = order.status_logs().last().unwrap();
            assert_eq!(log.previous_status, Some(before));
            assert_eq!(log.changed_by, "admin");
            assert!(log.id.is_some());
        }

        let order = service.get_order(id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn same_status_is_idempotent() {
        let (service, id) = setup(1).await;
        let saves_before = service.repository().save_count().await;

        let order = service.transition(id, "PendingPayment", "admin").await.unwrap();
        assert!(order.status_logs().is_empty());
        assert_eq!(service.repository().save_count().await, saves_before);
    }

    #[tokio::test]
    async fn paid_to_shipped_is_illegal() {
        let (service, id) = setup(1).await;
        service.transition(id, "Paid", "admin").await.unwrap();

        let err = service.transition(id, "Shipped", "admin").await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Order(OrderError::IllegalTransition {
                from: OrderStatus::Paid,
                to: OrderStatus::Shipped
            })
        ));
        let order = service.get_order(id).await.unwrap();
        assert_eq!(order.status(), OrderStatus::Paid);
        assert_eq!(order.status_logs().len(), 1);
    }

    #[tokio::test]
    async fn terminal_statuses_stay_terminal() {
        for terminal in ["Cancelled", "Refunded"] {
            let (service, id) = setup(1).await;
            if terminal == "Refunded" {
                for step in ["Paid", "RefundPending", "Refunded"] {
                    service.transition(id, step, "admin").await.unwrap();
                }
            } else {
                service.transition(id, terminal, "admin").await.unwrap();
            }

            for target in OrderStatus::ALL {
                if target.as_str() == terminal {
                    continue;
                }
                let result = service.transition(id, target.as_str(), "admin").await;
                assert!(matches!(
                    result,
                    Err(DomainError::Order(OrderError::IllegalTransition { .. }))
                ));
            }
        }
    }

    #[tokio::test]
    async fn custom_note_is_recorded() {
        let (service, id) = setup(1).await;
        let order = service
            .transition_with_note(id, "Cancelled", "admin", Some("customer request".into()))
            .await
            .unwrap();
        assert_eq!(
            order.status_logs()[0].notes.as_deref(),
            Some("customer request")
        );
    }

    #[tokio::test]
    async fn store_failure_surfaces() {
        let (service, id) = setup(1).await;
        service.repository().set_fail_on_save(true).await;

        let err = service.transition(id, "Paid", "admin").await.unwrap_err();
        assert!(matches!(err, DomainError::Store(_)));
    }
}

mod notes_and_reads {
    use super::*;

    #[tokio::test]
    async fn add_note_appends_without_status_change() {
        let (service, id) = setup(1).await;
        let order = service.add_note(id, "fragile", "admin").await.unwrap();
        assert_eq!(order.status(), OrderStatus::PendingPayment);
        assert_eq!(order.status_logs().len(), 1);
        assert_eq!(
            order.status_logs()[0].notes.as_deref(),
            Some("Admin Note: fragile")
        );
    }

    #[tokio::test]
    async fn add_note_to_missing_order() {
        let (service, _) = setup(1).await;
        let err = service
            .add_note(OrderId::new(77), "hello", "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn listing_by_user_and_filter() {
        let (service, id) = setup(1).await;
        service.transition(id, "Paid", "admin").await.unwrap();

        let mine = service
            .list_orders_for_user(UserId::new(1), PageRequest::new(0, 10))
            .await
            .unwrap();
        assert_eq!(mine.total_elements, 1);

        let theirs = service
            .list_orders_for_user(UserId::new(2), PageRequest::new(0, 10))
            .await
            .unwrap();
        assert!(theirs.content.is_empty());

        let paid = service
            .list_orders(
                OrderFilter::all().with_status(OrderStatus::Paid),
                PageRequest::default(),
            )
            .await
            .unwrap();
        assert_eq!(paid.content.len(), 1);
    }
}

mod concurrent_writers {
    use std::sync::Arc;

    use async_trait::async_trait;
    use common::Page;
    use domain::StoreError;
    use tokio::sync::Barrier;

    use super::*;

    /// Holds every reader after `find_by_id` until the other one has read too,
    /// so both writers act on the same version.
    #[derive(Clone)]
    struct LockstepRepository {
        inner: InMemoryOrderRepository,
        barrier: Arc<Barrier>,
    }

    #[async_trait]
    impl OrderRepository for LockstepRepository {
        async fn save(&self, order: Order) -> Result<Order, StoreError> {
            self.inner.save(order).await
        }

        async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
            let found = self.inner.find_by_id(id).await;
            self.barrier.wait().await;
            found
        }

        async fn find_by_id_and_user_id(
            &self,
            id: OrderId,
            user_id: UserId,
        ) -> Result<Option<Order>, StoreError> {
            self.inner.find_by_id_and_user_id(id, user_id).await
        }

        async fn find_all(
            &self,
            filter: OrderFilter,
            page: PageRequest,
        ) -> Result<Page<Order>, StoreError> {
            self.inner.find_all(filter, page).await
        }
    }

    async fn paid_order() -> (InMemoryOrderRepository, OrderService<LockstepRepository>, OrderId) {
        let (service, id) = setup(1).await;
        service.transition(id, "Paid", "admin").await.unwrap();
        let inner = service.repository().clone();
        let racing = OrderService::new(LockstepRepository {
            inner: inner.clone(),
            barrier: Arc::new(Barrier::new(2)),
        });
        (inner, racing, id)
    }

    fn is_conflict(err: &DomainError) -> bool {
        matches!(err, DomainError::Store(StoreError::ConcurrencyConflict { .. }))
    }

    #[tokio::test]
    async fn racing_transitions_keep_exactly_one() {
        let (inner, service, id) = paid_order().await;

        let (cancel, process) = tokio::join!(
            service.transition(id, "Cancelled", "alice"),
            service.transition(id, "Processing", "bob"),
        );

        let (winner, actor) = match (&cancel, &process) {
            (Ok(order), Err(err)) if is_conflict(err) => (order.status(), "alice"),
            (Err(err), Ok(order)) if is_conflict(err) => (order.status(), "bob"),
            other => panic!("expected one success and one conflict, got {other:?}"),
        };

        let stored = inner.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status(), winner);
        assert_eq!(stored.status_logs().len(), 2);
        let last = stored.status_logs().last().unwrap();
        assert_eq!(last.previous_status, Some(OrderStatus::Paid));
        assert_eq!(last.new_status, winner);
        assert_eq!(last.changed_by, actor);
    }

    #[tokio::test]
    async fn note_racing_a_transition_is_not_lost_silently() {
        let (inner, service, id) = paid_order().await;

        let (noted, processed) = tokio::join!(
            service.add_note(id, "customer called", "carol"),
            service.transition(id, "Processing", "dave"),
        );

        let succeeded = [noted.is_ok(), processed.is_ok()];
        assert_eq!(succeeded.iter().filter(|ok| **ok).count(), 1);
        let failure = noted.err().or(processed.err()).unwrap();
        assert!(is_conflict(&failure));

        let stored = inner.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status_logs().len(), 2);
        assert_eq!(stored.version(), 3);
    }
}
