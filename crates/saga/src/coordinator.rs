//! Checkout coordinator: turns a cart into a persisted order.

use std::time::Instant;

use domain::{CheckoutDetails, Order, OrderRepository, OrderService};

use crate::checkout::{
    CheckoutContext, ClearCart, CommitStock, FetchCart, FetchCatalog, PersistOrder, PriceLines,
    SAGA_TYPE,
};
use crate::error::SagaError;
use crate::run::SagaRun;
use crate::services::{CallerContext, CartGateway, CatalogGateway};
use crate::step::{Saga, SagaOutcome};

/// The outcome of a checkout together with the saga trail that produced it.
#[derive(Debug)]
pub struct CheckoutReport {
    pub result: Result<Order, SagaError>,
    /// Empty (`NotStarted`) when the request was rejected before the saga ran.
    pub run: SagaRun,
}

/// Orchestrates checkout across the cart service, the catalog and the order store.
///
/// Each remote call is attempted once. Failures before the order is stored
/// leave no side effects. A stock failure after the order is stored marks the
/// order `Failed` and is reported as [`SagaError::StockCommitFailed`].
pub struct CheckoutCoordinator<R, K, C>
where
    R: OrderRepository,
    K: CartGateway,
    C: CatalogGateway,
{
    orders: OrderService<R>,
    cart: K,
    catalog: C,
}

impl<R, K, C> CheckoutCoordinator<R, K, C>
where
    R: OrderRepository,
    K: CartGateway,
    C: CatalogGateway,
{
    pub fn new(orders: OrderService<R>, cart: K, catalog: C) -> Self {
        Self {
            orders,
            cart,
            catalog,
        }
    }

    pub fn order_service(&self) -> &OrderService<R> {
        &self.orders
    }

    pub fn cart_gateway(&self) -> &K {
        &self.cart
    }

    pub fn catalog_gateway(&self) -> &C {
        &self.catalog
    }

    /// Creates an order from the caller's cart.
    pub async fn create_order(
        &self,
        caller: CallerContext,
        details: CheckoutDetails,
    ) -> Result<Order, SagaError> {
        self.create_order_with_report(caller, details).await.result
    }

    /// Same as [`create_order`](Self::create_order), also returning the saga trail.
    #[tracing::instrument(
        skip(self, caller, details),
        fields(saga_type = SAGA_TYPE, user_id = %caller.user_id)
    )]
    pub async fn create_order_with_report(
        &self,
        caller: CallerContext,
        details: CheckoutDetails,
    ) -> CheckoutReport {
        metrics::counter!("checkout_attempts_total").increment(1);
        let start = Instant::now();

        if let Err(e) = details.validate() {
            tracing::info!(error = %e, "checkout rejected");
            return Self::finish(start, Err(SagaError::Validation(e)), SagaRun::default());
        }

        let mut ctx = CheckoutContext::new(caller, details);
        let saga = Saga::<CheckoutContext>::new(SAGA_TYPE)
            .step(FetchCart { cart: &self.cart })
            .step(FetchCatalog {
                catalog: &self.catalog,
            })
            .step(PriceLines)
            .step(PersistOrder {
                orders: &self.orders,
            })
            .step(CommitStock {
                catalog: &self.catalog,
            })
            .step(ClearCart { cart: &self.cart });

        let SagaOutcome { run, error } = saga.run(&mut ctx).await;
        let result = match error {
            Some(err) => Err(err),
            None => ctx.order.take().ok_or(SagaError::MissingStepOutput("order")),
        };

        Self::finish(start, result, run)
    }

    fn finish(start: Instant, result: Result<Order, SagaError>, run: SagaRun) -> CheckoutReport {
        metrics::histogram!("checkout_duration_seconds").record(start.elapsed().as_secs_f64());

        match &result {
            Ok(order) => {
                metrics::counter!("orders_created_total").increment(1);
                tracing::info!(
                    order_id = ?order.id(),
                    run_id = ?run.id(),
                    items = order.items().len(),
                    total = %order.total_amount(),
                    "order created"
                );
            }
            Err(err) => {
                metrics::counter!("checkout_failures_total", "reason" => err.kind()).increment(1);
                tracing::warn!(
                    run_id = ?run.id(),
                    failed_step = ?run.failed_step(),
                    reason = err.kind(),
                    error = %err,
                    "checkout failed"
                );
            }
        }

        CheckoutReport { result, run }
    }
}
