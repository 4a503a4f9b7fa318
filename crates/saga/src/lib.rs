//! Checkout saga for the order service.
//!
//! Creating an order spans the cart service, the product catalog and the
//! order store. The saga runs an ordered list of steps, each with a failure
//! policy and an optional compensation:
//! 1. Fetch the caller's cart
//! 2. Fetch catalog price and stock
//! 3. Validate and price each line
//! 4. Persist the order
//! 5. Commit stock
//! 6. Clear the cart
//!
//! If a step fails, completed steps are compensated in reverse order.

pub mod checkout;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod run;
pub mod services;
pub mod step;

pub use coordinator::{CheckoutCoordinator, CheckoutReport};
pub use error::{GatewayError, SagaError};
pub use events::SagaEvent;
pub use run::{SagaRun, SagaState};
pub use services::{
    CallerContext, CartGateway, CartLine, CartSnapshot, CatalogGateway, HttpCartGateway,
    HttpCatalogGateway, InMemoryCartGateway, InMemoryCatalogGateway, StockLevel,
    VariantPriceStock,
};
pub use step::{OnFailure, Saga, SagaOutcome, SagaStep};
