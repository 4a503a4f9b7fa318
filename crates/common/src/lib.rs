//! Shared identifiers and pagination types for the order service.

pub mod page;
pub mod types;

pub use page::{MAX_PAGE_SIZE, Page, PageRequest, SortDirection};
pub use types::{OrderId, UserId, VariantId};
