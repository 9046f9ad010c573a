//! Application layer module
//!
//! Orchestrates the domain logic: bounded fan-out of remote calls, retrying
//! cancellation, progress publishing, the session object that ties the
//! phases together, and the on-sale product listing.

pub mod concurrency;
pub mod progress;
pub mod batch_query;
pub mod batch_cancel;
pub mod batch_session;
pub mod product_listing;

#[cfg(test)]
pub(crate) mod testing;

pub use concurrency::{ConcurrencyController, ConcurrencyError, TaskOutcome};
pub use progress::{ProgressReceiver, ProgressTracker};
pub use batch_query::{BatchQueryOrchestrator, BatchQueryResult, ProductQueryFailure};
pub use batch_cancel::{BatchCancelOrchestrator, BatchCancelReport, CancelError, RetryPolicy};
pub use batch_session::{BatchSession, SessionError, SessionSettings};
pub use product_listing::{ListingError, ProductListing};
