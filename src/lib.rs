//! Activity Canceller - batch withdrawal of promotional activity enrollments
//!
//! Parses product ids, queries their activity enrollments on the seller portal
//! with bounded concurrency, groups the results by activity, and cancels the
//! selected enrollments with retry.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::{BatchCancelReport, BatchSession, ProductListing, SessionError, SessionSettings};
pub use domain::{ActivityApi, ExportSink, ProductCatalogApi, parse_spu_input};
