//! Admin Module
//!
//! Transport-independent pieces of the administrative surface.
//!
//! - [`AdminRequest`]: named string parameters of one request
//! - [`Reply`]: successful outcome of an operation
//! - [`ControlError`]: failed outcome, tagged with an [`ErrorKind`]
//!
//! The HTTP layer in [`crate::http`] turns these into responses.

mod error;
mod reply;
mod request;

pub use error::{ControlError, ControlResult, ErrorKind};
pub use reply::{CollectionSummary, Listing, Reply};
pub use request::{parse_partition_count, AdminRequest};
