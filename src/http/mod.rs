//! HTTP Module
//!
//! Axum transport for the admin service.
//!
//! ## Architecture
//! - One route per admin operation, answering GET, POST and PUT
//! - Parameters come from the query string and form-encoded bodies
//! - Handlers hop onto the blocking pool; the service lock is synchronous
//! - Every response carries `Cache-Control: must-revalidate`

mod extract;
mod handlers;
mod response;
mod server;

pub use server::{router, Server};
