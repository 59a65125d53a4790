//! # colstore
//!
//! A partitioned document-collection store with an HTTP administration
//! service:
//! - Named collections split across a fixed number of partition files
//! - Create / list / rename / drop / scrub / repartition / flush over HTTP
//! - One global lock that totally orders every administrative operation
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HTTP Server (axum)                       │
//! │              (one task per admin request)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  AdminRequest (named parameters)
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Collection Service                          │
//! │      validate ──► lock ──► store call ──► Reply/Error        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Mutex<S: CollectionStore>
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Database                                │
//! │            (collection directory: name → Collection)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼────────────┐
//!          ▼            ▼            ▼
//!   ┌───────────┐ ┌───────────┐ ┌───────────┐
//!   │  part.0   │ │  part.1   │ │  part.N   │
//!   └───────────┘ └───────────┘ └───────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod engine;
pub mod admin;
pub mod service;
pub mod http;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{StoreError, Result};
pub use config::Config;
pub use engine::{CollectionStore, Database};
pub use service::CollectionService;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of colstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
