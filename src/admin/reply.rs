//! Admin replies

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{ControlError, ControlResult, ErrorKind};

/// One entry of the collection listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub partitions: usize,
}

/// Collection name → summary
pub type Listing = BTreeMap<String, CollectionSummary>;

/// Successful outcome of an admin operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A collection was created (no body)
    Created,

    /// The operation completed (no body)
    Done,

    /// Encoded collection listing
    Listing(String),
}

impl Reply {
    /// Encode a listing as JSON
    pub fn listing(listing: &Listing) -> ControlResult<Self> {
        serde_json::to_string(listing)
            .map(Reply::Listing)
            .map_err(|e| ControlError::new(ErrorKind::Serialization, e.to_string()))
    }

    /// Response body, if any
    pub fn body(&self) -> Option<&str> {
        match self {
            Reply::Listing(json) => Some(json),
            Reply::Created | Reply::Done => None,
        }
    }
}
