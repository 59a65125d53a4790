//! Admin request parameters

use std::collections::HashMap;

use super::error::{ControlError, ControlResult, ErrorKind};

/// Named string parameters of a single admin request
#[derive(Debug, Clone, Default)]
pub struct AdminRequest {
    params: HashMap<String, String>,
}

impl AdminRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter (builder style, mostly for tests and the CLI)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Get a parameter if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Get a required parameter
    ///
    /// An absent or empty value is a `MissingParameter` error.
    pub fn require(&self, name: &str) -> ControlResult<&str> {
        match self.get(name) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(ControlError::missing_parameter(name)),
        }
    }
}

impl From<HashMap<String, String>> for AdminRequest {
    fn from(params: HashMap<String, String>) -> Self {
        Self { params }
    }
}

/// Parse a partition count as a base-10 integer
///
/// Only the syntax is checked here; the store decides which values are valid.
pub fn parse_partition_count(value: &str) -> ControlResult<i64> {
    value.parse::<i64>().map_err(|_| {
        ControlError::new(
            ErrorKind::MalformedParameter,
            format!("numparts should be an integer, {} given", value),
        )
    })
}
