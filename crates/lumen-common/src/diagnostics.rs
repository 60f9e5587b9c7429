//! User-facing diagnostics.
//!
//! A `UserError` carries a primary location and message plus an ordered
//! list of secondary annotations. Errors do not abort compilation; the
//! driver accumulates them per top-level declaration and keeps going.

use std::fmt;

use serde::Serialize;

use crate::location::Location;

/// A secondary annotation attached to a `UserError`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorInfo {
    pub location: Location,
    pub message: String,
}

/// A structured, user-facing compile error.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserError {
    pub location: Location,
    pub message: String,
    /// Secondary notes, in the order they were attached.
    pub infos: Vec<ErrorInfo>,
}

impl UserError {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        UserError { location, message: message.into(), infos: Vec::new() }
    }

    /// Attach a secondary note. Notes render in attachment order.
    pub fn add_info(&mut self, location: Location, message: impl Into<String>) -> &mut Self {
        self.infos.push(ErrorInfo { location, message: message.into() });
        self
    }

    /// Builder-style variant of [`add_info`](Self::add_info).
    pub fn with_info(mut self, location: Location, message: impl Into<String>) -> Self {
        self.add_info(location, message);
        self
    }
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error: {}", self.location, self.message)?;
        for info in &self.infos {
            write!(f, "\n{}: note: {}", info.location, info.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for UserError {}
