//! Shared foundation types for the Lumen compiler.
//!
//! Everything in this crate is consumed by every later stage: source
//! locations, identifiers, user-facing diagnostics, and the startup
//! configuration read from the environment.

pub mod config;
pub mod diagnostics;
pub mod ident;
pub mod location;

pub use config::Config;
pub use diagnostics::{ErrorInfo, UserError};
pub use ident::Identifier;
pub use location::Location;
