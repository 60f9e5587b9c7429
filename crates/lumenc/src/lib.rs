//! The Lumen compiler driver.
//!
//! Consumes parsed modules, runs the full front half -- prefixing,
//! declaration collection, per-declaration inference with poisoned-scheme
//! recovery, class/instance registration -- then monomorphizes from the
//! entry point and lowers to the typed IR. Errors accumulate per
//! declaration; one bad definition never stops the rest of the unit from
//! being checked.

pub mod dump;
pub mod pipeline;
pub mod render;

pub use pipeline::{Compilation, Driver};
