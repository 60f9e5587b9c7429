//! Monomorphization and typed IR for the Lumen compiler.
//!
//! The translator specializes polymorphic definitions for each concrete
//! type they are used at, driven by a worklist of needed definitions.
//! Pattern matches are checked for exhaustiveness over a pattern lattice
//! and compiled into decision trees; the result is lowered to a
//! control-flow-graph IR with no free type variables anywhere.

pub mod defn;
pub mod error;
pub mod ir;
pub mod lower;
pub mod pattern;
pub mod texpr;
pub mod translate;

pub use defn::{DefnId, DefnKey, DefnRef, NeededDefns};
pub use error::MonoError;
pub use ir::{Arena, Block, BlockId, Program, Value, ValueId};
pub use lower::lower_program;
pub use translate::{monomorphize, CheckedDecl, MonoEnv, Monomorphized};
