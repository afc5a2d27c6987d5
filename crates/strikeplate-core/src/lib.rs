//! Shared vocabulary for the strikeplate reader engine.
//!
//! Holds the wire constants of the supported transponder readers, the
//! validated identifier types and the crate-wide configuration error.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
