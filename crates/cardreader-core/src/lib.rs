//! Core types for the card reader link.
//!
//! This crate holds everything the protocol and listener layers share:
//! the error taxonomy, wire-level constants, tag identifiers and the tag
//! registry, and the byte stream traits that abstract the serial link.

pub mod constants;
pub mod error;
pub mod registry;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use registry::TagRegistry;
pub use stream::{ByteSink, ByteSource, ByteStream};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
