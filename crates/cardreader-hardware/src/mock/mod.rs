//! Mock link implementations for testing and development.
//!
//! This module provides a simulated reader link that can be driven
//! programmatically without requiring physical hardware.

pub mod stream;

// Re-export commonly used types
pub use stream::{MockSink, MockSource, MockStream, MockStreamHandle, WriteRecord};
