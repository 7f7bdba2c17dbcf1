//! Sink implementations

pub mod console;
pub mod rotating_file;

pub use console::ConsoleSink;
pub use rotating_file::{RotateCallback, RotatingFileSink, RotationPolicy};

// Re-export the trait next to its implementations
pub use crate::core::Sink;
