//! Built-in function implementations

pub mod error;
pub mod generator;

pub use error::*;
pub use generator::*;
