//! Report assembly and rendering.

pub mod generator;

pub use generator::*;
