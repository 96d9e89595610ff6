//! Core types, constants, and geometry for the positioning system

pub mod constants;
pub mod geometry;
pub mod types;

pub use constants::*;
pub use types::*;
