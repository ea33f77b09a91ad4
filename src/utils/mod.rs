//! Utils Module - Shared constants and conversions

pub mod constants;

pub use constants::*;
