//! mx-core: Shared types and utilities for the Metrix measurement library
//!
//! This crate provides the foundational types used by the mx-dsp meters.

mod error;
mod sample;

pub use error::*;
pub use sample::*;
