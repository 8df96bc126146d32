//! # sagitta-core
//!
//! Shared plumbing for the Sagitta crates:
//!
//! - [`logging`]: `tracing` subscriber initialisation (compact or JSON) and an
//!   in-memory capture layer used by tests to assert on emitted diagnostics.

#![deny(unsafe_code)]

pub mod logging;
