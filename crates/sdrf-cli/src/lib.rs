//! CLI library components for the SDRF annotator.

pub mod logging;
pub mod runtime;
