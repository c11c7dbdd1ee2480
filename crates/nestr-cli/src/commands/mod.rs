//! CLI command implementations.

pub mod keys;
pub mod run;
pub mod service;
pub mod status;
