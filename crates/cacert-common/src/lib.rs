//! Shared building blocks for the cacert workspace.

pub mod error;
pub mod paths;
pub mod persist;
