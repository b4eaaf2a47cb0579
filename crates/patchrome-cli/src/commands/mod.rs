//! CLI command implementations.

pub mod common;
pub mod diff;
pub mod processors;
pub mod render;
pub mod topology;
pub mod validate;
