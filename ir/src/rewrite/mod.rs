//! Graph rewriting.

pub mod engine;

pub use engine::{ResultMap, rewrite_bottom_up};
