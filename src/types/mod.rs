//! Core Types Module
//!
//! Wire-format types shared by the planning and recommendation pipelines.
//! Everything serializes camelCase to match the documents the AI backends
//! are prompted to produce.

mod recommendation;
mod trip;

pub use recommendation::*;
pub use trip::*;
