//! Streaming Module
//!
//! Provider-agnostic stream processing shared by every backend adapter:
//! - Plan stream types and events
//! - The narration/payload delimiter transducer
//! - The incremental JSON object extractor

mod extractor;
mod transducer;
mod types;

pub use extractor::*;
pub use transducer::*;
pub use types::*;
