//! Recommendation Session Module
//!
//! Server-side prepaid quota ledger: sessions are created when a user pays
//! for a batch queue, consumed one credit per "next batch" request, and
//! swept after a fixed TTL.

mod clock;
mod store;

pub use clock::*;
pub use store::*;
