//! Core Streaming Types
//!
//! Defines the stream aliases and events flowing out of the transducer and
//! extractor. All provider adapters produce a [`RawChunkStream`]; everything
//! downstream is written once against that alias.

use futures::Stream;
use std::pin::Pin;

use crate::error::PlanError;
use crate::types::RecommendationItem;

/// Raw provider output: ordered text fragments with no size guarantee.
/// This is the only contract a backend adapter has to satisfy.
pub type RawChunkStream = Pin<Box<dyn Stream<Item = Result<String, PlanError>> + Send>>;

/// Events produced by the delimiter transducer, in order: zero or more
/// `Narration` deltas, at most one `PayloadStart`, exactly one terminal
/// `StreamEnd`.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanStreamEvent {
    /// Human-readable narration text, safe to display as it arrives.
    Narration { delta: String },
    /// The sentinel delimiter was found; subsequent text accumulates into
    /// the structured payload and is no longer narration.
    PayloadStart,
    /// Stream finished. `payload` is the raw text after the delimiter,
    /// empty if the delimiter was never seen (narration-only response).
    StreamEnd { payload: String },
}

/// Plan Stream - the transduced view of one provider response.
pub type PlanStream = Pin<Box<dyn Stream<Item = Result<PlanStreamEvent, PlanError>> + Send>>;

/// Stream of validated recommendation items from the incremental extractor.
pub type RecommendationStream =
    Pin<Box<dyn Stream<Item = Result<RecommendationItem, PlanError>> + Send>>;

/// Plan stream with first-class cancellation handle, for callers that may
/// close the view while a response is still streaming.
pub struct PlanStreamHandle {
    /// The underlying plan stream
    pub stream: PlanStream,
    /// Handle to cancel the stream
    pub cancel: crate::utils::cancel::CancelHandle,
}
