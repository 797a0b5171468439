//! tripflow
//!
//! Streaming itinerary planning core with pluggable generative-AI backends.
//!
//! The crate is the stateful heart of a travel planner: provider adapters
//! (Gemini, Ollama, any OpenAI-compatible endpoint) stream raw text; the
//! [`streaming`] module splits it into live narration and a trailing
//! structured payload and extracts recommendation objects incrementally;
//! [`merge`] folds AI-proposed patches into trip documents; [`session`]
//! meters prepaid recommendation batches; [`prefetch`] keeps "load more"
//! off the network's critical path.
#![deny(unsafe_code)]

pub mod error;
pub mod merge;
pub mod pipeline;
pub mod prefetch;
pub mod providers;
pub mod session;
pub mod streaming;
pub mod types;
pub mod utils;

pub use error::PlanError;
pub use merge::merge;
pub use pipeline::{PlanOutcome, apply_plan_stream, parse_patch, stream_plan_update};
pub use prefetch::{BatchFetcher, PrefetchConfig, PrefetchManager};
pub use providers::{PlanRequest, ProviderAdapter};
pub use session::{Session, SessionStore};
pub use streaming::{
    ObjectScanner, PlanStream, PlanStreamEvent, RawChunkStream, RecommendationStream,
    UPDATE_DELIMITER, extract_items, extract_objects, transduce,
};
pub use types::{RecommendationItem, RecommendationQuery, TripDocument, TripPatch};
