//! Plan pipeline
//!
//! Drives one provider response end to end: open the stream, transduce it
//! into narration plus payload, parse the payload as a trip patch and merge
//! it into the caller's document.
//!
//! Parse failures after the delimiter are deliberately not errors: the
//! narration was genuine output and stands alone, the response simply
//! produced no patch. Transport failures do propagate, as recoverable
//! errors; retrying is the caller's decision.

use futures_util::StreamExt;

use crate::error::PlanError;
use crate::merge::merge;
use crate::providers::{PlanRequest, ProviderAdapter};
use crate::streaming::{PlanStream, PlanStreamEvent, UPDATE_DELIMITER, transduce};
use crate::types::{TripDocument, TripPatch};

/// Result of a fully consumed plan stream.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Concatenated narration text, as it was shown live.
    pub narration: String,
    /// The parsed patch, if the payload contained one.
    pub patch: Option<TripPatch>,
    /// The merged document (a clone of the original when no patch applied).
    pub document: TripDocument,
}

/// Parse the raw payload text into a patch. Empty or unparseable payloads
/// yield `None`: prefer showing partial success over surfacing a parser
/// failure to the end user.
pub fn parse_patch(payload: &str) -> Option<TripPatch> {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<TripPatch>(trimmed) {
        Ok(patch) => Some(patch),
        Err(e) => {
            tracing::warn!(error = %e, "payload did not parse as a trip patch; keeping narration only");
            None
        }
    }
}

/// Consume a transduced plan stream, forwarding narration deltas to
/// `on_narration` as they arrive, and merge the final payload into
/// `original`.
pub async fn apply_plan_stream<F>(
    original: &TripDocument,
    mut stream: PlanStream,
    mut on_narration: F,
) -> Result<PlanOutcome, PlanError>
where
    F: FnMut(&str) + Send,
{
    let mut narration = String::new();

    while let Some(event) = stream.next().await {
        match event? {
            PlanStreamEvent::Narration { delta } => {
                on_narration(&delta);
                narration.push_str(&delta);
            }
            PlanStreamEvent::PayloadStart => {}
            PlanStreamEvent::StreamEnd { payload } => {
                let patch = parse_patch(&payload);
                let document = match &patch {
                    Some(patch) => merge(original, patch),
                    None => original.clone(),
                };
                return Ok(PlanOutcome {
                    narration,
                    patch,
                    document,
                });
            }
        }
    }

    // The transducer always closes with StreamEnd unless the upstream
    // errored, which the loop already propagated.
    Err(PlanError::StreamError(
        "plan stream ended without completion".to_string(),
    ))
}

/// One-call path from a provider request to a merged document.
pub async fn stream_plan_update<F>(
    adapter: &dyn ProviderAdapter,
    request: &PlanRequest,
    original: &TripDocument,
    on_narration: F,
) -> Result<PlanOutcome, PlanError>
where
    F: FnMut(&str) + Send,
{
    let raw = adapter.open_stream(request).await?;
    let events = transduce(raw, UPDATE_DELIMITER);
    apply_plan_stream(original, events, on_narration).await
}
