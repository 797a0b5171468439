//! Incremental JSON object extractor
//!
//! Scans streamed narration text for complete top-level `{...}` objects and
//! emits each one that parses as a valid [`RecommendationItem`], without ever
//! buffering the whole stream.
//!
//! The scanner counts raw brace characters and does not know about braces
//! inside JSON string literals. That keeps it a best-effort extractor rather
//! than a strict JSON-stream parser: a brace inside a description can shift
//! an object boundary, and the resulting slice then simply fails to parse
//! and is dropped. Acceptable noise, not a correctness bug.

use futures_util::StreamExt;

use crate::error::PlanError;
use crate::streaming::{RawChunkStream, RecommendationStream};
use crate::types::RecommendationItem;

/// Push-driven object scanner. Feed it text fragments in order; it returns
/// the items completed by each fragment.
///
/// Invariant: each completed object is emitted at most once per scanner
/// pass. Scanning never revisits consumed input, and a slice that fails to
/// parse is discarded, not retried.
#[derive(Debug, Default)]
pub struct ObjectScanner {
    buffer: String,
    /// Byte offset up to which `buffer` has been scanned.
    scan_pos: usize,
    inside_object: bool,
    depth: usize,
    /// Byte offset where the current object started, valid while
    /// `inside_object`.
    start: usize,
}

impl ObjectScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment and return every item it completed.
    pub fn push(&mut self, text: &str) -> Vec<RecommendationItem> {
        self.buffer.push_str(text);
        let mut items = Vec::new();

        for (off, ch) in self.buffer[self.scan_pos..].char_indices() {
            let pos = self.scan_pos + off;
            match ch {
                '{' => {
                    if !self.inside_object {
                        self.inside_object = true;
                        self.start = pos;
                    }
                    self.depth += 1;
                }
                '}' if self.inside_object => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let slice = &self.buffer[self.start..=pos];
                        if let Some(item) = parse_candidate(slice) {
                            items.push(item);
                        }
                        self.inside_object = false;
                    }
                }
                _ => {}
            }
        }
        self.scan_pos = self.buffer.len();

        // Drop consumed input so an unbounded stream stays bounded: keep
        // nothing between objects, keep only the open object while inside one.
        if !self.inside_object {
            self.buffer.clear();
            self.scan_pos = 0;
        } else if self.start > 0 {
            self.buffer.drain(..self.start);
            self.scan_pos -= self.start;
            self.start = 0;
        }

        items
    }

    /// Whether an object is still open. At stream end an open object is
    /// simply dropped: it never closed, so it is never emitted.
    pub fn has_partial_object(&self) -> bool {
        self.inside_object
    }
}

fn parse_candidate(slice: &str) -> Option<RecommendationItem> {
    match serde_json::from_str::<RecommendationItem>(slice) {
        Ok(item) if item.is_valid() => Some(item),
        Ok(item) => {
            tracing::trace!(name = %item.name, "discarding recommendation with empty required field");
            None
        }
        Err(e) => {
            tracing::trace!(error = %e, "discarding unparseable object fragment");
            None
        }
    }
}

/// Drive a text stream to completion, invoking `on_item` for every
/// validated recommendation. Callback flavour of [`extract_items`] for
/// callers that push items straight to a sink.
pub async fn extract_objects<F>(mut text: RawChunkStream, mut on_item: F) -> Result<(), PlanError>
where
    F: FnMut(RecommendationItem) + Send,
{
    let mut scanner = ObjectScanner::new();
    while let Some(chunk) = text.next().await {
        for item in scanner.push(&chunk?) {
            on_item(item);
        }
    }
    Ok(())
}

/// Wrap a text stream into a stream of validated recommendation items.
///
/// Upstream errors are forwarded and terminate the stream; any partial
/// object accumulated at that point is discarded.
pub fn extract_items(mut text: RawChunkStream) -> RecommendationStream {
    let out = async_stream::stream! {
        let mut scanner = ObjectScanner::new();
        while let Some(chunk) = text.next().await {
            match chunk {
                Ok(fragment) => {
                    for item in scanner.push(&fragment) {
                        yield Ok(item);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        if scanner.has_partial_object() {
            tracing::trace!("dropping unterminated object at stream end");
        }
    };
    Box::pin(out)
}
