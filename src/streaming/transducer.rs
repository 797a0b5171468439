//! Delimiter transducer
//!
//! Splits one provider's raw output stream into a narration channel and a
//! trailing structured payload, keyed on a sentinel delimiter. The state
//! machine is `NARRATING -> ACCUMULATING_PAYLOAD -> COMPLETE`; only the
//! first delimiter occurrence transitions, later occurrences are payload
//! text like any other.
//!
//! The delimiter may straddle chunk boundaries, so while narrating we hold
//! back the longest buffer suffix that is still a proper prefix of the
//! delimiter and flush everything before it.

use futures_util::StreamExt;

use crate::error::PlanError;
use crate::streaming::{PlanStream, PlanStreamEvent, RawChunkStream};

/// Sentinel used by the itinerary update prompts.
pub const UPDATE_DELIMITER: &str = "___UPDATE_JSON___";

/// Length of the buffer suffix that could still grow into `delimiter` once
/// the next chunk arrives. Always less than `delimiter.len()`, and always on
/// a char boundary of `buf`.
fn partial_delimiter_suffix(buf: &str, delimiter: &str) -> usize {
    let max = delimiter.len().saturating_sub(1).min(buf.len());
    for take in (1..=max).rev() {
        let at = buf.len() - take;
        if buf.is_char_boundary(at) && delimiter.as_bytes().starts_with(&buf.as_bytes()[at..]) {
            return take;
        }
    }
    0
}

/// Transduce a raw provider stream into narration events plus one terminal
/// payload.
///
/// Contract:
/// - narration deltas are emitted as text arrives, up to (not including) the
///   first occurrence of `delimiter`;
/// - one `PayloadStart` marks the transition when the delimiter is found;
/// - exactly one `StreamEnd { payload }` closes the stream, with an empty
///   payload when the delimiter was never seen.
///
/// An upstream error is forwarded and terminates the stream without a
/// `StreamEnd`: narration already emitted was genuine output and stands, but
/// no payload is produced.
pub fn transduce(mut raw: RawChunkStream, delimiter: impl Into<String>) -> PlanStream {
    let delimiter = delimiter.into();
    let out = async_stream::stream! {
        if delimiter.is_empty() {
            yield Err(PlanError::InvalidParameter(
                "delimiter must not be empty".to_string(),
            ));
            return;
        }

        // Unflushed narration tail; only ever holds a possible delimiter
        // prefix plus the newest chunk, so memory stays bounded.
        let mut narration = String::new();
        let mut payload = String::new();
        let mut in_payload = false;

        while let Some(chunk) = raw.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            if in_payload {
                payload.push_str(&chunk);
                continue;
            }

            narration.push_str(&chunk);
            if let Some(at) = narration.find(&delimiter) {
                if at > 0 {
                    yield Ok(PlanStreamEvent::Narration {
                        delta: narration[..at].to_string(),
                    });
                }
                payload.push_str(&narration[at + delimiter.len()..]);
                narration.clear();
                in_payload = true;
                yield Ok(PlanStreamEvent::PayloadStart);
            } else {
                let hold = partial_delimiter_suffix(&narration, &delimiter);
                let flush_to = narration.len() - hold;
                if flush_to > 0 {
                    let delta: String = narration.drain(..flush_to).collect();
                    yield Ok(PlanStreamEvent::Narration { delta });
                }
            }
        }

        if !in_payload && !narration.is_empty() {
            yield Ok(PlanStreamEvent::Narration { delta: narration });
        }
        yield Ok(PlanStreamEvent::StreamEnd { payload });
    };
    Box::pin(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_stream(chunks: Vec<&str>) -> RawChunkStream {
        let items: Vec<Result<String, PlanError>> =
            chunks.into_iter().map(|c| Ok(c.to_string())).collect();
        Box::pin(futures_util::stream::iter(items))
    }

    async fn collect(stream: PlanStream) -> Vec<PlanStreamEvent> {
        let mut stream = stream;
        let mut out = Vec::new();
        while let Some(item) = stream.next().await {
            out.push(item.expect("event"));
        }
        out
    }

    fn narration_text(events: &[PlanStreamEvent]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                PlanStreamEvent::Narration { delta } => Some(delta.as_str()),
                _ => None,
            })
            .collect()
    }

    fn final_payload(events: &[PlanStreamEvent]) -> &str {
        match events.last() {
            Some(PlanStreamEvent::StreamEnd { payload }) => payload,
            other => panic!("expected StreamEnd, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn splits_narration_and_payload() {
        let events = collect(transduce(
            chunk_stream(vec![
                "Day one looks great. ",
                "___UPDATE_JSON___",
                r#"{"risks":["rain"]}"#,
            ]),
            UPDATE_DELIMITER,
        ))
        .await;

        assert_eq!(narration_text(&events), "Day one looks great. ");
        assert!(events.contains(&PlanStreamEvent::PayloadStart));
        assert_eq!(final_payload(&events), r#"{"risks":["rain"]}"#);
    }

    #[tokio::test]
    async fn delimiter_straddling_chunks_matches_single_chunk() {
        let whole = collect(transduce(
            chunk_stream(vec!["hello ___UPDATE_JSON___{\"a\":1}"]),
            UPDATE_DELIMITER,
        ))
        .await;
        let split = collect(transduce(
            chunk_stream(vec!["hello ___UPD", "ATE_JS", "ON___{\"a\"", ":1}"]),
            UPDATE_DELIMITER,
        ))
        .await;

        assert_eq!(narration_text(&whole), narration_text(&split));
        assert_eq!(final_payload(&whole), final_payload(&split));
        assert_eq!(narration_text(&split), "hello ");
        assert_eq!(final_payload(&split), "{\"a\":1}");
    }

    #[tokio::test]
    async fn no_delimiter_yields_all_narration_and_empty_payload() {
        let events = collect(transduce(
            chunk_stream(vec!["just ", "thinking ", "aloud"]),
            UPDATE_DELIMITER,
        ))
        .await;

        assert_eq!(narration_text(&events), "just thinking aloud");
        assert!(!events.contains(&PlanStreamEvent::PayloadStart));
        assert_eq!(final_payload(&events), "");
    }

    #[tokio::test]
    async fn underscores_in_narration_are_not_held_forever() {
        // A lone underscore run that never completes the delimiter must
        // still be flushed once the stream ends.
        let events = collect(transduce(
            chunk_stream(vec!["snake_case_names ___", "but no sentinel"]),
            UPDATE_DELIMITER,
        ))
        .await;
        assert_eq!(narration_text(&events), "snake_case_names ___but no sentinel");
        assert_eq!(final_payload(&events), "");
    }

    #[tokio::test]
    async fn second_delimiter_occurrence_is_plain_payload_text() {
        let events = collect(transduce(
            chunk_stream(vec!["n", "___UPDATE_JSON___", "a___UPDATE_JSON___b"]),
            UPDATE_DELIMITER,
        ))
        .await;
        assert_eq!(final_payload(&events), "a___UPDATE_JSON___b");
    }

    #[tokio::test]
    async fn payload_in_same_chunk_as_delimiter_is_captured() {
        let events = collect(transduce(
            chunk_stream(vec!["note ___UPDATE_JSON___{\"days\":[]}"]),
            UPDATE_DELIMITER,
        ))
        .await;
        assert_eq!(narration_text(&events), "note ");
        assert_eq!(final_payload(&events), "{\"days\":[]}");
    }

    #[tokio::test]
    async fn upstream_error_forwards_without_stream_end() {
        let items: Vec<Result<String, PlanError>> = vec![
            Ok("partial narration".to_string()),
            Err(PlanError::StreamError("connection reset".to_string())),
        ];
        let mut stream = transduce(
            Box::pin(futures_util::stream::iter(items)) as RawChunkStream,
            UPDATE_DELIMITER,
        );

        let first = stream.next().await.expect("item").expect("ok");
        assert_eq!(
            first,
            PlanStreamEvent::Narration {
                delta: "partial narration".to_string()
            }
        );
        let err = stream.next().await.expect("item").expect_err("error");
        assert!(matches!(err, PlanError::StreamError(_)));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn delimiter_at_stream_start_emits_no_empty_narration() {
        let events = collect(transduce(
            chunk_stream(vec!["___UPDATE_JSON___{}"]),
            UPDATE_DELIMITER,
        ))
        .await;
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, PlanStreamEvent::Narration { .. }))
        );
        assert_eq!(final_payload(&events), "{}");
    }
}
