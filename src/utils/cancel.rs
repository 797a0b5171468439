//! Cancellation utilities
//!
//! First-class cancellation for plan streams, for callers whose view may
//! close while a response is still streaming. Dropping the cancelled stream
//! closes the underlying HTTP connection so the provider stops generating.

use tokio_util::sync::CancellationToken;

/// A handle that can be used to request cancellation.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. The wrapped stream stops as soon as possible.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Make a PlanStream cancellable and return its cancel handle.
pub fn make_cancellable_stream(
    stream: crate::streaming::PlanStream,
) -> (crate::streaming::PlanStream, CancelHandle) {
    let handle = CancelHandle::new();
    let token = handle.token.clone();
    let mut inner = stream;
    let s = async_stream::stream! {
        use futures::StreamExt;
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                item = inner.next() => {
                    let Some(item) = item else { break };
                    yield item;
                }
            }
        }
    };
    (Box::pin(s), handle)
}

/// Wrap a stream into a [`PlanStreamHandle`](crate::streaming::PlanStreamHandle).
pub fn into_stream_handle(
    stream: crate::streaming::PlanStream,
) -> crate::streaming::PlanStreamHandle {
    let (stream, cancel) = make_cancellable_stream(stream);
    crate::streaming::PlanStreamHandle { stream, cancel }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn cancel_wakes_pending_next_immediately() {
        // A stream that never yields and never ends.
        let pending: crate::streaming::PlanStream = Box::pin(futures_util::stream::pending());
        let (mut s, cancel) = make_cancellable_stream(pending);

        let waiter = tokio::spawn(async move { s.next().await });

        // Give the task a chance to poll and block on `next()`.
        tokio::task::yield_now().await;

        cancel.cancel();

        let out = tokio::time::timeout(std::time::Duration::from_millis(200), waiter)
            .await
            .expect("cancel should wake the waiting task")
            .expect("task ok");

        assert!(out.is_none());
    }

    #[tokio::test]
    async fn uncancelled_stream_passes_items_through() {
        let events = vec![Ok(crate::streaming::PlanStreamEvent::StreamEnd {
            payload: String::new(),
        })];
        let inner: crate::streaming::PlanStream = Box::pin(futures_util::stream::iter(events));
        let (mut s, cancel) = make_cancellable_stream(inner);

        assert!(!cancel.is_cancelled());
        let first = s.next().await.expect("item").expect("ok");
        assert!(matches!(
            first,
            crate::streaming::PlanStreamEvent::StreamEnd { .. }
        ));
        assert!(s.next().await.is_none());
    }
}
