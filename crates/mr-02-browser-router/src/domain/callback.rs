//! # Query Callback
//!
//! The handle a handler answers through. Cloneable and usable from any
//! thread: answers are queued and applied by the router on its owner
//! thread in `process_completions`.
//!
//! A callback goes inert when its query ends (failure, one-shot success,
//! cancellation, teardown); later calls return `false` and send nothing.

use shared_types::{BrowserId, QueryId, QueryOutcome};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Identity of an answering-side query: ids are only unique per browser.
pub type QueryKey = (BrowserId, QueryId);

/// Wakes the owner thread after an answer is queued.
pub type CompletionNotifier = Arc<dyn Fn() + Send + Sync>;

/// A queued answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub key: QueryKey,
    /// Distinguishes dispatch attempts, so a stale callback can never
    /// answer a newer query with the same key.
    pub token: u64,
    pub outcome: QueryOutcome,
}

#[derive(Clone)]
pub struct QueryCallback {
    key: QueryKey,
    token: u64,
    persistent: bool,
    done: Arc<AtomicBool>,
    sender: mpsc::UnboundedSender<Completion>,
    notifier: Option<CompletionNotifier>,
}

impl QueryCallback {
    pub(crate) fn new(
        key: QueryKey,
        token: u64,
        persistent: bool,
        sender: mpsc::UnboundedSender<Completion>,
        notifier: Option<CompletionNotifier>,
    ) -> Self {
        Self {
            key,
            token,
            persistent,
            done: Arc::new(AtomicBool::new(false)),
            sender,
            notifier,
        }
    }

    /// Answer with a result. A persistent query stays open.
    ///
    /// Returns `false` when the query has already ended.
    pub fn success(&self, result: impl Into<String>) -> bool {
        if self.persistent {
            if self.is_done() {
                return false;
            }
        } else if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.complete(QueryOutcome::Success(result.into()))
    }

    /// Answer with an error. Always ends the query.
    ///
    /// Returns `false` when the query has already ended.
    pub fn failure(&self, code: i32, message: impl Into<String>) -> bool {
        if self.done.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.complete(QueryOutcome::failure(code, message))
    }

    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn query_id(&self) -> QueryId {
        self.key.1
    }

    #[must_use]
    pub fn browser_id(&self) -> BrowserId {
        self.key.0
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub(crate) fn token(&self) -> u64 {
        self.token
    }

    /// Shared end-of-query flag, kept by the router.
    pub(crate) fn done_flag(&self) -> Arc<AtomicBool> {
        self.done.clone()
    }

    fn complete(&self, outcome: QueryOutcome) -> bool {
        let queued = self
            .sender
            .send(Completion {
                key: self.key,
                token: self.token,
                outcome,
            })
            .is_ok();
        if queued {
            if let Some(notify) = &self.notifier {
                notify();
            }
        }
        queued
    }
}

impl fmt::Debug for QueryCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCallback")
            .field("browser", &self.key.0)
            .field("query_id", &self.key.1)
            .field("persistent", &self.persistent)
            .field("done", &self.is_done())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn callback(
        persistent: bool,
    ) -> (QueryCallback, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            QueryCallback::new((BrowserId(1), QueryId(7)), 1, persistent, tx, None),
            rx,
        )
    }

    #[test]
    fn test_one_shot_answers_once() {
        let (cb, mut rx) = callback(false);
        assert!(cb.success("first"));
        assert!(!cb.success("second"));
        assert!(!cb.failure(1, "third"));

        let completion = rx.try_recv().unwrap();
        assert_eq!(completion.outcome, QueryOutcome::Success("first".into()));
        assert!(rx.try_recv().is_err());
        assert!(cb.is_done());
    }

    #[test]
    fn test_persistent_until_failure() {
        let (cb, mut rx) = callback(true);
        assert!(cb.success("1"));
        assert!(cb.clone().success("2"));
        assert!(cb.failure(5, "done"));
        assert!(!cb.success("3"));

        let mut outcomes = Vec::new();
        while let Ok(c) = rx.try_recv() {
            outcomes.push(c.outcome);
        }
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[2], QueryOutcome::failure(5, "done"));
    }

    #[test]
    fn test_answers_from_another_thread() {
        let (cb, mut rx) = callback(false);
        std::thread::spawn(move || cb.success("threaded"))
            .join()
            .unwrap();
        assert_eq!(
            rx.try_recv().unwrap().outcome,
            QueryOutcome::Success("threaded".into())
        );
    }

    #[test]
    fn test_inert_once_marked_done() {
        let (cb, mut rx) = callback(false);
        cb.done_flag().store(true, Ordering::Release);
        assert!(!cb.success("late"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_notifier_rings_per_answer() {
        let rings = Arc::new(AtomicUsize::new(0));
        let counter = rings.clone();
        let (tx, _rx) = mpsc::unbounded_channel();
        let cb = QueryCallback::new(
            (BrowserId(1), QueryId(1)),
            1,
            true,
            tx,
            Some(Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        );
        cb.success("a");
        cb.success("b");
        assert_eq!(rings.load(Ordering::SeqCst), 2);
    }
}
