//! # Handler Registry
//!
//! Ordered list of handlers, consulted front to back until one accepts.
//! Handler identity is the `Arc` pointer.

use super::callback::QueryCallback;
use crate::ports::inbound::{IncomingQuery, QueryHandler};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Arc<dyn QueryHandler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`; `first` puts it ahead of every existing handler.
    ///
    /// Returns `false` when the same handler is already registered.
    pub fn add(&mut self, handler: Arc<dyn QueryHandler>, first: bool) -> bool {
        if self.contains(&handler) {
            return false;
        }
        if first {
            self.handlers.insert(0, handler);
        } else {
            self.handlers.push(handler);
        }
        true
    }

    /// Returns `false` when `handler` is not registered.
    pub fn remove(&mut self, handler: &Arc<dyn QueryHandler>) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|h| !Arc::ptr_eq(h, handler));
        before != self.handlers.len()
    }

    #[must_use]
    pub fn contains(&self, handler: &Arc<dyn QueryHandler>) -> bool {
        self.handlers.iter().any(|h| Arc::ptr_eq(h, handler))
    }

    /// Offer `query` to each handler in order, each with a fresh callback
    /// from `make_callback`.
    ///
    /// Returns the first acceptor and the callback it was given. Callbacks
    /// handed to handlers that declined are made inert.
    pub fn dispatch(
        &self,
        query: &IncomingQuery,
        mut make_callback: impl FnMut() -> QueryCallback,
    ) -> Option<(Arc<dyn QueryHandler>, QueryCallback)> {
        for handler in &self.handlers {
            let callback = make_callback();
            let kept = callback.clone();
            if handler.on_query(query, callback) {
                return Some((handler.clone(), kept));
            }
            kept.done_flag().store(true, Ordering::Release);
        }
        None
    }

    pub fn clear(&mut self) -> Vec<Arc<dyn QueryHandler>> {
        std::mem::take(&mut self.handlers)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use shared_types::{BrowserId, FrameId, FrameInfo, FrameRoute, QueryId};
    use tokio::sync::mpsc;

    struct Scripted {
        name: &'static str,
        accept: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl QueryHandler for Scripted {
        fn on_query(&self, _query: &IncomingQuery, _callback: QueryCallback) -> bool {
            self.log.lock().push(self.name);
            self.accept
        }
    }

    fn handler(
        name: &'static str,
        accept: bool,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<dyn QueryHandler> {
        Arc::new(Scripted {
            name,
            accept,
            log: log.clone(),
        })
    }

    fn query() -> IncomingQuery {
        IncomingQuery {
            route: FrameRoute::new(BrowserId(1), FrameInfo::main(FrameId(1), "http://tests/")),
            id: QueryId(1),
            request: "ping".into(),
            persistent: false,
        }
    }

    fn dispatch(registry: &HandlerRegistry) -> Option<Arc<dyn QueryHandler>> {
        let (tx, _rx) = mpsc::unbounded_channel();
        registry
            .dispatch(&query(), || {
                QueryCallback::new((BrowserId(1), QueryId(1)), 1, false, tx.clone(), None)
            })
            .map(|(handler, _)| handler)
    }

    #[test]
    fn test_stops_at_first_acceptor() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        let b = handler("B", true, &log);
        registry.add(handler("A", false, &log), false);
        registry.add(b.clone(), false);
        registry.add(handler("C", true, &log), false);

        let accepted = dispatch(&registry).unwrap();
        assert!(Arc::ptr_eq(&accepted, &b));
        assert_eq!(*log.lock(), vec!["A", "B"]);
    }

    #[test]
    fn test_first_flag_goes_to_front() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        registry.add(handler("A", false, &log), false);
        registry.add(handler("B", false, &log), true);

        assert!(dispatch(&registry).is_none());
        assert_eq!(*log.lock(), vec!["B", "A"]);
    }

    #[test]
    fn test_duplicate_add_and_missing_remove() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new();
        let a = handler("A", true, &log);

        assert!(registry.add(a.clone(), false));
        assert!(!registry.add(a.clone(), true));
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&a));
        assert!(!registry.remove(&a));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_declined_callback_is_inert() {
        struct Hoarder(Mutex<Option<QueryCallback>>);
        impl QueryHandler for Hoarder {
            fn on_query(&self, _query: &IncomingQuery, callback: QueryCallback) -> bool {
                *self.0.lock() = Some(callback);
                false
            }
        }

        let hoarder = Arc::new(Hoarder(Mutex::new(None)));
        let mut registry = HandlerRegistry::new();
        registry.add(hoarder.clone(), false);
        assert!(dispatch(&registry).is_none());

        let kept = hoarder.0.lock().take().unwrap();
        assert!(!kept.success("too late"));
    }
}
