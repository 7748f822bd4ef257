//! # Query Correlation Table
//!
//! Maps each outstanding query id to the continuation waiting for its
//! answer.
//!
//! - Ids come from a monotonic counter and are never reused.
//! - A continuation runs synchronously inside [`CorrelationTable::resolve`],
//!   on whatever task calls it.
//! - A non-persistent entry is removed before its continuation runs, so a
//!   second resolution for the same id finds nothing.

use super::errors::CorrelationError;
use shared_types::{ContextId, QueryId, QueryOutcome};
use std::collections::HashMap;
use std::fmt;

/// Receives the outcome of a query.
pub type Continuation = Box<dyn FnMut(QueryOutcome) + Send>;

/// A query awaiting its answer.
pub struct PendingQuery {
    context: ContextId,
    persistent: bool,
    continuation: Continuation,
}

impl PendingQuery {
    pub fn new(
        context: ContextId,
        persistent: bool,
        continuation: impl FnMut(QueryOutcome) + Send + 'static,
    ) -> Self {
        Self {
            context,
            persistent,
            continuation: Box::new(continuation),
        }
    }

    /// Wrap an already boxed continuation.
    #[must_use]
    pub fn boxed(context: ContextId, persistent: bool, continuation: Continuation) -> Self {
        Self {
            context,
            persistent,
            continuation,
        }
    }

    #[must_use]
    pub fn context(&self) -> ContextId {
        self.context
    }

    #[must_use]
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

impl fmt::Debug for PendingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingQuery")
            .field("context", &self.context)
            .field("persistent", &self.persistent)
            .finish_non_exhaustive()
    }
}

/// Outstanding queries of one requesting router.
#[derive(Debug)]
pub struct CorrelationTable {
    next_id: i64,
    pending: HashMap<QueryId, PendingQuery>,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationTable {
    /// Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// Next unused id. Strictly greater than every id handed out before.
    pub fn allocate(&mut self) -> Result<QueryId, CorrelationError> {
        let id = self.next_id;
        self.next_id = id.checked_add(1).ok_or(CorrelationError::IdsExhausted)?;
        Ok(QueryId(id))
    }

    /// Store `query` under `id`.
    pub fn register(&mut self, id: QueryId, query: PendingQuery) -> Result<(), CorrelationError> {
        if self.pending.contains_key(&id) {
            return Err(CorrelationError::DuplicateId(id));
        }
        self.pending.insert(id, query);
        Ok(())
    }

    /// Deliver `outcome` to the continuation for `id`.
    ///
    /// The entry is kept only for a persistent query receiving a success.
    /// Returns `false` when `id` is not pending.
    pub fn resolve(&mut self, id: QueryId, outcome: QueryOutcome) -> bool {
        let keep = match self.pending.get(&id) {
            Some(query) => query.persistent && outcome.is_success(),
            None => return false,
        };

        if keep {
            if let Some(query) = self.pending.get_mut(&id) {
                (query.continuation)(outcome);
            }
        } else if let Some(mut query) = self.pending.remove(&id) {
            (query.continuation)(outcome);
        }
        true
    }

    /// Remove `id` without running its continuation.
    pub fn cancel(&mut self, id: QueryId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Drop every entry owned by `context` without running continuations.
    /// Returns how many were dropped.
    pub fn dispose_context(&mut self, context: ContextId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, query| query.context != context);
        before - self.pending.len()
    }

    /// Drop everything.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    #[must_use]
    pub fn get(&self, id: QueryId) -> Option<&PendingQuery> {
        self.pending.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: QueryId) -> bool {
        self.pending.contains_key(&id)
    }

    /// Outstanding queries, optionally restricted to one context.
    #[must_use]
    pub fn pending_count(&self, context: Option<ContextId>) -> usize {
        match context {
            Some(context) => self
                .pending
                .values()
                .filter(|query| query.context == context)
                .count(),
            None => self.pending.len(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
