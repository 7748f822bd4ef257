//! # In-Memory Script Contexts
//!
//! Stand-ins for the engine's per-frame script contexts. A context is a
//! shared handle: clones see the same set of bound functions.

use mr_01_renderer_router::{BindingError, ScriptContext};
use parking_lot::Mutex;
use shared_types::{BrowserId, ContextId, FrameRoute};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct ContextState {
    functions: BTreeSet<String>,
    released: bool,
}

#[derive(Debug, Clone)]
pub struct InMemoryScriptContext {
    id: ContextId,
    route: FrameRoute,
    state: Arc<Mutex<ContextState>>,
}

impl InMemoryScriptContext {
    pub fn new(id: ContextId, route: FrameRoute) -> Self {
        Self {
            id,
            route,
            state: Arc::default(),
        }
    }

    #[must_use]
    pub fn route(&self) -> &FrameRoute {
        &self.route
    }

    #[must_use]
    pub fn is_bound(&self, name: &str) -> bool {
        self.state.lock().functions.contains(name)
    }

    /// Bound function names, sorted.
    #[must_use]
    pub fn functions(&self) -> Vec<String> {
        self.state.lock().functions.iter().cloned().collect()
    }

    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Tear the context down. Every function disappears and no new one can
    /// be bound.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.released = true;
        state.functions.clear();
    }
}

impl ScriptContext for InMemoryScriptContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn bind_function(&mut self, name: &str) -> Result<(), BindingError> {
        let mut state = self.state.lock();
        if state.released {
            return Err(BindingError::Released);
        }
        if !state.functions.insert(name.to_string()) {
            return Err(BindingError::AlreadyBound(name.to_string()));
        }
        Ok(())
    }

    fn unbind_function(&mut self, name: &str) -> bool {
        self.state.lock().functions.remove(name)
    }
}

/// Live contexts of one renderer process, plus the functions the browser
/// asked to expose in each browser's main frame.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    contexts: HashMap<ContextId, InMemoryScriptContext>,
    main_frames: HashMap<BrowserId, ContextId>,
    exposed: HashMap<BrowserId, BTreeSet<String>>,
}

/// Registry shared between the renderer host and its one-way listeners.
pub type SharedScriptRegistry = Arc<Mutex<ScriptRegistry>>;

impl ScriptRegistry {
    pub fn insert(&mut self, context: InMemoryScriptContext) {
        let route = context.route();
        if route.frame.is_main {
            self.main_frames.insert(route.browser_id, context.id());
        }
        self.contexts.insert(context.id(), context);
    }

    pub fn remove(&mut self, id: ContextId) -> Option<InMemoryScriptContext> {
        let context = self.contexts.remove(&id)?;
        let browser = context.route().browser_id;
        if self.main_frames.get(&browser) == Some(&id) {
            self.main_frames.remove(&browser);
        }
        Some(context)
    }

    #[must_use]
    pub fn get(&self, id: ContextId) -> Option<&InMemoryScriptContext> {
        self.contexts.get(&id)
    }

    #[must_use]
    pub fn main_frame(&self, browser: BrowserId) -> Option<&InMemoryScriptContext> {
        self.main_frames
            .get(&browser)
            .and_then(|id| self.contexts.get(id))
    }

    /// Remember `name` for `browser`. Returns `false` when it was already
    /// exposed.
    pub fn expose(&mut self, browser: BrowserId, name: &str) -> bool {
        self.exposed
            .entry(browser)
            .or_default()
            .insert(name.to_string())
    }

    /// Functions exposed for `browser`, sorted.
    #[must_use]
    pub fn exposed(&self, browser: BrowserId) -> Vec<String> {
        self.exposed
            .get(&browser)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
