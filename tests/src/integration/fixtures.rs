//! Shared fixtures: test handlers and a page opened in a running session.

use mr_02_browser_router::{IncomingQuery, QueryCallback, QueryHandler};
use parking_lot::Mutex;
use rand::Rng;
use router_runtime::config::DEFAULT_STARTUP_URL;
use router_runtime::{
    channel_request, BrowserHost, RendererHost, RuntimeConfig, Session,
};
use shared_bus::OwnerHandle;
use shared_types::{BrowserId, ContextId, FrameId, FrameInfo, FrameRoute, QueryId, QueryOutcome};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub const TIMEOUT: Duration = Duration::from_secs(2);

/// Long enough for a stray message to cross the boundary.
pub const QUIET_PERIOD: Duration = Duration::from_millis(50);

// =============================================================================
// TEST HANDLERS
// =============================================================================

/// Records its name when consulted; accepts when told to.
pub struct Scripted {
    pub name: &'static str,
    pub accept: bool,
    pub log: Arc<Mutex<Vec<&'static str>>>,
}

impl QueryHandler for Scripted {
    fn on_query(&self, _query: &IncomingQuery, callback: QueryCallback) -> bool {
        self.log.lock().push(self.name);
        if self.accept {
            callback.success(self.name);
        }
        self.accept
    }
}

/// Fails every query with a fixed error.
pub struct Failing {
    pub code: i32,
    pub message: &'static str,
}

impl QueryHandler for Failing {
    fn on_query(&self, _query: &IncomingQuery, callback: QueryCallback) -> bool {
        callback.failure(self.code, self.message);
        true
    }
}

/// Accepts and keeps callbacks until the test answers them.
#[derive(Default)]
pub struct Deferred {
    pub callbacks: Mutex<Vec<QueryCallback>>,
    pub canceled: Mutex<Vec<QueryId>>,
}

impl Deferred {
    pub fn take_callbacks(&self) -> Vec<QueryCallback> {
        std::mem::take(&mut *self.callbacks.lock())
    }
}

impl QueryHandler for Deferred {
    fn on_query(&self, _query: &IncomingQuery, callback: QueryCallback) -> bool {
        self.callbacks.lock().push(callback);
        true
    }

    fn on_query_canceled(&self, query: &IncomingQuery) {
        self.canceled.lock().push(query.id);
    }
}

/// Answers persistent queries with `1`, `2`, `3` and then ends them.
pub struct Streaming;

impl QueryHandler for Streaming {
    fn on_query(&self, query: &IncomingQuery, callback: QueryCallback) -> bool {
        if !query.persistent {
            return false;
        }
        for tick in ["1", "2", "3"] {
            callback.success(tick);
        }
        callback.failure(0, "stream ended");
        // Ignored: the query has ended.
        callback.success("4");
        true
    }
}

/// Echoes the request from a worker thread after a random delay.
pub struct ThreadedEcho;

impl QueryHandler for ThreadedEcho {
    fn on_query(&self, query: &IncomingQuery, callback: QueryCallback) -> bool {
        let request = query.request.clone();
        std::thread::spawn(move || {
            let delay = rand::thread_rng().gen_range(0..3);
            std::thread::sleep(Duration::from_millis(delay));
            callback.success(request);
        });
        true
    }
}

// =============================================================================
// SESSION FIXTURE
// =============================================================================

/// A running session with one browser whose main frame has a script context.
pub struct Page {
    pub session: Session,
    pub browser: OwnerHandle<BrowserHost>,
    pub renderer: OwnerHandle<RendererHost>,
    pub config: RuntimeConfig,
    pub browser_id: BrowserId,
    pub context: ContextId,
}

pub fn main_frame() -> FrameInfo {
    FrameInfo::main(FrameId(1), DEFAULT_STARTUP_URL)
}

pub async fn open_page() -> Page {
    let config = RuntimeConfig::default();
    let session = Session::start(&config).unwrap();
    let browser = session.browser();
    let renderer = session.renderer();
    let browser_id = BrowserId(1);

    browser
        .call(move |host| {
            host.on_after_created(browser_id, main_frame());
            host.on_before_browse(browser_id, &main_frame());
        })
        .await
        .unwrap();
    let route = FrameRoute::new(browser_id, main_frame());
    let context = renderer
        .call(move |host| host.on_context_created(route))
        .await
        .unwrap()
        .unwrap();

    Page {
        session,
        browser,
        renderer,
        config,
        browser_id,
        context,
    }
}

impl Page {
    pub fn query_function(&self) -> String {
        self.config.default_router.query_function.clone()
    }

    pub fn cancel_function(&self) -> String {
        self.config.default_router.cancel_function.clone()
    }

    /// Issue a query on the default router.
    pub async fn query(
        &self,
        request: &str,
        persistent: bool,
    ) -> (QueryId, UnboundedReceiver<QueryOutcome>) {
        let (request, outcomes) = channel_request(request, persistent);
        let function = self.query_function();
        let context = self.context;
        let id = self
            .renderer
            .call(move |host| host.query(context, &function, request))
            .await
            .unwrap()
            .unwrap();
        (id, outcomes)
    }

    pub async fn cancel(&self, id: QueryId) -> bool {
        let function = self.cancel_function();
        let context = self.context;
        self.renderer
            .call(move |host| host.cancel(context, &function, id))
            .await
            .unwrap()
            .unwrap()
    }

    /// Put `handler` ahead of the demo handlers on the default router.
    pub async fn add_handler(&self, handler: Arc<dyn QueryHandler>) {
        self.browser
            .call(move |host| host.add_handler("default", handler, true))
            .await
            .unwrap();
    }

    pub async fn renderer_pending(&self) -> usize {
        let context = self.context;
        self.renderer
            .call(move |host| host.pending_count(Some(context)))
            .await
            .unwrap()
    }

    pub async fn browser_pending(&self) -> usize {
        self.browser
            .call(|host| host.pending_count(None))
            .await
            .unwrap()
    }
}

/// Poll `check` until it holds or [`TIMEOUT`] passes.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}

/// Everything `outcomes` yields: the first outcome may take up to
/// [`TIMEOUT`], later ones must follow within [`QUIET_PERIOD`]. Returns at
/// once when the query is gone without an answer.
pub async fn drain(outcomes: &mut UnboundedReceiver<QueryOutcome>) -> Vec<QueryOutcome> {
    let mut seen = Vec::new();
    let mut wait = TIMEOUT;
    while let Some(outcome) = router_runtime::next_outcome(outcomes, wait).await {
        seen.push(outcome);
        wait = QUIET_PERIOD;
    }
    seen
}
