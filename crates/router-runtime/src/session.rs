//! # Session
//!
//! Both hosts on their own owner threads, joined by an in-memory boundary.
//!
//! ## Startup Sequence
//!
//! 1. Create one boundary channel per direction
//! 2. Build the hosts around metered transports
//! 3. Move each host onto its owner thread
//! 4. Point the browser routers' completion notifier at the browser owner
//! 5. Start one pump per direction
//!
//! Shutdown runs the other way: handlers are removed, then each owner stops
//! and hands its host back.

use crate::boundary::{spawn_pump, MeteredTransport};
use crate::browser_host::BrowserHost;
use crate::config::RuntimeConfig;
use crate::errors::RuntimeError;
use crate::renderer_host::RendererHost;
use mr_01_renderer_router::{QueryRequest, RendererStats};
use mr_02_browser_router::BrowserStats;
use serde::Serialize;
use shared_bus::{ChannelTransport, ExecutorError, OwnerHandle, OwnerThread};
use shared_types::{ContextId, MessageNames, ProcessRole, QueryOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Poll interval while waiting for the other process.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Counters collected at shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub browser: Vec<(&'static str, BrowserStats)>,
    pub renderer: Vec<(&'static str, RendererStats)>,
    /// Messages the pumps carried across the boundary.
    pub forwarded: u64,
}

pub struct Session {
    browser: OwnerThread<BrowserHost>,
    renderer: OwnerThread<RendererHost>,
    pumps: Vec<JoinHandle<u64>>,
}

impl Session {
    /// Start both hosts. Must be called inside a tokio runtime.
    pub fn start(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        config.validate()?;
        let names: Vec<MessageNames> = config
            .routers()
            .iter()
            .map(|(_, router)| router.message_names())
            .collect();

        let (to_renderer, renderer_inbox) = ChannelTransport::channel(ProcessRole::Browser);
        let (to_browser, browser_inbox) = ChannelTransport::channel(ProcessRole::Renderer);
        let browser_host = BrowserHost::new(
            config,
            Arc::new(MeteredTransport::new(to_renderer, names.clone())),
        )?;
        let renderer_host =
            RendererHost::new(config, Arc::new(MeteredTransport::new(to_browser, names)))?;

        let browser = OwnerThread::spawn(ProcessRole::Browser.as_str(), browser_host);
        let renderer = OwnerThread::spawn(ProcessRole::Renderer.as_str(), renderer_host);

        let waker = browser.handle();
        browser.handle().post(move |host| {
            host.set_completion_notifier(move || {
                // Fails only once the browser owner is shutting down.
                let _ = waker.post(|host: &mut BrowserHost| {
                    host.process_completions();
                });
            });
        })?;

        let pumps = vec![
            spawn_pump(
                browser_inbox,
                browser.handle(),
                BrowserHost::on_process_message_received,
            ),
            spawn_pump(
                renderer_inbox,
                renderer.handle(),
                RendererHost::on_process_message_received,
            ),
        ];

        info!("Session started");
        Ok(Self {
            browser,
            renderer,
            pumps,
        })
    }

    #[must_use]
    pub fn browser(&self) -> OwnerHandle<BrowserHost> {
        self.browser.handle()
    }

    #[must_use]
    pub fn renderer(&self) -> OwnerHandle<RendererHost> {
        self.renderer.handle()
    }

    /// Stop both owners, close the boundary and collect the counters.
    ///
    /// Handlers are removed first, so queries still open are canceled.
    pub async fn shutdown(self) -> Result<SessionReport, RuntimeError> {
        self.browser
            .handle()
            .call(|host| host.remove_all_handlers())
            .await?;
        let browser = self.browser.shutdown().await?;
        let renderer = self.renderer.shutdown().await?;
        let browser_stats = browser.stats();
        let renderer_stats = renderer.stats();

        // Dropping the hosts drops their transports, which ends the pumps.
        drop(browser);
        drop(renderer);

        let mut forwarded = 0;
        for pump in self.pumps {
            forwarded += pump.await.map_err(|e| ExecutorError::Panicked {
                owner: "pump".to_string(),
                reason: e.to_string(),
            })?;
        }
        debug!(forwarded, "Session stopped");

        Ok(SessionReport {
            browser: browser_stats,
            renderer: renderer_stats,
            forwarded,
        })
    }
}

/// A query request whose outcomes arrive on the returned receiver.
pub fn channel_request(
    request: impl Into<String>,
    persistent: bool,
) -> (QueryRequest, mpsc::UnboundedReceiver<QueryOutcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let request = QueryRequest::new(request, move |outcome| {
        // Script may have stopped listening.
        let _ = tx.send(outcome);
    });
    let request = if persistent {
        request.persistent()
    } else {
        request
    };
    (request, rx)
}

/// Next outcome from `outcomes`, or `None` after `timeout`.
pub async fn next_outcome(
    outcomes: &mut mpsc::UnboundedReceiver<QueryOutcome>,
    timeout: Duration,
) -> Option<QueryOutcome> {
    tokio::time::timeout(timeout, outcomes.recv())
        .await
        .ok()
        .flatten()
}

/// Wait until `name` is bound in `context`. Returns `false` after
/// `timeout`.
pub async fn wait_until_bound(
    renderer: &OwnerHandle<RendererHost>,
    context: ContextId,
    name: &str,
    timeout: Duration,
) -> Result<bool, RuntimeError> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let function = name.to_string();
        let bound = renderer
            .call(move |host| {
                host.context(context)
                    .is_some_and(|script| script.is_bound(&function))
            })
            .await?;
        if bound {
            return Ok(true);
        }
        if tokio::time::Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
