//! # Message Router Runtime
//!
//! Runs a browser host and a renderer host side by side and drives one
//! scripted page session through them.
//!
//! ## Session Script
//!
//! 1. Create a browser and navigate its main frame to the startup URL
//! 2. Create the main frame's script context
//! 3. Reverse query on the default router
//! 4. Acknowledged query on the custom router
//! 5. Query nobody accepts
//! 6. Persistent query, canceled after its first answer
//! 7. `roomOpen` / `testFunction` one-way round trip
//! 8. Release the context and close the browser

use anyhow::{bail, Context, Result};
use router_runtime::handlers::REVERSE_PREFIX;
use router_runtime::{
    channel_request, next_outcome, wait_until_bound, RuntimeConfig, Session,
};
use router_telemetry::{encode_metrics, init_telemetry, QuerySnapshot, TelemetryConfig};
use shared_types::{BrowserId, FrameId, FrameInfo, FrameRoute, QueryOutcome};
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = init_telemetry(TelemetryConfig::from_env())
        .context("Failed to initialize telemetry")?;
    let config = RuntimeConfig::from_env().context("Invalid runtime configuration")?;
    info!(
        startup_url = %config.startup_url,
        query_function = %config.default_router.query_function,
        custom_query_function = %config.custom_router.query_function,
        "Starting message router session"
    );

    let session = Session::start(&config).context("Failed to start session")?;
    let result = run_script(&session, &config).await;
    let report = session.shutdown().await.context("Failed to stop session")?;

    info!(report = %serde_json::to_string(&report)?, "Session finished");
    info!(queries = %QuerySnapshot::capture().to_json()?, "Query counters");
    if telemetry.metrics_enabled() {
        debug!(metrics = %encode_metrics()?, "Prometheus metrics");
    }
    result
}

async fn run_script(session: &Session, config: &RuntimeConfig) -> Result<()> {
    let browser = session.browser();
    let renderer = session.renderer();
    let browser_id = BrowserId(1);
    let main_frame = FrameInfo::main(FrameId(1), config.startup_url.clone());
    let route = FrameRoute::new(browser_id, main_frame.clone());
    let timeout = config.answer_timeout;

    browser
        .call(move |host| {
            host.on_after_created(browser_id, main_frame.clone());
            host.on_before_browse(browser_id, &main_frame);
        })
        .await?;
    let context = renderer
        .call(move |host| host.on_context_created(route))
        .await??;

    // Reverse query
    let (request, mut answers) = channel_request(format!("{REVERSE_PREFIX}:Hello"), false);
    let function = config.default_router.query_function.clone();
    renderer
        .call(move |host| host.query(context, &function, request))
        .await??;
    match next_outcome(&mut answers, timeout).await {
        Some(QueryOutcome::Success(text)) => info!(result = %text, "Reverse query answered"),
        other => bail!("Unexpected reverse answer: {other:?}"),
    }

    // Acknowledged query
    let (request, mut answers) = channel_request("ping", false);
    let function = config.custom_router.query_function.clone();
    renderer
        .call(move |host| host.query(context, &function, request))
        .await??;
    let answer = next_outcome(&mut answers, timeout).await;
    info!(answer = ?answer, "Custom router answered");

    // Nobody accepts this one
    let (request, mut answers) = channel_request("unknown request", false);
    let function = config.default_router.query_function.clone();
    renderer
        .call(move |host| host.query(context, &function, request))
        .await??;
    match next_outcome(&mut answers, timeout).await {
        Some(QueryOutcome::Failure { code, message }) => {
            info!(code, message = %message, "Unhandled query failed as expected");
        }
        other => warn!(answer = ?other, "Unhandled query answered unexpectedly"),
    }

    // Persistent query, canceled after the first answer
    let (request, mut answers) = channel_request("subscribe", true);
    let function = config.custom_router.query_function.clone();
    let query_id = renderer
        .call(move |host| host.query(context, &function, request))
        .await??;
    let first = next_outcome(&mut answers, timeout).await;
    info!(query_id = %query_id, answer = ?first, "Persistent query answered");
    let cancel = config.custom_router.cancel_function.clone();
    let canceled = renderer
        .call(move |host| host.cancel(context, &cancel, query_id))
        .await??;
    info!(query_id = %query_id, canceled, "Persistent query canceled");

    // One-way round trip
    if !wait_until_bound(&renderer, context, "roomOpen", timeout).await? {
        bail!("roomOpen was never exposed");
    }
    let value = renderer
        .call(move |host| host.call_function(context, "roomOpen"))
        .await??;
    info!(value = %value, "roomOpen called");
    if wait_until_bound(&renderer, context, "testFunction", timeout).await? {
        let value = renderer
            .call(move |host| host.call_function(context, "testFunction"))
            .await??;
        info!(value = %value, "testFunction called");
    } else {
        warn!("testFunction was never exposed");
    }

    let disposed = renderer
        .call(move |host| host.on_context_released(context))
        .await?;
    browser
        .call(move |host| host.on_before_close(browser_id))
        .await?;
    info!(disposed, "Page session closed");
    Ok(())
}
