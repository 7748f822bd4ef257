//! # Lifecycle Tests
//!
//! Cancellation, teardown on either side, the one-way channel, and
//! exactly-once delivery under racing answers and cancels.

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use mr_02_browser_router::QueryHandler;
    use rand::Rng;
    use router_runtime::browser_host::{ROOM_OPEN_MESSAGE, TEST_FUNCTION_MESSAGE};
    use router_runtime::{next_outcome, wait_until_bound};
    use shared_types::{QueryOutcome, CANCELED_ERROR_CODE};
    use std::sync::Arc;
    use std::time::Duration;

    // =============================================================================
    // CANCELLATION
    // =============================================================================

    #[tokio::test]
    async fn test_cancel_reaches_handler() {
        let page = open_page().await;
        let handler = Arc::new(Deferred::default());
        page.add_handler(handler.clone()).await;

        let (id, mut outcomes) = page.query("long poll", false).await;
        assert!(eventually(|| async { page.browser_pending().await == 1 }).await);

        assert!(page.cancel(id).await);
        assert!(eventually(|| async { handler.canceled.lock().contains(&id) }).await);

        // The handler's late answer goes nowhere.
        for callback in handler.take_callbacks() {
            assert!(!callback.success("too late"));
        }
        assert!(drain(&mut outcomes).await.is_empty());
        assert_eq!(page.browser_pending().await, 0);
        page.session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancel_after_resolution_is_noop() {
        let page = open_page().await;
        let (id, mut outcomes) = page.query("MessageRouterTest:ab", false).await;
        assert_eq!(
            next_outcome(&mut outcomes, TIMEOUT).await,
            Some(QueryOutcome::Success("ba".into()))
        );

        assert!(!page.cancel(id).await);
        assert_eq!(page.renderer_pending().await, 0);
        let report = page.session.shutdown().await.unwrap();
        assert_eq!(report.renderer[0].1.canceled, 0);
    }

    #[tokio::test]
    async fn test_removed_handler_fails_outstanding_queries() {
        let page = open_page().await;
        let handler: Arc<dyn QueryHandler> = Arc::new(Deferred::default());
        page.add_handler(handler.clone()).await;

        let (_, mut outcomes) = page.query("pending", false).await;
        assert!(eventually(|| async { page.browser_pending().await == 1 }).await);

        let removed = handler.clone();
        assert!(page
            .browser
            .call(move |host| host.remove_handler("default", &removed))
            .await
            .unwrap());

        match next_outcome(&mut outcomes, TIMEOUT).await {
            Some(QueryOutcome::Failure { code, .. }) => assert_eq!(code, CANCELED_ERROR_CODE),
            other => panic!("expected canceled failure, got {other:?}"),
        }
        page.session.shutdown().await.unwrap();
    }

    // =============================================================================
    // TEARDOWN
    // =============================================================================

    #[tokio::test]
    async fn test_context_release_disposes_without_continuations() {
        let page = open_page().await;
        let handler = Arc::new(Deferred::default());
        page.add_handler(handler.clone()).await;

        let mut receivers = Vec::new();
        for i in 0..5 {
            receivers.push(page.query(&format!("q{i}"), false).await.1);
        }
        assert_eq!(page.renderer_pending().await, 5);

        let context = page.context;
        let disposed = page
            .renderer
            .call(move |host| host.on_context_released(context))
            .await
            .unwrap();
        assert_eq!(disposed, 5);

        // Answers arriving after disposal are stale.
        assert!(eventually(|| async { handler.callbacks.lock().len() == 5 }).await);
        for callback in handler.take_callbacks() {
            callback.success("orphan");
        }
        for mut outcomes in receivers {
            assert!(drain(&mut outcomes).await.is_empty());
        }
        let report = page.session.shutdown().await.unwrap();
        assert_eq!(report.renderer[0].1.disposed, 5);
    }

    #[tokio::test]
    async fn test_browser_close_notifies_handler_only() {
        let page = open_page().await;
        let handler = Arc::new(Deferred::default());
        page.add_handler(handler.clone()).await;

        let (id, mut outcomes) = page.query("open", false).await;
        assert!(eventually(|| async { page.browser_pending().await == 1 }).await);

        let browser_id = page.browser_id;
        page.browser
            .call(move |host| host.on_before_close(browser_id))
            .await
            .unwrap();

        assert_eq!(*handler.canceled.lock(), vec![id]);
        assert!(next_outcome(&mut outcomes, QUIET_PERIOD).await.is_none());
        // The renderer keeps it until its context goes away.
        assert_eq!(page.renderer_pending().await, 1);
        assert!(!page
            .browser
            .call(|host| host.handlers_installed())
            .await
            .unwrap());
        page.session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_render_process_termination_drops_queries() {
        let page = open_page().await;
        let handler = Arc::new(Deferred::default());
        page.add_handler(handler.clone()).await;
        page.query("a", false).await;
        page.query("b", false).await;
        assert!(eventually(|| async { page.browser_pending().await == 2 }).await);

        let browser_id = page.browser_id;
        page.browser
            .call(move |host| host.on_render_process_terminated(browser_id))
            .await
            .unwrap();

        assert_eq!(page.browser_pending().await, 0);
        assert_eq!(handler.canceled.lock().len(), 2);
        page.session.shutdown().await.unwrap();
    }

    // =============================================================================
    // ONE-WAY CHANNEL
    // =============================================================================

    #[tokio::test]
    async fn test_room_open_round_trip() {
        let page = open_page().await;
        let context = page.context;

        assert!(wait_until_bound(&page.renderer, context, ROOM_OPEN_MESSAGE, TIMEOUT)
            .await
            .unwrap());
        let value = page
            .renderer
            .call(move |host| host.call_function(context, ROOM_OPEN_MESSAGE))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(value, "roomOpen called");

        assert!(wait_until_bound(&page.renderer, context, TEST_FUNCTION_MESSAGE, TIMEOUT)
            .await
            .unwrap());
        page.renderer
            .call(move |host| host.call_function(context, TEST_FUNCTION_MESSAGE))
            .await
            .unwrap()
            .unwrap();

        let report = page.session.shutdown().await.unwrap();
        assert!(report.forwarded >= 4);
    }

    // =============================================================================
    // RACES
    // =============================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_once_under_racing_cancels() {
        let page = open_page().await;
        page.add_handler(Arc::new(ThreadedEcho)).await;

        let mut issued = Vec::new();
        for i in 0..40 {
            let (id, outcomes) = page.query(&format!("echo-{i}"), false).await;
            let cancel = rand::thread_rng().gen_bool(0.4);
            if cancel {
                let delay = rand::thread_rng().gen_range(0..3);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            let canceled = cancel && page.cancel(id).await;
            issued.push((i, canceled, outcomes));
        }

        for (i, canceled, mut outcomes) in issued {
            let seen = drain(&mut outcomes).await;
            if canceled {
                assert!(seen.is_empty(), "query {i} resolved after cancel: {seen:?}");
            } else {
                assert_eq!(seen, vec![QueryOutcome::Success(format!("echo-{i}"))]);
            }
        }
        assert_eq!(page.renderer_pending().await, 0);
        page.session.shutdown().await.unwrap();
    }
}
