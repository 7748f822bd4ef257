//! # Query Flow Tests
//!
//! Round trips from a script context to a handler and back.
//!
//! ## Flows Tested:
//!
//! 1. **Success**: handler answers, continuation sees the result once
//! 2. **Handler failure**: code and message arrive unchanged
//! 3. **No handler**: the requesting side gets the reserved failure
//! 4. **Dispatch order**: first acceptor wins, later handlers untouched
//! 5. **Deferred answers**: answered from another thread after dispatch
//! 6. **Persistent queries**: repeated successes, then a terminating failure
//! 7. **Wire layout**: messages survive the boundary codec field for field

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use mr_01_renderer_router::{QueryRequest, RendererRouter, RendererRouterApi};
    use mr_02_browser_router::{BrowserRouter, QueryHandler};
    use parking_lot::Mutex;
    use router_runtime::handlers::REVERSE_PREFIX;
    use shared_bus::{Envelope, RecordingTransport, Transport};
    use shared_types::{
        BrowserId, ContextId, FrameRoute, ProcessRole, QueryId, QueryOutcome, RouterConfig,
        RouterMessage, NO_HANDLER_ERROR_CODE,
    };
    use std::sync::Arc;

    // =============================================================================
    // ACROSS THE SESSION
    // =============================================================================

    #[tokio::test]
    async fn test_reverse_query_round_trip() {
        let page = open_page().await;

        let (_, mut outcomes) = page
            .query(&format!("{REVERSE_PREFIX}:boundary"), false)
            .await;

        assert_eq!(
            drain(&mut outcomes).await,
            vec![QueryOutcome::Success("yradnuob".into())]
        );
        assert_eq!(page.renderer_pending().await, 0);
        page.session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_custom_router_round_trip() {
        let page = open_page().await;
        let (request, mut outcomes) = router_runtime::channel_request("anything", false);
        let context = page.context;
        let function = page.config.custom_router.query_function.clone();
        page.renderer
            .call(move |host| host.query(context, &function, request))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            drain(&mut outcomes).await,
            vec![QueryOutcome::Success("result".into())]
        );
        page.session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_handler_yields_reserved_failure() {
        let page = open_page().await;

        let (_, mut outcomes) = page.query("nobody wants this", false).await;

        match drain(&mut outcomes).await.as_slice() {
            [QueryOutcome::Failure { code, .. }] => assert_eq!(*code, NO_HANDLER_ERROR_CODE),
            other => panic!("expected one failure, got {other:?}"),
        }
        let report = page.session.shutdown().await.unwrap();
        assert_eq!(report.browser[0].1.unhandled, 1);
    }

    #[tokio::test]
    async fn test_dispatch_reaches_second_handler_only() {
        let page = open_page().await;
        let log = Arc::new(Mutex::new(Vec::new()));
        // Each insert goes to the front, so add in reverse order.
        for (name, accept) in [("C", true), ("B", true), ("A", false)] {
            page.add_handler(Arc::new(Scripted {
                name,
                accept,
                log: log.clone(),
            }))
            .await;
        }

        let (_, mut outcomes) = page.query("who answers?", false).await;

        assert_eq!(
            drain(&mut outcomes).await,
            vec![QueryOutcome::Success("B".into())]
        );
        assert_eq!(*log.lock(), vec!["A", "B"]);
        page.session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_deferred_answer_from_worker_thread() {
        let page = open_page().await;
        let handler = Arc::new(Deferred::default());
        page.add_handler(handler.clone()).await;

        let (_, mut outcomes) = page.query("slow", false).await;
        assert!(eventually(|| async { !handler.callbacks.lock().is_empty() }).await);
        assert!(router_runtime::next_outcome(&mut outcomes, QUIET_PERIOD).await.is_none());

        let callback = handler.take_callbacks().remove(0);
        std::thread::spawn(move || callback.success("finally"))
            .join()
            .unwrap();

        assert_eq!(
            drain(&mut outcomes).await,
            vec![QueryOutcome::Success("finally".into())]
        );
        assert!(eventually(|| async { page.browser_pending().await == 0 }).await);
        page.session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_persistent_query_streams_until_failure() {
        let page = open_page().await;
        page.add_handler(Arc::new(Streaming)).await;

        let (_, mut outcomes) = page.query("ticks", true).await;

        assert_eq!(
            drain(&mut outcomes).await,
            vec![
                QueryOutcome::Success("1".into()),
                QueryOutcome::Success("2".into()),
                QueryOutcome::Success("3".into()),
                QueryOutcome::failure(0, "stream ended"),
            ]
        );
        assert_eq!(page.renderer_pending().await, 0);
        page.session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_back_to_back_ids_increase() {
        let page = open_page().await;
        page.add_handler(Arc::new(Deferred::default())).await;

        let (first, _a) = page.query("one", false).await;
        let (second, _b) = page.query("two", false).await;

        assert!(second > first);
        page.session.shutdown().await.unwrap();
    }

    // =============================================================================
    // IN-PROCESS PAIR (NO THREADS)
    // =============================================================================

    /// Both routers on one thread; messages move only when `shuttle` runs.
    struct Pair {
        renderer: RendererRouter,
        browser: BrowserRouter,
        to_browser: Arc<RecordingTransport>,
        to_renderer: Arc<RecordingTransport>,
    }

    impl Pair {
        fn new() -> Self {
            let to_browser = Arc::new(RecordingTransport::new(ProcessRole::Renderer));
            let to_renderer = Arc::new(RecordingTransport::new(ProcessRole::Browser));
            Self {
                renderer: RendererRouter::new(RouterConfig::default(), to_browser.clone())
                    .unwrap(),
                browser: BrowserRouter::new(RouterConfig::default(), to_renderer.clone())
                    .unwrap(),
                to_browser,
                to_renderer,
            }
        }

        fn shuttle(&mut self) {
            for sent in self.to_browser.take() {
                self.browser.on_message_received(&sent.route, &sent.message);
            }
            self.browser.process_completions();
            for sent in self.to_renderer.take() {
                self.renderer.on_message_received(&sent.route, &sent.message);
            }
        }
    }

    #[test]
    fn test_handler_failure_for_query_42_arrives_once() {
        let mut pair = Pair::new();
        let mut script = router_runtime::script::InMemoryScriptContext::new(
            ContextId(1),
            FrameRoute::new(BrowserId(1), main_frame()),
        );
        pair.renderer
            .on_context_created(script.route().clone(), &mut script)
            .unwrap();
        pair.browser.add_handler(
            Arc::new(Failing {
                code: 3,
                message: "bad input",
            }),
            false,
        );

        // Burn ids 1..=41.
        for _ in 0..41 {
            let id = pair
                .renderer
                .query(ContextId(1), QueryRequest::new("warmup", |_| {}))
                .unwrap();
            pair.renderer.cancel(ContextId(1), id);
        }
        pair.to_browser.take();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let id = pair
            .renderer
            .query(
                ContextId(1),
                QueryRequest::new("input", move |outcome| sink.lock().push(outcome)),
            )
            .unwrap();
        assert_eq!(id, QueryId(42));

        pair.shuttle();
        pair.shuttle();

        assert_eq!(*seen.lock(), vec![QueryOutcome::failure(3, "bad input")]);
        assert_eq!(pair.renderer.pending_count(None), 0);
    }

    #[test]
    fn test_query_start_survives_the_codec() {
        let names = RouterConfig::default().message_names();
        let sent = RouterMessage::QueryStart {
            id: QueryId(7),
            request: "ping".into(),
            persistent: false,
        };
        let route = FrameRoute::new(BrowserId(1), main_frame());

        let envelope =
            Envelope::seal(route.clone(), ProcessRole::Renderer, &sent.to_named(&names))
                .unwrap();
        let received = envelope.open().unwrap();

        assert_eq!(envelope.route, route);
        assert_eq!(RouterMessage::parse(&names, &received), Ok(Some(sent)));
    }
}
