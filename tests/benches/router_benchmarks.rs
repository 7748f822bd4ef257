//! # Message Router Benchmarks
//!
//! Hot paths on both sides of the boundary:
//!
//! | Path | Side | Expectation |
//! |------|------|-------------|
//! | Correlation allocate/register/resolve | renderer | O(1) per query |
//! | Handler dispatch + completion | browser | linear in declining handlers |
//! | Envelope seal/open | boundary | proportional to payload |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mr_01_renderer_router::{CorrelationTable, PendingQuery};
use mr_02_browser_router::{BrowserRouter, IncomingQuery, QueryCallback, QueryHandler};
use rand::Rng;
use shared_bus::{Envelope, RecordingTransport};
use shared_types::{
    BrowserId, ContextId, FrameId, FrameInfo, FrameRoute, NamedMessage, ProcessRole, QueryId,
    QueryOutcome, RouterConfig, RouterMessage,
};
use std::sync::Arc;
use std::time::Duration;

fn route() -> FrameRoute {
    FrameRoute::new(
        BrowserId(1),
        FrameInfo::main(FrameId(1), "http://message-router.test/index.html"),
    )
}

// ============================================================================
// RENDERER: CORRELATION TABLE
// ============================================================================

fn bench_correlation_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("mr-01-correlation");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("allocate_register_resolve", |b| {
        let mut table = CorrelationTable::new();
        b.iter(|| {
            let id = table.allocate().unwrap();
            table
                .register(id, PendingQuery::new(ContextId(1), false, |o| {
                    black_box(o);
                }))
                .unwrap();
            black_box(table.resolve(id, QueryOutcome::Success("ok".into())))
        })
    });

    // Resolution cost with many queries outstanding.
    for pending in [10usize, 1_000, 10_000] {
        let mut table = CorrelationTable::new();
        let mut ids = Vec::with_capacity(pending);
        for _ in 0..pending {
            let id = table.allocate().unwrap();
            table
                .register(id, PendingQuery::new(ContextId(1), true, |_| {}))
                .unwrap();
            ids.push(id);
        }

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("resolve_persistent", pending),
            &ids,
            |b, ids| {
                let mut rng = rand::thread_rng();
                b.iter(|| {
                    let id = ids[rng.gen_range(0..ids.len())];
                    black_box(table.resolve(id, QueryOutcome::Success("tick".into())))
                })
            },
        );
    }

    group.bench_function("dispose_context_100", |b| {
        b.iter_batched(
            || {
                let mut table = CorrelationTable::new();
                for i in 0..100 {
                    let id = table.allocate().unwrap();
                    table
                        .register(id, PendingQuery::new(ContextId(i % 4), false, |_| {}))
                        .unwrap();
                }
                table
            },
            |mut table| black_box(table.dispose_context(ContextId(0))),
            criterion::BatchSize::SmallInput,
        )
    });

    group.finish();
}

// ============================================================================
// BROWSER: HANDLER DISPATCH
// ============================================================================

struct Decline;

impl QueryHandler for Decline {
    fn on_query(&self, _query: &IncomingQuery, _callback: QueryCallback) -> bool {
        false
    }
}

struct Answer;

impl QueryHandler for Answer {
    fn on_query(&self, query: &IncomingQuery, callback: QueryCallback) -> bool {
        callback.success(query.request.clone());
        true
    }
}

fn bench_handler_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("mr-02-dispatch");
    group.measurement_time(Duration::from_secs(5));

    let config = RouterConfig::default();
    let names = config.message_names();
    let route = route();

    for declining in [0usize, 4, 16] {
        let transport = Arc::new(RecordingTransport::new(ProcessRole::Browser));
        let mut router = BrowserRouter::new(config.clone(), transport.clone()).unwrap();
        for _ in 0..declining {
            router.add_handler(Arc::new(Decline), false);
        }
        router.add_handler(Arc::new(Answer), false);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("query_to_response", declining),
            &declining,
            |b, _| {
                let mut next = 0i64;
                b.iter(|| {
                    next += 1;
                    let start = RouterMessage::QueryStart {
                        id: QueryId(next),
                        request: "echo".into(),
                        persistent: false,
                    }
                    .to_named(&names);
                    router.on_message_received(&route, &start);
                    router.process_completions();
                    black_box(transport.take())
                })
            },
        );
    }

    group.finish();
}

// ============================================================================
// BOUNDARY: ENVELOPE CODEC
// ============================================================================

fn bench_envelope_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundary-envelope");
    let route = route();

    for size in [16usize, 1_024, 65_536] {
        let payload = "x".repeat(size);
        let message = NamedMessage::new("cefQueryResponse")
            .with_arg(QueryId(9).0)
            .with_arg(true)
            .with_arg(payload.as_str())
            .with_arg("");

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("seal", size), &message, |b, message| {
            b.iter(|| black_box(Envelope::seal(route.clone(), ProcessRole::Browser, message)))
        });

        let envelope = Envelope::seal(route.clone(), ProcessRole::Browser, &message).unwrap();
        group.bench_with_input(BenchmarkId::new("open", size), &envelope, |b, envelope| {
            b.iter(|| black_box(envelope.open()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_correlation_table,
    bench_handler_dispatch,
    bench_envelope_codec
);
criterion_main!(benches);
