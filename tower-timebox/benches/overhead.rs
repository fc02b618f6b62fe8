use std::hint::black_box;
use std::time::Duration;

use criterion::BenchmarkGroup;
use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;
use http::Request;
use timebox::Body;
use timebox::Context;
use timebox::NO_TIMEOUT;
use timebox::ResponseRecorder;
use tower::BoxError;
use tower::Service;
use tower::ServiceBuilder;
use tower::ServiceExt;
use tower::service_fn;
use tower::util::BoxCloneSyncService;
use tower_timebox::TimeoutLayer;

// --- HELPERS & TYPES ---

type BenchService = BoxCloneSyncService<Context, (), BoxError>;

async fn hello_handler(mut c: Context) -> Result<(), BoxError> {
    c.string(200, "hello, world\n")?;
    Ok(())
}

fn bench_overhead(
    group: &mut BenchmarkGroup<WallTime>,
    rt: &tokio::runtime::Runtime,
    id: &str,
    svc: BenchService,
) {
    group.bench_function(id, |b| {
        b.to_async(rt).iter(|| {
            let mut s = svc.clone();
            async move {
                let req = Request::get("/").body(Body::empty()).unwrap();
                let c = Context::new(req, ResponseRecorder::new());
                let res = s.ready().await.unwrap().call(c).await;
                black_box(res)
            }
        });
    });
}

// --- MAIN BENCHMARK ---

fn bench_all_scenarios(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    let scenarios: Vec<(&str, BenchService)> = vec![
        (
            "bare_handler",
            BoxCloneSyncService::new(service_fn(hello_handler)),
        ),
        (
            "passthrough",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .layer(TimeoutLayer::new(NO_TIMEOUT))
                    .service(service_fn(hello_handler)),
            ),
        ),
        (
            "timed",
            BoxCloneSyncService::new(
                ServiceBuilder::new()
                    .layer(TimeoutLayer::new(Duration::from_secs(1)))
                    .service(service_fn(hello_handler)),
            ),
        ),
    ];

    let mut group = c.benchmark_group("handler_timeout_overhead");
    for (id, svc) in scenarios {
        bench_overhead(&mut group, &rt, id, svc);
    }
    group.finish();
}

criterion_group!(benches, bench_all_scenarios);
criterion_main!(benches);
