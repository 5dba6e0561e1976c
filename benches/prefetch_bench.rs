//! Benchmarks for the prefetch hot paths.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use nav_prefetch::cache::PrefetchCache;
use nav_prefetch::intent::{IntentKind, PrefetchCandidate};
use nav_prefetch::route::UrlNormalizer;
use nav_prefetch::scheduler::PriorityQueue;

fn bench_bounded_cache(c: &mut Criterion) {
    let urls: Vec<String> = (0..10_000).map(|i| format!("/page/{i}")).collect();

    c.bench_function("bounded_cache_add_10k", |b| {
        b.iter(|| {
            let mut cache = PrefetchCache::bounded(50);
            for url in &urls {
                cache.add(url.as_str().into());
            }
            black_box(cache.len());
        })
    });

    let mut warm = PrefetchCache::bounded(50);
    for url in urls.iter().take(50) {
        warm.add(url.as_str().into());
    }
    c.bench_function("bounded_cache_has", |b| {
        b.iter(|| {
            for url in urls.iter().take(100) {
                black_box(warm.has(url));
            }
        })
    });
}

fn bench_priority_queue(c: &mut Criterion) {
    let candidates: Vec<PrefetchCandidate> = (0..500)
        .map(|i| {
            PrefetchCandidate::new(format!("/q/{i}").into(), IntentKind::Viewport)
                .with_priority(((i * 37) % 101) as f64)
        })
        .collect();

    c.bench_function("priority_queue_push_pop_500", |b| {
        b.iter(|| {
            let mut queue = PriorityQueue::new();
            for candidate in &candidates {
                queue.push(candidate.clone());
            }
            while let Some(next) = queue.pop() {
                black_box(next);
            }
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let normalizer = UrlNormalizer::new("https://label.example").unwrap();
    let hrefs = [
        "/feed?sort=new#top",
        "https://label.example/cabinet/releases?page=2",
        "https://elsewhere.example/feed",
        "mailto:info@label.example",
        "news/latest",
        "#",
    ];

    c.bench_function("internal_path_mixed_hrefs", |b| {
        b.iter(|| {
            for href in &hrefs {
                black_box(normalizer.internal_path(black_box(href)));
            }
        })
    });
}

criterion_group!(
    benches,
    bench_bounded_cache,
    bench_priority_queue,
    bench_normalize,
);
criterion_main!(benches);
