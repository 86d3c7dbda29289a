//! Locator Operations Benchmarks
//!
//! Benchmarks for selector rendering, URL pattern matching, and test-data
//! building.
//!
//! Run with: `cargo bench --bench locator_ops`

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use escaparate::prelude::*;

fn bench_selector_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_rendering");

    let selectors = vec![
        ("test_id", Selector::test_id("login-button")),
        ("id", Selector::id("react-burger-menu-btn")),
        ("class", Selector::class("inventory_item")),
        ("css", Selector::css("div.inventory_list > .inventory_item")),
    ];

    for (name, selector) in &selectors {
        group.bench_with_input(BenchmarkId::from_parameter(name), selector, |bench, sel| {
            bench.iter(|| {
                let css = black_box(sel).to_css();
                black_box(css);
            });
        });
    }

    group.finish();
}

fn bench_locator_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("locator_creation");

    group.bench_function("test_id", |bench| {
        bench.iter(|| black_box(Locator::test_id(black_box("username"))));
    });
    group.bench_function("class", |bench| {
        bench.iter(|| black_box(Locator::class(black_box("shopping_cart_badge"))));
    });

    group.finish();
}

fn bench_url_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("url_matching");
    let url = "https://www.saucedemo.com/inventory.html";

    let patterns = vec![
        ("exact", UrlPattern::exact(url)),
        ("prefix", UrlPattern::prefix("https://www.saucedemo.com")),
        ("root", UrlPattern::root("https://www.saucedemo.com/")),
        ("glob", UrlPattern::glob("*/inventory.html")),
        (
            "regex",
            UrlPattern::regex(r"^https://www\.saucedemo\.com/inventory\.html$").unwrap(),
        ),
    ];

    for (name, pattern) in &patterns {
        group.bench_with_input(BenchmarkId::from_parameter(name), pattern, |bench, p| {
            bench.iter(|| black_box(p.matches(black_box(url))));
        });
    }

    group.finish();
}

fn bench_user_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("user_building");
    let clock = FakeClock::new(1_705_312_800_000);

    group.bench_function("defaults", |bench| {
        bench.iter(|| black_box(UserBuilder::with_clock(&clock).build()));
    });
    group.bench_function("admin_preset", |bench| {
        bench.iter(|| black_box(UserBuilder::admin_with_clock(&clock).build()));
    });
    group.bench_function("customized", |bench| {
        bench.iter(|| {
            let mut builder = UserBuilder::with_clock(&clock);
            builder
                .with_name("Bench User")
                .with_email("bench@example.com")
                .with_active_status(false);
            black_box(builder.build())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_selector_rendering,
    bench_locator_creation,
    bench_url_matching,
    bench_user_building
);
criterion_main!(benches);
