use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use std::sync::Arc;

use honeypot::binding::{create, Component, RenderMode};
use honeypot::middleware::immer;
use honeypot::{create_store, merge_state, Recipe, Update};

merge_state! {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct State => StatePatch {
        counter: usize,
        name: String,
    }
}

fn initial() -> State {
    State {
        counter: 0,
        name: "test".to_string(),
    }
}

fn store_creation_benchmark(c: &mut Criterion) {
    c.bench_function("store_creation", |b| {
        b.iter(|| create_store(|_, _, _| black_box(initial())));
    });
}

fn store_read_benchmark(c: &mut Criterion) {
    let store = create_store(|_, _, _| initial());

    c.bench_function("store_read", |b| {
        b.iter(|| {
            black_box(store.get_state());
        });
    });
}

fn store_mutate_benchmark(c: &mut Criterion) {
    let store = create_store(|_, _, _| initial());

    c.bench_function("store_mutate", |b| {
        let mut i = 0;
        b.iter(|| {
            store.set_state(
                Recipe::mutate(move |state: &mut State| state.counter = black_box(i)),
                false,
            );
            i += 1;
        });
    });
}

fn store_noop_benchmark(c: &mut Criterion) {
    let store = create_store(|_, _, _| initial());
    store.subscribe(|_, _| {});

    c.bench_function("store_noop", |b| {
        b.iter(|| {
            store.set_state(Recipe::compute(|state: &Arc<State>| Update::keep(state)), false);
        });
    });
}

fn immer_mutate_benchmark(c: &mut Criterion) {
    let store = create_store(immer(|_, _, _| initial()));

    c.bench_function("immer_mutate", |b| {
        let mut i = 0;
        b.iter(|| {
            store.set_state(
                Recipe::mutate(move |state: &mut State| state.counter = black_box(i)),
                false,
            );
            i += 1;
        });
    });
}

fn store_subscribe_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("store_subscribe");

    for subscriber_count in [1, 10, 100].iter() {
        let store = create_store(|_, _, _| initial());

        for _ in 0..*subscriber_count {
            store.subscribe(|_, _| {
                // Empty subscriber
            });
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(subscriber_count),
            subscriber_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    store.set_state(
                        Recipe::mutate(move |state: &mut State| state.counter = black_box(i)),
                        false,
                    );
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

fn selector_gating_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_gating");

    for component_count in [1, 10, 100].iter() {
        let store = create(|_, _, _| initial());
        let components: Vec<Component> = (0..*component_count)
            .map(|_| Component::new(RenderMode::Client))
            .collect();
        for component in &components {
            component.render(|| store.use_selector(|state| state.name.clone()));
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(component_count),
            component_count,
            |b, _| {
                let mut i = 0;
                b.iter(|| {
                    store.set_state(
                        Recipe::mutate(move |state: &mut State| state.counter = black_box(i)),
                        false,
                    );
                    i += 1;
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    store_creation_benchmark,
    store_read_benchmark,
    store_mutate_benchmark,
    store_noop_benchmark,
    immer_mutate_benchmark,
    store_subscribe_benchmark,
    selector_gating_benchmark,
);
criterion_main!(benches);
