//! The bears page: one store, two views, and buttons wired to actions.

use honeypot::binding::{create, BoundStore, Component, RenderMode};
use honeypot::middleware::{immer, trace_updates};
use honeypot::{merge_state, Action, SetState};

merge_state! {
    #[derive(Clone, Debug, Default, PartialEq)]
    struct BearState => BearPatch {
        bears: i64,
        increase: Action<i64>,
        decrease: Action<i64>,
        reset: Action,
        count: i64,
        increase_count: Action,
    }
}

fn bear_store() -> BoundStore<BearState> {
    create(trace_updates(immer(|set: SetState<BearState>, _, _| {
        let action = |f: fn(&mut BearState, i64)| {
            let set = set.clone();
            Action::new(move |by: i64| set.mutate(move |d| f(d, by)))
        };
        BearState {
            bears: 0,
            increase: action(|d, by| d.bears += by),
            decrease: action(|d, by| d.bears -= by),
            reset: Action::new({
                let set = set.clone();
                move |()| set.mutate(|d| d.bears = 0)
            }),
            count: 100,
            increase_count: Action::new({
                let set = set.clone();
                move |()| set.mutate(|d| d.count += 1)
            }),
        }
    })))
}

fn main() {
    println!("=== Bears Page ===\n");

    let store = bear_store();
    let bears_button = Component::new(RenderMode::Client);
    let count_button = Component::new(RenderMode::Client);

    let render_all = |step: &str| {
        println!("{step}");
        if bears_button.needs_render() || bears_button.render_count() == 0 {
            let bears = bears_button.render(|| store.use_selector(|s| s.bears));
            println!("   [render] increase: {bears}");
        }
        if count_button.needs_render() || count_button.render_count() == 0 {
            let count = count_button.render(|| store.use_selector(|s| s.count));
            println!("   [render] count: {count}");
        }
    };

    render_all("1. First paint");

    store.get_state().increase.call(1);
    render_all("\n2. Click increase");

    store.get_state().increase.call(1);
    render_all("\n3. Click increase again");

    store.get_state().increase_count.run();
    render_all("\n4. Click count (only the count button repaints)");

    store.get_state().decrease.call(1);
    render_all("\n5. Click decrease");

    store.get_state().reset.run();
    render_all("\n6. Click reset");

    store.get_state().reset.run();
    render_all("\n7. Click reset with no bears (nothing repaints)");

    let state = store.get_state();
    println!("\nFinal state: bears = {}, count = {}", state.bears, state.count);
    println!(
        "Renders: bears button = {}, count button = {}",
        bears_button.render_count(),
        count_button.render_count()
    );
}
