//! # Honeypot
//!
//! A small observable-state container for Rust.
//!
//! Honeypot keeps one state value per store and offers three layers on top of
//! it:
//!
//! ## Store (core)
//!
//! - `Store<T>` - the current state as an `Arc<T>`, its listeners, and the
//!   initial snapshot
//! - `Recipe<T>` - explicit update shapes: replace, partial merge, computed,
//!   or draft mutation
//! - `Merge` - the per-type shallow-merge strategy (see [`merge_state!`])
//!
//! ## Middleware
//!
//! Initializer wrappers that intercept the setter before application code
//! captures it:
//! - `immer` - write updates as draft mutations
//! - `trace_updates` - log every update through `tracing`
//!
//! ## Binding
//!
//! Selector hooks for a rendering layer:
//! - `BoundStore<T>` - `use_store`, `use_selector`, `use_selector_with`
//! - `Component` - headless render context with re-render scheduling
//!
//! ```
//! use honeypot::binding::{create, Component, RenderMode};
//! use honeypot::middleware::immer;
//! use honeypot::{merge_state, Action, SetState};
//!
//! merge_state! {
//!     #[derive(Clone, Debug, Default, PartialEq)]
//!     pub struct Bears => BearsPatch {
//!         pub bears: u32,
//!         pub increase: Action,
//!     }
//! }
//!
//! let store = create(immer(|set: SetState<Bears>, _, _| Bears {
//!     bears: 0,
//!     increase: Action::new(move |()| set.mutate(|s| s.bears += 1)),
//! }));
//!
//! let view = Component::new(RenderMode::Client);
//! assert_eq!(view.render(|| store.use_selector(|s| s.bears)), 0);
//!
//! store.get_state().increase.run();
//! assert!(view.needs_render());
//! assert_eq!(view.render(|| store.use_selector(|s| s.bears)), 1);
//! ```

pub mod binding;
pub mod error;
pub mod middleware;
pub mod store;

// Re-export main types for convenience
pub use binding::{create, BoundStore, Component, RenderMode};
pub use error::{BindingError, StoreError};
pub use store::{
    create_store, Action, GetState, Merge, Recipe, SetState, State, Store, StoreBuilder,
    StoreOptions, Subscription, SubscriptionGuard, Update, WeakStore,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let store = create_store(|_, _, _| 0_i32);
        assert_eq!(*store.get_state(), 0);
        store.set_state(Recipe::value(42), false);
        assert_eq!(*store.get_state(), 42);
    }
}
