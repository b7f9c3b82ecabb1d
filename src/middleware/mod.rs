//! Update middleware.
//!
//! A middleware wraps a state initializer. Before the inner initializer runs,
//! it wraps the setter it was given, installs the wrapped setter into the
//! store's setter slot and then hands the same wrapped setter to the inner
//! initializer, so updates issued through either path go through it.

mod draft;
mod immer;

pub use draft::produce;
pub use immer::immer;

use crate::store::{GetState, SetState, State, Store};

/// Build a middleware from a setter transformation.
///
/// `wrap` receives the setter passed to the returned initializer (the core
/// setter, or the next middleware's wrapper) and returns its replacement.
pub fn intercept<T, F, W>(creator: F, wrap: W) -> impl FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T
where
    T: State,
    F: FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T,
    W: FnOnce(SetState<T>) -> SetState<T>,
{
    move |set: SetState<T>, get: GetState<T>, store: &Store<T>| {
        let wrapped = wrap(set);
        store.replace_setter(wrapped.clone());
        tracing::debug!(store = %store.name(), "setter middleware installed");
        creator(wrapped, get, store)
    }
}

/// Emit a `debug` event for every update before forwarding it.
pub fn trace_updates<T, F>(creator: F) -> impl FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T
where
    T: State,
    F: FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T,
{
    move |set: SetState<T>, get: GetState<T>, store: &Store<T>| {
        let name = store.name().to_string();
        let traced = intercept(creator, move |set: SetState<T>| {
            SetState::new(move |recipe, replace| {
                tracing::debug!(store = %name, kind = recipe.kind(), replace, "state update");
                set.call(recipe, replace);
            })
        });
        traced(set, get, store)
    }
}
