//! Hooks that read a store from a rendering component.
//!
//! A [`BoundStore`] pairs a [`Store`](crate::Store) with the hooks
//! [`use_store`](BoundStore::use_store),
//! [`use_selector`](BoundStore::use_selector) and
//! [`use_selector_with`](BoundStore::use_selector_with). Each hook call made
//! inside [`Component::render`] selects a slice of the state, subscribes the
//! component on first use, and marks it stale only when a later store change
//! produces a slice the equality function considers different.
//!
//! Server renders read the declared server snapshot and never subscribe.
//! Hydrating renders start from the server snapshot and reconcile with the
//! live state once subscribed.

mod bound;
mod component;
mod selector;

pub use bound::{bind, create, BoundStore};
pub use component::{Component, RenderMode};
