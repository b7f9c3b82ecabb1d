//! The store core.
//!
//! A [`Store`] owns one state value and a set of listeners. Updates are
//! expressed as [`Recipe`]s, resolved against the current state, compared by
//! `Arc` identity and, when something changed, fanned out to every listener
//! synchronously.

mod action;
mod recipe;
mod store;
mod subscription;

pub use action::Action;
pub use recipe::{Merge, Recipe, State, Update};
pub(crate) use store::{lock, read, write};
pub use store::{
    create_store, GetState, SetState, Store, StoreBuilder, StoreOptions, WeakStore,
};
pub use subscription::{Subscription, SubscriptionGuard};
