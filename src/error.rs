//! Error types for stores and bindings.

use thiserror::Error;

/// Boxed error produced by a fallible update recipe.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by [`Store`](crate::Store) operations.
///
/// Most store operations are infallible; these only come back from the
/// `try_*` family.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The state was read before the initializer returned.
    #[error("store `{name}` is still running its initializer")]
    Initializing { name: String },

    /// The store was destroyed and was built with `reject_after_destroy`.
    #[error("store `{name}` has been destroyed")]
    Destroyed { name: String },

    /// A fallible recipe returned an error; the state was left untouched.
    #[error("update recipe for store `{name}` failed")]
    Recipe {
        name: String,
        #[source]
        source: BoxError,
    },
}

/// Errors surfaced by the store hooks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    /// A hook was called while no component was rendering on this thread.
    #[error("store hook called outside of a component render")]
    OutsideRender,

    /// The hook at this position held a different selection type last render.
    #[error("hook #{index} changed type between renders; hooks must be called in the same order")]
    HookMismatch { index: usize },
}
