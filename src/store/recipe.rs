use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// How a state type absorbs a partial update.
///
/// Record-like states pick a `Partial` with one optional slot per field and
/// merge one level deep: nested values are replaced wholesale, never merged
/// recursively. Scalar-like states use `Partial = Self` and take the
/// candidate verbatim.
///
/// Record impls are usually generated with [`merge_state!`](crate::merge_state).
pub trait Merge: Sized {
    /// The shape of a partial update.
    type Partial;

    /// Shallow-merge `partial` over `self`.
    fn merge(&self, partial: Self::Partial) -> Self;

    /// Build a whole state from a partial, used when an update replaces.
    fn from_partial(partial: Self::Partial) -> Self;
}

/// Everything a type needs to live in a [`Store`](crate::Store).
pub trait State: Merge + Clone + Send + Sync + 'static {}

impl<T> State for T where T: Merge + Clone + Send + Sync + 'static {}

macro_rules! merge_by_replace {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Merge for $ty {
                type Partial = Self;

                fn merge(&self, partial: Self) -> Self {
                    partial
                }

                fn from_partial(partial: Self) -> Self {
                    partial
                }
            }
        )*
    };
}

merge_by_replace!(
    (), bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, &'static str,
);

impl<T> Merge for Vec<T> {
    type Partial = Self;

    fn merge(&self, partial: Self) -> Self {
        partial
    }

    fn from_partial(partial: Self) -> Self {
        partial
    }
}

impl<T> Merge for Option<T> {
    type Partial = Self;

    fn merge(&self, partial: Self) -> Self {
        partial
    }

    fn from_partial(partial: Self) -> Self {
        partial
    }
}

impl<T: ?Sized> Merge for Arc<T> {
    type Partial = Self;

    fn merge(&self, partial: Self) -> Self {
        partial
    }

    fn from_partial(partial: Self) -> Self {
        partial
    }
}

// Maps merge by key: entries in the partial override, the rest are kept.
impl<K: Ord + Clone, V: Clone> Merge for BTreeMap<K, V> {
    type Partial = Self;

    fn merge(&self, partial: Self) -> Self {
        let mut merged = self.clone();
        merged.extend(partial);
        merged
    }

    fn from_partial(partial: Self) -> Self {
        partial
    }
}

impl<K: Eq + std::hash::Hash + Clone, V: Clone> Merge for HashMap<K, V> {
    type Partial = Self;

    fn merge(&self, partial: Self) -> Self {
        let mut merged = self.clone();
        merged.extend(partial);
        merged
    }

    fn from_partial(partial: Self) -> Self {
        partial
    }
}

/// Declare a record state together with its patch type and [`Merge`] impl.
///
/// The patch struct holds an `Option` per field; `None` keeps the current
/// value on merge and falls back to `Default` on replace, so every field type
/// must implement `Default`.
///
/// ```
/// honeypot::merge_state! {
///     #[derive(Clone, Debug, Default, PartialEq)]
///     pub struct Counter => CounterPatch {
///         pub count: i64,
///         pub label: String,
///     }
/// }
///
/// use honeypot::Merge;
///
/// let state = Counter { count: 1, label: "clicks".into() };
/// let next = state.merge(CounterPatch { count: Some(2), ..Default::default() });
/// assert_eq!(next, Counter { count: 2, label: "clicks".into() });
/// ```
#[macro_export]
macro_rules! merge_state {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $patch:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        #[doc = concat!("Partial update for [`", stringify!($name), "`].")]
        #[derive(Clone, Default)]
        $vis struct $patch {
            $(
                $field_vis $field: ::core::option::Option<$ty>,
            )*
        }

        impl $crate::Merge for $name {
            type Partial = $patch;

            fn merge(&self, partial: $patch) -> Self {
                Self {
                    $(
                        $field: match partial.$field {
                            ::core::option::Option::Some(value) => value,
                            ::core::option::Option::None => ::core::clone::Clone::clone(&self.$field),
                        },
                    )*
                }
            }

            fn from_partial(partial: $patch) -> Self {
                Self {
                    $(
                        $field: partial.$field.unwrap_or_default(),
                    )*
                }
            }
        }
    };
}

/// A resolved update candidate.
pub enum Update<T: Merge> {
    /// A whole next state. Handing back the current `Arc` is a no-op.
    Replace(Arc<T>),
    /// A partial to shallow-merge over the current state.
    Merge(T::Partial),
}

impl<T: Merge> Update<T> {
    /// Replace with a freshly allocated value.
    pub fn value(state: T) -> Self {
        Update::Replace(Arc::new(state))
    }

    /// Keep the given state as-is.
    pub fn keep(current: &Arc<T>) -> Self {
        Update::Replace(Arc::clone(current))
    }
}

impl<T: Merge> fmt::Debug for Update<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Replace(_) => f.write_str("Update::Replace"),
            Update::Merge(_) => f.write_str("Update::Merge"),
        }
    }
}

type ComputeFn<T> = Box<dyn FnOnce(&Arc<T>) -> Update<T> + Send>;
type MutateFn<T> = Box<dyn FnOnce(&mut T) + Send>;

/// The argument to a state update.
///
/// Recipes live for a single `set_state` call.
pub enum Recipe<T: Merge> {
    /// A literal replacement or partial.
    Set(Update<T>),
    /// Derive the candidate from the current state.
    Compute(ComputeFn<T>),
    /// Mutate a draft copy of the current state.
    Mutate(MutateFn<T>),
}

impl<T: Merge> Recipe<T> {
    /// Replace the state with `state`.
    pub fn value(state: T) -> Self {
        Recipe::Set(Update::value(state))
    }

    /// Shallow-merge `partial` over the state.
    pub fn partial(partial: T::Partial) -> Self {
        Recipe::Set(Update::Merge(partial))
    }

    /// Compute the candidate from the current state.
    pub fn compute<F>(f: F) -> Self
    where
        F: FnOnce(&Arc<T>) -> Update<T> + Send + 'static,
    {
        Recipe::Compute(Box::new(f))
    }

    /// Mutate a draft of the current state.
    pub fn mutate<F>(f: F) -> Self
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        Recipe::Mutate(Box::new(f))
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Recipe::Set(Update::Replace(_)) => "replace",
            Recipe::Set(Update::Merge(_)) => "partial",
            Recipe::Compute(_) => "compute",
            Recipe::Mutate(_) => "mutate",
        }
    }
}

impl<T: Merge> From<Update<T>> for Recipe<T> {
    fn from(update: Update<T>) -> Self {
        Recipe::Set(update)
    }
}

impl<T: Merge> From<Arc<T>> for Recipe<T> {
    fn from(state: Arc<T>) -> Self {
        Recipe::Set(Update::Replace(state))
    }
}

impl<T: Merge> fmt::Debug for Recipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Recipe::{}", self.kind())
    }
}
