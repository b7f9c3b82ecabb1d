use std::sync::{Arc, Mutex, RwLock};

use crate::store::{lock, read, write};

pub(crate) type SelectorFn<T, U> = Arc<dyn Fn(&Arc<T>) -> U + Send + Sync>;
pub(crate) type EqualityFn<U> = Arc<dyn Fn(&U, &U) -> bool + Send + Sync>;

struct Selection<T, U> {
    snapshot: Arc<T>,
    value: U,
}

/// Memoized selection of one hook.
///
/// The memo remembers the snapshot it was computed from and the value handed
/// out. A new value replaces the memo only when the equality function says it
/// differs; otherwise the previous value keeps being returned.
pub(crate) struct SelectorHook<T, U> {
    selector: RwLock<SelectorFn<T, U>>,
    equality: RwLock<EqualityFn<U>>,
    memo: Mutex<Option<Selection<T, U>>>,
}

impl<T, U: Clone> SelectorHook<T, U> {
    pub(crate) fn new(selector: SelectorFn<T, U>, equality: EqualityFn<U>) -> Self {
        Self {
            selector: RwLock::new(selector),
            equality: RwLock::new(equality),
            memo: Mutex::new(None),
        }
    }

    /// Install the selector and equality function from the latest render.
    pub(crate) fn set_functions(&self, selector: SelectorFn<T, U>, equality: EqualityFn<U>) {
        *write(&self.selector) = selector;
        *write(&self.equality) = equality;
    }

    /// Select from `snapshot`, returning the value to hand out and whether it
    /// differs from the memoized one.
    ///
    /// With `reuse_snapshot`, a snapshot identical to the memoized one returns
    /// the memo without calling the selector. Renders pass `false` because
    /// the selector itself may have changed.
    pub(crate) fn select(&self, snapshot: Arc<T>, reuse_snapshot: bool) -> (U, bool) {
        let previous = {
            let memo = lock(&self.memo);
            match memo.as_ref() {
                Some(memo) if reuse_snapshot && Arc::ptr_eq(&memo.snapshot, &snapshot) => {
                    return (memo.value.clone(), false);
                }
                Some(memo) => Some(memo.value.clone()),
                None => None,
            }
        };

        // User code runs without any lock held; it may update the store.
        let selector = Arc::clone(&read(&self.selector));
        let equality = Arc::clone(&read(&self.equality));
        let next = selector(&snapshot);
        let (value, changed) = match previous {
            Some(previous) if equality(&previous, &next) => (previous, false),
            _ => (next, true),
        };

        *lock(&self.memo) = Some(Selection {
            snapshot,
            value: value.clone(),
        });
        (value, changed)
    }
}
