use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex};

use super::component::{self, ComponentInner, Phase};
use super::selector::{EqualityFn, SelectorFn, SelectorHook};
use crate::error::BindingError;
use crate::store::{create_store, lock, GetState, SetState, State, Store, SubscriptionGuard};

/// Per-component state of one store hook.
struct StoreHook<T, U> {
    selection: Arc<SelectorHook<T, U>>,
    subscription: Mutex<Option<SubscriptionGuard>>,
}

impl<T, U> StoreHook<T, U> {
    /// Subscribe on first use. Returns whether a subscription was made.
    fn subscribe_once<F>(&self, subscribe: F) -> bool
    where
        F: FnOnce() -> SubscriptionGuard,
    {
        let mut slot = lock(&self.subscription);
        if slot.is_some() {
            return false;
        }
        *slot = Some(subscribe());
        true
    }
}

/// A store bound to the hook layer.
///
/// Derefs to [`Store`], so `get_state`, `set_state`, `subscribe`, `destroy`
/// and `get_initial_state` stay reachable without going through a hook.
pub struct BoundStore<T: State> {
    store: Store<T>,
    server_state: Option<GetState<T>>,
}

/// Create a store and bind it for use from components.
///
/// ```
/// use honeypot::binding::{create, Component, RenderMode};
/// use honeypot::Recipe;
///
/// let clicks = create(|_, _, _| 0_u32);
/// let button = Component::new(RenderMode::Client);
///
/// assert_eq!(button.render(|| clicks.use_selector(|n| **n)), 0);
/// clicks.set_state(Recipe::value(1), false);
/// assert!(button.needs_render());
/// assert_eq!(button.render(|| clicks.use_selector(|n| **n)), 1);
/// ```
pub fn create<T, F>(creator: F) -> BoundStore<T>
where
    T: State,
    F: FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T,
{
    bind(create_store(creator))
}

/// Bind an existing store.
pub fn bind<T: State>(store: Store<T>) -> BoundStore<T> {
    BoundStore {
        store,
        server_state: None,
    }
}

impl<T: State> BoundStore<T> {
    /// Declare the snapshot read by server and hydrating renders.
    pub fn with_server_state<F>(mut self, get: F) -> Self
    where
        F: Fn() -> Arc<T> + Send + Sync + 'static,
    {
        self.server_state = Some(GetState::new(move || Some(get())));
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &Store<T> {
        &self.store
    }

    /// The server snapshot, falling back to the live state when none was
    /// declared.
    pub fn get_server_snapshot(&self) -> Arc<T> {
        self.server_state
            .as_ref()
            .and_then(GetState::try_get)
            .unwrap_or_else(|| self.store.get_state())
    }

    /// The whole state; re-renders on any change.
    ///
    /// # Panics
    ///
    /// Panics outside [`Component::render`](super::Component::render) or when
    /// hook order changed between renders.
    pub fn use_store(&self) -> Arc<T> {
        self.try_use_store().unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`use_store`](Self::use_store).
    pub fn try_use_store(&self) -> Result<Arc<T>, BindingError> {
        self.try_use_selector_with(|state: &Arc<T>| Arc::clone(state), |a: &Arc<T>, b: &Arc<T>| {
            Arc::ptr_eq(a, b)
        })
    }

    /// A slice of the state; re-renders when the slice stops being `==`.
    ///
    /// # Panics
    ///
    /// Same as [`use_store`](Self::use_store).
    pub fn use_selector<U, S>(&self, selector: S) -> U
    where
        U: PartialEq + Clone + Send + Sync + 'static,
        S: Fn(&Arc<T>) -> U + Send + Sync + 'static,
    {
        self.try_use_selector(selector).unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`use_selector`](Self::use_selector).
    pub fn try_use_selector<U, S>(&self, selector: S) -> Result<U, BindingError>
    where
        U: PartialEq + Clone + Send + Sync + 'static,
        S: Fn(&Arc<T>) -> U + Send + Sync + 'static,
    {
        self.try_use_selector_with(selector, |a: &U, b: &U| a == b)
    }

    /// A slice of the state; re-renders when `equality` reports a change.
    ///
    /// # Panics
    ///
    /// Same as [`use_store`](Self::use_store).
    pub fn use_selector_with<U, S, E>(&self, selector: S, equality: E) -> U
    where
        U: Clone + Send + Sync + 'static,
        S: Fn(&Arc<T>) -> U + Send + Sync + 'static,
        E: Fn(&U, &U) -> bool + Send + Sync + 'static,
    {
        self.try_use_selector_with(selector, equality)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Fallible form of [`use_selector_with`](Self::use_selector_with).
    pub fn try_use_selector_with<U, S, E>(&self, selector: S, equality: E) -> Result<U, BindingError>
    where
        U: Clone + Send + Sync + 'static,
        S: Fn(&Arc<T>) -> U + Send + Sync + 'static,
        E: Fn(&U, &U) -> bool + Send + Sync + 'static,
    {
        let cx = component::current().ok_or(BindingError::OutsideRender)?;
        let selector: SelectorFn<T, U> = Arc::new(selector);
        let equality: EqualityFn<U> = Arc::new(equality);

        let hook = cx.next_hook(|| StoreHook {
            selection: Arc::new(SelectorHook::new(Arc::clone(&selector), Arc::clone(&equality))),
            subscription: Mutex::new(None),
        })?;
        hook.selection.set_functions(selector, equality);

        let phase = cx.phase();
        let snapshot = match phase {
            Phase::Client => self.store.get_state(),
            Phase::Server | Phase::Hydrating => self.get_server_snapshot(),
        };
        let (value, _) = hook.selection.select(snapshot, false);

        if phase != Phase::Server && hook.subscribe_once(|| self.listen(&hook.selection, &cx)) {
            // The live state may differ from what this render read: a
            // hydration mismatch, or an update between render and subscribe.
            let (_, changed) = hook.selection.select(self.store.get_state(), true);
            if changed {
                tracing::debug!(store = %self.store.name(), ?phase, "selection moved before subscribe");
                cx.invalidate();
            }
        }

        Ok(value)
    }

    fn listen<U>(&self, selection: &Arc<SelectorHook<T, U>>, cx: &Arc<ComponentInner>) -> SubscriptionGuard
    where
        U: Clone + Send + Sync + 'static,
    {
        let selection = Arc::clone(selection);
        let component = Arc::downgrade(cx);
        let store = self.store.downgrade();
        self.store
            .subscribe(move |_, _| {
                let (Some(store), Some(component)) = (store.upgrade(), component.upgrade()) else {
                    return;
                };
                let (_, changed) = selection.select(store.get_state(), true);
                if changed {
                    component.invalidate();
                }
            })
            .into_guard()
    }
}

impl<T: State> Deref for BoundStore<T> {
    type Target = Store<T>;

    fn deref(&self) -> &Store<T> {
        &self.store
    }
}

impl<T: State> Clone for BoundStore<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            server_state: self.server_state.clone(),
        }
    }
}

impl<T: State + fmt::Debug> fmt::Debug for BoundStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundStore")
            .field("store", &self.store)
            .field("server_state", &self.server_state.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Component, RenderMode};
    use crate::Recipe;
    use std::sync::atomic::{AtomicUsize, Ordering};

    crate::merge_state! {
        #[derive(Clone, Debug, Default, PartialEq)]
        struct Den => DenPatch {
            bears: u32,
            count: u32,
        }
    }

    fn den() -> BoundStore<Den> {
        create(|_, _, _| Den {
            bears: 0,
            count: 100,
        })
    }

    fn bump_count(store: &BoundStore<Den>) {
        store.set_state(Recipe::mutate(|den: &mut Den| den.count += 1), false);
    }

    fn bump_bears(store: &BoundStore<Den>) {
        store.set_state(Recipe::mutate(|den: &mut Den| den.bears += 1), false);
    }

    #[test]
    fn hook_outside_render_is_an_error() {
        let store = den();
        assert_eq!(store.try_use_store().unwrap_err(), BindingError::OutsideRender);
    }

    #[test]
    fn use_store_returns_whole_state() {
        let store = den();
        let view = Component::new(RenderMode::Client);

        let state = view.render(|| store.use_store());
        assert!(Arc::ptr_eq(&state, &store.get_state()));

        bump_count(&store);
        assert!(view.needs_render());
    }

    #[test]
    fn selector_gates_rerenders() {
        let store = den();
        let scheduled = Arc::new(AtomicUsize::new(0));
        let scheduled_clone = scheduled.clone();
        let view = Component::with_scheduler(RenderMode::Client, move || {
            scheduled_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(view.render(|| store.use_selector(|den| den.bears)), 0);

        bump_count(&store);
        assert!(!view.needs_render());
        assert_eq!(scheduled.load(Ordering::SeqCst), 0);

        bump_bears(&store);
        assert!(view.needs_render());
        assert_eq!(scheduled.load(Ordering::SeqCst), 1);
        assert_eq!(view.render(|| store.use_selector(|den| den.bears)), 1);
    }

    #[test]
    fn custom_equality_decides_change() {
        let store = den();
        let view = Component::new(RenderMode::Client);
        let parity = |den: &Arc<Den>| den.bears;
        let same_parity = |a: &u32, b: &u32| a % 2 == b % 2;

        view.render(|| store.use_selector_with(parity, same_parity));
        bump_bears(&store);
        assert!(view.needs_render());

        assert_eq!(view.render(|| store.use_selector_with(parity, same_parity)), 1);
        store.set_state(Recipe::mutate(|den: &mut Den| den.bears += 2), false);
        assert!(!view.needs_render());

        // The equal slice keeps the value from before.
        assert_eq!(view.render(|| store.use_selector_with(parity, same_parity)), 1);
    }

    #[test]
    fn one_subscription_per_hook() {
        let store = den();
        let view = Component::new(RenderMode::Client);

        for _ in 0..3 {
            view.render(|| {
                store.use_selector(|den| den.bears);
                store.use_selector(|den| den.count);
            });
        }

        assert_eq!(view.hook_count(), 2);
        assert_eq!(store.listener_count(), 2);
        drop(view);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn server_render_reads_server_snapshot_without_subscribing() {
        let store = den().with_server_state(|| {
            Arc::new(Den {
                bears: 7,
                count: 0,
            })
        });
        let view = Component::new(RenderMode::Server);

        assert_eq!(view.render(|| store.use_selector(|den| den.bears)), 7);
        assert_eq!(store.listener_count(), 0);

        bump_bears(&store);
        assert!(!view.needs_render());
    }

    #[test]
    fn server_snapshot_falls_back_to_live_state() {
        let store = den();
        assert!(Arc::ptr_eq(&store.get_server_snapshot(), &store.get_state()));
    }

    #[test]
    fn hydration_mismatch_schedules_client_render() {
        let store = den().with_server_state(|| {
            Arc::new(Den {
                bears: 3,
                count: 100,
            })
        });
        let view = Component::new(RenderMode::Hydrate);

        assert_eq!(view.render(|| store.use_selector(|den| den.bears)), 3);
        assert!(view.needs_render());

        assert_eq!(view.render(|| store.use_selector(|den| den.bears)), 0);
        assert!(!view.needs_render());
    }

    #[test]
    fn hydration_match_does_not_rerender() {
        let store = den().with_server_state(|| {
            Arc::new(Den {
                bears: 0,
                count: 5,
            })
        });
        let view = Component::new(RenderMode::Hydrate);

        assert_eq!(view.render(|| store.use_selector(|den| den.bears)), 0);
        assert!(!view.needs_render());
        assert_eq!(store.listener_count(), 1);
    }

    #[test]
    fn changed_hook_order_is_reported() {
        let store = den();
        let view = Component::new(RenderMode::Client);

        view.render(|| store.use_selector(|den| den.bears));
        let err = view.render(|| store.try_use_selector(|den| den.bears == 0).unwrap_err());
        assert_eq!(err, BindingError::HookMismatch { index: 0 });
    }

    #[test]
    fn deref_exposes_store_api() {
        let store = den();
        store.set_state(
            Recipe::partial(DenPatch {
                bears: Some(4),
                ..Default::default()
            }),
            false,
        );
        assert_eq!(store.get_state().bears, 4);
        assert_eq!(store.get_initial_state().bears, 0);
        store.destroy();
        assert!(store.is_destroyed());
    }
}
