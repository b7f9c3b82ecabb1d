use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    Weak,
};

use tracing::{debug, trace, warn};

use super::recipe::{Recipe, State, Update};
use super::subscription::{ListenerRegistry, Subscription};
use crate::error::{BoxError, StoreError};

type Listener<T> = Arc<dyn Fn(&T, &T) + Send + Sync>;

// Guarded data is only written in a single assignment after user code has
// returned, so a poisoned lock still guards consistent data.
pub(crate) fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The setter handed to initializers and installed in the store's setter slot.
pub struct SetState<T: State> {
    set: Arc<dyn Fn(Recipe<T>, bool) + Send + Sync>,
}

impl<T: State> SetState<T> {
    /// Wrap a raw setter function.
    pub fn new<F>(set: F) -> Self
    where
        F: Fn(Recipe<T>, bool) + Send + Sync + 'static,
    {
        Self { set: Arc::new(set) }
    }

    /// Apply `recipe`, replacing instead of merging when `replace` is set.
    pub fn call(&self, recipe: Recipe<T>, replace: bool) {
        (self.set)(recipe, replace)
    }

    /// Apply `recipe` with merge semantics.
    pub fn set(&self, recipe: Recipe<T>) {
        self.call(recipe, false)
    }

    /// Apply `recipe` with replace semantics.
    pub fn replace(&self, recipe: Recipe<T>) {
        self.call(recipe, true)
    }

    /// Shallow-merge a partial.
    pub fn patch(&self, partial: T::Partial) {
        self.call(Recipe::partial(partial), false)
    }

    /// Derive the update from the current state.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Arc<T>) -> Update<T> + Send + 'static,
    {
        self.call(Recipe::compute(f), false)
    }

    /// Mutate a draft of the current state.
    pub fn mutate<F>(&self, f: F)
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        self.call(Recipe::mutate(f), false)
    }

    /// Whether both handles wrap the same setter function.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.set, &other.set)
    }
}

impl<T: State> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            set: Arc::clone(&self.set),
        }
    }
}

impl<T: State> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SetState(..)")
    }
}

/// Read access to a store's current state.
pub struct GetState<T> {
    get: Arc<dyn Fn() -> Option<Arc<T>> + Send + Sync>,
}

impl<T> GetState<T> {
    /// Wrap a raw getter function.
    pub fn new<F>(get: F) -> Self
    where
        F: Fn() -> Option<Arc<T>> + Send + Sync + 'static,
    {
        Self { get: Arc::new(get) }
    }

    /// The current state, if the store is alive and initialized.
    pub fn try_get(&self) -> Option<Arc<T>> {
        (self.get)()
    }

    /// The current state.
    ///
    /// # Panics
    ///
    /// Panics when called from the initializer body before it returns, or
    /// after the store has been dropped.
    pub fn get(&self) -> Arc<T> {
        match self.try_get() {
            Some(state) => state,
            None => panic!("state read before the store finished initializing or after it was dropped"),
        }
    }
}

impl<T> Clone for GetState<T> {
    fn clone(&self) -> Self {
        Self {
            get: Arc::clone(&self.get),
        }
    }
}

impl<T> fmt::Debug for GetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GetState(..)")
    }
}

/// Store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// Name attached to every log event of this store.
    pub name: String,
    /// Refuse updates once [`Store::destroy`] has run.
    pub reject_after_destroy: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            name: "store".to_string(),
            reject_after_destroy: false,
        }
    }
}

/// Builder for [`Store`].
#[derive(Debug, Clone, Default)]
pub struct StoreBuilder {
    options: StoreOptions,
}

impl StoreBuilder {
    /// A builder with default [`StoreOptions`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used in log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    /// Make the store terminal after [`Store::destroy`].
    ///
    /// Off by default: a destroyed store keeps accepting updates and simply
    /// has nobody to notify.
    pub fn reject_after_destroy(mut self, reject: bool) -> Self {
        self.options.reject_after_destroy = reject;
        self
    }

    /// The options collected so far.
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Run `creator` once and return the live store.
    pub fn build<T, F>(self, creator: F) -> Store<T>
    where
        T: State,
        F: FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T,
    {
        let inner = Arc::new_cyclic(|weak: &Weak<StoreInner<T>>| StoreInner {
            options: self.options,
            state: RwLock::new(None),
            update: Mutex::new(()),
            initial: OnceLock::new(),
            listeners: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(0),
            setter: RwLock::new(core_setter(weak.clone())),
            destroyed: AtomicBool::new(false),
        });
        let store = Store { inner };

        let initial = Arc::new(creator(store.setter(), store.getter(), &store));
        // The only place `initial` is filled, once the creator has returned.
        store.inner.initial.get_or_init(|| Arc::clone(&initial));
        *write(&store.inner.state) = Some(initial);

        debug!(store = %store.name(), "store created");
        store
    }
}

/// Create a store with default options.
pub fn create_store<T, F>(creator: F) -> Store<T>
where
    T: State,
    F: FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T,
{
    StoreBuilder::new().build(creator)
}

fn core_setter<T: State>(inner: Weak<StoreInner<T>>) -> SetState<T> {
    SetState::new(move |recipe, replace| {
        if let Some(inner) = inner.upgrade() {
            inner.apply(recipe, replace);
        }
    })
}

struct StoreInner<T: State> {
    options: StoreOptions,
    state: RwLock<Option<Arc<T>>>,
    // Held from reading `previous` until the next state is assigned.
    update: Mutex<()>,
    initial: OnceLock<Arc<T>>,
    listeners: RwLock<BTreeMap<u64, Listener<T>>>,
    next_id: AtomicU64,
    setter: RwLock<SetState<T>>,
    destroyed: AtomicBool,
}

impl<T: State> StoreInner<T> {
    fn current(&self) -> Option<Arc<T>> {
        read(&self.state).clone()
    }

    fn rejects_updates(&self) -> bool {
        self.options.reject_after_destroy && self.destroyed.load(Ordering::SeqCst)
    }

    /// Resolve, compare, assign, notify.
    ///
    /// Resolving through assignment is serialized, so concurrent updates never
    /// overwrite each other. Listeners run after the lock is released and may
    /// update the store again; recipes must not.
    fn apply(&self, recipe: Recipe<T>, replace: bool) {
        let Some((next, previous)) = self.resolve(recipe, replace) else {
            return;
        };
        self.notify(&next, &previous);
    }

    fn resolve(&self, recipe: Recipe<T>, replace: bool) -> Option<(Arc<T>, Arc<T>)> {
        let name = &self.options.name;
        let _update = lock(&self.update);
        let Some(previous) = self.current() else {
            warn!(store = %name, kind = recipe.kind(), "update dropped: store is still initializing");
            return None;
        };
        if self.rejects_updates() {
            warn!(store = %name, kind = recipe.kind(), "update rejected: store was destroyed");
            return None;
        }

        let candidate = match recipe {
            Recipe::Set(update) => update,
            Recipe::Compute(compute) => compute(&previous),
            Recipe::Mutate(mutate) => {
                let mut draft = T::clone(&previous);
                mutate(&mut draft);
                Update::value(draft)
            }
        };

        let next = match candidate {
            Update::Replace(next) if Arc::ptr_eq(&next, &previous) => {
                trace!(store = %name, "update skipped: state unchanged");
                return None;
            }
            Update::Replace(next) => next,
            Update::Merge(partial) if replace => Arc::new(T::from_partial(partial)),
            Update::Merge(partial) => Arc::new(T::merge(&previous, partial)),
        };

        *write(&self.state) = Some(Arc::clone(&next));
        Some((next, previous))
    }

    /// Notify the listeners registered right now; later ones wait for the
    /// next pass.
    fn notify(&self, next: &T, previous: &T) {
        let listeners: Vec<Listener<T>> = read(&self.listeners).values().cloned().collect();
        trace!(store = %self.options.name, listeners = listeners.len(), "notifying listeners");
        for listener in listeners {
            listener(next, previous);
        }
    }
}

impl<T: State> ListenerRegistry for StoreInner<T> {
    fn remove_listener(&self, id: u64) -> bool {
        write(&self.listeners).remove(&id).is_some()
    }

    fn has_listener(&self, id: u64) -> bool {
        read(&self.listeners).contains_key(&id)
    }
}

/// A single state value with change listeners.
///
/// Cloning a `Store` yields another handle to the same state and listeners.
///
/// ```
/// use honeypot::{create_store, Recipe, Update};
///
/// let store = create_store(|_, _, _| 1_i32);
/// store.set_state(Recipe::compute(|n| Update::value(**n + 1)), false);
/// assert_eq!(*store.get_state(), 2);
/// assert_eq!(*store.get_initial_state(), 1);
/// ```
pub struct Store<T: State> {
    inner: Arc<StoreInner<T>>,
}

impl<T: State> Store<T> {
    /// Name used in log events.
    pub fn name(&self) -> &str {
        &self.inner.options.name
    }

    /// The current state, or [`StoreError::Initializing`] while the
    /// initializer is still running.
    pub fn try_get_state(&self) -> Result<Arc<T>, StoreError> {
        self.inner.current().ok_or_else(|| StoreError::Initializing {
            name: self.name().to_string(),
        })
    }

    /// The current state.
    ///
    /// # Panics
    ///
    /// Panics if called from the initializer body before it returns.
    pub fn get_state(&self) -> Arc<T> {
        self.try_get_state().unwrap_or_else(|err| panic!("{err}"))
    }

    /// The state the initializer returned. Never changes.
    ///
    /// # Panics
    ///
    /// Panics if called from the initializer body before it returns.
    pub fn get_initial_state(&self) -> Arc<T> {
        match self.inner.initial.get() {
            Some(initial) => Arc::clone(initial),
            None => panic!("store `{}` is still running its initializer", self.name()),
        }
    }

    /// Update the state through the store's current setter.
    ///
    /// When the resolved candidate is the current `Arc`, nothing happens.
    /// Otherwise the new state is assigned and every listener registered at
    /// that moment is called once with `(next, previous)` before this
    /// returns.
    ///
    /// Updates from different threads are applied one at a time. A recipe
    /// must not call back into `set_state` on the same store; listeners may.
    pub fn set_state(&self, recipe: Recipe<T>, replace: bool) {
        let setter = read(&self.inner.setter).clone();
        setter.call(recipe, replace);
    }

    /// Update the state with a fallible recipe.
    ///
    /// The recipe runs against the current state first; on error the state is
    /// untouched and the error is returned as [`StoreError::Recipe`].
    pub fn try_set_state<F, E>(&self, recipe: F, replace: bool) -> Result<(), StoreError>
    where
        F: FnOnce(&Arc<T>) -> Result<Update<T>, E>,
        E: Into<BoxError>,
    {
        if self.inner.rejects_updates() {
            return Err(StoreError::Destroyed {
                name: self.name().to_string(),
            });
        }
        let current = self.try_get_state()?;
        let update = recipe(&current).map_err(|err| StoreError::Recipe {
            name: self.name().to_string(),
            source: err.into(),
        })?;
        self.set_state(Recipe::Set(update), replace);
        Ok(())
    }

    /// Register a listener called with `(next, previous)` after each change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T, &T) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        write(&self.inner.listeners).insert(id, Arc::new(listener));
        trace!(store = %self.name(), listener = id, "listener subscribed");

        let weak = Arc::downgrade(&self.inner);
        let registry: Weak<dyn ListenerRegistry> = weak;
        Subscription::new(id, registry)
    }

    /// Drop every listener.
    ///
    /// The store stays usable: later updates still change the state, and
    /// later subscriptions still register, unless the store was built with
    /// [`StoreBuilder::reject_after_destroy`].
    pub fn destroy(&self) {
        let dropped = {
            let mut listeners = write(&self.inner.listeners);
            let count = listeners.len();
            listeners.clear();
            count
        };
        self.inner.destroyed.store(true, Ordering::SeqCst);
        debug!(store = %self.name(), listeners = dropped, "store destroyed");
    }

    /// Whether [`destroy`](Self::destroy) has been called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        read(&self.inner.listeners).len()
    }

    /// The setter currently installed in the store's setter slot.
    pub fn setter(&self) -> SetState<T> {
        read(&self.inner.setter).clone()
    }

    /// Swap the setter slot. Middleware uses this to intercept updates issued
    /// through [`Store::set_state`].
    pub fn replace_setter(&self, setter: SetState<T>) {
        *write(&self.inner.setter) = setter;
    }

    /// A getter that does not keep the store alive.
    pub fn getter(&self) -> GetState<T> {
        let inner = Arc::downgrade(&self.inner);
        GetState::new(move || inner.upgrade().and_then(|inner| inner.current()))
    }

    /// A handle that does not keep the store alive.
    pub fn downgrade(&self) -> WeakStore<T> {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl<T: State> Clone for Store<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: State + fmt::Debug> fmt::Debug for Store<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name())
            .field("state", &self.inner.current())
            .field("listeners", &self.listener_count())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

/// Non-owning store handle.
pub struct WeakStore<T: State> {
    inner: Weak<StoreInner<T>>,
}

impl<T: State> WeakStore<T> {
    /// The store, if any strong handle is still alive.
    pub fn upgrade(&self) -> Option<Store<T>> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl<T: State> Clone for WeakStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}
