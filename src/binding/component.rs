use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::error::BindingError;
use crate::store::lock;

/// Where a component renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Live rendering: read the store and subscribe to it.
    Client,
    /// One-shot rendering without a live store: read the server snapshot and
    /// never subscribe.
    Server,
    /// First render reads the server snapshot, later renders read the store.
    /// After subscribing, a selection that differs from the live state
    /// schedules a re-render.
    Hydrate,
}

/// Which snapshot a hook reads during the current render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Server,
    Hydrating,
    Client,
}

type Hook = Arc<dyn Any + Send + Sync>;
type Scheduler = Box<dyn Fn() + Send + Sync>;

/// Shared component state; hooks keep a weak handle to it.
pub(crate) struct ComponentInner {
    mode: RenderMode,
    hooks: Mutex<Vec<Hook>>,
    cursor: AtomicUsize,
    renders: AtomicUsize,
    dirty: AtomicBool,
    scheduler: Option<Scheduler>,
}

impl ComponentInner {
    pub(crate) fn phase(&self) -> Phase {
        match self.mode {
            RenderMode::Server => Phase::Server,
            RenderMode::Hydrate if self.renders.load(Ordering::SeqCst) == 0 => Phase::Hydrating,
            RenderMode::Hydrate | RenderMode::Client => Phase::Client,
        }
    }

    /// Fetch the hook at the next position, creating it on the first render.
    pub(crate) fn next_hook<H, F>(&self, init: F) -> Result<Arc<H>, BindingError>
    where
        H: Any + Send + Sync,
        F: FnOnce() -> H,
    {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let existing = lock(&self.hooks).get(index).cloned();
        match existing {
            Some(hook) => hook
                .downcast::<H>()
                .map_err(|_| BindingError::HookMismatch { index }),
            None => {
                let hook = Arc::new(init());
                lock(&self.hooks).push(hook.clone());
                Ok(hook)
            }
        }
    }

    /// Mark the component stale and call the scheduler once until the next
    /// render.
    pub(crate) fn invalidate(&self) {
        if !self.dirty.swap(true, Ordering::SeqCst) {
            trace!(renders = self.renders.load(Ordering::SeqCst), "component invalidated");
            if let Some(scheduler) = &self.scheduler {
                scheduler();
            }
        }
    }
}

// Thread-local stack of components currently rendering
thread_local! {
    static RENDER_STACK: RefCell<Vec<Arc<ComponentInner>>> = const { RefCell::new(Vec::new()) };
}

/// The component rendering on this thread, if any.
pub(crate) fn current() -> Option<Arc<ComponentInner>> {
    RENDER_STACK.with(|stack| stack.borrow().last().cloned())
}

/// A headless render context for store hooks.
///
/// Hooks called inside [`render`](Self::render) attach to this component by
/// call order, the same way across renders. When a store change alters a
/// selection, the component is marked as needing a render and its scheduler,
/// if any, is called. Dropping the component drops its subscriptions.
///
/// # Examples
///
/// ```
/// use honeypot::binding::{create, Component, RenderMode};
///
/// let counter = create(|_, _, _| 0_i32);
/// let view = Component::new(RenderMode::Client);
///
/// let shown = view.render(|| counter.use_selector(|n| **n));
/// assert_eq!(shown, 0);
/// assert!(!view.needs_render());
/// ```
pub struct Component {
    inner: Arc<ComponentInner>,
}

impl Component {
    /// Create a component without a scheduler; poll
    /// [`needs_render`](Self::needs_render) instead.
    pub fn new(mode: RenderMode) -> Self {
        Self::build(mode, None)
    }

    /// Create a component whose `scheduler` runs when it becomes stale.
    pub fn with_scheduler<F>(mode: RenderMode, scheduler: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::build(mode, Some(Box::new(scheduler)))
    }

    fn build(mode: RenderMode, scheduler: Option<Scheduler>) -> Self {
        Self {
            inner: Arc::new(ComponentInner {
                mode,
                hooks: Mutex::new(Vec::new()),
                cursor: AtomicUsize::new(0),
                renders: AtomicUsize::new(0),
                dirty: AtomicBool::new(false),
                scheduler,
            }),
        }
    }

    /// Run `f` as this component's render body.
    ///
    /// Hooks called from `f` on this thread bind to this component. A
    /// component may render inside another one's render; hooks bind to the
    /// innermost.
    pub fn render<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.inner.cursor.store(0, Ordering::SeqCst);
        self.inner.dirty.store(false, Ordering::SeqCst);

        RENDER_STACK.with(|stack| {
            stack.borrow_mut().push(Arc::clone(&self.inner));
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        RENDER_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
        self.inner.renders.fetch_add(1, Ordering::SeqCst);

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Whether a store change has made the last render stale.
    pub fn needs_render(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Number of completed renders.
    pub fn render_count(&self) -> usize {
        self.inner.renders.load(Ordering::SeqCst)
    }

    /// Where this component renders.
    pub fn mode(&self) -> RenderMode {
        self.inner.mode
    }

    /// Number of hooks attached so far.
    pub fn hook_count(&self) -> usize {
        lock(&self.inner.hooks).len()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("mode", &self.inner.mode)
            .field("renders", &self.render_count())
            .field("hooks", &self.hook_count())
            .field("dirty", &self.needs_render())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_is_set_only_during_render() {
        let component = Component::new(RenderMode::Client);
        assert!(current().is_none());
        component.render(|| assert!(current().is_some()));
        assert!(current().is_none());
        assert_eq!(component.render_count(), 1);
    }

    #[test]
    fn hooks_are_matched_by_position() {
        let component = Component::new(RenderMode::Client);
        let first = component.render(|| {
            let cx = current().unwrap();
            cx.next_hook(|| 7_u32).unwrap()
        });
        let second = component.render(|| {
            let cx = current().unwrap();
            cx.next_hook(|| 99_u32).unwrap()
        });
        assert_eq!(*second, 7);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn hook_type_change_is_reported() {
        let component = Component::new(RenderMode::Client);
        component.render(|| {
            current().unwrap().next_hook(|| 1_u8).unwrap();
        });
        let err = component.render(|| current().unwrap().next_hook(|| "text").unwrap_err());
        assert_eq!(err, BindingError::HookMismatch { index: 0 });
    }

    #[test]
    fn hydrate_switches_to_client_after_first_render() {
        let component = Component::new(RenderMode::Hydrate);
        let first = component.render(|| current().unwrap().phase());
        let second = component.render(|| current().unwrap().phase());
        assert_eq!(first, Phase::Hydrating);
        assert_eq!(second, Phase::Client);
    }

    #[test]
    fn invalidate_schedules_once_per_render() {
        let scheduled = Arc::new(AtomicUsize::new(0));
        let scheduled_clone = scheduled.clone();
        let component = Component::with_scheduler(RenderMode::Client, move || {
            scheduled_clone.fetch_add(1, Ordering::SeqCst);
        });

        component.inner.invalidate();
        component.inner.invalidate();
        assert!(component.needs_render());
        assert_eq!(scheduled.load(Ordering::SeqCst), 1);

        component.render(|| {});
        assert!(!component.needs_render());
        component.inner.invalidate();
        assert_eq!(scheduled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn render_stack_unwinds_on_panic() {
        let component = Component::new(RenderMode::Client);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            component.render(|| panic!("render failed"));
        }));
        assert!(result.is_err());
        assert!(current().is_none());
    }
}
