use std::fmt;
use std::sync::Arc;

/// A named operation kept inside a state record.
///
/// Actions are usually closures over the setter handed to the initializer.
/// Two actions are equal only when they are the same allocation, so a state
/// record holding actions can still derive `PartialEq`.
///
/// ```
/// use honeypot::Action;
///
/// let shout = Action::new(|word: String| println!("{word}!"));
/// shout.call("hello".to_string());
/// assert_eq!(shout, shout.clone());
/// ```
pub struct Action<A = ()> {
    run: Arc<dyn Fn(A) + Send + Sync>,
}

impl<A> Action<A> {
    /// Wrap a callable.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self { run: Arc::new(f) }
    }

    /// Invoke the action.
    pub fn call(&self, args: A) {
        (self.run)(args)
    }
}

impl Action<()> {
    /// Invoke an action that takes no arguments.
    pub fn run(&self) {
        (self.run)(())
    }
}

impl<A> Clone for Action<A> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<A> PartialEq for Action<A> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.run, &other.run)
    }
}

impl<A> Eq for Action<A> {}

// A no-op, so records built from partials always have a callable slot.
impl<A: 'static> Default for Action<A> {
    fn default() -> Self {
        Self::new(|_| {})
    }
}

impl<A> fmt::Debug for Action<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}
