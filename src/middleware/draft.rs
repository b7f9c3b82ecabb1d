use std::sync::Arc;

use crate::store::{State, Update};

/// Compile a draft-mutating recipe into an update function.
///
/// Nothing runs until the returned function is applied to a base state.
/// The recipe then mutates a clone of the base; if the result equals the base,
/// the base `Arc` itself is handed back so the store sees no change. Fields
/// held behind `Arc` that the recipe leaves alone stay shared with the base.
///
/// ```
/// use std::sync::Arc;
/// use honeypot::middleware::produce;
/// use honeypot::Update;
///
/// let base = Arc::new(41_i32);
/// let bump = produce(|n: &mut i32| *n += 1);
/// match bump(&base) {
///     Update::Replace(next) => assert_eq!(*next, 42),
///     Update::Merge(_) => unreachable!(),
/// }
/// ```
pub fn produce<T, F>(recipe: F) -> impl FnOnce(&Arc<T>) -> Update<T> + Send + 'static
where
    T: State + PartialEq,
    F: FnOnce(&mut T) + Send + 'static,
{
    move |base: &Arc<T>| {
        let mut draft = T::clone(base);
        recipe(&mut draft);
        if draft == **base {
            Update::keep(base)
        } else {
            Update::value(draft)
        }
    }
}
