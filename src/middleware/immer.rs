use super::draft::produce;
use super::intercept;
use crate::store::{GetState, Recipe, SetState, State, Store};

/// Let initializers update state by mutating a draft.
///
/// Every [`Recipe::Mutate`] that reaches the wrapped setter, whether through
/// the `set` handed to `creator` or through [`Store::set_state`], is compiled
/// with [`produce`] before it is forwarded. Other recipes and the `replace`
/// flag pass through untouched.
///
/// ```
/// use honeypot::middleware::immer;
/// use honeypot::{create_store, Recipe};
///
/// let store = create_store(immer(|_, _, _| 0_u32));
/// store.set_state(Recipe::mutate(|n: &mut u32| *n += 2), false);
/// assert_eq!(*store.get_state(), 2);
/// ```
pub fn immer<T, F>(creator: F) -> impl FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T
where
    T: State + PartialEq,
    F: FnOnce(SetState<T>, GetState<T>, &Store<T>) -> T,
{
    intercept(creator, |set: SetState<T>| {
        SetState::new(move |recipe: Recipe<T>, replace| {
            let recipe = match recipe {
                Recipe::Mutate(mutate) => Recipe::Compute(Box::new(produce(mutate))),
                other => other,
            };
            set.call(recipe, replace);
        })
    })
}
