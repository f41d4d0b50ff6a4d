//! Field watchers fired after commits.

use crate::action::Dispatch;
use std::fmt;
use std::sync::Arc;

type EffectFn<S> = Arc<dyn Fn(&Dispatch, &S, &S) -> bool + Send + Sync>;

/// Reaction to a change of one state field
///
/// The field is projected out of the previous and the current state and
/// compared with `PartialEq`; the callback only runs on a difference and
/// receives `(dispatch, new_value, old_value)`.
#[derive(Clone)]
pub struct Effect<S> {
    field: String,
    fire: EffectFn<S>,
}

impl<S: 'static> Effect<S> {
    pub fn watch<T, P, C>(field: impl Into<String>, project: P, callback: C) -> Self
    where
        T: PartialEq,
        P: Fn(&S) -> T + Send + Sync + 'static,
        C: Fn(&Dispatch, T, T) + Send + Sync + 'static,
    {
        let fire = move |dispatch: &Dispatch, previous: &S, current: &S| {
            let old = project(previous);
            let new = project(current);
            if new == old {
                return false;
            }
            callback(dispatch, new, old);
            true
        };
        Self {
            field: field.into(),
            fire: Arc::new(fire),
        }
    }
}

impl<S> Effect<S> {
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl<S> fmt::Debug for Effect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect").field("field", &self.field).finish()
    }
}

/// Runs the declared effects for one commit, in declaration order
pub struct EffectRunner<S> {
    effects: Vec<Effect<S>>,
    dispatch: Dispatch,
}

impl<S> EffectRunner<S> {
    pub fn new(effects: Vec<Effect<S>>, dispatch: Dispatch) -> Self {
        Self { effects, dispatch }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    /// Compare `previous` and `current` and fire changed fields.
    ///
    /// Returns the names of the fields whose effect fired.
    pub fn run(&self, previous: &S, current: &S) -> Vec<&str> {
        let mut fired = Vec::new();
        for effect in &self.effects {
            if (effect.fire)(&self.dispatch, previous, current) {
                log::trace!("Effect fired for field `{}`", effect.field);
                fired.push(effect.field());
            }
        }
        fired
    }
}
