//! Reducer core
//!
//! A reducer turns the state seen at dispatch time plus an [`Action`] into a
//! [`Reduction`]. The methods reducer re-runs the methods factory on every
//! call, looks the action type up among the declared actions first and the
//! declared methods second, and ignores unknown action types.

use crate::action::{Action, ActionEnvelope, Dispatch, Pending};
use crate::definitions::{ActionOutcome, CreateMethodsFn, DeferredAction, MethodOutcome, Mutation};
use serde_json::Value;
use std::sync::{Arc, RwLock};

/// Reducer signature shared by the engine and the reducer mappers
pub type ReducerFn<S> = Arc<dyn Fn(ReducerContext<S>, &Action) -> Reduction<S> + Send + Sync>;

/// Outcome of one reducer call
pub enum Reduction<S> {
    /// Commit `state` if present; `result` is handed back to the dispatcher
    Ready {
        state: Option<S>,
        result: Option<Value>,
    },
    /// Resolve later; the resolved reduction settles without re-entering the reducer
    Pending(Pending<Reduction<S>>),
    /// Run an action-like body once this reduction returned
    Deferred(DeferredAction),
    /// Draft mutation, only meaningful behind [`combine_reducers`](crate::combine_reducers)
    Mutate(Mutation<S>),
}

impl<S> Reduction<S> {
    pub fn unchanged() -> Self {
        Self::Ready {
            state: None,
            result: None,
        }
    }

    pub fn commit(state: S) -> Self {
        Self::Ready {
            state: Some(state),
            result: None,
        }
    }
}

/// What a reducer can see besides the action
pub struct ReducerContext<S> {
    /// State committed when the reduction started
    pub reducer_state: Arc<S>,
    /// Latest committed state, which may move on while pending work resolves
    pub state: StateReader<S>,
    /// Dispatch through the latest middleware chain
    pub dispatch: Dispatch,
}

/// The authoritative state cell of one engine
pub struct StateCell<S> {
    inner: Arc<RwLock<Arc<S>>>,
}

impl<S> StateCell<S> {
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    pub fn get(&self) -> Arc<S> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the state, returning the previous one
    pub fn replace(&self, next: S) -> Arc<S> {
        self.swap(Arc::new(next))
    }

    pub(crate) fn swap(&self, next: Arc<S>) -> Arc<S> {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, next)
    }

    pub fn reader(&self) -> StateReader<S> {
        StateReader {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Read-only handle on a [`StateCell`], always returning the latest commit
pub struct StateReader<S> {
    inner: Arc<RwLock<Arc<S>>>,
}

impl<S> StateReader<S> {
    pub fn get(&self) -> Arc<S> {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }
}

impl<S> Clone for StateReader<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Build the reducer for a methods factory
pub fn methods_reducer<S>(create: CreateMethodsFn<S>) -> ReducerFn<S>
where
    S: Send + Sync + 'static,
{
    Arc::new(move |context: ReducerContext<S>, action: &Action| {
        let state: &S = &context.reducer_state;
        let definitions = create(state);

        if let Some(body) = definitions.get_action(&action.action_type) {
            let envelope = ActionEnvelope::new(action.clone(), context.dispatch.clone());
            return match body(envelope) {
                ActionOutcome::Done(result) => Reduction::Ready {
                    state: None,
                    result,
                },
                ActionOutcome::Pending(pending) => Reduction::Pending(Box::pin(async move {
                    let result = pending.await?;
                    anyhow::Ok(Reduction::Ready {
                        state: None,
                        result,
                    })
                })),
            };
        }

        match definitions.get_method(&action.action_type) {
            Some(method) => from_method(method(&action.payload)),
            None => {
                log::trace!("Ignoring unknown action `{}`", action.action_type);
                Reduction::unchanged()
            }
        }
    })
}

fn from_method<S>(outcome: MethodOutcome<S>) -> Reduction<S>
where
    S: Send + Sync + 'static,
{
    match outcome {
        MethodOutcome::State(state) => Reduction::commit(state),
        MethodOutcome::Unchanged => Reduction::unchanged(),
        MethodOutcome::Pending(pending) => Reduction::Pending(Box::pin(async move {
            let resolved = pending.await?;
            anyhow::Ok(from_method(resolved))
        })),
        MethodOutcome::Deferred(body) => Reduction::Deferred(body),
        MethodOutcome::Mutate(mutation) => Reduction::Mutate(mutation),
    }
}
