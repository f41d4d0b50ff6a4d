//! Reducer hook factory: binds a middleware chain once and mounts engines.

use crate::engine::Engine;
use crate::middleware::MiddlewareChain;
use crate::reducer::ReducerFn;

/// Initial state, given directly or computed once at mount
pub enum InitialState<S> {
    Value(S),
    Lazy(Box<dyn FnOnce() -> S + Send>),
}

impl<S> InitialState<S> {
    pub fn lazy<F>(init: F) -> Self
    where
        F: FnOnce() -> S + Send + 'static,
    {
        Self::Lazy(Box::new(init))
    }

    pub fn resolve(self) -> S {
        match self {
            Self::Value(state) => state,
            Self::Lazy(init) => init(),
        }
    }
}

impl<S> From<S> for InitialState<S> {
    fn from(state: S) -> Self {
        Self::Value(state)
    }
}

/// A reducer hook with its middleware chain fixed at creation
pub struct UseReducer<S> {
    chain: MiddlewareChain<S>,
}

/// Bind `chain` to a reducer hook; each mount composes it around its own base dispatch
pub fn create_use_reducer<S>(chain: MiddlewareChain<S>) -> UseReducer<S>
where
    S: Send + Sync + 'static,
{
    UseReducer { chain }
}

impl<S> UseReducer<S>
where
    S: Send + Sync + 'static,
{
    /// Mount an engine running `reducer` from `initial`
    pub fn mount(&self, reducer: ReducerFn<S>, initial: impl Into<InitialState<S>>) -> Engine<S> {
        log::debug!("Mounting engine with {} middleware", self.chain.len());
        Engine::mount(reducer, initial.into().resolve(), self.chain.clone())
    }

    pub fn middleware_count(&self) -> usize {
        self.chain.len()
    }
}

impl<S> Clone for UseReducer<S> {
    fn clone(&self) -> Self {
        Self {
            chain: self.chain.clone(),
        }
    }
}

impl<S> Default for UseReducer<S>
where
    S: Send + Sync + 'static,
{
    fn default() -> Self {
        create_use_reducer(MiddlewareChain::new())
    }
}
