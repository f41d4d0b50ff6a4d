//! Middleware system
//!
//! Middleware sits between a bound caller and the reducer, Redux-style:
//!
//! ```text
//! Action → first middleware → … → last middleware → base dispatch → Reducer → State
//! ```
//!
//! Each middleware can:
//! - Inspect actions and the latest committed state
//! - Dispatch new actions (they re-enter the chain from the top)
//! - Call `next` zero or more times, before or after its own logic
//! - Replace the result handed back to the caller
//!
//! ## Example
//!
//! ```rust
//! use use_methods::{Action, Dispatched, Middleware, Next, Store};
//!
//! struct CountingMiddleware;
//!
//! impl<S> Middleware<S> for CountingMiddleware {
//!     fn handle(&self, action: Action, _store: &Store<S>, next: &Next) -> Dispatched {
//!         log::debug!("before {}", action.action_type);
//!         let dispatched = next.run(action);
//!         log::debug!("after {}", dispatched.action_type());
//!         dispatched
//!     }
//! }
//! ```

pub mod logging;

use crate::action::{Action, Dispatch, DispatchFn, Dispatched, WeakDispatch};
use crate::reducer::StateReader;
use std::sync::Arc;

pub use logging::LoggingMiddleware;

/// Middleware trait - wraps the dispatch of the next layer
pub trait Middleware<S>: Send + Sync {
    /// Handle an action
    ///
    /// - `action`: The action being dispatched
    /// - `store`: Latest state and the full dispatch chain
    /// - `next`: The next middleware, or the base dispatch for the last one
    ///
    /// Returning without calling `next` swallows the action.
    fn handle(&self, action: Action, store: &Store<S>, next: &Next) -> Dispatched;
}

/// What a middleware can reach besides `next`
///
/// The store lives inside the chain stored in the dispatch slot, so it only
/// holds the slot weakly.
pub struct Store<S> {
    state: StateReader<S>,
    dispatch: WeakDispatch,
}

impl<S> Store<S> {
    pub fn new(state: StateReader<S>, dispatch: &Dispatch) -> Self {
        Self {
            state,
            dispatch: dispatch.downgrade(),
        }
    }

    /// Latest committed state
    pub fn get_state(&self) -> Arc<S> {
        self.state.get()
    }

    /// Dispatch through the whole chain, starting at the first middleware
    pub fn dispatch(&self, action: Action) -> Dispatched {
        match self.dispatch.upgrade() {
            Some(dispatch) => dispatch.dispatch(action),
            None => {
                log::debug!("Dropping `{}` dispatched after teardown", action.action_type);
                Dispatched::ready(action.action_type, None)
            }
        }
    }
}

impl<S> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            dispatch: self.dispatch.clone(),
        }
    }
}

/// The dispatch of the next layer
#[derive(Clone)]
pub struct Next {
    inner: DispatchFn,
}

impl Next {
    pub fn run(&self, action: Action) -> Dispatched {
        (self.inner)(action)
    }
}

/// Middleware from a closure
pub struct FromFn<F>(F);

/// Build a middleware from `Fn(action, store, next) -> Dispatched`
pub fn from_fn<S, F>(f: F) -> FromFn<F>
where
    F: Fn(Action, &Store<S>, &Next) -> Dispatched + Send + Sync,
{
    FromFn(f)
}

impl<S, F> Middleware<S> for FromFn<F>
where
    F: Fn(Action, &Store<S>, &Next) -> Dispatched + Send + Sync,
{
    fn handle(&self, action: Action, store: &Store<S>, next: &Next) -> Dispatched {
        (self.0)(action, store, next)
    }
}

/// Ordered middleware list
pub struct MiddlewareChain<S> {
    middleware: Vec<Arc<dyn Middleware<S>>>,
}

impl<S: 'static> MiddlewareChain<S> {
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
        }
    }

    /// Append a middleware; earlier entries run closer to the caller
    pub fn with<M: Middleware<S> + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware<S>>) {
        self.middleware.push(middleware);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Middleware<S>>> {
        self.middleware.iter()
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Wrap `base` with every middleware.
    ///
    /// The last middleware wraps `base` first, so the first one ends up
    /// outermost. Without middleware `base` is returned as is.
    pub fn compose(&self, store: Store<S>, base: DispatchFn) -> DispatchFn
    where
        S: Send + Sync,
    {
        self.middleware.iter().rev().fold(base, |next, middleware| {
            let middleware = Arc::clone(middleware);
            let store = store.clone();
            let next = Next { inner: next };
            let layer: DispatchFn =
                Arc::new(move |action: Action| middleware.handle(action, &store, &next));
            layer
        })
    }
}

impl<S: 'static> Default for MiddlewareChain<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for MiddlewareChain<S> {
    fn clone(&self) -> Self {
        Self {
            middleware: self.middleware.clone(),
        }
    }
}
