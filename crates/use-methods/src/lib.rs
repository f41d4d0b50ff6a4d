//! Methods-object state engine
//!
//! This crate provides:
//! - A methods factory model: a function from state to named methods,
//!   actions and effects, re-run on every reduction
//! - A stateful dispatch engine with a stable dispatch handle and a
//!   Redux-style middleware chain
//! - Async methods and actions driven on the tokio runtime
//! - Per-action loading flags and field effects
//! - Copy-on-write drafts for mutation-style methods
//!
//! ```rust
//! use use_methods::{payload, use_methods, Definitions, MethodOutcome, UseMethodsOptions};
//!
//! #[derive(Clone)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! fn counter(state: &Counter) -> Definitions<'_, Counter> {
//!     Definitions::new().method("increment", move |_| {
//!         MethodOutcome::from(Counter { count: state.count + 1 })
//!     })
//! }
//!
//! let handle = use_methods(counter, Counter { count: 10 }, UseMethodsOptions::new());
//! handle.methods().call("increment", payload![]);
//! assert_eq!(handle.state().count, 11);
//! ```

pub mod action;
pub mod binder;
pub mod definitions;
pub mod draft;
pub mod effects;
pub mod engine;
pub mod error;
pub mod force_update;
pub mod hook;
pub mod loading;
pub mod middleware;
pub mod options;
pub mod payload;
pub mod reducer;
pub mod use_reducer;

pub use action::{
    Action, ActionEnvelope, BoxFuture, Dispatch, DispatchFn, Dispatched, Pending, WeakDispatch,
};
pub use binder::{BoundCaller, BoundMethods, CallerKind};
pub use definitions::{
    ActionOutcome, CreateMethodsFn, DeferredAction, Definitions, MethodOutcome, Mutation,
};
pub use draft::{combine_reducers, Draft};
pub use effects::{Effect, EffectRunner};
pub use engine::{CommitListener, Engine};
pub use error::MethodsError;
pub use force_update::ForceUpdate;
pub use hook::{create_use_methods, use_methods, MethodsHandle, UseMethods};
pub use loading::{LoadingMap, LoadingTracker};
pub use middleware::{from_fn, LoggingMiddleware, Middleware, MiddlewareChain, Next, Store};
pub use options::{ReducerMapper, UseMethodsOptions};
pub use payload::Payload;
pub use reducer::{methods_reducer, ReducerContext, ReducerFn, Reduction, StateCell, StateReader};
pub use use_reducer::{create_use_reducer, InitialState, UseReducer};
pub use use_methods_config::MethodsConfig;
