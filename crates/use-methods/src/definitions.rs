//! Method, action and effect declarations returned by a methods factory.
//!
//! A factory is a function from the current state to a [`Definitions`]
//! table. The engine runs it again for every reduction, so method closures
//! may simply borrow the state they were created from and always observe
//! the latest committed value.
//!
//! ```rust
//! use use_methods::{ActionOutcome, Definitions, MethodOutcome};
//!
//! #[derive(Clone)]
//! struct Counter {
//!     count: i64,
//! }
//!
//! fn counter(state: &Counter) -> Definitions<'_, Counter> {
//!     Definitions::new()
//!         .method("increment", move |_| {
//!             MethodOutcome::from(Counter { count: state.count + 1 })
//!         })
//!         .action("bump_twice", |envelope| {
//!             envelope.dispatch.call("increment", use_methods::payload![]);
//!             envelope.dispatch.call("increment", use_methods::payload![]);
//!             ActionOutcome::done()
//!         })
//! }
//! ```

use crate::action::{ActionEnvelope, Pending};
use crate::draft::Draft;
use crate::effects::Effect;
use crate::payload::Payload;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A deferred, action-like body returned by a method for chained work
pub type DeferredAction = Box<dyn FnOnce(ActionEnvelope) -> ActionOutcome + Send>;

/// A direct write against a copy-on-write draft of the state
pub type Mutation<S> = Box<dyn FnOnce(&mut Draft<S>) + Send>;

/// Declared method: `(payload) -> outcome`, derived from the current state
pub type MethodFn<'a, S> = Box<dyn Fn(&Payload) -> MethodOutcome<S> + Send + Sync + 'a>;

/// Declared action: `(envelope) -> outcome`, derived from the current state
pub type ActionFn<'a> = Box<dyn Fn(ActionEnvelope) -> ActionOutcome + Send + Sync + 'a>;

/// A methods factory
pub type CreateMethodsFn<S> = Arc<dyn for<'a> Fn(&'a S) -> Definitions<'a, S> + Send + Sync>;

/// What a method returns
pub enum MethodOutcome<S> {
    /// Replace the state
    State(S),
    /// Leave the state as it is
    Unchanged,
    /// Resolve later; the resolved outcome is committed without re-entering the reducer
    Pending(Pending<MethodOutcome<S>>),
    /// Run an action-like body once the current reduction returned
    Deferred(DeferredAction),
    /// Write through a draft; requires the copy-on-write reducer mapper
    Mutate(Mutation<S>),
}

impl<S: 'static> MethodOutcome<S> {
    pub fn pending<F, T>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Into<MethodOutcome<S>> + 'static,
    {
        Self::Pending(Box::pin(async move { future.await.map(Into::into) }))
    }

    pub fn deferred<F>(body: F) -> Self
    where
        F: FnOnce(ActionEnvelope) -> ActionOutcome + Send + 'static,
    {
        Self::Deferred(Box::new(body))
    }

    pub fn mutate<F>(mutation: F) -> Self
    where
        F: FnOnce(&mut Draft<S>) + Send + 'static,
    {
        Self::Mutate(Box::new(mutation))
    }
}

impl<S> From<S> for MethodOutcome<S> {
    fn from(state: S) -> Self {
        Self::State(state)
    }
}

/// What an action body returns
pub enum ActionOutcome {
    Done(Option<Value>),
    Pending(Pending<Option<Value>>),
}

impl ActionOutcome {
    pub fn done() -> Self {
        Self::Done(None)
    }

    /// Finish with a result value handed back to the caller.
    ///
    /// A value that cannot be serialized is logged and finishes without a
    /// result; use [`ActionOutcome::try_value`] to handle the error instead.
    pub fn value<T: Serialize>(value: T) -> Self {
        match Self::try_value(value) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::warn!("Action result cannot be serialized, dropping it: {}", e);
                Self::done()
            }
        }
    }

    pub fn try_value<T: Serialize>(value: T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(|value| Self::Done(Some(value)))
    }

    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        Self::Pending(Box::pin(future))
    }
}

/// The table a methods factory returns
pub struct Definitions<'a, S> {
    methods: HashMap<String, MethodFn<'a, S>>,
    actions: HashMap<String, ActionFn<'a>>,
    method_order: Vec<String>,
    action_order: Vec<String>,
    effects: Vec<Effect<S>>,
}

impl<'a, S> Definitions<'a, S> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
            actions: HashMap::new(),
            method_order: Vec::new(),
            action_order: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Declare a method
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(&Payload) -> MethodOutcome<S> + Send + Sync + 'a,
    {
        let name = name.into();
        if self.methods.insert(name.clone(), Box::new(method)).is_none() {
            self.method_order.push(name);
        }
        self
    }

    /// Declare an action
    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(ActionEnvelope) -> ActionOutcome + Send + Sync + 'a,
    {
        let name = name.into();
        if self.actions.insert(name.clone(), Box::new(action)).is_none() {
            self.action_order.push(name);
        }
        self
    }

    /// Declare an effect on a state field
    pub fn effect(mut self, effect: Effect<S>) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn method_names(&self) -> &[String] {
        &self.method_order
    }

    pub fn action_names(&self) -> &[String] {
        &self.action_order
    }

    pub fn effects(&self) -> &[Effect<S>] {
        &self.effects
    }

    pub(crate) fn get_method(&self, name: &str) -> Option<&MethodFn<'a, S>> {
        self.methods.get(name)
    }

    pub(crate) fn get_action(&self, name: &str) -> Option<&ActionFn<'a>> {
        self.actions.get(name)
    }

    /// Split into the declared names and the effects, releasing the state borrow
    pub(crate) fn into_declarations(self) -> Declarations<S> {
        Declarations {
            methods: self.method_order,
            actions: self.action_order,
            effects: self.effects,
        }
    }
}

impl<S> Default for Definitions<'_, S> {
    fn default() -> Self {
        Self::new()
    }
}

/// The mount-time view of a factory: names and effects only
pub(crate) struct Declarations<S> {
    pub methods: Vec<String>,
    pub actions: Vec<String>,
    pub effects: Vec<Effect<S>>,
}
