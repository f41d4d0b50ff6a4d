//! Bound callers for declared methods and actions.

use crate::action::{Dispatch, Dispatched};
use crate::loading::LoadingTracker;
use crate::payload::Payload;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallerKind {
    Method,
    Action,
}

/// A caller for one declared name
#[derive(Clone)]
pub struct BoundCaller {
    name: String,
    kind: CallerKind,
    dispatch: Dispatch,
    loading: Option<LoadingTracker>,
}

impl BoundCaller {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CallerKind {
        self.kind
    }

    pub fn call(&self, payload: Payload) -> Dispatched {
        match (self.kind, &self.loading) {
            (CallerKind::Action, Some(loading)) => {
                loading.set(&self.name, true);
                let dispatched = self.dispatch.call(self.name.as_str(), payload);
                loading.settle(&self.name, dispatched)
            }
            _ => self.dispatch.call(self.name.as_str(), payload),
        }
    }
}

impl fmt::Debug for BoundCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCaller")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The callable surface of a mounted methods factory.
///
/// Built once at mount from the names the factory declared for the initial
/// state. Every call goes through the stable dispatch, so callers never see
/// a stale state.
#[derive(Clone)]
pub struct BoundMethods {
    dispatch: Dispatch,
    loading: Option<LoadingTracker>,
    methods: Vec<String>,
    actions: Vec<String>,
}

impl BoundMethods {
    pub fn new(
        dispatch: Dispatch,
        methods: Vec<String>,
        actions: Vec<String>,
        loading: Option<LoadingTracker>,
    ) -> Self {
        Self {
            dispatch,
            loading,
            methods,
            actions,
        }
    }

    pub fn call_method(&self, name: &str, payload: Payload) -> Dispatched {
        self.caller(name, CallerKind::Method).call(payload)
    }

    pub fn call_action(&self, name: &str, payload: Payload) -> Dispatched {
        self.caller(name, CallerKind::Action).call(payload)
    }

    /// Call by name; an action shadows a method of the same name
    pub fn call(&self, name: &str, payload: Payload) -> Dispatched {
        match self.get(name) {
            Some(caller) => caller.call(payload),
            None => {
                log::trace!("`{}` is not declared; dispatching anyway", name);
                self.dispatch.call(name, payload)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<BoundCaller> {
        if self.actions.iter().any(|n| n == name) {
            return Some(self.caller(name, CallerKind::Action));
        }
        if self.methods.iter().any(|n| n == name) {
            return Some(self.caller(name, CallerKind::Method));
        }
        None
    }

    pub fn method_names(&self) -> &[String] {
        &self.methods
    }

    pub fn action_names(&self) -> &[String] {
        &self.actions
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    fn caller(&self, name: &str, kind: CallerKind) -> BoundCaller {
        BoundCaller {
            name: name.to_string(),
            kind,
            dispatch: self.dispatch.clone(),
            loading: self.loading.clone(),
        }
    }
}

impl fmt::Debug for BoundMethods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethods")
            .field("methods", &self.methods)
            .field("actions", &self.actions)
            .field("loading", &self.loading.is_some())
            .finish()
    }
}
