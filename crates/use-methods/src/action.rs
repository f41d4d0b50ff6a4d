//! Actions, the stable dispatch slot and dispatch completions.

use crate::error::MethodsError;
use crate::payload::Payload;
use serde_json::Value;
use std::any::Any;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::{Arc, RwLock, Weak};
use tokio::task::JoinHandle;

/// BoxFuture type alias for pending computations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A pending computation returned by a method or an action
pub type Pending<T> = BoxFuture<'static, anyhow::Result<T>>;

/// A dispatch function: one layer of the middleware chain, or the base dispatch
pub type DispatchFn = Arc<dyn Fn(Action) -> Dispatched + Send + Sync>;

/// A named request for a state transition
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub action_type: String,
    pub payload: Payload,
}

impl Action {
    pub fn new(action_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            action_type: action_type.into(),
            payload,
        }
    }

    /// An action without arguments
    pub fn named(action_type: impl Into<String>) -> Self {
        Self::new(action_type, Payload::new())
    }
}

/// What an action body receives: the action it was invoked for plus a
/// dispatch capability routed through the latest middleware chain.
#[derive(Clone)]
pub struct ActionEnvelope {
    pub action_type: String,
    pub payload: Payload,
    pub dispatch: Dispatch,
}

impl ActionEnvelope {
    pub fn new(action: Action, dispatch: Dispatch) -> Self {
        Self {
            action_type: action.action_type,
            payload: action.payload,
            dispatch,
        }
    }
}

impl fmt::Debug for ActionEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionEnvelope")
            .field("action_type", &self.action_type)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

/// Stable dispatch handle
///
/// The handle points at a slot holding the latest composed middleware chain.
/// The engine swaps the chain inside the slot when its reducer changes, so
/// every clone of a `Dispatch` keeps its identity for the lifetime of the
/// engine (see [`Dispatch::ptr_eq`]).
///
/// Handles given out by an engine keep it alive; the ones the engine
/// hands to its own reducers, middleware and effects do not.
#[derive(Clone)]
pub struct Dispatch {
    slot: Arc<RwLock<DispatchFn>>,
    owner: Option<Arc<dyn Any + Send + Sync>>,
}

impl Dispatch {
    pub(crate) fn new(initial: DispatchFn) -> Self {
        Self {
            slot: Arc::new(RwLock::new(initial)),
            owner: None,
        }
    }

    /// Same slot, additionally keeping `owner` alive
    pub(crate) fn owned_by(&self, owner: Arc<dyn Any + Send + Sync>) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            owner: Some(owner),
        }
    }

    pub fn downgrade(&self) -> WeakDispatch {
        WeakDispatch {
            slot: Arc::downgrade(&self.slot),
        }
    }

    /// Dispatch an action through the full middleware chain
    pub fn dispatch(&self, action: Action) -> Dispatched {
        // Release the slot before running the chain; middleware may re-enter.
        let chain = self.current();
        chain(action)
    }

    /// Dispatch `action_type` with `payload`
    pub fn call(&self, action_type: impl Into<String>, payload: Payload) -> Dispatched {
        self.dispatch(Action::new(action_type, payload))
    }

    /// Whether both handles point at the same slot
    pub fn ptr_eq(&self, other: &Dispatch) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    pub(crate) fn current(&self) -> DispatchFn {
        let guard = self.slot.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub(crate) fn replace(&self, chain: DispatchFn) {
        let mut guard = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *guard = chain;
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("slot", &Arc::as_ptr(&self.slot))
            .field("owned", &self.owner.is_some())
            .finish()
    }
}

/// A [`Dispatch`] that does not keep its slot alive
#[derive(Clone)]
pub struct WeakDispatch {
    slot: Weak<RwLock<DispatchFn>>,
}

impl WeakDispatch {
    pub fn upgrade(&self) -> Option<Dispatch> {
        self.slot.upgrade().map(|slot| Dispatch { slot, owner: None })
    }
}

impl fmt::Debug for WeakDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakDispatch")
            .field("slot", &self.slot.as_ptr())
            .finish()
    }
}

enum Completion {
    Ready(Option<Value>),
    Pending(JoinHandle<Result<Option<Value>, MethodsError>>),
    Failed(MethodsError),
}

/// Result of a dispatch
///
/// Synchronous transitions complete immediately. Transitions returning a
/// pending computation are driven by a spawned task; awaiting the
/// `Dispatched` waits for that task and yields the action result (if any)
/// or the rejection. Dropping it detaches the task, it is never cancelled.
pub struct Dispatched {
    action_type: String,
    completion: Completion,
}

impl Dispatched {
    pub fn ready(action_type: impl Into<String>, result: Option<Value>) -> Self {
        Self {
            action_type: action_type.into(),
            completion: Completion::Ready(result),
        }
    }

    pub fn failed(action_type: impl Into<String>, error: MethodsError) -> Self {
        Self {
            action_type: action_type.into(),
            completion: Completion::Failed(error),
        }
    }

    pub(crate) fn pending(
        action_type: impl Into<String>,
        handle: JoinHandle<Result<Option<Value>, MethodsError>>,
    ) -> Self {
        Self {
            action_type: action_type.into(),
            completion: Completion::Pending(handle),
        }
    }

    pub fn action_type(&self) -> &str {
        &self.action_type
    }

    /// Whether a spawned task is still responsible for the outcome
    pub fn is_pending(&self) -> bool {
        matches!(self.completion, Completion::Pending(_))
    }

    /// Wait until the transition settled
    pub async fn settled(self) -> Result<Option<Value>, MethodsError> {
        match self.completion {
            Completion::Ready(result) => Ok(result),
            Completion::Failed(error) => Err(error),
            Completion::Pending(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(MethodsError::Aborted {
                    action: self.action_type,
                    reason: e.to_string(),
                }),
            },
        }
    }
}

impl IntoFuture for Dispatched {
    type Output = Result<Option<Value>, MethodsError>;
    type IntoFuture = BoxFuture<'static, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.settled())
    }
}

impl fmt::Debug for Dispatched {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.completion {
            Completion::Ready(_) => "ready",
            Completion::Pending(_) => "pending",
            Completion::Failed(_) => "failed",
        };
        f.debug_struct("Dispatched")
            .field("action_type", &self.action_type)
            .field("completion", &state)
            .finish()
    }
}
