//! Stateful dispatch engine
//!
//! The engine owns the authoritative [`StateCell`], the render trigger and the
//! stable [`Dispatch`] slot. The slot holds the middleware chain composed
//! around a base dispatch, which runs the reducer and settles its
//! [`Reduction`]:
//!
//! - `Ready` commits immediately (or not at all when the state is `None`)
//! - `Pending` is spawned on the current tokio runtime and committed when it
//!   resolves, against whatever is current at that time
//! - `Deferred` runs right after the reduction returned, like an action
//! - a raw `Mutate` is ignored unless a draft reducer mapper converted it
//!
//! No lock is held while user code runs, so reducers, middleware and
//! commit listeners may dispatch again. A commit made while listeners run is
//! queued, and listeners see every `(previous, current)` pair in commit order.

use crate::action::{Action, ActionEnvelope, Dispatch, DispatchFn, Dispatched, Pending};
use crate::definitions::ActionOutcome;
use crate::error::MethodsError;
use crate::force_update::ForceUpdate;
use crate::middleware::{MiddlewareChain, Store};
use crate::reducer::{ReducerContext, ReducerFn, Reduction, StateCell, StateReader};
use serde_json::Value;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock, Weak};
use tokio::sync::watch;

/// Called after every commit with `(previous, current)`
pub type CommitListener<S> = Arc<dyn Fn(&S, &S) + Send + Sync>;

struct EngineInner<S> {
    cell: StateCell<S>,
    dispatch: Dispatch,
    chain: MiddlewareChain<S>,
    force_update: ForceUpdate,
    listeners: RwLock<Vec<CommitListener<S>>>,
    notifications: Mutex<Notifications<S>>,
}

struct Notifications<S> {
    queue: VecDeque<(Arc<S>, Arc<S>)>,
    draining: bool,
}

/// A mounted engine instance
pub struct Engine<S> {
    inner: Arc<EngineInner<S>>,
}

impl<S> Clone for Engine<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> Engine<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn mount(reducer: ReducerFn<S>, initial: S, chain: MiddlewareChain<S>) -> Self {
        let inner = Arc::new_cyclic(|engine: &Weak<EngineInner<S>>| {
            let cell = StateCell::new(initial);
            let base = base_dispatch(engine.clone(), reducer);
            let dispatch = Dispatch::new(Arc::clone(&base));
            let store = Store::new(cell.reader(), &dispatch);
            dispatch.replace(chain.compose(store, base));
            EngineInner {
                cell,
                dispatch,
                chain,
                force_update: ForceUpdate::new(),
                listeners: RwLock::new(Vec::new()),
                notifications: Mutex::new(Notifications {
                    queue: VecDeque::new(),
                    draining: false,
                }),
            }
        });
        Self { inner }
    }

    /// Latest committed state
    pub fn state(&self) -> Arc<S> {
        self.inner.cell.get()
    }

    /// Reader returning the latest committed state, usable after this handle is gone
    pub fn reader(&self) -> StateReader<S> {
        self.inner.cell.reader()
    }

    /// The stable dispatch slot; the returned handle keeps the engine alive
    pub fn dispatch(&self) -> Dispatch {
        let owner: Arc<dyn Any + Send + Sync> = self.inner.clone();
        self.inner.dispatch.owned_by(owner)
    }

    /// The slot without keeping the engine alive, for anything the engine itself stores
    pub(crate) fn inner_dispatch(&self) -> Dispatch {
        self.inner.dispatch.clone()
    }

    pub fn force_update(&self) -> ForceUpdate {
        self.inner.force_update.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.force_update.subscribe()
    }

    pub fn renders(&self) -> u64 {
        self.inner.force_update.renders()
    }

    /// Register a listener running after every commit while mounted.
    ///
    /// A listener holding a handle from [`Engine::dispatch`] keeps the engine
    /// alive for as long as the engine keeps the listener.
    pub fn on_commit(&self, listener: CommitListener<S>) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(listener);
    }

    /// Swap the reducer and recompose the middleware chain into the same slot
    pub fn replace_reducer(&self, reducer: ReducerFn<S>) {
        let base = base_dispatch(Arc::downgrade(&self.inner), reducer);
        let store = Store::new(self.inner.cell.reader(), &self.inner.dispatch);
        self.inner
            .dispatch
            .replace(self.inner.chain.compose(store, base));
        log::debug!("Reducer replaced; middleware chain recomposed");
    }

    /// Stop notifying consumers; pending work still commits
    pub fn unmount(&self) {
        self.inner.force_update.unmount();
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.force_update.is_mounted()
    }
}

fn base_dispatch<S>(engine: Weak<EngineInner<S>>, reducer: ReducerFn<S>) -> DispatchFn
where
    S: Send + Sync + 'static,
{
    Arc::new(move |action: Action| match engine.upgrade() {
        Some(engine) => engine.reduce(&reducer, action),
        None => {
            log::debug!("Dropping `{}` dispatched after teardown", action.action_type);
            Dispatched::ready(action.action_type, None)
        }
    })
}

fn action_reduction<S>(pending: Pending<Option<Value>>) -> Pending<Reduction<S>>
where
    S: Send + Sync + 'static,
{
    Box::pin(async move {
        let result = pending.await?;
        anyhow::Ok(Reduction::Ready {
            state: None,
            result,
        })
    })
}

impl<S> EngineInner<S>
where
    S: Send + Sync + 'static,
{
    fn reduce(self: &Arc<Self>, reducer: &ReducerFn<S>, action: Action) -> Dispatched {
        let context = ReducerContext {
            reducer_state: self.cell.get(),
            state: self.cell.reader(),
            dispatch: self.dispatch.clone(),
        };
        let reduction = reducer(context, &action);
        self.settle(action, reduction)
    }

    fn settle(self: &Arc<Self>, action: Action, reduction: Reduction<S>) -> Dispatched {
        match reduction {
            Reduction::Ready { state, result } => {
                if let Some(state) = state {
                    self.commit(state);
                }
                Dispatched::ready(action.action_type, result)
            }
            Reduction::Pending(pending) => self.spawn(action, pending),
            Reduction::Deferred(body) => {
                let envelope = ActionEnvelope::new(action.clone(), self.dispatch.clone());
                match body(envelope) {
                    ActionOutcome::Done(result) => Dispatched::ready(action.action_type, result),
                    ActionOutcome::Pending(pending) => {
                        self.spawn(action, action_reduction(pending))
                    }
                }
            }
            Reduction::Mutate(_) => {
                ignore_mutation(&action);
                Dispatched::ready(action.action_type, None)
            }
        }
    }

    fn spawn(self: &Arc<Self>, action: Action, pending: Pending<Reduction<S>>) -> Dispatched {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::error!("No tokio runtime to drive `{}`", action.action_type);
                let name = action.action_type.clone();
                return Dispatched::failed(name, MethodsError::NoRuntime {
                    action: action.action_type,
                });
            }
        };
        let name = action.action_type.clone();
        let engine = Arc::clone(self);
        let handle = runtime.spawn(engine.resolve(action, pending));
        Dispatched::pending(name, handle)
    }

    async fn resolve(
        self: Arc<Self>,
        action: Action,
        pending: Pending<Reduction<S>>,
    ) -> Result<Option<Value>, MethodsError> {
        let mut pending = pending;
        loop {
            let reduction = pending.await.map_err(|source| MethodsError::Rejected {
                action: action.action_type.clone(),
                source,
            })?;
            match reduction {
                Reduction::Pending(next) => pending = next,
                Reduction::Ready { state, result } => {
                    if let Some(state) = state {
                        self.commit(state);
                    }
                    return Ok(result);
                }
                Reduction::Deferred(body) => {
                    let envelope = ActionEnvelope::new(action.clone(), self.dispatch.clone());
                    match body(envelope) {
                        ActionOutcome::Done(result) => return Ok(result),
                        ActionOutcome::Pending(next) => pending = action_reduction(next),
                    }
                }
                Reduction::Mutate(_) => {
                    ignore_mutation(&action);
                    return Ok(None);
                }
            }
        }
    }

    fn commit(&self, next: S) {
        let next = Arc::new(next);
        let mut notifications = self.notifications.lock().unwrap_or_else(|e| e.into_inner());
        let previous = self.cell.swap(Arc::clone(&next));
        log::trace!("Committed new state");

        if !self.force_update.is_mounted() {
            log::debug!("State committed after unmount; consumers are not notified");
            return;
        }
        self.force_update.trigger();

        notifications.queue.push_back((previous, next));
        if notifications.draining {
            log::trace!("Commit queued behind running listeners");
            return;
        }
        notifications.draining = true;
        drop(notifications);
        self.notify();
    }

    /// Run the listeners for queued commits until none are left
    fn notify(&self) {
        loop {
            let (previous, next) = {
                let mut notifications =
                    self.notifications.lock().unwrap_or_else(|e| e.into_inner());
                match notifications.queue.pop_front() {
                    Some(pair) => pair,
                    None => {
                        notifications.draining = false;
                        return;
                    }
                }
            };

            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
            for listener in listeners {
                listener(&previous, &next);
            }
        }
    }
}

fn ignore_mutation(action: &Action) {
    log::warn!(
        "`{}` wrote to a draft but no copy-on-write reducer mapper is installed; ignoring",
        action.action_type
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{Definitions, MethodOutcome, Mutation};
    use crate::draft::Draft;
    use crate::middleware::{from_fn, Next};
    use crate::payload;
    use crate::reducer::methods_reducer;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq)]
    struct Counter {
        count: i64,
    }

    fn counter(state: &Counter) -> Definitions<'_, Counter> {
        Definitions::new()
            .method("increment", move |_| {
                MethodOutcome::from(Counter {
                    count: state.count + 1,
                })
            })
            .method("reset", |_| MethodOutcome::from(Counter { count: 0 }))
            .method("slow_double", move |_| {
                let next = state.count * 2;
                MethodOutcome::pending(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(Counter { count: next })
                })
            })
            .method("broken", |_| {
                MethodOutcome::pending(async { Err::<Counter, _>(anyhow::anyhow!("backend down")) })
            })
            .method("then_increment", |_| {
                MethodOutcome::deferred(|envelope| {
                    envelope.dispatch.call("increment", payload![]);
                    ActionOutcome::done()
                })
            })
            .method("raw_write", |_| {
                let mutation: Mutation<Counter> =
                    Box::new(|draft: &mut Draft<Counter>| draft.count = 99);
                MethodOutcome::Mutate(mutation)
            })
            .action("increment_twice", |envelope| {
                envelope.dispatch.call("increment", payload![]);
                envelope.dispatch.call("increment", payload![]);
                ActionOutcome::done()
            })
    }

    fn mount(initial: i64) -> Engine<Counter> {
        Engine::mount(
            methods_reducer(Arc::new(counter)),
            Counter { count: initial },
            MiddlewareChain::new(),
        )
    }

    #[test]
    fn test_dispatch_commits_and_state_is_fresh() {
        let engine = mount(10);
        engine.dispatch().call("increment", payload![]);
        assert_eq!(engine.state().count, 11);
        assert_eq!(engine.renders(), 1);
    }

    #[test]
    fn test_action_body_dispatches_reentrantly() {
        let engine = mount(0);
        engine.dispatch().call("increment_twice", payload![]);
        assert_eq!(engine.state().count, 2);
    }

    #[test]
    fn test_unknown_action_does_not_commit() {
        let engine = mount(3);
        let before = engine.state();
        engine.dispatch().call("unknown", payload![]);
        assert!(Arc::ptr_eq(&before, &engine.state()));
        assert_eq!(engine.renders(), 0);
    }

    #[test]
    fn test_deferred_method_runs_after_reduction() {
        let engine = mount(1);
        engine.dispatch().call("then_increment", payload![]);
        assert_eq!(engine.state().count, 2);
    }

    #[test]
    fn test_raw_mutation_is_ignored() {
        let engine = mount(1);
        engine.dispatch().call("raw_write", payload![]);
        assert_eq!(engine.state().count, 1);
    }

    #[test]
    fn test_pending_without_runtime_fails() {
        let engine = mount(1);
        let dispatched = engine.dispatch().call("slow_double", payload![]);
        assert!(!dispatched.is_pending());
        let outcome = block_on(dispatched);
        assert!(matches!(outcome, Err(MethodsError::NoRuntime { .. })));
        assert_eq!(engine.state().count, 1);
    }

    fn block_on(dispatched: Dispatched) -> Result<Option<Value>, MethodsError> {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(dispatched.settled())
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_method_commits_on_resolution() {
        let engine = mount(3);
        let dispatched = engine.dispatch().call("slow_double", payload![]);
        assert!(dispatched.is_pending());
        assert_eq!(engine.state().count, 3);

        dispatched.await.unwrap();
        assert_eq!(engine.state().count, 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_commit_replaces_newer_state() {
        let engine = mount(3);
        let dispatched = engine.dispatch().call("slow_double", payload![]);
        engine.dispatch().call("increment", payload![]);
        assert_eq!(engine.state().count, 4);

        dispatched.await.unwrap();
        assert_eq!(engine.state().count, 6);
    }

    #[tokio::test]
    async fn test_rejection_propagates_and_keeps_state() {
        let engine = mount(5);
        let outcome = engine.dispatch().call("broken", payload![]).await;
        assert!(matches!(
            outcome,
            Err(MethodsError::Rejected { ref action, .. }) if action == "broken"
        ));
        assert_eq!(engine.state().count, 5);
    }

    #[test]
    fn test_commit_listeners_see_previous_and_current() {
        let engine = mount(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        engine.on_commit(Arc::new(move |previous: &Counter, current: &Counter| {
            recorded.lock().unwrap().push((previous.count, current.count));
        }));

        engine.dispatch().call("increment", payload![]);
        engine.dispatch().call("increment", payload![]);
        assert_eq!(*seen.lock().unwrap(), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_replace_reducer_keeps_dispatch_identity() {
        let engine = mount(0);
        let before = engine.dispatch();

        fn doubling(state: &Counter) -> Definitions<'_, Counter> {
            Definitions::new().method("increment", move |_| {
                MethodOutcome::from(Counter {
                    count: state.count + 2,
                })
            })
        }
        engine.replace_reducer(methods_reducer(Arc::new(doubling)));

        assert!(before.ptr_eq(&engine.dispatch()));
        before.call("increment", payload![]);
        assert_eq!(engine.state().count, 2);
    }

    #[test]
    fn test_middleware_sees_nested_dispatches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        let chain = MiddlewareChain::new().with(from_fn(
            move |action: Action, _store: &Store<Counter>, next: &Next| {
                recorded.lock().unwrap().push(action.action_type.clone());
                next.run(action)
            },
        ));
        let engine = Engine::mount(
            methods_reducer(Arc::new(counter)),
            Counter { count: 0 },
            chain,
        );

        engine.dispatch().call("increment_twice", payload![]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["increment_twice", "increment", "increment"]
        );
    }

    #[test]
    fn test_listeners_see_nested_commits_in_order() {
        let engine = mount(10);
        engine.on_commit(Arc::new({
            let dispatch = engine.inner_dispatch();
            move |_: &Counter, current: &Counter| {
                if current.count > 10 {
                    dispatch.call("reset", payload![]);
                }
            }
        }));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorded = seen.clone();
        engine.on_commit(Arc::new(move |previous: &Counter, current: &Counter| {
            recorded.lock().unwrap().push((previous.count, current.count));
        }));

        engine.dispatch().call("increment", payload![]);

        assert_eq!(engine.state().count, 0);
        assert_eq!(*seen.lock().unwrap(), vec![(10, 11), (11, 0)]);
    }

    #[test]
    fn test_dispatch_handle_keeps_engine_alive() {
        let engine = mount(0);
        let dispatch = engine.dispatch();
        let reader = engine.reader();
        drop(engine);

        dispatch.call("increment", payload![]);
        assert_eq!(reader.get().count, 1);
    }

    #[test]
    fn test_dropped_engine_frees_state_with_middleware() {
        let chain = MiddlewareChain::new().with(from_fn(
            |action: Action, store: &Store<Counter>, next: &Next| {
                log::trace!("count before {}: {}", action.action_type, store.get_state().count);
                next.run(action)
            },
        ));
        let engine = Engine::mount(
            methods_reducer(Arc::new(counter)),
            Counter { count: 0 },
            chain,
        );
        engine.dispatch().call("increment", payload![]);
        let state = Arc::downgrade(&engine.state());
        assert!(state.upgrade().is_some());

        drop(engine);
        assert!(state.upgrade().is_none());
    }

    #[test]
    fn test_unmounted_engine_commits_silently() {
        let engine = mount(0);
        let notified = Arc::new(Mutex::new(0));
        let counter = notified.clone();
        engine.on_commit(Arc::new(move |_: &Counter, _: &Counter| {
            *counter.lock().unwrap() += 1;
        }));

        engine.unmount();
        engine.dispatch().call("increment", payload![]);

        assert_eq!(engine.state().count, 1);
        assert_eq!(engine.renders(), 0);
        assert_eq!(*notified.lock().unwrap(), 0);
    }
}
