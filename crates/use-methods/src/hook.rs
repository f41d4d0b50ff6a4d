//! `use_methods`: mount a methods factory and hand back its callable surface.

use crate::action::Dispatch;
use crate::binder::BoundMethods;
use crate::definitions::{CreateMethodsFn, Definitions};
use crate::effects::EffectRunner;
use crate::engine::Engine;
use crate::loading::{LoadingMap, LoadingTracker};
use crate::middleware::{LoggingMiddleware, MiddlewareChain};
use crate::options::UseMethodsOptions;
use crate::reducer::{methods_reducer, StateReader};
use crate::use_reducer::{create_use_reducer, InitialState, UseReducer};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use use_methods_config::MethodsConfig;

/// A mounted methods factory
pub struct MethodsHandle<S> {
    engine: Engine<S>,
    methods: BoundMethods,
    loading: Option<LoadingTracker>,
    reducer_options: UseMethodsOptions<S>,
}

impl<S> Clone for MethodsHandle<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            methods: self.methods.clone(),
            loading: self.loading.clone(),
            reducer_options: self.reducer_options.clone(),
        }
    }
}

impl<S> fmt::Debug for MethodsHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodsHandle")
            .field("methods", &self.methods)
            .field("loading", &self.loading.as_ref().map(LoadingTracker::snapshot))
            .finish_non_exhaustive()
    }
}

impl<S> MethodsHandle<S>
where
    S: Send + Sync + 'static,
{
    /// Latest committed state
    pub fn state(&self) -> Arc<S> {
        self.engine.state()
    }

    pub fn methods(&self) -> &BoundMethods {
        &self.methods
    }

    /// Latest committed state, for use after awaiting
    pub fn get_async_state(&self) -> Arc<S> {
        self.engine.state()
    }

    pub fn state_reader(&self) -> StateReader<S> {
        self.engine.reader()
    }

    /// Loading flags per action, `None` unless loading is enabled
    pub fn loading(&self) -> Option<LoadingMap> {
        self.loading.as_ref().map(LoadingTracker::snapshot)
    }

    pub fn is_loading(&self, action: &str) -> bool {
        self.loading
            .as_ref()
            .is_some_and(|loading| loading.is_loading(action))
    }

    pub fn dispatch(&self) -> Dispatch {
        self.engine.dispatch()
    }

    pub fn engine(&self) -> &Engine<S> {
        &self.engine
    }

    /// Render counter changes: one per commit and per loading transition
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.engine.subscribe()
    }

    pub fn renders(&self) -> u64 {
        self.engine.renders()
    }

    pub fn unmount(&self) {
        self.engine.unmount();
    }

    /// Swap the factory behind the reducer; callers and dispatch stay valid
    pub fn replace_methods<F>(&self, create: F)
    where
        F: for<'a> Fn(&'a S) -> Definitions<'a, S> + Send + Sync + 'static,
    {
        let create: CreateMethodsFn<S> = Arc::new(create);
        let reducer = self.reducer_options.map_reducer(methods_reducer(create));
        self.engine.replace_reducer(reducer);
    }

    /// `(state, methods, async state reader)`; `methods` keeps the engine mounted
    pub fn into_parts(self) -> (Arc<S>, BoundMethods, StateReader<S>) {
        let state = self.engine.state();
        let reader = self.engine.reader();
        (state, self.methods, reader)
    }
}

/// Mount `create` with `initial` as its starting state
pub fn use_methods<S, F>(
    create: F,
    initial: impl Into<InitialState<S>>,
    options: UseMethodsOptions<S>,
) -> MethodsHandle<S>
where
    S: Send + Sync + 'static,
    F: for<'a> Fn(&'a S) -> Definitions<'a, S> + Send + Sync + 'static,
{
    mount(Arc::new(create), initial.into(), options)
}

fn mount<S>(
    create: CreateMethodsFn<S>,
    initial: InitialState<S>,
    options: UseMethodsOptions<S>,
) -> MethodsHandle<S>
where
    S: Send + Sync + 'static,
{
    let initial = initial.resolve();
    let declarations = create(&initial).into_declarations();
    log::debug!(
        "Mounting {} methods and {} actions",
        declarations.methods.len(),
        declarations.actions.len()
    );

    let reducer = options.map_reducer(methods_reducer(create));
    let engine = match &options.custom_use_reducer {
        Some(use_reducer) => use_reducer.mount(reducer, initial),
        None => UseReducer::default().mount(reducer, initial),
    };

    let effects = EffectRunner::new(declarations.effects, engine.inner_dispatch());
    if !effects.is_empty() {
        engine.on_commit(Arc::new(move |previous: &S, current: &S| {
            effects.run(previous, current);
        }));
    }

    let loading = options
        .enable_loading
        .unwrap_or(false)
        .then(|| LoadingTracker::new(declarations.actions.iter().cloned(), engine.force_update()));
    let methods = BoundMethods::new(
        engine.dispatch(),
        declarations.methods,
        declarations.actions,
        loading.clone(),
    );

    MethodsHandle {
        engine,
        methods,
        loading,
        reducer_options: UseMethodsOptions {
            custom_use_reducer: None,
            ..options
        },
    }
}

/// `use_methods` with baked-in defaults and a middleware chain
pub struct UseMethods<S> {
    defaults: UseMethodsOptions<S>,
}

/// Bake `defaults` and `chain` into a reusable `use_methods`.
///
/// The chain becomes the default `custom_use_reducer`; an explicit one in
/// `defaults` or in the per-call options wins.
pub fn create_use_methods<S>(defaults: UseMethodsOptions<S>, chain: MiddlewareChain<S>) -> UseMethods<S>
where
    S: Send + Sync + 'static,
{
    let fallback = UseMethodsOptions::new().custom_use_reducer(create_use_reducer(chain));
    UseMethods {
        defaults: defaults.or(&fallback),
    }
}

impl<S> UseMethods<S>
where
    S: Send + Sync + 'static,
{
    /// Build from a loaded config; `log_actions` puts the logging middleware first
    pub fn from_config(config: &MethodsConfig, chain: MiddlewareChain<S>) -> Self {
        let chain = if config.log_actions {
            let mut logged = MiddlewareChain::new().with(LoggingMiddleware::new());
            for middleware in chain.iter() {
                logged.push(Arc::clone(middleware));
            }
            logged
        } else {
            chain
        };
        create_use_methods(UseMethodsOptions::from_config(config), chain)
    }

    pub fn use_methods<F>(
        &self,
        create: F,
        initial: impl Into<InitialState<S>>,
        options: UseMethodsOptions<S>,
    ) -> MethodsHandle<S>
    where
        F: for<'a> Fn(&'a S) -> Definitions<'a, S> + Send + Sync + 'static,
    {
        mount(Arc::new(create), initial.into(), options.or(&self.defaults))
    }

    pub fn defaults(&self) -> &UseMethodsOptions<S> {
        &self.defaults
    }
}

impl<S> Clone for UseMethods<S> {
    fn clone(&self) -> Self {
        Self {
            defaults: self.defaults.clone(),
        }
    }
}
