//! Provider/context pair over a methods factory.

use crate::provider::{lookup, MethodsProvider};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use use_methods::{
    CreateMethodsFn, Definitions, MethodsConfig, MethodsError, MethodsHandle, MiddlewareChain,
    UseMethods, UseMethodsOptions,
};

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

pub struct ContextOptions<S> {
    /// Mounts providers; plain `use_methods` when unset
    pub use_methods: Option<UseMethods<S>>,
    /// Fail `use_context` outside a provider instead of returning `None`
    pub strict: bool,
}

impl<S> ContextOptions<S>
where
    S: Send + Sync + 'static,
{
    pub fn from_config(config: &MethodsConfig) -> Self {
        Self {
            use_methods: Some(UseMethods::from_config(config, MiddlewareChain::new())),
            strict: config.strict_context,
        }
    }
}

impl<S> Default for ContextOptions<S> {
    fn default() -> Self {
        Self {
            use_methods: None,
            strict: true,
        }
    }
}

/// A methods factory shared through providers
pub struct MethodsContext<S> {
    id: u64,
    create: CreateMethodsFn<S>,
    default_initial: S,
    options: ContextOptions<S>,
}

/// Create a context for `create`; providers start from `default_initial`
/// unless given their own initial value.
pub fn create_methods_context<S, F>(
    create: F,
    default_initial: S,
    options: ContextOptions<S>,
) -> MethodsContext<S>
where
    S: Clone + Send + Sync + 'static,
    F: for<'a> Fn(&'a S) -> Definitions<'a, S> + Send + Sync + 'static,
{
    let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
    log::debug!("Created methods context {}", id);
    MethodsContext {
        id,
        create: Arc::new(create),
        default_initial,
        options,
    }
}

impl<S> MethodsContext<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn context_id(&self) -> u64 {
        self.id
    }

    /// Mount a fresh instance
    pub fn provider(&self, initial: Option<S>) -> MethodsProvider<S> {
        let initial = initial.unwrap_or_else(|| self.default_initial.clone());
        let create = Arc::clone(&self.create);
        let handle = match &self.options.use_methods {
            Some(custom) => {
                custom.use_methods(move |state| create(state), initial, UseMethodsOptions::new())
            }
            None => use_methods::use_methods(
                move |state| create(state),
                initial,
                UseMethodsOptions::new(),
            ),
        };
        log::debug!("Mounted provider for context {}", self.id);
        MethodsProvider::new(self.id, handle)
    }

    /// The instance of the innermost entered provider of this context
    pub fn use_context(&self) -> Result<Option<MethodsHandle<S>>, MethodsError> {
        match lookup::<S>(self.id) {
            Some(handle) => Ok(Some(handle)),
            None if self.options.strict => Err(MethodsError::OutsideProvider),
            None => Ok(None),
        }
    }

    /// Wrap `component` so every call runs inside its own fresh provider
    pub fn with_provider<'a, P, R, C>(
        &'a self,
        component: C,
        initial: Option<S>,
    ) -> impl Fn(P) -> R + 'a
    where
        P: 'a,
        R: 'a,
        C: Fn(P) -> R + 'a,
    {
        move |props: P| {
            let provider = self.provider(initial.clone());
            provider.run(|| component(props))
        }
    }

    /// Wrap `component` so it receives `map` of the current instance next to its props
    pub fn connect<'a, P, T, R, M, C>(
        &'a self,
        map: M,
        component: C,
    ) -> impl Fn(P) -> Result<R, MethodsError> + 'a
    where
        P: 'a,
        T: 'a,
        R: 'a,
        M: Fn(&MethodsHandle<S>) -> T + 'a,
        C: Fn(P, T) -> R + 'a,
    {
        move |props: P| {
            let handle = self
                .use_context()?
                .ok_or(MethodsError::OutsideProvider)?;
            Ok(component(props, map(&handle)))
        }
    }
}
