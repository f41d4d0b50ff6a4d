//! Provider scopes
//!
//! Entered providers live on a per-thread stack. Lookups walk it from the
//! top, so the innermost provider of a context wins.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use use_methods::MethodsHandle;

struct Entry {
    context_id: u64,
    handle: Box<dyn Any>,
}

thread_local! {
    static PROVIDERS: RefCell<Vec<Entry>> = const { RefCell::new(Vec::new()) };
}

pub(crate) fn lookup<S>(context_id: u64) -> Option<MethodsHandle<S>>
where
    S: 'static,
{
    PROVIDERS.with(|providers| {
        providers
            .borrow()
            .iter()
            .rev()
            .find(|entry| entry.context_id == context_id)
            .and_then(|entry| entry.handle.downcast_ref::<MethodsHandle<S>>())
            .cloned()
    })
}

/// A mounted instance of a methods context
pub struct MethodsProvider<S> {
    context_id: u64,
    handle: MethodsHandle<S>,
}

impl<S> MethodsProvider<S>
where
    S: Send + Sync + 'static,
{
    pub(crate) fn new(context_id: u64, handle: MethodsHandle<S>) -> Self {
        Self { context_id, handle }
    }

    pub fn handle(&self) -> &MethodsHandle<S> {
        &self.handle
    }

    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    /// Make this provider visible to `use_context` until the guard drops
    pub fn enter(&self) -> ProviderGuard {
        let depth = PROVIDERS.with(|providers| {
            let mut providers = providers.borrow_mut();
            providers.push(Entry {
                context_id: self.context_id,
                handle: Box::new(self.handle.clone()),
            });
            providers.len() - 1
        });
        log::trace!("Entered provider of context {} at depth {}", self.context_id, depth);
        ProviderGuard {
            depth,
            _not_send: PhantomData,
        }
    }

    /// Run `scope` inside this provider
    pub fn run<R>(&self, scope: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        scope()
    }
}

/// Leaves the provider scope on drop. Bound to the thread that entered it.
pub struct ProviderGuard {
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ProviderGuard {
    fn drop(&mut self) {
        PROVIDERS.with(|providers| providers.borrow_mut().truncate(self.depth));
    }
}
