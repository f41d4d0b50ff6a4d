//! Shared methods instances
//!
//! A [`MethodsContext`] mounts a methods factory once per provider and lets
//! any code running inside that provider reach the same
//! [`MethodsHandle`](use_methods::MethodsHandle).
//!
//! ```rust
//! use use_methods::{payload, Definitions, MethodOutcome};
//! use use_methods_context::{create_methods_context, ContextOptions};
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
//! let context = create_methods_context(counter, Counter { count: 0 }, ContextOptions::default());
//! let provider = context.provider(None);
//! provider.run(|| {
//!     let handle = context.use_context().unwrap().unwrap();
//!     handle.methods().call("increment", payload![]);
//! });
//! assert_eq!(provider.handle().state().count, 1);
//! ```

pub mod context;
pub mod provider;

pub use context::{create_methods_context, ContextOptions, MethodsContext};
pub use provider::{MethodsProvider, ProviderGuard};
