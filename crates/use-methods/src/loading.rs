//! Per-action loading flags.
//!
//! Flags are written on a private channel: they never pass through the
//! middleware chain or the reducer, so user middleware cannot delay or drop
//! them. A flag goes `true` right before the action is dispatched and back to
//! `false` once the returned [`Dispatched`] settled.

use crate::action::Dispatched;
use crate::force_update::ForceUpdate;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Snapshot of the loading flags, keyed by action name
pub type LoadingMap = BTreeMap<String, bool>;

#[derive(Clone)]
pub struct LoadingTracker {
    flags: Arc<RwLock<LoadingMap>>,
    force_update: ForceUpdate,
}

impl LoadingTracker {
    /// Track `actions`, all initially `false`
    pub fn new<I, N>(actions: I, force_update: ForceUpdate) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        let flags = actions
            .into_iter()
            .map(|name| (name.into(), false))
            .collect();
        Self {
            flags: Arc::new(RwLock::new(flags)),
            force_update,
        }
    }

    pub fn snapshot(&self) -> LoadingMap {
        self.flags.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_loading(&self, action: &str) -> bool {
        self.flags
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(action)
            .copied()
            .unwrap_or(false)
    }

    /// Write one flag and notify consumers if it changed
    pub fn set(&self, action: &str, loading: bool) {
        let changed = {
            let mut flags = self.flags.write().unwrap_or_else(|e| e.into_inner());
            let previous = flags.insert(action.to_string(), loading);
            previous != Some(loading)
        };
        if changed {
            log::trace!("Loading `{}` -> {}", action, loading);
            self.force_update.trigger();
        }
    }

    /// Clear the flag of `action` once `dispatched` settled.
    pub fn settle(&self, action: &str, dispatched: Dispatched) -> Dispatched {
        if !dispatched.is_pending() {
            self.set(action, false);
            return dispatched;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::warn!("No runtime to observe `{}`; clearing its loading flag", action);
                self.set(action, false);
                return dispatched;
            }
        };

        let tracker = self.clone();
        let name = action.to_string();
        let handle = runtime.spawn(async move {
            let outcome = dispatched.settled().await;
            tracker.set(&name, false);
            outcome
        });
        Dispatched::pending(action, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MethodsError;
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    fn tracker() -> LoadingTracker {
        LoadingTracker::new(["midReset", "fetch"], ForceUpdate::new())
    }

    #[test]
    fn test_initialised_to_false() {
        let expected: LoadingMap = [("fetch".to_string(), false), ("midReset".to_string(), false)]
            .into_iter()
            .collect();
        assert_eq!(tracker().snapshot(), expected);
    }

    #[test]
    fn test_set_notifies_only_on_change() {
        let force_update = ForceUpdate::new();
        let tracker = LoadingTracker::new(["fetch"], force_update.clone());
        tracker.set("fetch", false);
        assert_eq!(force_update.renders(), 0);
        tracker.set("fetch", true);
        assert!(tracker.is_loading("fetch"));
        assert_eq!(force_update.renders(), 1);
    }

    #[test]
    fn test_ready_dispatch_clears_immediately() {
        let tracker = tracker();
        tracker.set("fetch", true);
        let dispatched = tracker.settle("fetch", Dispatched::ready("fetch", None));
        assert!(!dispatched.is_pending());
        assert!(!tracker.is_loading("fetch"));
    }

    #[tokio::test]
    async fn test_pending_dispatch_clears_after_settle() {
        let tracker = tracker();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let inner = Dispatched::pending(
            "midReset",
            tokio::spawn(async move {
                let _ = rx.await;
                Ok(Some(Value::from(1)))
            }),
        );

        tracker.set("midReset", true);
        let dispatched = tracker.settle("midReset", inner);
        assert!(tracker.is_loading("midReset"));

        tx.send(()).unwrap();
        assert_eq!(dispatched.await.unwrap(), Some(Value::from(1)));
        assert!(!tracker.is_loading("midReset"));
    }

    #[tokio::test]
    async fn test_rejection_still_clears_flag() {
        let tracker = tracker();
        let inner = Dispatched::pending(
            "fetch",
            tokio::spawn(async {
                Err(MethodsError::Rejected {
                    action: "fetch".to_string(),
                    source: anyhow::anyhow!("offline"),
                })
            }),
        );
        tracker.set("fetch", true);
        let outcome = tracker.settle("fetch", inner).await;
        assert!(matches!(outcome, Err(MethodsError::Rejected { .. })));
        assert!(!tracker.is_loading("fetch"));
    }
}
