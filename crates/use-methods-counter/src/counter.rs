//! The counter methods factory

use serde_json::Value;
use std::time::Duration;
use use_methods::{
    payload, ActionOutcome, Definitions, Dispatch, Draft, Effect, MethodOutcome,
};

/// Counts above this are reset by the `count` effect
pub const MAX_COUNT: i64 = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterState {
    pub count: i64,
}

pub fn counter(state: &CounterState) -> Definitions<'_, CounterState> {
    Definitions::new()
        .method("increment", |_| {
            MethodOutcome::mutate(|draft: &mut Draft<CounterState>| draft.count += 1)
        })
        .method("incrementDouble", move |_| {
            MethodOutcome::from(CounterState {
                count: state.count * 2,
            })
        })
        .method("decrement", |_| {
            MethodOutcome::mutate(|draft: &mut Draft<CounterState>| draft.count -= 1)
        })
        .method("set", |payload| match payload.arg::<i64>(0) {
            Ok(count) => MethodOutcome::from(CounterState { count }),
            Err(e) => {
                log::warn!("set: {}", e);
                MethodOutcome::Unchanged
            }
        })
        .method("reset", |_| MethodOutcome::from(CounterState::default()))
        .action("midReset", |envelope| {
            let dispatch = envelope.dispatch.clone();
            ActionOutcome::pending(async move {
                let setter = dispatch.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    setter.call("set", payload![2]);
                });
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(None)
            })
        })
        .action("incrementAsync", |envelope| {
            let dispatch = envelope.dispatch.clone();
            ActionOutcome::pending(async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                let inner = dispatch.call("incrementAsync2", payload![]).await?;
                log::info!("incrementAsync2 returned {:?}", inner);
                anyhow::Ok(Some(Value::from("incrementAsync")))
            })
        })
        .action("incrementAsync2", |envelope| {
            let dispatch = envelope.dispatch.clone();
            ActionOutcome::pending(async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                dispatch.call("increment", payload![]);
                Ok(Some(Value::from("incrementAsync2 end")))
            })
        })
        .effect(Effect::watch(
            "count",
            |state: &CounterState| state.count,
            |dispatch: &Dispatch, new: i64, old: i64| {
                log::info!("count {} -> {}", old, new);
                if new > MAX_COUNT {
                    dispatch.call("reset", payload![]);
                }
            },
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use use_methods::{use_methods, MethodsHandle, UseMethodsOptions};

    fn mount(count: i64) -> MethodsHandle<CounterState> {
        use_methods(
            counter,
            CounterState { count },
            UseMethodsOptions::new().with_drafts().enable_loading(true),
        )
    }

    #[test]
    fn test_sync_methods() {
        let handle = mount(3);
        let methods = handle.methods();
        methods.call("increment", payload![]);
        methods.call("incrementDouble", payload![]);
        methods.call("decrement", payload![]);
        assert_eq!(handle.state().count, 7);

        methods.call("set", payload![9]);
        assert_eq!(handle.state().count, 9);
        methods.call("reset", payload![]);
        assert_eq!(*handle.state(), CounterState::default());
    }

    #[test]
    fn test_effect_caps_count() {
        let handle = mount(MAX_COUNT);
        handle.methods().call("increment", payload![]);
        assert_eq!(handle.state().count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_reset_sets_two_while_loading() {
        let handle = mount(7);
        let dispatched = handle.methods().call("midReset", payload![]);
        assert!(handle.is_loading("midReset"));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(handle.state().count, 2);
        assert!(handle.is_loading("midReset"));

        dispatched.await.unwrap();
        assert!(!handle.is_loading("midReset"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_async_chains_actions() {
        let handle = mount(1);
        let result = handle
            .methods()
            .call("incrementAsync", payload![])
            .await
            .unwrap();

        assert_eq!(result, Some(Value::from("incrementAsync")));
        assert_eq!(handle.state().count, 2);
        assert!(!handle.is_loading("incrementAsync"));
    }
}
