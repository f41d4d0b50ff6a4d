mod counter;
mod shared;

use counter::{counter, CounterState};
use use_methods::{
    payload, InitialState, MethodsConfig, MethodsHandle, MiddlewareChain, UseMethods,
    UseMethodsOptions,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting use-methods-counter");

    let config = MethodsConfig::load();
    let use_counter = UseMethods::from_config(&config, MiddlewareChain::new());
    let handle = use_counter.use_methods(
        counter,
        InitialState::lazy(CounterState::default),
        UseMethodsOptions::new().with_drafts().enable_loading(true),
    );

    let renders = spawn_renderer(&handle);
    run_counter(&handle).await?;
    shared::run(&config)?;

    handle.unmount();
    renders.abort();
    log::info!("Exiting use-methods-counter");
    Ok(())
}

/// Log every re-render until the handle unmounts
fn spawn_renderer(handle: &MethodsHandle<CounterState>) -> tokio::task::JoinHandle<()> {
    let handle = handle.clone();
    let mut rx = handle.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            log::info!("render: count={} loading={:?}", handle.state().count, handle.loading());
        }
    })
}

async fn run_counter(handle: &MethodsHandle<CounterState>) -> anyhow::Result<()> {
    let methods = handle.methods();

    methods.call("increment", payload![]);
    methods.call("incrementDouble", payload![]);
    methods.call("decrement", payload![]);
    methods.call("set", payload![10]);
    log::info!("count after sync calls: {}", handle.state().count);

    // effect resets once the count passes the limit
    methods.call("increment", payload![]);
    log::info!("count after overflow: {}", handle.state().count);

    let result = methods.call("incrementAsync", payload![]).await?;
    log::info!("incrementAsync -> {:?}, count={}", result, handle.get_async_state().count);

    methods.call("midReset", payload![]).await?;
    log::info!("after midReset: {}", handle.get_async_state().count);
    Ok(())
}
