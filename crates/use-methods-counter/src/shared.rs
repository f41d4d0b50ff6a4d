//! Two counters sharing one factory through a methods context

use crate::counter::{counter, CounterState};
use use_methods::{
    create_use_methods, payload, MethodsConfig, MethodsHandle, MiddlewareChain, UseMethodsOptions,
};
use use_methods_context::{create_methods_context, ContextOptions, MethodsContext};

pub fn counter_context(config: &MethodsConfig) -> MethodsContext<CounterState> {
    let use_counter = create_use_methods(
        UseMethodsOptions::new().with_drafts(),
        MiddlewareChain::new(),
    );
    create_methods_context(
        counter,
        CounterState::default(),
        ContextOptions {
            use_methods: Some(use_counter),
            strict: config.strict_context,
        },
    )
}

/// Render one counter of `context`: bump it `clicks` times and report the count
pub fn render(context: &MethodsContext<CounterState>, clicks: usize) -> anyhow::Result<String> {
    if let Some(handle) = context.use_context()? {
        for _ in 0..clicks {
            handle.methods().call("increment", payload![]);
        }
    }

    let label = context.connect(
        |handle: &MethodsHandle<CounterState>| handle.state().count,
        |name: &str, count: i64| format!("{}: {}", name, count),
    );
    Ok(label("shared counter")?)
}

pub fn run(config: &MethodsConfig) -> anyhow::Result<()> {
    let context = counter_context(config);
    let first = context.provider(None);
    let second = context.provider(Some(CounterState { count: 5 }));

    let a = first.run(|| render(&context, 2))?;
    let b = second.run(|| render(&context, 1))?;
    log::info!("{} / {}", a, b);

    let page = context.with_provider(|clicks: usize| render(&context, clicks), None);
    log::info!("fresh provider: {}", page(3)?);
    Ok(())
}
