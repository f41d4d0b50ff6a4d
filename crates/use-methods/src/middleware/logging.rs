use crate::action::{Action, Dispatched};
use crate::middleware::{Middleware, Next, Store};

/// LoggingMiddleware - logs all actions passing through
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Middleware<S> for LoggingMiddleware {
    fn handle(&self, action: Action, _store: &Store<S>, next: &Next) -> Dispatched {
        log::debug!("Action: {:?}", action);
        let dispatched = next.run(action);
        if dispatched.is_pending() {
            log::debug!("Action `{}` is pending", dispatched.action_type());
        }
        dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Dispatch;
    use crate::middleware::MiddlewareChain;
    use crate::reducer::StateCell;
    use std::sync::Arc;

    #[test]
    fn test_logging_middleware_passes_through() {
        let cell = StateCell::new(());
        let store = Store::new(
            cell.reader(),
            &Dispatch::new(Arc::new(|action: Action| {
                Dispatched::ready(action.action_type, None)
            })),
        );
        let chain: MiddlewareChain<()> = MiddlewareChain::new().with(LoggingMiddleware::new());
        let composed = chain.compose(
            store,
            Arc::new(|action: Action| {
                Dispatched::ready(action.action_type, Some(serde_json::Value::Bool(true)))
            }),
        );

        let dispatched = composed(Action::named("quit"));
        assert_eq!(dispatched.action_type(), "quit");
        assert!(!dispatched.is_pending());
    }
}
