//! Copy-on-write drafts and the reducer mapper applying them.
//!
//! Methods returning [`MethodOutcome::Mutate`](crate::MethodOutcome::Mutate)
//! write straight into a [`Draft`]. The draft reads through to the committed
//! state until the first write, which clones it; the committed `Arc` is never
//! touched. Install [`combine_reducers`] as the `reducer_mapper` to enable
//! this style.

use crate::action::Action;
use crate::reducer::{Reduction, ReducerContext, ReducerFn, StateReader};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Mutable view over a committed state
pub struct Draft<S> {
    base: Arc<S>,
    copy: Option<S>,
}

impl<S: Clone> Draft<S> {
    pub fn new(base: Arc<S>) -> Self {
        Self { base, copy: None }
    }

    /// Whether anything was written
    pub fn is_modified(&self) -> bool {
        self.copy.is_some()
    }

    /// The state the draft was created from
    pub fn base(&self) -> &Arc<S> {
        &self.base
    }

    /// The written state, or `None` if nothing was written
    pub fn finish(self) -> Option<S> {
        self.copy
    }
}

impl<S> Deref for Draft<S> {
    type Target = S;

    fn deref(&self) -> &S {
        match &self.copy {
            Some(copy) => copy,
            None => &*self.base,
        }
    }
}

impl<S: Clone> DerefMut for Draft<S> {
    fn deref_mut(&mut self) -> &mut S {
        let base = &self.base;
        self.copy.get_or_insert_with(|| (**base).clone())
    }
}

/// Wrap `reducer` so that draft mutations become ordinary commits.
///
/// Ready and deferred reductions pass through unchanged. Pending reductions
/// are wrapped so that a mutation they resolve to is applied to a draft of
/// the state current at resolution time.
pub fn combine_reducers<S>(reducer: ReducerFn<S>) -> ReducerFn<S>
where
    S: Clone + Send + Sync + 'static,
{
    Arc::new(move |context: ReducerContext<S>, action: &Action| {
        let base = Arc::clone(&context.reducer_state);
        let reader = context.state.clone();
        finalize(reducer(context, action), base, reader)
    })
}

fn finalize<S>(reduction: Reduction<S>, base: Arc<S>, reader: StateReader<S>) -> Reduction<S>
where
    S: Clone + Send + Sync + 'static,
{
    match reduction {
        Reduction::Mutate(mutation) => {
            let mut draft = Draft::new(base);
            mutation(&mut draft);
            Reduction::Ready {
                state: draft.finish(),
                result: None,
            }
        }
        Reduction::Pending(pending) => Reduction::Pending(Box::pin(async move {
            let resolved = pending.await?;
            let latest = reader.get();
            anyhow::Ok(finalize(resolved, latest, reader))
        })),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Dispatch, Dispatched};
    use crate::definitions::Mutation;
    use crate::reducer::StateCell;
    use pretty_assertions::assert_eq;

    #[derive(Clone, Debug, PartialEq)]
    struct Board {
        count: i32,
        tags: Vec<String>,
    }

    fn board() -> Board {
        Board {
            count: 0,
            tags: vec!["a".into()],
        }
    }

    fn context(cell: &StateCell<Board>) -> ReducerContext<Board> {
        ReducerContext {
            reducer_state: cell.get(),
            state: cell.reader(),
            dispatch: Dispatch::new(Arc::new(|action: Action| {
                Dispatched::ready(action.action_type, None)
            })),
        }
    }

    #[test]
    fn test_draft_reads_through_until_written() {
        let base = Arc::new(board());
        let draft = Draft::new(Arc::clone(&base));
        assert_eq!(draft.count, 0);
        assert!(!draft.is_modified());
        assert_eq!(draft.finish(), None);
    }

    #[test]
    fn test_draft_write_leaves_base_untouched() {
        let base = Arc::new(board());
        let mut draft = Draft::new(Arc::clone(&base));
        draft.count += 1;
        draft.tags.push("b".into());

        assert!(draft.is_modified());
        assert_eq!(draft.base().count, 0);
        let written = draft.finish().unwrap();
        assert_eq!(
            written,
            Board {
                count: 1,
                tags: vec!["a".into(), "b".into()],
            }
        );
        assert_eq!(*base, board());
    }

    #[test]
    fn test_combined_reducer_applies_mutation() {
        let cell = StateCell::new(board());
        let reducer: ReducerFn<Board> = Arc::new(|_: ReducerContext<Board>, _: &Action| {
            let mutation: Mutation<Board> = Box::new(|draft: &mut Draft<Board>| draft.count = 5);
            Reduction::Mutate(mutation)
        });
        let combined = combine_reducers(reducer);

        match combined(context(&cell), &Action::named("set")) {
            Reduction::Ready { state, .. } => assert_eq!(state.map(|s| s.count), Some(5)),
            _ => panic!("expected a ready reduction"),
        }
        assert_eq!(cell.get().count, 0);
    }

    #[test]
    fn test_combined_reducer_passes_ready_through() {
        let cell = StateCell::new(board());
        let reducer: ReducerFn<Board> =
            Arc::new(|_: ReducerContext<Board>, _: &Action| Reduction::Ready {
                state: None,
                result: None,
            });
        let combined = combine_reducers(reducer);
        assert!(matches!(
            combined(context(&cell), &Action::named("other")),
            Reduction::Ready { state: None, .. }
        ));
    }

    #[tokio::test]
    async fn test_pending_mutation_uses_state_at_resolution() {
        let cell = StateCell::new(board());
        let reducer: ReducerFn<Board> = Arc::new(|_: ReducerContext<Board>, _: &Action| {
            Reduction::Pending(Box::pin(async {
                let mutation: Mutation<Board> = Box::new(|draft: &mut Draft<Board>| draft.count += 10);
                Ok(Reduction::Mutate(mutation))
            }))
        });
        let combined = combine_reducers(reducer);
        let reduction = combined(context(&cell), &Action::named("later"));

        // Commit something else before the pending reduction resolves.
        cell.replace(Board {
            count: 1,
            tags: Vec::new(),
        });

        let Reduction::Pending(pending) = reduction else {
            panic!("expected a pending reduction");
        };
        match pending.await.unwrap() {
            Reduction::Ready { state, .. } => assert_eq!(state.map(|s| s.count), Some(11)),
            _ => panic!("expected a ready reduction"),
        }
    }
}
