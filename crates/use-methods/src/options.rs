use crate::draft::combine_reducers;
use crate::reducer::ReducerFn;
use crate::use_reducer::UseReducer;
use std::sync::Arc;
use use_methods_config::MethodsConfig;

/// Transforms the methods reducer before it is mounted
pub type ReducerMapper<S> = Arc<dyn Fn(ReducerFn<S>) -> ReducerFn<S> + Send + Sync>;

/// Per-mount options. `None` falls back to the defaults of a
/// [`UseMethods`](crate::UseMethods), then to the built-in ones.
pub struct UseMethodsOptions<S> {
    pub reducer_mapper: Option<ReducerMapper<S>>,
    pub custom_use_reducer: Option<UseReducer<S>>,
    pub enable_loading: Option<bool>,
}

impl<S> UseMethodsOptions<S>
where
    S: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            reducer_mapper: None,
            custom_use_reducer: None,
            enable_loading: None,
        }
    }

    pub fn from_config(config: &MethodsConfig) -> Self {
        Self::new().enable_loading(config.enable_loading)
    }

    pub fn reducer_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(ReducerFn<S>) -> ReducerFn<S> + Send + Sync + 'static,
    {
        self.reducer_mapper = Some(Arc::new(mapper));
        self
    }

    pub fn custom_use_reducer(mut self, use_reducer: UseReducer<S>) -> Self {
        self.custom_use_reducer = Some(use_reducer);
        self
    }

    pub fn enable_loading(mut self, enable: bool) -> Self {
        self.enable_loading = Some(enable);
        self
    }

    /// Fill every unset option from `defaults`
    pub fn or(self, defaults: &UseMethodsOptions<S>) -> Self {
        Self {
            reducer_mapper: self
                .reducer_mapper
                .or_else(|| defaults.reducer_mapper.clone()),
            custom_use_reducer: self
                .custom_use_reducer
                .or_else(|| defaults.custom_use_reducer.clone()),
            enable_loading: self.enable_loading.or(defaults.enable_loading),
        }
    }

    pub(crate) fn map_reducer(&self, reducer: ReducerFn<S>) -> ReducerFn<S> {
        match &self.reducer_mapper {
            Some(mapper) => mapper(reducer),
            None => reducer,
        }
    }
}

impl<S> UseMethodsOptions<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Let methods write through copy-on-write drafts
    pub fn with_drafts(self) -> Self {
        self.reducer_mapper(combine_reducers::<S>)
    }
}

impl<S> Default for UseMethodsOptions<S>
where
    S: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for UseMethodsOptions<S> {
    fn clone(&self) -> Self {
        Self {
            reducer_mapper: self.reducer_mapper.clone(),
            custom_use_reducer: self.custom_use_reducer.clone(),
            enable_loading: self.enable_loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_options_override_defaults() {
        let defaults = UseMethodsOptions::<i32>::new().enable_loading(true);
        let merged = UseMethodsOptions::new().enable_loading(false).or(&defaults);
        assert_eq!(merged.enable_loading, Some(false));

        let merged = UseMethodsOptions::new().or(&defaults);
        assert_eq!(merged.enable_loading, Some(true));
        assert!(merged.reducer_mapper.is_none());
    }

    #[test]
    fn test_from_config() {
        let config = MethodsConfig {
            enable_loading: true,
            ..MethodsConfig::default()
        };
        let options = UseMethodsOptions::<i32>::from_config(&config);
        assert_eq!(options.enable_loading, Some(true));
    }
}
