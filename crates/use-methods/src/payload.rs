//! Positional call arguments carried by every action.

use crate::error::MethodsError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ordered arguments of a method or action call.
///
/// Arguments are stored as JSON values so that one action vocabulary can
/// carry arguments of any serializable type. Use [`Payload::arg`] to read
/// them back with their concrete type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Vec<Value>);

impl Payload {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Deserialize the argument at `index`
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, MethodsError> {
        let value = self
            .0
            .get(index)
            .ok_or(MethodsError::MissingArgument { index })?;
        T::deserialize(value).map_err(|source| MethodsError::InvalidArgument { index, source })
    }

    /// Deserialize the argument at `index`, treating a missing argument as `None`
    pub fn arg_opt<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, MethodsError> {
        match self.0.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(|source| MethodsError::InvalidArgument { index, source }),
        }
    }
}

impl From<Vec<Value>> for Payload {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for Payload {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Convert one call argument; a value that cannot be represented as JSON
/// is logged and passed as `null`.
pub fn to_arg<T: Serialize + ?Sized>(value: &T) -> Value {
    match serde_json::to_value(value) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Argument cannot be serialized, passing null: {}", e);
            Value::Null
        }
    }
}

/// Build a [`Payload`] from serializable expressions.
///
/// ```rust
/// use use_methods::payload;
///
/// let payload = payload![10, "label"];
/// assert_eq!(payload.arg::<i64>(0).unwrap(), 10);
/// ```
#[macro_export]
macro_rules! payload {
    () => {
        $crate::Payload::new()
    };
    ($($arg:expr),+ $(,)?) => {
        $crate::Payload::from(vec![
            $($crate::payload::to_arg(&$arg)),+
        ])
    };
}
