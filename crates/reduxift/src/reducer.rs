//! Reducers
//!
//! A reducer is a pure, total function `(state, action) -> state`. It never
//! performs I/O and never fails; anything that could go wrong belongs in a
//! state field (an alert message, a last error).

use crate::action::Action;
use std::sync::Arc;

pub trait Reducer<S, K, V>: Send + Sync {
    fn reduce(&self, state: &S, action: &Action<K, V>) -> S;
}

impl<S, K, V, F> Reducer<S, K, V> for F
where
    F: Fn(&S, &Action<K, V>) -> S + Send + Sync,
{
    fn reduce(&self, state: &S, action: &Action<K, V>) -> S {
        self(state, action)
    }
}

/// Reduce one region of a composite state.
///
/// Runs `child` on the region and splices the result back. When the child
/// leaves the region unchanged the original `Arc` is returned, so untouched
/// regions stay shared between the old and the new state.
///
/// ```ignore
/// fn reduce(state: &AppState, action: &Action<Kind, Value>) -> AppState {
///     AppState {
///         breeds: reduce_region(&state.breeds, action, breeds_reducer),
///         alert: reduce_region(&state.alert, action, alert_reducer),
///     }
/// }
/// ```
pub fn reduce_region<T, K, V, F>(region: &Arc<T>, action: &Action<K, V>, child: F) -> Arc<T>
where
    T: PartialEq,
    F: Fn(&T, &Action<K, V>) -> T,
{
    let next = child(&**region, action);
    if next == **region {
        Arc::clone(region)
    } else {
        Arc::new(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Kind {
        Reload,
        Alert,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Value {
        Breeds(Vec<String>),
        Message(String),
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Dogs {
        breeds: Arc<Vec<String>>,
        alert: Arc<String>,
    }

    fn breeds(state: &Vec<String>, action: &Action<Kind, Value>) -> Vec<String> {
        match (action.kind(), action.value()) {
            (Kind::Reload, Some(Value::Breeds(breeds))) => breeds.clone(),
            _ => state.clone(),
        }
    }

    fn alert(state: &String, action: &Action<Kind, Value>) -> String {
        match (action.kind(), action.value()) {
            (Kind::Alert, Some(Value::Message(message))) => message.clone(),
            _ => state.clone(),
        }
    }

    fn dogs(state: &Dogs, action: &Action<Kind, Value>) -> Dogs {
        Dogs {
            breeds: reduce_region(&state.breeds, action, breeds),
            alert: reduce_region(&state.alert, action, alert),
        }
    }

    #[test]
    fn test_untouched_region_is_shared() {
        let before = Dogs {
            breeds: Arc::new(vec!["akita".to_string()]),
            alert: Arc::new(String::new()),
        };

        let after = dogs(
            &before,
            &Action::with_value(Kind::Alert, Value::Message("welcome!".to_string())),
        );

        assert!(Arc::ptr_eq(&before.breeds, &after.breeds));
        assert_eq!(after.breeds, before.breeds);
        assert_eq!(*after.alert, "welcome!");
    }

    #[test]
    fn test_touched_region_is_replaced() {
        let before = Dogs {
            breeds: Arc::new(Vec::new()),
            alert: Arc::new(String::new()),
        };

        let after = dogs(
            &before,
            &Action::with_value(
                Kind::Reload,
                Value::Breeds(vec!["a".to_string(), "b".to_string()]),
            ),
        );

        assert_eq!(*after.breeds, vec!["a".to_string(), "b".to_string()]);
        assert!(Arc::ptr_eq(&before.alert, &after.alert));
    }

    #[test]
    fn test_closure_reducer() {
        let double = |state: &i64, _action: &Action<Kind, Value>| state * 2;
        assert_eq!(double.reduce(&21, &Action::new(Kind::Alert)), 42);
    }
}
