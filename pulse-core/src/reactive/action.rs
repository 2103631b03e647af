use std::sync::Arc;

use tracing::debug;

use super::Atom;

type Reducer<T, I> = Arc<dyn Fn(&T, I) -> Option<T> + Send + Sync>;

/// Write-only cell: takes an input and commits a structural copy of the
/// target atom's value with the requested changes.
pub struct Action<T, I> {
    name: &'static str,
    target: Atom<T>,
    reducer: Reducer<T, I>,
}

impl<T, I> Clone for Action<T, I> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            target: self.target.clone(),
            reducer: Arc::clone(&self.reducer),
        }
    }
}

impl<T, I> Action<T, I>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(
        name: &'static str,
        target: &Atom<T>,
        reducer: impl Fn(&T, I) -> T + Send + Sync + 'static,
    ) -> Self {
        Self::filter_map(name, target, move |state, input| Some(reducer(state, input)))
    }

    /// Reducer returning `None` signals that the input changes nothing; the
    /// target keeps its value and version.
    pub fn filter_map(
        name: &'static str,
        target: &Atom<T>,
        reducer: impl Fn(&T, I) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            target: target.clone(),
            reducer: Arc::new(reducer),
        }
    }

    /// Applies the reducer. Returns whether the target changed.
    pub fn dispatch(&self, input: I) -> bool {
        self.dispatch_with(input, |_, _| ()).is_some()
    }

    /// Applies the reducer and, if it committed, returns `inspect(previous,
    /// next)` evaluated against exactly the pair that was swapped in.
    pub fn dispatch_with<R>(&self, input: I, inspect: impl FnOnce(&T, &T) -> R) -> Option<R> {
        let mut observed = None;
        let changed = self.target.update_if(|state| {
            let next = (self.reducer)(state, input)?;
            observed = Some(inspect(state, &next));
            Some(next)
        });
        debug!(
            action = self.name,
            atom = self.target.name(),
            changed,
            "action dispatched"
        );
        observed
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn target(&self) -> &Atom<T> {
        &self.target
    }
}

impl<T, I> std::fmt::Debug for Action<T, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Counter {
        value: i64,
        label: String,
    }

    #[test]
    fn test_dispatch_replaces_structurally() {
        let atom = Atom::new(Counter {
            value: 0,
            label: "clicks".to_string(),
        });
        let add = Action::new("add", &atom, |c: &Counter, n: i64| Counter {
            value: c.value + n,
            ..c.clone()
        });

        assert!(add.dispatch(3));
        assert!(add.dispatch(4));
        assert_eq!(
            atom.get(),
            Counter {
                value: 7,
                label: "clicks".to_string()
            }
        );
        assert_eq!(atom.version(), 2);
    }

    #[test]
    fn test_filter_map_skips_no_op_inputs() {
        let atom = Atom::new(vec!["a".to_string()]);
        let remove = Action::filter_map("remove", &atom, |items: &Vec<String>, id: String| {
            if !items.contains(&id) {
                return None;
            }
            Some(items.iter().filter(|i| **i != id).cloned().collect())
        });

        assert!(remove.dispatch("a".to_string()));
        assert!(!remove.dispatch("a".to_string()));
        assert!(atom.get().is_empty());
        assert_eq!(atom.version(), 1);
    }

    #[test]
    fn test_dispatch_with_sees_committed_pair() {
        let atom = Atom::new(10_i64);
        let add = Action::filter_map("add", &atom, |n: &i64, d: i64| (d != 0).then(|| n + d));

        assert_eq!(add.dispatch_with(5, |before, after| after - before), Some(5));
        assert_eq!(add.dispatch_with(0, |before, after| after - before), None);
        assert_eq!(atom.get(), 15);
    }
}
