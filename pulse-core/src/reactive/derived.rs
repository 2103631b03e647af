use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::subscription::{ListenerSet, Subscription};
use super::{Readable, Source};

struct DerivedInner<T> {
    sources: Vec<Arc<dyn Source>>,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    cache: Mutex<Option<(u64, T)>>,
    listeners: Arc<ListenerSet<T>>,
    upstream: Mutex<Vec<Subscription>>,
}

impl<T> DerivedInner<T>
where
    T: Clone + Send + Sync + 'static,
{
    // Source versions only grow, so their sum changes whenever any of them does.
    fn source_version(&self) -> u64 {
        self.sources
            .iter()
            .fold(0u64, |acc, s| acc.wrapping_add(s.version()))
    }

    fn get(&self) -> T {
        let version = self.source_version();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_version, value)) = cache.as_ref() {
            if *cached_version == version {
                return value.clone();
            }
        }
        let value = (self.compute)();
        *cache = Some((version, value.clone()));
        value
    }

    fn notify(&self) {
        let listeners = self.listeners.snapshot();
        if listeners.is_empty() {
            return;
        }
        let value = self.get();
        for listener in listeners {
            listener(&value);
        }
    }
}

/// A value computed purely from one or more cells.
///
/// Recomputation is lazy: the cached value is reused until any source commits
/// again. Observers are notified after every source commit.
pub struct Derived<T> {
    inner: Arc<DerivedInner<T>>,
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Builds a derived cell over arbitrary sources. `compute` must read only
    /// from `sources`.
    pub fn from_sources(
        sources: Vec<Arc<dyn Source>>,
        compute: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        let inner = Arc::new(DerivedInner {
            sources,
            compute: Box::new(compute),
            cache: Mutex::new(None),
            listeners: Arc::new(ListenerSet::new()),
            upstream: Mutex::new(Vec::new()),
        });

        let weak: Weak<DerivedInner<T>> = Arc::downgrade(&inner);
        let subscriptions = inner
            .sources
            .iter()
            .map(|source| {
                let weak = weak.clone();
                source.on_change(Arc::new(move || {
                    if let Some(inner) = weak.upgrade() {
                        inner.notify();
                    }
                }))
            })
            .collect::<Vec<_>>();
        *inner
            .upstream
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = subscriptions;

        Self { inner }
    }

    pub fn map<S, R>(source: &R, f: impl Fn(&S) -> T + Send + Sync + 'static) -> Self
    where
        S: Clone + Send + Sync + 'static,
        R: Readable<S> + Clone + 'static,
    {
        let reader = source.clone();
        Self::from_sources(vec![Arc::new(source.clone())], move || f(&reader.get()))
    }

    pub fn combine<A, B, RA, RB>(
        a: &RA,
        b: &RB,
        f: impl Fn(&A, &B) -> T + Send + Sync + 'static,
    ) -> Self
    where
        A: Clone + Send + Sync + 'static,
        B: Clone + Send + Sync + 'static,
        RA: Readable<A> + Clone + 'static,
        RB: Readable<B> + Clone + 'static,
    {
        let (ra, rb) = (a.clone(), b.clone());
        Self::from_sources(
            vec![Arc::new(a.clone()), Arc::new(b.clone())],
            move || f(&ra.get(), &rb.get()),
        )
    }

    pub fn get(&self) -> T {
        self.inner.get()
    }

    pub fn version(&self) -> u64 {
        self.inner.source_version()
    }

    pub fn observe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.insert(Arc::new(listener))
    }
}

impl<T> std::fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("sources", &self.inner.sources.len())
            .finish()
    }
}

impl<T> Source for Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn version(&self) -> u64 {
        Derived::version(self)
    }

    fn on_change(&self, f: Arc<dyn Fn() + Send + Sync>) -> Subscription {
        self.observe(move |_| f())
    }
}

impl<T> Readable<T> for Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Derived::get(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Atom;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_map_recomputes_on_change() {
        let count = Atom::new(2);
        let doubled = Derived::map(&count, |v: &i32| v * 2);
        assert_eq!(doubled.get(), 4);

        count.set(5);
        assert_eq!(doubled.get(), 10);
    }

    #[test]
    fn test_cached_until_source_changes() {
        let source = Atom::new(1);
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let derived = Derived::map(&source, move |v: &i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            *v + 1
        });

        assert_eq!(derived.get(), 2);
        assert_eq!(derived.get(), 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        source.set(10);
        assert_eq!(derived.get(), 11);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_combine_two_sources() {
        let first = Atom::new("Ada".to_string());
        let last = Atom::new("Lovelace".to_string());
        let full = Derived::combine(&first, &last, |f: &String, l: &String| {
            format!("{f} {l}")
        });

        assert_eq!(full.get(), "Ada Lovelace");
        last.set("Byron".to_string());
        assert_eq!(full.get(), "Ada Byron");
    }

    #[test]
    fn test_derived_of_derived() {
        let base = Atom::new(3);
        let squared = Derived::map(&base, |v: &i32| v * v);
        let label = Derived::map(&squared, |v: &i32| format!("={v}"));

        assert_eq!(label.get(), "=9");
        base.set(4);
        assert_eq!(label.get(), "=16");
    }

    #[test]
    fn test_observers_notified_with_fresh_value() {
        let base = Atom::new(1);
        let plus_one = Derived::map(&base, |v: &i32| v + 1);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = plus_one.observe(move |v| sink.lock().unwrap().push(*v));

        base.set(2);
        base.set(3);

        assert_eq!(*seen.lock().unwrap(), vec![3, 4]);
    }

    #[test]
    fn test_dropping_derived_releases_source_listener() {
        let base = Atom::new(0);
        let derived = Derived::map(&base, |v: &i32| *v);
        assert_eq!(base.observer_count(), 1);

        drop(derived);
        assert_eq!(base.observer_count(), 0);
    }
}
