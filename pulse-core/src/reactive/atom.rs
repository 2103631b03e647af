use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

use super::subscription::{ListenerSet, Subscription};
use super::{Readable, Source};

struct AtomInner<T> {
    name: &'static str,
    tx: watch::Sender<T>,
    version: AtomicU64,
    listeners: Arc<ListenerSet<T>>,
}

/// An independently observable cell of state.
///
/// Every write replaces the whole value under the cell's lock, so readers see
/// either the old value or the new one. Cloning an `Atom` yields another
/// handle to the same cell.
pub struct Atom<T> {
    inner: Arc<AtomInner<T>>,
}

impl<T> Clone for Atom<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(value: T) -> Self {
        Self::named("atom", value)
    }

    pub fn named(name: &'static str, value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self {
            inner: Arc::new(AtomInner {
                name,
                tx,
                version: AtomicU64::new(0),
                listeners: Arc::new(ListenerSet::new()),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn get(&self) -> T {
        self.inner.tx.borrow().clone()
    }

    /// Reads the current value without cloning it.
    ///
    /// `f` runs under the read lock and must not write to this atom.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.tx.borrow())
    }

    pub fn set(&self, value: T) {
        self.inner.tx.send_replace(value);
        self.commit();
    }

    /// Replaces the value with `f(current)` as one atomic step.
    ///
    /// `f` runs under the write lock and must not touch this atom.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.inner.tx.send_modify(|value| {
            *value = f(value);
        });
        self.commit();
    }

    /// Like [`Atom::update`], but `None` leaves the value and version untouched
    /// and notifies nobody. Returns whether a new value was committed.
    pub fn update_if(&self, f: impl FnOnce(&T) -> Option<T>) -> bool {
        let changed = self.inner.tx.send_if_modified(|value| match f(value) {
            Some(next) => {
                *value = next;
                true
            }
            None => false,
        });
        if changed {
            self.commit();
        }
        changed
    }

    // The version moves only after the new value is visible, so a reader that
    // records the version before reading can never cache a stale value.
    fn commit(&self) {
        let version = self.inner.version.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(atom = self.inner.name, version, "atom committed");

        let listeners = self.inner.listeners.snapshot();
        if listeners.is_empty() {
            return;
        }
        let value = self.get();
        for listener in listeners {
            listener(&value);
        }
    }

    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Async receiver that wakes on every commit.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.inner.tx.subscribe()
    }

    /// Registers a listener that runs synchronously after each commit.
    pub fn observe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        self.inner.listeners.insert(Arc::new(listener))
    }

    pub fn observer_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<T> Default for Atom<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for Atom<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atom")
            .field("name", &self.inner.name)
            .field("value", &*self.inner.tx.borrow())
            .field("version", &self.inner.version.load(Ordering::SeqCst))
            .finish()
    }
}

impl<T> Source for Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn version(&self) -> u64 {
        Atom::version(self)
    }

    fn on_change(&self, f: Arc<dyn Fn() + Send + Sync>) -> Subscription {
        self.observe(move |_| f())
    }
}

impl<T> Readable<T> for Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn get(&self) -> T {
        Atom::get(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[test]
    fn test_read_after_write() {
        let atom = Atom::new(1);
        atom.set(2);
        assert_eq!(atom.get(), 2);
        atom.update(|v| v * 10);
        assert_eq!(atom.get(), 20);
    }

    #[test]
    fn test_version_moves_on_each_commit() {
        let atom = Atom::new(String::new());
        assert_eq!(atom.version(), 0);
        atom.set("a".to_string());
        atom.update(|v| format!("{v}b"));
        assert_eq!(atom.version(), 2);
        assert_eq!(atom.get(), "ab");
    }

    #[test]
    fn test_update_if_none_is_a_no_op() {
        let atom = Atom::new(5);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _sub = atom.observe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!atom.update_if(|_| None));
        assert_eq!(atom.version(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(atom.update_if(|v| Some(v + 1)));
        assert_eq!(atom.get(), 6);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observer_sees_committed_value() {
        let atom = Atom::new(vec![1]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reader = atom.clone();
        let _sub = atom.observe(move |value: &Vec<i32>| {
            // The cell already holds the value handed to the listener.
            assert_eq!(&reader.get(), value);
            sink.lock().unwrap().push(value.len());
        });

        atom.update(|v| {
            let mut next = v.clone();
            next.push(2);
            next
        });
        atom.set(vec![]);

        assert_eq!(*seen.lock().unwrap(), vec![2, 0]);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let atom = Atom::new(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = atom.observe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(atom.observer_count(), 1);

        atom.set(1);
        drop(sub);
        atom.set(2);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(atom.observer_count(), 0);
    }

    #[test]
    fn test_detached_subscription_stays_registered() {
        let atom = Atom::new(0);
        atom.observe(|_| {}).detach();
        assert_eq!(atom.observer_count(), 1);
    }

    #[tokio::test]
    async fn test_watch_receiver_wakes_on_commit() {
        let atom = Atom::new(0u32);
        let mut rx = atom.watch();

        let writer = atom.clone();
        tokio::spawn(async move {
            writer.set(7);
        });

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 7);
    }
}
