use std::sync::Arc;
use tokio::sync::watch;

/// State that evolves only through actions.
pub trait Reducer: Clone + Send + Sync + 'static {
    type Action;

    fn reduce(&mut self, action: Self::Action);
}

/// A unidirectional state container. Clones share the same state.
pub struct Store<S: Reducer> {
    tx: Arc<watch::Sender<S>>,
}

impl<S: Reducer> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<S: Reducer + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: Reducer> Store<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn dispatch(&self, action: S::Action) {
        self.tx.send_modify(|state| state.reduce(action));
    }

    /// Snapshot of the whole state.
    pub fn state(&self) -> S {
        self.tx.borrow().clone()
    }

    pub fn select<T>(&self, selector: impl Fn(&S) -> T) -> T {
        selector(&self.tx.borrow())
    }

    /// Watch one slice of the state. The subscription only wakes when the
    /// selected value actually changes.
    pub fn subscribe<T, F>(&self, selector: F) -> Subscription<S, T, F>
    where
        T: Clone + PartialEq,
        F: Fn(&S) -> T,
    {
        let mut rx = self.tx.subscribe();
        let last = selector(&rx.borrow_and_update());
        Subscription { rx, selector, last }
    }
}

pub struct Subscription<S, T, F> {
    rx: watch::Receiver<S>,
    selector: F,
    last: T,
}

impl<S, T, F> Subscription<S, T, F>
where
    S: Reducer,
    T: Clone + PartialEq,
    F: Fn(&S) -> T,
{
    pub fn current(&self) -> &T {
        &self.last
    }

    /// Next distinct selected value, or `None` once every store handle is gone.
    pub async fn changed(&mut self) -> Option<T> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let next = (self.selector)(&self.rx.borrow_and_update());
            if next != self.last {
                self.last = next.clone();
                return Some(next);
            }
        }
    }
}
