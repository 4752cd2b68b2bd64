//! Callback manager: fans execution records out to registered observers.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chainclaw_core::ExecutionRecord;
use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, warn};

use crate::ObserverError;

/// A sink for execution records.
#[async_trait]
pub trait ExecutionObserver: Send + Sync {
    /// Name used in logs when this observer fails.
    fn name(&self) -> &str {
        "observer"
    }

    async fn on_event(&self, record: &ExecutionRecord) -> Result<(), ObserverError>;
}

/// Handle returned by [`CallbackManager::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Holds the registered observers and notifies all of them on every event.
///
/// Registration and removal are safe from any task, including from inside an
/// observer's own callback: notification works on a snapshot of the list.
pub struct CallbackManager {
    observers: RwLock<Vec<(ObserverId, Arc<dyn ExecutionObserver>)>>,
    next_id: AtomicU64,
}

impl CallbackManager {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register an observer. The manager keeps a shared handle until
    /// [`unregister`](Self::unregister) is called.
    pub fn register(&self, observer: Arc<dyn ExecutionObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(observer = %observer.name(), id = %id, "Registered observer");
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(oid, _)| *oid != id);
        observers.len() < before
    }

    pub fn len(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `record` to every registered observer concurrently and wait
    /// for all of them. Failures and panics are logged and swallowed.
    ///
    /// Returns the number of observers that failed.
    pub async fn notify_all(&self, record: &ExecutionRecord) -> usize {
        let snapshot: Vec<Arc<dyn ExecutionObserver>> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();

        if snapshot.is_empty() {
            return 0;
        }

        let deliveries = snapshot.iter().map(|observer| async move {
            let outcome = AssertUnwindSafe(observer.on_event(record))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some((observer.name().to_string(), err)),
                Err(payload) => Some((
                    observer.name().to_string(),
                    ObserverError::Panicked {
                        observer: observer.name().to_string(),
                        message: panic_message(payload.as_ref()),
                    },
                )),
            }
        });

        let mut failed = 0;
        for (observer, err) in join_all(deliveries).await.into_iter().flatten() {
            failed += 1;
            warn!(
                observer = %observer,
                execution_id = %record.id,
                tool = %record.tool_name,
                state = %record.state,
                error = %err,
                "Observer notification failed"
            );
        }
        failed
    }
}

impl Default for CallbackManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CallbackManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackManager")
            .field("observers", &self.len())
            .finish()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// An observer backed by a closure.
pub struct FnObserver<F> {
    name: String,
    f: F,
}

impl<F> FnObserver<F>
where
    F: Fn(&ExecutionRecord) -> Result<(), ObserverError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F> ExecutionObserver for FnObserver<F>
where
    F: Fn(&ExecutionRecord) -> Result<(), ObserverError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_event(&self, record: &ExecutionRecord) -> Result<(), ObserverError> {
        (self.f)(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn record() -> ExecutionRecord {
        ExecutionRecord::started("exec-1", "get_balance", serde_json::json!({}))
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    #[async_trait]
    impl ExecutionObserver for Collect {
        fn name(&self) -> &str {
            "collect"
        }
        async fn on_event(&self, record: &ExecutionRecord) -> Result<(), ObserverError> {
            self.0.lock().unwrap().push(record.id.clone());
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl ExecutionObserver for Failing {
        async fn on_event(&self, _record: &ExecutionRecord) -> Result<(), ObserverError> {
            Err(ObserverError::failed("sink offline"))
        }
    }

    struct Panicking;

    #[async_trait]
    impl ExecutionObserver for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }
        async fn on_event(&self, _record: &ExecutionRecord) -> Result<(), ObserverError> {
            panic!("observer bug");
        }
    }

    #[tokio::test]
    async fn notifies_every_observer() {
        let manager = CallbackManager::new();
        let a = Arc::new(Collect::default());
        let b = Arc::new(Collect::default());
        manager.register(a.clone());
        manager.register(b.clone());

        assert_eq!(manager.notify_all(&record()).await, 0);
        assert_eq!(a.0.lock().unwrap().as_slice(), ["exec-1"]);
        assert_eq!(b.0.lock().unwrap().as_slice(), ["exec-1"]);
    }

    #[tokio::test]
    async fn failing_observer_does_not_block_others() {
        let manager = CallbackManager::new();
        let good = Arc::new(Collect::default());
        manager.register(Arc::new(Failing));
        manager.register(Arc::new(Panicking));
        manager.register(good.clone());

        let failed = manager.notify_all(&record()).await;
        assert_eq!(failed, 2);
        assert_eq!(good.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unregister_is_noop_when_absent() {
        let manager = CallbackManager::new();
        let id = manager.register(Arc::new(Collect::default()));
        assert!(manager.unregister(id));
        assert!(!manager.unregister(id));
        assert!(manager.is_empty());
        assert_eq!(manager.notify_all(&record()).await, 0);
    }

    #[tokio::test]
    async fn observer_may_unregister_itself_during_notification() {
        let manager = Arc::new(CallbackManager::new());
        let slot: Arc<Mutex<Option<ObserverId>>> = Arc::new(Mutex::new(None));

        let m = Arc::clone(&manager);
        let s = Arc::clone(&slot);
        let id = manager.register(Arc::new(FnObserver::new("once", move |_| {
            if let Some(id) = *s.lock().unwrap() {
                m.unregister(id);
            }
            Ok(())
        })));
        *slot.lock().unwrap() = Some(id);
        let other = Arc::new(Collect::default());
        manager.register(other.clone());

        manager.notify_all(&record()).await;
        assert_eq!(manager.len(), 1);
        assert_eq!(other.0.lock().unwrap().len(), 1);

        manager.notify_all(&record()).await;
        assert_eq!(other.0.lock().unwrap().len(), 2);
    }

    #[test]
    fn ids_are_unique() {
        let manager = CallbackManager::new();
        let a = manager.register(Arc::new(Collect::default()));
        let b = manager.register(Arc::new(Collect::default()));
        assert_ne!(a, b);
        assert!(a.to_string().starts_with("observer-"));
    }
}
