//! Single-resolution slot shared by several producers.
//!
//! Event listeners and the pairing-code call all race to report a result.
//! Only the first `resolve` reaches the receiver; every later call is a no-op,
//! so a request can never be answered twice.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::oneshot;

pub struct OutcomeResolver<T> {
    slot: Arc<Mutex<Option<oneshot::Sender<T>>>>,
}

impl<T> Clone for OutcomeResolver<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> OutcomeResolver<T> {
    pub fn new() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        let resolver = Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        };
        (resolver, rx)
    }

    /// Returns `true` if this call produced the outcome.
    pub fn resolve(&self, value: T) -> bool {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            // A dropped receiver still counts as resolved: the slot is spent
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    fn is_resolved(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn first_resolution_wins() {
        let (resolver, rx) = OutcomeResolver::new();
        let other = resolver.clone();

        assert!(!resolver.is_resolved());
        assert!(other.resolve("event"));
        assert!(!resolver.resolve("return value"));
        assert!(resolver.is_resolved());

        assert_eq!(rx.await.unwrap(), "event");
    }

    #[tokio::test]
    async fn concurrent_producers_resolve_exactly_once() {
        let (resolver, rx) = OutcomeResolver::new();
        let winners = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..32 {
            let resolver = resolver.clone();
            let winners = winners.clone();
            handles.push(tokio::spawn(async move {
                if resolver.resolve(i) {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        let value = rx.await.unwrap();
        assert!((0..32).contains(&value));
    }

    #[test]
    fn resolving_after_receiver_dropped_is_harmless() {
        let (resolver, rx) = OutcomeResolver::new();
        drop(rx);

        assert!(resolver.resolve(1));
        assert!(!resolver.resolve(2));
    }
}
