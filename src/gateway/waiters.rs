/// One-shot completion handles for callers blocked on a queued request.
///
/// The driver finalizes a record and signals exactly the caller that
/// submitted it; a caller that times out removes its own entry, leaving the
/// record to complete (and later be reaped) without a listener.
use crate::errors::WardenError;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;

pub type RequestOutcome = Result<String, WardenError>;

pub struct WaiterRegistry {
    waiters: Mutex<HashMap<i64, oneshot::Sender<RequestOutcome>>>,
}

impl WaiterRegistry {
    pub fn new() -> Self {
        Self {
            waiters: Mutex::new(HashMap::new()),
        }
    }

    /// Register interest in a request id
    pub fn register(&self, request_id: i64) -> oneshot::Receiver<RequestOutcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().unwrap().insert(request_id, tx);
        rx
    }

    /// Wake the caller for a request id, if still waiting
    pub fn signal(&self, request_id: i64, outcome: RequestOutcome) {
        let sender = self.waiters.lock().unwrap().remove(&request_id);
        if let Some(sender) = sender {
            // The caller may have raced its timeout; a dropped receiver is fine
            let _ = sender.send(outcome);
        }
    }

    /// Drop a waiter whose caller gave up
    pub fn remove(&self, request_id: i64) {
        self.waiters.lock().unwrap().remove(&request_id);
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().unwrap().len()
    }
}

impl Default for WaiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_wakes_registered_waiter() {
        let registry = WaiterRegistry::new();
        let rx = registry.register(42);
        registry.signal(42, Ok("result".to_string()));
        assert_eq!(rx.await.unwrap().unwrap(), "result");
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_signal_without_waiter_is_noop() {
        let registry = WaiterRegistry::new();
        registry.signal(7, Ok("orphaned".to_string()));
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn test_removed_waiter_never_fires() {
        let registry = WaiterRegistry::new();
        let rx = registry.register(9);
        registry.remove(9);
        registry.signal(9, Ok("late".to_string()));
        assert!(rx.await.is_err());
    }
}
