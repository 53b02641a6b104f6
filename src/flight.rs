use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
struct Slot {
    lock: Arc<Mutex<()>>,
    // holders plus waiters, only touched under the map shard lock
    users: usize,
}

/// Per-key async locks, handed out for the duration of one miss.
#[derive(Default)]
pub(crate) struct SingleFlight {
    slots: Arc<DashMap<String, Slot>>,
}

impl SingleFlight {
    pub(crate) async fn acquire(&self, key: &str) -> FlightGuard {
        // the map reference is released before awaiting the lock
        let lock = {
            let mut slot = self.slots.entry(key.to_string()).or_default();
            slot.users += 1;
            Arc::clone(&slot.lock)
        };

        // Armed before the await: a caller cancelled while waiting still
        // gives its slot back.
        let mut flight = FlightGuard {
            key: key.to_string(),
            slots: Arc::clone(&self.slots),
            guard: None,
        };
        flight.guard = Some(lock.lock_owned().await);
        flight
    }

    #[cfg(test)]
    fn in_flight(&self) -> usize {
        self.slots.len()
    }
}

pub(crate) struct FlightGuard {
    key: String,
    slots: Arc<DashMap<String, Slot>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.guard.take();
        if let Entry::Occupied(mut slot) = self.slots.entry(self.key.clone()) {
            slot.get_mut().users -= 1;
            if slot.get().users == 0 {
                slot.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_slot_released_after_last_holder() {
        let flight = SingleFlight::default();
        let guard = flight.acquire("cached:a").await;
        assert_eq!(flight.in_flight(), 1);
        drop(guard);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let flight = Arc::new(SingleFlight::default());
        let first = flight.acquire("cached:a").await;

        let waiter = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                let _guard = flight.acquire("cached:a").await;
            })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        // a different key is not blocked
        drop(flight.acquire("cached:b").await);

        drop(first);
        waiter.await.unwrap();
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_waiter_releases_slot() {
        let flight = Arc::new(SingleFlight::default());
        let first = flight.acquire("cached:a").await;

        let waiter = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                let _guard = flight.acquire("cached:a").await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        // the waiter is dropped while still queued on the lock
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());
        assert_eq!(flight.in_flight(), 1);

        drop(first);
        assert_eq!(flight.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_waiter_cancelled_after_holder_leaves() {
        let flight = Arc::new(SingleFlight::default());
        let first = flight.acquire("cached:a").await;

        let waiter = {
            let flight = Arc::clone(&flight);
            tokio::spawn(async move {
                let _guard = flight.acquire("cached:a").await;
            })
        };
        tokio::task::yield_now().await;

        drop(first);
        waiter.abort();
        let _ = waiter.await;
        assert_eq!(flight.in_flight(), 0);
    }
}
