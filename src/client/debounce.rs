use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

struct Slot {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Slots<K> {
    next_generation: u64,
    pending: HashMap<K, Slot>,
}

/// Keyed trailing-edge debouncer.
///
/// Scheduling a key replaces whatever was still waiting under it. An action
/// that has started running is never aborted; only waiting ones are. Dropping
/// the debouncer cancels everything still waiting.
pub struct Debouncer<K> {
    delay: Duration,
    slots: Arc<Mutex<Slots<K>>>,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            slots: Arc::new(Mutex::new(Slots { next_generation: 0, pending: HashMap::new() })),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Runs `action` once `delay` has passed without another `schedule` for `key`.
    pub fn schedule<F>(&self, key: K, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slots = lock(&self.slots);
        let generation = slots.next_generation;
        slots.next_generation += 1;

        let delay = self.delay;
        let shared = Arc::clone(&self.slots);
        let task_key = key.clone();
        // The lock is held until the slot is inserted, so the task cannot
        // observe the map before its own entry exists.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slots = lock(&shared);
                match slots.pending.get(&task_key) {
                    Some(slot) if slot.generation == generation => {
                        slots.pending.remove(&task_key);
                    }
                    _ => return,
                }
            }
            action.await;
        });

        if let Some(previous) = slots.pending.insert(key, Slot { generation, handle }) {
            previous.handle.abort();
        }
    }

    /// Cancels the waiting action for `key`. Returns whether one was waiting.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.slots).pending.remove(key) {
            Some(slot) => {
                slot.handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, slot) in lock(&self.slots).pending.drain() {
            slot.handle.abort();
        }
    }

    pub fn pending(&self) -> usize {
        lock(&self.slots).pending.len()
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, slot) in slots.pending.drain() {
            slot.handle.abort();
        }
    }
}

fn lock<K>(slots: &Mutex<Slots<K>>) -> MutexGuard<'_, Slots<K>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Fired = Arc<Mutex<Vec<&'static str>>>;

    fn record(fired: &Fired, label: &'static str) -> impl Future<Output = ()> + Send + 'static {
        let fired = Arc::clone(fired);
        async move { fired.lock().unwrap().push(label) }
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_last_schedule_for_a_key_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let fired = Fired::default();

        for label in ["a", "ab", "abc"] {
            debouncer.schedule("q1", record(&fired, label));
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["abc"]);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_debounced_independently() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let fired = Fired::default();

        debouncer.schedule("q1", record(&fired, "q1"));
        debouncer.schedule("q2", record(&fired, "q2"));
        assert_eq!(debouncer.pending(), 2);

        tokio::time::sleep(Duration::from_millis(600)).await;
        let mut labels = fired.lock().unwrap().clone();
        labels.sort();
        assert_eq!(labels, vec!["q1", "q2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_discard_waiting_work() {
        let runs = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(100));

        for key in ["a", "b"] {
            let runs = Arc::clone(&runs);
            debouncer.schedule(key, async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(debouncer.cancel(&"a"));
        assert!(!debouncer.cancel(&"a"));
        drop(debouncer);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_every_key() {
        let runs = Arc::new(AtomicUsize::new(0));
        let debouncer = Debouncer::new(Duration::from_millis(100));
        for key in 0..3 {
            let runs = Arc::clone(&runs);
            debouncer.schedule(key, async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }

        debouncer.cancel_all();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending(), 0);
    }
}
