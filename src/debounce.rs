use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// Holds back a rapidly changing value until it has been quiet for `delay`.
///
/// Every `set` re-arms the timer, so only the last value of a burst reaches
/// the settled side. The timer task lives as long as the debouncer.
pub struct Debouncer<T> {
    raw: watch::Sender<T>,
    settled: Arc<watch::Sender<T>>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Must be called inside a tokio runtime.
    pub fn new(initial: T, delay: Duration) -> Self {
        let (raw, raw_rx) = watch::channel(initial.clone());
        let (settled, _) = watch::channel(initial);
        let settled = Arc::new(settled);

        let task = tokio::spawn(run(raw_rx, Arc::clone(&settled), delay));

        Self {
            raw,
            settled,
            task,
        }
    }

    pub fn set(&self, value: T) {
        self.raw.send_replace(value);
    }

    /// Latest raw value, settled or not.
    pub fn pending(&self) -> T {
        self.raw.borrow().clone()
    }

    pub fn settled(&self) -> T {
        self.settled.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        *self.raw.borrow() == *self.settled.borrow()
    }

    /// Settle the pending value right away without waiting for the timer.
    pub fn flush(&self) {
        let value = self.pending();
        publish(&self.settled, value);
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.settled.subscribe()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn publish<T: PartialEq>(settled: &watch::Sender<T>, value: T) {
    settled.send_if_modified(|current| {
        if *current == value {
            false
        } else {
            *current = value;
            true
        }
    });
}

async fn run<T>(mut raw: watch::Receiver<T>, settled: Arc<watch::Sender<T>>, delay: Duration)
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    loop {
        if raw.changed().await.is_err() {
            return;
        }

        // Quiet period, restarted on every new value
        loop {
            tokio::select! {
                _ = sleep(delay) => {
                    let value = raw.borrow_and_update().clone();
                    log::debug!("Debounced value settled after {:?}", delay);
                    publish(&settled, value);
                    break;
                }
                changed = raw.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn value_settles_after_delay() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        debouncer.set("hello".to_string());

        sleep(Duration::from_millis(499)).await;
        assert_eq!(debouncer.settled(), "");
        assert!(!debouncer.is_settled());

        sleep(Duration::from_millis(2)).await;
        assert_eq!(debouncer.settled(), "hello");
        assert!(debouncer.is_settled());
    }

    #[tokio::test(start_paused = true)]
    async fn new_value_rearms_the_timer() {
        let debouncer = Debouncer::new(0u32, DELAY);
        debouncer.set(1);
        sleep(Duration::from_millis(300)).await;
        debouncer.set(2);
        sleep(Duration::from_millis(300)).await;

        // 600ms since the first value, only 300ms since the last one
        assert_eq!(debouncer.settled(), 0);

        sleep(Duration::from_millis(201)).await;
        assert_eq!(debouncer.settled(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_only_publishes_last_value() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        let mut rx = debouncer.subscribe();

        for word in ["h", "he", "hel", "hell", "hello"] {
            debouncer.set(word.to_string());
            sleep(Duration::from_millis(100)).await;
        }

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "hello");

        sleep(Duration::from_secs(5)).await;
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn flush_settles_immediately() {
        let debouncer = Debouncer::new(String::new(), DELAY);
        debouncer.set("now".to_string());
        debouncer.flush();
        assert_eq!(debouncer.settled(), "now");
        assert_eq!(debouncer.pending(), "now");
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_value_does_not_notify() {
        let debouncer = Debouncer::new(7u8, DELAY);
        let mut rx = debouncer.subscribe();
        debouncer.set(7);
        sleep(Duration::from_secs(1)).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 7);
    }
}
