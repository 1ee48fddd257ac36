use std::{future::Future, sync::Arc};

use tokio::sync::Semaphore;

/// Caps how many tasks run a given section concurrently. Clones share the
/// same budget.
#[derive(Clone, Debug)]
pub struct Limit {
    semaphore: Arc<Semaphore>,
}

impl Limit {
    pub fn new(concurrency: usize) -> Limit {
        Limit {semaphore: Arc::new(Semaphore::new(concurrency.max(1)))}
    }

    pub async fn run<F: Future>(&self, f: F) -> F::Output {
        // The semaphore is never closed, so a permit is always granted
        let _permit
            = self.semaphore.acquire().await.ok();

        f.await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test]
    async fn test_limit_caps_concurrency() {
        let limit = Limit::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|_| {
            let running = running.clone();
            let peak = peak.clone();

            limit.run(async move {
                let current = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);

                tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            })
        });

        futures::future::join_all(tasks).await;

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }
}
