//! WorkerPool - 블로킹 작업 오프로딩
//!
//! Runs blocking closures (file writes, blocking SDK calls) on tokio's
//! blocking threads, at most `capacity` at a time, so the interactive loop
//! keeps polling for input and interrupts.

use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

/// 기본 동시 작업 수
pub const DEFAULT_WORKERS: usize = 4;

/// Bounded pool for blocking work
///
/// A job that has started always runs to completion on its thread even if
/// the caller stops waiting for it.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 현재 사용 가능한 슬롯 수
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// 블로킹 작업 실행 후 결과 대기
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::Cancelled)?;

        debug!("Offloading blocking job ({} slots free)", self.available());
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| {
            if e.is_cancelled() {
                Error::Cancelled
            } else {
                Error::Internal(format!("Blocking job panicked: {}", e))
            }
        })
    }

    /// `Result` 를 돌려주는 작업 실행 (에러 평탄화)
    pub async fn try_run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.run(job).await?
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(DEFAULT_WORKERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_value() {
        let pool = WorkerPool::new(2);
        let value = pool.run(|| 21 * 2).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test]
    async fn test_try_run_flattens_errors() {
        let pool = WorkerPool::default();
        let result: Result<()> = pool
            .try_run(|| Err(Error::Validation("nope".into())))
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_capacity_bounds_concurrency() {
        let pool = WorkerPool::new(1);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pool = pool.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    active.fetch_sub(1, Ordering::SeqCst);
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_panicking_job_is_internal_error() {
        let pool = WorkerPool::new(1);
        let result = pool.run(|| -> u8 { panic!("boom") }).await;
        assert!(matches!(result, Err(Error::Internal(_))));
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_release_profile_unwinds() {
        // panic containment in spawned jobs needs unwinding in every profile
        let manifest = std::fs::read_to_string(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../Cargo.toml"
        ))
        .unwrap();
        let doc: toml::Table = manifest.parse().unwrap();
        let panic = doc
            .get("profile")
            .and_then(|p| p.get("release"))
            .and_then(|r| r.get("panic"))
            .and_then(|v| v.as_str());
        assert_ne!(panic, Some("abort"));
    }
}
