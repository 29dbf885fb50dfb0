//! Integration tests for the idempotent import executor
//!
//! These tests verify that:
//! - An operation runs at most once per key, even under concurrency
//! - Recoverable failures are recorded on the job and not retried
//! - Unrecoverable failures propagate and are retried on the next call

use porta::adapters::jobstore::{InMemoryJobStore, JobStore};
use porta::core::executor::{
    IdempotentImportExecutor, ImportOperation, InMemoryIdempotentImportExecutor,
};
use porta::domain::{DataVertical, JobId, PortaError, PortabilityJob, ProviderError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn executor() -> (Arc<InMemoryJobStore>, Arc<InMemoryIdempotentImportExecutor>) {
    let store = Arc::new(InMemoryJobStore::new());
    let job_id = JobId::new();
    store
        .create_job(job_id, PortabilityJob::new(DataVertical::Photos, "source", "archive"))
        .await
        .unwrap();
    let executor = Arc::new(InMemoryIdempotentImportExecutor::new(job_id, store.clone()));
    (store, executor)
}

fn counted(calls: &Arc<AtomicUsize>, result: Result<&'static str, fn() -> PortaError>) -> ImportOperation<'static> {
    let calls = calls.clone();
    Box::pin(async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        result.map(str::to_string).map_err(|make| make())
    })
}

fn io_error() -> PortaError {
    PortaError::Io("connection reset".to_string())
}

fn denied() -> PortaError {
    ProviderError::PermissionDenied("Access Denied".to_string()).into()
}

#[tokio::test]
async fn test_concurrent_calls_execute_once() {
    let (_store, executor) = executor().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let executor = executor.clone();
            let op = counted(&calls, Ok("dest-1"));
            tokio::spawn(async move {
                executor
                    .execute_and_swallow_io_errors("item-1", "Item 1", op)
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), Some("dest-1".to_string()));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(executor.is_key_cached("item-1").await);
    assert_eq!(executor.get_cached_value("item-1").await.unwrap(), "dest-1");
}

#[tokio::test]
async fn test_recoverable_failure_is_swallowed_recorded_and_cached() {
    let (store, executor) = executor().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let first = executor
        .execute_and_swallow_io_errors("item-1", "Item 1", counted(&calls, Err(io_error)))
        .await
        .unwrap();
    let second = executor
        .execute_and_swallow_io_errors("item-1", "Item 1", counted(&calls, Ok("late")))
        .await
        .unwrap();

    assert_eq!(first, None);
    assert_eq!(second, None);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!executor.is_key_cached("item-1").await);

    let job = store.find_job(executor.job_id()).await.unwrap();
    assert_eq!(job.errors.len(), 1);
    assert_eq!(job.errors[0].id, "item-1");
    assert_eq!(job.errors[0].title, "Item 1");
    assert!(job.errors[0].can_skip);
    assert_eq!(executor.errors().await.len(), 1);
}

#[tokio::test]
async fn test_throw_mode_reports_cached_failure() {
    let (_store, executor) = executor().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let first = executor
        .execute_or_throw("album-1", "Holiday", counted(&calls, Err(io_error)))
        .await;
    assert!(matches!(first, Err(PortaError::Io(_))));

    let second = executor
        .execute_or_throw("album-1", "Holiday", counted(&calls, Ok("dest")))
        .await;
    match second {
        Err(PortaError::Transfer(message)) => assert!(message.contains("previously failed")),
        other => panic!("expected cached failure, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unrecoverable_failure_propagates_and_is_retried() {
    let (store, executor) = executor().await;
    let calls = Arc::new(AtomicUsize::new(0));

    let first = executor
        .execute_and_swallow_io_errors("item-1", "Item 1", counted(&calls, Err(denied)))
        .await;
    assert!(matches!(
        first,
        Err(PortaError::Provider(ProviderError::PermissionDenied(_)))
    ));

    let second = executor
        .execute_and_swallow_io_errors("item-1", "Item 1", counted(&calls, Ok("dest-1")))
        .await
        .unwrap();
    assert_eq!(second, Some("dest-1".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The failure was still reported
    let job = store.find_job(executor.job_id()).await.unwrap();
    assert_eq!(job.errors.len(), 1);
    assert!(!job.errors[0].can_skip);
}

#[tokio::test]
async fn test_missing_value_is_not_found() {
    let (_store, executor) = executor().await;
    assert_eq!(executor.lookup("nope").await, None);
    assert!(matches!(
        executor.get_cached_value("nope").await,
        Err(PortaError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_executors_do_not_share_state() {
    let (store, first) = executor().await;
    let second = InMemoryIdempotentImportExecutor::new(first.job_id(), store.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    first
        .execute_and_swallow_io_errors("item-1", "Item 1", counted(&calls, Ok("dest-1")))
        .await
        .unwrap();
    assert!(!second.is_key_cached("item-1").await);
}
