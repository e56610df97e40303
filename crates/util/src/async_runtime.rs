//! Async runtime helpers for blocking callers.
//!
//! The binding layer is synchronous while the HTTP stack is async. This module
//! drives a future to completion from plain synchronous code, reusing the
//! current Tokio runtime when it is safe to block on it.

use std::future::Future;
use std::thread;

use thiserror::Error;
use tokio::runtime::{Builder, Handle, RuntimeFlavor};
use tokio::task;

/// Failure to provide a runtime for a blocking call.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to build a Tokio runtime: {0}")]
    Build(#[from] std::io::Error),
    #[error("the worker thread driving the future panicked")]
    WorkerPanicked,
}

/// Execute a future to completion from synchronous code.
///
/// - Inside a multi-threaded runtime the current worker is handed over with
///   `block_in_place` and the future runs on the existing handle.
/// - Inside a current-thread runtime blocking is not allowed, so the future
///   runs on a helper thread with its own runtime.
/// - Outside any runtime a private current-thread runtime is built.
pub fn block_on<F, T>(future: F) -> Result<T, RuntimeError>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => Ok(task::block_in_place(|| handle.block_on(future))),
        Ok(_) => thread::spawn(move || run_on_private_runtime(future))
            .join()
            .map_err(|_| RuntimeError::WorkerPanicked)?,
        Err(_) => run_on_private_runtime(future),
    }
}

fn run_on_private_runtime<F, T>(future: F) -> Result<T, RuntimeError>
where
    F: Future<Output = T>,
{
    let runtime = Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_without_an_ambient_runtime() {
        let value = block_on(async { 21 * 2 }).unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn runs_inside_a_current_thread_runtime() {
        let value = block_on(async { "nested" }).unwrap();
        assert_eq!(value, "nested");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn runs_inside_a_multi_thread_runtime() {
        let value = block_on(async { 7 }).unwrap();
        assert_eq!(value, 7);
    }
}
