//! Owner thread dispatch
//!
//! The floor state has exactly one owner: a dedicated OS thread that runs
//! queued jobs one at a time. Every other task (the change listener, the
//! ingestion worker, callers of the public API) reaches the state by posting
//! a closure to that thread.
//!
//! ```text
//! listener task ──┐
//! ingestion task ─┼── mpsc<Job> ──► owner thread ── job(&mut S)
//! api callers ────┘                     (sequential)
//! ```
//!
//! Because jobs never interleave, a job can check-then-mutate without any
//! lock. Observers registered on the state's collections are invoked on the
//! owner thread too.

use std::panic::AssertUnwindSafe;
use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("owner thread has stopped")]
    OwnerStopped,

    #[error("job panicked on owner thread")]
    JobPanicked,
}

/// Handle to the owner thread, cheap to clone
pub struct OwnerDispatcher<S> {
    tx: mpsc::UnboundedSender<Job<S>>,
}

impl<S> Clone for OwnerDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> std::fmt::Debug for OwnerDispatcher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerDispatcher")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S: Send + 'static> OwnerDispatcher<S> {
    /// Move `state` onto a new owner thread
    ///
    /// The thread exits once every dispatcher clone has been dropped and the
    /// queue is drained.
    pub fn spawn(name: &str, mut state: S) -> std::io::Result<(Self, JoinHandle<()>)> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job<S>>();
        let thread_name = name.to_string();

        let handle = std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                tracing::debug!(thread = %thread_name, "Owner thread started");
                while let Some(job) = rx.blocking_recv() {
                    // A panicking job must not take the floor state down with it
                    if let Err(panic_info) =
                        std::panic::catch_unwind(AssertUnwindSafe(|| job(&mut state)))
                    {
                        let panic_msg = panic_info
                            .downcast_ref::<&str>()
                            .map(|s| (*s).to_string())
                            .or_else(|| panic_info.downcast_ref::<String>().cloned())
                            .unwrap_or_else(|| "Unknown panic".to_string());
                        tracing::error!(
                            thread = %thread_name,
                            panic = %panic_msg,
                            "Owner thread job panicked"
                        );
                    }
                }
                tracing::debug!(thread = %thread_name, "Owner thread stopped");
            })?;

        Ok((Self { tx }, handle))
    }

    /// Queue `action` on the owner thread without waiting for it
    pub fn post<F>(&self, action: F) -> Result<(), DispatchError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.tx
            .send(Box::new(action))
            .map_err(|_| DispatchError::OwnerStopped)
    }

    /// Run `action` on the owner thread and wait for its result
    ///
    /// Only the calling task waits; the owner thread keeps serving other
    /// jobs in order.
    pub async fn call<F, R>(&self, action: F) -> Result<R, DispatchError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(move |state| {
            // Receiver gone means the caller stopped waiting
            let _ = reply_tx.send(action(state));
        })?;
        // The reply sender is dropped without sending only if the job panicked
        reply_rx.await.map_err(|_| DispatchError::JobPanicked)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn jobs_run_in_submission_order() {
        let (owner, _handle) = OwnerDispatcher::spawn("test-owner", Vec::<u32>::new()).unwrap();

        for i in 0..50 {
            owner.post(move |v| v.push(i)).unwrap();
        }
        let seen = owner.call(|v| v.clone()).await.unwrap();

        assert_eq!(seen, (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn jobs_run_on_the_owner_thread() {
        let (owner, _handle) = OwnerDispatcher::spawn("floor-owner-test", ()).unwrap();

        let name = owner
            .call(|_| std::thread::current().name().map(str::to_string))
            .await
            .unwrap();

        assert_eq!(name.as_deref(), Some("floor-owner-test"));
    }

    #[tokio::test]
    async fn panicking_job_does_not_stop_owner() {
        let (owner, _handle) = OwnerDispatcher::spawn("test-owner", 0u32).unwrap();

        let result = owner.call(|_: &mut u32| -> u32 { panic!("boom") }).await;
        assert_eq!(result, Err(DispatchError::JobPanicked));

        owner.post(|n| *n += 1).unwrap();
        assert_eq!(owner.call(|n| *n).await, Ok(1));
    }

    #[tokio::test]
    async fn thread_exits_when_last_handle_dropped() {
        let (owner, handle) = OwnerDispatcher::spawn("test-owner", ()).unwrap();
        drop(owner);
        tokio::task::spawn_blocking(move || handle.join().unwrap())
            .await
            .unwrap();
    }
}
