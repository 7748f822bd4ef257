//! # Owner-Thread Executor
//!
//! A router's state is owned by exactly one task. Nothing else touches it:
//! every entry point is posted to the owner as a job and runs there in
//! posting order.
//!
//! ```text
//!  any thread ──post(job)──▶ [ mpsc queue ] ──▶ owner task: job(&mut state)
//!  any thread ──call(job)──▶ [ mpsc queue ] ──▶ owner task ──oneshot──▶ result
//! ```

use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Errors from posting to an owner thread.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutorError {
    /// The owner has shut down; the job was not run.
    #[error("Owner thread {0} has stopped")]
    Stopped(String),

    /// A job panicked and took the owner down.
    #[error("Owner thread {owner} panicked: {reason}")]
    Panicked { owner: String, reason: String },
}

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

enum Command<S> {
    Run(Job<S>),
    Shutdown,
}

/// Cloneable handle used to post work to an [`OwnerThread`].
pub struct OwnerHandle<S> {
    name: Arc<str>,
    sender: mpsc::UnboundedSender<Command<S>>,
}

impl<S> Clone for OwnerHandle<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            sender: self.sender.clone(),
        }
    }
}

impl<S> fmt::Debug for OwnerHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerHandle")
            .field("name", &self.name)
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl<S: Send + 'static> OwnerHandle<S> {
    /// Run `job` on the owner without waiting for it.
    pub fn post<F>(&self, job: F) -> Result<(), ExecutorError>
    where
        F: FnOnce(&mut S) + Send + 'static,
    {
        self.sender
            .send(Command::Run(Box::new(job)))
            .map_err(|_| ExecutorError::Stopped(self.name.to_string()))
    }

    /// Run `job` on the owner and wait for its result.
    pub async fn call<F, R>(&self, job: F) -> Result<R, ExecutorError>
    where
        F: FnOnce(&mut S) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.post(move |state| {
            // The caller may have stopped waiting.
            let _ = tx.send(job(state));
        })?;
        rx.await
            .map_err(|_| ExecutorError::Stopped(self.name.to_string()))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// A task that exclusively owns a state value.
pub struct OwnerThread<S> {
    handle: OwnerHandle<S>,
    task: JoinHandle<S>,
}

impl<S: Send + 'static> OwnerThread<S> {
    /// Move `state` onto a new owner task. Must be called inside a tokio
    /// runtime.
    pub fn spawn(name: impl Into<String>, state: S) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (sender, mut receiver) = mpsc::unbounded_channel::<Command<S>>();
        let owner = name.clone();

        let task = tokio::spawn(async move {
            let mut state = state;
            let mut executed: u64 = 0;
            debug!(owner = %owner, "Owner thread started");
            while let Some(command) = receiver.recv().await {
                match command {
                    Command::Run(job) => {
                        job(&mut state);
                        executed += 1;
                    }
                    Command::Shutdown => break,
                }
            }
            debug!(owner = %owner, executed, "Owner thread stopped");
            state
        });

        Self {
            handle: OwnerHandle { name, sender },
            task,
        }
    }

    #[must_use]
    pub fn handle(&self) -> OwnerHandle<S> {
        self.handle.clone()
    }

    /// Stop after the jobs already queued and hand the state back.
    pub async fn shutdown(self) -> Result<S, ExecutorError> {
        let owner = self.handle.name.to_string();
        // Fails only when the task is already gone; the join reports why.
        let _ = self.handle.sender.send(Command::Shutdown);
        self.task.await.map_err(|e| {
            error!(owner = %owner, error = %e, "Owner thread terminated abnormally");
            ExecutorError::Panicked {
                owner,
                reason: e.to_string(),
            }
        })
    }
}
