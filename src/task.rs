//! Spawned fetches whose results are applied by the owning event loop.
//!
//! A `Task<T>` runs its future on the tokio runtime and hands the output
//! back through a oneshot channel. The owner either polls it from a tick
//! handler or awaits it directly, so state mutation stays on the owner's
//! task and is never preempted by a completing fetch.
//!
//! # Example
//!
//! ```ignore
//! let client = client.clone();
//! let mut task = Task::spawn(async move { client.fetch_activities(42, &cred).await });
//!
//! // In event loop tick
//! if let TaskPoll::Ready(result) = task.poll() {
//!     apply(result);
//! }
//! ```

use std::future::Future;
use tokio::sync::oneshot;

/// Outcome of polling a task
#[derive(Debug)]
pub enum TaskPoll<T> {
  /// Still running
  Pending,
  /// Finished; the output has been taken
  Ready(T),
  /// The task panicked or was aborted without producing output
  Lost,
}

/// Handle to a spawned future.
///
/// Dropping the handle does not abort the future; it runs to completion and
/// its output is discarded.
#[derive(Debug)]
pub struct Task<T> {
  receiver: oneshot::Receiver<T>,
}

impl<T: Send + 'static> Task<T> {
  /// Spawn `future` on the current tokio runtime.
  pub fn spawn<Fut>(future: Fut) -> Self
  where
    Fut: Future<Output = T> + Send + 'static,
  {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
      let output = future.await;
      // Ignore send errors - the owner may have dropped the handle
      let _ = tx.send(output);
    });
    Self { receiver: rx }
  }

  /// Check for output without blocking.
  pub fn poll(&mut self) -> TaskPoll<T> {
    match self.receiver.try_recv() {
      Ok(output) => TaskPoll::Ready(output),
      Err(oneshot::error::TryRecvError::Empty) => TaskPoll::Pending,
      Err(oneshot::error::TryRecvError::Closed) => TaskPoll::Lost,
    }
  }

  /// Wait for the output. `None` if the task was lost.
  pub async fn wait(self) -> Option<T> {
    self.receiver.await.ok()
  }
}
