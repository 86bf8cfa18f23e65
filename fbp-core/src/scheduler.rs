//! Pluggable scheduling surface.
//!
//! The executor drives every component through this trait rather than
//! calling `compio`/`tokio` directly, so alternate runtimes (or, in tests, a
//! deterministic stub) can stand in without touching [`crate::executor`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;

/// A unit of scheduled work: a component's `run` loop, boxed so the
/// scheduler can hold a homogeneous collection of them.
pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send>>;

#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Start `task` running, returning immediately.
    fn spawn(&self, task: BoxedTask);

    /// Yield to other scheduled tasks at least once.
    async fn yield_now(&self);

    /// Suspend the calling task for `duration`, used to implement the
    /// `SuspSend`/`SuspRecv` lifecycle states under backpressure.
    async fn suspend_for(&self, duration: Duration);

    /// Block until every previously spawned task has finished.
    async fn wait_all(&self);
}

/// [`Scheduler`] backed by `compio`'s io_uring runtime, matching the
/// teacher's choice of executor for its own actor tasks.
#[derive(Default)]
pub struct CompioScheduler {
    handles: parking_lot::Mutex<Vec<compio::runtime::JoinHandle<()>>>,
}

impl CompioScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Scheduler for CompioScheduler {
    fn spawn(&self, task: BoxedTask) {
        let handle = compio::runtime::spawn(task);
        self.handles.lock().push(handle);
    }

    async fn yield_now(&self) {
        compio::runtime::spawn(async {}).await.ok();
    }

    async fn suspend_for(&self, duration: Duration) {
        compio::time::sleep(duration).await;
    }

    async fn wait_all(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());
        for handle in handles {
            let _ = handle.await;
        }
    }
}
