use std::future::Future;
use std::sync::LazyLock;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use tracing::Span;
use tracing::error;
use tracing::info;

static TASK_TRACKER: LazyLock<TaskTracker> = LazyLock::new(TaskTracker::new);

/// Spawns a task that `shutdown` waits for. Errors are logged, never propagated.
pub fn spawn<F>(task: F) -> JoinHandle<()>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    let span = Span::current();

    let task_wrapper = async move {
        if let Err(err) = task.await {
            error!("task failed, error={err:?}");
        }
    };

    TASK_TRACKER.spawn(task_wrapper.instrument(span))
}

pub async fn shutdown() {
    info!("waiting for {} task(s) to finish", TASK_TRACKER.len());
    TASK_TRACKER.close();
    TASK_TRACKER.wait().await;
    info!("tasks finished");
}
