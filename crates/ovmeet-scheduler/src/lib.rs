// SPDX-FileCopyrightText: OpenTalk GmbH <mail@opentalk.eu>
//
// SPDX-License-Identifier: EUPL-1.2

//! Cron- and delay-based task registry with cluster-wide execution.
//!
//! Tasks are keyed by name; registering a task of the same name replaces
//! the previous registration, cancellation is by name and idempotent.
//! Cron firings are gated by a `scheduled_task_{name}` lock so at most one
//! replica executes each firing.

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use ovmeet_lock::{LockManager, LockName};
use parking_lot::Mutex;
use snafu::{ResultExt as _, Snafu};
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use uuid::Uuid;

pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum SchedulerError {
    #[snafu(display("Cron scheduler error: {source}"))]
    Cron { source: JobSchedulerError },

    #[snafu(display("Invalid cron schedule {schedule}: {source}"))]
    InvalidSchedule {
        schedule: String,
        source: JobSchedulerError,
    },
}

/// A task callback producing a boxed future.
pub type TaskFn =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static>;

/// Build a [`TaskFn`] from an async closure.
pub fn task_fn<F, Fut>(f: F) -> TaskFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move || Box::pin(f()))
}

enum TaskHandle {
    Cron(Uuid),
    Spawned(tokio::task::JoinHandle<()>),
}

struct TaskEntry {
    generation: u64,
    handle: TaskHandle,
}

struct Inner {
    cron: JobScheduler,
    locks: Arc<dyn LockManager>,
    tasks: Mutex<HashMap<String, TaskEntry>>,
    generation: AtomicU64,
}

/// Process-wide task registry.
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
}

impl TaskScheduler {
    pub async fn new(locks: Arc<dyn LockManager>) -> Result<Self> {
        let cron = JobScheduler::new().await.context(CronSnafu)?;
        cron.start().await.context(CronSnafu)?;

        Ok(Self {
            inner: Arc::new(Inner {
                cron,
                locks,
                tasks: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(1),
            }),
        })
    }

    /// Register a cluster-wide cron task.
    ///
    /// `schedule` uses the six-field cron syntax (`sec min hour dom mon
    /// dow`). Each firing first races for `scheduled_task_{name}` with
    /// `lock_ttl`; the losing replicas skip the firing. The lock is left
    /// to expire, so `lock_ttl` must stay below the schedule period.
    pub async fn register_cron(
        &self,
        name: &str,
        schedule: &str,
        lock_ttl: Duration,
        task: TaskFn,
    ) -> Result<()> {
        let locks = self.inner.locks.clone();
        let task_name = name.to_owned();

        let job = Job::new_async(schedule, move |_uuid, _scheduler| {
            let locks = locks.clone();
            let task = task.clone();
            let task_name = task_name.clone();

            Box::pin(async move {
                match locks
                    .acquire(&LockName::ScheduledTask(task_name.clone()), lock_ttl)
                    .await
                {
                    Ok(Some(_lock)) => {
                        log::debug!("Executing scheduled task {task_name}");
                        task().await;
                    }
                    Ok(None) => {
                        log::debug!("Scheduled task {task_name} runs on another replica, skipping");
                    }
                    Err(e) => {
                        log::warn!("Skipping scheduled task {task_name}, lock store unreachable: {e}");
                    }
                }
            })
        })
        .context(InvalidScheduleSnafu { schedule })?;

        let job_id = self.inner.cron.add(job).await.context(CronSnafu)?;

        self.replace(name, TaskHandle::Cron(job_id)).await;

        Ok(())
    }

    /// Register a task firing once after `delay`. Cancellable by name.
    pub async fn register_timeout(&self, name: &str, delay: Duration, task: TaskFn) {
        let generation = self.next_generation();
        let inner = self.inner.clone();
        let task_name = name.to_owned();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task().await;

            // Drop the registry entry of this firing only; a newer
            // registration under the same name stays untouched.
            let mut tasks = inner.tasks.lock();
            if tasks
                .get(&task_name)
                .is_some_and(|entry| entry.generation == generation)
            {
                let _ = tasks.remove(&task_name);
            }
        });

        self.replace_with_generation(name, TaskHandle::Spawned(handle), generation)
            .await;
    }

    /// Register a task firing every `period`, first firing one period from
    /// now.
    pub async fn register_interval(&self, name: &str, period: Duration, task: TaskFn) {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The immediate first tick
            let _ = interval.tick().await;

            loop {
                let _ = interval.tick().await;
                task().await;
            }
        });

        self.replace(name, TaskHandle::Spawned(handle)).await;
    }

    /// Cancel the task registered under `name`. Idempotent.
    pub async fn cancel(&self, name: &str) -> bool {
        let entry = self.inner.tasks.lock().remove(name);

        match entry {
            Some(TaskEntry {
                handle: TaskHandle::Cron(job_id),
                ..
            }) => {
                if let Err(e) = self.inner.cron.remove(&job_id).await {
                    log::warn!("Failed to remove cron task {name}: {e}");
                }
                true
            }
            Some(TaskEntry {
                handle: TaskHandle::Spawned(handle),
                ..
            }) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Whether a task is registered under `name`.
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner.tasks.lock().contains_key(name)
    }

    fn next_generation(&self) -> u64 {
        self.inner.generation.fetch_add(1, Ordering::Relaxed)
    }

    async fn replace(&self, name: &str, handle: TaskHandle) {
        let generation = self.next_generation();
        self.replace_with_generation(name, handle, generation).await;
    }

    async fn replace_with_generation(&self, name: &str, handle: TaskHandle, generation: u64) {
        let previous = self
            .inner
            .tasks
            .lock()
            .insert(name.to_owned(), TaskEntry { generation, handle });

        if let Some(previous) = previous {
            match previous.handle {
                TaskHandle::Cron(job_id) => {
                    if let Err(e) = self.inner.cron.remove(&job_id).await {
                        log::warn!("Failed to remove replaced cron task {name}: {e}");
                    }
                }
                TaskHandle::Spawned(handle) => handle.abort(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use ovmeet_lock::MemoryLockManager;
    use pretty_assertions::assert_eq;

    use super::*;

    async fn scheduler() -> TaskScheduler {
        TaskScheduler::new(Arc::new(MemoryLockManager::new("replica-1")))
            .await
            .unwrap()
    }

    fn counter_task(counter: &Arc<AtomicUsize>) -> TaskFn {
        let counter = counter.clone();
        task_fn(move || {
            let counter = counter.clone();
            async move {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
            }
        })
    }

    #[tokio::test]
    async fn timeout_fires_once_and_unregisters() {
        let scheduler = scheduler().await;
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .register_timeout("fire-once", Duration::from_millis(20), counter_task(&counter))
            .await;
        assert!(scheduler.is_registered("fire-once"));

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_registered("fire-once"));
    }

    #[tokio::test]
    async fn cancelled_timeout_never_fires() {
        let scheduler = scheduler().await;
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .register_timeout("cancelled", Duration::from_millis(100), counter_task(&counter))
            .await;

        assert!(scheduler.cancel("cancelled").await);
        assert!(!scheduler.cancel("cancelled").await);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn interval_fires_until_cancelled() {
        let scheduler = scheduler().await;
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler
            .register_interval("tick", Duration::from_millis(30), counter_task(&counter))
            .await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(scheduler.cancel("tick").await);

        let fired = counter.load(Ordering::SeqCst);
        assert!(fired >= 2, "interval fired {fired} times");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(counter.load(Ordering::SeqCst), fired);
    }

    #[tokio::test]
    async fn reregistering_replaces_the_previous_task() {
        let scheduler = scheduler().await;
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        scheduler
            .register_timeout("replace-me", Duration::from_millis(50), counter_task(&first))
            .await;
        scheduler
            .register_timeout("replace-me", Duration::from_millis(50), counter_task(&second))
            .await;

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cron_firings_are_mutually_exclusive_across_schedulers() {
        // Two schedulers sharing one lock store act like two replicas.
        let locks: Arc<dyn LockManager> = Arc::new(MemoryLockManager::new("cluster"));
        let first = TaskScheduler::new(locks.clone()).await.unwrap();
        let second = TaskScheduler::new(locks).await.unwrap();

        let counter = Arc::new(AtomicUsize::new(0));

        for scheduler in [&first, &second] {
            scheduler
                .register_cron(
                    "every-second",
                    "* * * * * *",
                    Duration::from_secs(10),
                    counter_task(&counter),
                )
                .await
                .unwrap();
        }

        // Wait for at least one firing window.
        tokio::time::sleep(Duration::from_millis(2500)).await;

        let _ = first.cancel("every-second").await;
        let _ = second.cancel("every-second").await;

        // The lock is held for 10s, so across both replicas at most one
        // firing can have executed.
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
