//! Scheduler harness: one timer loop per periodic task.
//!
//! Each task runs in its own tokio task with its own startup delay (staggered
//! so process start does not produce a thundering herd) and its own failure
//! isolation: an error in one cycle is logged and the loop proceeds to the
//! next tick. No state other than the persistent store crosses cycle
//! boundaries.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info};

use affinity_core::Result;

/// Cooperative shutdown signal shared by all task loops.
///
/// Loops observe it between ticks to stop waiting promptly, and tasks can
/// poll it mid-cycle to avoid starting work they should not finish.
#[derive(Clone)]
pub struct ShutdownToken {
    rx: watch::Receiver<bool>,
    _keepalive: Option<Arc<watch::Sender<bool>>>,
}

impl ShutdownToken {
    /// A token that never signals, for driving a single cycle directly.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            rx,
            _keepalive: Some(Arc::new(tx)),
        }
    }

    /// True once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve when shutdown is requested (or the scheduler is dropped).
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// A periodic unit of work driven by the scheduler.
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    /// Task name for logs.
    fn name(&self) -> &'static str;

    /// Run one cycle. Errors abort only this cycle; the next tick retries.
    async fn tick(&self, shutdown: &ShutdownToken) -> Result<()>;
}

/// Interval and startup delay for one task loop.
#[derive(Debug, Clone, Copy)]
pub struct TaskTiming {
    pub startup_delay: Duration,
    pub interval: Duration,
}

/// Scheduler owning the registered task loops.
pub struct Scheduler {
    tasks: Vec<(Arc<dyn PeriodicTask>, TaskTiming)>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Scheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            tasks: Vec::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Register a task with its timing.
    pub fn register(&mut self, task: Arc<dyn PeriodicTask>, timing: TaskTiming) {
        self.tasks.push((task, timing));
    }

    /// Spawn every registered loop and return a control handle.
    pub fn start(self) -> SchedulerHandle {
        let mut handles = Vec::with_capacity(self.tasks.len());

        for (task, timing) in self.tasks {
            let token = ShutdownToken {
                rx: self.shutdown_rx.clone(),
                _keepalive: None,
            };
            handles.push(tokio::spawn(run_loop(task, timing, token)));
        }

        SchedulerHandle {
            shutdown_tx: self.shutdown_tx,
            handles,
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for stopping the scheduler and awaiting its loops.
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signal all loops to stop and wait for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!(error = ?e, "Task loop panicked during shutdown");
            }
        }
    }
}

/// One task's timer loop.
async fn run_loop(task: Arc<dyn PeriodicTask>, timing: TaskTiming, mut token: ShutdownToken) {
    let name = task.name();
    info!(
        subsystem = "scheduler",
        task = name,
        startup_delay_secs = timing.startup_delay.as_secs(),
        interval_secs = timing.interval.as_secs(),
        "Task loop started"
    );

    // Staggered start: wait out the delay unless shutdown comes first.
    tokio::select! {
        _ = token.wait() => {
            info!(subsystem = "scheduler", task = name, "Task loop stopped before first cycle");
            return;
        }
        _ = sleep(timing.startup_delay) => {}
    }

    loop {
        if token.is_shutdown() {
            break;
        }

        let start = Instant::now();
        match task.tick(&token).await {
            Ok(()) => {
                info!(
                    subsystem = "scheduler",
                    task = name,
                    op = "tick",
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Cycle completed"
                );
            }
            Err(e) => {
                // Failure isolation: the loop survives and retries next tick.
                error!(
                    subsystem = "scheduler",
                    task = name,
                    op = "tick",
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Cycle failed"
                );
            }
        }

        tokio::select! {
            _ = token.wait() => break,
            _ = sleep(timing.interval) => {}
        }
    }

    info!(subsystem = "scheduler", task = name, "Task loop stopped");
}
