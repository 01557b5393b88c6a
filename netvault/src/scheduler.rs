//! Bounded worker pool running one task per device.
//!
//! `N` workers share a bounded queue. Each worker takes one device, runs
//! it end to end in its own tokio task under a hard deadline, records one
//! [`Outcome`] per requested action, then takes the next. A task that
//! fails, panics or overruns is logged and converted to failure outcomes
//! for whatever actions it had not recorded; siblings and the worker carry
//! on.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use log::{debug, error, info, warn};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::collector::Collector;
use crate::device::Device;
use crate::driver::{GenericDriver, Outcome, RunContext};
use crate::error::{Error, Result, TaskError};
use crate::platform::PlatformRegistry;
use crate::transport::Connector;

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 20;

/// Pool settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Number of workers, i.e. the most devices handled at once.
    pub workers: usize,

    /// Queued devices beyond which `submit` waits.
    pub queue_capacity: usize,

    /// Hard deadline for one device task.
    pub task_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_WORKERS,
            task_timeout: Duration::from_secs(600),
        }
    }
}

impl SchedulerConfig {
    /// Pool of `workers` with a queue of the same size.
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: workers,
            ..Self::default()
        }
    }

    /// Set the task deadline.
    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }
}

/// Everything a device task needs, shared by all workers.
struct TaskEnv {
    ctx: Arc<RunContext>,
    registry: Arc<PlatformRegistry>,
    connector: Arc<dyn Connector>,
    collector: Arc<Collector>,
    control: SchedulerHandle,
    task_timeout: Duration,
}

/// Stops a running scheduler from outside (e.g. a signal handler).
#[derive(Debug, Clone, Default)]
pub struct SchedulerHandle {
    stop: CancellationToken,
    abort: CancellationToken,
}

impl SchedulerHandle {
    /// Refuse further submissions. Queued tasks that have not started are
    /// recorded as cancelled; running tasks finish.
    pub fn stop(&self) {
        if !self.stop.is_cancelled() {
            info!("stopping: no new devices will be started");
        }
        self.stop.cancel();
    }

    /// Stop, and tell running sessions to give up at their next step.
    pub fn abort(&self) {
        self.stop();
        if !self.abort.is_cancelled() {
            warn!("aborting running sessions");
        }
        self.abort.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

/// Fixed-size pool of device workers.
pub struct Scheduler {
    sender: Option<mpsc::Sender<Arc<Device>>>,
    workers: Vec<JoinHandle<()>>,
    control: SchedulerHandle,
}

impl Scheduler {
    /// Spawn the workers. Must be called from within a tokio runtime.
    pub fn start(
        config: SchedulerConfig,
        ctx: Arc<RunContext>,
        registry: Arc<PlatformRegistry>,
        connector: Arc<dyn Connector>,
        collector: Arc<Collector>,
    ) -> Self {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let queue = Arc::new(Mutex::new(receiver));
        let control = SchedulerHandle::default();

        let env = Arc::new(TaskEnv {
            ctx,
            registry,
            connector,
            collector,
            control: control.clone(),
            task_timeout: config.task_timeout,
        });

        let workers = (0..workers)
            .map(|id| tokio::spawn(worker(id, queue.clone(), env.clone())))
            .collect();
        debug!("scheduler started with {} workers", config.workers.max(1));

        Self {
            sender: Some(sender),
            workers,
            control,
        }
    }

    /// Queue one device. Disabled devices are skipped. Waits while the
    /// queue is full; fails with [`TaskError::Rejected`] after `stop`.
    pub async fn submit(&self, device: Device) -> Result<()> {
        if !device.enabled {
            debug!("{}: disabled, skipped", device.name);
            return Ok(());
        }
        if self.control.is_stopped() {
            return Err(TaskError::Rejected.into());
        }
        let sender = self.sender.as_ref().ok_or(TaskError::Rejected)?;
        sender
            .send(Arc::new(device))
            .await
            .map_err(|_| TaskError::Rejected)?;
        Ok(())
    }

    /// A handle that can stop or abort this scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        self.control.clone()
    }

    /// See [`SchedulerHandle::stop`].
    pub fn stop(&self) {
        self.control.stop();
    }

    /// See [`SchedulerHandle::abort`].
    pub fn abort(&self) {
        self.control.abort();
    }

    /// Close the queue and wait until every submitted task has reached a
    /// terminal state. Calling it again returns immediately.
    pub async fn await_completion(&mut self) {
        drop(self.sender.take());
        for result in join_all(self.workers.drain(..)).await {
            if let Err(e) = result {
                error!("worker terminated abnormally: {e}");
            }
        }
    }

    /// Submit every device, then wait for completion. Stops submitting
    /// once the scheduler has been stopped.
    pub async fn run_all(&mut self, devices: impl IntoIterator<Item = Device>) {
        for device in devices {
            if let Err(e) = self.submit(device).await {
                debug!("submission ended: {e}");
                break;
            }
        }
        self.await_completion().await;
    }
}

async fn worker(id: usize, queue: Arc<Mutex<mpsc::Receiver<Arc<Device>>>>, env: Arc<TaskEnv>) {
    debug!("worker {id} started");
    loop {
        let device = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        let Some(device) = device else { break };

        if env.control.is_stopped() {
            debug!("{}: run stopped before start", device.name);
            fail_remaining(&env, &device, &TaskError::Cancelled.into());
            continue;
        }
        run_task(&env, device).await;
    }
    debug!("worker {id} finished");
}

/// Run one device in its own task, raced against the hard deadline.
async fn run_task(env: &Arc<TaskEnv>, device: Arc<Device>) {
    let mut handle = tokio::spawn(process_device(env.clone(), device.clone()));

    let failure = match tokio::time::timeout(env.task_timeout, &mut handle).await {
        Ok(Ok(())) => return,
        Ok(Err(e)) if e.is_panic() => TaskError::Panicked(panic_message(e.into_panic())),
        Ok(Err(_)) => TaskError::Cancelled,
        Err(_) => {
            handle.abort();
            // Wait for the transport to be dropped before taking more work.
            let _ = handle.await;
            TaskError::DeadlineExceeded(env.task_timeout)
        }
    };

    error!("{}: {}", device.name, failure);
    fail_remaining(env, &device, &failure.into());
}

/// The device task proper: resolve, connect, run actions, close.
async fn process_device(env: Arc<TaskEnv>, device: Arc<Device>) {
    let platform = match env.registry.resolve(&device.manufacturer) {
        Ok(platform) => platform,
        Err(e) => {
            error!("{}: {}", device.name, e);
            fail_remaining(&env, &device, &e);
            return;
        }
    };

    let mut driver = GenericDriver::new(device.clone(), platform, env.ctx.clone());
    if let Err(e) = driver
        .open(env.connector.as_ref(), env.control.abort.child_token())
        .await
    {
        error!("{}: {}", device.name, e);
        fail_remaining(&env, &device, &e);
        return;
    }

    for action in &device.actions {
        env.collector.record(driver.execute(action).await);
    }

    if let Err(e) = driver.close().await {
        warn!("{}: error while closing: {}", device.name, e);
    }
}

/// Record a failure for every action of `device` without an outcome yet.
fn fail_remaining(env: &TaskEnv, device: &Device, reason: &Error) {
    let recorded = env.collector.recorded_for(&device.name);
    for action in device.actions.iter().skip(recorded) {
        env.collector
            .record(Outcome::failure(&device.name, action.name(), reason));
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
