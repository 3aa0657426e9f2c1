//! Status synchronizer - keeps the main status in step with device activity.
//!
//! A reconciliation pass reads the singleton status record, counts devices
//! in use and, when the implied status differs from the stored one, writes
//! the new status and broadcasts `status_changed`. Passes are queued and run
//! one at a time on a background worker, so callers never wait on the store.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{mpsc, oneshot};

use crate::domain::{BroadcastEvent, HookEvent, MainStatus, Result, StatusRecord, Transition};
use crate::infrastructure::AutomationSwitch;

use super::hooks::HookHandler;
use super::ports::{EventSink, RecordStore};

/// Why a reconciliation pass was queued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassTrigger {
    /// Initial check when the plugin starts.
    Startup,
    /// A device reported activity.
    DeviceActivity { source: Option<String> },
}

impl std::fmt::Display for PassTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Startup => write!(f, "startup"),
            Self::DeviceActivity { source: Some(source) } => {
                write!(f, "device_activity ({source})")
            }
            Self::DeviceActivity { source: None } => write!(f, "device_activity"),
        }
    }
}

enum Job {
    Reconcile(PassTrigger),
    Settle(oneshot::Sender<()>),
}

/// Keeps the singleton status record consistent with device activity.
pub struct StatusSynchronizer<S, E> {
    store: S,
    sink: E,
    switch: AutomationSwitch,
    jobs: mpsc::UnboundedSender<Job>,
    pending: Mutex<Option<mpsc::UnboundedReceiver<Job>>>,
    started: AtomicBool,
}

impl<S, E> StatusSynchronizer<S, E>
where
    S: RecordStore + 'static,
    E: EventSink + 'static,
{
    /// Create a synchronizer, loading the automation switch from `config_path`.
    ///
    /// A missing or malformed config file enables automation.
    pub fn new(store: S, sink: E, config_path: impl Into<PathBuf>) -> Arc<Self> {
        let (jobs, receiver) = mpsc::unbounded_channel();

        Arc::new(Self {
            store,
            sink,
            switch: AutomationSwitch::load(config_path),
            jobs,
            pending: Mutex::new(Some(receiver)),
            started: AtomicBool::new(false),
        })
    }

    /// In-memory automation switch, as seen by activity events.
    pub fn is_enabled(&self) -> bool {
        self.switch.is_enabled()
    }

    /// Start the background worker that runs queued passes.
    ///
    /// Must be called from within a tokio runtime. Passes queued before the
    /// worker starts run as soon as it does. Returns `false` if the worker
    /// was already started.
    pub fn start(self: &Arc<Self>) -> bool {
        let receiver = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.take());
        let Some(receiver) = receiver else {
            return false;
        };

        self.started.store(true, Ordering::Release);
        tokio::spawn(Self::run_worker(Arc::downgrade(self), receiver));
        true
    }

    async fn run_worker(this: Weak<Self>, mut receiver: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = receiver.recv().await {
            let Some(sync) = this.upgrade() else {
                break;
            };

            match job {
                Job::Reconcile(trigger) => {
                    tracing::debug!(%trigger, "Running reconciliation pass");
                    sync.reconcile().await;
                }
                Job::Settle(done) => {
                    let _ = done.send(());
                }
            }
        }

        tracing::debug!("Reconciliation worker stopped");
    }

    /// Queue a reconciliation pass without waiting for it.
    pub fn schedule(&self, trigger: PassTrigger) -> bool {
        if self.jobs.send(Job::Reconcile(trigger)).is_err() {
            tracing::warn!("Reconciliation worker is gone; pass dropped");
            return false;
        }
        true
    }

    /// React to a `device_activity` hook.
    ///
    /// Returns `true` if a pass was queued; disabled automation queues nothing.
    pub fn on_device_activity(&self, event: &HookEvent) -> bool {
        let source = event.source.as_deref().unwrap_or("unknown");

        if !self.is_enabled() {
            tracing::debug!(source, "Automation disabled; ignoring device activity");
            return false;
        }

        tracing::debug!(source, "Device activity");
        self.schedule(PassTrigger::DeviceActivity {
            source: event.source.clone(),
        })
    }

    /// Wait until every pass queued before this call has finished.
    ///
    /// Returns immediately if the worker was never started.
    pub async fn settle(&self) {
        if !self.started.load(Ordering::Acquire) {
            return;
        }

        let (done, finished) = oneshot::channel();
        if self.jobs.send(Job::Settle(done)).is_ok() {
            let _ = finished.await;
        }
    }

    /// Run one reconciliation pass now.
    ///
    /// Store failures are logged and swallowed. Returns the transition if the
    /// main status changed.
    pub async fn reconcile(&self) -> Option<Transition> {
        let transition = match self.apply_target_status() {
            Ok(transition) => transition?,
            Err(e) => {
                tracing::error!(error = %e, "Error in auto main status update");
                return None;
            }
        };

        tracing::info!(
            from = %transition.from,
            to = %transition.to,
            online = transition.online,
            "Main status changed"
        );

        let event = BroadcastEvent::status_changed(transition.to);
        if let Err(e) = self.sink.publish(event).await {
            tracing::error!(error = %e, status = %transition.to, "Failed to broadcast status change");
        }

        Some(transition)
    }

    fn apply_target_status(&self) -> Result<Option<Transition>> {
        let Some(record) = self.store.status_record()? else {
            tracing::debug!("No status record; nothing to reconcile");
            return Ok(None);
        };

        let online = self.store.count_active_devices()?;
        let target = MainStatus::from_online_count(online);

        if record.status == target {
            tracing::trace!(status = %target, online, "Main status already current");
            return Ok(None);
        }

        self.store.save_status_record(&StatusRecord::now(target))?;

        Ok(Some(Transition {
            from: record.status,
            to: target,
            online,
        }))
    }
}

impl<S, E> HookHandler for StatusSynchronizer<S, E>
where
    S: RecordStore + 'static,
    E: EventSink + 'static,
{
    fn handle(&self, event: &HookEvent) {
        self.on_device_activity(event);
    }
}
