//! Test doubles for the host collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use statscraft_types::{InstallationRecord, PluginDescription, RuntimeInfo, StoredInstallation};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::TransportError;
use crate::host::{HostEnvironment, PlayerCountApi, PluginHandle};
use crate::installation::InstallationStore;
use crate::scheduler::{PeriodicHandle, RepeatingTask, Scheduler, TaskFuture};
use crate::transport::Transport;

// =====================================================
// Scheduler
// =====================================================

/// Scheduler that only queues tasks; tests decide when they run.
#[derive(Default)]
pub struct ManualScheduler {
    immediate: Mutex<Vec<TaskFuture>>,
    delayed: Mutex<Vec<(TaskFuture, Duration)>>,
    periodic: Mutex<Vec<(RepeatingTask, Duration, PeriodicHandle)>>,
    immediate_total: AtomicUsize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run queued immediate tasks, including ones they schedule. Returns
    /// how many ran.
    pub async fn run_immediate(&self) -> usize {
        let mut ran = 0;
        loop {
            let batch: Vec<TaskFuture> = std::mem::take(&mut *self.immediate.lock());
            if batch.is_empty() {
                return ran;
            }
            for task in batch {
                task.await;
                ran += 1;
            }
        }
    }

    /// Run every queued delayed task once, regardless of its delay.
    pub async fn run_delayed(&self) -> usize {
        let batch: Vec<(TaskFuture, Duration)> = std::mem::take(&mut *self.delayed.lock());
        let ran = batch.len();
        for (task, _) in batch {
            task.await;
        }
        ran
    }

    /// Fire one tick of every periodic task still scheduled. Cancelled
    /// schedules are dropped first.
    pub async fn tick_periodic(&self) -> usize {
        let tasks: Vec<RepeatingTask> = {
            let mut periodic = self.periodic.lock();
            periodic.retain(|(_, _, handle)| !handle.is_cancelled());
            periodic.iter().map(|(task, _, _)| Arc::clone(task)).collect()
        };
        for task in &tasks {
            task().await;
        }
        tasks.len()
    }

    pub fn pending_delayed(&self) -> usize {
        self.delayed.lock().len()
    }

    /// Periodic schedules not cancelled yet.
    pub fn periodic_count(&self) -> usize {
        self.periodic
            .lock()
            .iter()
            .filter(|(_, _, handle)| !handle.is_cancelled())
            .count()
    }

    /// Immediate tasks ever scheduled.
    pub fn immediate_total(&self) -> usize {
        self.immediate_total.load(Ordering::SeqCst)
    }

    pub fn periodic_intervals(&self) -> Vec<Duration> {
        self.periodic
            .lock()
            .iter()
            .filter(|(_, _, handle)| !handle.is_cancelled())
            .map(|(_, interval, _)| *interval)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn run_async(&self, task: TaskFuture) {
        self.immediate_total.fetch_add(1, Ordering::SeqCst);
        self.immediate.lock().push(task);
    }

    fn run_delayed(&self, task: TaskFuture, delay: Duration) {
        self.delayed.lock().push((task, delay));
    }

    fn run_periodic_async(
        &self,
        task: RepeatingTask,
        _initial_delay: Duration,
        interval: Duration,
    ) -> PeriodicHandle {
        let handle = PeriodicHandle::new();
        self.periodic.lock().push((task, interval, handle.clone()));
        handle
    }
}

// =====================================================
// Transport
// =====================================================

/// Records every document and answers with a fixed response.
pub struct RecordingTransport {
    response: Result<Option<String>, TransportError>,
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    pub fn ok() -> Self {
        Self::responding(Some("OK"))
    }

    pub fn responding(line: Option<&str>) -> Self {
        Self {
            response: Ok(line.map(|l| l.to_string())),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(TransportError::Io(message.to_string())),
            sent: Mutex::new(Vec::new()),
        }
    }

    /// All `(url, document)` pairs sent so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    /// Documents sent to URLs ending with `suffix`.
    pub fn sent_to(&self, suffix: &str) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .filter(|(url, _)| url.ends_with(suffix))
            .map(|(_, doc)| doc.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, url: &str, document: &str) -> Result<Option<String>, TransportError> {
        self.sent.lock().push((url.to_string(), document.to_string()));
        self.response.clone()
    }
}

// =====================================================
// Host
// =====================================================

pub struct FakePlugin {
    name: String,
    enabled: AtomicBool,
    description: PluginDescription,
}

impl FakePlugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: AtomicBool::new(true),
            description: PluginDescription {
                full_name: format!("{} v1.0.0", name),
                version: "1.0.0".to_string(),
                description: Some(format!("The {} plugin", name)),
                website: Some("https://example.org".to_string()),
                authors: vec!["Alice".to_string(), "Bob".to_string()],
                depend: vec!["Vault".to_string()],
                soft_depend: Vec::new(),
            },
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }
}

impl PluginHandle for FakePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn description(&self) -> PluginDescription {
        self.description.clone()
    }
}

pub struct FakeHost {
    pub players: Mutex<PlayerCountApi>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self {
            players: Mutex::new(PlayerCountApi::Modern { online: 3 }),
        }
    }
}

impl HostEnvironment for FakeHost {
    fn server_version(&self) -> String {
        "1.20.4-R0.1-SNAPSHOT".to_string()
    }

    fn game_version(&self) -> String {
        "git-Paper-496 (MC: 1.20.4)".to_string()
    }

    fn online_mode(&self) -> bool {
        true
    }

    fn world_count(&self) -> usize {
        3
    }

    fn plugin_count(&self) -> usize {
        12
    }

    fn default_game_mode(&self) -> String {
        "SURVIVAL".to_string()
    }

    fn runtime(&self) -> RuntimeInfo {
        RuntimeInfo {
            name: "OpenJDK 64-Bit Server VM".to_string(),
            vendor: "Eclipse Adoptium".to_string(),
            version: "17.0.9".to_string(),
            max_memory: 4 * 1024 * 1024 * 1024,
        }
    }

    fn player_count_api(&self) -> PlayerCountApi {
        self.players.lock().clone()
    }
}

// =====================================================
// Installation store
// =====================================================

pub struct MemoryInstallationStore {
    stored: Mutex<StoredInstallation>,
    saves: AtomicUsize,
    fail_saves: bool,
}

impl MemoryInstallationStore {
    pub fn empty() -> Self {
        Self::with_stored(StoredInstallation::default())
    }

    pub fn with_stored(stored: StoredInstallation) -> Self {
        Self {
            stored: Mutex::new(stored),
            saves: AtomicUsize::new(0),
            fail_saves: false,
        }
    }

    pub fn opted_out() -> Self {
        Self::with_stored(StoredInstallation {
            uuid: Some("6f1c2b1e-3f0a-4a43-9a7c-8d1f0b1c2d3e".to_string()),
            opt_out: Some(true),
        })
    }

    pub fn failing_saves() -> Self {
        Self {
            fail_saves: true,
            ..Self::empty()
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl InstallationStore for MemoryInstallationStore {
    fn load(&self) -> Result<StoredInstallation, String> {
        Ok(self.stored.lock().clone())
    }

    fn save(&self, record: &InstallationRecord) -> Result<(), String> {
        if self.fail_saves {
            return Err("read-only filesystem".to_string());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock() = StoredInstallation {
            uuid: Some(record.uuid.clone()),
            opt_out: Some(record.opt_out),
        };
        Ok(())
    }
}
