//! Per-plugin reporting lifecycle.
//!
//! `start()` sends the plugin identity report right away and defers the
//! election until the host has settled. The elected leader then sends the
//! host snapshot once and the update report on every interval tick. Every
//! leader-only task re-checks leadership when it fires, since leadership
//! may have moved since it was scheduled.

use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use statscraft_types::{InstallationRecord, UpdateSnapshot};
use std::fmt::{self, Display};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::{ReporterSettings, API_VERSION};
use crate::coordination::{CoordinationRegistry, InstanceIdentity};
use crate::custom_data::CustomData;
use crate::error::ReporterError;
use crate::events::MetricsReportEvent;
use crate::host::{HostEnvironment, LifecycleNotifications, PluginEvent, PluginHandle, SubscriptionId};
use crate::installation::{resolve_installation, InstallationStore};
use crate::reports;
use crate::scheduler::{PeriodicHandle, RepeatingTask, Scheduler, TaskFuture};
use crate::transport::{deliver, Transport};

/// Capacity of the `MetricsReportEvent` channel per reporter
const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    NotStarted,
    Starting,
    Active,
}

/// Host collaborators a reporter needs.
#[derive(Clone)]
pub struct HostServices {
    pub environment: Arc<dyn HostEnvironment>,
    pub scheduler: Arc<dyn Scheduler>,
    pub notifications: Arc<dyn LifecycleNotifications>,
    pub transport: Arc<dyn Transport>,
    pub installation: Arc<dyn InstallationStore>,
}

pub struct ReporterBuilder {
    plugin: Arc<dyn PluginHandle>,
    auth_key: String,
    protocol_version: u32,
    settings: ReporterSettings,
    dynamic_plugin_data: bool,
}

impl ReporterBuilder {
    /// Advertise a protocol version other than `API_VERSION`.
    pub fn protocol_version(mut self, version: u32) -> Self {
        self.protocol_version = version;
        self
    }

    pub fn settings(mut self, settings: ReporterSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Also run the plugin data cycle on every update interval, emitting
    /// a `MetricsReportEvent` each time.
    pub fn dynamic_plugin_data(mut self, enabled: bool) -> Self {
        self.dynamic_plugin_data = enabled;
        self
    }

    pub fn build(self, services: HostServices, registry: Arc<CoordinationRegistry>) -> Reporter {
        let identity = InstanceIdentity::new(self.plugin.name(), self.protocol_version);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Reporter {
            inner: Arc::new(ReporterInner {
                identity,
                auth_key: self.auth_key,
                plugin: self.plugin,
                services,
                registry,
                settings: self.settings,
                dynamic_plugin_data: self.dynamic_plugin_data,
                state: Mutex::new(LifecycleState::NotStarted),
                installation: RwLock::new(None),
                custom_data: Mutex::new(CustomData::new()),
                subscription: Mutex::new(None),
                run: Mutex::new(CancellationToken::new()),
                periodic: Mutex::new(Vec::new()),
                events,
            }),
        }
    }
}

/// Metrics reporter embedded in one plugin.
#[derive(Clone)]
pub struct Reporter {
    inner: Arc<ReporterInner>,
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reporter")
            .field("identity", &self.inner.identity)
            .field("state", &self.state())
            .finish()
    }
}

struct ReporterInner {
    identity: InstanceIdentity,
    auth_key: String,
    plugin: Arc<dyn PluginHandle>,
    services: HostServices,
    registry: Arc<CoordinationRegistry>,
    settings: ReporterSettings,
    dynamic_plugin_data: bool,
    state: Mutex<LifecycleState>,
    installation: RwLock<Option<InstallationRecord>>,
    /// Written only while `NotStarted`, drained by report tasks afterwards
    custom_data: Mutex<CustomData>,
    subscription: Mutex<Option<SubscriptionId>>,
    /// Token of the current run, replaced by every `start()`
    run: Mutex<CancellationToken>,
    /// Periodic schedules of the current run
    periodic: Mutex<Vec<PeriodicHandle>>,
    events: broadcast::Sender<MetricsReportEvent>,
}

impl Reporter {
    pub fn builder(plugin: Arc<dyn PluginHandle>, auth_key: impl Into<String>) -> ReporterBuilder {
        ReporterBuilder {
            plugin,
            auth_key: auth_key.into(),
            protocol_version: API_VERSION,
            settings: ReporterSettings::default(),
            dynamic_plugin_data: false,
        }
    }

    /// Reporter with default settings at the current protocol version.
    pub fn new(
        plugin: Arc<dyn PluginHandle>,
        auth_key: impl Into<String>,
        services: HostServices,
        registry: Arc<CoordinationRegistry>,
    ) -> Self {
        Self::builder(plugin, auth_key).build(services, registry)
    }

    /// Add an annotation to the plugin report.
    ///
    /// Only allowed before `start()`.
    pub fn add_custom_data(&self, key: &str, value: impl Display) -> Result<&Self, ReporterError> {
        let state = self.inner.state.lock();
        if *state != LifecycleState::NotStarted {
            return Err(ReporterError::State(
                "Can't add custom data when the metrics service is running".to_string(),
            ));
        }
        self.inner.custom_data.lock().insert(key, value)?;
        Ok(self)
    }

    /// Start reporting.
    ///
    /// Returns true if reporting is now active or already was, false if the
    /// plugin is disabled or the server owner opted out. Never blocks on
    /// the network.
    pub fn start(&self) -> bool {
        let inner = &self.inner;

        {
            let mut state = inner.state.lock();
            if *state != LifecycleState::NotStarted {
                return true;
            }
            if !inner.plugin.is_enabled() {
                return false;
            }
            *state = LifecycleState::Starting;
        }

        let record = resolve_installation(inner.services.installation.as_ref());
        if record.opt_out {
            log::info!(
                "[METRICS] Reporting disabled by opt-out, not starting for {}",
                inner.identity.name
            );
            *inner.state.lock() = LifecycleState::NotStarted;
            return false;
        }
        *inner.installation.write() = Some(record);

        inner.registry.register(&inner.identity);

        let weak: Weak<ReporterInner> = Arc::downgrade(inner);
        let subscription = inner.services.notifications.subscribe(Arc::new(move |event: &PluginEvent| {
            if let Some(inner) = weak.upgrade() {
                inner.on_plugin_event(event);
            }
        }));
        *inner.subscription.lock() = Some(subscription);

        let run = CancellationToken::new();
        *inner.run.lock() = run.clone();
        *inner.state.lock() = LifecycleState::Active;

        let scheduler = &inner.services.scheduler;
        scheduler.run_async(ReporterInner::plugin_report_task(inner.clone(), run.clone()));
        scheduler.run_delayed(
            ReporterInner::post_boot_task(inner.clone(), run),
            inner.settings.boot_delay(),
        );

        log::info!(
            "[METRICS] Reporter started for {} (protocol v{})",
            inner.identity.name,
            inner.identity.protocol_version
        );
        true
    }

    /// Stop reporting: leave the election, drop the notification handler,
    /// cancel the periodic schedules and turn pending tasks into no-ops.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    /// Receive an event each time a dynamic plugin data cycle completes.
    pub fn subscribe(&self) -> broadcast::Receiver<MetricsReportEvent> {
        self.inner.events.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.lock()
    }

    pub fn identity(&self) -> &InstanceIdentity {
        &self.inner.identity
    }

    pub fn is_leader(&self) -> bool {
        self.inner.registry.is_leader(&self.inner.identity.name)
    }

    /// Installation record loaded by `start()`.
    pub fn installation(&self) -> Option<InstallationRecord> {
        self.inner.installation.read().clone()
    }

    /// Custom data entries not yet sent.
    pub fn pending_custom_data(&self) -> usize {
        self.inner.custom_data.lock().len()
    }
}

impl ReporterInner {
    /// The plugin is enabled and the reporter is running.
    fn is_active(&self) -> bool {
        self.plugin.is_enabled() && *self.state.lock() == LifecycleState::Active
    }

    /// Guard at the top of every task. `run` is the token of the run that
    /// scheduled the task; it is cancelled by `shutdown()`, so tasks left
    /// over from an earlier run stay inert after a restart.
    fn should_run(&self, run: &CancellationToken) -> bool {
        !run.is_cancelled() && self.is_active()
    }

    fn installation_uuid(&self) -> Option<String> {
        self.installation.read().as_ref().map(|r| r.uuid.clone())
    }

    /// Leadership check for leader-only tasks. A vacant slot means the
    /// previous leader went away; run the election before deciding.
    fn confirm_leadership(&self) -> bool {
        if self.registry.is_leader_vacant() {
            return self.registry.elect_leader_if_eligible(&self.identity);
        }
        self.registry.is_leader(&self.identity.name)
    }

    async fn send_report(&self, url: &str, document: &str) -> Result<(), ReporterError> {
        deliver(self.services.transport.as_ref(), url, document).await?;
        Ok(())
    }

    /// Keep `handle` for `shutdown()`, or cancel it now if its run already
    /// ended.
    fn track_periodic(&self, run: &CancellationToken, handle: PeriodicHandle) {
        let mut periodic = self.periodic.lock();
        if run.is_cancelled() {
            handle.cancel();
        } else {
            periodic.push(handle);
        }
    }

    // ── lifecycle ────────────────────────────────────────────────────

    fn on_plugin_event(&self, event: &PluginEvent) {
        let PluginEvent::Disabled(name) = event else {
            return;
        };

        if *name == self.identity.name {
            self.shutdown();
            return;
        }

        self.registry.unregister(name);

        if !self.is_active() || !self.registry.is_leader_vacant() {
            return;
        }
        if self.registry.elect_leader_if_eligible(&self.identity) {
            log::info!(
                "[ELECTION] {} took over reporting after {} was disabled",
                self.identity.name,
                name
            );
        }
    }

    fn shutdown(&self) {
        {
            let mut state = self.state.lock();
            if *state == LifecycleState::NotStarted {
                return;
            }
            *state = LifecycleState::NotStarted;
        }

        // cancel the run before draining, see track_periodic
        self.run.lock().cancel();
        let stopped: Vec<PeriodicHandle> = self.periodic.lock().drain(..).collect();
        for handle in &stopped {
            handle.cancel();
        }

        let was_leader = self.registry.unregister(&self.identity.name);
        if let Some(id) = self.subscription.lock().take() {
            self.services.notifications.unsubscribe(&id);
        }

        log::info!(
            "[METRICS] Reporter stopped for {} ({} schedules cancelled){}",
            self.identity.name,
            stopped.len(),
            if was_leader { ", leadership released" } else { "" }
        );
    }

    // ── tasks ────────────────────────────────────────────────────────

    fn plugin_report_task(inner: Arc<Self>, run: CancellationToken) -> TaskFuture {
        async move {
            if !inner.should_run(&run) {
                return;
            }
            let Some(uuid) = inner.installation_uuid() else {
                return;
            };

            // drained so a later cycle never resends these
            let custom_data = inner.custom_data.lock().drain_all();
            let document = reports::plugin_report(
                &inner.auth_key,
                &uuid,
                &inner.plugin.description(),
                &custom_data,
            );

            match inner.send_report(&inner.settings.plugin_url(), &document).await {
                Ok(()) => log::debug!("[METRICS] Plugin report sent for {}", inner.identity.name),
                Err(e) => log::error!(
                    "[METRICS] Failed to send plugin report for {}: {}",
                    inner.identity.name,
                    e
                ),
            }
        }
        .boxed()
    }

    fn post_boot_task(inner: Arc<Self>, run: CancellationToken) -> TaskFuture {
        async move {
            if !inner.should_run(&run) {
                return;
            }

            let scheduler = inner.services.scheduler.clone();
            let interval = inner.settings.update_interval();

            if inner.registry.elect_leader_if_eligible(&inner.identity) {
                scheduler.run_async(Self::server_report_task(inner.clone(), run.clone()));
            }

            let (update, update_run) = (inner.clone(), run.clone());
            let update_task: RepeatingTask =
                Arc::new(move || Self::update_report_task(update.clone(), update_run.clone()));
            let handle = scheduler.run_periodic_async(update_task, Duration::ZERO, interval);
            inner.track_periodic(&run, handle);

            if inner.dynamic_plugin_data {
                let (cycle, cycle_run) = (inner.clone(), run.clone());
                let cycle_task: RepeatingTask =
                    Arc::new(move || Self::plugin_data_cycle_task(cycle.clone(), cycle_run.clone()));
                let handle = scheduler.run_periodic_async(cycle_task, Duration::ZERO, interval);
                inner.track_periodic(&run, handle);
            }
        }
        .boxed()
    }

    fn server_report_task(inner: Arc<Self>, run: CancellationToken) -> TaskFuture {
        async move {
            if !inner.should_run(&run) {
                return;
            }
            if !inner.confirm_leadership() {
                log::debug!(
                    "[METRICS] {} is no longer leader, skipping server report",
                    inner.identity.name
                );
                return;
            }
            let Some(uuid) = inner.installation_uuid() else {
                return;
            };

            let snapshot =
                reports::capture_server_snapshot(&uuid, inner.services.environment.as_ref());
            let document = reports::server_report(&snapshot);

            match inner.send_report(&inner.settings.server_url(), &document).await {
                Ok(()) => log::info!("[METRICS] Server report sent by {}", inner.identity.name),
                Err(e) => log::error!("[METRICS] Failed to send server report: {}", e),
            }
        }
        .boxed()
    }

    fn update_report_task(inner: Arc<Self>, run: CancellationToken) -> TaskFuture {
        async move {
            if !inner.should_run(&run) {
                return;
            }
            if !inner.confirm_leadership() {
                return;
            }
            let Some(uuid) = inner.installation_uuid() else {
                return;
            };

            let update = UpdateSnapshot {
                uuid,
                player_count: inner.services.environment.player_count_api().online_count(),
            };
            let document = reports::update_report(&update);

            match inner.send_report(&inner.settings.update_url(), &document).await {
                Ok(()) => log::debug!(
                    "[METRICS] Update report sent ({} players)",
                    update.player_count
                ),
                Err(e) => log::error!("[METRICS] Failed to send update report: {}", e),
            }
        }
        .boxed()
    }

    fn plugin_data_cycle_task(inner: Arc<Self>, run: CancellationToken) -> TaskFuture {
        async move {
            if !inner.should_run(&run) {
                return;
            }
            let data = inner.custom_data.lock().drain_all();
            let event = MetricsReportEvent {
                plugin: inner.identity.name.clone(),
                data,
                emitted_at: chrono::Utc::now(),
            };
            // no receivers is fine
            let _ = inner.events.send(event);
        }
        .boxed()
    }
}
