//! Host simulator: several plugins embedding reporters on one server.
//!
//! Starts one reporter per simulated plugin, lets them elect a leader,
//! then disables the leader's plugin to show the hand-over.
//!
//! Environment:
//!   STATSCRAFT_DRY_RUN       log report documents instead of sending them
//!   STATSCRAFT_PLUGINS_DIR   simulated plugins folder (default ./sim-server/plugins)
//!   STATSCRAFT_AUTH_KEY      auth key sent with plugin reports
//! plus the `ReporterSettings::from_env` variables.

use statscraft_reporter::{
    CoordinationRegistry, HostEnvironment, HostServices, HttpTransport, LogTransport,
    PlayerCountApi, PluginEvent, PluginEventBus, PluginHandle, Reporter, ReporterSettings,
    TokioScheduler, Transport, YamlInstallationStore,
};
use statscraft_types::{PluginDescription, RuntimeInfo};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct SimPlugin {
    name: String,
    version: String,
    enabled: AtomicBool,
}

impl SimPlugin {
    fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            enabled: AtomicBool::new(true),
        }
    }
}

impl PluginHandle for SimPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn description(&self) -> PluginDescription {
        PluginDescription {
            full_name: format!("{} v{}", self.name, self.version),
            version: self.version.clone(),
            description: Some(format!("Simulated {} plugin", self.name)),
            website: None,
            authors: vec!["sim".to_string()],
            depend: Vec::new(),
            soft_depend: Vec::new(),
        }
    }
}

struct SimHost {
    plugin_count: usize,
    online: AtomicUsize,
}

impl HostEnvironment for SimHost {
    fn server_version(&self) -> String {
        "1.20.4-R0.1-SNAPSHOT".to_string()
    }

    fn game_version(&self) -> String {
        "host_sim (MC: 1.20.4)".to_string()
    }

    fn online_mode(&self) -> bool {
        true
    }

    fn world_count(&self) -> usize {
        3
    }

    fn plugin_count(&self) -> usize {
        self.plugin_count
    }

    fn default_game_mode(&self) -> String {
        "SURVIVAL".to_string()
    }

    fn runtime(&self) -> RuntimeInfo {
        RuntimeInfo {
            name: "host_sim".to_string(),
            vendor: "StatsCraft".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            max_memory: 2 * 1024 * 1024 * 1024,
        }
    }

    fn player_count_api(&self) -> PlayerCountApi {
        PlayerCountApi::Modern {
            online: self.online.load(Ordering::SeqCst),
        }
    }
}

/// A simulated plugin with its reporter and the scheduler owning its tasks.
struct Loaded {
    plugin: Arc<SimPlugin>,
    scheduler: TokioScheduler,
    reporter: Reporter,
}

fn leader_name(registry: &CoordinationRegistry) -> String {
    registry.leader().unwrap_or_else(|| "none".to_string())
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let settings = ReporterSettings::from_env();
    let dry_run = std::env::var("STATSCRAFT_DRY_RUN").is_ok();
    let auth_key = std::env::var("STATSCRAFT_AUTH_KEY").unwrap_or_else(|_| "host-sim".to_string());
    let plugins_dir = PathBuf::from(
        std::env::var("STATSCRAFT_PLUGINS_DIR")
            .unwrap_or_else(|_| "./sim-server/plugins".to_string()),
    );

    let transport: Arc<dyn Transport> = if dry_run {
        log::info!("Dry run: report documents are logged, not sent");
        Arc::new(LogTransport)
    } else {
        Arc::new(HttpTransport::new(settings.request_timeout()))
    };

    // (name, version, reporter protocol version)
    let catalogue = [
        ("WorldGuard", "7.0.9", 1),
        ("Essentials", "2.20.1", 1),
        ("LuckPerms", "5.4.102", 2),
    ];

    let registry = Arc::new(CoordinationRegistry::new());
    let bus = Arc::new(PluginEventBus::new());
    let host = Arc::new(SimHost {
        plugin_count: catalogue.len(),
        online: AtomicUsize::new(5),
    });

    let mut loaded = Vec::new();
    for (name, version, protocol) in catalogue {
        let plugin = Arc::new(SimPlugin::new(name, version));
        let scheduler = TokioScheduler::new();
        let data_folder = plugins_dir.join(name);

        let services = HostServices {
            environment: host.clone(),
            scheduler: Arc::new(scheduler.clone()),
            notifications: bus.clone(),
            transport: transport.clone(),
            installation: Arc::new(YamlInstallationStore::beside_data_folder(&data_folder)),
        };

        let reporter = Reporter::builder(plugin.clone(), auth_key.clone())
            .protocol_version(protocol)
            .settings(settings.clone())
            .build(services, registry.clone());

        if let Err(e) = reporter.add_custom_data("simulated", true) {
            log::warn!("Custom data rejected for {}: {}", name, e);
        }

        if reporter.start() {
            log::info!("{} v{} reporting (protocol v{})", name, version, protocol);
        } else {
            log::info!("{} not reporting (disabled or opted out)", name);
        }

        loaded.push(Loaded {
            plugin,
            scheduler,
            reporter,
        });
    }

    // let the boot delay pass so the election runs
    tokio::time::sleep(settings.boot_delay() + Duration::from_millis(500)).await;
    log::info!("Leader after boot: {}", leader_name(&registry));

    let Some(leader_index) = loaded.iter().position(|l| l.reporter.is_leader()) else {
        log::warn!("No reporter holds the leader slot; nothing to hand over");
        return;
    };

    // unload the leader the way a plugin loader would
    let leader = loaded.remove(leader_index);
    leader.plugin.enabled.store(false, Ordering::SeqCst);
    leader.scheduler.cancel_all();
    bus.publish(PluginEvent::Disabled(leader.plugin.name().to_string()));
    log::info!(
        "Disabled {}; leader is now {}",
        leader.plugin.name(),
        leader_name(&registry)
    );

    host.online.store(7, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(2)).await;

    for l in &loaded {
        l.plugin.enabled.store(false, Ordering::SeqCst);
        l.scheduler.cancel_all();
        bus.publish(PluginEvent::Disabled(l.plugin.name().to_string()));
    }
    log::info!(
        "All plugins disabled ({} still registered)",
        registry.len()
    );
}
