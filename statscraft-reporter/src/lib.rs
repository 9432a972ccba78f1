//! StatsCraft reporter: anonymous usage reporting embedded in game-server
//! plugins.
//!
//! Every plugin that embeds a [`Reporter`] sends its own identity report.
//! Reporters sharing a host elect one leader through a
//! [`CoordinationRegistry`]; only the leader sends the host snapshot and
//! the recurring update report.

pub mod config;
pub mod coordination;
pub mod custom_data;
pub mod encoder;
pub mod error;
pub mod events;
pub mod host;
pub mod http;
pub mod installation;
pub mod reporter;
pub mod reports;
pub mod scheduler;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{ReporterSettings, API_VERSION};
pub use coordination::{CoordinationRegistry, InstanceIdentity};
pub use error::{ReporterError, TransportError};
pub use events::{MetricsReportEvent, PluginEventBus};
pub use host::{HostEnvironment, LifecycleNotifications, PlayerCountApi, PluginEvent, PluginHandle};
pub use http::HttpTransport;
pub use installation::{InstallationStore, YamlInstallationStore};
pub use reporter::{HostServices, LifecycleState, Reporter, ReporterBuilder};
pub use scheduler::{Scheduler, TokioScheduler};
pub use transport::{LogTransport, Transport};
