//! In-process plugin event bus and the reporter's own outbound events.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::host::{LifecycleNotifications, PluginEvent, PluginEventHandler, SubscriptionId};

/// Emitted by a reporter when a dynamic plugin data cycle completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsReportEvent {
    /// Plugin whose reporter ran the cycle
    pub plugin: String,
    /// Custom data drained during the cycle
    pub data: BTreeMap<String, String>,
    pub emitted_at: DateTime<Utc>,
}

/// Delivers plugin enable/disable notifications to subscribed handlers.
///
/// Hosts that have no notification stream of their own can use this one
/// and call `publish` from their plugin loader.
#[derive(Default)]
pub struct PluginEventBus {
    handlers: DashMap<String, PluginEventHandler>,
}

impl PluginEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Handlers are snapshotted first, so a handler may unsubscribe itself
    /// (or others) while the event is being delivered.
    pub fn publish(&self, event: PluginEvent) {
        let handlers: Vec<PluginEventHandler> = self
            .handlers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        log::debug!(
            "[METRICS] Publishing {:?} to {} handlers",
            event,
            handlers.len()
        );

        for handler in handlers {
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.len()
    }
}

impl LifecycleNotifications for PluginEventBus {
    fn subscribe(&self, handler: PluginEventHandler) -> SubscriptionId {
        let id = Uuid::new_v4().to_string();
        self.handlers.insert(id.clone(), handler);
        log::debug!("Handler {} subscribed to plugin events", id);
        SubscriptionId(id)
    }

    fn unsubscribe(&self, id: &SubscriptionId) {
        if self.handlers.remove(&id.0).is_some() {
            log::debug!("Handler {} unsubscribed from plugin events", id.0);
        }
    }
}
