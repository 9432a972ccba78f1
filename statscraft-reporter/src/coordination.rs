//! Process-wide leader election among co-resident reporters.
//!
//! Every plugin that embeds a reporter registers its name and protocol
//! version here. Exactly one registered name holds the leader slot and is
//! the only one allowed to send host-level reports. The highest protocol
//! version wins; among equal versions the last instance to run the
//! election wins.
//!
//! One registry is created per host process and shared by `Arc` with every
//! reporter in it. Nothing here is global, so tests build their own.

use dashmap::DashMap;
use parking_lot::Mutex;

/// Identity of one embedded reporter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InstanceIdentity {
    /// Name of the embedding plugin, unique within the host
    pub name: String,
    pub protocol_version: u32,
}

impl InstanceIdentity {
    pub fn new(name: impl Into<String>, protocol_version: u32) -> Self {
        Self {
            name: name.into(),
            protocol_version,
        }
    }
}

/// Shared registry of enabled reporters and the current leader.
#[derive(Debug, Default)]
pub struct CoordinationRegistry {
    /// Registered (enabled) plugin name → protocol version
    versions: DashMap<String, u32>,
    /// Current leader name. Elections hold this lock for the whole
    /// scan-then-claim so two callers never interleave.
    leader: Mutex<Option<String>>,
}

impl CoordinationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity` as enabled, replacing any stale version.
    pub fn register(&self, identity: &InstanceIdentity) {
        self.versions
            .insert(identity.name.clone(), identity.protocol_version);
        log::debug!(
            "[ELECTION] Registered {} (protocol v{})",
            identity.name,
            identity.protocol_version
        );
    }

    /// Remove `name` from the registry.
    ///
    /// Returns true if `name` held the leader slot. The slot is then left
    /// vacant and the remaining instances must run the election again.
    pub fn unregister(&self, name: &str) -> bool {
        let mut leader = self.leader.lock();
        self.versions.remove(name);
        if leader.as_deref() == Some(name) {
            *leader = None;
            log::info!("[ELECTION] Leader {} unregistered, re-election required", name);
            true
        } else {
            false
        }
    }

    /// Claim the leader slot for `candidate` unless another registered
    /// instance advertises a strictly higher protocol version.
    ///
    /// An unregistered candidate never claims. Returns whether `candidate`
    /// is the leader afterwards.
    pub fn elect_leader_if_eligible(&self, candidate: &InstanceIdentity) -> bool {
        let mut leader = self.leader.lock();

        if !self.versions.contains_key(&candidate.name) {
            return leader.as_deref() == Some(candidate.name.as_str());
        }

        let outranked = self.versions.iter().any(|entry| {
            entry.key() != &candidate.name && *entry.value() > candidate.protocol_version
        });
        if outranked {
            log::debug!(
                "[ELECTION] {} defers to a newer reporter protocol",
                candidate.name
            );
            return leader.as_deref() == Some(candidate.name.as_str());
        }

        if leader.as_deref() != Some(candidate.name.as_str()) {
            log::info!(
                "[ELECTION] {} elected leader (protocol v{}, previous: {})",
                candidate.name,
                candidate.protocol_version,
                leader.as_deref().unwrap_or("none")
            );
            *leader = Some(candidate.name.clone());
        }
        true
    }

    /// Whether `name` currently holds the leader slot.
    pub fn is_leader(&self, name: &str) -> bool {
        self.leader.lock().as_deref() == Some(name)
    }

    /// Current leader name, if any.
    pub fn leader(&self) -> Option<String> {
        self.leader.lock().clone()
    }

    pub fn is_leader_vacant(&self) -> bool {
        self.leader.lock().is_none()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.versions.contains_key(name)
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
