//! # Device Registry
//!
//! Single source of truth for known devices, keyed by identity rather
//! than address so DHCP churn never duplicates a plug. Writers go
//! through the merge/forget/rename mutations; readers take sorted
//! snapshots.

use std::collections::HashMap;

use tokio::sync::RwLock;

use plugscout_common::device::{Device, DeviceId, DeviceIdentity};
use plugscout_common::discovery::MergeOutcome;
use plugscout_common::error::HubError;

#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<HashMap<DeviceId, Device>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a sighting into the registry. An existing identity is
    /// updated in place; a new one is inserted with `alias` attached.
    pub async fn merge(&self, identity: DeviceIdentity, alias: Option<String>) -> MergeOutcome {
        let mut devices = self.devices.write().await;
        if let Some(device) = devices.get_mut(&identity.id) {
            let id = identity.id.clone();
            device.absorb(identity);
            return MergeOutcome::AlreadyKnown(id);
        }
        let id = identity.id.clone();
        devices.insert(id.clone(), Device::from_identity(identity, alias));
        MergeOutcome::Added(id)
    }

    pub async fn get(&self, id: &DeviceId) -> Option<Device> {
        self.devices.read().await.get(id).cloned()
    }

    /// Every device, sorted by display name (case-insensitive), ties
    /// broken by identity so the order is stable.
    pub async fn snapshot(&self) -> Vec<Device> {
        let mut devices: Vec<Device> = self.devices.read().await.values().cloned().collect();
        devices.sort_by(|a, b| {
            a.display_name()
                .to_lowercase()
                .cmp(&b.display_name().to_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });
        devices
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    pub async fn forget(&self, id: &DeviceId) -> Result<Device, HubError> {
        self.devices
            .write()
            .await
            .remove(id)
            .ok_or_else(|| HubError::UnknownDevice(id.clone()))
    }

    pub async fn forget_all(&self) -> Vec<Device> {
        self.devices.write().await.drain().map(|(_, d)| d).collect()
    }

    /// Set or clear a device's alias.
    pub async fn rename(&self, id: &DeviceId, alias: Option<String>) -> Result<Device, HubError> {
        let mut devices = self.devices.write().await;
        let device = devices
            .get_mut(id)
            .ok_or_else(|| HubError::UnknownDevice(id.clone()))?;
        device.alias = alias;
        Ok(device.clone())
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
