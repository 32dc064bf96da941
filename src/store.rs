// src/store.rs
//! Device list repository. The poller only reads snapshots; adds and
//! removals come from the management side.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::error::{Error, Result};
use crate::types::Device;

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Copy of the current list, in insertion order.
    async fn list(&self) -> Result<Vec<Device>>;
    /// Inserts, or replaces in place a record with the same `device_id`.
    async fn add(&self, device: Device) -> Result<()>;
    /// Returns false when no such device exists.
    async fn remove(&self, device_id: &str) -> Result<bool>;
}

fn upsert(devices: &mut Vec<Device>, device: Device) {
    match devices.iter_mut().find(|d| d.device_id == device.device_id) {
        Some(existing) => *existing = device,
        None => devices.push(device),
    }
}

fn delete(devices: &mut Vec<Device>, device_id: &str) -> bool {
    let before = devices.len();
    devices.retain(|d| d.device_id != device_id);
    devices.len() != before
}

#[derive(Default)]
pub struct MemoryDeviceStore {
    devices: RwLock<Vec<Device>>,
}

impl MemoryDeviceStore {
    pub fn new(devices: Vec<Device>) -> Self {
        Self {
            devices: RwLock::new(devices),
        }
    }
}

#[async_trait]
impl DeviceRepository for MemoryDeviceStore {
    async fn list(&self) -> Result<Vec<Device>> {
        Ok(self.devices.read().await.clone())
    }

    async fn add(&self, device: Device) -> Result<()> {
        upsert(&mut *self.devices.write().await, device);
        Ok(())
    }

    async fn remove(&self, device_id: &str) -> Result<bool> {
        Ok(delete(&mut *self.devices.write().await, device_id))
    }
}

/// JSON array of devices on disk, mirrored in memory. Each mutation rewrites
/// the whole file through a temp file and rename.
pub struct JsonFileDeviceStore {
    path: PathBuf,
    devices: RwLock<Vec<Device>>,
}

impl JsonFileDeviceStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let devices = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Vec::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Error::Store(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!("loaded {} device(s) from {}", devices.len(), path.display());
        Ok(Self {
            path,
            devices: RwLock::new(devices),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, devices: &[Device]) -> Result<()> {
        let json = serde_json::to_vec_pretty(devices)
            .map_err(|e| Error::Store(e.to_string()))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DeviceRepository for JsonFileDeviceStore {
    async fn list(&self) -> Result<Vec<Device>> {
        Ok(self.devices.read().await.clone())
    }

    async fn add(&self, device: Device) -> Result<()> {
        let mut devices = self.devices.write().await;
        let mut next = devices.clone();
        upsert(&mut next, device);
        self.persist(&next).await?;
        *devices = next;
        Ok(())
    }

    async fn remove(&self, device_id: &str) -> Result<bool> {
        let mut devices = self.devices.write().await;
        let mut next = devices.clone();
        if !delete(&mut next, device_id) {
            return Ok(false);
        }
        self.persist(&next).await?;
        *devices = next;
        Ok(true)
    }
}
