//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`ConfigPort`] and [`StoragePort`].
//!
//! - **`target_os = "espidf"`**: `EspNvs` handles on the default NVS
//!   partition, opened per call on the requested namespace.  Each
//!   `set_blob` is committed atomically by ESP-IDF.
//! - **`not(target_os = "espidf")`**: an in-memory map keyed by
//!   `namespace::key` (dev/test only).
//!
//! Namespaces: `smartsafe` holds the config blob, `safe` holds the PIN.

use log::{info, warn};

use crate::app::motion::{MOVEMENT_THRESHOLD_MAX, MOVEMENT_THRESHOLD_MIN};
use crate::app::pin;
use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::SystemConfig;

use super::utils::is_printable_ascii;

#[cfg(not(target_os = "espidf"))]
use std::{cell::RefCell, collections::HashMap};

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{ESP_ERR_NVS_NOT_ENOUGH_SPACE, EspError, esp_err_t};

const CONFIG_NAMESPACE: &str = "smartsafe";
const CONFIG_KEY: &str = "syscfg";
/// Upper bound on the postcard-encoded config.
const MAX_CONFIG_BLOB: usize = 512;

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    partition: EspDefaultNvsPartition,
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Wrap the default NVS partition (already initialised by
    /// `EspDefaultNvsPartition::take()`).
    #[cfg(target_os = "espidf")]
    pub fn new(partition: EspDefaultNvsPartition) -> Self {
        info!("NvsAdapter: ESP-IDF NVS");
        Self { partition }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        info!("NvsAdapter: simulation backend");
        Self {
            store: RefCell::new(HashMap::new()),
        }
    }

    #[cfg(target_os = "espidf")]
    fn open(&self, namespace: &str, read_write: bool) -> Result<EspNvs<esp_idf_svc::nvs::NvsDefault>, StorageError> {
        EspNvs::new(self.partition.clone(), namespace, read_write).map_err(|e| {
            warn!("NvsAdapter: open '{}' failed: {}", namespace, e);
            StorageError::IoError
        })
    }

    #[cfg(target_os = "espidf")]
    fn get(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let nvs = self.open(namespace, false)?;
        match nvs.get_blob(key, buf) {
            Ok(Some(data)) => Ok(data.len()),
            Ok(None) => Err(StorageError::NotFound),
            Err(e) => Err(storage_error(&e)),
        }
    }

    #[cfg(target_os = "espidf")]
    fn put(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let mut nvs = self.open(namespace, true)?;
        nvs.set_blob(key, data).map_err(|e| storage_error(&e))
    }

    #[cfg(target_os = "espidf")]
    fn erase(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        let mut nvs = self.open(namespace, true)?;
        nvs.remove(key).map(|_| ()).map_err(|e| storage_error(&e))
    }

    #[cfg(target_os = "espidf")]
    fn contains(&self, namespace: &str, key: &str) -> bool {
        self.open(namespace, false)
            .ok()
            .and_then(|nvs| nvs.contains(key).ok())
            .unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    #[cfg(not(target_os = "espidf"))]
    fn get(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let store = self.store.borrow();
        let data = store
            .get(&Self::composite_key(namespace, key))
            .ok_or(StorageError::NotFound)?;
        let len = data.len().min(buf.len());
        buf[..len].copy_from_slice(&data[..len]);
        Ok(len)
    }

    #[cfg(not(target_os = "espidf"))]
    fn put(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(namespace, key), data.to_vec());
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn erase(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .remove(&Self::composite_key(namespace, key));
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn contains(&self, namespace: &str, key: &str) -> bool {
        self.store
            .borrow()
            .contains_key(&Self::composite_key(namespace, key))
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "espidf")]
fn storage_error(e: &EspError) -> StorageError {
    if e.code() == ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t {
        StorageError::Full
    } else {
        warn!("NvsAdapter: {}", e);
        StorageError::IoError
    }
}

/// Range checks applied before a config is persisted.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if cfg.device_id.is_empty() {
        return Err(ConfigError::ValidationFailed("device_id must not be empty"));
    }
    if cfg.topic_prefix.is_empty() {
        return Err(ConfigError::ValidationFailed("topic_prefix must not be empty"));
    }
    for segment in [cfg.device_id.as_str(), cfg.topic_prefix.as_str()] {
        if !is_printable_ascii(segment) || segment.contains(['/', '+', '#', ' ']) {
            return Err(ConfigError::ValidationFailed(
                "topic segments must be printable and free of '/', '+', '#'",
            ));
        }
    }
    if !pin::validate(&cfg.default_pin) {
        return Err(ConfigError::ValidationFailed(
            "default_pin must be exactly 4 digits",
        ));
    }
    if !(1..=10).contains(&cfg.max_wrong_attempts) {
        return Err(ConfigError::ValidationFailed(
            "max_wrong_attempts must be 1–10",
        ));
    }
    if !(MOVEMENT_THRESHOLD_MIN..=MOVEMENT_THRESHOLD_MAX).contains(&cfg.movement_threshold) {
        return Err(ConfigError::ValidationFailed(
            "movement_threshold must be 17000–45000",
        ));
    }
    if cfg.alarm_flash_interval_ms == 0 {
        return Err(ConfigError::ValidationFailed(
            "alarm_flash_interval_ms must be non-zero",
        ));
    }
    if cfg.sweep_interval_ms == 0 || cfg.sweep_interval_ms >= cfg.ack_timeout_ms {
        return Err(ConfigError::ValidationFailed(
            "sweep_interval_ms must be non-zero and < ack_timeout_ms",
        ));
    }
    if cfg.control_poll_ms == 0 || cfg.control_poll_ms >= cfg.watchdog_timeout_ms {
        return Err(ConfigError::ValidationFailed(
            "control_poll_ms must be non-zero and < watchdog_timeout_ms",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        let mut buf = [0u8; MAX_CONFIG_BLOB];
        match self.get(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => {
                let cfg: SystemConfig =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config ({} bytes)", len);
                Ok(cfg)
            }
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
            Err(e) => {
                warn!("NvsAdapter: config read error ({}), using defaults", e);
                Ok(SystemConfig::default())
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_CONFIG_BLOB {
            return Err(ConfigError::IoError);
        }
        self.put(CONFIG_NAMESPACE, CONFIG_KEY, &bytes)
            .map_err(|_| ConfigError::IoError)?;
        info!("NvsAdapter: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.get(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.put(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.erase(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.contains(namespace, key)
    }
}
