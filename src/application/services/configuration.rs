//! Configuration Store
//!
//! Owns the OCPP configuration keys. Every mutation goes through [`set`],
//! which validates the value against the key's kind; unknown keys are never
//! created.
//!
//! [`set`]: ConfigurationStore::set

use tokio::sync::RwLock;
use tracing::info;

use crate::domain::configuration::{
    known_keys, ValueKind, METER_VALUES_ALIGNED_DATA, METER_VALUES_SAMPLED_DATA,
};
use crate::domain::{ConfigurationEntry, Measurand, SessionError, SessionResult};

#[derive(Debug, Clone)]
struct Slot {
    entry: ConfigurationEntry,
    kind: ValueKind,
}

pub struct ConfigurationStore {
    slots: RwLock<Vec<Slot>>,
}

impl ConfigurationStore {
    /// Store seeded with the defaults for `vendor`.
    pub fn new(vendor: &str) -> Self {
        let slots = known_keys(vendor)
            .into_iter()
            .map(|def| Slot {
                entry: ConfigurationEntry {
                    key: def.key.to_string(),
                    value: def.default,
                    readonly: def.readonly,
                },
                kind: def.kind,
            })
            .collect();
        Self {
            slots: RwLock::new(slots),
        }
    }

    pub async fn get(&self, key: &str) -> SessionResult<String> {
        let slots = self.slots.read().await;
        slots
            .iter()
            .find(|s| s.entry.key == key)
            .map(|s| s.entry.value.clone())
            .ok_or_else(|| SessionError::UnknownConfigurationKey(key.to_string()))
    }

    pub async fn get_u64(&self, key: &str) -> SessionResult<u64> {
        let value = self.get(key).await?;
        value
            .trim()
            .parse()
            .map_err(|_| SessionError::InvalidConfigurationValue {
                key: key.to_string(),
                value,
            })
    }

    /// Validate and store `value`. The stored form is normalized
    /// (`" 7"` → `"7"`, duplicate measurands dropped).
    pub async fn set(&self, key: &str, value: &str) -> SessionResult<()> {
        let mut slots = self.slots.write().await;
        let slot = slots
            .iter_mut()
            .find(|s| s.entry.key == key)
            .ok_or_else(|| SessionError::UnknownConfigurationKey(key.to_string()))?;

        if slot.entry.readonly {
            return Err(SessionError::ReadonlyConfigurationKey(key.to_string()));
        }

        let invalid = || SessionError::InvalidConfigurationValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let normalized = match slot.kind {
            ValueKind::Integer => value.trim().parse::<u64>().map_err(|_| invalid())?.to_string(),
            ValueKind::MeasurandList => {
                let list = Measurand::parse_list(value).map_err(|_| invalid())?;
                if list.is_empty() {
                    return Err(invalid());
                }
                Measurand::join(&list)
            }
            ValueKind::Text => value.to_string(),
        };

        info!(
            key,
            old = slot.entry.value.as_str(),
            new = normalized.as_str(),
            "Configuration changed"
        );
        slot.entry.value = normalized;
        Ok(())
    }

    pub async fn list(&self) -> Vec<ConfigurationEntry> {
        self.slots
            .read()
            .await
            .iter()
            .map(|s| s.entry.clone())
            .collect()
    }

    /// Entries for `keys` plus the requested keys that are not known.
    /// An empty filter returns every entry.
    pub async fn entries(&self, keys: &[String]) -> (Vec<ConfigurationEntry>, Vec<String>) {
        if keys.is_empty() {
            return (self.list().await, Vec::new());
        }
        let slots = self.slots.read().await;
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for key in keys {
            match slots.iter().find(|s| &s.entry.key == key) {
                Some(slot) => known.push(slot.entry.clone()),
                None => unknown.push(key.clone()),
            }
        }
        (known, unknown)
    }

    /// Measurands for triggered and sampled reports.
    pub async fn sampled_measurands(&self) -> SessionResult<Vec<Measurand>> {
        self.measurands(METER_VALUES_SAMPLED_DATA).await
    }

    /// Measurands for the clock-aligned periodic report.
    pub async fn aligned_measurands(&self) -> SessionResult<Vec<Measurand>> {
        self.measurands(METER_VALUES_ALIGNED_DATA).await
    }

    async fn measurands(&self, key: &str) -> SessionResult<Vec<Measurand>> {
        let value = self.get(key).await?;
        Measurand::parse_list(&value).map_err(|_| SessionError::InvalidConfigurationValue {
            key: key.to_string(),
            value,
        })
    }
}
