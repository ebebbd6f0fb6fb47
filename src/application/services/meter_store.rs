//! Meter Value Store
//!
//! Single owner of the simulated meter readings. Every mutation happens
//! under one write lock, so a snapshot never mixes two profiles.

use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::domain::meter::{boot_readings, format_decimal, Reading};
use crate::domain::{
    Measurand, MeterProfile, MeterSample, MeterSnapshot, Phase, PowerCap, ReadingContext,
};

pub struct MeterValueStore {
    readings: RwLock<Vec<Reading>>,
}

impl Default for MeterValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MeterValueStore {
    pub fn new() -> Self {
        Self {
            readings: RwLock::new(boot_readings()),
        }
    }

    /// Samples for every tracked slot whose measurand is in `measurands`,
    /// in slot order.
    pub async fn snapshot(&self, measurands: &[Measurand], context: ReadingContext) -> MeterSnapshot {
        let readings = self.readings.read().await;
        MeterSnapshot {
            timestamp: Utc::now(),
            samples: readings
                .iter()
                .filter(|r| measurands.contains(&r.measurand))
                .map(|r| MeterSample::from_reading(r, context))
                .collect(),
        }
    }

    pub async fn apply_profile(&self, profile: MeterProfile) {
        let mut readings = self.readings.write().await;
        for reading in readings.iter_mut() {
            reading.value = reading.baseline(profile);
        }
        info!(?profile, "Meter profile applied");
    }

    pub async fn value_of(&self, measurand: Measurand, phase: Option<Phase>) -> Option<Decimal> {
        let readings = self.readings.read().await;
        find(&readings, measurand, phase).map(|r| r.value)
    }

    pub async fn power_active_import(&self) -> Decimal {
        self.value_of(Measurand::PowerActiveImport, None)
            .await
            .unwrap_or_default()
    }

    pub async fn voltage_l1(&self) -> Decimal {
        self.value_of(Measurand::Voltage, Some(Phase::L1))
            .await
            .unwrap_or_default()
    }

    pub async fn energy_register_wh(&self) -> Decimal {
        self.value_of(Measurand::EnergyActiveImportRegister, None)
            .await
            .unwrap_or_default()
    }

    pub async fn set_power_active_import(&self, value: Decimal) {
        let mut readings = self.readings.write().await;
        if let Some(r) = find_mut(&mut readings, Measurand::PowerActiveImport, None) {
            debug!(value = %format_decimal(value), "Power.Active.Import set");
            r.value = value;
        }
    }

    /// Replace the active import with the limit computed by `to_watts` from
    /// the L1 voltage, in one atomic step. Nothing changes when no power is
    /// flowing or `to_watts` yields `None`.
    pub async fn cap_power_active_import(
        &self,
        to_watts: impl FnOnce(Decimal) -> Option<Decimal>,
    ) -> Option<PowerCap> {
        let mut readings = self.readings.write().await;
        let voltage = find(&readings, Measurand::Voltage, Some(Phase::L1))
            .map(|r| r.value)
            .unwrap_or_default();
        let slot = find_mut(&mut readings, Measurand::PowerActiveImport, None)?;
        if slot.value.is_zero() {
            return None;
        }
        let applied = to_watts(voltage)?.normalize();
        let cap = PowerCap {
            previous: slot.value,
            applied,
        };
        slot.value = applied;
        Some(cap)
    }

    /// Write `value` back unless the meter has gone idle meanwhile.
    pub async fn restore_power_active_import_if_active(&self, value: Decimal) -> bool {
        let mut readings = self.readings.write().await;
        match find_mut(&mut readings, Measurand::PowerActiveImport, None) {
            Some(slot) if !slot.value.is_zero() => {
                slot.value = value;
                true
            }
            _ => false,
        }
    }
}

fn find(readings: &[Reading], measurand: Measurand, phase: Option<Phase>) -> Option<&Reading> {
    readings
        .iter()
        .find(|r| r.measurand == measurand && r.phase == phase)
}

fn find_mut(
    readings: &mut [Reading],
    measurand: Measurand,
    phase: Option<Phase>,
) -> Option<&mut Reading> {
    readings
        .iter_mut()
        .find(|r| r.measurand == measurand && r.phase == phase)
}
