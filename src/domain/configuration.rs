//! Configuration keys known to the charge point

use serde::Serialize;

use super::meter::Measurand;

pub const HEARTBEAT_INTERVAL: &str = "HeartbeatInterval";
pub const CLOCK_ALIGNED_DATA_INTERVAL: &str = "ClockAlignedDataInterval";
pub const METER_VALUE_SAMPLE_INTERVAL: &str = "MeterValueSampleInterval";
pub const METER_VALUES_SAMPLED_DATA: &str = "MeterValuesSampledData";
pub const METER_VALUES_ALIGNED_DATA: &str = "MeterValuesAlignedData";
pub const CHARGING_SCHEDULE_ALLOWED_CHARGING_RATE_UNIT: &str =
    "ChargingScheduleAllowedChargingRateUnit";

/// Vendor whose chargers only accept current-based charging schedules.
pub const CURRENT_ONLY_VENDOR: &str = "Wall Box Chargers";

pub const RATE_UNIT_CURRENT_ONLY: &str = "Current";
pub const RATE_UNIT_CURRENT_AND_POWER: &str = "Current,Power";

/// How a key's value is validated on `ChangeConfiguration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Non-negative integer (seconds).
    Integer,
    /// Comma-separated list of measurands.
    MeasurandList,
    /// Free-form text; only used by read-only keys.
    Text,
}

/// A single OCPP configuration key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationEntry {
    pub key: String,
    pub value: String,
    pub readonly: bool,
}

/// Definition of a known key with its default.
#[derive(Debug, Clone)]
pub struct KeyDefinition {
    pub key: &'static str,
    pub kind: ValueKind,
    pub readonly: bool,
    pub default: String,
}

/// Allowed charging-rate units for a given vendor identity.
pub fn allowed_rate_units(vendor: &str) -> &'static str {
    if vendor == CURRENT_ONLY_VENDOR {
        RATE_UNIT_CURRENT_ONLY
    } else {
        RATE_UNIT_CURRENT_AND_POWER
    }
}

/// Known keys in the order GetConfiguration reports them.
pub fn known_keys(vendor: &str) -> Vec<KeyDefinition> {
    let measurands = Measurand::join(&Measurand::ALL);
    vec![
        KeyDefinition {
            key: HEARTBEAT_INTERVAL,
            kind: ValueKind::Integer,
            readonly: false,
            default: "10".into(),
        },
        KeyDefinition {
            key: CLOCK_ALIGNED_DATA_INTERVAL,
            kind: ValueKind::Integer,
            readonly: false,
            default: "5".into(),
        },
        KeyDefinition {
            key: METER_VALUE_SAMPLE_INTERVAL,
            kind: ValueKind::Integer,
            readonly: false,
            default: "0".into(),
        },
        KeyDefinition {
            key: METER_VALUES_SAMPLED_DATA,
            kind: ValueKind::MeasurandList,
            readonly: false,
            default: measurands.clone(),
        },
        KeyDefinition {
            key: METER_VALUES_ALIGNED_DATA,
            kind: ValueKind::MeasurandList,
            readonly: false,
            default: measurands,
        },
        KeyDefinition {
            key: CHARGING_SCHEDULE_ALLOWED_CHARGING_RATE_UNIT,
            kind: ValueKind::Text,
            readonly: true,
            default: allowed_rate_units(vendor).into(),
        },
    ]
}
