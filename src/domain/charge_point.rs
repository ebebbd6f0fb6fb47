//! Charge point identity sent in BootNotification

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChargePointIdentity {
    /// Identity used in the connection path.
    pub id: String,
    pub vendor: String,
    pub model: String,
    pub charge_box_serial_number: Option<String>,
    pub charge_point_serial_number: Option<String>,
    pub firmware_version: Option<String>,
    pub iccid: Option<String>,
    pub imsi: Option<String>,
    pub meter_serial_number: Option<String>,
    pub meter_type: Option<String>,
}

impl Default for ChargePointIdentity {
    fn default() -> Self {
        Self {
            id: "CP_1".into(),
            vendor: "Test".into(),
            model: "Simulator".into(),
            charge_box_serial_number: Some("1337".into()),
            charge_point_serial_number: Some("001".into()),
            firmware_version: Some("0.0.1".into()),
            iccid: Some("FED42".into()),
            imsi: Some("1234ABCD".into()),
            meter_serial_number: Some("1A2B3C4D".into()),
            meter_type: Some("test_meter".into()),
        }
    }
}
