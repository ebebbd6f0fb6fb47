//! Meter value model and the canned baselines the simulator reports.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Measurands the simulated meter can sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Measurand {
    CurrentImport,
    Voltage,
    PowerActiveImport,
    EnergyActiveImportRegister,
    PowerOffered,
    Temperature,
    SoC,
}

impl Measurand {
    pub const ALL: [Measurand; 7] = [
        Measurand::CurrentImport,
        Measurand::Voltage,
        Measurand::PowerActiveImport,
        Measurand::EnergyActiveImportRegister,
        Measurand::PowerOffered,
        Measurand::Temperature,
        Measurand::SoC,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentImport => "Current.Import",
            Self::Voltage => "Voltage",
            Self::PowerActiveImport => "Power.Active.Import",
            Self::EnergyActiveImportRegister => "Energy.Active.Import.Register",
            Self::PowerOffered => "Power.Offered",
            Self::Temperature => "Temperature",
            Self::SoC => "SoC",
        }
    }

    /// Parse a comma-separated measurand list, as used by the
    /// `MeterValues*Data` configuration keys. Returns the offending
    /// entry on failure.
    pub fn parse_list(csv: &str) -> Result<Vec<Measurand>, String> {
        let mut out = Vec::new();
        for item in csv.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let m = item.parse::<Measurand>().map_err(|_| item.to_string())?;
            if !out.contains(&m) {
                out.push(m);
            }
        }
        Ok(out)
    }

    pub fn join(list: &[Measurand]) -> String {
        list.iter()
            .map(Measurand::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromStr for Measurand {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Measurand::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Measurand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    L1,
    L2,
    L3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfMeasure {
    W,
    Wh,
    A,
    V,
    Celsius,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadingContext {
    SamplePeriodic,
    Trigger,
}

/// The two canned baselines the meter switches between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterProfile {
    Idle,
    Charging,
}

/// One tracked measurand slot and its current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub measurand: Measurand,
    pub phase: Option<Phase>,
    pub unit: UnitOfMeasure,
    pub value: Decimal,
}

impl Reading {
    fn new(measurand: Measurand, phase: Option<Phase>, unit: UnitOfMeasure, value: Decimal) -> Self {
        Self {
            measurand,
            phase,
            unit,
            value,
        }
    }

    /// Baseline value of this slot under `profile`.
    pub fn baseline(&self, profile: MeterProfile) -> Decimal {
        use Measurand::*;
        let charging = profile == MeterProfile::Charging;
        match self.measurand {
            PowerActiveImport if charging => Decimal::new(7400, 0),
            CurrentImport if charging => Decimal::new(32, 0),
            Voltage if charging => Decimal::new(220, 0),
            Temperature if charging => Decimal::new(50, 0),
            PowerActiveImport | CurrentImport | Voltage | Temperature => Decimal::ZERO,
            EnergyActiveImportRegister => Decimal::new(18569, 0),
            PowerOffered => Decimal::new(25, 2),
            SoC => Decimal::new(57, 0),
        }
    }
}

/// Readings at process start, before any transaction ran.
pub fn boot_readings() -> Vec<Reading> {
    use Measurand::*;
    vec![
        Reading::new(PowerActiveImport, None, UnitOfMeasure::W, Decimal::ZERO),
        Reading::new(CurrentImport, None, UnitOfMeasure::A, Decimal::ZERO),
        Reading::new(Voltage, Some(Phase::L1), UnitOfMeasure::V, Decimal::ZERO),
        Reading::new(Voltage, Some(Phase::L2), UnitOfMeasure::V, Decimal::ZERO),
        Reading::new(Voltage, Some(Phase::L3), UnitOfMeasure::V, Decimal::ZERO),
        Reading::new(EnergyActiveImportRegister, None, UnitOfMeasure::Wh, Decimal::new(8567, 0)),
        Reading::new(PowerOffered, None, UnitOfMeasure::W, Decimal::ZERO),
        Reading::new(Temperature, None, UnitOfMeasure::Celsius, Decimal::new(50, 0)),
        Reading::new(SoC, None, UnitOfMeasure::Percent, Decimal::new(57, 0)),
    ]
}

/// One reading as reported: value rendered, context attached.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSample {
    pub value: String,
    pub context: ReadingContext,
    pub measurand: Measurand,
    pub phase: Option<Phase>,
    pub unit: UnitOfMeasure,
}

impl MeterSample {
    pub fn from_reading(reading: &Reading, context: ReadingContext) -> Self {
        Self {
            value: format_decimal(reading.value),
            context,
            measurand: reading.measurand,
            phase: reading.phase,
            unit: reading.unit,
        }
    }
}

/// Samples taken at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSnapshot {
    pub timestamp: DateTime<Utc>,
    pub samples: Vec<MeterSample>,
}

impl MeterSnapshot {
    pub fn value_of(&self, measurand: Measurand, phase: Option<Phase>) -> Option<&str> {
        self.samples
            .iter()
            .find(|s| s.measurand == measurand && s.phase == phase)
            .map(|s| s.value.as_str())
    }
}

/// Render without trailing zeros: `2200.0` → `"2200"`, `0.250` → `"0.25"`.
pub fn format_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurand_list_parsing() {
        let list = Measurand::parse_list("Voltage, SoC,Voltage").unwrap();
        assert_eq!(list, vec![Measurand::Voltage, Measurand::SoC]);
        assert_eq!(
            Measurand::parse_list("Voltage,Frequency").unwrap_err(),
            "Frequency"
        );
        assert_eq!(Measurand::join(&list), "Voltage,SoC");
    }

    #[test]
    fn charging_baseline_matches_simulated_charger() {
        let readings = boot_readings();
        let power = &readings[0];
        assert_eq!(power.baseline(MeterProfile::Charging), Decimal::new(7400, 0));
        assert_eq!(power.baseline(MeterProfile::Idle), Decimal::ZERO);
        let l1 = &readings[2];
        assert_eq!(l1.baseline(MeterProfile::Charging), Decimal::new(220, 0));
    }

    #[test]
    fn sample_carries_reading_slot() {
        let reading = &boot_readings()[2];
        let sample = MeterSample::from_reading(reading, ReadingContext::SamplePeriodic);
        assert_eq!(sample.measurand, Measurand::Voltage);
        assert_eq!(sample.phase, Some(Phase::L1));
        assert_eq!(sample.unit, UnitOfMeasure::V);
        assert_eq!(sample.context, ReadingContext::SamplePeriodic);
        assert_eq!(sample.value, "0");

        let soc = MeterSample::from_reading(&boot_readings()[8], ReadingContext::Trigger);
        assert_eq!(soc.phase, None);
        assert_eq!(soc.value, "57");
    }

    #[test]
    fn decimal_formatting_drops_trailing_zeros() {
        assert_eq!(format_decimal(Decimal::new(22000, 1)), "2200");
        assert_eq!(format_decimal(Decimal::new(250, 3)), "0.25");
        assert_eq!(format_decimal(Decimal::ZERO), "0");
    }
}
