//! Power limits derived from SetChargingProfile

use std::time::Duration;

use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Ampere,
    Watt,
}

/// The single schedule period this simulator honours.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerLimitRequest {
    pub unit: RateUnit,
    pub limit: Decimal,
    /// `None` keeps the cap until ClearChargingProfile.
    pub duration: Option<Duration>,
}

impl PowerLimitRequest {
    /// Limit in Watts, using the L1 voltage to convert a current limit.
    /// `None` when the request cannot produce a positive power.
    pub fn watts(&self, voltage_l1: Decimal) -> Option<Decimal> {
        let watts = match self.unit {
            RateUnit::Watt => self.limit,
            RateUnit::Ampere => self.limit * voltage_l1,
        };
        (watts > Decimal::ZERO).then_some(watts)
    }
}

/// A cap applied to Power.Active.Import.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerCap {
    /// Value to write back when the cap expires.
    pub previous: Decimal,
    pub applied: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitOutcome {
    Accepted,
    Rejected,
}
