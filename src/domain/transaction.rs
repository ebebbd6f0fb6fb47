//! Transaction domain model

use chrono::{DateTime, Utc};

/// A charging transaction, from an accepted StartTransaction until the
/// matching StopTransaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Assigned by the central system.
    pub transaction_id: i32,
    pub connector_id: u32,
    pub id_tag: String,
    pub meter_start: i32,
    pub started_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(transaction_id: i32, connector_id: u32, id_tag: impl Into<String>, meter_start: i32) -> Self {
        Self {
            transaction_id,
            connector_id,
            id_tag: id_tag.into(),
            meter_start,
            started_at: Utc::now(),
        }
    }

    /// Energy delivered so far in Wh, given the current register value.
    pub fn energy_delivered(&self, meter_now: i32) -> i32 {
        (meter_now - self.meter_start).max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn energy_delivered_never_negative() {
        let tx = Transaction::new(7, 1, "TAG-001", 8567);
        assert_eq!(tx.energy_delivered(18569), 10002);
        assert_eq!(tx.energy_delivered(100), 0);
        assert!(tx.started_at <= Utc::now());
    }
}
