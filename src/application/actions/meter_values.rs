//! MeterValues

use rust_ocpp::v1_6::messages::meter_values::MeterValuesRequest;
use rust_ocpp::v1_6::types::{self as ocpp, MeterValue, SampledValue};
use tracing::debug;

use super::encode;
use crate::application::correlator::MessageCorrelator;
use crate::domain::{
    Measurand, MeterSample, MeterSnapshot, Phase, ReadingContext, SessionResult, UnitOfMeasure,
};

const ACTION: &str = "MeterValues";

pub async fn send_meter_values(
    correlator: &MessageCorrelator,
    connector_id: u32,
    transaction_id: Option<i32>,
    snapshot: &MeterSnapshot,
) -> SessionResult<()> {
    debug!(
        connector_id,
        ?transaction_id,
        samples = snapshot.samples.len(),
        "MeterValues"
    );

    let request = MeterValuesRequest {
        connector_id,
        transaction_id,
        meter_value: vec![meter_value(snapshot)],
    };

    correlator
        .call(ACTION, encode(ACTION, &request)?)
        .await
        .map(|_| ())
}

fn meter_value(snapshot: &MeterSnapshot) -> MeterValue {
    MeterValue {
        timestamp: snapshot.timestamp,
        sampled_value: snapshot.samples.iter().map(sampled_value).collect(),
    }
}

fn sampled_value(sample: &MeterSample) -> SampledValue {
    SampledValue {
        value: sample.value.clone(),
        context: Some(match sample.context {
            ReadingContext::SamplePeriodic => ocpp::ReadingContext::SamplePeriodic,
            ReadingContext::Trigger => ocpp::ReadingContext::Trigger,
        }),
        measurand: Some(measurand_to_ocpp(sample.measurand)),
        phase: sample.phase.map(|phase| match phase {
            Phase::L1 => ocpp::Phase::L1,
            Phase::L2 => ocpp::Phase::L2,
            Phase::L3 => ocpp::Phase::L3,
        }),
        unit: Some(match sample.unit {
            UnitOfMeasure::W => ocpp::UnitOfMeasure::W,
            UnitOfMeasure::Wh => ocpp::UnitOfMeasure::Wh,
            UnitOfMeasure::A => ocpp::UnitOfMeasure::A,
            UnitOfMeasure::V => ocpp::UnitOfMeasure::V,
            UnitOfMeasure::Celsius => ocpp::UnitOfMeasure::Celsius,
            UnitOfMeasure::Percent => ocpp::UnitOfMeasure::Percent,
        }),
        ..Default::default()
    }
}

fn measurand_to_ocpp(measurand: Measurand) -> ocpp::Measurand {
    match measurand {
        Measurand::CurrentImport => ocpp::Measurand::CurrentImport,
        Measurand::Voltage => ocpp::Measurand::Voltage,
        Measurand::PowerActiveImport => ocpp::Measurand::PowerActiveImport,
        Measurand::EnergyActiveImportRegister => ocpp::Measurand::EnergyActiveImportRegister,
        Measurand::PowerOffered => ocpp::Measurand::PowerOffered,
        Measurand::Temperature => ocpp::Measurand::Temperature,
        Measurand::SoC => ocpp::Measurand::SoC,
    }
}
