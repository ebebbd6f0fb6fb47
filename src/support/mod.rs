pub mod ocpp_frame;
pub mod shutdown;
pub mod telemetry;

#[cfg(test)]
pub mod testing;
