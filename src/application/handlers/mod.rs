//! OCPP 1.6 inbound action handlers (central system → charge point)
//!
//! Each `handle_*` function deserializes its payload into the matching
//! `rust_ocpp::v1_6` request type and returns the response payload.
//! [`register_all`] builds the routing table the session dispatches from.

use async_trait::async_trait;
use serde_json::Value;

use super::context::SharedContext;
use super::dispatcher::{ActionDispatcher, ActionHandler};
use crate::domain::SessionResult;

mod handle_change_configuration;
mod handle_clear_charging_profile;
mod handle_get_configuration;
mod handle_meter_values;
mod handle_remote_start_transaction;
mod handle_remote_stop_transaction;
mod handle_set_charging_profile;
mod handle_trigger_message;

pub use handle_change_configuration::handle_change_configuration;
pub use handle_clear_charging_profile::handle_clear_charging_profile;
pub use handle_get_configuration::handle_get_configuration;
pub use handle_meter_values::handle_meter_values;
pub use handle_remote_start_transaction::handle_remote_start_transaction;
pub use handle_remote_stop_transaction::handle_remote_stop_transaction;
pub use handle_set_charging_profile::handle_set_charging_profile;
pub use handle_trigger_message::{handle_trigger_message, TriggerMessageHook};

/// Binds a `handle_*` function to the shared context.
macro_rules! route {
    ($name:ident => $handler:path) => {
        struct $name(SharedContext);

        #[async_trait]
        impl ActionHandler for $name {
            async fn handle(&self, payload: Value) -> SessionResult<Value> {
                $handler(&self.0, payload).await
            }
        }
    };
}

route!(SetChargingProfile => handle_set_charging_profile);
route!(ClearChargingProfile => handle_clear_charging_profile);
route!(RemoteStartTransaction => handle_remote_start_transaction);
route!(RemoteStopTransaction => handle_remote_stop_transaction);
route!(TriggerMessage => handle_trigger_message);
route!(MeterValues => handle_meter_values);
route!(GetConfiguration => handle_get_configuration);
route!(ChangeConfiguration => handle_change_configuration);

/// Register every supported action and hook.
pub fn register_all(dispatcher: &mut ActionDispatcher, ctx: &SharedContext) -> SessionResult<()> {
    dispatcher.register("SetChargingProfile", SetChargingProfile(ctx.clone()))?;
    dispatcher.register("ClearChargingProfile", ClearChargingProfile(ctx.clone()))?;
    dispatcher.register("RemoteStartTransaction", RemoteStartTransaction(ctx.clone()))?;
    dispatcher.register("RemoteStopTransaction", RemoteStopTransaction(ctx.clone()))?;
    dispatcher.register("TriggerMessage", TriggerMessage(ctx.clone()))?;
    dispatcher.register_after("TriggerMessage", TriggerMessageHook::new(ctx.clone()))?;
    dispatcher.register("MeterValues", MeterValues(ctx.clone()))?;
    dispatcher.register("GetConfiguration", GetConfiguration(ctx.clone()))?;
    dispatcher.register("ChangeConfiguration", ChangeConfiguration(ctx.clone()))?;
    Ok(())
}
