use serde::Deserialize;
use volt_core::{NetworkState, Position, Vehicle, VehicleId};

use crate::Reply;

/// `registerUser` payload. Location and battery default to zero; some client
/// variants only send the id.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUser {
    pub id: VehicleId,
    #[serde(default)]
    pub location: Position,
    #[serde(default)]
    pub battery_level: u32,
}

pub(crate) fn register_user(state: &mut NetworkState, payload: RegisterUser) -> Reply {
    let vehicle = state.register_vehicle(Vehicle {
        id: payload.id,
        location: payload.location,
        battery_level: payload.battery_level,
    });
    Reply::ok("Vehicle registered", vehicle)
}
