use serde::Deserialize;
use volt_core::{ChargeId, NetworkState, StationId, VehicleId};

use crate::Reply;

/// `startCharging` / `endCharging` payload. The battery reading keeps its
/// snake_case wire name for client compatibility.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingRequest {
    pub station_id: StationId,
    pub user_id: VehicleId,
    #[serde(rename = "battery_level")]
    pub battery_level: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RechargeList {
    pub user_id: VehicleId,
}

/// `payment` payload. `hasPaid` is part of the historical wire shape and is
/// ignored; paying always marks the charge as paid.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub user_id: VehicleId,
    pub charge_id: ChargeId,
    #[serde(default)]
    pub has_paid: bool,
}

pub(crate) fn start_charging(state: &mut NetworkState, payload: ChargingRequest) -> Reply {
    match state.start_charging(payload.station_id, payload.user_id, payload.battery_level) {
        Ok(charge) => Reply::ok("Charging started", charge),
        Err(err) => Reply::fail(err),
    }
}

pub(crate) fn end_charging(state: &mut NetworkState, payload: ChargingRequest) -> Reply {
    match state.end_charging(payload.station_id, payload.user_id, payload.battery_level) {
        Ok(charge) => Reply::ok("Charging completed", charge),
        Err(err) => Reply::fail(err),
    }
}

pub(crate) fn recharge_list(state: &mut NetworkState, payload: RechargeList) -> Reply {
    match state.charges_for(payload.user_id) {
        Ok(charges) if charges.is_empty() => {
            Reply::ok("No charge receipts recorded for this vehicle", charges)
        }
        Ok(charges) => Reply::ok("Charge receipt list", charges),
        Err(err) => Reply::fail(err),
    }
}

pub(crate) fn payment(state: &mut NetworkState, payload: Payment) -> Reply {
    match state.pay(payload.user_id, payload.charge_id) {
        Ok(charge) => Reply::ok("Payment processed", charge),
        Err(err) => Reply::fail(err),
    }
}
