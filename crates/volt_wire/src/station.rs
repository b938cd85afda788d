use serde::{Deserialize, Deserializer, de};
use volt_core::{NetworkState, Position, StationId, StationStatus, Vehicle, VehicleId};

use crate::Reply;

/// `registerStation` payload. Clients send the full station shape, but a new
/// station starts with empty queues, so both lists must arrive empty.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStation {
    pub id: StationId,
    pub location: Position,
    #[serde(flatten)]
    pub status: StationStatus,
    #[serde(default, deserialize_with = "empty_id_list")]
    pub reservations: Vec<VehicleId>,
    #[serde(default, deserialize_with = "empty_id_list")]
    pub suggestions: Vec<VehicleId>,
}

fn empty_id_list<'de, D>(deserializer: D) -> Result<Vec<VehicleId>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = Vec::<VehicleId>::deserialize(deserializer)?;
    if !ids.is_empty() {
        return Err(de::Error::custom("must be empty at registration"));
    }
    Ok(ids)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reserve {
    pub user_id: VehicleId,
    pub station_id: StationId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetStationInfo {
    pub id: StationId,
}

pub(crate) fn register_station(state: &mut NetworkState, payload: RegisterStation) -> Reply {
    // A freshly registered station cannot already reference a charge.
    if matches!(payload.status, StationStatus::Charging { .. }) {
        return Reply::invalid("a station cannot be registered in the charging state");
    }
    match state.register_station(payload.id, payload.location, payload.status) {
        Ok(station) => Reply::ok("Station registered", station),
        Err(err) => Reply::fail(err),
    }
}

pub(crate) fn get_suggestions(state: &mut NetworkState, payload: Vehicle) -> Reply {
    let ranked = state.suggestions(&payload);
    Reply::ok("Ranked station suggestions", ranked)
}

pub(crate) fn reserve(state: &mut NetworkState, payload: Reserve) -> Reply {
    match state.reserve(payload.station_id, payload.user_id) {
        Ok(()) => Reply::ack(format!("Reserved station {}", payload.station_id)),
        Err(err) => Reply::fail(err),
    }
}

pub(crate) fn get_station_info(state: &mut NetworkState, payload: GetStationInfo) -> Reply {
    match state.station_info(payload.id) {
        Ok(station) => Reply::ok("Station info", station),
        Err(err) => Reply::fail(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCode;
    use serde_json::json;
    use volt_core::{NetworkConfig, StationSeed};

    fn test_state() -> NetworkState {
        NetworkState::new(NetworkConfig {
            max_radius: 8000.0,
            stations: vec![
                StationSeed {
                    id: 2,
                    location: Position { x: 200, y: 50 },
                },
                StationSeed {
                    id: 12,
                    location: Position { x: 0, y: 1 },
                },
            ],
        })
    }

    fn registration(id: u64) -> serde_json::Value {
        json!({
            "id": id,
            "location": {"x": 23, "y": 68},
            "state": "available",
            "reservations": [],
            "suggestions": []
        })
    }

    #[test]
    fn registers_a_station_from_the_wire_shape() {
        let mut state = test_state();
        let payload: RegisterStation = serde_json::from_value(registration(45)).unwrap();
        let reply = register_station(&mut state, payload);
        assert!(reply.success);
        assert_eq!(reply.data.unwrap()["state"], "available");
        assert!(state.stations().contains_key(&45));
    }

    #[test]
    fn duplicate_station_ids_are_a_conflict() {
        let mut state = test_state();
        let payload: RegisterStation = serde_json::from_value(registration(2)).unwrap();
        let reply = register_station(&mut state, payload);
        assert!(!reply.success);
        assert_eq!(reply.error.unwrap().code, ErrorCode::Conflict);
    }

    #[test]
    fn registration_rejects_non_empty_queues() {
        let result = serde_json::from_value::<RegisterStation>(json!({
            "id": 45,
            "location": {"x": 0, "y": 0},
            "state": "available",
            "reservations": [7],
            "suggestions": []
        }));
        assert!(result.is_err());
    }

    #[test]
    fn registration_rejects_the_charging_state() {
        let mut state = test_state();
        let payload: RegisterStation = serde_json::from_value(json!({
            "id": 45,
            "location": {"x": 0, "y": 0},
            "state": "charging",
            "activeChargeId": 0,
            "reservations": [],
            "suggestions": []
        }))
        .unwrap();
        let reply = register_station(&mut state, payload);
        assert!(!reply.success);
        assert_eq!(reply.error.unwrap().code, ErrorCode::InvalidRequest);
        assert!(!state.stations().contains_key(&45));
    }

    #[test]
    fn suggestions_reply_with_the_ranked_list() {
        let mut state = test_state();
        let payload: Vehicle =
            serde_json::from_value(json!({"id": 7, "location": {"x": 0, "y": 0}})).unwrap();
        let reply = get_suggestions(&mut state, payload);
        assert!(reply.success);
        let ranked = reply.data.unwrap();
        assert_eq!(ranked[0]["id"], 12);
        assert_eq!(ranked[1]["id"], 2);
    }

    #[test]
    fn reserve_acks_without_data() {
        let mut state = test_state();
        state.register_vehicle(Vehicle {
            id: 7,
            location: Position { x: 0, y: 0 },
            battery_level: 50,
        });
        let payload: Reserve =
            serde_json::from_value(json!({"userId": 7, "stationId": 2})).unwrap();
        let reply = reserve(&mut state, payload);
        assert!(reply.success);
        assert!(reply.data.is_none());
    }

    #[test]
    fn reserve_on_an_unknown_station_is_not_found() {
        let mut state = test_state();
        let payload: Reserve =
            serde_json::from_value(json!({"userId": 7, "stationId": 999})).unwrap();
        let reply = reserve(&mut state, payload);
        assert!(!reply.success);
        assert_eq!(reply.error.unwrap().code, ErrorCode::NotFound);
    }

    #[test]
    fn station_info_returns_the_wire_station() {
        let mut state = test_state();
        let payload: GetStationInfo = serde_json::from_value(json!({"id": 2})).unwrap();
        let reply = get_station_info(&mut state, payload);
        assert!(reply.success);
        let station = reply.data.unwrap();
        assert_eq!(station["location"]["x"], 200);
        assert_eq!(station["state"], "available");
    }
}
