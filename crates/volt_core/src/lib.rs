mod models;
mod recommend;

pub use crate::models::*;
use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;

/// Price per battery percentage point. A session's final cost is the delta
/// between the end and start battery readings times this rate.
pub const COST_PER_BATTERY_PERCENT: f64 = 6.02;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NetworkError {
    #[error("vehicle {vehicle_id} is not registered")]
    VehicleNotFound { vehicle_id: VehicleId },
    #[error("station {station_id} is not registered")]
    StationNotFound { station_id: StationId },
    #[error("station id {station_id} already belongs to another station")]
    DuplicateStation { station_id: StationId },
    #[error("vehicle {vehicle_id} already holds a reservation at station {station_id}")]
    AlreadyReserved {
        vehicle_id: VehicleId,
        station_id: StationId,
    },
    #[error("station {station_id} is already charging a vehicle")]
    StationBusy { station_id: StationId },
    #[error("station {station_id} is reserved for another vehicle")]
    NotHeadOfQueue {
        station_id: StationId,
        vehicle_id: VehicleId,
    },
    #[error("vehicle {vehicle_id} already has an open charge")]
    AlreadyCharging { vehicle_id: VehicleId },
    #[error("station {station_id} is not charging a vehicle")]
    NotCharging { station_id: StationId },
    #[error("charge {charge_id} does not exist")]
    ChargeNotFound { charge_id: ChargeId },
    #[error("charge {charge_id} belongs to another vehicle")]
    ChargeOwnership {
        charge_id: ChargeId,
        vehicle_id: VehicleId,
    },
    #[error("charge {charge_id} has already been paid")]
    AlreadyPaid { charge_id: ChargeId },
}

/// The whole charging network: every station, vehicle and charge receipt,
/// plus the suggestion radius. All mutation goes through this type; callers
/// that serve connections concurrently must wrap it in a single lock.
#[derive(Debug, Clone)]
pub struct NetworkState {
    stations: HashMap<StationId, Station>,
    vehicles: HashMap<VehicleId, Vehicle>,
    charges: HashMap<ChargeId, Charge>,
    next_charge_id: ChargeId,
    max_radius: f64,
}

impl NetworkState {
    pub fn new(config: NetworkConfig) -> Self {
        let stations = config
            .stations
            .iter()
            .map(|seed| {
                (
                    seed.id,
                    Station::new(seed.id, seed.location, StationStatus::Available),
                )
            })
            .collect();
        NetworkState {
            stations,
            vehicles: HashMap::new(),
            charges: HashMap::new(),
            next_charge_id: 0,
            max_radius: config.max_radius,
        }
    }

    pub fn stations(&self) -> &HashMap<StationId, Station> {
        &self.stations
    }

    pub fn vehicles(&self) -> &HashMap<VehicleId, Vehicle> {
        &self.vehicles
    }

    pub fn charges(&self) -> &HashMap<ChargeId, Charge> {
        &self.charges
    }

    /// Register a vehicle. Re-registering an id overwrites the previous
    /// record; vehicles are never rejected or deleted.
    pub fn register_vehicle(&mut self, vehicle: Vehicle) -> Vehicle {
        tracing::info!("Registering vehicle {}", vehicle.id);
        self.vehicles.insert(vehicle.id, vehicle.clone());
        vehicle
    }

    /// Register a station with empty queues. Station ids are permanent, so a
    /// duplicate id is rejected instead of overwritten.
    pub fn register_station(
        &mut self,
        id: StationId,
        location: Position,
        status: StationStatus,
    ) -> Result<Station, NetworkError> {
        tracing::info!("Registering station {}", id);
        if self.stations.contains_key(&id) {
            return Err(NetworkError::DuplicateStation { station_id: id });
        }
        let station = Station::new(id, location, status);
        self.stations.insert(id, station.clone());
        Ok(station)
    }

    /// Rank every station within the suggestion radius for `vehicle`,
    /// best-first, and remember that the winner was suggested to it.
    ///
    /// The vehicle is a caller-supplied snapshot and does not have to be
    /// registered. Each call first clears the vehicle's previous pending
    /// suggestion, so a vehicle holds at most one network-wide.
    pub fn suggestions(&mut self, vehicle: &Vehicle) -> Vec<Station> {
        tracing::info!("Computing suggestions for vehicle {}", vehicle.id);
        for station in self.stations.values_mut() {
            if station.suggestions.remove(&vehicle.id) {
                break;
            }
        }

        let mut ranked: Vec<Station> = self
            .stations
            .values()
            .filter(|station| station.location.distance_to(vehicle.location) <= self.max_radius)
            .cloned()
            .collect();
        recommend::rank(&mut ranked, vehicle.location);

        if let Some(top) = ranked.first_mut() {
            top.suggestions.insert(vehicle.id);
            let top_id = top.id;
            self.stations
                .get_mut(&top_id)
                .expect("ranked stations come from the station map")
                .suggestions
                .insert(vehicle.id);
        }
        ranked
    }

    /// Queue `vehicle_id` at a station. A vehicle may wait at only one
    /// station network-wide; repeating a reservation it already holds
    /// succeeds without touching the queue.
    pub fn reserve(
        &mut self,
        station_id: StationId,
        vehicle_id: VehicleId,
    ) -> Result<(), NetworkError> {
        tracing::info!("Vehicle {} reserving station {}", vehicle_id, station_id);
        if !self.stations.contains_key(&station_id) {
            return Err(NetworkError::StationNotFound { station_id });
        }
        if !self.vehicles.contains_key(&vehicle_id) {
            return Err(NetworkError::VehicleNotFound { vehicle_id });
        }

        if self.stations[&station_id].reservations.contains(&vehicle_id) {
            return Ok(());
        }
        if let Some(other) = self
            .stations
            .values()
            .find(|station| station.reservations.contains(&vehicle_id))
        {
            return Err(NetworkError::AlreadyReserved {
                vehicle_id,
                station_id: other.id,
            });
        }

        let station = self
            .stations
            .get_mut(&station_id)
            .expect("existence checked above");
        station.reservations.push_back(vehicle_id);
        // A charging station keeps its status; the vehicle just joins the
        // queue behind the active session.
        if station.is_available() {
            station.status = StationStatus::Reserved;
        }
        Ok(())
    }

    /// Open a charge at a station. The station must be free for this vehicle:
    /// not charging anyone, and if reserved, reserved with this vehicle at
    /// the head of the queue. A vehicle can hold only one open charge.
    pub fn start_charging(
        &mut self,
        station_id: StationId,
        vehicle_id: VehicleId,
        battery_level: u32,
    ) -> Result<Charge, NetworkError> {
        tracing::info!(
            "Vehicle {} starting to charge at station {}",
            vehicle_id,
            station_id
        );
        let Some(station) = self.stations.get(&station_id) else {
            return Err(NetworkError::StationNotFound { station_id });
        };
        if !self.vehicles.contains_key(&vehicle_id) {
            return Err(NetworkError::VehicleNotFound { vehicle_id });
        }
        match station.status {
            StationStatus::Charging { .. } => {
                return Err(NetworkError::StationBusy { station_id });
            }
            StationStatus::Reserved if station.reservations.front() != Some(&vehicle_id) => {
                return Err(NetworkError::NotHeadOfQueue {
                    station_id,
                    vehicle_id,
                });
            }
            _ => {}
        }
        if self
            .charges
            .values()
            .any(|charge| charge.is_open() && charge.user_id == vehicle_id)
        {
            return Err(NetworkError::AlreadyCharging { vehicle_id });
        }

        let charge = Charge {
            id: self.next_charge_id,
            user_id: vehicle_id,
            station_id,
            start_time: Utc::now(),
            end_time: None,
            cost: battery_level as f64 * COST_PER_BATTERY_PERCENT,
            has_paid: false,
        };
        self.next_charge_id += 1;

        let station = self
            .stations
            .get_mut(&station_id)
            .expect("existence checked above");
        if station.reservations.front() == Some(&vehicle_id) {
            station.reservations.pop_front();
        }
        station.status = StationStatus::Charging {
            active_charge_id: charge.id,
        };
        self.charges.insert(charge.id, charge.clone());
        Ok(charge)
    }

    /// Close the station's active charge. The final cost is the difference
    /// between the end and start battery readings, priced per percent. The
    /// station goes back to `Available`, or `Reserved` when vehicles are
    /// still queued.
    pub fn end_charging(
        &mut self,
        station_id: StationId,
        vehicle_id: VehicleId,
        battery_level: u32,
    ) -> Result<Charge, NetworkError> {
        tracing::info!(
            "Vehicle {} ending its charge at station {}",
            vehicle_id,
            station_id
        );
        let Some(station) = self.stations.get(&station_id) else {
            return Err(NetworkError::StationNotFound { station_id });
        };
        if !self.vehicles.contains_key(&vehicle_id) {
            return Err(NetworkError::VehicleNotFound { vehicle_id });
        }
        let StationStatus::Charging { active_charge_id } = station.status else {
            return Err(NetworkError::NotCharging { station_id });
        };

        let charge = self
            .charges
            .get_mut(&active_charge_id)
            .expect("a charging station references an existing charge");
        if charge.user_id != vehicle_id {
            return Err(NetworkError::ChargeOwnership {
                charge_id: active_charge_id,
                vehicle_id,
            });
        }

        charge.end_time = Some(Utc::now());
        charge.cost = battery_level as f64 * COST_PER_BATTERY_PERCENT - charge.cost;
        let closed = charge.clone();

        let station = self
            .stations
            .get_mut(&station_id)
            .expect("existence checked above");
        station.status = if station.reservations.is_empty() {
            StationStatus::Available
        } else {
            StationStatus::Reserved
        };
        Ok(closed)
    }

    /// Every charge receipt belonging to a vehicle, oldest id first.
    pub fn charges_for(&self, vehicle_id: VehicleId) -> Result<Vec<Charge>, NetworkError> {
        if !self.vehicles.contains_key(&vehicle_id) {
            return Err(NetworkError::VehicleNotFound { vehicle_id });
        }
        let mut charges: Vec<Charge> = self
            .charges
            .values()
            .filter(|charge| charge.user_id == vehicle_id)
            .cloned()
            .collect();
        charges.sort_by_key(|charge| charge.id);
        Ok(charges)
    }

    /// Mark a charge as paid. Only the owning vehicle may pay, and only once.
    pub fn pay(
        &mut self,
        vehicle_id: VehicleId,
        charge_id: ChargeId,
    ) -> Result<Charge, NetworkError> {
        tracing::info!("Vehicle {} paying charge {}", vehicle_id, charge_id);
        if !self.vehicles.contains_key(&vehicle_id) {
            return Err(NetworkError::VehicleNotFound { vehicle_id });
        }
        let Some(charge) = self.charges.get_mut(&charge_id) else {
            return Err(NetworkError::ChargeNotFound { charge_id });
        };
        if charge.user_id != vehicle_id {
            return Err(NetworkError::ChargeOwnership {
                charge_id,
                vehicle_id,
            });
        }
        if charge.has_paid {
            return Err(NetworkError::AlreadyPaid { charge_id });
        }
        charge.has_paid = true;
        Ok(charge.clone())
    }

    /// Read-only snapshot of one station.
    pub fn station_info(&self, station_id: StationId) -> Result<Station, NetworkError> {
        self.stations
            .get(&station_id)
            .cloned()
            .ok_or(NetworkError::StationNotFound { station_id })
    }
}
