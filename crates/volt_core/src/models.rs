use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type VehicleId = u64;
pub type StationId = u64;
pub type ChargeId = u64;

/// Default suggestion radius, in coordinate units.
pub const DEFAULT_MAX_RADIUS: f64 = 8000.0;

/// A point on the network's cartesian plane. Coordinates are integers;
/// distances between them are not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Position) -> f64 {
        let dx = (other.x - self.x) as f64;
        let dy = (other.y - self.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(default)]
    pub location: Position,
    /// 0 means empty, 100 fully charged.
    #[serde(default)]
    pub battery_level: u32,
}

/// Station availability. The active charge id only exists while a vehicle is
/// plugged in, so it lives inside the `Charging` variant rather than as a
/// separate nullable field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum StationStatus {
    Available,
    Reserved,
    #[serde(rename_all = "camelCase")]
    Charging { active_charge_id: ChargeId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: StationId,
    pub location: Position,
    #[serde(flatten)]
    pub status: StationStatus,
    /// Waiting queue, head first. A vehicle appears at most once across the
    /// whole network.
    #[serde(default)]
    pub reservations: VecDeque<VehicleId>,
    /// Vehicles currently holding an un-acted-upon recommendation for this
    /// station. A vehicle holds at most one pending suggestion network-wide.
    #[serde(default)]
    pub suggestions: HashSet<VehicleId>,
}

impl Station {
    pub fn new(id: StationId, location: Position, status: StationStatus) -> Self {
        Station {
            id,
            location,
            status,
            reservations: VecDeque::new(),
            suggestions: HashSet::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.status, StationStatus::Available)
    }
}

/// One charging session receipt. Open until `end_time` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Charge {
    #[serde(rename = "chargeId")]
    pub id: ChargeId,
    pub user_id: VehicleId,
    pub station_id: StationId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub cost: f64,
    pub has_paid: bool,
}

impl Charge {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Network configuration loaded at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    /// Stations further away than this are never suggested.
    #[serde(default = "default_max_radius")]
    pub max_radius: f64,
    /// Stations known before any client registers one.
    #[serde(default)]
    pub stations: Vec<StationSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationSeed {
    pub id: StationId,
    pub location: Position,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            max_radius: DEFAULT_MAX_RADIUS,
            stations: Vec::new(),
        }
    }
}

fn default_max_radius() -> f64 {
    DEFAULT_MAX_RADIUS
}
