use std::cmp::Ordering;

use crate::{Position, Station};

/// Sort `stations` best-first for a vehicle at `from`. The sort is stable, so
/// full ties keep their incoming order.
pub(crate) fn rank(stations: &mut [Station], from: Position) {
    stations.sort_by(|a, b| compare(a, b, from));
}

/// Three-level comparator: available stations always beat busy ones, then
/// shorter waiting queues win, then shorter distance.
fn compare(a: &Station, b: &Station, from: Position) -> Ordering {
    // Reserved and charging stations count as one "busy" class here.
    match (a.is_available(), b.is_available()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    a.reservations
        .len()
        .cmp(&b.reservations.len())
        .then_with(|| {
            from.distance_to(a.location)
                .total_cmp(&from.distance_to(b.location))
        })
}
