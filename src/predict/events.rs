//! Coarse-cadence AOS/LOS prediction.
//!
//! Event searches are expensive, so they only run on cycles where the event
//! counter has wrapped to zero; the stored times go stale in between by
//! design. Geostationary and decayed satellites are never searched.

use crate::predict::OrbitEngine;
use crate::sat::{OrbitClass, TrackedObject};
use crate::station::GroundStation;

const EARTH_RADIUS_KM: f64 = 6378.137;

/// Whether the satellite's orbit can ever rise above this observer's
/// horizon: compares the footprint half-angle at apogee plus the effective
/// inclination against the observer latitude.
pub fn can_have_aos(sat: &TrackedObject, observer: &GroundStation) -> bool {
    if sat.elements.mean_motion == 0.0 {
        return false;
    }

    let mut incl = sat.elements.inclination;
    if incl >= 90.0 {
        incl = 180.0 - incl;
    }

    let sma = 331.25 * (1440.0 / sat.elements.mean_motion).powf(2.0 / 3.0);
    let apogee = sma * (1.0 + sat.elements.eccentricity) - EARTH_RADIUS_KM;

    (EARTH_RADIUS_KM / (apogee + EARTH_RADIUS_KM)).acos() + incl.to_radians()
        > observer.lat_rad().abs()
}

/// Recompute the satellite's next AOS/LOS if this cycle is an event cycle
/// and the satellite is eligible. No-op otherwise; stale values persist.
pub fn update_events(
    sat: &mut TrackedObject,
    observer: &GroundStation,
    engine: &dyn OrbitEngine,
    now: f64,
    horizon_days: f64,
    events_due: bool,
) {
    if !events_due {
        return;
    }
    if sat.class == OrbitClass::Geostationary || sat.class == OrbitClass::Decayed {
        return;
    }
    if !can_have_aos(sat, observer) {
        return;
    }

    sat.aos = engine.find_next_rise(sat, observer, now, horizon_days);
    sat.los = engine.find_next_set(sat, observer, now, horizon_days);
}
