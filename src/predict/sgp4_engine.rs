use log::warn;

use crate::predict::{OrbitEngine, PredictError};
use crate::sat::{self, ObsSet, TrackedObject, NEVER};
use crate::station::{GroundStation, EARTH_ROTATION_RAD_S};

const EARTH_RADIUS_KM: f64 = 6378.137;
const WGS84_E2: f64 = 0.00669437999014;

/// Coarse horizon-crossing scan step (1 minute).
const COARSE_STEP_DAYS: f64 = 1.0 / 1440.0;
/// Bisection refinement target (1 second).
const FINE_STEP_DAYS: f64 = 1.0 / 86_400.0;
const HORIZON_ELEVATION_DEG: f64 = 0.0;

/// SGP4-backed [`OrbitEngine`]. Stateless; every call is a pure function of
/// the elements, the observer and the requested time.
pub struct Sgp4Engine;

impl OrbitEngine for Sgp4Engine {
    fn propagate(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        at: f64,
    ) -> Result<ObsSet, PredictError> {
        let timestamp = sat::datetime_from_daynum(at).naive_utc();

        let minutes = sat
            .elements
            .datetime_to_minutes_since_epoch(&timestamp)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;
        let prediction = sat
            .constants
            .propagate(minutes)
            .map_err(|e| PredictError::Propagation(e.to_string()))?;

        let sidereal =
            sgp4::iau_epoch_to_sidereal_time(sgp4::julian_years_since_j2000(&timestamp));

        let sat_ecef = teme_to_ecef_position(prediction.position, sidereal);
        let sat_vel_ecef = teme_to_ecef_velocity(prediction.position, prediction.velocity, sidereal);

        let sta_ecef = observer.position_ecef_km();
        let sta_vel = observer.velocity_ecef_km_s();

        let dr = [
            sat_ecef[0] - sta_ecef[0],
            sat_ecef[1] - sta_ecef[1],
            sat_ecef[2] - sta_ecef[2],
        ];
        let range_km = (dr[0] * dr[0] + dr[1] * dr[1] + dr[2] * dr[2]).sqrt();

        let enu = ecef_to_enu(dr, observer.lat_rad(), observer.lon_rad());
        let azimuth = enu.0.atan2(enu.1).to_degrees().rem_euclid(360.0);
        let elevation = if range_km > 0.0 {
            (enu.2 / range_km).asin().to_degrees()
        } else {
            0.0
        };

        let los_unit = if range_km > 0.0 {
            [dr[0] / range_km, dr[1] / range_km, dr[2] / range_km]
        } else {
            [0.0, 0.0, 0.0]
        };
        let rel_vel = [
            sat_vel_ecef[0] - sta_vel[0],
            sat_vel_ecef[1] - sta_vel[1],
            sat_vel_ecef[2] - sta_vel[2],
        ];
        let range_rate_km_s =
            rel_vel[0] * los_unit[0] + rel_vel[1] * los_unit[1] + rel_vel[2] * los_unit[2];

        let (ssp_lat_deg, ssp_lon_deg, altitude_km) = ecef_to_geodetic(sat_ecef);

        let velocity_km_s = (prediction.velocity[0] * prediction.velocity[0]
            + prediction.velocity[1] * prediction.velocity[1]
            + prediction.velocity[2] * prediction.velocity[2])
            .sqrt();

        // footprint diameter on the ground
        let footprint_km =
            12_756.33 * (EARTH_RADIUS_KM / (EARTH_RADIUS_KM + altitude_km)).acos();

        let age_days = at - sat::daynum_from_naive(&sat.elements.datetime);
        let phase_deg = (sat.elements.mean_anomaly
            + 360.0 * sat.elements.mean_motion * age_days)
            .rem_euclid(360.0);

        let orbit_number = (sat.elements.mean_motion * age_days
            + sat.elements.drag_term * age_days * age_days
            + sat.elements.mean_anomaly / 360.0)
            .floor() as i64
            + sat.elements.revolution_number as i64
            - 1;

        Ok(ObsSet {
            azimuth_deg: azimuth,
            elevation_deg: elevation,
            range_km,
            range_rate_km_s,
            ssp_lat_deg,
            ssp_lon_deg,
            altitude_km,
            velocity_km_s,
            phase_deg,
            orbit_number,
            footprint_km,
        })
    }

    fn find_next_rise(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        from: f64,
        horizon_days: f64,
    ) -> f64 {
        self.find_crossing(sat, observer, from, horizon_days, true)
    }

    fn find_next_set(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        from: f64,
        horizon_days: f64,
    ) -> f64 {
        self.find_crossing(sat, observer, from, horizon_days, false)
    }
}

impl Sgp4Engine {
    fn elevation_at(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        at: f64,
    ) -> Result<f64, PredictError> {
        Ok(self.propagate(sat, observer, at)?.elevation_deg)
    }

    /// Coarse 1-minute scan for the next horizon crossing in the requested
    /// direction, then bisection down to 1 second. NEVER when the horizon
    /// window is exhausted.
    fn find_crossing(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        from: f64,
        horizon_days: f64,
        rising: bool,
    ) -> f64 {
        let end = from + horizon_days;
        let mut cursor = from;

        let mut prev_above = match self.elevation_at(sat, observer, cursor) {
            Ok(el) => el >= HORIZON_ELEVATION_DEG,
            Err(e) => {
                warn!("#{}: propagation failed during event search: {e}", sat.catnum);
                return NEVER;
            }
        };

        while cursor < end {
            cursor = (cursor + COARSE_STEP_DAYS).min(end);

            let above = match self.elevation_at(sat, observer, cursor) {
                Ok(el) => el >= HORIZON_ELEVATION_DEG,
                Err(e) => {
                    warn!("#{}: propagation failed during event search: {e}", sat.catnum);
                    return NEVER;
                }
            };

            let crossed = if rising {
                above && !prev_above
            } else {
                !above && prev_above
            };
            if crossed {
                return self
                    .refine_crossing(sat, observer, cursor - COARSE_STEP_DAYS, cursor, rising)
                    .unwrap_or(NEVER);
            }

            prev_above = above;
        }

        NEVER
    }

    /// Bisect the crossing bracketed by `[before, after]`.
    fn refine_crossing(
        &self,
        sat: &TrackedObject,
        observer: &GroundStation,
        before: f64,
        after: f64,
        rising: bool,
    ) -> Result<f64, PredictError> {
        let mut low = before;
        let mut high = after;

        while high - low > FINE_STEP_DAYS {
            let mid = low + (high - low) / 2.0;
            let above = self.elevation_at(sat, observer, mid)? >= HORIZON_ELEVATION_DEG;

            if above == rising {
                high = mid;
            } else {
                low = mid;
            }
        }

        Ok(high)
    }
}

fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = [
        vel_teme[0] * cos_gmst + vel_teme[1] * sin_gmst,
        -vel_teme[0] * sin_gmst + vel_teme[1] * cos_gmst,
        vel_teme[2],
    ];
    [
        rotated[0] + EARTH_ROTATION_RAD_S * pos[1],
        rotated[1] - EARTH_ROTATION_RAD_S * pos[0],
        rotated[2],
    ]
}

fn ecef_to_enu(dr: [f64; 3], lat_rad: f64, lon_rad: f64) -> (f64, f64, f64) {
    let sin_lat = lat_rad.sin();
    let cos_lat = lat_rad.cos();
    let sin_lon = lon_rad.sin();
    let cos_lon = lon_rad.cos();

    let east = -sin_lon * dr[0] + cos_lon * dr[1];
    let north = -sin_lat * cos_lon * dr[0] - sin_lat * sin_lon * dr[1] + cos_lat * dr[2];
    let up = cos_lat * cos_lon * dr[0] + cos_lat * sin_lon * dr[1] + sin_lat * dr[2];
    (east, north, up)
}

/// ECEF position to WGS-84 geodetic (lat deg, lon deg, alt km) by fixed-point
/// iteration on the latitude.
fn ecef_to_geodetic(pos: [f64; 3]) -> (f64, f64, f64) {
    let r = (pos[0] * pos[0] + pos[1] * pos[1]).sqrt();
    let lon = pos[1].atan2(pos[0]);

    let mut lat = pos[2].atan2(r);
    let mut n = EARTH_RADIUS_KM;
    for _ in 0..10 {
        let sin_lat = lat.sin();
        n = EARTH_RADIUS_KM / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
        let next = (pos[2] + n * WGS84_E2 * sin_lat).atan2(r);
        if (next - lat).abs() < 1e-12 {
            lat = next;
            break;
        }
        lat = next;
    }

    let alt = if lat.cos().abs() > 1e-9 {
        r / lat.cos() - n
    } else {
        pos[2].abs() - n * (1.0 - WGS84_E2)
    };

    (lat.to_degrees(), lon.to_degrees(), alt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::registry::tests::FakeSource;
    use crate::module::registry::SatSource;
    use crate::sat::{daynum_from_naive, is_never};

    fn iss() -> TrackedObject {
        let rec = FakeSource::new().fetch(25544).unwrap();
        let epoch = daynum_from_naive(&rec.elements.datetime);
        TrackedObject::new(rec.catnum, rec.name, rec.elements, rec.constants, epoch)
    }

    fn observer() -> GroundStation {
        GroundStation::from_coordinates("55.1, 12.5", Some(25.0)).unwrap()
    }

    #[test]
    fn propagation_at_epoch_is_plausible() {
        let sat = iss();
        let epoch = daynum_from_naive(&sat.elements.datetime);
        let obs = Sgp4Engine.propagate(&sat, &observer(), epoch).unwrap();

        assert!(obs.altitude_km > 300.0 && obs.altitude_km < 500.0);
        assert!(obs.velocity_km_s > 7.0 && obs.velocity_km_s < 8.5);
        assert!((0.0..360.0).contains(&obs.azimuth_deg));
        assert!((0.0..360.0).contains(&obs.phase_deg));
        assert!(obs.range_km > obs.altitude_km);
        assert!(obs.ssp_lat_deg.abs() <= 52.0);
        assert!(obs.footprint_km > 3000.0 && obs.footprint_km < 6000.0);
        assert!(obs.orbit_number > 23_000);
    }

    #[test]
    fn propagation_is_pure() {
        let sat = iss();
        let epoch = daynum_from_naive(&sat.elements.datetime);
        let a = Sgp4Engine.propagate(&sat, &observer(), epoch + 0.123).unwrap();
        let b = Sgp4Engine.propagate(&sat, &observer(), epoch + 0.123).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rise_and_set_stay_within_horizon() {
        let sat = iss();
        let sta = observer();
        let from = daynum_from_naive(&sat.elements.datetime);
        let horizon = 1.0;

        let aos = Sgp4Engine.find_next_rise(&sat, &sta, from, horizon);
        let los = Sgp4Engine.find_next_set(&sat, &sta, from, horizon);

        // an ISS-like orbit passes a mid-latitude site several times a day
        assert!(!is_never(aos));
        assert!(!is_never(los));
        assert!(aos >= from && aos <= from + horizon);
        assert!(los >= from && los <= from + horizon);

        // refined crossings sit on the horizon to within a second or so
        let el_aos = Sgp4Engine.propagate(&sat, &sta, aos).unwrap().elevation_deg;
        assert!(el_aos.abs() < 0.5, "elevation at AOS was {el_aos}");
    }

    #[test]
    fn tight_horizon_yields_never() {
        let sat = iss();
        let sta = observer();
        let from = daynum_from_naive(&sat.elements.datetime);

        let aos = Sgp4Engine.find_next_rise(&sat, &sta, from, 0.0);
        assert!(is_never(aos));
    }

    #[test]
    fn geodetic_roundtrip_at_altitude() {
        // point straight above the equator/prime meridian at 400 km
        let (lat, lon, alt) = ecef_to_geodetic([EARTH_RADIUS_KM + 400.0, 0.0, 0.0]);
        assert!(lat.abs() < 1e-9);
        assert!(lon.abs() < 1e-9);
        assert!((alt - 400.0).abs() < 1e-6);
    }
}
