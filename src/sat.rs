use sgp4::{Constants, Elements};

/// Sentinel for "no AOS/LOS event within the lookahead horizon".
pub const NEVER: f64 = -1.0;

/// Any negative daynum means "no event".
pub fn is_never(t: f64) -> bool {
    t < 0.0
}

/// Orbit classification used to exclude satellites from event prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitClass {
    Standard,
    Geostationary,
    Decayed,
}

impl OrbitClass {
    /// Classify a satellite from its elements.
    ///
    /// Geostationary: mean motion within 0.0002 rev/day of the sidereal
    /// rate. Decayed: the epoch plus a crude decay-time estimate from the
    /// mean motion derivative lies in the past.
    pub fn classify(elements: &Elements, now: f64) -> Self {
        if (elements.mean_motion - 1.0027).abs() < 0.0002 {
            return OrbitClass::Geostationary;
        }

        let ndot = elements.mean_motion_dot.abs();
        if ndot > 0.0 {
            let epoch = daynum_from_naive(&elements.datetime);
            let decay_time = epoch + (16.666_666 - elements.mean_motion) / (10.0 * ndot);
            if decay_time < now {
                return OrbitClass::Decayed;
            }
        }

        OrbitClass::Standard
    }
}

/// Derived observational state, recomputed every cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObsSet {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub range_km: f64,
    pub range_rate_km_s: f64,
    pub ssp_lat_deg: f64,
    pub ssp_lon_deg: f64,
    pub altitude_km: f64,
    pub velocity_km_s: f64,
    pub phase_deg: f64,
    pub orbit_number: i64,
    pub footprint_km: f64,
}

/// A tracked satellite: immutable elements plus mutable derived state.
///
/// Owned exclusively by the registry; sinks hold catalog numbers and
/// re-lookup every cycle.
pub struct TrackedObject {
    pub catnum: u32,
    pub name: String,
    pub elements: Elements,
    pub constants: Constants,
    pub class: OrbitClass,
    pub obs: ObsSet,
    /// Next rise time (daynum), NEVER if none within the horizon.
    pub aos: f64,
    /// Next set time (daynum), NEVER if none within the horizon.
    pub los: f64,
}

impl TrackedObject {
    pub fn new(catnum: u32, name: String, elements: Elements, constants: Constants, now: f64) -> Self {
        let class = OrbitClass::classify(&elements, now);
        Self {
            catnum,
            name,
            elements,
            constants,
            class,
            obs: ObsSet::default(),
            aos: NEVER,
            los: NEVER,
        }
    }
}

const UNIX_EPOCH_JD: f64 = 2_440_587.5;

/// Julian daynum of the current wall clock.
pub fn daynum_now() -> f64 {
    daynum_from_datetime(&chrono::Utc::now())
}

pub fn daynum_from_datetime(dt: &chrono::DateTime<chrono::Utc>) -> f64 {
    dt.timestamp_micros() as f64 / 86_400.0e6 + UNIX_EPOCH_JD
}

pub fn daynum_from_naive(dt: &chrono::NaiveDateTime) -> f64 {
    dt.and_utc().timestamp_micros() as f64 / 86_400.0e6 + UNIX_EPOCH_JD
}

/// Inverse of [`daynum_from_datetime`]; clamps to the chrono-representable
/// range rather than failing.
pub fn datetime_from_daynum(daynum: f64) -> chrono::DateTime<chrono::Utc> {
    let micros = ((daynum - UNIX_EPOCH_JD) * 86_400.0e6) as i64;
    chrono::DateTime::from_timestamp_micros(micros).unwrap_or_default()
}
