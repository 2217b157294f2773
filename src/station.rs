use serde::Deserialize;

pub const EARTH_ROTATION_RAD_S: f64 = 7.292_115e-5;

/// Observer location (latitude/longitude in degrees, altitude in meters).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct GroundStation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl GroundStation {
    /// Parse a "lat, lon" coordinate pair.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() < 2 {
            return None;
        }
        Some(Self {
            latitude_deg: parts[0].parse().ok()?,
            longitude_deg: parts[1].parse().ok()?,
            altitude_m: altitude_m.unwrap_or(0.0),
        })
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    /// WGS-84 geodetic position to ECEF, in km.
    pub fn position_ecef_km(&self) -> [f64; 3] {
        let a = 6378.137;
        let e2 = 0.00669437999014;
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let n = a / (1.0 - e2 * lat.sin() * lat.sin()).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * lat.cos() * lon.cos(),
            (n + alt_km) * lat.cos() * lon.sin(),
            (n * (1.0 - e2) + alt_km) * lat.sin(),
        ]
    }

    /// Station velocity due to Earth rotation, ECEF km/s.
    pub fn velocity_ecef_km_s(&self) -> [f64; 3] {
        let pos = self.position_ecef_km();
        [
            -EARTH_ROTATION_RAD_S * pos[1],
            EARTH_ROTATION_RAD_S * pos[0],
            0.0,
        ]
    }
}
