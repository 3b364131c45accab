use serde::{Deserialize, Serialize};

use crate::tracker::error::StationError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundStation {
    pub id: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    #[serde(default)]
    pub altitude_km: f64,
}

impl GroundStation {
    pub fn new(
        id: impl Into<String>,
        latitude_deg: f64,
        longitude_deg: f64,
        altitude_km: f64,
    ) -> Result<Self, StationError> {
        let station = Self {
            id: id.into(),
            latitude_deg,
            longitude_deg,
            altitude_km,
        };
        station.validate()?;
        Ok(station)
    }

    /// Parse `"lat, lon"` in degrees.
    pub fn from_coordinates(
        id: impl Into<String>,
        coordinates: &str,
        altitude_km: Option<f64>,
    ) -> Result<Self, StationError> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return Err(StationError::Coordinates(coordinates.to_string()));
        }
        let bad = || StationError::Coordinates(coordinates.to_string());
        let lat = parts[0].parse().map_err(|_| bad())?;
        let lon = parts[1].parse().map_err(|_| bad())?;
        Self::new(id, lat, lon, altitude_km.unwrap_or(0.0))
    }

    pub fn validate(&self) -> Result<(), StationError> {
        if !(self.latitude_deg.is_finite() && (-90.0..=90.0).contains(&self.latitude_deg)) {
            return Err(StationError::Latitude(self.latitude_deg));
        }
        if !(self.longitude_deg.is_finite() && (-180.0..=180.0).contains(&self.longitude_deg)) {
            return Err(StationError::Longitude(self.longitude_deg));
        }
        if !self.altitude_km.is_finite() {
            return Err(StationError::Altitude(self.altitude_km));
        }
        Ok(())
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }
}
