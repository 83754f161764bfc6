use serde::{Deserialize, Serialize};

/// A point with optional human-readable address. Latitude must be in
/// `[-90, 90]`, longitude in `(-180, 180]`, enforced at construction so
/// every `Location` in the system is valid by construction.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationWithAddress {
    pub location: Location,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidLocation;

impl Location {
    pub fn new(lat: f64, lng: f64) -> Result<Self, InvalidLocation> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) || lng == -180.0 {
            return Err(InvalidLocation);
        }
        Ok(Self { lat, lng })
    }

    pub fn distance_km(&self, other: &Location) -> f64 {
        utility::geo::haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Location::new(91.0, 0.0).is_err());
        assert!(Location::new(0.0, -180.0).is_err());
        assert!(Location::new(0.0, 180.0).is_ok());
    }
}
