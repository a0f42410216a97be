use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

impl Pin {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            latitude,
            longitude,
            created_at: Utc::now(),
        }
    }

    /// Check that a coordinate pair lies on the globe
    pub fn is_valid_coordinate(latitude: f64, longitude: f64) -> bool {
        latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude)
    }

    pub fn coordinate_display(&self) -> String {
        format!("{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Last viewed map camera, persisted in the config between runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition {
    pub latitude: f64,
    pub longitude: f64,
    /// Distance of the camera from the center coordinate, in meters
    pub distance: f64,
    pub heading: f64,
    pub pitch: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_coordinate() {
        assert!(Pin::is_valid_coordinate(0.0, 0.0));
        assert!(Pin::is_valid_coordinate(90.0, -180.0));
        assert!(Pin::is_valid_coordinate(-33.8688, 151.2093));

        assert!(!Pin::is_valid_coordinate(90.1, 0.0));
        assert!(!Pin::is_valid_coordinate(0.0, 180.5));
        assert!(!Pin::is_valid_coordinate(f64::NAN, 0.0));
        assert!(!Pin::is_valid_coordinate(0.0, f64::INFINITY));
    }

    #[test]
    fn test_new_pins_have_distinct_ids() {
        let a = Pin::new(10.0, 20.0);
        let b = Pin::new(10.0, 20.0);
        assert_ne!(a.id, b.id);
        assert_eq!(a.coordinate_display(), "10.00000, 20.00000");
    }
}
