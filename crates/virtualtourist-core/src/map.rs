//! Map display adapter.
//!
//! Keeps rendering concerns out of `Pin`: a `MapMarker` is what a map view
//! needs to draw and identify a pin, and `to_geojson` exports markers for
//! map tools that read GeoJSON.

use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::Pin;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub pin_id: Uuid,
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
}

impl From<&Pin> for MapMarker {
    fn from(pin: &Pin) -> Self {
        Self {
            pin_id: pin.id,
            latitude: pin.latitude,
            longitude: pin.longitude,
            title: pin.coordinate_display(),
        }
    }
}

/// GeoJSON `FeatureCollection` with one point per marker.
/// GeoJSON positions are `[longitude, latitude]`.
pub fn to_geojson(markers: &[MapMarker]) -> Value {
    let features: Vec<Value> = markers
        .iter()
        .map(|m| {
            json!({
                "type": "Feature",
                "id": m.pin_id.to_string(),
                "geometry": {
                    "type": "Point",
                    "coordinates": [m.longitude, m.latitude],
                },
                "properties": {
                    "title": m.title,
                },
            })
        })
        .collect();

    json!({
        "type": "FeatureCollection",
        "features": features,
    })
}
