//! Restaurant documents
//!
//! Immutable after load except by a full reindex. The embedding is the
//! semantic fingerprint of name + cuisines + description + locality and is
//! written atomically with the rest of the document.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

const EARTH_RADIUS_KM: f64 = 6371.0;

impl Coordinate {
    /// Great-circle distance in kilometers (haversine).
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();

        let a = (d_lat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestaurantDocument {
    pub id: String,
    pub name: String,
    pub cuisines: Vec<String>,
    pub city: String,
    pub locality: String,
    pub address: String,
    pub coordinate: Coordinate,
    pub rating: f32,
    pub price_for_two: u32,
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

impl RestaurantDocument {
    /// Text the embedding is computed from.
    pub fn fingerprint_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.name,
            self.cuisines.join(" "),
            self.description,
            self.locality
        )
    }

    pub fn has_cuisine(&self, cuisine: &str) -> bool {
        self.cuisines
            .iter()
            .any(|c| c.eq_ignore_ascii_case(cuisine))
    }

    /// Compact JSON for tool output, without the embedding.
    pub fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "cuisines": self.cuisines,
            "city": self.city,
            "locality": self.locality,
            "address": self.address,
            "rating": self.rating,
            "priceForTwo": self.price_for_two,
            "type": self.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_known_distance() {
        // Connaught Place to Khan Market, Delhi: roughly 3.5 km.
        let cp = Coordinate { lat: 28.6315, lon: 77.2167 };
        let khan = Coordinate { lat: 28.6003, lon: 77.2270 };
        let d = cp.distance_km(&khan);
        assert!(d > 3.0 && d < 4.5, "distance was {}", d);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let p = Coordinate { lat: 12.97, lon: 77.59 };
        assert!(p.distance_km(&p) < 1e-9);
    }

    #[test]
    fn test_cuisine_match_is_case_insensitive() {
        let doc = RestaurantDocument {
            id: "r1".into(),
            name: "Trattoria".into(),
            cuisines: vec!["Italian".into(), "Pizza".into()],
            city: "Delhi".into(),
            locality: "Khan Market".into(),
            address: "12 Khan Market".into(),
            coordinate: Coordinate { lat: 28.6, lon: 77.22 },
            rating: 4.4,
            price_for_two: 1800,
            kind: "casual dining".into(),
            description: "Handmade pasta".into(),
            review_count: 220,
            embedding: vec![],
        };
        assert!(doc.has_cuisine("italian"));
        assert!(!doc.has_cuisine("thai"));
        assert!(doc.fingerprint_text().contains("Khan Market"));
    }
}
