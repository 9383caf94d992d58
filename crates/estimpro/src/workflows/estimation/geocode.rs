use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeocodeError {
    #[error("an address is required")]
    EmptyAddress,
    #[error("no location found for '{0}'")]
    NotFound(String),
    #[error("geocoding service unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a free-text address. Implementations make exactly one attempt.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

/// Guarded entry point: blank addresses never reach the service and
/// out-of-range coordinates are treated as a failed lookup.
pub async fn resolve_address(
    geocoder: &dyn Geocoder,
    address: &str,
) -> Result<Coordinates, GeocodeError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(GeocodeError::EmptyAddress);
    }

    let coordinates = geocoder.geocode(address).await?;
    if !coordinates.is_valid() {
        return Err(GeocodeError::Unavailable(format!(
            "service returned out-of-range coordinates ({}, {})",
            coordinates.latitude, coordinates.longitude
        )));
    }

    tracing::info!(
        latitude = coordinates.latitude,
        longitude = coordinates.longitude,
        "address geocoded"
    );
    Ok(coordinates)
}
