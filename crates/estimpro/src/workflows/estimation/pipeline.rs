use std::ops::RangeInclusive;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Datelike;
use serde::Serialize;

use super::domain::{Condition, CountField, OutdoorSpace, Parking, PropertyType};
use super::draft::PropertyDraft;
use super::error::EstimationError;
use super::handoff::decode_property_data;
use super::result::EstimationResult;

pub const SURFACE_RANGE: RangeInclusive<f64> = 10.0..=500.0;
pub const EARLIEST_YEAR: i32 = 1900;

/// Fully typed valuation request. Serialized as-is into the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedDraft {
    pub address: String,
    pub property_type: PropertyType,
    pub surface: f64,
    pub rooms: u32,
    pub bedrooms: u32,
    pub bathrooms: u32,
    pub year: i32,
    pub condition: Condition,
    pub parking: Parking,
    pub garden: OutdoorSpace,
    pub floor: i32,
    pub latitude: f64,
    pub longitude: f64,
}

pub fn year_range(current_year: i32) -> RangeInclusive<f64> {
    f64::from(EARLIEST_YEAR)..=f64::from(current_year)
}

/// Turns a decoded draft into the request the valuation service expects.
/// Dual-shape fields are collapsed here and nowhere else.
pub fn normalize_draft(
    draft: &PropertyDraft,
    current_year: i32,
) -> Result<NormalizedDraft, EstimationError> {
    let address = draft.address.trim();
    if address.is_empty() {
        return Err(missing("address"));
    }

    let surface = draft.surface.normalize("surface")?;
    if !SURFACE_RANGE.contains(&surface) {
        return Err(EstimationError::Parse(format!(
            "surface {surface} is outside {}-{} m²",
            SURFACE_RANGE.start(),
            SURFACE_RANGE.end()
        )));
    }

    let year = draft.year.normalize("year")?;
    if year.fract() != 0.0 || !year_range(current_year).contains(&year) {
        return Err(EstimationError::Parse(format!(
            "year {year} is outside {EARLIEST_YEAR}-{current_year}"
        )));
    }

    let (latitude, longitude) = match (draft.latitude, draft.longitude) {
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        (None, _) => return Err(missing("latitude")),
        (_, None) => return Err(missing("longitude")),
    };

    Ok(NormalizedDraft {
        address: address.to_string(),
        property_type: draft.property_type.ok_or_else(|| missing("propertyType"))?,
        surface,
        rooms: required_count(&draft.rooms, "rooms")?,
        bedrooms: required_count(&draft.bedrooms, "bedrooms")?,
        bathrooms: required_count(&draft.bathrooms, "bathrooms")?,
        year: year as i32,
        condition: draft.condition.ok_or_else(|| missing("condition"))?,
        parking: draft.parking.unwrap_or(Parking::Absent),
        garden: draft.garden.unwrap_or(OutdoorSpace::Absent),
        floor: draft.floor.coerce_level("floor")?.unwrap_or(0),
        latitude,
        longitude,
    })
}

fn required_count(field: &CountField, name: &'static str) -> Result<u32, EstimationError> {
    field.coerce(name)?.ok_or_else(|| missing(name))
}

fn missing(field: &str) -> EstimationError {
    EstimationError::Parse(format!("{field} is required"))
}

/// Raw answer from the valuation service before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub status: u16,
    pub body: String,
}

impl ServiceReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport seam for the valuation request. One call per acquisition.
#[async_trait]
pub trait ValuationService: Send + Sync {
    async fn submit(&self, request: &NormalizedDraft) -> Result<ServiceReply, EstimationError>;
}

/// Picks the most useful message out of a failed reply.
pub(crate) fn diagnostic_text(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(serde_json::Value::Object(fields)) = serde_json::from_str(trimmed) {
        for key in ["detail", "message", "error"] {
            match fields.get(key) {
                Some(serde_json::Value::String(text)) if !text.trim().is_empty() => {
                    return text.trim().to_string();
                }
                Some(value) if !value.is_null() && !value.is_string() => return value.to_string(),
                _ => {}
            }
        }
    }

    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub draft: NormalizedDraft,
    pub result: Arc<EstimationResult>,
}

#[derive(Clone)]
pub struct EstimationPipeline {
    valuation: Arc<dyn ValuationService>,
}

impl EstimationPipeline {
    pub fn new(valuation: Arc<dyn ValuationService>) -> Self {
        Self { valuation }
    }

    /// Decode and normalize without touching the network.
    pub fn prepare(&self, property_data: Option<&str>) -> Result<NormalizedDraft, EstimationError> {
        let draft = decode_property_data(property_data)?;
        normalize_draft(&draft, chrono::Local::now().year())
    }

    pub async fn submit(&self, request: NormalizedDraft) -> Result<Acquisition, EstimationError> {
        let reply = self.valuation.submit(&request).await?;
        if !reply.is_success() {
            let diagnostic = diagnostic_text(reply.status, &reply.body);
            tracing::warn!(status = reply.status, %diagnostic, "valuation request rejected");
            return Err(EstimationError::Network(diagnostic));
        }

        let result = EstimationResult::from_json(&reply.body)?;
        tracing::info!(
            estimated_price = result.estimated_price,
            confidence = result.confidence_score,
            "valuation acquired"
        );
        Ok(Acquisition {
            draft: request,
            result: Arc::new(result),
        })
    }

    pub async fn acquire(&self, property_data: Option<&str>) -> Result<Acquisition, EstimationError> {
        let request = self.prepare(property_data)?;
        self.submit(request).await
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Replays a fixed reply and records every request it sees.
    pub(crate) struct RecordingValuation {
        reply: Result<ServiceReply, EstimationError>,
        pub(crate) calls: AtomicUsize,
        pub(crate) requests: Mutex<Vec<NormalizedDraft>>,
    }

    impl RecordingValuation {
        pub(crate) fn replying(status: u16, body: impl Into<String>) -> Self {
            Self::with(Ok(ServiceReply {
                status,
                body: body.into(),
            }))
        }

        pub(crate) fn failing(error: EstimationError) -> Self {
            Self::with(Err(error))
        }

        fn with(reply: Result<ServiceReply, EstimationError>) -> Self {
            Self {
                reply,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValuationService for RecordingValuation {
        async fn submit(&self, request: &NormalizedDraft) -> Result<ServiceReply, EstimationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .expect("request log")
                .push(request.clone());
            self.reply.clone()
        }
    }
}
