use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Serialize;

use super::draft::PropertyDraft;
use super::error::EstimationError;

/// Query parameter carrying the sealed draft to the results surface.
pub const PROPERTY_DATA_PARAM: &str = "propertyData";

const RESULTS_PATH: &str = "/api/v1/results";

/// A frozen draft, encoded as JSON then URL-safe base64 (no padding).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Handoff {
    property_data: String,
}

impl Handoff {
    pub fn seal(draft: &PropertyDraft) -> Result<Self, EstimationError> {
        let json = serde_json::to_vec(draft)
            .map_err(|err| EstimationError::Parse(format!("draft could not be encoded: {err}")))?;
        Ok(Self {
            property_data: URL_SAFE_NO_PAD.encode(json),
        })
    }

    pub fn property_data(&self) -> &str {
        &self.property_data
    }

    pub fn results_path(&self) -> String {
        format!("{RESULTS_PATH}?{PROPERTY_DATA_PARAM}={}", self.property_data)
    }

    pub fn into_property_data(self) -> String {
        self.property_data
    }
}

/// Reverse of [`Handoff::seal`]. Absent or blank input is `MissingInput`,
/// anything that fails to decode or parse is `Parse`.
pub fn decode_property_data(raw: Option<&str>) -> Result<PropertyDraft, EstimationError> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty());
    let Some(encoded) = raw else {
        return Err(EstimationError::MissingInput);
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|err| {
            EstimationError::Parse(format!("{PROPERTY_DATA_PARAM} is not valid base64: {err}"))
        })?;

    serde_json::from_slice(&bytes).map_err(|err| {
        EstimationError::Parse(format!("{PROPERTY_DATA_PARAM} is not a property record: {err}"))
    })
}
