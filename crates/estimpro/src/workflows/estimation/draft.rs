use serde::{Deserialize, Serialize};

use super::domain::{
    deserialize_optional_wire, serialize_optional_wire, Condition, CountField, NumericField,
    OutdoorSpace, Parking, PropertyType, WireEnum,
};
use super::geocode::Coordinates;

pub const DEFAULT_SURFACE: f64 = 100.0;
pub const DEFAULT_YEAR: f64 = 2000.0;

/// Attribute set collected across the intake steps. Field names follow the
/// intake form so a sealed draft reads the same on both sides of the handoff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDraft {
    #[serde(default)]
    pub address: String,
    #[serde(
        default,
        serialize_with = "serialize_optional_wire",
        deserialize_with = "deserialize_optional_wire"
    )]
    pub property_type: Option<PropertyType>,
    pub surface: NumericField,
    #[serde(default)]
    pub rooms: CountField,
    #[serde(default)]
    pub bedrooms: CountField,
    #[serde(default)]
    pub bathrooms: CountField,
    pub year: NumericField,
    #[serde(
        default,
        serialize_with = "serialize_optional_wire",
        deserialize_with = "deserialize_optional_wire"
    )]
    pub condition: Option<Condition>,
    #[serde(
        default,
        serialize_with = "serialize_optional_wire",
        deserialize_with = "deserialize_optional_wire"
    )]
    pub parking: Option<Parking>,
    #[serde(
        default,
        serialize_with = "serialize_optional_wire",
        deserialize_with = "deserialize_optional_wire"
    )]
    pub garden: Option<OutdoorSpace>,
    #[serde(default)]
    pub balcony: String,
    #[serde(default)]
    pub floor: CountField,
    #[serde(default)]
    pub elevator: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Default for PropertyDraft {
    fn default() -> Self {
        Self {
            address: String::new(),
            property_type: None,
            surface: NumericField::Sequence(vec![DEFAULT_SURFACE]),
            rooms: CountField::default(),
            bedrooms: CountField::default(),
            bathrooms: CountField::default(),
            year: NumericField::Sequence(vec![DEFAULT_YEAR]),
            condition: None,
            parking: None,
            garden: None,
            balcony: String::new(),
            floor: CountField::default(),
            elevator: String::new(),
            latitude: None,
            longitude: None,
        }
    }
}

impl PropertyDraft {
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }

    pub(crate) fn with_coordinates(&self, coordinates: Coordinates) -> Self {
        Self {
            latitude: Some(coordinates.latitude),
            longitude: Some(coordinates.longitude),
            ..self.clone()
        }
    }

    /// Recap shown on the confirmation step.
    pub fn summary(&self) -> Vec<SummaryEntry> {
        let surface = self
            .surface
            .normalize("surface")
            .map(|value| format!("{value} m²"))
            .ok();
        let year = self
            .year
            .normalize("year")
            .map(|value| format!("{value}"))
            .ok();

        vec![
            SummaryEntry::new("Address", non_blank(&self.address)),
            SummaryEntry::new("Type", self.property_type.map(|kind| kind.label().to_string())),
            SummaryEntry::new("Surface", surface),
            SummaryEntry::new("Rooms", non_blank(&self.rooms.display())),
            SummaryEntry::new("Year", year),
            SummaryEntry::new("Condition", self.condition.map(|c| c.label().to_string())),
        ]
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub const NOT_PROVIDED: &str = "Not provided";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub label: &'static str,
    pub value: String,
    pub provided: bool,
}

impl SummaryEntry {
    fn new(label: &'static str, value: Option<String>) -> Self {
        match value {
            Some(value) => Self {
                label,
                value,
                provided: true,
            },
            None => Self {
                label,
                value: NOT_PROVIDED.to_string(),
                provided: false,
            },
        }
    }
}

/// Partial update coming from one intake step. Absent keys leave the field
/// untouched; coordinates are not patchable, only geocoding sets them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DraftPatch {
    pub address: Option<String>,
    pub property_type: Option<PropertyType>,
    pub surface: Option<NumericField>,
    pub rooms: Option<CountField>,
    pub bedrooms: Option<CountField>,
    pub bathrooms: Option<CountField>,
    pub year: Option<NumericField>,
    pub condition: Option<Condition>,
    pub parking: Option<Parking>,
    pub garden: Option<OutdoorSpace>,
    pub balcony: Option<String>,
    pub floor: Option<CountField>,
    pub elevator: Option<String>,
}

impl DraftPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply_to(self, draft: &mut PropertyDraft) {
        let DraftPatch {
            address,
            property_type,
            surface,
            rooms,
            bedrooms,
            bathrooms,
            year,
            condition,
            parking,
            garden,
            balcony,
            floor,
            elevator,
        } = self;

        if let Some(address) = address {
            draft.address = address;
        }
        if property_type.is_some() {
            draft.property_type = property_type;
        }
        if let Some(surface) = surface {
            draft.surface = surface;
        }
        if let Some(rooms) = rooms {
            draft.rooms = rooms;
        }
        if let Some(bedrooms) = bedrooms {
            draft.bedrooms = bedrooms;
        }
        if let Some(bathrooms) = bathrooms {
            draft.bathrooms = bathrooms;
        }
        if let Some(year) = year {
            draft.year = year;
        }
        if condition.is_some() {
            draft.condition = condition;
        }
        if parking.is_some() {
            draft.parking = parking;
        }
        if garden.is_some() {
            draft.garden = garden;
        }
        if let Some(balcony) = balcony {
            draft.balcony = balcony;
        }
        if let Some(floor) = floor {
            draft.floor = floor;
        }
        if let Some(elevator) = elevator {
            draft.elevator = elevator;
        }
    }
}
