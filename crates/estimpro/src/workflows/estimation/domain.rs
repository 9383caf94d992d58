use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::EstimationError;

/// Closed set of form options carried on the wire as lowercase keys.
pub trait WireEnum: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn as_wire(self) -> &'static str;

    fn label(self) -> &'static str;

    fn from_wire(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.as_wire().eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Apartment,
    House,
    Studio,
    Loft,
    Duplex,
}

impl WireEnum for PropertyType {
    const ALL: &'static [Self] = &[
        Self::Apartment,
        Self::House,
        Self::Studio,
        Self::Loft,
        Self::Duplex,
    ];

    fn as_wire(self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::House => "house",
            Self::Studio => "studio",
            Self::Loft => "loft",
            Self::Duplex => "duplex",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Apartment => "Apartment",
            Self::House => "House",
            Self::Studio => "Studio",
            Self::Loft => "Loft",
            Self::Duplex => "Duplex",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Excellent,
    Good,
    Average,
    Renovation,
}

impl WireEnum for Condition {
    const ALL: &'static [Self] = &[Self::Excellent, Self::Good, Self::Average, Self::Renovation];

    fn as_wire(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Average => "average",
            Self::Renovation => "renovation",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Renovation => "Needs renovation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parking {
    #[serde(rename = "none")]
    Absent,
    Street,
    Garage,
    Covered,
}

impl WireEnum for Parking {
    const ALL: &'static [Self] = &[Self::Absent, Self::Street, Self::Garage, Self::Covered];

    fn as_wire(self) -> &'static str {
        match self {
            Self::Absent => "none",
            Self::Street => "street",
            Self::Garage => "garage",
            Self::Covered => "covered",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Absent => "None",
            Self::Street => "Street",
            Self::Garage => "Garage",
            Self::Covered => "Covered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutdoorSpace {
    #[serde(rename = "none")]
    Absent,
    Balcony,
    Terrace,
    Garden,
}

impl WireEnum for OutdoorSpace {
    const ALL: &'static [Self] = &[Self::Absent, Self::Balcony, Self::Terrace, Self::Garden];

    fn as_wire(self) -> &'static str {
        match self {
            Self::Absent => "none",
            Self::Balcony => "balcony",
            Self::Terrace => "terrace",
            Self::Garden => "garden",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Absent => "None",
            Self::Balcony => "Balcony",
            Self::Terrace => "Terrace",
            Self::Garden => "Garden",
        }
    }
}

/// Unset options travel as `""`, the same way the intake form leaves them.
pub(crate) fn serialize_optional_wire<T, S>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    T: WireEnum,
    S: Serializer,
{
    serializer.serialize_str(value.map(WireEnum::as_wire).unwrap_or(""))
}

pub(crate) fn deserialize_optional_wire<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: WireEnum,
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => T::from_wire(value).map(Some).ok_or_else(|| {
            let expected = T::ALL
                .iter()
                .map(|item| item.as_wire())
                .collect::<Vec<_>>()
                .join(", ");
            serde::de::Error::custom(format!("unknown option '{value}', expected one of {expected}"))
        }),
    }
}

/// Numeric input that arrives either bare or wrapped in a one-element list
/// (the range slider reports its value as `[100]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Scalar(f64),
    Sequence(Vec<f64>),
}

impl NumericField {
    /// The single normalization point for dual-shape fields.
    pub fn normalize(&self, field: &'static str) -> Result<f64, EstimationError> {
        let value = match self {
            Self::Scalar(value) => *value,
            Self::Sequence(values) => match values.as_slice() {
                [value] => *value,
                [] => return Err(EstimationError::Parse(format!("{field} is empty"))),
                _ => {
                    return Err(EstimationError::Parse(format!(
                        "{field} must hold a single value, got {}",
                        values.len()
                    )))
                }
            },
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(EstimationError::Parse(format!("{field} is not a finite number")))
        }
    }
}

impl From<f64> for NumericField {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

/// Count-like selection: a number, a numeric string, or a bucket such as `"6+"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountField {
    Number(i64),
    Text(String),
}

impl Default for CountField {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl CountField {
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    /// Coerce to an integer. A bucket `"N+"` maps to its lower bound `N`;
    /// a blank value yields `None`.
    pub fn coerce(&self, field: &'static str) -> Result<Option<u32>, EstimationError> {
        let invalid = |raw: &str| {
            EstimationError::Parse(format!("{field} must be a whole number, got '{raw}'"))
        };

        match self {
            Self::Number(value) => u32::try_from(*value)
                .map(Some)
                .map_err(|_| invalid(&value.to_string())),
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                let digits = trimmed.strip_suffix('+').unwrap_or(trimmed).trim();
                digits.parse::<u32>().map(Some).map_err(|_| invalid(trimmed))
            }
        }
    }

    /// Signed coercion for floor levels, where basements are negative.
    pub fn coerce_level(&self, field: &'static str) -> Result<Option<i32>, EstimationError> {
        let invalid = |raw: &str| {
            EstimationError::Parse(format!("{field} must be a whole number, got '{raw}'"))
        };

        match self {
            Self::Number(value) => i32::try_from(*value)
                .map(Some)
                .map_err(|_| invalid(&value.to_string())),
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                let digits = trimmed.strip_suffix('+').unwrap_or(trimmed).trim();
                digits.parse::<i32>().map(Some).map_err(|_| invalid(trimmed))
            }
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(text) => text.trim().to_string(),
        }
    }
}

impl From<&str> for CountField {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u32> for CountField {
    fn from(value: u32) -> Self {
        Self::Number(i64::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_and_single_element_sequence_normalize_identically() {
        for value in [10.0, 100.0, 247.5, 500.0] {
            let scalar = NumericField::Scalar(value).normalize("surface").expect("scalar");
            let sequence = NumericField::Sequence(vec![value])
                .normalize("surface")
                .expect("sequence");
            assert_eq!(scalar, sequence);
        }
    }

    #[test]
    fn sequences_with_other_lengths_are_rejected() {
        assert!(matches!(
            NumericField::Sequence(Vec::new()).normalize("year"),
            Err(EstimationError::Parse(_))
        ));
        assert!(matches!(
            NumericField::Sequence(vec![1990.0, 2000.0]).normalize("year"),
            Err(EstimationError::Parse(_))
        ));
    }

    #[test]
    fn numeric_field_accepts_both_json_shapes() {
        let bare: NumericField = serde_json::from_str("120").expect("bare");
        let wrapped: NumericField = serde_json::from_str("[120]").expect("wrapped");
        assert_eq!(bare.normalize("surface").unwrap(), 120.0);
        assert_eq!(wrapped.normalize("surface").unwrap(), 120.0);
    }

    #[test]
    fn count_buckets_map_to_lower_bound() {
        assert_eq!(CountField::from("6+").coerce("rooms").unwrap(), Some(6));
        assert_eq!(CountField::from("3").coerce("rooms").unwrap(), Some(3));
        assert_eq!(CountField::Number(2).coerce("rooms").unwrap(), Some(2));
        assert_eq!(CountField::from("  ").coerce("floor").unwrap(), None);
    }

    #[test]
    fn floor_levels_may_be_below_ground() {
        assert_eq!(CountField::from("-1").coerce_level("floor").unwrap(), Some(-1));
        assert_eq!(CountField::Number(-2).coerce_level("floor").unwrap(), Some(-2));
        assert_eq!(CountField::from("10+").coerce_level("floor").unwrap(), Some(10));
        assert_eq!(CountField::from("").coerce_level("floor").unwrap(), None);
        assert!(CountField::from("mezzanine").coerce_level("floor").is_err());
    }

    #[test]
    fn non_numeric_counts_are_parse_errors() {
        for raw in ["many", "+", "-1", "2.5"] {
            assert!(
                matches!(CountField::from(raw).coerce("rooms"), Err(EstimationError::Parse(_))),
                "{raw} should be rejected"
            );
        }
        assert!(CountField::Number(-3).coerce("rooms").is_err());
    }

    #[test]
    fn wire_enums_parse_case_insensitively() {
        assert_eq!(PropertyType::from_wire("Apartment"), Some(PropertyType::Apartment));
        assert_eq!(Parking::from_wire("none"), Some(Parking::Absent));
        assert_eq!(OutdoorSpace::from_wire(" terrace "), Some(OutdoorSpace::Terrace));
        assert_eq!(Condition::from_wire("ruined"), None);
    }

    #[test]
    fn serde_names_match_wire_names() {
        for parking in Parking::ALL {
            let json = serde_json::to_string(parking).expect("serialize");
            assert_eq!(json, format!("\"{}\"", parking.as_wire()));
        }
        for space in OutdoorSpace::ALL {
            let json = serde_json::to_string(space).expect("serialize");
            assert_eq!(json, format!("\"{}\"", space.as_wire()));
        }
    }
}
