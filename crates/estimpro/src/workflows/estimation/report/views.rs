use serde::Serialize;

use super::super::result::MarketDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    PropertyDetails,
    ValuationSummary,
    MarketTrends,
    Comparables,
    Recommendation,
}

impl SectionKind {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::PropertyDetails,
            Self::ValuationSummary,
            Self::MarketTrends,
            Self::Comparables,
            Self::Recommendation,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PropertyDetails => "Property details",
            Self::ValuationSummary => "Valuation summary",
            Self::MarketTrends => "Market trends",
            Self::Comparables => "Comparable sales",
            Self::Recommendation => "Recommendation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportField {
    pub label: String,
    pub value: String,
}

impl ReportField {
    pub(crate) fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationView {
    pub direction: MarketDirection,
    pub headline: &'static str,
    pub change: String,
    pub first_period: String,
    pub last_period: String,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SectionContent {
    Fields { fields: Vec<ReportField> },
    Table(ReportTable),
    Recommendation(RecommendationView),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSection {
    pub kind: SectionKind,
    pub title: &'static str,
    pub content: SectionContent,
}

impl ReportSection {
    pub(crate) fn new(kind: SectionKind, content: SectionContent) -> Self {
        Self {
            kind,
            title: kind.label(),
            content,
        }
    }
}
