use serde::Serialize;

use super::super::currency::{format_amount, ConversionDirection, ExchangeRate, RateStatus};
use super::super::domain::WireEnum;
use super::super::pipeline::NormalizedDraft;
use super::super::result::EstimationResult;
use super::views::{
    RecommendationView, ReportField, ReportSection, ReportTable, SectionContent, SectionKind,
};
use super::ReportError;

pub const REPORT_TITLE: &str = "Property valuation report";

/// Five-section document built from a valuation. Holds no timestamps so the
/// same inputs always render to the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationReport {
    pub title: &'static str,
    pub address: String,
    pub exchange_rate: ExchangeRate,
    pub sections: Vec<ReportSection>,
}

impl ValuationReport {
    pub fn section(&self, kind: SectionKind) -> Option<&ReportSection> {
        self.sections.iter().find(|section| section.kind == kind)
    }
}

pub fn generate_report(
    draft: &NormalizedDraft,
    result: &EstimationResult,
    status: &RateStatus,
) -> Result<ValuationReport, ReportError> {
    let rate = status
        .ready()
        .ok_or_else(|| ReportError::RateNotReady(status.label()))?;
    let money = Money { rate };

    let sections = SectionKind::ordered()
        .into_iter()
        .map(|kind| {
            let content = match kind {
                SectionKind::PropertyDetails => property_details(draft),
                SectionKind::ValuationSummary => valuation_summary(result, &money),
                SectionKind::MarketTrends => market_trends(result, &money),
                SectionKind::Comparables => comparables(result, &money),
                SectionKind::Recommendation => recommendation(result),
            };
            ReportSection::new(kind, content)
        })
        .collect();

    Ok(ValuationReport {
        title: REPORT_TITLE,
        address: draft.address.clone(),
        exchange_rate: rate.clone(),
        sections,
    })
}

struct Money<'a> {
    rate: &'a ExchangeRate,
}

impl Money<'_> {
    fn base(&self, amount: f64) -> String {
        format_amount(amount, self.rate.base())
    }

    fn target(&self, amount: f64) -> String {
        format_amount(
            self.rate.convert(amount, ConversionDirection::BaseToTarget),
            self.rate.target(),
        )
    }

    fn both(&self, amount: f64) -> String {
        format!("{} / {}", self.base(amount), self.target(amount))
    }
}

fn property_details(draft: &NormalizedDraft) -> SectionContent {
    let fields = vec![
        ReportField::new("Address", draft.address.as_str()),
        ReportField::new("Type", draft.property_type.label()),
        ReportField::new("Surface", format!("{} m²", draft.surface)),
        ReportField::new("Rooms", draft.rooms.to_string()),
        ReportField::new("Bedrooms", draft.bedrooms.to_string()),
        ReportField::new("Bathrooms", draft.bathrooms.to_string()),
        ReportField::new("Year built", draft.year.to_string()),
        ReportField::new("Condition", draft.condition.label()),
        ReportField::new("Parking", draft.parking.label()),
        ReportField::new("Outdoor space", draft.garden.label()),
        ReportField::new("Floor", draft.floor.to_string()),
        ReportField::new(
            "Coordinates",
            format!("{:.4}, {:.4}", draft.latitude, draft.longitude),
        ),
    ];
    SectionContent::Fields { fields }
}

fn valuation_summary(result: &EstimationResult, money: &Money<'_>) -> SectionContent {
    let mut fields = vec![
        ReportField::new("Estimated value", money.both(result.estimated_price)),
        ReportField::new(
            "Range",
            format!(
                "{} - {} / {} - {}",
                money.base(result.price_min),
                money.base(result.price_max),
                money.target(result.price_min),
                money.target(result.price_max)
            ),
        ),
        ReportField::new("Price per m²", money.both(result.price_per_sqm)),
        ReportField::new("Confidence", format!("{}%", result.confidence_score)),
        ReportField::new(
            "Exchange rate",
            format!(
                "1 {} = {:.4} {}",
                money.rate.base(),
                money.rate.rate(),
                money.rate.target()
            ),
        ),
    ];

    // BTreeMap iteration keeps factors sorted by name.
    fields.extend(result.factors_analysis.iter().map(|(factor, impact)| {
        ReportField::new(
            format!("Factor: {}", factor.replace('_', " ")),
            format!("{impact:+.1}%"),
        )
    }));

    SectionContent::Fields { fields }
}

fn market_trends(result: &EstimationResult, money: &Money<'_>) -> SectionContent {
    let columns = vec![
        "Period".to_string(),
        format!("Price per m² ({})", money.rate.base()),
        format!("Price per m² ({})", money.rate.target()),
    ];
    let rows = result
        .market_trends
        .iter()
        .map(|point| {
            vec![
                point.period.clone(),
                money.base(point.price),
                money.target(point.price),
            ]
        })
        .collect();
    SectionContent::Table(ReportTable { columns, rows })
}

fn comparables(result: &EstimationResult, money: &Money<'_>) -> SectionContent {
    let columns = vec![
        "Address".to_string(),
        format!("Price ({})", money.rate.base()),
        format!("Price ({})", money.rate.target()),
        "Surface".to_string(),
        format!("Price per m² ({})", money.rate.base()),
        format!("Price per m² ({})", money.rate.target()),
        "Sold".to_string(),
    ];
    let rows = result
        .comparable_properties
        .iter()
        .map(|property| {
            vec![
                property.address.clone(),
                money.base(property.price),
                money.target(property.price),
                format!("{} m²", property.surface),
                money.base(property.price_per_sqm),
                money.target(property.price_per_sqm),
                property.sold_date.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();
    SectionContent::Table(ReportTable { columns, rows })
}

fn recommendation(result: &EstimationResult) -> SectionContent {
    let change = result.market_change();
    let detail = format!(
        "Prices per m² moved {} between {} and {} across {} periods.",
        change.change_label(),
        change.first_period,
        change.last_period,
        change.periods
    );
    SectionContent::Recommendation(RecommendationView {
        direction: change.direction,
        headline: change.direction.label(),
        change: change.change_label(),
        first_period: change.first_period,
        last_period: change.last_period,
        detail,
    })
}
