use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::error::EstimationError;

/// Valuation returned by the remote service. Amounts are in the base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationResult {
    pub estimated_price: f64,
    pub price_min: f64,
    pub price_max: f64,
    pub price_per_sqm: f64,
    pub confidence_score: u8,
    pub market_trends: Vec<MarketTrendPoint>,
    #[serde(default)]
    pub comparable_properties: Vec<ComparableProperty>,
    #[serde(default)]
    pub factors_analysis: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTrendPoint {
    #[serde(alias = "month")]
    pub period: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparableProperty {
    pub address: String,
    pub price: f64,
    pub surface: f64,
    pub price_per_sqm: f64,
    #[serde(alias = "sold")]
    pub sold_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketDirection {
    Rising,
    Declining,
}

impl MarketDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rising => "Rising market: recommend selling now",
            Self::Declining => "Declining market: recommend waiting",
        }
    }
}

/// Movement between the first and last trend points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketChange {
    pub first_period: String,
    pub last_period: String,
    pub first_price: f64,
    pub last_price: f64,
    pub periods: usize,
    pub change_pct: f64,
    pub direction: MarketDirection,
}

impl MarketChange {
    /// Signed, one decimal place, e.g. `+15.5%`.
    pub fn change_label(&self) -> String {
        format!("{:+.1}%", self.change_pct)
    }
}

impl EstimationResult {
    pub fn from_json(body: &str) -> Result<Self, EstimationError> {
        let result: Self = serde_json::from_str(body).map_err(|err| {
            EstimationError::Parse(format!("valuation response is incomplete: {err}"))
        })?;
        result.validate()?;
        Ok(result)
    }

    pub fn validate(&self) -> Result<(), EstimationError> {
        let amounts = [
            ("estimated_price", self.estimated_price),
            ("price_min", self.price_min),
            ("price_max", self.price_max),
            ("price_per_sqm", self.price_per_sqm),
        ];
        for (field, value) in amounts {
            ensure_amount(field, value)?;
        }

        if !(self.price_min <= self.estimated_price && self.estimated_price <= self.price_max) {
            return Err(EstimationError::Parse(format!(
                "estimated_price {} lies outside [{}, {}]",
                self.estimated_price, self.price_min, self.price_max
            )));
        }

        if self.confidence_score > 100 {
            return Err(EstimationError::Parse(format!(
                "confidence_score {} exceeds 100",
                self.confidence_score
            )));
        }

        if self.market_trends.len() < 2 {
            return Err(EstimationError::Parse(format!(
                "market_trends needs at least two points, got {}",
                self.market_trends.len()
            )));
        }
        for point in &self.market_trends {
            ensure_amount("market_trends.price", point.price)?;
        }
        if self.market_trends[0].price <= 0.0 {
            return Err(EstimationError::Parse(
                "first market trend price must be positive".to_string(),
            ));
        }

        for comparable in &self.comparable_properties {
            ensure_amount("comparable_properties.price", comparable.price)?;
            ensure_amount("comparable_properties.surface", comparable.surface)?;
            ensure_amount("comparable_properties.price_per_sqm", comparable.price_per_sqm)?;
        }

        if let Some((factor, _)) = self
            .factors_analysis
            .iter()
            .find(|(_, impact)| !impact.is_finite())
        {
            return Err(EstimationError::Parse(format!(
                "factor '{factor}' has no numeric impact"
            )));
        }

        Ok(())
    }

    pub fn market_change(&self) -> MarketChange {
        let first = &self.market_trends[0];
        let last = &self.market_trends[self.market_trends.len() - 1];
        let change_pct = (last.price - first.price) / first.price * 100.0;
        let direction = if last.price > first.price {
            MarketDirection::Rising
        } else {
            MarketDirection::Declining
        };

        MarketChange {
            first_period: first.period.clone(),
            last_period: last.period.clone(),
            first_price: first.price,
            last_price: last.price,
            periods: self.market_trends.len(),
            change_pct,
            direction,
        }
    }
}

fn ensure_amount(field: &str, value: f64) -> Result<(), EstimationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EstimationError::Parse(format!(
            "{field} must be a non-negative amount, got {value}"
        )))
    }
}
