//! reqwest-backed implementations of the service seams.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::currency::{ExchangeRate, RateSource};
use super::error::EstimationError;
use super::geocode::{Coordinates, GeocodeError, Geocoder};
use super::pipeline::{diagnostic_text, NormalizedDraft, ServiceReply, ValuationService};

const USER_AGENT: &str = concat!("EstimPro/", env!("CARGO_PKG_VERSION"));

pub fn build_client() -> Result<Client, reqwest::Error> {
    Client::builder().user_agent(USER_AGENT).build()
}

pub struct HttpGeocoder {
    client: Client,
    base_url: String,
}

impl HttpGeocoder {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let url = format!("{}/geocode", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("address", address)])
            .send()
            .await
            .map_err(|err| GeocodeError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GeocodeError::NotFound(address.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Unavailable(diagnostic_text(status.as_u16(), &body)));
        }

        response
            .json::<Coordinates>()
            .await
            .map_err(|err| GeocodeError::Unavailable(format!("unreadable geocoding reply: {err}")))
    }
}

pub struct HttpValuationService {
    client: Client,
    base_url: String,
}

impl HttpValuationService {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ValuationService for HttpValuationService {
    async fn submit(&self, request: &NormalizedDraft) -> Result<ServiceReply, EstimationError> {
        let url = format!("{}/estimate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|err| EstimationError::Network(err.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| EstimationError::Network(err.to_string()))?;
        Ok(ServiceReply { status, body })
    }
}

#[derive(Debug, Deserialize)]
struct RatesPayload {
    #[serde(default)]
    base: Option<String>,
    rates: HashMap<String, f64>,
}

pub struct HttpRateSource {
    client: Client,
    url: String,
}

impl HttpRateSource {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<ExchangeRate, EstimationError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|err| EstimationError::Network(err.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| EstimationError::Network(err.to_string()))?;
        if !status.is_success() {
            return Err(EstimationError::Network(diagnostic_text(status.as_u16(), &body)));
        }

        rate_from_body(&body, base, target)
    }
}

fn rate_from_body(body: &str, base: &str, target: &str) -> Result<ExchangeRate, EstimationError> {
    let payload: RatesPayload = serde_json::from_str(body)
        .map_err(|err| EstimationError::Parse(format!("unreadable exchange rates: {err}")))?;

    if let Some(quoted) = payload.base.as_deref() {
        if !quoted.eq_ignore_ascii_case(base) {
            return Err(EstimationError::Parse(format!(
                "exchange rates are quoted against {quoted}, expected {base}"
            )));
        }
    }

    let rate = payload
        .rates
        .get(target)
        .copied()
        .ok_or_else(|| EstimationError::Parse(format!("no {target} rate in reply")))?;
    ExchangeRate::new(base, target, rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_the_target_rate() {
        let body = r#"{"base": "EUR", "rates": {"USD": 1.08, "GBP": 0.85}}"#;
        let rate = rate_from_body(body, "EUR", "USD").unwrap();
        assert_eq!(rate.rate(), 1.08);
        assert_eq!(rate.target(), "USD");
    }

    #[test]
    fn base_may_be_omitted() {
        let rate = rate_from_body(r#"{"rates": {"USD": 1.1}}"#, "EUR", "USD").unwrap();
        assert_eq!(rate.base(), "EUR");
    }

    #[test]
    fn missing_or_mismatched_rates_are_parse_errors() {
        assert!(matches!(
            rate_from_body(r#"{"rates": {"GBP": 0.85}}"#, "EUR", "USD"),
            Err(EstimationError::Parse(_))
        ));
        assert!(matches!(
            rate_from_body(r#"{"base": "USD", "rates": {"USD": 1}}"#, "EUR", "USD"),
            Err(EstimationError::Parse(_))
        ));
        assert!(matches!(
            rate_from_body(r#"{"rates": {"USD": 0}}"#, "EUR", "USD"),
            Err(EstimationError::Parse(_))
        ));
    }

    #[test]
    fn client_builds() {
        assert!(build_client().is_ok());
    }
}
