use std::sync::Arc;

use super::currency::{CurrencyConverter, RateSource};
use super::geocode::Geocoder;
use super::http::{build_client, HttpGeocoder, HttpRateSource, HttpValuationService};
use super::pipeline::{EstimationPipeline, ValuationService};
use super::results::ResultsSurface;
use crate::config::{AppConfig, CurrencyConfig};

/// Process-wide collaborators. The converter is shared so the exchange rate
/// is fetched once for the whole session.
#[derive(Clone)]
pub struct EstimationServices {
    pub geocoder: Arc<dyn Geocoder>,
    pub pipeline: EstimationPipeline,
    pub converter: Arc<CurrencyConverter>,
}

impl EstimationServices {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        valuation: Arc<dyn ValuationService>,
        rates: Arc<dyn RateSource>,
        currency: &CurrencyConfig,
    ) -> Self {
        Self {
            geocoder,
            pipeline: EstimationPipeline::new(valuation),
            converter: Arc::new(CurrencyConverter::new(rates, currency)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, reqwest::Error> {
        let client = build_client()?;
        let endpoints = &config.services;
        Ok(Self::new(
            Arc::new(HttpGeocoder::new(client.clone(), &endpoints.geocode_url)),
            Arc::new(HttpValuationService::new(
                client.clone(),
                &endpoints.valuation_url,
            )),
            Arc::new(HttpRateSource::new(client, &endpoints.exchange_rate_url)),
            &config.currency,
        ))
    }

    /// Fresh results view backed by the shared converter.
    pub fn results_surface(&self) -> ResultsSurface {
        ResultsSurface::new(self.pipeline.clone(), Arc::clone(&self.converter))
    }
}
