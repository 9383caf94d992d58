use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use super::currency::{Conversion, ConversionDirection, CurrencyConverter, ExchangeRate};
use super::error::{EstimationError, RecoveryAction};
use super::pipeline::{EstimationPipeline, NormalizedDraft};
use super::result::{EstimationResult, MarketChange};

/// Converted counterparts of the headline figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertedFigures {
    pub currency: String,
    pub estimated_price: Conversion,
    pub price_min: Conversion,
    pub price_max: Conversion,
    pub price_per_sqm: Conversion,
}

impl ConvertedFigures {
    fn from_converter(converter: &CurrencyConverter, result: &EstimationResult) -> Self {
        let to_target = |amount| converter.convert(amount, ConversionDirection::BaseToTarget);
        Self {
            currency: converter.target_currency().to_string(),
            estimated_price: to_target(result.estimated_price),
            price_min: to_target(result.price_min),
            price_max: to_target(result.price_max),
            price_per_sqm: to_target(result.price_per_sqm),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsPage {
    pub property: NormalizedDraft,
    pub currency: String,
    /// Exactly what the valuation service returned.
    pub estimated_price: f64,
    pub valuation: Arc<EstimationResult>,
    pub converted: ConvertedFigures,
    pub exchange_rate: ExchangeRate,
    pub market: MarketChange,
    pub recommendation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDetail {
    pub kind: &'static str,
    pub message: String,
    #[serde(skip)]
    pub error: EstimationError,
}

impl From<&EstimationError> for FailureDetail {
    fn from(error: &EstimationError) -> Self {
        Self {
            kind: error.kind(),
            message: error.user_message(),
            error: error.clone(),
        }
    }
}

/// Each independent fetch reports its own failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsFailure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valuation: Option<FailureDetail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<FailureDetail>,
    pub recovery_actions: Vec<RecoveryAction>,
}

impl ResultsFailure {
    fn new(valuation: Option<&EstimationError>, exchange_rate: Option<&EstimationError>) -> Self {
        let mut recovery_actions = Vec::new();
        for error in valuation.into_iter().chain(exchange_rate) {
            for action in error.recovery_actions() {
                if !recovery_actions.contains(action) {
                    recovery_actions.push(*action);
                }
            }
        }

        Self {
            valuation: valuation.map(FailureDetail::from),
            exchange_rate: exchange_rate.map(FailureDetail::from),
            recovery_actions,
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &EstimationError> {
        self.valuation
            .iter()
            .chain(self.exchange_rate.iter())
            .map(|detail| &detail.error)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResultsView {
    Loading,
    Ready(Box<ResultsPage>),
    Error(ResultsFailure),
}

impl ResultsView {
    /// Collapses a settled view into its page, or the first failure when the
    /// load did not succeed.
    pub fn into_page(self) -> Result<Box<ResultsPage>, EstimationError> {
        match self {
            Self::Ready(page) => Ok(page),
            Self::Error(failure) => Err(failure
                .errors()
                .next()
                .cloned()
                .unwrap_or(EstimationError::MissingInput)),
            Self::Loading => Err(EstimationError::Network(
                "results are still loading".to_string(),
            )),
        }
    }
}

/// Identifies one load of the results surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Drives one results view: valuation and exchange rate are fetched
/// concurrently and the view only leaves `Loading` once both settle.
/// Completions from an older load are dropped.
pub struct ResultsSurface {
    pipeline: EstimationPipeline,
    converter: Arc<CurrencyConverter>,
    generation: AtomicU64,
    view: Mutex<ResultsView>,
}

impl ResultsSurface {
    pub fn new(pipeline: EstimationPipeline, converter: Arc<CurrencyConverter>) -> Self {
        Self {
            pipeline,
            converter,
            generation: AtomicU64::new(0),
            view: Mutex::new(ResultsView::Loading),
        }
    }

    pub fn view(&self) -> ResultsView {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn begin(&self) -> LoadTicket {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.view.lock().unwrap_or_else(PoisonError::into_inner) = ResultsView::Loading;
        LoadTicket { generation }
    }

    /// Publishes `outcome` if `ticket` still belongs to the active load.
    pub fn complete(&self, ticket: LoadTicket, outcome: ResultsView) -> bool {
        let mut view = self.view.lock().unwrap_or_else(PoisonError::into_inner);
        let active = self.generation.load(Ordering::SeqCst);
        if ticket.generation != active {
            tracing::debug!(
                stale = ticket.generation,
                active,
                "discarding stale results completion"
            );
            return false;
        }
        *view = outcome;
        true
    }

    /// Invalidates whatever is in flight; late completions are discarded.
    pub fn teardown(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.view.lock().unwrap_or_else(PoisonError::into_inner) = ResultsView::Loading;
    }

    pub async fn load(&self, property_data: Option<&str>) -> ResultsView {
        let ticket = self.begin();
        let outcome = self.resolve(property_data).await;
        self.complete(ticket, outcome.clone());
        outcome
    }

    /// Computes a view without publishing it.
    pub async fn resolve(&self, property_data: Option<&str>) -> ResultsView {
        // Decoding is local; a bad handoff never triggers either fetch.
        let request = match self.pipeline.prepare(property_data) {
            Ok(request) => request,
            Err(err) => {
                tracing::warn!(error = %err, "results input rejected");
                return ResultsView::Error(ResultsFailure::new(Some(&err), None));
            }
        };

        // Every load re-runs the whole flow, so a previously failed rate is
        // fetched again rather than served from the cache.
        self.converter.retry();

        let (acquisition, rate) = tokio::join!(
            self.pipeline.submit(request),
            self.converter.ensure_rate()
        );

        match (acquisition, rate) {
            (Ok(acquisition), Ok(rate)) => {
                let result = acquisition.result;
                let market = result.market_change();
                let page = ResultsPage {
                    currency: rate.base().to_string(),
                    estimated_price: result.estimated_price,
                    converted: ConvertedFigures::from_converter(&self.converter, &result),
                    exchange_rate: rate,
                    recommendation: market.direction.label(),
                    market,
                    property: acquisition.draft,
                    valuation: result,
                };
                ResultsView::Ready(Box::new(page))
            }
            (acquisition, rate) => ResultsView::Error(ResultsFailure::new(
                acquisition.as_ref().err(),
                rate.as_ref().err(),
            )),
        }
    }
}
