//! Property estimation workflow.
//!
//! The wizard collects a [`PropertyDraft`], geocodes it and seals it into a
//! [`Handoff`]. The results side decodes that handoff, submits the normalized
//! draft to the valuation service and fetches an exchange rate in parallel;
//! the report generator turns both into a fixed five-section document.

pub mod currency;
pub mod domain;
pub mod draft;
mod error;
pub mod geocode;
pub mod handoff;
pub mod http;
pub mod pipeline;
pub mod report;
pub mod result;
pub mod results;
mod services;
pub mod wizard;

pub use currency::{
    format_amount, Conversion, ConversionDirection, CurrencyConverter, ExchangeRate, RateSource,
    RateStatus,
};
pub use domain::{
    Condition, CountField, NumericField, OutdoorSpace, Parking, PropertyType, WireEnum,
};
pub use draft::{DraftPatch, PropertyDraft};
pub use error::{EstimationError, RecoveryAction};
pub use geocode::{Coordinates, GeocodeError, Geocoder};
pub use handoff::{decode_property_data, Handoff, PROPERTY_DATA_PARAM};
pub use pipeline::{
    normalize_draft, Acquisition, EstimationPipeline, NormalizedDraft, ServiceReply,
    ValuationService,
};
pub use report::{generate_report, ReportError, ReportFormat, ValuationReport};
pub use result::{ComparableProperty, EstimationResult, MarketDirection, MarketTrendPoint};
pub use results::{ResultsFailure, ResultsPage, ResultsSurface, ResultsView};
pub use services::EstimationServices;
pub use wizard::{Advance, EstimationWizard, RejectedSubmission, WizardError, WizardStep};
