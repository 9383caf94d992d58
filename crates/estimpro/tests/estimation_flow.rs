use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use estimpro::config::CurrencyConfig;
use estimpro::workflows::estimation::report::{SectionContent, SectionKind};
use estimpro::workflows::estimation::{
    generate_report, Condition, Coordinates, CountField, DraftPatch, EstimationError,
    EstimationServices, EstimationWizard, ExchangeRate, GeocodeError, Geocoder, MarketDirection,
    NormalizedDraft, NumericField, PropertyType, RateSource, RateStatus, ReportFormat,
    ResultsView, ServiceReply, ValuationService, WizardStep,
};
use serde_json::json;

const ADDRESS: &str = "123 Rue de la Paix, 75001 Paris";

struct ParisGeocoder;

#[async_trait]
impl Geocoder for ParisGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        if address.contains("Paris") {
            Ok(Coordinates {
                latitude: 48.8698,
                longitude: 2.3311,
            })
        } else {
            Err(GeocodeError::NotFound(address.to_string()))
        }
    }
}

#[derive(Default)]
struct ScriptedValuation {
    requests: Mutex<Vec<NormalizedDraft>>,
}

#[async_trait]
impl ValuationService for ScriptedValuation {
    async fn submit(&self, request: &NormalizedDraft) -> Result<ServiceReply, EstimationError> {
        self.requests.lock().expect("request log").push(request.clone());
        Ok(ServiceReply {
            status: 200,
            body: json!({
                "estimated_price": 485000,
                "price_min": 460000,
                "price_max": 510000,
                "price_per_sqm": 4850,
                "confidence_score": 92,
                "market_trends": [
                    {"month": "Jan", "price": 4200},
                    {"month": "Feb", "price": 4350},
                    {"month": "Mar", "price": 4400},
                    {"month": "Apr", "price": 4600},
                    {"month": "May", "price": 4700},
                    {"month": "Jun", "price": 4850}
                ],
                "comparable_properties": [
                    {
                        "address": "125 Rue de Rivoli",
                        "price": 495000,
                        "surface": 98,
                        "price_per_sqm": 5051,
                        "sold_date": "2024-03-15"
                    },
                    {
                        "address": "89 Rue Saint-Honoré",
                        "price": 470000,
                        "surface": 102,
                        "price_per_sqm": 4608,
                        "sold_date": "2024-02-02"
                    }
                ],
                "factors_analysis": {
                    "location": 15,
                    "condition": 5,
                    "surface": 3
                }
            })
            .to_string(),
        })
    }
}

struct CountingRates {
    calls: AtomicUsize,
}

#[async_trait]
impl RateSource for CountingRates {
    async fn fetch_rate(&self, base: &str, target: &str) -> Result<ExchangeRate, EstimationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        ExchangeRate::new(base, target, 1.08)
    }
}

fn services() -> (EstimationServices, Arc<ScriptedValuation>, Arc<CountingRates>) {
    let valuation = Arc::new(ScriptedValuation::default());
    let rates = Arc::new(CountingRates {
        calls: AtomicUsize::new(0),
    });
    let services = EstimationServices::new(
        Arc::new(ParisGeocoder),
        valuation.clone(),
        rates.clone(),
        &CurrencyConfig {
            base: "EUR".to_string(),
            target: "USD".to_string(),
        },
    );
    (services, valuation, rates)
}

fn completed_wizard() -> EstimationWizard {
    let mut wizard = EstimationWizard::new();
    let steps = [
        DraftPatch {
            address: Some(ADDRESS.to_string()),
            property_type: Some(PropertyType::Apartment),
            surface: Some(NumericField::Sequence(vec![100.0])),
            ..DraftPatch::default()
        },
        DraftPatch {
            rooms: Some(CountField::from("3")),
            bedrooms: Some(CountField::from("2")),
            bathrooms: Some(CountField::from("1")),
            year: Some(NumericField::Scalar(1990.0)),
            ..DraftPatch::default()
        },
        DraftPatch {
            condition: Some(Condition::Good),
            ..DraftPatch::default()
        },
    ];
    for patch in steps {
        wizard.apply(patch).expect("valid step");
        wizard.next();
    }
    assert_eq!(wizard.step(), WizardStep::Confirmation);
    wizard
}

#[tokio::test]
async fn intake_to_report_keeps_the_service_figures() {
    let (services, valuation, rates) = services();

    let handoff = completed_wizard()
        .submit(services.geocoder.as_ref())
        .await
        .expect("geocoded handoff");

    let page = services
        .results_surface()
        .load(Some(handoff.property_data()))
        .await
        .into_page()
        .expect("ready results");

    assert_eq!(page.estimated_price, 485_000.0);
    assert_eq!(page.market.direction, MarketDirection::Rising);
    assert_eq!(page.market.change_label(), "+15.5%");

    let requests = valuation.requests.lock().expect("request log");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].address, ADDRESS);
    assert_eq!(requests[0].surface, 100.0);
    assert_eq!(requests[0].rooms, 3);
    assert_eq!(requests[0].floor, 0);
    drop(requests);
    assert_eq!(rates.calls.load(Ordering::SeqCst), 1);

    let report = generate_report(
        &page.property,
        &page.valuation,
        &services.converter.rate_status(),
    )
    .expect("report");
    let kinds: Vec<_> = report.sections.iter().map(|section| section.kind).collect();
    assert_eq!(kinds, SectionKind::ordered().to_vec());

    let recommendation = report
        .section(SectionKind::Recommendation)
        .expect("recommendation section");
    let SectionContent::Recommendation(view) = &recommendation.content else {
        panic!("recommendation section holds a recommendation");
    };
    assert_eq!(view.change, "+15.5%");
    assert_eq!(view.headline, "Rising market: recommend selling now");

    let first = report.render(ReportFormat::Text).expect("text");
    let second = report.render(ReportFormat::Text).expect("text");
    assert_eq!(first, second);
    assert_eq!(
        report.file_name(ReportFormat::Csv),
        "estimation_123_Rue_de_la_Paix,_75001_Paris.csv"
    );
}

#[tokio::test]
async fn unknown_address_returns_the_wizard_unchanged() {
    let (services, valuation, _) = services();
    let mut wizard = completed_wizard();
    wizard
        .apply(DraftPatch {
            address: Some("1 Nowhere Lane".to_string()),
            ..DraftPatch::default()
        })
        .expect("address patch");
    let before = wizard.draft().clone();

    let rejected = wizard
        .submit(services.geocoder.as_ref())
        .await
        .expect_err("lookup fails");

    assert_eq!(rejected.wizard.step(), WizardStep::Confirmation);
    assert_eq!(rejected.wizard.draft(), &before);
    assert!(valuation.requests.lock().expect("request log").is_empty());
}

#[tokio::test]
async fn concurrent_results_views_share_one_rate_fetch() {
    let (services, _, rates) = services();
    let handoff = completed_wizard()
        .submit(services.geocoder.as_ref())
        .await
        .expect("geocoded handoff");
    let data = handoff.property_data();

    let first = services.results_surface();
    let second = services.results_surface();
    let third = services.results_surface();
    let (a, b, c) = tokio::join!(
        first.load(Some(data)),
        second.load(Some(data)),
        third.load(Some(data))
    );

    for view in [a, b, c] {
        assert!(matches!(view, ResultsView::Ready(_)));
    }
    assert_eq!(rates.calls.load(Ordering::SeqCst), 1);
    assert!(matches!(
        services.converter.rate_status(),
        RateStatus::Ready(_)
    ));
}
