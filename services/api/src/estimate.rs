use crate::infra::parse_wire;
use clap::Args;
use estimpro::config::{AppConfig, TelemetryConfig};
use estimpro::error::AppError;
use estimpro::telemetry;
use estimpro::workflows::estimation::{
    format_amount, generate_report, Condition, CountField, DraftPatch, EstimationServices,
    EstimationWizard, NumericField, OutdoorSpace, Parking, PropertyType, ReportError,
    ReportFormat, ResultsPage,
};
use std::io;
use std::path::PathBuf;

/// Property attributes as collected by the intake wizard, one flag per field.
#[derive(Args, Debug, Clone)]
pub(crate) struct PropertyArgs {
    /// Full street address; geocoded before submission
    #[arg(long)]
    pub(crate) address: String,
    #[arg(long, value_parser = parse_wire::<PropertyType>)]
    pub(crate) property_type: PropertyType,
    /// Living surface in m² (10 to 500)
    #[arg(long, default_value_t = 100.0)]
    pub(crate) surface: f64,
    /// Room count; buckets such as "6+" are accepted
    #[arg(long)]
    pub(crate) rooms: String,
    #[arg(long)]
    pub(crate) bedrooms: String,
    #[arg(long)]
    pub(crate) bathrooms: String,
    /// Construction year (1900 to the current year)
    #[arg(long, default_value_t = 2000.0)]
    pub(crate) year: f64,
    #[arg(long, value_parser = parse_wire::<Condition>)]
    pub(crate) condition: Condition,
    #[arg(long, value_parser = parse_wire::<Parking>)]
    pub(crate) parking: Option<Parking>,
    #[arg(long, value_parser = parse_wire::<OutdoorSpace>)]
    pub(crate) garden: Option<OutdoorSpace>,
    /// Floor level; negative for basements
    #[arg(long, default_value = "0", allow_negative_numbers = true)]
    pub(crate) floor: String,
    #[arg(long)]
    pub(crate) balcony: Option<String>,
    #[arg(long)]
    pub(crate) elevator: Option<String>,
}

impl PropertyArgs {
    /// One patch per intake step, in wizard order.
    fn into_patches(self) -> [DraftPatch; 3] {
        let location = DraftPatch {
            address: Some(self.address),
            property_type: Some(self.property_type),
            surface: Some(NumericField::Sequence(vec![self.surface])),
            ..DraftPatch::default()
        };
        let layout = DraftPatch {
            rooms: Some(CountField::from(self.rooms.as_str())),
            bedrooms: Some(CountField::from(self.bedrooms.as_str())),
            bathrooms: Some(CountField::from(self.bathrooms.as_str())),
            year: Some(NumericField::Sequence(vec![self.year])),
            ..DraftPatch::default()
        };
        let features = DraftPatch {
            condition: Some(self.condition),
            parking: self.parking,
            garden: self.garden,
            balcony: self.balcony,
            floor: Some(CountField::from(self.floor.as_str())),
            elevator: self.elevator,
            ..DraftPatch::default()
        };
        [location, layout, features]
    }
}

#[derive(Args, Debug)]
pub(crate) struct EstimateArgs {
    #[command(flatten)]
    pub(crate) property: PropertyArgs,
    /// Print the full results view as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    #[command(flatten)]
    pub(crate) property: PropertyArgs,
    /// Directory the report file is written to
    #[arg(long, default_value = ".")]
    pub(crate) output_dir: PathBuf,
    /// Export format: text or csv
    #[arg(long, default_value = "text", value_parser = parse_format)]
    pub(crate) format: ReportFormat,
}

pub(crate) fn parse_format(raw: &str) -> Result<ReportFormat, String> {
    raw.parse()
        .map_err(|err: ReportError| format!("{err}, expected text or csv"))
}

/// Walks the wizard through every intake step and stops at confirmation.
pub(crate) fn fill_wizard(property: PropertyArgs) -> Result<EstimationWizard, AppError> {
    let mut wizard = EstimationWizard::new();
    for patch in property.into_patches() {
        wizard.apply(patch)?;
        wizard.next();
    }
    Ok(wizard)
}

/// Library events are logged the same way the server logs them.
fn init_cli_telemetry(config: &TelemetryConfig) -> Result<(), AppError> {
    telemetry::init(config)?;
    Ok(())
}

async fn run_estimation(
    property: PropertyArgs,
) -> Result<(EstimationServices, Box<ResultsPage>), AppError> {
    let config = AppConfig::load()?;
    init_cli_telemetry(&config.telemetry)?;
    let services = EstimationServices::from_config(&config)?;

    let wizard = fill_wizard(property)?;
    let handoff = wizard
        .submit(services.geocoder.as_ref())
        .await
        .map_err(|rejected| AppError::Wizard(rejected.error))?;

    let page = services
        .results_surface()
        .load(Some(handoff.property_data()))
        .await
        .into_page()?;
    Ok((services, page))
}

pub(crate) async fn run_estimate(args: EstimateArgs) -> Result<(), AppError> {
    let EstimateArgs { property, json } = args;
    let (_, page) = run_estimation(property).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&page)
            .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::Other, err)))?;
        println!("{rendered}");
    } else {
        render_results(&page);
    }
    Ok(())
}

pub(crate) async fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let ReportArgs {
        property,
        output_dir,
        format,
    } = args;
    let (services, page) = run_estimation(property).await?;

    let report = generate_report(
        &page.property,
        &page.valuation,
        &services.converter.rate_status(),
    )?;
    let body = report.render(format)?;

    std::fs::create_dir_all(&output_dir)?;
    let path = output_dir.join(report.file_name(format));
    std::fs::write(&path, body)?;

    println!("Report written to {}", path.display());
    Ok(())
}

fn render_results(page: &ResultsPage) {
    let valuation = &page.valuation;
    let converted = &page.converted;

    println!("Estimation for {}", page.property.address);
    println!(
        "- Estimated value: {} / {}",
        format_amount(page.estimated_price, &page.currency),
        converted.estimated_price.display(&converted.currency)
    );
    println!(
        "- Range: {} to {}",
        format_amount(valuation.price_min, &page.currency),
        format_amount(valuation.price_max, &page.currency)
    );
    println!(
        "- Price per m²: {} | confidence {}%",
        format_amount(valuation.price_per_sqm, &page.currency),
        valuation.confidence_score
    );
    println!(
        "- Exchange rate: 1 {} = {:.4} {}",
        page.exchange_rate.base(),
        page.exchange_rate.rate(),
        page.exchange_rate.target()
    );
    println!(
        "- Market: {} from {} to {} over {} periods",
        page.market.change_label(),
        page.market.first_period,
        page.market.last_period,
        page.market.periods
    );

    if !valuation.comparable_properties.is_empty() {
        println!("Comparable sales:");
        for comparable in &valuation.comparable_properties {
            println!(
                "  - {} | {} | {} m² | sold {}",
                comparable.address,
                format_amount(comparable.price, &page.currency),
                comparable.surface,
                comparable.sold_date.format("%Y-%m-%d")
            );
        }
    }

    println!("{}", page.recommendation);
}
