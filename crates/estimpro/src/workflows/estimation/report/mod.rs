mod builder;
mod export;
pub mod views;

pub use builder::{generate_report, ValuationReport, REPORT_TITLE};
pub use export::{export_file_name, ReportFormat};
pub use views::{
    RecommendationView, ReportField, ReportSection, ReportTable, SectionContent, SectionKind,
};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("exchange rate is {0}; a report needs a ready rate")]
    RateNotReady(&'static str),
    #[error("unknown report format '{0}', expected text or csv")]
    UnknownFormat(String),
    #[error("failed to write csv export: {0}")]
    Csv(#[from] csv::Error),
    #[error("report is not valid utf-8: {0}")]
    Encoding(String),
}
