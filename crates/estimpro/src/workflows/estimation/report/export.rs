use std::fmt::Write as _;
use std::str::FromStr;

use super::builder::ValuationReport;
use super::views::SectionContent;
use super::ReportError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
}

impl ReportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Csv => "csv",
        }
    }

    pub fn content_type(self) -> mime::Mime {
        match self {
            Self::Text => mime::TEXT_PLAIN_UTF_8,
            Self::Csv => mime::TEXT_CSV_UTF_8,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = ReportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "csv" => Ok(Self::Csv),
            other => Err(ReportError::UnknownFormat(other.to_string())),
        }
    }
}

/// `estimation_<address>.<ext>`. Runs of whitespace, `/`, `\` and `"` collapse
/// to `_`, keeping the name a single path component that is safe to quote in
/// a header.
pub fn export_file_name(address: &str, format: ReportFormat) -> String {
    let stem = address
        .split(|c: char| c.is_whitespace() || matches!(c, '/' | '\\' | '"'))
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("_");
    format!("estimation_{stem}.{}", format.extension())
}

impl ValuationReport {
    pub fn file_name(&self, format: ReportFormat) -> String {
        export_file_name(&self.address, format)
    }

    pub fn render(&self, format: ReportFormat) -> Result<String, ReportError> {
        match format {
            ReportFormat::Text => Ok(self.render_text()),
            ReportFormat::Csv => self.render_csv(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title.to_uppercase());
        let _ = writeln!(out, "{}", self.address);

        for (index, section) in self.sections.iter().enumerate() {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}. {}", index + 1, section.title);
            match &section.content {
                SectionContent::Fields { fields } => {
                    for field in fields {
                        let _ = writeln!(out, "   {}: {}", field.label, field.value);
                    }
                }
                SectionContent::Table(table) => {
                    let _ = writeln!(out, "   {}", table.columns.join(" | "));
                    if table.rows.is_empty() {
                        let _ = writeln!(out, "   (none)");
                    }
                    for row in &table.rows {
                        let _ = writeln!(out, "   {}", row.join(" | "));
                    }
                }
                SectionContent::Recommendation(view) => {
                    let _ = writeln!(out, "   {} ({})", view.headline, view.change);
                    let _ = writeln!(out, "   {}", view.detail);
                }
            }
        }
        out
    }

    /// One row per section item, prefixed with the section title.
    pub fn render_csv(&self) -> Result<String, ReportError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());

        writer.write_record(["section", "label", "value"])?;
        for section in &self.sections {
            match &section.content {
                SectionContent::Fields { fields } => {
                    for field in fields {
                        let record = [section.title, field.label.as_str(), field.value.as_str()];
                        writer.write_record(record)?;
                    }
                }
                SectionContent::Table(table) => {
                    let header = std::iter::once(section.title)
                        .chain(table.columns.iter().map(String::as_str));
                    writer.write_record(header)?;
                    for row in &table.rows {
                        let record =
                            std::iter::once(section.title).chain(row.iter().map(String::as_str));
                        writer.write_record(record)?;
                    }
                }
                SectionContent::Recommendation(view) => {
                    writer.write_record([section.title, "Recommendation", view.headline])?;
                    writer.write_record([section.title, "Change", view.change.as_str()])?;
                    writer.write_record([section.title, "Detail", view.detail.as_str()])?;
                }
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        String::from_utf8(bytes).map_err(|err| ReportError::Encoding(err.to_string()))
    }
}
