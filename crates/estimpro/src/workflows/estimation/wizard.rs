use chrono::Datelike;
use serde::Serialize;

use super::draft::{DraftPatch, PropertyDraft, SummaryEntry};
use super::error::EstimationError;
use super::geocode::{resolve_address, GeocodeError, Geocoder};
use super::handoff::Handoff;
use super::pipeline::{year_range, EARLIEST_YEAR, SURFACE_RANGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Location,
    Characteristics,
    Details,
    Confirmation,
    Submitting,
}

impl WizardStep {
    /// The four intake steps, in order. `Submitting` is transient.
    pub const fn ordered() -> [Self; 4] {
        [
            Self::Location,
            Self::Characteristics,
            Self::Details,
            Self::Confirmation,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::Characteristics => "Characteristics",
            Self::Details => "Details",
            Self::Confirmation => "Confirmation",
            Self::Submitting => "Submitting",
        }
    }

    pub const fn number(self) -> u8 {
        match self {
            Self::Location => 1,
            Self::Characteristics => 2,
            Self::Details => 3,
            Self::Confirmation | Self::Submitting => 4,
        }
    }

    const fn following(self) -> Option<Self> {
        match self {
            Self::Location => Some(Self::Characteristics),
            Self::Characteristics => Some(Self::Details),
            Self::Details => Some(Self::Confirmation),
            Self::Confirmation | Self::Submitting => None,
        }
    }

    const fn preceding(self) -> Option<Self> {
        match self {
            Self::Characteristics => Some(Self::Location),
            Self::Details => Some(Self::Characteristics),
            Self::Confirmation => Some(Self::Details),
            // An abandoned submission backs out to where it started.
            Self::Submitting => Some(Self::Confirmation),
            Self::Location => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "step", rename_all = "snake_case")]
pub enum Advance {
    Moved(WizardStep),
    ReadyToSubmit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error("surface must be between 10 and 500 m², got {0}")]
    SurfaceOutOfRange(f64),
    #[error("year must be between {min} and {max}, got {value}")]
    YearOutOfRange { value: f64, min: i32, max: i32 },
    #[error(transparent)]
    InvalidField(EstimationError),
    #[error("the draft is being submitted and can no longer change")]
    Submitting,
    #[error("submission needs the confirmation step, wizard is at {}", .0.label())]
    NotConfirmed(WizardStep),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
    #[error("the draft could not be handed off: {0}")]
    Handoff(EstimationError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardProgress {
    pub step: WizardStep,
    pub number: u8,
    pub total: u8,
    pub label: &'static str,
    pub percent: u8,
}

/// Serializable view of the wizard for the intake surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WizardSnapshot {
    pub progress: WizardProgress,
    pub draft: PropertyDraft,
    pub summary: Vec<SummaryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// Multi-step intake. Navigation never validates; only `apply` rejects
/// out-of-range numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimationWizard {
    step: WizardStep,
    draft: PropertyDraft,
    last_error: Option<WizardError>,
}

impl Default for EstimationWizard {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimationWizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Location,
            draft: PropertyDraft::default(),
            last_error: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn draft(&self) -> &PropertyDraft {
        &self.draft
    }

    pub fn last_error(&self) -> Option<&WizardError> {
        self.last_error.as_ref()
    }

    pub fn apply(&mut self, patch: DraftPatch) -> Result<(), WizardError> {
        self.apply_with_year(patch, chrono::Local::now().year())
    }

    fn apply_with_year(&mut self, patch: DraftPatch, current_year: i32) -> Result<(), WizardError> {
        if self.step == WizardStep::Submitting {
            return Err(WizardError::Submitting);
        }

        if let Some(surface) = &patch.surface {
            let value = surface
                .normalize("surface")
                .map_err(WizardError::InvalidField)?;
            if !SURFACE_RANGE.contains(&value) {
                return Err(WizardError::SurfaceOutOfRange(value));
            }
        }
        if let Some(year) = &patch.year {
            let value = year.normalize("year").map_err(WizardError::InvalidField)?;
            if !year_range(current_year).contains(&value) {
                return Err(WizardError::YearOutOfRange {
                    value,
                    min: EARLIEST_YEAR,
                    max: current_year,
                });
            }
        }

        patch.apply_to(&mut self.draft);
        self.last_error = None;
        Ok(())
    }

    pub fn next(&mut self) -> Advance {
        match self.step.following() {
            Some(step) => {
                self.step = step;
                tracing::debug!(step = step.label(), "wizard advanced");
                Advance::Moved(step)
            }
            None => {
                self.step = WizardStep::Submitting;
                Advance::ReadyToSubmit
            }
        }
    }

    /// No-op on the first step.
    pub fn previous(&mut self) -> WizardStep {
        if let Some(step) = self.step.preceding() {
            self.step = step;
            self.last_error = None;
        }
        self.step
    }

    pub fn progress(&self) -> WizardProgress {
        let total = WizardStep::ordered().len() as u8;
        let number = self.step.number();
        WizardProgress {
            step: self.step,
            number,
            total,
            label: self.step.label(),
            percent: (u16::from(number) * 100 / u16::from(total)) as u8,
        }
    }

    pub fn summary(&self) -> Vec<SummaryEntry> {
        self.draft.summary()
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        WizardSnapshot {
            progress: self.progress(),
            draft: self.draft.clone(),
            summary: self.summary(),
            last_error: self.last_error.as_ref().map(ToString::to_string),
        }
    }

    /// Geocodes the address and seals the draft. On failure the wizard comes
    /// back at the confirmation step with its draft exactly as it was.
    pub async fn submit(mut self, geocoder: &dyn Geocoder) -> Result<Handoff, RejectedSubmission> {
        let step = self.step;
        match step {
            WizardStep::Confirmation | WizardStep::Submitting => {}
            step => return Err(self.reject(WizardError::NotConfirmed(step))),
        }
        self.step = WizardStep::Submitting;

        let coordinates = match resolve_address(geocoder, &self.draft.address).await {
            Ok(coordinates) => coordinates,
            Err(err) => return Err(self.reject(err.into())),
        };

        let frozen = self.draft.with_coordinates(coordinates);
        match Handoff::seal(&frozen) {
            Ok(handoff) => {
                tracing::info!(address = %frozen.address, "estimation draft handed off");
                Ok(handoff)
            }
            Err(err) => Err(self.reject(WizardError::Handoff(err))),
        }
    }

    fn reject(mut self, error: WizardError) -> RejectedSubmission {
        if self.step == WizardStep::Submitting {
            self.step = WizardStep::Confirmation;
        }
        tracing::warn!(error = %error, "estimation submission rejected");
        self.last_error = Some(error.clone());
        RejectedSubmission {
            wizard: Box::new(self),
            error,
        }
    }
}

/// A failed submission hands the wizard back so the user can fix and retry.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RejectedSubmission {
    pub wizard: Box<EstimationWizard>,
    pub error: WizardError,
}
