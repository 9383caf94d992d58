use serde::Serialize;

use super::geocode::GeocodeError;

/// Failure taxonomy shared by every stage of the estimation flow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EstimationError {
    #[error("no property data was provided")]
    MissingInput,
    #[error("invalid data: {0}")]
    Parse(String),
    #[error("remote service failed: {0}")]
    Network(String),
    #[error(transparent)]
    Geocode(#[from] GeocodeError),
}

/// Follow-up offered to the user alongside an error message. Retrying always
/// re-runs the whole flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryAction {
    ReturnToIntake,
    RetryFlow,
}

impl RecoveryAction {
    pub const fn label(self) -> &'static str {
        match self {
            Self::ReturnToIntake => "Start a new estimation",
            Self::RetryFlow => "Try again",
        }
    }
}

impl EstimationError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingInput => "missing_input",
            Self::Parse(_) => "parse",
            Self::Network(_) => "network",
            Self::Geocode(_) => "geocode",
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::MissingInput => {
                "No property details were received. Please fill in the estimation form.".to_string()
            }
            Self::Parse(detail) => format!("The property details could not be read ({detail})."),
            Self::Network(detail) => format!("The estimation service is unavailable: {detail}"),
            Self::Geocode(err) => format!("The address could not be located: {err}"),
        }
    }

    pub const fn recovery_actions(&self) -> &'static [RecoveryAction] {
        match self {
            Self::MissingInput | Self::Geocode(_) => &[RecoveryAction::ReturnToIntake],
            Self::Parse(_) => &[RecoveryAction::ReturnToIntake, RecoveryAction::RetryFlow],
            Self::Network(_) => &[RecoveryAction::RetryFlow, RecoveryAction::ReturnToIntake],
        }
    }
}
