//! Degraded results.
//!
//! Services that talk to external collaborators absorb their failures and
//! return a usable value together with a user-visible warning, instead of an
//! error. The warning text is shown to the user as-is.

use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Why a result was degraded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum WarningKind {
    /// No signed-in user; nothing was persisted
    NotSignedIn,
    /// The backend could not be reached
    Offline,
    /// The backend answered with an error
    Failed,
    /// Fallback data was used instead of generated data
    Fallback,
    /// The map could not be shown interactively
    MapUnavailable,
    /// A place name could not be resolved
    LocationUnresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_signed_in(message: impl Into<String>) -> Self {
        Self::new(WarningKind::NotSignedIn, message)
    }

    /// Classify a backend failure: unreachable peers are "offline", anything
    /// else is a plain failure.
    pub fn from_error(err: &crate::error::AppError, offline: &str, failed: &str) -> Self {
        if err.is_transport() {
            Self::new(WarningKind::Offline, offline)
        } else {
            Self::new(WarningKind::Failed, failed)
        }
    }
}

/// A value plus an optional warning explaining how it was degraded.
///
/// Serialized as-is in API responses: `{"value": .., "warning": {..}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<Warning>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    pub fn degraded(value: T, warning: Warning) -> Self {
        Self {
            value,
            warning: Some(warning),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.warning.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warning: self.warning,
        }
    }
}
