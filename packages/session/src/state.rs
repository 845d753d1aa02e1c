//! Session state machine.
//!
//! ```text
//! None ──DrawStarted──▶ Drawing ──GeofenceChanged──▶ Ready ──Calculate──▶ Calculating
//!                                                      ▲                     │
//!                                                      └──── complete ───────┤
//!                                                                            ▼
//!                                                                          Error
//! ```
//!
//! `Clear` returns to `None` from any state.

use std::fmt::Display;

use regioniq_geofence::validate_geofence_polygon;
use regioniq_geofence_models::{CalculationParams, Geofence, GeofenceResult};
use serde::Serialize;

use crate::SessionError;

/// Where the session is in its drawing/calculation lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing drawn.
    #[default]
    None,
    /// The user is drawing a shape.
    Drawing,
    /// A valid geofence exists, with its latest result if calculated.
    #[serde(rename_all = "camelCase")]
    Ready {
        geofence: Geofence,
        result: Option<GeofenceResult>,
    },
    /// A calculation is in flight. `previous` is the last successful
    /// result for this geofence, if any.
    #[serde(rename_all = "camelCase")]
    Calculating {
        geofence: Geofence,
        previous: Option<GeofenceResult>,
    },
    /// The last calculation failed.
    #[serde(rename_all = "camelCase")]
    Error {
        geofence: Option<Geofence>,
        message: String,
        last_result: Option<GeofenceResult>,
    },
}

impl SessionState {
    /// The current geofence, if any.
    #[must_use]
    pub const fn geofence(&self) -> Option<&Geofence> {
        match self {
            Self::Ready { geofence, .. } | Self::Calculating { geofence, .. } => Some(geofence),
            Self::Error { geofence, .. } => geofence.as_ref(),
            Self::None | Self::Drawing => None,
        }
    }

    /// The most recent successful result, if any.
    #[must_use]
    pub const fn result(&self) -> Option<&GeofenceResult> {
        match self {
            Self::Ready { result, .. } => result.as_ref(),
            Self::Calculating { previous, .. } => previous.as_ref(),
            Self::Error { last_result, .. } => last_result.as_ref(),
            Self::None | Self::Drawing => None,
        }
    }

    /// Whether a calculation is in flight.
    #[must_use]
    pub const fn is_calculating(&self) -> bool {
        matches!(self, Self::Calculating { .. })
    }
}

/// User actions driving a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The user started drawing a new shape.
    DrawStarted,
    /// The user finished or edited a shape.
    GeofenceChanged(Geofence),
    /// The user changed year, scenario, or level.
    ParamsChanged(CalculationParams),
    /// The user asked for a calculation.
    Calculate,
    /// The user discarded the shape.
    Clear,
}

/// Session behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// Start a calculation as soon as a valid geofence is drawn.
    pub auto_calculate: bool,
}

/// A calculation the caller must run and report back through
/// [`Session::complete`].
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    /// Identifies this request; only the latest token is applied.
    pub token: u64,
    pub geofence: Geofence,
    pub params: CalculationParams,
}

/// One user's geofence session.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    params: CalculationParams,
    config: SessionConfig,
    token: u64,
}

impl Session {
    #[must_use]
    pub fn new(params: CalculationParams, config: SessionConfig) -> Self {
        Self {
            state: SessionState::None,
            params,
            config,
            token: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn params(&self) -> &CalculationParams {
        &self.params
    }

    /// Token of the most recent request or invalidation.
    #[must_use]
    pub const fn latest_token(&self) -> u64 {
        self.token
    }

    /// Applies `event`, returning a calculation to run if it started one.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Validation`] if a changed geofence is invalid; the
    ///   session is left in `Drawing`.
    /// * [`SessionError::NoGeofence`] if `Calculate` arrives without a
    ///   geofence.
    pub fn dispatch(
        &mut self,
        event: SessionEvent,
    ) -> Result<Option<CalculationRequest>, SessionError> {
        match event {
            SessionEvent::DrawStarted => {
                self.invalidate();
                self.state = SessionState::Drawing;
                Ok(None)
            }
            SessionEvent::GeofenceChanged(geofence) => self.geofence_changed(geofence),
            SessionEvent::ParamsChanged(params) => {
                self.params = params;
                Ok(self.recalculate())
            }
            SessionEvent::Calculate => match self.state {
                SessionState::None
                | SessionState::Drawing
                | SessionState::Error { geofence: None, .. } => Err(SessionError::NoGeofence),
                _ => Ok(self.start_calculation()),
            },
            SessionEvent::Clear => {
                self.invalidate();
                self.state = SessionState::None;
                Ok(None)
            }
        }
    }

    /// Applies the outcome of the calculation identified by `token`.
    ///
    /// Returns `false`, leaving the session untouched, when `token` has
    /// been superseded.
    pub fn complete<E: Display>(
        &mut self,
        token: u64,
        outcome: Result<GeofenceResult, E>,
    ) -> bool {
        if token != self.token {
            log::debug!("Dropping stale calculation {token} (latest {})", self.token);
            return false;
        }

        let (geofence, previous) = match std::mem::take(&mut self.state) {
            SessionState::Calculating { geofence, previous } => (geofence, previous),
            other => {
                self.state = other;
                return false;
            }
        };

        self.state = match outcome {
            Ok(result) => SessionState::Ready {
                geofence,
                result: Some(result),
            },
            Err(e) => SessionState::Error {
                geofence: Some(geofence),
                message: e.to_string(),
                last_result: previous,
            },
        };
        true
    }

    fn geofence_changed(
        &mut self,
        geofence: Geofence,
    ) -> Result<Option<CalculationRequest>, SessionError> {
        self.invalidate();

        if let Err(e) = validate_geofence_polygon(&geofence.geometry).into_result() {
            self.state = SessionState::Drawing;
            return Err(e.into());
        }

        self.state = SessionState::Ready {
            geofence,
            result: None,
        };
        if self.config.auto_calculate {
            Ok(self.start_calculation())
        } else {
            Ok(None)
        }
    }

    /// Restarts the calculation after a parameter change when there is a
    /// result, error, or in-flight calculation to refresh.
    fn recalculate(&mut self) -> Option<CalculationRequest> {
        match &self.state {
            SessionState::Ready {
                result: Some(_), ..
            }
            | SessionState::Calculating { .. }
            | SessionState::Error {
                geofence: Some(_), ..
            } => self.start_calculation(),
            _ => None,
        }
    }

    /// Moves to `Calculating` and issues a request with a fresh token.
    fn start_calculation(&mut self) -> Option<CalculationRequest> {
        let (geofence, previous) = match std::mem::take(&mut self.state) {
            SessionState::Ready { geofence, result } => (geofence, result),
            SessionState::Calculating { geofence, previous } => (geofence, previous),
            SessionState::Error {
                geofence: Some(geofence),
                last_result,
                ..
            } => (geofence, last_result),
            other => {
                self.state = other;
                return None;
            }
        };

        self.token += 1;
        let request = CalculationRequest {
            token: self.token,
            geofence: geofence.clone(),
            params: self.params,
        };
        self.state = SessionState::Calculating { geofence, previous };
        Some(request)
    }

    /// Makes any in-flight calculation stale.
    const fn invalidate(&mut self) {
        self.token += 1;
    }
}
