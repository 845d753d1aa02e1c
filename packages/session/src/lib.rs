#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geofence drawing session.
//!
//! A [`Session`] tracks one user's drawing and calculation lifecycle as a
//! state machine. Every calculation it starts carries a monotonically
//! increasing token, and only the result for the latest token is applied,
//! so a slow calculation for an old shape can never overwrite a newer one.
//! [`SessionHandle`] drives a session from async code, running the
//! calculations on a [`CatchmentEngine`](regioniq_catchment::CatchmentEngine)
//! and publishing each state change on a watch channel.

pub mod handle;
pub mod state;

pub use handle::SessionHandle;
pub use state::{CalculationRequest, Session, SessionConfig, SessionEvent, SessionState};

use regioniq_geofence_models::ValidationError;
use thiserror::Error;

/// Errors returned synchronously from [`Session::dispatch`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// The drawn geometry is not a valid geofence.
    #[error("Invalid geofence: {0}")]
    Validation(#[from] ValidationError),

    /// A calculation was requested before a geofence was drawn.
    #[error("No geofence to calculate")]
    NoGeofence,
}
