//! Async driver for a [`Session`].

use std::sync::Arc;

use regioniq_catchment::CatchmentEngine;
use regioniq_geofence_models::CalculationParams;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::{CalculationRequest, Session, SessionConfig, SessionError, SessionEvent, SessionState};

/// Shares a [`Session`] between tasks and runs its calculations.
///
/// Each calculation runs on its own spawned task. Its outcome is applied
/// through [`Session::complete`], so results for superseded requests are
/// discarded, and every applied state is published to subscribers.
#[derive(Clone)]
pub struct SessionHandle {
    session: Arc<Mutex<Session>>,
    engine: CatchmentEngine,
    states: Arc<watch::Sender<SessionState>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(engine: CatchmentEngine, params: CalculationParams, config: SessionConfig) -> Self {
        let (states, _) = watch::channel(SessionState::None);
        Self {
            session: Arc::new(Mutex::new(Session::new(params, config))),
            engine,
            states: Arc::new(states),
        }
    }

    /// Receives every published state, starting from the current one.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.states.subscribe()
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> SessionState {
        self.session.lock().await.state().clone()
    }

    /// Applies `event` and spawns any calculation it starts.
    ///
    /// Returns the handle of the spawned calculation task, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the session rejects the event.
    pub async fn dispatch(&self, event: SessionEvent) -> Result<Option<JoinHandle<()>>, SessionError> {
        let outcome = {
            let mut session = self.session.lock().await;
            let outcome = session.dispatch(event);
            self.states.send_replace(session.state().clone());
            outcome
        };
        Ok(outcome?.map(|request| self.spawn(request)))
    }

    fn spawn(&self, request: CalculationRequest) -> JoinHandle<()> {
        let session = Arc::clone(&self.session);
        let states = Arc::clone(&self.states);
        let engine = self.engine.clone();

        tokio::spawn(async move {
            let outcome = engine.calculate(&request.geofence, &request.params).await;
            if let Err(e) = &outcome {
                log::warn!("Catchment calculation {} failed: {e}", request.token);
            }

            let mut session = session.lock().await;
            if session.complete(request.token, outcome) {
                states.send_replace(session.state().clone());
            }
        })
    }
}
