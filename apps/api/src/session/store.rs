//! In-memory session registry and the async driver for a tuning request.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::session::{Completion, Session, SessionError, SessionView, TuningTicket};
use crate::tuning::ResumeTuner;

pub type SharedSession = Arc<Mutex<Session>>;

/// Sessions untouched for this long are dropped the next time a session is created.
const SESSION_TTL_HOURS: i64 = 24;

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self) -> SharedSession {
        self.prune_stale(Duration::hours(SESSION_TTL_HOURS)).await;

        let session = Session::new();
        let id = session.id;
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, shared.clone());
        info!("Created session {id}");
        shared
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops sessions idle for longer than `ttl`. Sessions whose lock is held right now
    /// are busy by definition and are kept.
    pub async fn prune_stale(&self, ttl: Duration) {
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| match s.try_lock() {
            Ok(session) => session.updated_at >= cutoff,
            Err(_) => true,
        });
        let pruned = before - sessions.len();
        if pruned > 0 {
            debug!("Pruned {pruned} stale sessions");
        }
    }
}

/// Runs one submit → backend → completion cycle for `session`.
///
/// The backend call and the completion run in their own task, so the session always
/// leaves Loading even if the caller's future is dropped (client disconnect, proxy
/// timeout). The session lock is released while the backend call is awaited, so reset
/// and reads of the Loading state stay responsive. A reset cancels the ticket, which
/// aborts the call; the outcome of a stale ticket is discarded either way.
pub async fn run_tuning(
    session: SharedSession,
    tuner: Arc<dyn ResumeTuner>,
) -> Result<SessionView, SessionError> {
    let ticket = session.lock().await.begin_submit()?;

    let task = tokio::spawn(drive_tuning(session.clone(), tuner, ticket));
    match task.await {
        Ok(view) => Ok(view),
        Err(e) => {
            error!("Tuning task failed to finish: {e}");
            Ok(session.lock().await.view())
        }
    }
}

async fn drive_tuning(
    session: SharedSession,
    tuner: Arc<dyn ResumeTuner>,
    ticket: TuningTicket,
) -> SessionView {
    let outcome = tokio::select! {
        _ = ticket.cancel.cancelled() => None,
        result = tuner.tune(&ticket.encoded_resume, &ticket.job_description) => Some(result),
    };

    let mut guard = session.lock().await;
    match outcome {
        Some(result) => {
            if let Completion::Applied(status) = guard.complete(&ticket, result) {
                info!("Session {} finished tuning: {:?}", guard.id, status);
            }
        }
        None => info!("Session {}: tuning cancelled by reset", guard.id),
    }
    guard.view()
}
