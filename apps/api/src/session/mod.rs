//! Application State Machine — one linear upload → submit → result wizard per session.
//!
//! ```text
//!   Idle ──submit (guarded)──► Loading ──ok──► Success ──reset──► Idle
//!    ▲                           │                                  ▲
//!    └────────reset────── Error ◄┴──err                             │
//!                          └──submit (guarded)──► Loading           │
//!   reset is accepted from every state, including Loading ──────────┘
//! ```
//!
//! The machine itself is synchronous. `store::run_tuning` drives the one async
//! step (the backend call) without holding the session lock across it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::ingestion::FileHandle;
use crate::tuning::TuningError;

pub mod handlers;
pub mod store;

pub const VALIDATION_MESSAGE: &str = "Please upload a resume and enter a job description.";
pub const TUNING_FAILED_MESSAGE: &str =
    "Failed to tune resume. Please try again. Ensure your PDF is text-readable.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// The selected résumé. Replaced wholesale on re-selection, cleared on reset.
#[derive(Debug, Clone, Default)]
pub struct ResumeState {
    pub file: Option<FileHandle>,
    pub encoded_content: Option<String>,
    pub display_name: Option<String>,
}

impl ResumeState {
    fn is_present(&self) -> bool {
        self.encoded_content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Please upload a resume and enter a job description.")]
    MissingInput,

    #[error("A tuning request is already in progress.")]
    InFlight,

    #[error("Cannot {action} while the session is {status:?}.")]
    NotAllowed {
        action: &'static str,
        status: AppStatus,
    },

    #[error("An export is already in progress.")]
    ExportBusy,
}

/// Everything the async step needs, captured at submit time.
#[derive(Debug, Clone)]
pub struct TuningTicket {
    pub epoch: u64,
    pub encoded_resume: String,
    pub job_description: String,
    pub cancel: CancellationToken,
}

/// An export started by `begin_export`. Only the export that set the busy flag may
/// clear it.
#[derive(Debug, Clone)]
pub struct ExportTicket {
    pub epoch: u64,
    pub html: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied(AppStatus),
    /// The session was reset after the ticket was issued; the outcome was dropped.
    Discarded,
}

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    status: AppStatus,
    resume: ResumeState,
    job_description: String,
    result: String,
    error_message: String,
    export_in_progress: bool,
    epoch: u64,
    in_flight: Option<CancellationToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Serializable snapshot returned by the HTTP layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub status: AppStatus,
    pub resume: Option<FileHandle>,
    pub display_name: Option<String>,
    pub job_description: String,
    pub result: String,
    pub error_message: String,
    pub submit_enabled: bool,
    pub export_in_progress: bool,
    pub updated_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: AppStatus::Idle,
            resume: ResumeState::default(),
            job_description: String::new(),
            result: String::new(),
            error_message: String::new(),
            export_in_progress: false,
            epoch: 0,
            in_flight: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> AppStatus {
        self.status
    }

    pub fn resume(&self) -> &ResumeState {
        &self.resume
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn export_in_progress(&self) -> bool {
        self.export_in_progress
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), SessionError> {
        match self.status {
            AppStatus::Idle | AppStatus::Error => Ok(()),
            AppStatus::Loading => Err(SessionError::InFlight),
            status => Err(SessionError::NotAllowed { action, status }),
        }
    }

    /// Stores a freshly ingested résumé, replacing any previous one, and clears the
    /// error message.
    pub fn select_file(&mut self, handle: FileHandle, data_url: String) -> Result<(), SessionError> {
        self.ensure_editable("select a file")?;
        self.resume = ResumeState {
            display_name: Some(handle.file_name.clone()),
            file: Some(handle),
            encoded_content: Some(data_url),
        };
        self.error_message.clear();
        self.touch();
        Ok(())
    }

    pub fn set_job_description(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        self.ensure_editable("edit the job description")?;
        self.job_description = text.into();
        self.touch();
        Ok(())
    }

    /// Mirrors the submit control: disabled while loading or while inputs are missing.
    pub fn submit_enabled(&self) -> bool {
        matches!(self.status, AppStatus::Idle | AppStatus::Error)
            && self.resume.is_present()
            && !self.job_description.trim().is_empty()
    }

    /// Idle/Error → Loading.
    ///
    /// A failed guard leaves the status untouched and records the validation message.
    pub fn begin_submit(&mut self) -> Result<TuningTicket, SessionError> {
        self.ensure_editable("submit")?;

        if !self.resume.is_present() || self.job_description.trim().is_empty() {
            self.error_message = VALIDATION_MESSAGE.to_string();
            self.touch();
            return Err(SessionError::MissingInput);
        }
        let encoded_resume = self.resume.encoded_content.clone().unwrap_or_default();

        let cancel = CancellationToken::new();
        self.in_flight = Some(cancel.clone());
        self.status = AppStatus::Loading;
        self.error_message.clear();
        self.touch();

        info!("Session {} entered Loading (epoch {})", self.id, self.epoch);

        Ok(TuningTicket {
            epoch: self.epoch,
            encoded_resume,
            job_description: self.job_description.clone(),
            cancel,
        })
    }

    /// Loading → Success | Error. Outcomes for a stale epoch are discarded.
    pub fn complete(
        &mut self,
        ticket: &TuningTicket,
        outcome: Result<String, TuningError>,
    ) -> Completion {
        if ticket.epoch != self.epoch || self.status != AppStatus::Loading {
            warn!(
                "Session {}: discarding outcome for epoch {} (current epoch {}, status {:?})",
                self.id, ticket.epoch, self.epoch, self.status
            );
            return Completion::Discarded;
        }

        self.in_flight = None;
        match outcome {
            Ok(html) => {
                self.result = html;
                self.error_message.clear();
                self.status = AppStatus::Success;
            }
            Err(e) => {
                error!(
                    "Session {}: tuning failed (kind {:?}): {e}",
                    self.id,
                    e.kind()
                );
                self.result.clear();
                self.error_message = TUNING_FAILED_MESSAGE.to_string();
                self.status = AppStatus::Error;
            }
        }
        self.touch();
        Completion::Applied(self.status)
    }

    /// Any state → Idle, clearing every field. An in-flight request is cancelled and its
    /// eventual outcome discarded.
    pub fn reset(&mut self) {
        if let Some(token) = self.in_flight.take() {
            info!("Session {}: reset while Loading, cancelling request", self.id);
            token.cancel();
        }
        self.epoch += 1;
        self.status = AppStatus::Idle;
        self.resume = ResumeState::default();
        self.job_description.clear();
        self.result.clear();
        self.error_message.clear();
        self.export_in_progress = false;
        self.touch();
    }

    /// Marks an export as running and returns the HTML to export.
    pub fn begin_export(&mut self) -> Result<ExportTicket, SessionError> {
        if self.status != AppStatus::Success {
            return Err(SessionError::NotAllowed {
                action: "export",
                status: self.status,
            });
        }
        if self.export_in_progress {
            return Err(SessionError::ExportBusy);
        }
        self.export_in_progress = true;
        self.touch();
        Ok(ExportTicket {
            epoch: self.epoch,
            html: self.result.clone(),
        })
    }

    /// Clears the busy flag whatever the export outcome was. An export that outlived a
    /// reset leaves the flag alone, since it may belong to a newer export.
    pub fn finish_export(&mut self, ticket: &ExportTicket) {
        if ticket.epoch != self.epoch {
            debug!(
                "Session {}: ignoring finished export from epoch {}",
                self.id, ticket.epoch
            );
            return;
        }
        self.export_in_progress = false;
        self.touch();
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            status: self.status,
            resume: self.resume.file.clone(),
            display_name: self.resume.display_name.clone(),
            job_description: self.job_description.clone(),
            result: self.result.clone(),
            error_message: self.error_message.clone(),
            submit_enabled: self.submit_enabled(),
            export_in_progress: self.export_in_progress,
            updated_at: self.updated_at,
        }
    }
}
