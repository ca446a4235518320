//! Runs a session's persistence round-trips against a [`CourseBackend`].

use std::time::Instant;

use shared::domain::{AppMode, ExportFormat};
use tracing::warn;

use crate::{
    backend::CourseBackend,
    error::{AnnotationError, Result},
    session::{AnnotationSession, Outcome, RemoteRequest, RemoteResponse},
};

pub struct SessionDriver<B> {
    session: AnnotationSession,
    backend: B,
}

impl<B: CourseBackend> SessionDriver<B> {
    pub fn new(session: AnnotationSession, backend: B) -> Self {
        Self { session, backend }
    }

    pub fn session(&self) -> &AnnotationSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut AnnotationSession {
        &mut self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Performs a request obtained from one of the session's `begin_*` calls
    /// and hands the answer back to the session.
    pub async fn perform(&mut self, request: RemoteRequest) -> Result<Outcome> {
        let response = match request {
            RemoteRequest::CreateCourse(body) => self
                .backend
                .create_course(&body)
                .await
                .map(RemoteResponse::CourseCreated),
            RemoteRequest::FetchTestingCourse => self
                .backend
                .random_testing_course()
                .await
                .map(RemoteResponse::TestingCourse),
            RemoteRequest::SubmitTestingResult(body) => self
                .backend
                .submit_testing_result(&body)
                .await
                .map(RemoteResponse::TestingResult),
            RemoteRequest::ExportCsv(format) => self
                .backend
                .export_csv(format)
                .await
                .map(RemoteResponse::Exported),
        }
        .map_err(|err| {
            warn!("course backend call failed: {err:#}");
            AnnotationError::remote(&err)
        });
        self.session.complete(response, Instant::now())
    }

    /// Returns the loaded course outcome when entering testing, None otherwise.
    pub async fn set_mode(&mut self, target: AppMode) -> Result<Option<Outcome>> {
        match self.session.request_mode(target)? {
            Some(request) => self.perform(request).await.map(Some),
            None => Ok(None),
        }
    }

    /// Save in training, submit the guess in testing.
    pub async fn primary_action(&mut self) -> Result<Outcome> {
        let request = self.session.begin_primary_action()?;
        self.perform(request).await
    }

    pub async fn export(&mut self, format: ExportFormat) -> Result<Outcome> {
        let request = self.session.begin_export(format)?;
        self.perform(request).await
    }

    /// Runs due timers. Returns the outcome of a follow-up fetch if one ran.
    pub async fn tick(&mut self, now: Instant) -> Option<Result<Outcome>> {
        let request = self.session.poll_timers(now).fetch?;
        Some(self.perform(request).await)
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
