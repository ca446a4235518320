//! Coordinator binding the point store, time cursor, mode controller and
//! viewport together.
//!
//! Everything here is synchronous. Persistence is split into a `begin_*` step
//! that validates and returns a [`RemoteRequest`], and [`AnnotationSession::complete`]
//! which applies the backend's answer. While a request is outstanding the session
//! is busy and refuses further save, submit, export and mode changes.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use shared::{
    domain::{AppMode, CourseId, ExportFormat, LatLon, ObjectType, PointId},
    protocol::{
        Course, CreateCourseRequest, ExportResponse, SubmitTestingRequest, TestingCourse,
        TestingResult,
    },
};
use tracing::{debug, info, warn};

use crate::{
    error::{AnnotationError, Mutation, Result},
    mode::{CourseDraft, ModeController, PrimaryAction, Transition},
    store::{Point, PointCandidate, PointPatch, TemporalPointStore},
    time_cursor::{CursorStatus, IncrementUnit, TimeCursor},
    timers::TimerSlot,
    viewport::{self, Marker, ViewState, ViewportSynchronizer, DEFAULT_HIGHLIGHT_CLEAR_DELAY},
};

pub const MIN_POINTS_TO_SAVE: usize = 2;
pub const DEFAULT_NEXT_COURSE_DELAY: Duration = Duration::from_secs(2);
const CREATED_BY: &str = "user";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub auto_zoom: bool,
    pub jump_to_point: bool,
    pub auto_advance: bool,
    pub increment_unit: IncrementUnit,
    pub increment_amount: u32,
    pub highlight_clear_delay: Duration,
    pub next_course_delay: Duration,
    pub initial_view: ViewState,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            auto_zoom: false,
            jump_to_point: true,
            auto_advance: true,
            increment_unit: IncrementUnit::Seconds,
            increment_amount: 1,
            highlight_clear_delay: DEFAULT_HIGHLIGHT_CLEAR_DELAY,
            next_course_delay: DEFAULT_NEXT_COURSE_DELAY,
            initial_view: ViewState::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Save,
    EnterTesting,
    NextTestingCourse,
    Submit,
    Export,
}

/// A persistence call the caller must perform and report back.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteRequest {
    CreateCourse(CreateCourseRequest),
    FetchTestingCourse,
    SubmitTestingResult(SubmitTestingRequest),
    ExportCsv(ExportFormat),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteResponse {
    CourseCreated(Course),
    TestingCourse(TestingCourse),
    TestingResult(TestingResult),
    Exported(ExportResponse),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    CourseSaved(Course),
    TestingCourseLoaded {
        course_id: Option<CourseId>,
        points: usize,
    },
    GuessScored {
        is_correct: bool,
        selected: ObjectType,
        correct: ObjectType,
        message: String,
    },
    Exported(ExportResponse),
}

impl Outcome {
    pub fn message(&self) -> String {
        match self {
            Self::CourseSaved(_) => "Course saved successfully!".to_string(),
            Self::TestingCourseLoaded { .. } => {
                "Testing course loaded. Identify the object type!".to_string()
            }
            Self::GuessScored { message, .. } => message.clone(),
            Self::Exported(export) => format!(
                "Exported {} courses and {} points",
                export.stats.total_courses, export.stats.total_points
            ),
        }
    }
}

/// Timer work done by [`AnnotationSession::poll_timers`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerEvents {
    pub highlight_cleared: bool,
    pub fetch: Option<RemoteRequest>,
}

/// Read-only picture of the session for rendering.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub mode: AppMode,
    pub busy: bool,
    pub object_type: ObjectType,
    pub noise_level: u8,
    pub cursor: DateTime<Utc>,
    pub cursor_status: CursorStatus,
    pub increment_unit: IncrementUnit,
    pub increment_amount: u32,
    pub auto_advance: bool,
    pub auto_zoom: bool,
    pub jump_to_point: bool,
    pub view: ViewState,
    pub points: Vec<Point>,
    pub markers: Vec<Marker>,
    pub path: Vec<LatLon>,
    pub active_course_id: Option<CourseId>,
    pub pending_deletion: Option<PointId>,
}

pub struct AnnotationSession {
    settings: SessionSettings,
    mode: ModeController,
    draft: CourseDraft,
    cursor: TimeCursor,
    viewport: ViewportSynchronizer,
    in_flight: Option<RequestKind>,
    pending_deletion: Option<PointId>,
    next_course_timer: TimerSlot,
}

impl AnnotationSession {
    pub fn new(settings: SessionSettings, cursor_start: DateTime<Utc>) -> Result<Self> {
        let mut cursor = TimeCursor::new(cursor_start);
        cursor.set_unit(settings.increment_unit);
        cursor.set_amount(settings.increment_amount)?;
        cursor.set_auto_advance(settings.auto_advance);

        let mut viewport = ViewportSynchronizer::new(
            settings.initial_view.clone(),
            settings.highlight_clear_delay,
        );
        viewport.set_auto_zoom(settings.auto_zoom);
        viewport.set_jump_enabled(settings.jump_to_point);

        Ok(Self {
            settings,
            mode: ModeController::default(),
            draft: CourseDraft::default(),
            cursor,
            viewport,
            in_flight: None,
            pending_deletion: None,
            next_course_timer: TimerSlot::default(),
        })
    }

    pub fn mode(&self) -> AppMode {
        self.mode.mode()
    }

    pub fn primary_action(&self) -> PrimaryAction {
        self.mode.primary_action()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<RequestKind> {
        self.in_flight
    }

    pub fn store(&self) -> &TemporalPointStore {
        &self.draft.store
    }

    pub fn draft(&self) -> &CourseDraft {
        &self.draft
    }

    pub fn cursor(&self) -> &TimeCursor {
        &self.cursor
    }

    /// Direct cursor controls: unit, amount, auto-advance, manual time.
    pub fn cursor_mut(&mut self) -> &mut TimeCursor {
        &mut self.cursor
    }

    pub fn cursor_status(&self) -> CursorStatus {
        self.cursor.status(self.draft.store.max_timestamp())
    }

    pub fn view(&self) -> &ViewState {
        self.viewport.view()
    }

    pub fn viewport(&self) -> &ViewportSynchronizer {
        &self.viewport
    }

    pub fn pending_deletion(&self) -> Option<PointId> {
        self.pending_deletion
    }

    // Gestures

    /// Places a point stamped with the cursor's instant.
    pub fn map_click(&mut self, lat: f64, lon: f64) -> Result<PointId> {
        self.ensure_can_mutate(Mutation::Add)?;
        let candidate = PointCandidate::new(lat, lon, self.cursor.current());
        let id = self.draft.store.add(candidate).map_err(|err| {
            warn!(%err, "map click rejected");
            err
        })?;
        let stamped = self.cursor.consume_for_new_point();
        debug!(point_id = %id, timestamp = %stamped, "point placed");
        self.refit();
        Ok(id)
    }

    pub fn drag_point(&mut self, id: PointId, lat: f64, lon: f64) -> Result<()> {
        self.ensure_can_mutate(Mutation::Modify)?;
        self.draft.store.update(id, PointPatch::position(lat, lon))?;
        self.refit();
        Ok(())
    }

    /// Inline edit of altitude and/or timestamp. A timestamp only has to avoid
    /// colliding with another point; it may move before its neighbours.
    pub fn edit_point(
        &mut self,
        id: PointId,
        altitude: Option<f64>,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.ensure_can_mutate(Mutation::Modify)?;
        let patch = PointPatch {
            altitude,
            timestamp,
            ..PointPatch::default()
        };
        self.draft.store.update(id, patch).map_err(|err| {
            warn!(point_id = %id, %err, "point edit rejected");
            err
        })?;
        self.refit();
        Ok(())
    }

    /// First half of a delete; nothing is removed until confirmed.
    pub fn request_delete(&mut self, id: PointId) -> Result<()> {
        self.ensure_can_mutate(Mutation::Delete)?;
        if self.draft.store.get(id).is_none() {
            return Err(AnnotationError::NotFound(id));
        }
        self.pending_deletion = Some(id);
        Ok(())
    }

    pub fn confirm_delete(&mut self) -> Result<PointId> {
        let id = self
            .pending_deletion
            .take()
            .ok_or(AnnotationError::NoPendingDeletion)?;
        self.ensure_can_mutate(Mutation::Delete)?;
        self.draft.store.remove(id)?;
        self.viewport.forget(id);
        self.refit();
        Ok(id)
    }

    pub fn cancel_delete(&mut self) -> Option<PointId> {
        self.pending_deletion.take()
    }

    pub fn hover(&mut self, id: Option<PointId>) {
        self.viewport.hover(id);
    }

    pub fn jump_to_point(&mut self, id: PointId, now: Instant) -> bool {
        self.viewport.jump_to(id, &self.draft.store, now)
    }

    pub fn select_object_type(&mut self, object_type: ObjectType) {
        self.draft.object_type = object_type;
    }

    pub fn set_noise_level(&mut self, noise_level: u8) -> Result<()> {
        self.draft.set_noise_level(noise_level)
    }

    pub fn set_auto_zoom(&mut self, enabled: bool) {
        self.viewport.set_auto_zoom(enabled);
        self.refit();
    }

    pub fn set_jump_to_point(&mut self, enabled: bool) {
        self.viewport.set_jump_enabled(enabled);
    }

    // Persistence round-trips

    /// Requests a mode switch. Entering testing needs a fetched course, which is
    /// returned as a request; the mode only changes once it is completed.
    pub fn request_mode(&mut self, target: AppMode) -> Result<Option<RemoteRequest>> {
        if self.is_busy() {
            return Err(AnnotationError::Busy);
        }
        match self.mode.request(target, &mut self.draft) {
            Transition::Unchanged => Ok(None),
            Transition::FetchTestingCourse => {
                self.in_flight = Some(RequestKind::EnterTesting);
                Ok(Some(RemoteRequest::FetchTestingCourse))
            }
            Transition::EnteredTraining => {
                self.pending_deletion = None;
                self.next_course_timer.cancel();
                self.viewport.reset();
                Ok(None)
            }
        }
    }

    pub fn begin_primary_action(&mut self) -> Result<RemoteRequest> {
        match self.mode.primary_action() {
            PrimaryAction::Save => self.begin_save(),
            PrimaryAction::Submit => self.begin_submit(),
        }
    }

    pub fn begin_save(&mut self) -> Result<RemoteRequest> {
        if self.is_busy() {
            return Err(AnnotationError::Busy);
        }
        self.ensure_can_mutate(Mutation::Add)?;
        let found = self.draft.store.len();
        if found < MIN_POINTS_TO_SAVE {
            return Err(AnnotationError::InsufficientPoints {
                required: MIN_POINTS_TO_SAVE,
                found,
            });
        }

        let request = CreateCourseRequest {
            object_type: self.draft.object_type,
            mode: AppMode::Training,
            created_by: Some(CREATED_BY.to_string()),
            noise_level: self.draft.noise_level,
            points: self.draft.store.records(),
        };
        self.in_flight = Some(RequestKind::Save);
        Ok(RemoteRequest::CreateCourse(request))
    }

    pub fn begin_submit(&mut self) -> Result<RemoteRequest> {
        if self.is_busy() || self.next_course_timer.is_pending() {
            return Err(AnnotationError::Busy);
        }
        let course_id = self
            .draft
            .active_course
            .as_ref()
            .and_then(|course| course.id.clone());
        let (Some(course_id), Some(correct), AppMode::Testing) =
            (course_id, self.draft.correct_answer(), self.mode.mode())
        else {
            return Err(AnnotationError::NoActiveCourse);
        };

        self.in_flight = Some(RequestKind::Submit);
        Ok(RemoteRequest::SubmitTestingResult(SubmitTestingRequest {
            course_id,
            selected_object_type: self.draft.object_type,
            correct_object_type: correct,
        }))
    }

    pub fn begin_export(&mut self, format: ExportFormat) -> Result<RemoteRequest> {
        if self.is_busy() {
            return Err(AnnotationError::Busy);
        }
        self.in_flight = Some(RequestKind::Export);
        Ok(RemoteRequest::ExportCsv(format))
    }

    /// Applies the backend's answer to the outstanding request. A failure leaves
    /// the session exactly as it was before the request began.
    pub fn complete(
        &mut self,
        response: Result<RemoteResponse>,
        now: Instant,
    ) -> Result<Outcome> {
        let Some(kind) = self.in_flight.take() else {
            warn!("response received with no request in flight");
            return Err(AnnotationError::RemoteFailure(
                "no request in flight".to_string(),
            ));
        };

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                warn!(request = ?kind, mode = %self.mode(), %err, "remote request failed");
                return Err(err);
            }
        };

        match (kind, response) {
            (RequestKind::Save, RemoteResponse::CourseCreated(course)) => {
                info!(course_id = ?course.id, points = course.points.len(), "course saved");
                self.draft.active_course = Some(course.clone());
                Ok(Outcome::CourseSaved(course))
            }
            (
                RequestKind::EnterTesting | RequestKind::NextTestingCourse,
                RemoteResponse::TestingCourse(fetched),
            ) => {
                let course_id = fetched.course.id.clone();
                self.pending_deletion = None;
                self.viewport.reset();
                self.mode.load_testing_course(&mut self.draft, fetched);
                self.refit();
                let points = self.draft.store.len();
                info!(course_id = ?course_id, points, "testing course loaded");
                Ok(Outcome::TestingCourseLoaded { course_id, points })
            }
            (RequestKind::Submit, RemoteResponse::TestingResult(result)) => {
                self.score(result, now)
            }
            (RequestKind::Export, RemoteResponse::Exported(export)) => {
                info!(files = export.files.len(), "export finished");
                Ok(Outcome::Exported(export))
            }
            (kind, _) => {
                warn!(request = ?kind, "response does not match the outstanding request");
                Err(AnnotationError::RemoteFailure(format!(
                    "unexpected response to {kind:?} request"
                )))
            }
        }
    }

    fn score(&mut self, result: TestingResult, now: Instant) -> Result<Outcome> {
        let selected = result
            .selected_object_type
            .unwrap_or(self.draft.object_type);
        let Some(correct) = result
            .correct_object_type
            .or(self.draft.correct_answer())
        else {
            warn!("testing result carries no correct answer");
            return Err(AnnotationError::NoActiveCourse);
        };
        let message = if result.is_correct {
            "Correct! Well done!".to_string()
        } else {
            format!("Incorrect. The correct answer was: {correct}")
        };
        info!(is_correct = result.is_correct, %selected, %correct, "guess scored");
        self.next_course_timer
            .schedule(now, self.settings.next_course_delay);
        Ok(Outcome::GuessScored {
            is_correct: result.is_correct,
            selected,
            correct,
            message,
        })
    }

    // Timers

    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.viewport.next_deadline(), self.next_course_timer.deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Runs due timers: clears an expired jump highlight and, after a scored
    /// guess, asks for the next testing course without touching the mode.
    pub fn poll_timers(&mut self, now: Instant) -> TimerEvents {
        let highlight_cleared = self.viewport.poll(now);
        let mut fetch = None;
        if self.next_course_timer.poll(now) && self.mode() == AppMode::Testing {
            if self.is_busy() {
                debug!("next testing course postponed while a request is in flight");
                self.next_course_timer
                    .schedule(now, self.settings.next_course_delay);
            } else {
                self.in_flight = Some(RequestKind::NextTestingCourse);
                fetch = Some(RemoteRequest::FetchTestingCourse);
            }
        }
        TimerEvents {
            highlight_cleared,
            fetch,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let ordered = self.draft.store.ordered_view();
        let view = self.viewport.view().clone();
        let draggable = self.mode() == AppMode::Training;
        SessionSnapshot {
            mode: self.mode(),
            busy: self.is_busy(),
            object_type: self.draft.object_type,
            noise_level: self.draft.noise_level,
            cursor: self.cursor.current(),
            cursor_status: self.cursor_status(),
            increment_unit: self.cursor.unit(),
            increment_amount: self.cursor.amount(),
            auto_advance: self.cursor.auto_advance(),
            auto_zoom: self.viewport.auto_zoom(),
            jump_to_point: self.viewport.jump_enabled(),
            markers: viewport::markers(&ordered, view.highlighted, draggable),
            path: viewport::path(&ordered),
            points: ordered.into_iter().cloned().collect(),
            view,
            active_course_id: self
                .draft
                .active_course
                .as_ref()
                .and_then(|course| course.id.clone()),
            pending_deletion: self.pending_deletion,
        }
    }

    fn ensure_can_mutate(&self, mutation: Mutation) -> Result<()> {
        self.mode.ensure_can_mutate(mutation).map_err(|err| {
            warn!(%err, "mutation rejected in {} mode", self.mode());
            err
        })?;
        self.draft.store.ensure_writable(mutation)
    }

    fn refit(&mut self) {
        self.viewport.fit_to_points(self.draft.store.ordered_view());
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
