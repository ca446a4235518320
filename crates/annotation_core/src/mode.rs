//! Training/testing state machine and the authoring state it resets.

use shared::{
    domain::{AppMode, ObjectType},
    protocol::{Course, TestingCourse},
};
use tracing::{info, warn};

use crate::{
    error::{AnnotationError, Mutation, Result},
    store::TemporalPointStore,
};

pub use shared::protocol::MAX_NOISE_LEVEL;

/// The course currently being authored (training) or guessed (testing).
#[derive(Debug, Clone, Default)]
pub struct CourseDraft {
    pub store: TemporalPointStore,
    pub object_type: ObjectType,
    pub noise_level: u8,
    pub active_course: Option<Course>,
    correct_answer: Option<ObjectType>,
}

impl CourseDraft {
    pub fn set_noise_level(&mut self, noise_level: u8) -> Result<()> {
        if noise_level > MAX_NOISE_LEVEL {
            return Err(AnnotationError::InvalidSetting(format!(
                "noise level must be between 0 and {MAX_NOISE_LEVEL}, got {noise_level}"
            )));
        }
        self.noise_level = noise_level;
        Ok(())
    }

    /// Hidden answer of the course under test. Not for display before the
    /// guess is submitted.
    pub fn correct_answer(&self) -> Option<ObjectType> {
        self.correct_answer
    }

    fn reset_for_training(&mut self) {
        self.store.clear();
        self.store.set_read_only(false);
        self.object_type = ObjectType::default();
        self.noise_level = 0;
        self.active_course = None;
        self.correct_answer = None;
    }
}

/// What a mode request requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    /// A testing course must be fetched; the mode flips only once it arrives.
    FetchTestingCourse,
    EnteredTraining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryAction {
    Save,
    Submit,
}

#[derive(Debug, Clone, Default)]
pub struct ModeController {
    mode: AppMode,
}

impl ModeController {
    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn primary_action(&self) -> PrimaryAction {
        match self.mode {
            AppMode::Training => PrimaryAction::Save,
            AppMode::Testing => PrimaryAction::Submit,
        }
    }

    pub fn ensure_can_mutate(&self, mutation: Mutation) -> Result<()> {
        match self.mode {
            AppMode::Training => Ok(()),
            AppMode::Testing => Err(AnnotationError::ModeCapabilityDenied(mutation)),
        }
    }

    pub fn request(&mut self, target: AppMode, draft: &mut CourseDraft) -> Transition {
        match (self.mode, target) {
            (AppMode::Training, AppMode::Testing) => Transition::FetchTestingCourse,
            (AppMode::Testing, AppMode::Training) => {
                draft.reset_for_training();
                self.mode = AppMode::Training;
                info!(mode = %self.mode, "entered training mode");
                Transition::EnteredTraining
            }
            _ => Transition::Unchanged,
        }
    }

    /// Installs a fetched testing course and switches to testing. Also used for
    /// the follow-up course after a submission, when already testing.
    pub fn load_testing_course(&mut self, draft: &mut CourseDraft, fetched: TestingCourse) {
        let skipped = draft.store.replace_all(&fetched.course.points);
        if skipped > 0 {
            warn!(skipped, "testing course contained duplicate timestamps");
        }
        draft.store.set_read_only(true);
        draft.correct_answer = Some(fetched.correct_object_type);
        draft.active_course = Some(fetched.course);
        if self.mode != AppMode::Testing {
            self.mode = AppMode::Testing;
            info!(mode = %self.mode, "entered testing mode");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use shared::protocol::{CourseStatistics, PointRecord};

    use super::*;
    use crate::store::PointCandidate;

    fn testing_course() -> TestingCourse {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        TestingCourse {
            course: Course {
                id: Some(shared::domain::CourseId("c-1".into())),
                object_type: ObjectType::Bird,
                mode: AppMode::Testing,
                created_by: None,
                noise_level: 0,
                statistics: CourseStatistics::default(),
                created_at: None,
                updated_at: None,
                points: vec![PointRecord {
                    lat: 1.0,
                    lon: 2.0,
                    altitude: 30.0,
                    timestamp: t,
                }],
            },
            correct_object_type: ObjectType::Bird,
        }
    }

    #[test]
    fn entering_testing_waits_for_the_course() {
        let mut controller = ModeController::default();
        let mut draft = CourseDraft::default();

        assert_eq!(
            controller.request(AppMode::Testing, &mut draft),
            Transition::FetchTestingCourse
        );
        assert_eq!(controller.mode(), AppMode::Training);

        controller.load_testing_course(&mut draft, testing_course());
        assert_eq!(controller.mode(), AppMode::Testing);
        assert_eq!(controller.primary_action(), PrimaryAction::Submit);
        assert!(draft.store.is_read_only());
        assert_eq!(draft.correct_answer(), Some(ObjectType::Bird));
    }

    #[test]
    fn returning_to_training_resets_the_draft() {
        let mut controller = ModeController::default();
        let mut draft = CourseDraft::default();
        controller.load_testing_course(&mut draft, testing_course());
        draft.object_type = ObjectType::Storm;

        assert_eq!(
            controller.request(AppMode::Training, &mut draft),
            Transition::EnteredTraining
        );
        assert!(draft.store.is_empty());
        assert!(!draft.store.is_read_only());
        assert_eq!(draft.object_type, ObjectType::Drone);
        assert_eq!(draft.noise_level, 0);
        assert_eq!(draft.correct_answer(), None);
        assert!(draft.active_course.is_none());

        draft
            .store
            .add(PointCandidate::new(0.0, 0.0, Utc::now()))
            .expect("store writable again");
    }

    #[test]
    fn same_mode_request_is_a_no_op() {
        let mut controller = ModeController::default();
        let mut draft = CourseDraft::default();
        draft.noise_level = 40;
        assert_eq!(
            controller.request(AppMode::Training, &mut draft),
            Transition::Unchanged
        );
        assert_eq!(draft.noise_level, 40);
    }

    #[test]
    fn mutations_are_denied_while_testing() {
        let mut controller = ModeController::default();
        let mut draft = CourseDraft::default();
        controller.load_testing_course(&mut draft, testing_course());
        assert_eq!(
            controller.ensure_can_mutate(Mutation::Delete),
            Err(AnnotationError::ModeCapabilityDenied(Mutation::Delete))
        );
    }

    #[test]
    fn noise_level_above_hundred_is_rejected() {
        let mut draft = CourseDraft::default();
        assert!(draft.set_noise_level(100).is_ok());
        assert!(draft.set_noise_level(101).is_err());
        assert_eq!(draft.noise_level, 100);
    }
}
