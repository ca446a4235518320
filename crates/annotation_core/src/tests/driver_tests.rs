use super::*;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{CourseId, ObjectType},
    protocol::{
        Course, CourseStatistics, CreateCourseRequest, ExportResponse, ExportStats, PointRecord,
        SubmitTestingRequest, TestingCourse, TestingResult,
    },
};

use crate::session::SessionSettings;

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create(CreateCourseRequest),
    FetchTesting,
    Submit(SubmitTestingRequest),
    Export(ExportFormat),
}

#[derive(Clone, Default)]
struct FakeBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    fail_with: Option<String>,
    correct: Option<ObjectType>,
}

impl FakeBackend {
    fn failing(err: impl Into<String>) -> Self {
        Self {
            fail_with: Some(err.into()),
            ..Self::default()
        }
    }

    fn record(&self, call: Call) -> anyhow::Result<()> {
        self.calls.lock().expect("calls").push(call);
        match &self.fail_with {
            Some(err) => Err(anyhow!(err.clone())),
            None => Ok(()),
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls").clone()
    }
}

fn course_from(points: Vec<PointRecord>, object_type: ObjectType, id: &str) -> Course {
    Course {
        id: Some(CourseId(id.to_string())),
        object_type,
        mode: AppMode::Training,
        created_by: Some("user".into()),
        noise_level: 0,
        statistics: CourseStatistics {
            avg_speed: Some(12.5),
            ..CourseStatistics::default()
        },
        created_at: None,
        updated_at: None,
        points,
    }
}

#[async_trait]
impl CourseBackend for FakeBackend {
    async fn create_course(&self, request: &CreateCourseRequest) -> anyhow::Result<Course> {
        self.record(Call::Create(request.clone()))?;
        Ok(course_from(
            request.points.clone(),
            request.object_type,
            "created-1",
        ))
    }

    async fn random_testing_course(&self) -> anyhow::Result<TestingCourse> {
        self.record(Call::FetchTesting)?;
        let t = Utc.with_ymd_and_hms(2024, 2, 2, 12, 0, 0).unwrap();
        let points = vec![
            PointRecord {
                lat: 40.0,
                lon: -74.0,
                altitude: 900.0,
                timestamp: t,
            },
            PointRecord {
                lat: 40.5,
                lon: -74.2,
                altitude: 950.0,
                timestamp: t + chrono::Duration::seconds(30),
            },
        ];
        let fetched = self.calls().len();
        let correct = self.correct.unwrap_or(ObjectType::Plane);
        Ok(TestingCourse {
            course: course_from(points, correct, &format!("testing-{fetched}")),
            correct_object_type: correct,
        })
    }

    async fn submit_testing_result(
        &self,
        request: &SubmitTestingRequest,
    ) -> anyhow::Result<TestingResult> {
        self.record(Call::Submit(request.clone()))?;
        Ok(TestingResult {
            course_id: Some(request.course_id.clone()),
            selected_object_type: Some(request.selected_object_type),
            correct_object_type: Some(request.correct_object_type),
            is_correct: request.selected_object_type == request.correct_object_type,
            answered_at: None,
            message: String::new(),
        })
    }

    async fn export_csv(&self, format: ExportFormat) -> anyhow::Result<ExportResponse> {
        self.record(Call::Export(format))?;
        Ok(ExportResponse {
            message: "Export completed".into(),
            files: Vec::new(),
            stats: ExportStats {
                total_courses: 2,
                total_points: 9,
            },
        })
    }
}

fn driver(backend: FakeBackend) -> SessionDriver<FakeBackend> {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let session = AnnotationSession::new(SessionSettings::default(), start).expect("session");
    SessionDriver::new(session, backend)
}

#[tokio::test]
async fn save_round_trip_sends_points_without_ids() {
    let backend = FakeBackend::default();
    let mut driver = driver(backend.clone());
    driver.session_mut().select_object_type(ObjectType::Bird);
    driver.session_mut().map_click(32.0, 34.0).expect("click");
    driver.session_mut().map_click(32.01, 34.02).expect("click");

    let outcome = driver.primary_action().await.expect("save");
    let Outcome::CourseSaved(course) = outcome else {
        panic!("expected saved course");
    };
    assert_eq!(course.id, Some(CourseId("created-1".into())));
    assert_eq!(course.statistics.avg_speed, Some(12.5));

    let calls = backend.calls();
    assert_eq!(calls.len(), 1);
    let Call::Create(body) = &calls[0] else {
        panic!("expected create call");
    };
    assert_eq!(body.object_type, ObjectType::Bird);
    assert_eq!(body.points.len(), 2);
    let json = serde_json::to_value(body).expect("json");
    assert!(json["points"][0].get("id").is_none());
    assert!(json["points"][0].get("point_id").is_none());
}

#[tokio::test]
async fn save_with_single_point_makes_no_remote_call() {
    let backend = FakeBackend::default();
    let mut driver = driver(backend.clone());
    driver.session_mut().map_click(32.0, 34.0).expect("click");

    let err = driver.primary_action().await.expect_err("too few points");
    assert!(matches!(err, AnnotationError::InsufficientPoints { .. }));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn remote_failure_entering_testing_stays_in_training() {
    let backend = FakeBackend::failing("connection refused");
    let mut driver = driver(backend.clone());
    let id = driver.session_mut().map_click(32.0, 34.0).expect("click");

    let err = driver
        .set_mode(AppMode::Testing)
        .await
        .expect_err("fetch fails");
    assert!(matches!(&err, AnnotationError::RemoteFailure(msg) if msg.contains("connection refused")));
    assert_eq!(driver.session().mode(), AppMode::Training);
    assert!(driver.session().store().get(id).is_some());
    assert!(!driver.session().is_busy());
    assert_eq!(backend.calls(), vec![Call::FetchTesting]);
}

#[tokio::test]
async fn guessing_loop_submits_then_loads_next_course() {
    let backend = FakeBackend {
        correct: Some(ObjectType::Storm),
        ..FakeBackend::default()
    };
    let mut driver = driver(backend.clone());

    let loaded = driver
        .set_mode(AppMode::Testing)
        .await
        .expect("enter testing")
        .expect("course loaded");
    assert!(matches!(loaded, Outcome::TestingCourseLoaded { points: 2, .. }));
    assert_eq!(driver.session().mode(), AppMode::Testing);

    driver.session_mut().select_object_type(ObjectType::Storm);
    let scored = driver.primary_action().await.expect("submit");
    assert_eq!(scored.message(), "Correct! Well done!");

    assert!(driver.tick(Instant::now()).await.is_none());
    let later = Instant::now() + Duration::from_secs(5);
    let next = driver
        .tick(later)
        .await
        .expect("next course fetched")
        .expect("loaded");
    assert!(matches!(next, Outcome::TestingCourseLoaded { .. }));
    assert_eq!(driver.session().mode(), AppMode::Testing);

    let calls = backend.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], Call::FetchTesting);
    assert!(matches!(
        &calls[1],
        Call::Submit(body) if body.correct_object_type == ObjectType::Storm
            && body.selected_object_type == ObjectType::Storm
    ));
    assert_eq!(calls[2], Call::FetchTesting);
}

#[tokio::test]
async fn export_passes_format_through() {
    let backend = FakeBackend::default();
    let mut driver = driver(backend.clone());
    let outcome = driver.export(ExportFormat::Points).await.expect("export");
    assert_eq!(outcome.message(), "Exported 2 courses and 9 points");
    assert_eq!(backend.calls(), vec![Call::Export(ExportFormat::Points)]);
}
