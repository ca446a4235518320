use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::domain::{AppMode, CourseId, LatLon, ObjectType};

/// One trajectory sample as exchanged with the backend. Carries no identity;
/// the backend assigns persistent ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    pub timestamp: DateTime<Utc>,
}

pub const MAX_NOISE_LEVEL: u8 = 100;

/// Trajectory statistics computed server-side. Opaque to the annotation core and
/// passed through unchanged; counters arrive as plain JSON numbers and keys not
/// listed here are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseStatistics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_speed_changes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_direction_changes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_altitude_changes: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_point: Option<LatLon>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ending_point: Option<LatLon>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CourseId>,
    pub object_type: ObjectType,
    pub mode: AppMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, deserialize_with = "noise_level_from_number")]
    pub noise_level: u8,
    #[serde(flatten)]
    pub statistics: CourseStatistics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub points: Vec<PointRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCourseRequest {
    pub object_type: ObjectType,
    pub mode: AppMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub noise_level: u8,
    pub points: Vec<PointRecord>,
}

/// A course served for guessing, with the answer the user must not see until
/// the guess is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingCourse {
    #[serde(flatten)]
    pub course: Course,
    pub correct_object_type: ObjectType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitTestingRequest {
    pub course_id: CourseId,
    pub selected_object_type: ObjectType,
    pub correct_object_type: ObjectType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_id: Option<CourseId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_object_type: Option<ObjectType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_object_type: Option<ObjectType>,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFile {
    pub name: String,
    pub download_url: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    pub total_courses: u64,
    pub total_points: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub files: Vec<ExportFile>,
    #[serde(default)]
    pub stats: ExportStats,
}

/// Accepts any JSON number (or null) and rounds it into `0..=MAX_NOISE_LEVEL`.
fn noise_level_from_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = Option::<f64>::deserialize(deserializer)?;
    Ok(raw
        .filter(|level| level.is_finite())
        .map(|level| level.round().clamp(0.0, f64::from(MAX_NOISE_LEVEL)) as u8)
        .unwrap_or(0))
}

/// Filters for listing stored courses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CourseQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AppMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<ObjectType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn course_statistics_are_flattened() {
        let course: Course = serde_json::from_value(json!({
            "id": "abc",
            "object_type": "bird",
            "mode": "training",
            "noise_level": 5,
            "total_distance": 812.5,
            "ending_point": { "lat": 1.5, "lon": 2.5 },
            "points": []
        }))
        .expect("course");
        assert_eq!(course.statistics.total_distance, Some(812.5));
        assert_eq!(course.statistics.ending_point, Some(LatLon::new(1.5, 2.5)));
        assert_eq!(course.statistics.avg_speed, None);

        let value = serde_json::to_value(&course).expect("json");
        assert_eq!(value["total_distance"], json!(812.5));
        assert!(value.get("statistics").is_none());
        assert!(value.get("avg_speed").is_none());
    }

    #[test]
    fn testing_course_tolerates_float_counters_and_unknown_statistics() {
        let fetched: TestingCourse = serde_json::from_value(json!({
            "id": "t-9",
            "object_type": "plane",
            "mode": "testing",
            "noise_level": 35.0,
            "total_speed_changes": 3.0,
            "total_direction_changes": 7,
            "max_altitude": 10500.25,
            "correct_object_type": "plane",
            "points": [
                { "lat": 1.0, "lon": 2.0, "altitude": 900, "timestamp": "2024-03-01T06:00:00Z" }
            ]
        }))
        .expect("testing course");
        let stats = &fetched.course.statistics;
        assert_eq!(stats.total_speed_changes, Some(3.0));
        assert_eq!(stats.total_direction_changes, Some(7.0));
        assert_eq!(stats.extra.get("max_altitude"), Some(&json!(10500.25)));
        assert!(!stats.extra.contains_key("correct_object_type"));
        assert_eq!(fetched.course.noise_level, 35);
        assert_eq!(fetched.correct_object_type, ObjectType::Plane);

        let value = serde_json::to_value(&fetched.course).expect("json");
        assert_eq!(value["max_altitude"], json!(10500.25));
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn noise_level_is_rounded_into_range() {
        let decode = |noise: Value| {
            serde_json::from_value::<Course>(json!({
                "object_type": "drone",
                "mode": "training",
                "noise_level": noise
            }))
            .expect("course")
            .noise_level
        };
        assert_eq!(decode(json!(12.6)), 13);
        assert_eq!(decode(json!(250)), MAX_NOISE_LEVEL);
        assert_eq!(decode(json!(-4)), 0);
        assert_eq!(decode(Value::Null), 0);
    }

    #[test]
    fn course_query_omits_unset_filters() {
        let query = CourseQuery {
            mode: Some(AppMode::Testing),
            ..CourseQuery::default()
        };
        assert_eq!(
            serde_json::to_value(&query).expect("json"),
            json!({ "mode": "testing" })
        );
    }
}
