//! Timestamp-ordered point storage for the course being authored or reviewed.
//!
//! Points are kept in insertion order; every consumer that cares about order goes
//! through [`TemporalPointStore::ordered_view`], which sorts by timestamp.

use chrono::{DateTime, SubsecRound, Utc};
use shared::{domain::PointId, protocol::PointRecord};
use tracing::debug;

use crate::error::{AnnotationError, Mutation, Result};

pub const DEFAULT_ALTITUDE_M: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: PointId,
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl Point {
    pub fn to_record(&self) -> PointRecord {
        PointRecord {
            lat: self.lat,
            lon: self.lon,
            altitude: self.altitude,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointCandidate {
    pub lat: f64,
    pub lon: f64,
    pub altitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PointCandidate {
    pub fn new(lat: f64, lon: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            lat,
            lon,
            altitude: None,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }
}

impl From<&PointRecord> for PointCandidate {
    fn from(record: &PointRecord) -> Self {
        Self {
            lat: record.lat,
            lon: record.lon,
            altitude: Some(record.altitude),
            timestamp: record.timestamp,
        }
    }
}

/// Partial update of a point. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointPatch {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub altitude: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl PointPatch {
    pub fn position(lat: f64, lon: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            ..Self::default()
        }
    }

    pub fn altitude(altitude: f64) -> Self {
        Self {
            altitude: Some(altitude),
            ..Self::default()
        }
    }

    pub fn timestamp(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct TemporalPointStore {
    points: Vec<Point>,
    next_id: u64,
    read_only: bool,
}

impl Default for TemporalPointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TemporalPointStore {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            next_id: 1,
            read_only: false,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn ensure_writable(&self, mutation: Mutation) -> Result<()> {
        if self.read_only {
            return Err(AnnotationError::ModeCapabilityDenied(mutation));
        }
        Ok(())
    }

    pub fn get(&self, id: PointId) -> Option<&Point> {
        self.points.iter().find(|point| point.id == id)
    }

    pub fn max_timestamp(&self) -> Option<DateTime<Utc>> {
        self.points.iter().map(|point| point.timestamp).max()
    }

    /// Whether `add` would accept a point stamped `timestamp`.
    pub fn accepts(&self, timestamp: DateTime<Utc>) -> bool {
        self.max_timestamp()
            .map_or(true, |latest| normalize(timestamp) > latest)
    }

    pub fn add(&mut self, candidate: PointCandidate) -> Result<PointId> {
        self.ensure_writable(Mutation::Add)?;
        let altitude = candidate.altitude.unwrap_or(DEFAULT_ALTITUDE_M);
        validate_altitude(altitude)?;

        let timestamp = normalize(candidate.timestamp);
        if let Some(latest) = self.max_timestamp() {
            if timestamp <= latest {
                return Err(AnnotationError::TimestampOrderViolation {
                    attempted: timestamp,
                    latest,
                });
            }
        }

        let id = self.allocate_id();
        self.points.push(Point {
            id,
            lat: candidate.lat,
            lon: candidate.lon,
            altitude,
            timestamp,
        });
        debug!(point_id = %id, %timestamp, "point added");
        Ok(id)
    }

    pub fn update(&mut self, id: PointId, patch: PointPatch) -> Result<()> {
        self.ensure_writable(Mutation::Modify)?;
        if self.get(id).is_none() {
            return Err(AnnotationError::NotFound(id));
        }
        if let Some(altitude) = patch.altitude {
            validate_altitude(altitude)?;
        }

        let timestamp = patch.timestamp.map(normalize);
        if let Some(timestamp) = timestamp {
            if let Some(other) = self
                .points
                .iter()
                .find(|point| point.id != id && point.timestamp == timestamp)
            {
                return Err(AnnotationError::TimestampConflict {
                    timestamp,
                    conflicting: other.id,
                });
            }
        }

        let Some(point) = self.points.iter_mut().find(|point| point.id == id) else {
            return Err(AnnotationError::NotFound(id));
        };
        if let Some(lat) = patch.lat {
            point.lat = lat;
        }
        if let Some(lon) = patch.lon {
            point.lon = lon;
        }
        if let Some(altitude) = patch.altitude {
            point.altitude = altitude;
        }
        if let Some(timestamp) = timestamp {
            point.timestamp = timestamp;
        }
        debug!(point_id = %id, "point updated");
        Ok(())
    }

    pub fn remove(&mut self, id: PointId) -> Result<Point> {
        self.ensure_writable(Mutation::Delete)?;
        let index = self
            .points
            .iter()
            .position(|point| point.id == id)
            .ok_or(AnnotationError::NotFound(id))?;
        let removed = self.points.remove(index);
        debug!(point_id = %id, "point removed");
        Ok(removed)
    }

    /// Points sorted ascending by timestamp.
    pub fn ordered_view(&self) -> Vec<&Point> {
        let mut ordered: Vec<&Point> = self.points.iter().collect();
        ordered.sort_by_key(|point| point.timestamp);
        ordered
    }

    /// Chronological wire records, without ids.
    pub fn records(&self) -> Vec<PointRecord> {
        self.ordered_view()
            .into_iter()
            .map(Point::to_record)
            .collect()
    }

    /// Drops every point. Id allocation keeps counting so ids are never reused.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Replaces the whole content with fetched records, bypassing the read-only
    /// gate. Records sharing a timestamp with an earlier record are skipped, so
    /// the uniqueness invariant holds even for malformed input; the number of
    /// skipped records is returned.
    pub fn replace_all(&mut self, records: &[PointRecord]) -> usize {
        self.points.clear();
        let mut skipped = 0;
        for record in records {
            let timestamp = normalize(record.timestamp);
            if self.points.iter().any(|point| point.timestamp == timestamp) {
                skipped += 1;
                continue;
            }
            let id = self.allocate_id();
            self.points.push(Point {
                id,
                lat: record.lat,
                lon: record.lon,
                altitude: record.altitude,
                timestamp,
            });
        }
        skipped
    }

    fn allocate_id(&mut self) -> PointId {
        let id = PointId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Timestamps are held at millisecond resolution.
pub fn normalize(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp.trunc_subsecs(3)
}

fn validate_altitude(altitude: f64) -> Result<()> {
    if altitude.is_finite() && altitude >= 0.0 {
        Ok(())
    } else {
        Err(AnnotationError::InvalidAltitude(altitude))
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
