use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identity of a point inside one editing session. Assigned by the point store,
/// never sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PointId(pub u64);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

impl FromStr for PointId {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(['p', 'P']);
        digits
            .parse::<u64>()
            .map(PointId)
            .map_err(|_| ParseDomainError::new("point id", s))
    }
}

/// Backend-assigned course identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub String);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    #[default]
    Drone,
    Plane,
    Bird,
    Storm,
}

impl ObjectType {
    pub const ALL: [ObjectType; 4] = [Self::Drone, Self::Plane, Self::Bird, Self::Storm];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Drone => "drone",
            Self::Plane => "plane",
            Self::Bird => "bird",
            Self::Storm => "storm",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Drone => "Drone",
            Self::Plane => "Plane",
            Self::Bird => "Bird",
            Self::Storm => "Storm",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseDomainError::new("object type", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppMode {
    #[default]
    Training,
    Testing,
}

impl AppMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Testing => "testing",
        }
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppMode {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "training" => Ok(Self::Training),
            "testing" => Ok(Self::Testing),
            _ => Err(ParseDomainError::new("mode", s)),
        }
    }
}

/// Which tables the CSV export should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Courses,
    Points,
    #[default]
    Both,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Courses => "courses",
            Self::Points => "points",
            Self::Both => "both",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "courses" => Ok(Self::Courses),
            "points" => Ok(Self::Points),
            "both" => Ok(Self::Both),
            _ => Err(ParseDomainError::new("export format", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {what}: {input:?}")]
pub struct ParseDomainError {
    pub what: &'static str,
    pub input: String,
}

impl ParseDomainError {
    pub fn new(what: &'static str, input: impl Into<String>) -> Self {
        Self {
            what,
            input: input.into(),
        }
    }
}
