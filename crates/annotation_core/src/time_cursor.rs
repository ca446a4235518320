//! Simulated clock that stamps newly placed points.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::ParseDomainError;
use tracing::warn;

use crate::{
    error::{AnnotationError, Result},
    store::normalize,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementUnit {
    Minutes,
    #[default]
    Seconds,
    Milliseconds,
}

impl IncrementUnit {
    pub fn delta(self, amount: i64) -> Option<TimeDelta> {
        match self {
            Self::Minutes => TimeDelta::try_minutes(amount),
            Self::Seconds => TimeDelta::try_seconds(amount),
            Self::Milliseconds => TimeDelta::try_milliseconds(amount),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minutes => "minutes",
            Self::Seconds => "seconds",
            Self::Milliseconds => "milliseconds",
        }
    }
}

impl fmt::Display for IncrementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncrementUnit {
    type Err = ParseDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minutes" | "minute" | "min" | "m" => Ok(Self::Minutes),
            "seconds" | "second" | "sec" | "s" => Ok(Self::Seconds),
            "milliseconds" | "millisecond" | "ms" => Ok(Self::Milliseconds),
            _ => Err(ParseDomainError::new("increment unit", s)),
        }
    }
}

/// Whether the cursor's instant would currently be accepted for a new point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatus {
    Valid,
    NotLaterThanLatest,
}

#[derive(Debug, Clone)]
pub struct TimeCursor {
    current: DateTime<Utc>,
    unit: IncrementUnit,
    amount: u32,
    auto_advance: bool,
}

impl TimeCursor {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: normalize(start),
            unit: IncrementUnit::default(),
            amount: 1,
            auto_advance: true,
        }
    }

    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn current(&self) -> DateTime<Utc> {
        self.current
    }

    pub fn unit(&self) -> IncrementUnit {
        self.unit
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn set_unit(&mut self, unit: IncrementUnit) {
        self.unit = unit;
    }

    pub fn set_amount(&mut self, amount: u32) -> Result<()> {
        if amount == 0 {
            return Err(AnnotationError::InvalidSetting(
                "increment amount must be at least 1".into(),
            ));
        }
        self.amount = amount;
        Ok(())
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        self.auto_advance = enabled;
    }

    /// Calendar arithmetic on the current instant; negative amounts move back.
    pub fn advance(&mut self, amount: i64, unit: IncrementUnit) -> Result<()> {
        let next = unit
            .delta(amount)
            .and_then(|delta| self.current.checked_add_signed(delta))
            .ok_or_else(|| {
                AnnotationError::InvalidSetting(format!(
                    "advancing the time cursor by {amount} {unit} is out of range"
                ))
            })?;
        self.current = next;
        Ok(())
    }

    /// Steps one unit forward or back.
    pub fn nudge(&mut self, forward: bool) -> Result<()> {
        self.advance(if forward { 1 } else { -1 }, self.unit)
    }

    /// Advances by the configured amount of the configured unit.
    pub fn jump(&mut self) -> Result<()> {
        self.advance(i64::from(self.amount), self.unit)
    }

    pub fn set_manually(&mut self, instant: DateTime<Utc>) {
        self.current = normalize(instant);
    }

    /// Replaces the time of day, keeping the calendar date.
    pub fn set_time_of_day(&mut self, time: NaiveTime) {
        self.current = normalize(self.current.date_naive().and_time(time).and_utc());
    }

    /// Returns the instant for the next point and, with auto-advance on, moves
    /// the cursor forward afterwards.
    pub fn consume_for_new_point(&mut self) -> DateTime<Utc> {
        let consumed = self.current;
        if self.auto_advance {
            if let Err(err) = self.advance(i64::from(self.amount), self.unit) {
                warn!("time cursor not advanced: {err}");
            }
        }
        consumed
    }

    pub fn is_consumable(&self, store_max: Option<DateTime<Utc>>) -> bool {
        store_max.map_or(true, |latest| self.current > latest)
    }

    pub fn status(&self, store_max: Option<DateTime<Utc>>) -> CursorStatus {
        if self.is_consumable(store_max) {
            CursorStatus::Valid
        } else {
            CursorStatus::NotLaterThanLatest
        }
    }

    /// `HH:MM:SS.mmm`
    pub fn display(&self) -> String {
        self.current.format("%H:%M:%S%.3f").to_string()
    }
}

#[cfg(test)]
#[path = "tests/time_cursor_tests.rs"]
mod tests;
