//! Map viewport derived from the point store: auto-zoom fitting, jump-to-point
//! and the transient highlight.

use std::time::{Duration, Instant};

use shared::domain::{LatLon, PointId};
use tracing::debug;

use crate::{
    store::{Point, TemporalPointStore},
    timers::TimerSlot,
};

pub const COARSE_ZOOM: u8 = 8;
pub const MEDIUM_ZOOM: u8 = 10;
pub const FINE_ZOOM: u8 = 12;
pub const JUMP_ZOOM: u8 = 12;

const COARSE_SPREAD_DEG: f64 = 0.1;
const MEDIUM_SPREAD_DEG: f64 = 0.01;

pub const DEFAULT_CENTER: LatLon = LatLon {
    lat: 32.0853,
    lon: 34.7818,
};
pub const DEFAULT_ZOOM: u8 = 10;
pub const DEFAULT_HIGHLIGHT_CLEAR_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub center: LatLon,
    pub zoom: u8,
    pub highlighted: Option<PointId>,
}

impl ViewState {
    pub fn new(center: LatLon, zoom: u8) -> Self {
        Self {
            center,
            zoom,
            highlighted: None,
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(DEFAULT_CENTER, DEFAULT_ZOOM)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightSource {
    Hover,
    Jump,
}

/// Coarse zoom heuristic over the larger coordinate spread, in degrees.
pub fn zoom_for_spread(spread: f64) -> u8 {
    if spread > COARSE_SPREAD_DEG {
        COARSE_ZOOM
    } else if spread > MEDIUM_SPREAD_DEG {
        MEDIUM_ZOOM
    } else {
        FINE_ZOOM
    }
}

/// Center of the bounding box and the matching zoom. None for no points.
pub fn fit<'a>(points: impl IntoIterator<Item = &'a Point>) -> Option<(LatLon, u8)> {
    let mut bounds: Option<(f64, f64, f64, f64)> = None;
    for point in points {
        let (min_lat, max_lat, min_lon, max_lon) =
            bounds.get_or_insert((point.lat, point.lat, point.lon, point.lon));
        *min_lat = min_lat.min(point.lat);
        *max_lat = max_lat.max(point.lat);
        *min_lon = min_lon.min(point.lon);
        *max_lon = max_lon.max(point.lon);
    }

    let (min_lat, max_lat, min_lon, max_lon) = bounds?;
    let center = LatLon::new((max_lat + min_lat) / 2.0, (max_lon + min_lon) / 2.0);
    let spread = (max_lat - min_lat).max(max_lon - min_lon);
    Some((center, zoom_for_spread(spread)))
}

#[derive(Debug, Clone)]
pub struct ViewportSynchronizer {
    view: ViewState,
    initial: ViewState,
    auto_zoom: bool,
    jump_enabled: bool,
    highlight_source: Option<HighlightSource>,
    clear_timer: TimerSlot,
    clear_delay: Duration,
}

impl ViewportSynchronizer {
    pub fn new(initial: ViewState, clear_delay: Duration) -> Self {
        Self {
            view: initial.clone(),
            initial,
            auto_zoom: false,
            jump_enabled: true,
            highlight_source: None,
            clear_timer: TimerSlot::default(),
            clear_delay,
        }
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn auto_zoom(&self) -> bool {
        self.auto_zoom
    }

    pub fn jump_enabled(&self) -> bool {
        self.jump_enabled
    }

    pub fn highlight_source(&self) -> Option<HighlightSource> {
        self.highlight_source
    }

    pub fn set_auto_zoom(&mut self, enabled: bool) {
        self.auto_zoom = enabled;
    }

    pub fn set_jump_enabled(&mut self, enabled: bool) {
        self.jump_enabled = enabled;
    }

    /// Recenters on the bounding box of `points` when auto-zoom is on.
    pub fn fit_to_points<'a>(&mut self, points: impl IntoIterator<Item = &'a Point>) -> bool {
        if !self.auto_zoom {
            return false;
        }
        let Some((center, zoom)) = fit(points) else {
            return false;
        };
        self.view.center = center;
        self.view.zoom = zoom;
        debug!(lat = center.lat, lon = center.lon, zoom, "viewport fitted");
        true
    }

    /// Centers on a point and highlights it until the clear delay elapses.
    pub fn jump_to(&mut self, id: PointId, store: &TemporalPointStore, now: Instant) -> bool {
        if !self.jump_enabled {
            return false;
        }
        let Some(point) = store.get(id) else {
            return false;
        };
        self.view.center = LatLon::new(point.lat, point.lon);
        self.view.zoom = JUMP_ZOOM;
        self.view.highlighted = Some(id);
        self.highlight_source = Some(HighlightSource::Jump);
        self.clear_timer.schedule(now, self.clear_delay);
        debug!(point_id = %id, "jumped to point");
        true
    }

    /// Hover highlighting never expires on its own, and it supersedes a
    /// pending jump highlight.
    pub fn hover(&mut self, id: Option<PointId>) {
        self.clear_timer.cancel();
        self.view.highlighted = id;
        self.highlight_source = id.map(|_| HighlightSource::Hover);
    }

    /// Drops the highlight if it refers to `id`.
    pub fn forget(&mut self, id: PointId) {
        if self.view.highlighted == Some(id) {
            self.clear_timer.cancel();
            self.view.highlighted = None;
            self.highlight_source = None;
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.clear_timer.deadline()
    }

    /// Clears a jump highlight whose delay has elapsed.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.clear_timer.poll(now) {
            return false;
        }
        self.view.highlighted = None;
        self.highlight_source = None;
        true
    }

    /// Back to the initial center and zoom with no highlight. Toggles are kept.
    pub fn reset(&mut self) {
        self.clear_timer.cancel();
        self.view = self.initial.clone();
        self.highlight_source = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRole {
    Start,
    Intermediate,
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: PointId,
    pub position: LatLon,
    pub role: MarkerRole,
    pub highlighted: bool,
    pub draggable: bool,
}

/// Markers in chronological order. A lone point is the start.
pub fn markers(ordered: &[&Point], highlighted: Option<PointId>, draggable: bool) -> Vec<Marker> {
    let last = ordered.len().saturating_sub(1);
    ordered
        .iter()
        .enumerate()
        .map(|(index, point)| Marker {
            id: point.id,
            position: LatLon::new(point.lat, point.lon),
            role: if index == 0 {
                MarkerRole::Start
            } else if index == last {
                MarkerRole::End
            } else {
                MarkerRole::Intermediate
            },
            highlighted: highlighted == Some(point.id),
            draggable,
        })
        .collect()
}

/// Polyline through the points in time order; empty below two points.
pub fn path(ordered: &[&Point]) -> Vec<LatLon> {
    if ordered.len() < 2 {
        return Vec::new();
    }
    ordered
        .iter()
        .map(|point| LatLon::new(point.lat, point.lon))
        .collect()
}

#[cfg(test)]
#[path = "tests/viewport_tests.rs"]
mod tests;
