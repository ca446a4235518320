//! Plain-text rendering of session state for the prompt.

use std::fmt::Write;

use annotation_core::{
    error::{AnnotationError, ErrorKind},
    session::SessionSnapshot,
    time_cursor::CursorStatus,
    viewport::MarkerRole,
};
use shared::domain::AppMode;

pub fn prompt(snapshot: &SessionSnapshot) -> String {
    let mut prompt = format!(
        "[{} {} {}]",
        snapshot.mode,
        snapshot.object_type,
        snapshot.cursor.format("%H:%M:%S%.3f")
    );
    if snapshot.pending_deletion.is_some() {
        prompt.push_str(" delete? (yes/no)");
    }
    prompt.push_str("> ");
    prompt
}

pub fn points(snapshot: &SessionSnapshot) -> String {
    if snapshot.points.is_empty() {
        return match snapshot.mode {
            AppMode::Training => "no points yet, click the map to add one".to_string(),
            AppMode::Testing => "no course loaded".to_string(),
        };
    }

    let mut out = String::new();
    for (point, marker) in snapshot.points.iter().zip(&snapshot.markers) {
        let tag = match marker.role {
            MarkerRole::Start => "start",
            MarkerRole::End => "end",
            MarkerRole::Intermediate => "",
        };
        let highlight = if marker.highlighted { "*" } else { " " };
        let _ = writeln!(
            out,
            "{highlight}{:<5} {:<6} {:>10.5} {:>10.5}  {:>7.1} m  {}",
            point.id.to_string(),
            tag,
            point.lat,
            point.lon,
            point.altitude,
            point.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        );
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn status(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "mode:         {}", snapshot.mode);
    if let Some(course_id) = &snapshot.active_course_id {
        let _ = writeln!(out, "course:       {course_id}");
    }
    let _ = writeln!(out, "object type:  {}", snapshot.object_type.label());
    let _ = writeln!(out, "noise level:  {}%", snapshot.noise_level);
    let _ = writeln!(
        out,
        "cursor:       {}{}",
        snapshot.cursor.format("%Y-%m-%d %H:%M:%S%.3f"),
        cursor_warning(snapshot.cursor_status)
            .map(|warning| format!("  ({warning})"))
            .unwrap_or_default()
    );
    let _ = writeln!(
        out,
        "increment:    {} {}, auto-advance {}",
        snapshot.increment_amount,
        snapshot.increment_unit,
        on_off(snapshot.auto_advance)
    );
    let _ = writeln!(
        out,
        "map:          center {:.5}, {:.5} zoom {}{}",
        snapshot.view.center.lat,
        snapshot.view.center.lon,
        snapshot.view.zoom,
        snapshot
            .view
            .highlighted
            .map(|id| format!(", highlighting {id}"))
            .unwrap_or_default()
    );
    let _ = writeln!(
        out,
        "auto-zoom:    {}, jump-to-point {}",
        on_off(snapshot.auto_zoom),
        on_off(snapshot.jump_to_point)
    );
    let _ = write!(
        out,
        "points:       {}{}",
        snapshot.points.len(),
        if snapshot.busy { " (request in flight)" } else { "" }
    );
    out
}

pub fn cursor_warning(status: CursorStatus) -> Option<&'static str> {
    match status {
        CursorStatus::Valid => None,
        CursorStatus::NotLaterThanLatest => Some("not later than the previous point"),
    }
}

pub fn error(err: &AnnotationError) -> String {
    let label = match err.kind() {
        ErrorKind::Validation => "rejected",
        ErrorKind::Capability => "not allowed",
        ErrorKind::Remote => "backend error",
        ErrorKind::Session => "unavailable",
    };
    format!("{label}: {err}")
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
