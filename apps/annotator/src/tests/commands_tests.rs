use super::*;

use chrono::TimeZone;

#[test]
fn blank_line_is_not_a_command() {
    assert_eq!(parse_line("   ").expect("parse"), None);
}

#[test]
fn parses_point_gestures() {
    assert_eq!(
        parse_line("click 32.08, 34.78").expect("parse"),
        Some(Command::Click {
            lat: 32.08,
            lon: 34.78
        })
    );
    assert_eq!(
        parse_line("drag p3 31.5 35").expect("parse"),
        Some(Command::Drag {
            id: PointId(3),
            lat: 31.5,
            lon: 35.0
        })
    );
    assert_eq!(
        parse_line("alt p1 450.5").expect("parse"),
        Some(Command::Altitude {
            id: PointId(1),
            meters: 450.5
        })
    );
    assert_eq!(
        parse_line("delete 2").expect("parse"),
        Some(Command::Delete(PointId(2)))
    );
    assert_eq!(parse_line("y").expect("parse"), Some(Command::ConfirmDelete));
    assert_eq!(parse_line("hover off").expect("parse"), Some(Command::Hover(None)));
}

#[test]
fn parses_timestamps_in_both_forms() {
    assert_eq!(
        parse_line("time p2 2024-06-01T12:30:00.125Z").expect("parse"),
        Some(Command::Retime {
            id: PointId(2),
            time: TimeInput::Instant(
                Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap()
                    + chrono::Duration::milliseconds(125)
            ),
        })
    );
    assert_eq!(
        time_input("08:15:30.250").expect("time of day"),
        TimeInput::TimeOfDay(NaiveTime::from_hms_milli_opt(8, 15, 30, 250).unwrap())
    );
    assert_eq!(
        time_input("08:15").expect("short time of day"),
        TimeInput::TimeOfDay(NaiveTime::from_hms_opt(8, 15, 0).unwrap())
    );
    assert!(time_input("tomorrow").is_err());
}

#[test]
fn parses_cursor_controls() {
    assert_eq!(
        parse_line("cursor +").expect("parse"),
        Some(Command::Cursor(CursorCommand::Nudge { forward: true }))
    );
    assert_eq!(
        parse_line("cursor unit ms").expect("parse"),
        Some(Command::Cursor(CursorCommand::Unit(
            IncrementUnit::Milliseconds
        )))
    );
    assert_eq!(
        parse_line("cursor auto off").expect("parse"),
        Some(Command::Cursor(CursorCommand::AutoAdvance(false)))
    );
    assert!(parse_line("cursor amount 0").is_err());
    assert!(parse_line("cursor amount 1000").is_err());
    assert!(parse_line("cursor sideways").is_err());
}

#[test]
fn parses_session_settings_and_modes() {
    assert_eq!(
        parse_line("TYPE Storm").expect("parse"),
        Some(Command::ObjectType(ObjectType::Storm))
    );
    assert_eq!(
        parse_line("mode testing").expect("parse"),
        Some(Command::Mode(AppMode::Testing))
    );
    assert_eq!(parse_line("noise 40").expect("parse"), Some(Command::Noise(40)));
    assert_eq!(
        parse_line("export").expect("parse"),
        Some(Command::Export(ExportFormat::Both))
    );
    assert_eq!(
        parse_line("autozoom on").expect("parse"),
        Some(Command::AutoZoom(true))
    );
    assert_eq!(parse_line("submit").expect("parse"), Some(Command::Primary));
}

#[test]
fn rejects_malformed_input_with_usage() {
    let err = parse_line("click 32.0").expect_err("missing lon");
    assert!(err.to_string().contains("usage: click"));
    assert!(parse_line("click abc 34").is_err());
    assert!(parse_line("type submarine").is_err());
    assert!(parse_line("noise 300").is_err());
    assert!(parse_line("frobnicate").is_err());
}
