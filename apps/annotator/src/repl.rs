//! Interactive annotation session: prompt commands in, session gestures out,
//! with due timers fired between lines.

use std::io::Write as _;
use std::time::Instant;

use annotation_core::{
    error::{AnnotationError, Result as SessionResult},
    session::Outcome,
    CourseBackend, HttpCourseBackend, SessionDriver,
};
use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::{
    commands::{self, Command, CursorCommand, TimeInput, HELP},
    render,
};

enum Flow {
    Continue,
    Quit,
}

pub async fn run(mut driver: SessionDriver<HttpCourseBackend>) -> Result<()> {
    info!(api_url = driver.backend().base_url(), "annotation session started");
    println!("Trajectory annotator. Type 'help' for commands.");
    show_prompt(&driver);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let deadline = driver.session().next_deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match commands::parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(command)) => match execute(&mut driver, command).await {
                        Ok(Flow::Quit) => break,
                        Ok(Flow::Continue) => {}
                        Err(err) => println!("{}", render::error(&err)),
                    },
                    Err(err) => println!("{err:#}"),
                }
                show_prompt(&driver);
            }
            _ = wait_for(deadline) => {
                if let Some(result) = driver.tick(Instant::now()).await {
                    println!();
                    report(&driver, result);
                    show_prompt(&driver);
                }
            }
        }
    }

    info!("annotation session closed");
    Ok(())
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

fn show_prompt<B: CourseBackend>(driver: &SessionDriver<B>) {
    print!("{}", render::prompt(&driver.session().snapshot()));
    let _ = std::io::stdout().flush();
}

async fn execute(
    driver: &mut SessionDriver<HttpCourseBackend>,
    command: Command,
) -> SessionResult<Flow> {
    let session = driver.session_mut();
    match command {
        Command::Click { lat, lon } => {
            let id = session.map_click(lat, lon)?;
            let stamped = session
                .store()
                .get(id)
                .map(|point| point.timestamp.format("%H:%M:%S%.3f").to_string())
                .unwrap_or_default();
            println!("added {id} at {stamped}");
            if let Some(warning) = render::cursor_warning(session.cursor_status()) {
                println!("time cursor is {warning}");
            }
        }
        Command::Drag { id, lat, lon } => {
            session.drag_point(id, lat, lon)?;
            println!("moved {id}");
        }
        Command::Altitude { id, meters } => {
            session.edit_point(id, Some(meters), None)?;
            println!("{id} altitude set to {meters} m");
        }
        Command::Retime { id, time } => {
            let timestamp = match time {
                TimeInput::Instant(instant) => instant,
                TimeInput::TimeOfDay(time_of_day) => session
                    .store()
                    .get(id)
                    .ok_or(AnnotationError::NotFound(id))?
                    .timestamp
                    .date_naive()
                    .and_time(time_of_day)
                    .and_utc(),
            };
            session.edit_point(id, None, Some(timestamp))?;
            println!("{id} retimed");
        }
        Command::Delete(id) => {
            session.request_delete(id)?;
            println!("delete {id}? (yes/no)");
        }
        Command::ConfirmDelete => {
            let id = session.confirm_delete()?;
            println!("deleted {id}");
        }
        Command::CancelDelete => {
            if let Some(id) = session.cancel_delete() {
                println!("kept {id}");
            }
        }
        Command::Hover(id) => session.hover(id),
        Command::JumpTo(id) => {
            if session.jump_to_point(id, Instant::now()) {
                let view = session.view();
                println!(
                    "centered on {id} at {:.5}, {:.5} zoom {}",
                    view.center.lat, view.center.lon, view.zoom
                );
            } else if session.store().get(id).is_none() {
                return Err(AnnotationError::NotFound(id));
            } else {
                println!("jump-to-point is off");
            }
        }
        Command::Cursor(cursor) => {
            apply_cursor(driver, cursor)?;
            let session = driver.session();
            println!("time cursor {}", session.cursor().display());
            if let Some(warning) = render::cursor_warning(session.cursor_status()) {
                println!("time cursor is {warning}");
            }
        }
        Command::ObjectType(object_type) => {
            session.select_object_type(object_type);
            println!("object type {}", object_type.label());
        }
        Command::Noise(level) => {
            session.set_noise_level(level)?;
            println!("noise level {level}%");
        }
        Command::Mode(target) => {
            let result = driver.set_mode(target).await;
            match result? {
                Some(outcome) => report(driver, Ok(outcome)),
                None => println!("{} mode", driver.session().mode()),
            }
        }
        Command::Primary => {
            let result = driver.primary_action().await;
            report(driver, result);
        }
        Command::Export(format) => {
            let result = driver.export(format).await;
            report(driver, result);
        }
        Command::AutoZoom(enabled) => session.set_auto_zoom(enabled),
        Command::JumpToPoint(enabled) => session.set_jump_to_point(enabled),
        Command::Points => println!("{}", render::points(&session.snapshot())),
        Command::Status => println!("{}", render::status(&session.snapshot())),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(Flow::Quit),
    }
    Ok(Flow::Continue)
}

fn apply_cursor(
    driver: &mut SessionDriver<HttpCourseBackend>,
    command: CursorCommand,
) -> SessionResult<()> {
    let cursor = driver.session_mut().cursor_mut();
    match command {
        CursorCommand::Set(TimeInput::Instant(instant)) => cursor.set_manually(instant),
        CursorCommand::Set(TimeInput::TimeOfDay(time)) => cursor.set_time_of_day(time),
        CursorCommand::Nudge { forward } => cursor.nudge(forward)?,
        CursorCommand::Jump => cursor.jump()?,
        CursorCommand::Unit(unit) => cursor.set_unit(unit),
        CursorCommand::Amount(amount) => cursor.set_amount(amount)?,
        CursorCommand::AutoAdvance(enabled) => cursor.set_auto_advance(enabled),
    }
    Ok(())
}

fn report(driver: &SessionDriver<HttpCourseBackend>, result: SessionResult<Outcome>) {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("{}", render::error(&err));
            return;
        }
    };
    println!("{}", outcome.message());
    match &outcome {
        Outcome::CourseSaved(course) => {
            if let Some(id) = &course.id {
                println!("course id {id}");
            }
        }
        Outcome::TestingCourseLoaded { .. } => {
            println!("{}", render::points(&driver.session().snapshot()));
        }
        Outcome::Exported(export) => {
            for file in &export.files {
                match driver.backend().download_url(file) {
                    Ok(url) => println!("  {}: {url}", file.name),
                    Err(err) => println!("  {}: {err:#}", file.name),
                }
            }
        }
        Outcome::GuessScored { .. } => {}
    }
}
