//! Typed commands read from the interactive prompt.

use anyhow::{anyhow, bail, Context, Result};
use annotation_core::time_cursor::IncrementUnit;
use chrono::{DateTime, NaiveTime, Utc};
use shared::domain::{AppMode, ExportFormat, ObjectType, PointId};

use crate::config::parse_flag;

/// Either a full instant or a time of day applied to an existing date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeInput {
    Instant(DateTime<Utc>),
    TimeOfDay(NaiveTime),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CursorCommand {
    Set(TimeInput),
    Nudge { forward: bool },
    Jump,
    Unit(IncrementUnit),
    Amount(u32),
    AutoAdvance(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Click { lat: f64, lon: f64 },
    Drag { id: PointId, lat: f64, lon: f64 },
    Altitude { id: PointId, meters: f64 },
    Retime { id: PointId, time: TimeInput },
    Delete(PointId),
    ConfirmDelete,
    CancelDelete,
    Hover(Option<PointId>),
    JumpTo(PointId),
    Cursor(CursorCommand),
    ObjectType(ObjectType),
    Noise(u8),
    Mode(AppMode),
    Primary,
    Export(ExportFormat),
    AutoZoom(bool),
    JumpToPoint(bool),
    Points,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
click <lat> <lon>            place a point at the cursor time
drag <id> <lat> <lon>        move a point
alt <id> <meters>            set a point's altitude
time <id> <time>             set a point's timestamp (RFC 3339 or HH:MM:SS[.mmm])
delete <id> | yes | no       delete a point after confirmation
hover <id>|off               highlight a point
jump <id>                    center the map on a point
cursor set <time>            set the time cursor
cursor + | - | jump          nudge or jump the time cursor
cursor unit <m|s|ms>         increment unit
cursor amount <n>            increment amount (1-999)
cursor auto on|off           advance the cursor after each point
type <drone|plane|bird|storm>
noise <0-100>
mode training|testing
save | submit                save the course or submit the guess
export [courses|points|both]
autozoom on|off
jumpto on|off
points | status | help | quit";

const MAX_INCREMENT_AMOUNT: u32 = 999;

pub fn parse_line(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "click" | "add" => {
            let [lat, lon] = exact::<2>(&args, "click <lat> <lon>")?;
            Command::Click {
                lat: coordinate(lat)?,
                lon: coordinate(lon)?,
            }
        }
        "drag" | "move" => {
            let [id, lat, lon] = exact::<3>(&args, "drag <id> <lat> <lon>")?;
            Command::Drag {
                id: point_id(id)?,
                lat: coordinate(lat)?,
                lon: coordinate(lon)?,
            }
        }
        "alt" | "altitude" => {
            let [id, meters] = exact::<2>(&args, "alt <id> <meters>")?;
            Command::Altitude {
                id: point_id(id)?,
                meters: meters
                    .parse()
                    .with_context(|| format!("invalid altitude '{meters}'"))?,
            }
        }
        "time" => {
            let [id, time] = exact::<2>(&args, "time <id> <time>")?;
            Command::Retime {
                id: point_id(id)?,
                time: time_input(time)?,
            }
        }
        "delete" | "rm" => {
            let [id] = exact::<1>(&args, "delete <id>")?;
            Command::Delete(point_id(id)?)
        }
        "yes" | "y" => Command::ConfirmDelete,
        "no" | "n" => Command::CancelDelete,
        "hover" => {
            let [target] = exact::<1>(&args, "hover <id>|off")?;
            if target.eq_ignore_ascii_case("off") {
                Command::Hover(None)
            } else {
                Command::Hover(Some(point_id(target)?))
            }
        }
        "jump" | "goto" => {
            let [id] = exact::<1>(&args, "jump <id>")?;
            Command::JumpTo(point_id(id)?)
        }
        "cursor" => Command::Cursor(cursor_command(&args)?),
        "type" => {
            let [object_type] = exact::<1>(&args, "type <drone|plane|bird|storm>")?;
            Command::ObjectType(object_type.parse()?)
        }
        "noise" => {
            let [level] = exact::<1>(&args, "noise <0-100>")?;
            Command::Noise(
                level
                    .parse()
                    .with_context(|| format!("invalid noise level '{level}'"))?,
            )
        }
        "mode" => {
            let [mode] = exact::<1>(&args, "mode training|testing")?;
            Command::Mode(mode.parse()?)
        }
        "save" | "submit" => Command::Primary,
        "export" => match args.as_slice() {
            [] => Command::Export(ExportFormat::default()),
            [format] => Command::Export(format.parse()?),
            _ => bail!("usage: export [courses|points|both]"),
        },
        "autozoom" => {
            let [flag] = exact::<1>(&args, "autozoom on|off")?;
            Command::AutoZoom(on_off(flag)?)
        }
        "jumpto" => {
            let [flag] = exact::<1>(&args, "jumpto on|off")?;
            Command::JumpToPoint(on_off(flag)?)
        }
        "points" | "list" => Command::Points,
        "status" | "view" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(Some(command))
}

fn cursor_command(args: &[&str]) -> Result<CursorCommand> {
    let command = match args {
        ["set", time] => CursorCommand::Set(time_input(time)?),
        ["+"] => CursorCommand::Nudge { forward: true },
        ["-"] => CursorCommand::Nudge { forward: false },
        ["jump"] => CursorCommand::Jump,
        ["unit", unit] => CursorCommand::Unit(unit.parse()?),
        ["amount", amount] => {
            let amount: u32 = amount
                .parse()
                .with_context(|| format!("invalid amount '{amount}'"))?;
            if !(1..=MAX_INCREMENT_AMOUNT).contains(&amount) {
                bail!("increment amount must be between 1 and {MAX_INCREMENT_AMOUNT}");
            }
            CursorCommand::Amount(amount)
        }
        ["auto", flag] => CursorCommand::AutoAdvance(on_off(flag)?),
        _ => bail!("usage: cursor set <time> | + | - | jump | unit <u> | amount <n> | auto on|off"),
    };
    Ok(command)
}

fn exact<'a, const N: usize>(args: &[&'a str], usage: &str) -> Result<[&'a str; N]> {
    <[&'a str; N]>::try_from(args).map_err(|_| anyhow!("usage: {usage}"))
}

fn point_id(raw: &str) -> Result<PointId> {
    Ok(raw.parse()?)
}

fn coordinate(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim_end_matches(',')
        .parse()
        .with_context(|| format!("invalid coordinate '{raw}'"))?;
    if !value.is_finite() {
        bail!("invalid coordinate '{raw}'");
    }
    Ok(value)
}

fn on_off(raw: &str) -> Result<bool> {
    parse_flag(raw).ok_or_else(|| anyhow!("expected on or off, got '{raw}'"))
}

pub fn time_input(raw: &str) -> Result<TimeInput> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(TimeInput::Instant(instant.with_timezone(&Utc)));
    }
    NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map(TimeInput::TimeOfDay)
        .with_context(|| format!("invalid time '{raw}'"))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
