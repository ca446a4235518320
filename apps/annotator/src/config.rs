use std::{fs, path::Path, time::Duration};

use annotation_core::{
    backend::DEFAULT_API_BASE_URL,
    session::{SessionSettings, DEFAULT_NEXT_COURSE_DELAY},
    time_cursor::IncrementUnit,
    viewport::{ViewState, DEFAULT_CENTER, DEFAULT_HIGHLIGHT_CLEAR_DELAY, DEFAULT_ZOOM},
};
use serde::Deserialize;
use shared::domain::LatLon;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "annotator.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub auto_zoom: bool,
    pub jump_to_point: bool,
    pub auto_advance: bool,
    pub increment_unit: IncrementUnit,
    pub increment_amount: u32,
    pub highlight_clear_ms: u64,
    pub next_course_delay_ms: u64,
    pub center: LatLon,
    pub zoom: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_BASE_URL.into(),
            auto_zoom: false,
            jump_to_point: true,
            auto_advance: true,
            increment_unit: IncrementUnit::Seconds,
            increment_amount: 1,
            highlight_clear_ms: DEFAULT_HIGHLIGHT_CLEAR_DELAY.as_millis() as u64,
            next_course_delay_ms: DEFAULT_NEXT_COURSE_DELAY.as_millis() as u64,
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl Settings {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            auto_zoom: self.auto_zoom,
            jump_to_point: self.jump_to_point,
            auto_advance: self.auto_advance,
            increment_unit: self.increment_unit,
            increment_amount: self.increment_amount,
            highlight_clear_delay: Duration::from_millis(self.highlight_clear_ms),
            next_course_delay: Duration::from_millis(self.next_course_delay_ms),
            initial_view: ViewState::new(self.center, self.zoom),
        }
    }
}

/// Shape of `annotator.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_url: Option<String>,
    auto_zoom: Option<bool>,
    jump_to_point: Option<bool>,
    auto_advance: Option<bool>,
    increment_unit: Option<String>,
    increment_amount: Option<u32>,
    highlight_clear_ms: Option<u64>,
    next_course_delay_ms: Option<u64>,
    center_lat: Option<f64>,
    center_lon: Option<f64>,
    zoom: Option<u8>,
}

/// Defaults, then the config file, then the environment.
pub fn load_settings(config_path: Option<&Path>) -> Settings {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or(Path::new(DEFAULT_CONFIG_PATH));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw),
        Err(err) if config_path.is_some() => {
            warn!("config file '{}' not readable: {err}", path.display());
        }
        Err(_) => {}
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!("ignoring malformed config file: {err}");
            return;
        }
    };

    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.auto_zoom {
        settings.auto_zoom = v;
    }
    if let Some(v) = file_cfg.jump_to_point {
        settings.jump_to_point = v;
    }
    if let Some(v) = file_cfg.auto_advance {
        settings.auto_advance = v;
    }
    if let Some(v) = file_cfg.increment_unit {
        match v.parse() {
            Ok(unit) => settings.increment_unit = unit,
            Err(err) => warn!("config increment_unit: {err}"),
        }
    }
    if let Some(v) = file_cfg.increment_amount {
        set_amount(settings, v);
    }
    if let Some(v) = file_cfg.highlight_clear_ms {
        settings.highlight_clear_ms = v;
    }
    if let Some(v) = file_cfg.next_course_delay_ms {
        settings.next_course_delay_ms = v;
    }
    if let Some(v) = file_cfg.center_lat {
        settings.center.lat = v;
    }
    if let Some(v) = file_cfg.center_lon {
        settings.center.lon = v;
    }
    if let Some(v) = file_cfg.zoom {
        settings.zoom = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("ANNOTATOR_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = var("APP__AUTO_ZOOM") {
        set_flag(&mut settings.auto_zoom, "APP__AUTO_ZOOM", &v);
    }
    if let Some(v) = var("APP__JUMP_TO_POINT") {
        set_flag(&mut settings.jump_to_point, "APP__JUMP_TO_POINT", &v);
    }
    if let Some(v) = var("APP__AUTO_ADVANCE") {
        set_flag(&mut settings.auto_advance, "APP__AUTO_ADVANCE", &v);
    }

    if let Some(v) = var("APP__INCREMENT_UNIT") {
        match v.parse() {
            Ok(unit) => settings.increment_unit = unit,
            Err(err) => warn!("APP__INCREMENT_UNIT: {err}"),
        }
    }
    if let Some(v) = var("APP__INCREMENT_AMOUNT") {
        match v.trim().parse::<u32>() {
            Ok(amount) => set_amount(settings, amount),
            Err(err) => warn!("APP__INCREMENT_AMOUNT '{v}': {err}"),
        }
    }
}

fn set_amount(settings: &mut Settings, amount: u32) {
    if amount == 0 {
        warn!("increment amount must be at least 1, keeping {}", settings.increment_amount);
    } else {
        settings.increment_amount = amount;
    }
}

fn set_flag(target: &mut bool, key: &str, raw: &str) {
    match parse_flag(raw) {
        Some(v) => *target = v,
        None => warn!("{key}: expected a boolean, got '{raw}'"),
    }
}

pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
