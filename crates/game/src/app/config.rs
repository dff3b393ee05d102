use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skirmish_engine::{
    CameraConfig, CameraError, LoopConfig, PlayerColor, SimTuning, TuningError, TurretKind, Vec2,
};
use thiserror::Error;
use tracing::info;

pub(crate) const CONFIG_ENV_VAR: &str = "SKIRMISH_CONFIG";
pub(crate) const MAX_FRAMES_ENV_VAR: &str = "SKIRMISH_MAX_FRAMES";
pub(crate) const DEFAULT_MAX_FRAMES: u64 = 600;

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
    #[error("camera: {0}")]
    Camera(#[from] CameraError),
    #[error("tuning: {0}")]
    Tuning(#[from] TuningError),
}

/// Loop timing as it appears in the config file, in whole milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct LoopSettings {
    pub(crate) step_ms: u64,
    pub(crate) max_steps_per_frame: u32,
    pub(crate) max_frame_delta_ms: Option<u64>,
    pub(crate) max_render_fps: Option<u32>,
    pub(crate) metrics_interval_ms: u64,
    pub(crate) poll_interval_ms: u64,
    pub(crate) slow_frame_ms: u64,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from_loop_config(&LoopConfig::default())
    }
}

impl LoopSettings {
    fn from_loop_config(config: &LoopConfig) -> Self {
        Self {
            step_ms: config.step.as_millis() as u64,
            max_steps_per_frame: config.max_steps_per_frame,
            max_frame_delta_ms: config.max_frame_delta.map(|delta| delta.as_millis() as u64),
            max_render_fps: config.max_render_fps,
            metrics_interval_ms: config.metrics_interval.as_millis() as u64,
            poll_interval_ms: config.poll_interval.as_millis() as u64,
            slow_frame_ms: config.simulated_slow_frame_ms,
        }
    }

    pub(crate) fn to_loop_config(&self) -> LoopConfig {
        LoopConfig {
            step: Duration::from_millis(self.step_ms),
            max_steps_per_frame: self.max_steps_per_frame,
            max_frame_delta: self.max_frame_delta_ms.map(Duration::from_millis),
            max_render_fps: self.max_render_fps,
            metrics_interval: Duration::from_millis(self.metrics_interval_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            simulated_slow_frame_ms: self.slow_frame_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct UnitSetup {
    pub(crate) position: Vec2,
    /// An empty list spawns a plain, unarmed vessel.
    #[serde(default)]
    pub(crate) turrets: Vec<TurretKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlayerSetup {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) color: PlayerColor,
    #[serde(default)]
    pub(crate) fleet: Vec<UnitSetup>,
}

/// One scripted pointer or keyboard gesture. Coordinates are canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub(crate) enum InputAction {
    Click { at: Vec2 },
    SelectRect { from: Vec2, to: Vec2 },
    ClearSelection,
    Zoom { pointer: Vec2, delta: f32 },
    Pan { from: Vec2, to: Vec2 },
    /// Every non-local player locks its whole fleet on the first local unit.
    OpponentsEngage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptedInput {
    pub(crate) tick: u64,
    pub(crate) action: InputAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    #[serde(rename = "loop")]
    pub(crate) loop_settings: LoopSettings,
    pub(crate) camera: CameraConfig,
    pub(crate) tuning: SimTuning,
    /// The first entry is the local player.
    pub(crate) players: Vec<PlayerSetup>,
    pub(crate) script: Vec<ScriptedInput>,
    pub(crate) rng_seed: Option<u64>,
    pub(crate) debug_bounds: bool,
    pub(crate) max_frames: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        let armed = |x: f32, y: f32, turrets: &[TurretKind]| UnitSetup {
            position: Vec2::new(x, y),
            turrets: turrets.to_vec(),
        };
        let both = [TurretKind::Cannon, TurretKind::Laser];
        let cannon = [TurretKind::Cannon];
        let at = |tick: u64, action: InputAction| ScriptedInput { tick, action };

        Self {
            loop_settings: LoopSettings::default(),
            camera: CameraConfig::default(),
            tuning: SimTuning::default(),
            players: vec![
                PlayerSetup {
                    name: "blue".to_string(),
                    color: PlayerColor::rgb(40, 110, 230),
                    fleet: vec![
                        armed(100.0, 100.0, &both),
                        armed(100.0, 150.0, &both),
                        armed(150.0, 125.0, &cannon),
                    ],
                },
                PlayerSetup {
                    name: "red".to_string(),
                    color: PlayerColor::rgb(220, 50, 40),
                    fleet: vec![armed(400.0, 100.0, &cannon), armed(400.0, 150.0, &cannon)],
                },
            ],
            script: vec![
                at(
                    1,
                    InputAction::SelectRect {
                        from: Vec2::new(80.0, 80.0),
                        to: Vec2::new(170.0, 170.0),
                    },
                ),
                at(2, InputAction::OpponentsEngage),
                at(
                    3,
                    InputAction::Click {
                        at: Vec2::new(400.0, 100.0),
                    },
                ),
                at(
                    60,
                    InputAction::Zoom {
                        pointer: Vec2::new(250.0, 125.0),
                        delta: -200.0,
                    },
                ),
                at(
                    90,
                    InputAction::Pan {
                        from: Vec2::new(300.0, 300.0),
                        to: Vec2::new(260.0, 300.0),
                    },
                ),
                at(
                    120,
                    InputAction::Click {
                        at: Vec2::new(300.0, 200.0),
                    },
                ),
            ],
            rng_seed: None,
            debug_bounds: false,
            max_frames: DEFAULT_MAX_FRAMES,
        }
    }
}

impl GameConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.camera.validate()?;
        self.tuning.validate()?;

        if self.loop_settings.step_ms == 0 {
            return Err(expected_actual("loop.step_ms", "> 0", 0));
        }
        if self.loop_settings.max_steps_per_frame == 0 {
            return Err(expected_actual("loop.max_steps_per_frame", ">= 1", 0));
        }
        if self.loop_settings.max_render_fps == Some(0) {
            return Err(expected_actual("loop.max_render_fps", "null or >= 1", 0));
        }
        if self.max_frames == 0 {
            return Err(expected_actual("max_frames", ">= 1", 0));
        }
        if self.players.is_empty() {
            return Err(validation_err("players", "at least the local player is required"));
        }

        for (player_index, player) in self.players.iter().enumerate() {
            if player.name.trim().is_empty() {
                return Err(validation_err(
                    &format!("players[{player_index}].name"),
                    "must not be blank",
                ));
            }
            for (unit_index, unit) in player.fleet.iter().enumerate() {
                if !unit.position.is_finite() {
                    return Err(validation_err(
                        &format!("players[{player_index}].fleet[{unit_index}].position"),
                        "must be finite",
                    ));
                }
            }
        }

        for (index, input) in self.script.iter().enumerate() {
            let finite = match &input.action {
                InputAction::Click { at } => at.is_finite(),
                InputAction::SelectRect { from, to } | InputAction::Pan { from, to } => {
                    from.is_finite() && to.is_finite()
                }
                InputAction::Zoom { pointer, delta } => pointer.is_finite() && delta.is_finite(),
                InputAction::ClearSelection | InputAction::OpponentsEngage => true,
            };
            if !finite {
                return Err(validation_err(
                    &format!("script[{index}].action"),
                    "coordinates must be finite",
                ));
            }
        }
        Ok(())
    }
}

/// Defaults, overlaid by the file named in `SKIRMISH_CONFIG` and the frame cap
/// from `SKIRMISH_MAX_FRAMES`, then validated.
pub(crate) fn load_config() -> Result<GameConfig, ConfigError> {
    let mut config = match env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!(path = %path.display(), "config_file_selected");
            load_config_file(&path)?
        }
        None => GameConfig::default(),
    };

    if let Ok(raw) = env::var(MAX_FRAMES_ENV_VAR) {
        config.max_frames = parse_max_frames(&raw)?;
    }

    config.validate()?;
    Ok(config)
}

pub(crate) fn load_config_file(path: &Path) -> Result<GameConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_json(&raw)
}

pub(crate) fn parse_config_json(raw: &str) -> Result<GameConfig, ConfigError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, GameConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            // `?` is how a failure before the first key is named.
            if path.is_empty() || path == "." || path == "?" {
                Err(ConfigError::Parse(format!("parse config json: {source}")))
            } else {
                Err(ConfigError::Parse(format!(
                    "parse config json at {path}: {source}"
                )))
            }
        }
    }
}

fn parse_max_frames(raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(frames) if frames > 0 => Ok(frames),
        _ => Err(expected_actual(
            MAX_FRAMES_ENV_VAR,
            "a positive integer",
            format!("'{raw}'"),
        )),
    }
}

fn validation_err(path: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(format!("validation failed at {path}: {}", message.into()))
}

fn expected_actual(path: &str, expected: impl Display, actual: impl Display) -> ConfigError {
    validation_err(path, format!("expected {expected}, got {actual}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid_and_match_engine_loop_defaults() {
        let config = GameConfig::default();
        config.validate().expect("defaults validate");

        let loop_config = config.loop_settings.to_loop_config();
        let engine_default = LoopConfig::default();
        assert_eq!(loop_config.step, engine_default.step);
        assert_eq!(loop_config.max_render_fps, engine_default.max_render_fps);
        assert_eq!(loop_config.max_frame_delta, None);
        assert_eq!(config.max_frames, DEFAULT_MAX_FRAMES);
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let config = parse_config_json(
            r#"{
                "loop": { "step_ms": 20 },
                "tuning": { "cannon_cooldown_ticks": 10 },
                "max_frames": 42
            }"#,
        )
        .expect("parse");

        assert_eq!(config.loop_settings.step_ms, 20);
        assert_eq!(config.loop_settings.max_steps_per_frame, 20);
        assert_eq!(config.tuning.cannon_cooldown_ticks, 10);
        assert_eq!(config.tuning.laser_cooldown_ticks, 240);
        assert_eq!(config.players.len(), 2);
        assert_eq!(config.max_frames, 42);
    }

    #[test]
    fn players_and_script_parse_from_json() {
        let config = parse_config_json(
            r#"{
                "players": [
                    {
                        "name": "green",
                        "color": { "r": 0, "g": 200, "b": 0 },
                        "fleet": [
                            { "position": { "x": 1.0, "y": 2.0 }, "turrets": ["laser"] },
                            { "position": { "x": 5.0, "y": 2.0 } }
                        ]
                    }
                ],
                "script": [
                    { "tick": 4, "action": { "kind": "click", "at": { "x": 9.0, "y": 9.0 } } },
                    { "tick": 5, "action": { "kind": "clear_selection" } }
                ]
            }"#,
        )
        .expect("parse");

        let player = &config.players[0];
        assert_eq!(player.name, "green");
        assert_eq!(player.color, PlayerColor::rgb(0, 200, 0));
        assert_eq!(player.fleet[0].turrets, vec![TurretKind::Laser]);
        assert!(player.fleet[1].turrets.is_empty());
        assert_eq!(
            config.script[0].action,
            InputAction::Click {
                at: Vec2::new(9.0, 9.0)
            }
        );
        assert_eq!(config.script[1].action, InputAction::ClearSelection);
    }

    #[test]
    fn parse_error_reports_json_path() {
        let error = parse_config_json(r#"{ "loop": { "step_ms": "fast" } }"#)
            .expect_err("string step must fail");
        let message = error.to_string();
        assert!(
            message.starts_with("parse config json at loop.step_ms:"),
            "{message}"
        );
    }

    #[test]
    fn unknown_turret_kind_is_rejected_with_path() {
        let error = parse_config_json(
            r#"{
                "players": [
                    {
                        "name": "x",
                        "fleet": [
                            { "position": { "x": 0.0, "y": 0.0 }, "turrets": ["railgun"] }
                        ]
                    }
                ]
            }"#,
        )
        .expect_err("unknown turret");
        assert!(
            error
                .to_string()
                .contains("players[0].fleet[0].turrets[0]"),
            "{error}"
        );
    }

    #[test]
    fn syntax_error_at_root_has_no_path() {
        for raw in ["{ not json", "", "42"] {
            let error = parse_config_json(raw).expect_err("malformed root");
            let message = error.to_string();
            assert!(message.starts_with("parse config json:"), "{raw:?}: {message}");
        }
    }

    #[test]
    fn semantic_validation_names_the_field() {
        let mut config = GameConfig::default();
        config.loop_settings.step_ms = 0;
        assert_eq!(
            config.validate().expect_err("zero step").to_string(),
            "validation failed at loop.step_ms: expected > 0, got 0"
        );

        let mut config = GameConfig::default();
        config.players.clear();
        assert!(config
            .validate()
            .expect_err("no players")
            .to_string()
            .contains("at players:"));

        let mut config = GameConfig::default();
        config.players[1].fleet[0].position = Vec2::new(f32::INFINITY, 0.0);
        assert!(config
            .validate()
            .expect_err("infinite spawn")
            .to_string()
            .contains("players[1].fleet[0].position"));
    }

    #[test]
    fn camera_and_tuning_errors_are_wrapped() {
        let mut config = GameConfig::default();
        config.camera.min_scale = 10.0;
        assert!(matches!(config.validate(), Err(ConfigError::Camera(_))));

        let mut config = GameConfig::default();
        config.tuning.max_hull = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Tuning(_))));
    }

    #[test]
    fn max_frames_override_must_be_positive() {
        assert_eq!(parse_max_frames(" 120 ").expect("valid"), 120);
        assert!(parse_max_frames("0").is_err());
        assert!(parse_max_frames("soon").is_err());
    }

    #[test]
    fn config_file_round_trips_through_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{ "debug_bounds": true, "rng_seed": 7, "camera": {{ "initial_scale": 2.0 }} }}"#
        )
        .expect("write config");

        let config = load_config_file(file.path()).expect("load");
        assert!(config.debug_bounds);
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.camera.initial_scale, 2.0);
        config.validate().expect("valid");
    }

    #[test]
    fn missing_file_reports_its_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("absent.json");
        let error = load_config_file(&path).expect_err("missing file");
        assert!(matches!(error, ConfigError::Read { .. }));
        assert!(error.to_string().contains("absent.json"));
    }
}
