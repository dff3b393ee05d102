use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Damage a projectile deals to whichever health layer it strikes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageProfile {
    pub shield: f32,
    pub armor: f32,
    pub hull: f32,
}

impl DamageProfile {
    pub const CANNON_SHELL: DamageProfile = DamageProfile {
        shield: 0.0,
        armor: 5.0,
        hull: 10.0,
    };

    pub const LASER_BEAM: DamageProfile = DamageProfile {
        shield: 0.5,
        armor: 2.0,
        hull: 6.0,
    };
}

/// Gameplay constants. Every field can be overridden from config; missing
/// fields keep the prototype's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimTuning {
    pub move_arrival_threshold: f32,
    pub vessel_acceleration: f32,
    pub vessel_max_velocity: f32,
    pub max_shield: f32,
    pub max_armor: f32,
    pub max_hull: f32,
    pub cannon_cooldown_ticks: u32,
    pub laser_cooldown_ticks: u32,
    pub beam_duration_ticks: u32,
    pub projectile_speed: f32,
    pub projectile_max_travel_ticks: u32,
    pub projectile_arrival_distance: f32,
    pub cannon_damage: DamageProfile,
    pub laser_damage: DamageProfile,
    pub formation_keep_away_radius: f32,
    pub formation_max_columns: usize,
}

impl Default for SimTuning {
    fn default() -> Self {
        Self {
            move_arrival_threshold: 5.0,
            vessel_acceleration: 0.01,
            vessel_max_velocity: 1.0,
            max_shield: 100.0,
            max_armor: 100.0,
            max_hull: 100.0,
            cannon_cooldown_ticks: 160,
            laser_cooldown_ticks: 240,
            beam_duration_ticks: 30,
            projectile_speed: 5.0,
            projectile_max_travel_ticks: 100,
            projectile_arrival_distance: 2.0,
            cannon_damage: DamageProfile::CANNON_SHELL,
            laser_damage: DamageProfile::LASER_BEAM,
            formation_keep_away_radius: 50.0,
            formation_max_columns: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuningError {
    #[error("tuning field `{field}` must be positive and finite, got {value}")]
    NotPositive { field: &'static str, value: f32 },
    #[error("tuning field `{field}` must be non-negative and finite, got {value}")]
    Negative { field: &'static str, value: f32 },
    #[error("tuning field `{field}` must be at least 1")]
    Zero { field: &'static str },
}

impl SimTuning {
    pub fn validate(&self) -> Result<(), TuningError> {
        for (field, value) in [
            ("move_arrival_threshold", self.move_arrival_threshold),
            ("vessel_acceleration", self.vessel_acceleration),
            ("vessel_max_velocity", self.vessel_max_velocity),
            ("max_shield", self.max_shield),
            ("max_armor", self.max_armor),
            ("max_hull", self.max_hull),
            ("projectile_speed", self.projectile_speed),
            ("projectile_arrival_distance", self.projectile_arrival_distance),
            ("formation_keep_away_radius", self.formation_keep_away_radius),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(TuningError::NotPositive { field, value });
            }
        }

        for (field, profile) in [
            ("cannon_damage", self.cannon_damage),
            ("laser_damage", self.laser_damage),
        ] {
            for value in [profile.shield, profile.armor, profile.hull] {
                if !(value >= 0.0 && value.is_finite()) {
                    return Err(TuningError::Negative { field, value });
                }
            }
        }

        for (field, value) in [
            ("beam_duration_ticks", self.beam_duration_ticks),
            ("projectile_max_travel_ticks", self.projectile_max_travel_ticks),
        ] {
            if value == 0 {
                return Err(TuningError::Zero { field });
            }
        }
        if self.formation_max_columns == 0 {
            return Err(TuningError::Zero {
                field: "formation_max_columns",
            });
        }
        Ok(())
    }
}
