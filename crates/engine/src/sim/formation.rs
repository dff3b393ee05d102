use std::f32::consts::TAU;

use rand::Rng;

use crate::math::Vec2;

use super::tuning::SimTuning;

/// Spreads a group move over a square-ish grid centred on the clicked point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareFormation {
    pub keep_away_radius: f32,
    pub max_columns: usize,
}

impl SquareFormation {
    pub fn from_tuning(tuning: &SimTuning) -> Self {
        Self {
            keep_away_radius: tuning.formation_keep_away_radius,
            max_columns: tuning.formation_max_columns,
        }
    }

    pub fn jitter_bound(&self) -> f32 {
        self.keep_away_radius / 10.0
    }

    /// Returns exactly `unit_count` destinations; unit `i` should head for
    /// entry `i`. Slots fill column by column with up to `max_columns`
    /// columns, each slot nudged by up to a tenth of the spacing in a random
    /// direction. The set is then shifted so its mean lands on `destination`.
    pub fn compute_destinations<R: Rng + ?Sized>(
        &self,
        unit_count: usize,
        destination: Vec2,
        rng: &mut R,
    ) -> Vec<Vec2> {
        if unit_count == 0 {
            return Vec::new();
        }

        let columns = self.max_columns.max(1).min(unit_count);
        let rows = unit_count.div_ceil(columns);
        let jitter = self.jitter_bound();

        let mut slots = Vec::with_capacity(unit_count);
        'grid: for column in 0..columns {
            for row in 0..rows {
                if slots.len() == unit_count {
                    break 'grid;
                }
                let angle = rng.gen_range(0.0..TAU);
                slots.push(
                    Vec2::new(
                        self.keep_away_radius * column as f32,
                        self.keep_away_radius * row as f32,
                    ) + Vec2::from_angle(angle) * jitter,
                );
            }
        }

        let centroid = slots.iter().fold(Vec2::ZERO, |sum, slot| sum + *slot) / slots.len() as f32;
        slots
            .into_iter()
            .map(|slot| slot - centroid + destination)
            .collect()
    }
}
