use serde::{Deserialize, Serialize};

use crate::math::Vec2;

use super::entity::{EntityId, EntityRegistry, PlayerId};
use super::group::Group;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl PlayerColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    id: PlayerId,
    name: String,
    color: PlayerColor,
    pub(crate) units: Group,
    pub(crate) selected_units: Group,
}

impl Player {
    pub(crate) fn new(id: PlayerId, name: impl Into<String>, color: PlayerColor) -> Self {
        Self {
            id,
            name: name.into(),
            color,
            units: Group::new(),
            selected_units: Group::new(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> PlayerColor {
        self.color
    }

    pub fn units(&self) -> &Group {
        &self.units
    }

    pub fn selected_units(&self) -> &Group {
        &self.selected_units
    }
}

/// First unit under `point` that belongs to anyone but `shooter`, scanning
/// players in registration order.
pub(crate) fn hostile_unit_at(
    players: &[Player],
    registry: &EntityRegistry,
    point: Vec2,
    shooter: PlayerId,
) -> Option<EntityId> {
    players
        .iter()
        .filter(|player| player.id != shooter)
        .find_map(|player| player.units.find_one_by_coordinates(point, registry))
}
