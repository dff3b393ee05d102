use std::collections::VecDeque;

use thiserror::Error;

use crate::math::Vec2;

use super::entity::{Entity, EntityBody, EntityId};
use super::state::BehaviorState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockSubject {
    Unit(EntityId),
    Group(Vec<EntityId>),
}

impl LockSubject {
    pub fn ids(&self) -> &[EntityId] {
        match self {
            LockSubject::Unit(id) => std::slice::from_ref(id),
            LockSubject::Group(ids) => ids,
        }
    }
}

/// One intended world mutation. Commands carry data only and are consumed
/// exactly once by the universe's dispatcher.
#[derive(Debug, Clone)]
pub enum Command {
    Move {
        entity: EntityId,
        destination: Vec2,
    },
    LockOnTarget {
        subject: LockSubject,
        target: EntityId,
    },
    LaunchProjectile {
        projectile: Box<Entity>,
    },
    Destroy {
        entity: EntityId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Move,
    LockOnTarget,
    LaunchProjectile,
    Destroy,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Move { .. } => CommandKind::Move,
            Command::LockOnTarget { .. } => CommandKind::LockOnTarget,
            Command::LaunchProjectile { .. } => CommandKind::LaunchProjectile,
            Command::Destroy { .. } => CommandKind::Destroy,
        }
    }

    /// Entities the command acts on.
    pub fn subjects(&self) -> &[EntityId] {
        match self {
            Command::Move { entity, .. } | Command::Destroy { entity } => {
                std::slice::from_ref(entity)
            }
            Command::LockOnTarget { subject, .. } => subject.ids(),
            Command::LaunchProjectile { projectile } => std::slice::from_ref(&projectile.id),
        }
    }

    pub fn validate(&self) -> Result<(), CommandError> {
        match self {
            Command::Move { entity, destination } => {
                if !destination.is_finite() {
                    return Err(CommandError::NonFiniteDestination { entity: *entity });
                }
            }
            Command::LockOnTarget { subject, target } => {
                if subject.ids().is_empty() {
                    return Err(CommandError::EmptyLockGroup);
                }
                if subject.ids().contains(target) {
                    return Err(CommandError::SelfTarget { entity: *target });
                }
            }
            Command::LaunchProjectile { projectile } => {
                if !matches!(projectile.body, EntityBody::Projectile(_)) {
                    return Err(CommandError::NotAProjectile {
                        entity: projectile.id,
                    });
                }
                if !matches!(
                    projectile.state,
                    BehaviorState::Travel(_) | BehaviorState::Beam(_)
                ) {
                    return Err(CommandError::ProjectileNotInFlight {
                        entity: projectile.id,
                        state: projectile.state.name(),
                    });
                }
                if !projectile.position.is_finite() {
                    return Err(CommandError::NonFiniteDestination {
                        entity: projectile.id,
                    });
                }
            }
            Command::Destroy { .. } => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("order for entity {entity} has a non-finite coordinate")]
    NonFiniteDestination { entity: EntityId },
    #[error("lock-on order has no subject units")]
    EmptyLockGroup,
    #[error("entity {entity} cannot lock on to itself")]
    SelfTarget { entity: EntityId },
    #[error("launch payload {entity} is not a projectile")]
    NotAProjectile { entity: EntityId },
    #[error("launch payload {entity} is in state `{state}` instead of a flight state")]
    ProjectileNotInFlight { entity: EntityId, state: &'static str },
}

/// FIFO of pending commands. Malformed commands are rejected at the door.
#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<Command>,
    accepted_total: u64,
}

impl CommandQueue {
    pub fn enqueue(&mut self, command: Command) -> Result<(), CommandError> {
        command.validate()?;
        self.pending.push_back(command);
        self.accepted_total = self.accepted_total.saturating_add(1);
        Ok(())
    }

    pub fn dequeue(&mut self) -> Option<Command> {
        self.pending.pop_front()
    }

    pub fn peek(&self) -> Option<&Command> {
        self.pending.front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn accepted_total(&self) -> u64 {
        self.accepted_total
    }
}
