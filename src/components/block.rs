use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::world::BlockPosition;

/// Static description of a block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockDefinition {
    pub type_id: String,
    pub subtype_id: String,
    pub pair_name: String,
    pub max_integrity: f32,
}

impl BlockDefinition {
    pub fn new(type_id: &str, subtype_id: &str, pair_name: &str, max_integrity: f32) -> Self {
        Self {
            type_id: type_id.to_string(),
            subtype_id: subtype_id.to_string(),
            pair_name: pair_name.to_string(),
            max_integrity,
        }
    }
}

/// A single addressable unit placed on a grid.
#[derive(Component, Debug, Clone)]
pub struct Block {
    pub definition: BlockDefinition,
    pub position: BlockPosition,
    pub grid: Entity,
    pub owner_id: i64,
    pub built_by: i64,
}

/// Present only on blocks that can be switched on and off.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Functional {
    pub enabled: bool,
}

/// Structural health consumed by the damage model.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Integrity {
    pub current: f32,
    pub max: f32,
}

impl Integrity {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn is_destroyed(&self) -> bool {
        self.current <= 0.0
    }
}
