use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Owner id meaning "nobody". Never resolves to a grid, identity or faction.
pub const UNOWNED: i64 = 0;

/// Stable identifier for addressing grids externally.
///
/// Grids, identities and factions share one id space, so a quota counter keyed
/// by an owner id can point at any of the three.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub i64);

/// Cell coordinates of a block inside its grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockPosition {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}
