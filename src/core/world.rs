use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::block::{Block, BlockDefinition, Functional, Integrity};
use crate::components::grid::Grid;
use crate::components::world::{BlockPosition, EntityId, UNOWNED};
use crate::core::ecs::{create_schedule, create_world};
use crate::data::limits::LimiterConfig;
use crate::simulation::identity::{Faction, FactionRegistry, Identity, IdentityRegistry};
use crate::simulation::time::EnforcementClock;
use crate::systems::executor::{PunishmentLog, PunishmentReport};

/// Serializable description of one block, used to seed a world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockBlueprint {
    pub definition: BlockDefinition,
    #[serde(default)]
    pub position: BlockPosition,
    #[serde(default)]
    pub owner_id: i64,
    #[serde(default)]
    pub built_by: i64,
    /// `Some(enabled)` for blocks that can be switched off.
    #[serde(default)]
    pub functional: Option<bool>,
}

impl BlockBlueprint {
    pub fn new(definition: BlockDefinition, owner_id: i64) -> Self {
        Self {
            definition,
            position: BlockPosition::default(),
            owner_id,
            built_by: owner_id,
            functional: None,
        }
    }

    /// Block whose type, subtype and pair name are all `subtype_id`.
    pub fn basic(subtype_id: &str, owner_id: i64) -> Self {
        Self::new(
            BlockDefinition::new(subtype_id, subtype_id, subtype_id, 100.0),
            owner_id,
        )
    }

    pub fn functional(mut self, enabled: bool) -> Self {
        self.functional = Some(enabled);
        self
    }

    pub fn built_by(mut self, identity_id: i64) -> Self {
        self.built_by = identity_id;
        self
    }

    pub fn at(mut self, x: i32, y: i32, z: i32) -> Self {
        self.position = BlockPosition { x, y, z };
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridBlueprint {
    pub grid_id: i64,
    pub display_name: String,
    #[serde(default)]
    pub big_owners: Vec<i64>,
    /// Derived from block owners when left empty.
    #[serde(default)]
    pub small_owners: Vec<i64>,
    #[serde(default)]
    pub blocks: Vec<BlockBlueprint>,
}

impl GridBlueprint {
    pub fn new(grid_id: i64, display_name: &str, big_owners: Vec<i64>) -> Self {
        Self {
            grid_id,
            display_name: display_name.to_string(),
            big_owners,
            small_owners: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<BlockBlueprint>) -> Self {
        self.blocks = blocks;
        self
    }

    fn derived_small_owners(&self) -> Vec<i64> {
        if !self.small_owners.is_empty() {
            return self.small_owners.clone();
        }
        let mut owners = self.big_owners.clone();
        for block in &self.blocks {
            if block.owner_id != UNOWNED && !owners.contains(&block.owner_id) {
                owners.push(block.owner_id);
            }
        }
        owners
    }
}

/// Everything the limiter needs to know about the world it polices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    #[serde(default)]
    pub identities: Vec<Identity>,
    #[serde(default)]
    pub factions: Vec<Faction>,
    #[serde(default)]
    pub grids: Vec<GridBlueprint>,
}

/// Spawn a grid and its blocks, returning the grid entity.
pub fn spawn_grid(world: &mut World, blueprint: &GridBlueprint) -> Entity {
    let grid = world
        .spawn((
            EntityId(blueprint.grid_id),
            Grid {
                display_name: blueprint.display_name.clone(),
                big_owners: blueprint.big_owners.clone(),
                small_owners: blueprint.derived_small_owners(),
                blocks: Vec::new(),
            },
        ))
        .id();

    let mut blocks = Vec::with_capacity(blueprint.blocks.len());
    for block in &blueprint.blocks {
        let mut entity = world.spawn((
            Block {
                definition: block.definition.clone(),
                position: block.position,
                grid,
                owner_id: block.owner_id,
                built_by: block.built_by,
            },
            Integrity::new(block.definition.max_integrity),
        ));
        if let Some(enabled) = block.functional {
            entity.insert(Functional { enabled });
        }
        blocks.push(entity.id());
    }

    if let Some(mut grid_component) = world.get_mut::<Grid>(grid) {
        grid_component.blocks = blocks;
    }
    grid
}

/// Register identities and factions, then spawn every grid.
pub fn apply_snapshot(world: &mut World, snapshot: &WorldSnapshot) {
    {
        let mut identities = world.get_resource_or_insert_with(IdentityRegistry::default);
        for identity in &snapshot.identities {
            identities.insert(identity.clone());
        }
    }
    {
        let mut factions = world.get_resource_or_insert_with(FactionRegistry::default);
        for faction in &snapshot.factions {
            factions.insert(faction.clone());
        }
    }
    for grid in &snapshot.grids {
        spawn_grid(world, grid);
    }
}

/// Outcome of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub tick: u64,
    pub cycles: u64,
    pub report: PunishmentReport,
}

/// Wrapper around the ECS world and the enforcement schedule.
pub struct Limiter {
    world: World,
    schedule: Schedule,
}

impl Limiter {
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            world: create_world(config),
            schedule: create_schedule(),
        }
    }

    pub fn with_snapshot(config: LimiterConfig, snapshot: &WorldSnapshot) -> Self {
        let mut limiter = Self::new(config);
        apply_snapshot(&mut limiter.world, snapshot);
        limiter
    }

    /// Run one scheduler tick: scan when due, apply queued punishments, advance the clock.
    pub fn tick(&mut self) -> TickSummary {
        let tick = self.world.resource::<EnforcementClock>().tick;
        self.schedule.run(&mut self.world);

        let clock = self.world.resource::<EnforcementClock>();
        let log = self.world.resource::<PunishmentLog>();
        TickSummary {
            tick,
            cycles: clock.cycles,
            report: log.report,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &LimiterConfig {
        self.world.resource::<LimiterConfig>()
    }

    pub fn config_mut(&mut self) -> Mut<'_, LimiterConfig> {
        self.world.resource_mut::<LimiterConfig>()
    }

    pub fn punishment_log(&self) -> &PunishmentLog {
        self.world.resource::<PunishmentLog>()
    }
}
