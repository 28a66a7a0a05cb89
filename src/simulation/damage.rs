use bevy_ecs::prelude::*;
use bevy_utils::tracing::debug;
use thiserror::Error;

use crate::components::block::{Block, Integrity};
use crate::components::grid::Grid;

/// Classification attached to every damage application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageType {
    Explosion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    Damaged { remaining: f32 },
    Destroyed,
}

#[derive(Debug, Error, PartialEq)]
pub enum DamageError {
    #[error("block {0:?} no longer exists")]
    MissingBlock(Entity),
    #[error("block {block:?} belongs to missing grid {grid:?}")]
    MissingGrid { block: Entity, grid: Entity },
    #[error("block {0:?} has no integrity to damage")]
    MissingIntegrity(Entity),
}

/// Remove a block from its grid and despawn it. A grid left empty goes too.
pub fn raze_block(world: &mut World, block: Entity) -> Result<(), DamageError> {
    let grid_entity = world
        .get::<Block>(block)
        .ok_or(DamageError::MissingBlock(block))?
        .grid;

    let emptied = {
        let mut grid = world
            .get_mut::<Grid>(grid_entity)
            .ok_or(DamageError::MissingGrid {
                block,
                grid: grid_entity,
            })?;
        grid.detach_block(block);
        grid.blocks.is_empty()
    };

    world.despawn(block);
    if emptied {
        debug!(?grid_entity, "grid has no blocks left, closing it");
        world.despawn(grid_entity);
    }
    Ok(())
}

/// Apply `amount` damage to a block, razing it once integrity hits zero.
pub fn apply_damage(
    world: &mut World,
    block: Entity,
    amount: f32,
    kind: DamageType,
) -> Result<DamageOutcome, DamageError> {
    if world.get::<Block>(block).is_none() {
        return Err(DamageError::MissingBlock(block));
    }

    let integrity = {
        let mut integrity = world
            .get_mut::<Integrity>(block)
            .ok_or(DamageError::MissingIntegrity(block))?;
        integrity.current -= amount;
        *integrity
    };

    if !integrity.is_destroyed() {
        return Ok(DamageOutcome::Damaged {
            remaining: integrity.current,
        });
    }

    debug!(?block, ?kind, amount, "block destroyed by damage");
    raze_block(world, block)?;
    Ok(DamageOutcome::Destroyed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::block::BlockDefinition;
    use crate::components::world::BlockPosition;

    fn spawn_grid_with_blocks(world: &mut World, count: usize) -> (Entity, Vec<Entity>) {
        let grid = world.spawn(Grid::default()).id();
        let mut blocks = Vec::new();
        for x in 0..count {
            let definition = BlockDefinition::new("Reactor", "LargeBlockSmallReactor", "SmallReactor", 100.0);
            let block = world
                .spawn((
                    Block {
                        definition,
                        position: BlockPosition { x: x as i32, y: 0, z: 0 },
                        grid,
                        owner_id: 1,
                        built_by: 1,
                    },
                    Integrity::new(100.0),
                ))
                .id();
            blocks.push(block);
        }
        world.get_mut::<Grid>(grid).unwrap().blocks = blocks.clone();
        (grid, blocks)
    }

    #[test]
    fn razing_last_block_closes_the_grid() {
        let mut world = World::new();
        let (grid, blocks) = spawn_grid_with_blocks(&mut world, 2);

        raze_block(&mut world, blocks[0]).unwrap();
        assert_eq!(world.get::<Grid>(grid).unwrap().blocks, vec![blocks[1]]);

        raze_block(&mut world, blocks[1]).unwrap();
        assert!(world.get_entity(grid).is_none());
    }

    #[test]
    fn razing_twice_reports_missing_block() {
        let mut world = World::new();
        let (_, blocks) = spawn_grid_with_blocks(&mut world, 2);

        raze_block(&mut world, blocks[0]).unwrap();
        assert_eq!(
            raze_block(&mut world, blocks[0]),
            Err(DamageError::MissingBlock(blocks[0]))
        );
    }

    #[test]
    fn partial_damage_keeps_block() {
        let mut world = World::new();
        let (_, blocks) = spawn_grid_with_blocks(&mut world, 1);

        let outcome = apply_damage(&mut world, blocks[0], 40.0, DamageType::Explosion).unwrap();
        assert_eq!(outcome, DamageOutcome::Damaged { remaining: 60.0 });
        assert_eq!(world.get::<Integrity>(blocks[0]).unwrap().current, 60.0);
    }

    #[test]
    fn lethal_damage_destroys_block() {
        let mut world = World::new();
        let (_, blocks) = spawn_grid_with_blocks(&mut world, 2);

        let outcome = apply_damage(&mut world, blocks[0], 1000.0, DamageType::Explosion).unwrap();
        assert_eq!(outcome, DamageOutcome::Destroyed);
        assert!(world.get_entity(blocks[0]).is_none());
    }

    #[test]
    fn block_without_integrity_cannot_be_damaged() {
        let mut world = World::new();
        let (_, blocks) = spawn_grid_with_blocks(&mut world, 1);
        world.entity_mut(blocks[0]).remove::<Integrity>();

        assert_eq!(
            apply_damage(&mut world, blocks[0], 10.0, DamageType::Explosion),
            Err(DamageError::MissingIntegrity(blocks[0]))
        );
    }
}
