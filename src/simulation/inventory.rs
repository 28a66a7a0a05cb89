use std::collections::HashMap;

use bevy_ecs::prelude::*;

use crate::components::block::Block;
use crate::components::grid::Grid;
use crate::components::world::EntityId;

/// Cached query over every grid entity, reused across cycles.
pub type GridQuery = QueryState<(&'static EntityId, &'static Grid)>;

/// A block as seen by one enforcement cycle.
#[derive(Debug, Clone, Copy)]
pub struct UnitRef<'w> {
    pub entity: Entity,
    pub grid_id: i64,
    pub block: &'w Block,
}

#[derive(Debug, Clone)]
pub struct GridRef<'w> {
    pub grid_id: i64,
    pub grid: &'w Grid,
    units: Vec<usize>,
}

/// Read-only view of every grid and block, taken once per cycle.
///
/// Units are ordered by grid id and then by each grid's own block order, so a
/// scan over the full inventory is deterministic.
#[derive(Debug, Default)]
pub struct UnitInventory<'w> {
    units: Vec<UnitRef<'w>>,
    grids: Vec<GridRef<'w>>,
    grid_index: HashMap<i64, usize>,
}

impl<'w> UnitInventory<'w> {
    pub fn capture(world: &'w World, grids: &mut GridQuery) -> Self {
        let mut found: Vec<(i64, &'w Grid)> = grids
            .iter(world)
            .map(|(id, grid)| (id.0, grid))
            .collect();
        found.sort_by_key(|(grid_id, _)| *grid_id);

        let mut inventory = UnitInventory::default();
        for (grid_id, grid) in found {
            let mut units = Vec::with_capacity(grid.blocks.len());
            for &block_entity in &grid.blocks {
                let Some(block) = world.get::<Block>(block_entity) else {
                    continue;
                };
                units.push(inventory.units.len());
                inventory.units.push(UnitRef {
                    entity: block_entity,
                    grid_id,
                    block,
                });
            }
            inventory.grid_index.insert(grid_id, inventory.grids.len());
            inventory.grids.push(GridRef {
                grid_id,
                grid,
                units,
            });
        }
        inventory
    }

    pub fn units(&self) -> &[UnitRef<'w>] {
        &self.units
    }

    pub fn grids(&self) -> &[GridRef<'w>] {
        &self.grids
    }

    pub fn grid(&self, grid_id: i64) -> Option<&GridRef<'w>> {
        self.grid_index.get(&grid_id).map(|idx| &self.grids[*idx])
    }

    /// Blocks of one grid, in the grid's own order.
    pub fn grid_units<'a>(&'a self, grid: &'a GridRef<'w>) -> impl Iterator<Item = &'a UnitRef<'w>> + 'a {
        grid.units.iter().map(move |idx| &self.units[*idx])
    }

    pub fn grid_of(&self, unit: &UnitRef<'w>) -> Option<&GridRef<'w>> {
        self.grid(unit.grid_id)
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::world::{spawn_grid, BlockBlueprint, GridBlueprint};

    #[test]
    fn units_are_ordered_by_grid_id_then_block_order() {
        let mut world = World::new();
        spawn_grid(
            &mut world,
            &GridBlueprint::new(20, "Second", vec![1])
                .with_blocks(vec![BlockBlueprint::basic("Reactor", 1); 2]),
        );
        spawn_grid(
            &mut world,
            &GridBlueprint::new(10, "First", vec![1])
                .with_blocks(vec![BlockBlueprint::basic("Drill", 1)]),
        );
        // Ids on anything that is not a grid are ignored.
        world.spawn(EntityId(5));

        let mut grids = GridQuery::new(&mut world);
        let inventory = UnitInventory::capture(&world, &mut grids);
        assert_eq!(inventory.grids().len(), 2);
        let order: Vec<(i64, &str)> = inventory
            .units()
            .iter()
            .map(|unit| (unit.grid_id, unit.block.definition.subtype_id.as_str()))
            .collect();
        assert_eq!(order, vec![(10, "Drill"), (20, "Reactor"), (20, "Reactor")]);

        let second = inventory.grid(20).unwrap();
        assert_eq!(second.grid.display_name, "Second");
        assert_eq!(inventory.grid_units(second).count(), 2);
        assert!(inventory.grid(30).is_none());
    }

    #[test]
    fn empty_world_gives_empty_inventory() {
        let mut world = World::new();
        let mut grids = GridQuery::new(&mut world);
        let inventory = UnitInventory::capture(&world, &mut grids);
        assert!(inventory.is_empty());
        assert_eq!(inventory.len(), 0);
    }
}
