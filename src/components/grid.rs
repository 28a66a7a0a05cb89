use bevy_ecs::prelude::*;

/// An aggregate of blocks with one or more owners.
#[derive(Component, Debug, Clone, Default)]
pub struct Grid {
    pub display_name: String,
    /// Identities holding the largest share of the grid.
    pub big_owners: Vec<i64>,
    /// Every identity that owns at least one block on the grid.
    pub small_owners: Vec<i64>,
    pub blocks: Vec<Entity>,
}

impl Grid {
    pub fn has_owners(&self) -> bool {
        !self.big_owners.is_empty()
    }

    pub fn detach_block(&mut self, block: Entity) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|entity| *entity != block);
        self.blocks.len() != before
    }
}
