use bevy_ecs::prelude::*;

use crate::components::world::UNOWNED;
use crate::data::limits::{BlockOwnerState, LimitItem};
use crate::simulation::identity::{Faction, FactionRegistry, Identity, IdentityRegistry};
use crate::simulation::inventory::{GridQuery, GridRef, UnitInventory, UnitRef};

/// Everything a cycle reads to decide who owns what.
pub struct OwnershipContext<'w> {
    pub inventory: UnitInventory<'w>,
    pub identities: &'w IdentityRegistry,
    pub factions: &'w FactionRegistry,
}

impl<'w> OwnershipContext<'w> {
    /// Returns `None` when the identity or faction registry is missing.
    pub fn capture(world: &'w World, grids: &mut GridQuery) -> Option<Self> {
        Some(Self {
            inventory: UnitInventory::capture(world, grids),
            identities: world.get_resource::<IdentityRegistry>()?,
            factions: world.get_resource::<FactionRegistry>()?,
        })
    }

    /// Faction tag of the unit's owner, falling back to the grid's first big owner.
    pub fn unit_faction_tag(&self, unit: &UnitRef<'w>) -> Option<&'w str> {
        let owner = if unit.block.owner_id != UNOWNED {
            unit.block.owner_id
        } else {
            *self.inventory.grid_of(unit)?.grid.big_owners.first()?
        };
        self.factions.tag_of(owner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    Grid,
    Player,
    Faction,
}

/// The concrete target an owner id resolved to under a limit.
#[derive(Debug, Clone, Copy)]
pub enum ResolvedOwner<'a, 'w> {
    Grid(&'a GridRef<'w>),
    Player(&'w Identity),
    Faction(&'w Faction),
}

impl ResolvedOwner<'_, '_> {
    pub fn scope(&self) -> OwnerScope {
        match self {
            ResolvedOwner::Grid(_) => OwnerScope::Grid,
            ResolvedOwner::Player(_) => OwnerScope::Player,
            ResolvedOwner::Faction(_) => OwnerScope::Faction,
        }
    }
}

/// The unowned sentinel never resolves; callers prune such entries.
pub fn is_resolvable(owner_id: i64) -> bool {
    owner_id != UNOWNED
}

/// Resolve an owner id in priority order: grid, then player, then faction.
///
/// Only scopes enabled on the limit are tried. A grid without owners is not a
/// valid target and ends the resolution.
pub fn resolve_owner<'a, 'w>(
    owner_id: i64,
    item: &LimitItem,
    ctx: &'a OwnershipContext<'w>,
) -> Option<ResolvedOwner<'a, 'w>> {
    if !is_resolvable(owner_id) {
        return None;
    }

    if item.limit_grids {
        if let Some(grid) = ctx.inventory.grid(owner_id) {
            if !grid.grid.has_owners() {
                return None;
            }
            return Some(ResolvedOwner::Grid(grid));
        }
    }

    if item.limit_players {
        if let Some(identity) = ctx.identities.get(owner_id) {
            return Some(ResolvedOwner::Player(identity));
        }
    }

    if item.limit_faction {
        if let Some(faction) = ctx.factions.get(owner_id) {
            return Some(ResolvedOwner::Faction(faction));
        }
    }

    None
}

/// True when the resolved grid or faction is controlled only by NPC identities.
///
/// Player entries are never treated as NPC controlled, and neither is a grid
/// with no big owners.
pub fn is_npc_controlled(owner: &ResolvedOwner<'_, '_>, ctx: &OwnershipContext<'_>) -> bool {
    match owner {
        ResolvedOwner::Grid(grid) => {
            let owners = &grid.grid.big_owners;
            !owners.is_empty() && owners.iter().all(|owner| ctx.identities.is_npc(*owner))
        }
        ResolvedOwner::Player(_) => false,
        ResolvedOwner::Faction(faction) => faction.is_everyone_npc(ctx.identities),
    }
}

/// True when `unit` belongs to the resolved owner.
pub fn owns_unit<'w>(
    owner: &ResolvedOwner<'_, 'w>,
    unit: &UnitRef<'w>,
    state: BlockOwnerState,
    ctx: &OwnershipContext<'w>,
) -> bool {
    match owner {
        ResolvedOwner::Grid(grid) => unit.grid_id == grid.grid_id,
        ResolvedOwner::Player(identity) => player_owns(identity.identity_id, unit, state, ctx),
        ResolvedOwner::Faction(faction) => ctx
            .unit_faction_tag(unit)
            .map(|tag| tag == faction.tag)
            .unwrap_or(false),
    }
}

fn player_owns(
    identity_id: i64,
    unit: &UnitRef<'_>,
    state: BlockOwnerState,
    ctx: &OwnershipContext<'_>,
) -> bool {
    match state {
        BlockOwnerState::OwnedBy => unit.block.owner_id == identity_id,
        BlockOwnerState::BuiltBy => unit.block.built_by == identity_id,
        BlockOwnerState::GridMajorityOwner => ctx
            .inventory
            .grid_of(unit)
            .map(|grid| grid.grid.big_owners.contains(&identity_id))
            .unwrap_or(false),
        BlockOwnerState::GridShareholder => ctx
            .inventory
            .grid_of(unit)
            .map(|grid| {
                grid.grid.big_owners.contains(&identity_id)
                    || grid.grid.small_owners.contains(&identity_id)
            })
            .unwrap_or(false),
    }
}
