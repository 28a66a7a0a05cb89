use bevy_ecs::prelude::*;
use bevy_utils::tracing::{debug, info, warn};
use bevy_utils::{HashMap, HashSet};

use crate::data::limits::{LimitItem, LimiterConfig, PunishmentType};
use crate::rules::{
    is_match, is_npc_controlled, is_resolvable, owns_unit, resolve_owner, ExceptionSet,
    OwnershipContext, ResolvedOwner,
};
use crate::simulation::inventory::{GridQuery, UnitRef};
use crate::simulation::time::EnforcementClock;
use crate::systems::executor::MutationQueue;

/// Blocks chosen by one scan and what to do with each. Last writer wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PunishmentBatch {
    entries: HashMap<Entity, PunishmentType>,
}

impl PunishmentBatch {
    /// Returns the punishment previously recorded for the block, if any.
    pub fn insert(&mut self, block: Entity, punishment: PunishmentType) -> Option<PunishmentType> {
        self.entries.insert(block, punishment)
    }

    pub fn get(&self, block: Entity) -> Option<PunishmentType> {
        self.entries.get(&block).copied()
    }

    pub fn contains(&self, block: Entity) -> bool {
        self.entries.contains_key(&block)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_of(&self, punishment: PunishmentType) -> usize {
        self.entries.values().filter(|p| **p == punishment).count()
    }

    /// Entries ordered by entity, for stable application and logs.
    pub fn into_sorted(self) -> Vec<(Entity, PunishmentType)> {
        let mut entries: Vec<_> = self.entries.into_iter().collect();
        entries.sort_by_key(|(block, _)| *block);
        entries
    }
}

/// System: run an enforcement cycle when the clock says so.
pub fn punish_scan_system(world: &mut World, grids: &mut GridQuery) {
    run_enforcement_cycle_with(world, grids);
}

/// Scan the world, select blocks over quota and queue them for punishment.
///
/// Never mutates blocks or grids; the only writes are the usage counters in
/// the config and the queued batch.
pub fn run_enforcement_cycle(world: &mut World) {
    let mut grids = GridQuery::new(world);
    run_enforcement_cycle_with(world, &mut grids);
}

fn run_enforcement_cycle_with(world: &mut World, grids: &mut GridQuery) {
    if !world.contains_resource::<LimiterConfig>() {
        warn!("no limiter config loaded, skipping enforcement cycle");
        return;
    }

    let batch = world.resource_scope(|world, mut config: Mut<LimiterConfig>| {
        let Some(ctx) = OwnershipContext::capture(world, grids) else {
            warn!("identity or faction registry missing, skipping enforcement cycle");
            return PunishmentBatch::default();
        };
        run_punish_scan(&mut config, &ctx)
    });

    if let Some(mut clock) = world.get_resource_mut::<EnforcementClock>() {
        clock.cycles += 1;
    }

    if batch.is_empty() {
        return;
    }
    info!(blocks = batch.len(), "queued blocks for punishment");
    world
        .get_resource_or_insert_with(MutationQueue::default)
        .submit(batch);
}

pub fn run_punish_scan(config: &mut LimiterConfig, ctx: &OwnershipContext<'_>) -> PunishmentBatch {
    let mut batch = PunishmentBatch::default();
    if !config.enable_limits || config.limits.is_empty() || ctx.inventory.is_empty() {
        return batch;
    }

    for item in config.limits.iter_mut() {
        if item.punishment == PunishmentType::None || item.found_entities.is_empty() {
            continue;
        }
        select_for_limit(item, ctx, &mut batch);
    }
    batch
}

fn select_for_limit(item: &mut LimitItem, ctx: &OwnershipContext<'_>, batch: &mut PunishmentBatch) {
    let mut owners: Vec<(i64, u32)> = item
        .found_entities
        .iter()
        .map(|(owner_id, count)| (*owner_id, *count))
        .collect();
    owners.sort_unstable_by_key(|(owner_id, _)| *owner_id);

    let exempt = ExceptionSet::resolve(&item.exceptions, ctx);
    // Blocks already taken under this limit by an earlier owner entry.
    let mut taken: HashSet<Entity> = HashSet::default();

    for (owner_id, found) in owners {
        if !is_resolvable(owner_id) || exempt.contains(owner_id) {
            item.found_entities.remove(&owner_id);
            debug!(limit = item.label(), owner_id, "dropped unowned or exempt entry");
            continue;
        }

        if found <= item.limit {
            continue;
        }
        let budget = found - item.limit;

        let Some(owner) = resolve_owner(owner_id, item, ctx) else {
            debug!(limit = item.label(), owner_id, "owner did not resolve, skipping");
            continue;
        };

        if item.ignore_npcs && is_npc_controlled(&owner, ctx) {
            continue;
        }

        let selected = select_units(item, &owner, budget, ctx, &exempt, &mut taken, batch);
        debug!(
            limit = item.label(),
            owner_id,
            scope = ?owner.scope(),
            budget,
            selected,
            "selected blocks over limit"
        );

        if item.punishment.is_destructive() {
            if let Some(count) = item.found_entities.get_mut(&owner_id) {
                *count = count.saturating_sub(selected);
            }
        }
    }
}

fn select_units<'w>(
    item: &LimitItem,
    owner: &ResolvedOwner<'_, 'w>,
    budget: u32,
    ctx: &OwnershipContext<'w>,
    exempt: &ExceptionSet,
    taken: &mut HashSet<Entity>,
    batch: &mut PunishmentBatch,
) -> u32 {
    let candidates: Box<dyn Iterator<Item = &UnitRef<'w>> + '_> = match owner {
        ResolvedOwner::Grid(grid) => Box::new(ctx.inventory.grid_units(grid)),
        ResolvedOwner::Player(_) | ResolvedOwner::Faction(_) => {
            Box::new(ctx.inventory.units().iter())
        }
    };

    let mut selected = 0;
    for unit in candidates {
        if selected >= budget {
            break;
        }
        if taken.contains(&unit.entity)
            || !owns_unit(owner, unit, item.block_owner_state, ctx)
            || !is_match(&unit.block.definition, &item.block_list)
            || exempt.covers_unit(unit)
        {
            continue;
        }
        taken.insert(unit.entity);
        batch.insert(unit.entity, item.punishment);
        selected += 1;
    }
    selected
}
