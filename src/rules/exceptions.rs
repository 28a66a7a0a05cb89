use bevy_utils::HashSet;

use crate::components::world::UNOWNED;
use crate::rules::ownership::OwnershipContext;
use crate::simulation::inventory::UnitRef;

/// True when the owner is exempt from a limit.
///
/// An exception entry names the owner by id, by identity display name, by
/// faction tag or name, or by grid display name.
pub fn is_excepted(owner_id: i64, exceptions: &[String], ctx: &OwnershipContext<'_>) -> bool {
    if exceptions.is_empty() {
        return false;
    }

    let id = owner_id.to_string();
    if exceptions.iter().any(|entry| entry.trim() == id) {
        return true;
    }

    aliases(owner_id, ctx)
        .iter()
        .any(|alias| contains_name(exceptions, alias))
}

/// Exempt owner ids of one limit, resolved once before a scan.
#[derive(Debug, Default)]
pub struct ExceptionSet {
    owners: HashSet<i64>,
}

impl ExceptionSet {
    /// Expand the exception entries into every known id they name.
    pub fn resolve(exceptions: &[String], ctx: &OwnershipContext<'_>) -> Self {
        let mut set = ExceptionSet::default();
        if exceptions.is_empty() {
            return set;
        }

        // Plain ids also cover owners nothing else knows about.
        set.owners.extend(
            exceptions
                .iter()
                .filter_map(|entry| entry.trim().parse::<i64>().ok()),
        );

        let known = ctx
            .identities
            .iter()
            .map(|identity| identity.identity_id)
            .chain(ctx.factions.iter().map(|faction| faction.faction_id))
            .chain(ctx.inventory.grids().iter().map(|grid| grid.grid_id));
        for owner_id in known {
            if is_excepted(owner_id, exceptions, ctx) {
                set.owners.insert(owner_id);
            }
        }
        set.owners.remove(&UNOWNED);
        set
    }

    pub fn contains(&self, owner_id: i64) -> bool {
        self.owners.contains(&owner_id)
    }

    /// A unit is exempt when its grid or its block owner is.
    pub fn covers_unit(&self, unit: &UnitRef<'_>) -> bool {
        self.contains(unit.grid_id) || self.contains(unit.block.owner_id)
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

fn aliases<'a>(owner_id: i64, ctx: &'a OwnershipContext<'_>) -> Vec<&'a str> {
    let mut names = Vec::new();
    if let Some(identity) = ctx.identities.get(owner_id) {
        names.push(identity.display_name.as_str());
    }
    let faction = ctx
        .factions
        .get(owner_id)
        .or_else(|| ctx.factions.faction_of(owner_id));
    if let Some(faction) = faction {
        names.push(faction.tag.as_str());
        names.push(faction.name.as_str());
    }
    if let Some(grid) = ctx.inventory.grid(owner_id) {
        names.push(grid.grid.display_name.as_str());
    }
    names
}

fn contains_name(exceptions: &[String], name: &str) -> bool {
    !name.is_empty()
        && exceptions
            .iter()
            .any(|entry| entry.trim().eq_ignore_ascii_case(name))
}
