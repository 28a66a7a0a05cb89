use bevy_ecs::prelude::*;
use bevy_ecs::schedule::SystemSet;

use crate::data::limits::LimiterConfig;
use crate::simulation::identity::{FactionRegistry, IdentityRegistry};
use crate::simulation::time::{advance_clock_system, enforcement_due, EnforcementClock};
use crate::systems::executor::{apply_punishments_system, MutationQueue, PunishmentLog};
use crate::systems::punish::punish_scan_system;

/// Canonical tick ordering for the limiter.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TickSet {
    /// Read-only scan that decides what to punish.
    Enforcement,
    /// The only stage allowed to change blocks and grids.
    Mutation,
    Time,
}

/// Build the ECS world with baseline resources.
pub fn create_world(config: LimiterConfig) -> World {
    let mut world = World::new();
    world.insert_resource(config);
    world.insert_resource(EnforcementClock::default());
    world.insert_resource(IdentityRegistry::default());
    world.insert_resource(FactionRegistry::default());
    world.insert_resource(MutationQueue::default());
    world.insert_resource(PunishmentLog::default());
    world
}

/// Build the system schedule in the canonical order.
pub fn create_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.configure_sets((TickSet::Enforcement, TickSet::Mutation, TickSet::Time).chain());

    schedule.add_systems((
        punish_scan_system
            .in_set(TickSet::Enforcement)
            .run_if(enforcement_due),
        apply_punishments_system.in_set(TickSet::Mutation),
        advance_clock_system.in_set(TickSet::Time),
    ));

    schedule
}
