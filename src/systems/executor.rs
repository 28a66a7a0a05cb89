use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::{error, info};
use thiserror::Error;

use crate::components::block::{Block, Functional, Integrity};
use crate::components::grid::Grid;
use crate::data::limits::{LimiterConfig, PunishmentType};
use crate::simulation::damage::{apply_damage, raze_block, DamageError, DamageType};
use crate::systems::punish::PunishmentBatch;

/// Explosive damage dealt is this many times the block's max integrity.
const EXPLOSION_DAMAGE_FACTOR: f32 = 10.0;

/// Resource: batches waiting for the world-mutation stage.
///
/// Scans only ever push; `apply_punishments_system` is the single consumer.
#[derive(Resource, Debug, Default)]
pub struct MutationQueue {
    pending: VecDeque<PunishmentBatch>,
}

impl MutationQueue {
    pub fn submit(&mut self, batch: PunishmentBatch) {
        self.pending.push_back(batch);
    }

    pub fn drain(&mut self) -> Vec<PunishmentBatch> {
        self.pending.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PunishmentEvent {
    pub block: Entity,
    pub pair_name: String,
    pub grid_name: String,
    pub punishment: PunishmentType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PunishmentReport {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PunishmentReport {
    pub fn total(&self) -> usize {
        self.applied + self.skipped + self.failed
    }

    fn merge(&mut self, other: PunishmentReport) {
        self.applied += other.applied;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// Resource: what the last mutation stage did.
#[derive(Resource, Debug, Default, Clone)]
pub struct PunishmentLog {
    pub events: Vec<PunishmentEvent>,
    pub report: PunishmentReport,
}

impl PunishmentLog {
    fn extend(&mut self, other: PunishmentLog) {
        self.events.extend(other.events);
        self.report.merge(other.report);
    }
}

#[derive(Debug, Error)]
pub enum PunishError {
    #[error("punishment {0:?} cannot be applied to a block")]
    Unsupported(PunishmentType),
    #[error(transparent)]
    Damage(#[from] DamageError),
}

/// System: drain the mutation queue and apply every batch to the world.
pub fn apply_punishments_system(world: &mut World) {
    let batches = match world.get_resource_mut::<MutationQueue>() {
        Some(mut queue) => queue.drain(),
        None => Vec::new(),
    };
    let log_actions = world
        .get_resource::<LimiterConfig>()
        .map(|config| config.enable_log)
        .unwrap_or(false);

    let mut log = PunishmentLog::default();
    for batch in batches {
        log.extend(execute_batch(world, batch, log_actions));
    }

    if log.report.total() > 0 {
        info!(
            applied = log.report.applied,
            skipped = log.report.skipped,
            failed = log.report.failed,
            "punishment batch finished"
        );
    }
    world.insert_resource(log);
}

/// Apply one batch. A failing block is logged and never stops the rest.
pub fn execute_batch(world: &mut World, batch: PunishmentBatch, log_actions: bool) -> PunishmentLog {
    let mut log = PunishmentLog::default();
    for (block, punishment) in batch.into_sorted() {
        match apply_punishment(world, block, punishment) {
            Ok(Some(event)) => {
                if log_actions {
                    log_applied(&event);
                }
                log.report.applied += 1;
                log.events.push(event);
            }
            Ok(None) => log.report.skipped += 1,
            Err(err) => {
                error!(?block, ?punishment, "failed to punish block: {}", err);
                log.report.failed += 1;
            }
        }
    }
    log
}

/// `Ok(None)` means the block cannot take this punishment and was left alone.
fn apply_punishment(
    world: &mut World,
    block: Entity,
    punishment: PunishmentType,
) -> Result<Option<PunishmentEvent>, PunishError> {
    let event = describe(world, block, punishment)?;

    match punishment {
        PunishmentType::Delete => {
            raze_block(world, block)?;
        }
        PunishmentType::Disable => {
            let Some(mut functional) = world.get_mut::<Functional>(block) else {
                return Ok(None);
            };
            functional.enabled = false;
        }
        PunishmentType::Explode => {
            let max_integrity = world
                .get::<Integrity>(block)
                .ok_or(DamageError::MissingIntegrity(block))?
                .max;
            apply_damage(
                world,
                block,
                max_integrity * EXPLOSION_DAMAGE_FACTOR,
                DamageType::Explosion,
            )?;
        }
        PunishmentType::None => return Err(PunishError::Unsupported(punishment)),
    }
    Ok(Some(event))
}

fn describe(
    world: &World,
    block: Entity,
    punishment: PunishmentType,
) -> Result<PunishmentEvent, DamageError> {
    let component = world
        .get::<Block>(block)
        .ok_or(DamageError::MissingBlock(block))?;
    let grid_name = world
        .get::<Grid>(component.grid)
        .map(|grid| grid.display_name.clone())
        .unwrap_or_else(|| "unknown grid".to_string());
    Ok(PunishmentEvent {
        block,
        pair_name: component.definition.pair_name.clone(),
        grid_name,
        punishment,
    })
}

fn log_applied(event: &PunishmentEvent) {
    let verb = match event.punishment {
        PunishmentType::Delete => "Removed",
        PunishmentType::Disable => "Turned off",
        PunishmentType::Explode => "Destroyed",
        PunishmentType::None => return,
    };
    info!("{} {} from {}", verb, event.pair_name, event.grid_name);
}
