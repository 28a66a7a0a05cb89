// Re-export core modules for use by the binary or other consumers
pub mod components;
pub mod core;
pub mod data;
pub mod rules;
pub mod simulation;
pub mod systems;
pub mod world;

// Expose the limiter wrapper and the types needed to drive it
pub use crate::core::world::{Limiter, TickSummary, WorldSnapshot};
pub use crate::data::limits::{LimitItem, LimiterConfig, PunishmentType};
pub use crate::systems::executor::{PunishmentLog, PunishmentReport};
pub use crate::systems::punish::run_enforcement_cycle;
