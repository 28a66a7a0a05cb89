pub mod executor;
pub mod punish;

pub use executor::{
    apply_punishments_system, execute_batch, MutationQueue, PunishError, PunishmentEvent,
    PunishmentLog, PunishmentReport,
};
pub use punish::{punish_scan_system, run_enforcement_cycle, run_punish_scan, PunishmentBatch};
