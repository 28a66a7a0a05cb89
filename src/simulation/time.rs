use bevy_ecs::prelude::*;

use crate::data::limits::LimiterConfig;

/// Global resource counting scheduler ticks.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct EnforcementClock {
    pub tick: u64,
    pub cycles: u64,
}

impl EnforcementClock {
    /// A cycle is due on tick 0 and then every `interval` ticks.
    pub fn is_due(&self, interval: u64) -> bool {
        interval > 0 && self.tick % interval == 0
    }

    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

/// Run condition: limits are switched on and the punish interval has elapsed.
pub fn enforcement_due(clock: Res<EnforcementClock>, config: Res<LimiterConfig>) -> bool {
    config.enable_limits && clock.is_due(config.punish_interval)
}

/// System: Advances the clock.
pub fn advance_clock_system(mut clock: ResMut<EnforcementClock>) {
    clock.advance();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_every_interval_starting_at_zero() {
        let mut clock = EnforcementClock::default();
        let mut due = Vec::new();
        for _ in 0..7 {
            due.push(clock.is_due(3));
            clock.advance();
        }
        assert_eq!(due, vec![true, false, false, true, false, false, true]);
    }

    #[test]
    fn zero_interval_never_fires() {
        assert!(!EnforcementClock::default().is_due(0));
    }
}
