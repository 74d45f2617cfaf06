//! Tick-driven action scheduler
//!
//! Delayed sequencing (the pause between release and prediction kickoff, AI
//! pickup delays, staggered die destruction) runs through one explicit queue
//! of `(ticks_remaining, action)` entries advanced by the fixed tick. A game
//! reset clears the queue wholesale, which is the cancellation story: nothing
//! scheduled survives a reset.

use crate::sim::die::DieId;

/// Deferred work the turn state machine schedules for itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Run the shadow simulation and rig the outcome for the pending throw
    SimulateThrow,
    /// AI side picks up its dice and throws
    AiThrow,
    /// Remove one dead die from play
    DestroyDie(DieId),
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    ticks_remaining: u32,
    action: Action,
}

/// Fixed-tick delay queue
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `action` after `delay_ticks` ticks (zero = next advance)
    pub fn schedule(&mut self, delay_ticks: u32, action: Action) {
        self.queue.push(Scheduled {
            ticks_remaining: delay_ticks,
            action,
        });
    }

    /// Advance one tick and return the actions that came due, in the order
    /// they were scheduled
    pub fn advance(&mut self) -> Vec<Action> {
        let mut due = Vec::new();
        self.queue.retain_mut(|entry| {
            if entry.ticks_remaining == 0 {
                due.push(entry.action);
                false
            } else {
                entry.ticks_remaining -= 1;
                true
            }
        });
        due
    }

    /// Whether any action of the given kind is still pending
    pub fn has_pending(&self, predicate: impl Fn(&Action) -> bool) -> bool {
        self.queue.iter().any(|entry| predicate(&entry.action))
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop everything (game reset)
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actions_fire_after_delay() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(2, Action::SimulateThrow);

        assert!(scheduler.advance().is_empty());
        assert!(scheduler.advance().is_empty());
        assert_eq!(scheduler.advance(), vec![Action::SimulateThrow]);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_same_tick_actions_keep_schedule_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(1, Action::DestroyDie(DieId(0)));
        scheduler.schedule(1, Action::DestroyDie(DieId(1)));
        scheduler.advance();
        assert_eq!(
            scheduler.advance(),
            vec![Action::DestroyDie(DieId(0)), Action::DestroyDie(DieId(1))]
        );
    }

    #[test]
    fn test_zero_delay_fires_on_next_advance() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(0, Action::AiThrow);
        assert_eq!(scheduler.advance(), vec![Action::AiThrow]);
    }

    #[test]
    fn test_clear_cancels_everything() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(5, Action::AiThrow);
        scheduler.schedule(1, Action::DestroyDie(DieId(3)));
        scheduler.clear();
        assert!(scheduler.is_empty());
        assert!(scheduler.advance().is_empty());
    }

    #[test]
    fn test_has_pending_filters_by_kind() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(3, Action::DestroyDie(DieId(0)));
        assert!(scheduler.has_pending(|a| matches!(a, Action::DestroyDie(_))));
        assert!(!scheduler.has_pending(|a| matches!(a, Action::AiThrow)));
    }
}
