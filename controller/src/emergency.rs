//! Emergency latch entered on a Quad blink.
//!
//! Evaluated once per tick.  While active the alert output follows a square
//! wave derived from the time since activation, and the latch is released
//! only by the external clear signal.  Blink input never clears it.

use tracing::{debug, info, warn};

use crate::blink::EventFlags;
use crate::clock::Millis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencyState {
    Idle,
    Active { activated_at: Millis },
}

/// What one emergency step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmergencyStep {
    /// Idle → Active happened this tick.
    pub activated: bool,
    /// Active → Idle happened this tick.
    pub cleared: bool,
    /// Level the alert output should have after this tick.
    pub alert_on: bool,
}

#[derive(Debug)]
pub struct EmergencyController {
    state: EmergencyState,
    half_period_ms: Millis,
}

impl EmergencyController {
    pub fn new(half_period_ms: Millis) -> Self {
        Self {
            state: EmergencyState::Idle,
            half_period_ms: half_period_ms.max(1),
        }
    }

    pub fn state(&self) -> EmergencyState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, EmergencyState::Active { .. })
    }

    /// Poll the clear signal, then consume a pending Quad.
    pub fn step(
        &mut self,
        flags: &mut EventFlags,
        now: Millis,
        clear_pressed: bool,
    ) -> EmergencyStep {
        let mut step = EmergencyStep::default();

        if clear_pressed && self.is_active() {
            self.clear(now);
            step.cleared = true;
        }

        if flags.take_quad() {
            if self.is_active() {
                debug!("quad ignored, emergency already active");
            } else {
                self.activate(now);
                step.activated = true;
            }
        }

        step.alert_on = self.alert_on(now);
        step
    }

    pub fn activate(&mut self, now: Millis) {
        if self.is_active() {
            return;
        }
        warn!(at = now, "emergency activated");
        self.state = EmergencyState::Active { activated_at: now };
    }

    pub fn clear(&mut self, now: Millis) {
        if let EmergencyState::Active { activated_at } = self.state {
            info!(duration_ms = now.saturating_sub(activated_at), "emergency cleared");
            self.state = EmergencyState::Idle;
        }
    }

    /// Alert output level: on for the first half of each period.
    pub fn alert_on(&self, now: Millis) -> bool {
        match self.state {
            EmergencyState::Idle => false,
            EmergencyState::Active { activated_at } => {
                let elapsed = now.saturating_sub(activated_at);
                elapsed % (2 * self.half_period_ms) < self.half_period_ms
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blink::ClassifiedEvent;

    fn quad_flags() -> EventFlags {
        let mut flags = EventFlags::new();
        flags.raise(ClassifiedEvent::Quad);
        flags
    }

    #[test]
    fn test_quad_activates() {
        let mut ec = EmergencyController::new(500);
        let mut flags = quad_flags();
        let step = ec.step(&mut flags, 1000, false);
        assert!(step.activated);
        assert!(step.alert_on, "alert starts on");
        assert_eq!(ec.state(), EmergencyState::Active { activated_at: 1000 });
        assert_eq!(flags.pending(), None, "quad must be consumed");
    }

    #[test]
    fn test_second_quad_is_idempotent() {
        let mut ec = EmergencyController::new(500);
        ec.step(&mut quad_flags(), 1000, false);
        let step = ec.step(&mut quad_flags(), 3000, false);
        assert!(!step.activated);
        assert_eq!(ec.state(), EmergencyState::Active { activated_at: 1000 });
    }

    #[test]
    fn test_alert_square_wave() {
        let mut ec = EmergencyController::new(500);
        ec.activate(100);
        assert!(ec.alert_on(100));
        assert!(ec.alert_on(599));
        assert!(!ec.alert_on(600));
        assert!(!ec.alert_on(1099));
        assert!(ec.alert_on(1100));
    }

    #[test]
    fn test_only_clear_signal_releases() {
        let mut ec = EmergencyController::new(500);
        ec.activate(0);
        let mut flags = EventFlags::new();
        flags.raise(ClassifiedEvent::Single);
        let step = ec.step(&mut flags, 2000, false);
        assert!(ec.is_active(), "blink input must not clear the latch");
        assert!(!step.cleared);
        assert_eq!(flags.pending(), Some(ClassifiedEvent::Single), "single is not ours");

        let step = ec.step(&mut flags, 2100, true);
        assert!(step.cleared);
        assert!(!step.alert_on);
        assert_eq!(ec.state(), EmergencyState::Idle);
    }

    #[test]
    fn test_clear_while_idle_is_noop() {
        let mut ec = EmergencyController::new(500);
        let step = ec.step(&mut EventFlags::new(), 10, true);
        assert_eq!(step, EmergencyStep::default());
    }
}
