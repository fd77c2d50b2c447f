//! Blink classification: turn a noisy eye-open/closed reading into
//! discrete Single, Double and Quad events.
//!
//! The sensor is sampled once per tick.  A raw change must hold for longer
//! than the debounce window before it counts.  Each closed→open transition
//! yields a [`BlinkEpisode`]; episodes long enough to be deliberate extend the
//! current [`Streak`].  Once the user has been still for a full blink gap the
//! streak is classified exactly once.

use tracing::{debug, info};

use super::flags::ClassifiedEvent;
use crate::clock::Millis;
use crate::config::{BlinkConfig, TimingConstants};

// ── Episode / streak ────────────────────────────────────────

/// One eye closure, from debounced close to debounced open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkEpisode {
    pub closed_at: Millis,
    pub opened_at: Millis,
}

impl BlinkEpisode {
    pub fn duration_ms(&self) -> Millis {
        self.opened_at.saturating_sub(self.closed_at)
    }
}

/// Run of accepted blinks spaced closer than the blink gap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streak {
    /// Accepted blinks in the current run.
    pub count: u32,
    /// When the last accepted blink ended (eye reopened).
    pub last_blink_end: Option<Millis>,
    /// Set once the run has been classified.
    pub processed: bool,
    /// The run overlapped an active emergency; it can never become a Quad.
    pub during_alert: bool,
}

// ── Output ──────────────────────────────────────────────────

/// Debounced eye transition observed during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeEdge {
    Closed { at: Millis },
    Opened { episode: BlinkEpisode, accepted: bool },
}

/// Result of one classifier update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierOutput {
    pub edge: Option<EyeEdge>,
    pub event: Option<ClassifiedEvent>,
}

// ── Classifier ──────────────────────────────────────────────

/// Debouncing multi-threshold blink classifier.
#[derive(Debug)]
pub struct BlinkClassifier {
    pub timing: TimingConstants,
    /// Debounced eye state.
    eye_open: bool,
    /// Last raw reading and when it last changed.
    last_raw_open: bool,
    raw_changed_at: Millis,
    /// Debounced close time of the closure in progress.
    closed_at: Option<Millis>,
    streak: Streak,
}

impl Default for BlinkClassifier {
    fn default() -> Self {
        Self::new(TimingConstants::default())
    }
}

impl BlinkClassifier {
    pub fn new(timing: TimingConstants) -> Self {
        Self {
            timing,
            eye_open: true,
            last_raw_open: true,
            raw_changed_at: 0,
            closed_at: None,
            streak: Streak::default(),
        }
    }

    /// Debounced eye state.
    pub fn is_eye_open(&self) -> bool {
        self.eye_open
    }

    pub fn streak(&self) -> Streak {
        self.streak
    }

    /// Feed one raw sample.  Call once per tick.
    ///
    /// `emergency_active` suppresses Quad emission while an alert is already
    /// latched, and for any streak that overlapped one.
    pub fn update(
        &mut self,
        raw_open: bool,
        now: Millis,
        config: &BlinkConfig,
        emergency_active: bool,
    ) -> ClassifierOutput {
        let mut output = ClassifierOutput::default();

        if raw_open != self.last_raw_open {
            self.raw_changed_at = now;
            self.last_raw_open = raw_open;
        }

        let settled = now.saturating_sub(self.raw_changed_at) > self.timing.debounce_ms;
        if settled && raw_open != self.eye_open {
            self.eye_open = raw_open;
            if raw_open {
                if let Some(closed_at) = self.closed_at.take() {
                    let episode = BlinkEpisode {
                        closed_at,
                        opened_at: now,
                    };
                    let accepted = self.accept(&episode, config);
                    output.edge = Some(EyeEdge::Opened { episode, accepted });
                }
            } else {
                self.closed_at = Some(now);
                output.edge = Some(EyeEdge::Closed { at: now });
            }
        }

        if emergency_active && self.streak.count > 0 {
            self.streak.during_alert = true;
        }
        output.event = self.classify(now, config, emergency_active);
        self.expire(now, config);
        output
    }

    /// Apply a finished closure to the streak.  Returns whether it counted.
    fn accept(&mut self, episode: &BlinkEpisode, config: &BlinkConfig) -> bool {
        let now = episode.opened_at;
        let gap = Millis::from(config.blink_gap_ms());
        let continues = self
            .streak
            .last_blink_end
            .map_or(false, |end| now.saturating_sub(end) < gap);

        // Third and later blinks of a run may be shorter.
        let required = if continues && self.streak.count >= 2 {
            self.timing.emergency_blink_interval_ms
        } else {
            Millis::from(config.blink_duration_ms())
        };

        let duration_ms = episode.duration_ms();
        if duration_ms < required {
            debug!(duration_ms, required, "closure too short, discarded");
            return false;
        }

        if continues {
            self.streak.count += 1;
        } else {
            self.streak.count = 1;
            self.streak.processed = false;
            self.streak.during_alert = false;
        }
        self.streak.last_blink_end = Some(now);
        debug!(streak = self.streak.count, duration_ms, "blink accepted");
        true
    }

    /// Emit the classification once the user has been still for a full gap.
    fn classify(
        &mut self,
        now: Millis,
        config: &BlinkConfig,
        emergency_active: bool,
    ) -> Option<ClassifiedEvent> {
        if self.streak.processed || self.streak.count == 0 {
            return None;
        }
        let last_end = self.streak.last_blink_end?;
        if now.saturating_sub(last_end) <= Millis::from(config.blink_gap_ms()) {
            return None;
        }

        let event = match self.streak.count {
            1 => ClassifiedEvent::Single,
            2 => ClassifiedEvent::Double,
            n if n >= 4 && (emergency_active || self.streak.during_alert) => {
                // Blinks made during an alert must not re-latch it once cleared.
                self.streak.processed = true;
                debug!(streak = n, "quad suppressed, emergency already active");
                return None;
            }
            n if n >= 4 => ClassifiedEvent::Quad,
            _ => return None,
        };
        self.streak.processed = true;
        info!(streak = self.streak.count, event = event.as_str(), "blink pattern classified");
        Some(event)
    }

    /// Drop a streak after `blink_gap + guard` of inactivity.
    fn expire(&mut self, now: Millis, config: &BlinkConfig) {
        if self.streak.count == 0 {
            return;
        }
        let Some(last_end) = self.streak.last_blink_end else {
            return;
        };
        let limit = Millis::from(config.blink_gap_ms()) + self.timing.streak_reset_guard_ms;
        if now.saturating_sub(last_end) > limit {
            debug!(streak = self.streak.count, "streak expired");
            self.streak.count = 0;
            self.streak.processed = false;
        }
    }
}

// ── Tests ───────────────────────────────────────────────────
