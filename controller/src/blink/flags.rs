//! One-shot classified event cells.
//!
//! The classifier is the only writer.  Navigation is the only reader of
//! Single/Double and the emergency controller the only reader of Quad.
//! Reading is check-and-clear: `take_*` reports whether the event was
//! pending and resets it in the same call.

use tracing::{debug, warn};

/// A classified blink pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifiedEvent {
    Single,
    Double,
    Quad,
}

impl ClassifiedEvent {
    /// Single-character code sent over the remote link.
    pub fn code(&self) -> char {
        match self {
            Self::Single => '1',
            Self::Double => '2',
            Self::Quad => '4',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Double => "double",
            Self::Quad => "quad",
        }
    }
}

/// Pending event cells.  At most one is set at any time.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EventFlags {
    single: bool,
    double: bool,
    quad: bool,
}

impl EventFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cell for `event`, dropping any other event still pending.
    pub fn raise(&mut self, event: ClassifiedEvent) {
        if let Some(stale) = self.pending() {
            if stale != event {
                warn!(
                    stale = stale.as_str(),
                    new = event.as_str(),
                    "unconsumed event superseded"
                );
            }
        }
        self.clear();
        match event {
            ClassifiedEvent::Single => self.single = true,
            ClassifiedEvent::Double => self.double = true,
            ClassifiedEvent::Quad => self.quad = true,
        }
    }

    pub fn take_single(&mut self) -> bool {
        Self::take_cell(&mut self.single, ClassifiedEvent::Single)
    }

    pub fn take_double(&mut self) -> bool {
        Self::take_cell(&mut self.double, ClassifiedEvent::Double)
    }

    pub fn take_quad(&mut self) -> bool {
        Self::take_cell(&mut self.quad, ClassifiedEvent::Quad)
    }

    /// The event currently pending, if any.  Does not consume it.
    pub fn pending(&self) -> Option<ClassifiedEvent> {
        if self.single {
            Some(ClassifiedEvent::Single)
        } else if self.double {
            Some(ClassifiedEvent::Double)
        } else if self.quad {
            Some(ClassifiedEvent::Quad)
        } else {
            None
        }
    }

    /// Drop every pending event.
    pub fn clear(&mut self) {
        self.single = false;
        self.double = false;
        self.quad = false;
    }

    fn take_cell(cell: &mut bool, event: ClassifiedEvent) -> bool {
        let was_set = std::mem::take(cell);
        if was_set {
            debug!(event = event.as_str(), "event consumed");
        }
        was_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_is_exactly_once() {
        let mut flags = EventFlags::new();
        flags.raise(ClassifiedEvent::Single);
        assert!(flags.take_single());
        assert!(!flags.take_single(), "second take must see a cleared cell");
        assert_eq!(flags.pending(), None);
    }

    #[test]
    fn test_take_other_kind_leaves_pending() {
        let mut flags = EventFlags::new();
        flags.raise(ClassifiedEvent::Double);
        assert!(!flags.take_single());
        assert!(!flags.take_quad());
        assert_eq!(flags.pending(), Some(ClassifiedEvent::Double));
        assert!(flags.take_double());
    }

    #[test]
    fn test_raise_keeps_at_most_one_pending() {
        let mut flags = EventFlags::new();
        flags.raise(ClassifiedEvent::Single);
        flags.raise(ClassifiedEvent::Quad);
        assert!(!flags.take_single(), "superseded single must be gone");
        assert!(flags.take_quad());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut flags = EventFlags::new();
        flags.raise(ClassifiedEvent::Quad);
        flags.clear();
        assert_eq!(flags.pending(), None);
        assert!(!flags.take_quad());
    }

    #[test]
    fn test_event_codes() {
        assert_eq!(ClassifiedEvent::Single.code(), '1');
        assert_eq!(ClassifiedEvent::Double.code(), '2');
        assert_eq!(ClassifiedEvent::Quad.code(), '4');
    }
}
