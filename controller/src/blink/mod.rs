//! Blink pipeline: debounced eye-state sampling, streak counting and the
//! one-shot event cells the rest of the controller consumes.
//!
//! Provides:
//! - `BlinkClassifier`: raw eye samples to Single/Double/Quad events
//! - `EventFlags`: check-and-clear cells, one per event kind

pub mod classifier;
pub mod flags;

pub use classifier::{BlinkClassifier, BlinkEpisode, ClassifierOutput, EyeEdge, Streak};
pub use flags::{ClassifiedEvent, EventFlags};
