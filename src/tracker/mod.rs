pub mod counter;
pub mod events;
pub mod inference;
pub mod rakat;
pub mod stabilizer;

pub use counter::TransitionCounter;
pub use events::{CorrectionReason, TrackerEvent};
pub use inference::{InferenceEngine, InferenceLogEntry, PositionEvent};
pub use rakat::RakatTracker;
pub use stabilizer::Stabilizer;
