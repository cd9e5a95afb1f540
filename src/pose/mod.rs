pub mod classifier;
pub mod landmark;
pub mod posture;

pub use classifier::{classify, classify_with, Classification, Thresholds};
pub use landmark::{Frame, Landmark, LandmarkIndex};
pub use posture::Posture;
