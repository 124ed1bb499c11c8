// Data Flywheel
//
// Learns which request patterns produce satisfying content by replaying
// interaction events (InteractionRecorded, ContentGenerated, LetterGenerated,
// CvGenerated) and publishes periodic FlywheelSummary events.

pub mod agent;
pub mod features;
pub mod pattern;

pub use agent::{FlywheelAgent, FlywheelConfig, FlywheelError, FlywheelSummary, SUMMARY_STREAM};
pub use features::{FeatureExtractor, FeatureSet};
pub use pattern::{pattern_key, quality_signal, Pattern, PatternTable};
