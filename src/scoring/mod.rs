// Scoring primitives shared by the pipeline stages

pub mod confidence;
pub mod format;
pub mod fuzzy;

pub use confidence::{field_confidence, overall_confidence};
pub use fuzzy::{best_match, is_match, similarity};
