//! Task queries built on the completion client.
//!
//! Each task renders a fixed prompt around caller data and parses the
//! samples with the matching [`crate::parse::QueryMode`]. No state is kept
//! between calls.

/// Tag extraction and classification.
pub mod classification;
/// Function-value extrapolation.
pub mod extrapolation;
/// Prompt templates.
pub mod prompts;

pub use classification::ClassificationQuery;
pub use extrapolation::ExtrapolationQuery;
