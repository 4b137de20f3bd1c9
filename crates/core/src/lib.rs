//! Core domain types, similarity scoring, block comparison and report
//! rendering for checking translated presentations by back-translation.

pub mod compare;
pub mod error;
pub mod normalize;
pub mod progress;
pub mod report;
pub mod similarity;
pub mod types;

pub use compare::{
    compare_presentations, BackTranslator, CompareOptions, ComparisonReport, ComparisonRow,
    ComparisonSummary, RowStatus,
};
pub use error::{Error, Result};
pub use progress::{NoProgress, Progress, ProgressSink};
pub use similarity::{similarity_score, SequenceMatcher};
pub use types::{BlockKey, Presentation, PresentationFormat, TextBlock};
