//! answerscore-core: Grading pipeline, model traits, and grade aggregation.
//!
//! This crate turns a student's answer PDF and a reference answer PDF into a
//! per-question score breakdown and a grade out of 20. Model backends are
//! reached through the [`traits::Embedder`] and [`traits::ZeroShotClassifier`]
//! traits, implemented in `answerscore-providers`.

pub mod aggregate;
pub mod clarity;
pub mod coverage;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod extract;
pub mod model;
pub mod outcome;
pub mod reference;
pub mod segment;
pub mod semantic;
pub mod store;
pub mod traits;

pub use engine::{precheck, GradeRequest, Grader, GraderConfig, NoopReporter, ProgressReporter};
pub use error::{ExtractionError, GradeError};
pub use outcome::{GradingOutcome, PersistenceStatus, QuestionOutcome, QuestionReport};
pub use traits::ModelBundle;
