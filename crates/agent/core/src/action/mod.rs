//! Issuing one interaction and reading back what happened.

mod executor;
mod outcome;

pub use executor::ActionExecutor;
pub use outcome::{Outcome, OutcomeClassifier, classify};
