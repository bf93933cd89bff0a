//! Training module for lookahead perceptron models
//!
//! This module contains the components needed to train a model: training
//! data ingestion, feature selection, the averaged perceptron with lookahead
//! search and held-out evaluation.

mod evaluation;
mod feature_gen;
mod perceptron;
mod trainer;

// Re-export public types
pub use self::perceptron::{EpochStats, LookaheadParams};
pub use self::trainer::Trainer;
