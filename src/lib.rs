//! Greedy lookahead sequence labeling with an averaged perceptron
//!
//! Each token is labeled left to right. At every position a bounded search
//! over the next few labels picks the best continuation and only its first
//! label is committed. Training is an online averaged perceptron that updates
//! whenever the lookahead prefers a different first label than the gold one.
//!
//! # Examples
//!
//! ## Training
//!
//! ```no_run
//! use postag::Trainer;
//!
//! let mut trainer = Trainer::new();
//! let xseq = vec![
//!     vec!["w=the", "suf=he"],
//!     vec!["w=dog", "suf=og"],
//! ];
//! let yseq = vec!["DT", "NN"];
//! trainer.append(&xseq, &yseq)?;
//!
//! trainer.set("max_iterations", "5")?;
//! let model = trainer.train(0, 0.0, 0.0)?;
//! model.save("model.txt", 0.0)?;
//! # Ok::<(), postag::Error>(())
//! ```
//!
//! ## Prediction
//!
//! ```no_run
//! use postag::Model;
//!
//! let model = Model::open("model.txt")?;
//! let tagger = model.tagger();
//!
//! let xseq = vec![vec!["w=the"], vec!["w=cat"]];
//! let result = tagger.tag(&xseq)?;
//! # Ok::<(), postag::Error>(())
//! ```

mod context;
mod dataset;
mod dictionary;
mod error;
mod feature;
mod lookahead;
mod model;
mod model_writer;
mod tagger;

/// Training module containing the lookahead perceptron trainer
pub mod train;

// Re-export main types
pub use self::context::Edges;
pub use self::error::{Error, Result};
pub use self::model::{is_reserved_label, Model, ModelOptions, BOS_LABEL, EOS_LABEL};
pub use self::model_writer::ModelWriter;
pub use self::tagger::Tagger;

// Re-export training types for convenience
pub use self::train::{EpochStats, LookaheadParams, Trainer};
