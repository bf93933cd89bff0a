use std::io;

use thiserror::Error;

/// Errors raised while ingesting data, training, decoding or persisting a model
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("the label name \"{0}\" is reserved, use a different name")]
    ReservedLabel(String),
    #[error("the name of a label must not contain any space: {0:?}")]
    LabelWhitespace(String),
    #[error("the name of a feature must not contain any space: {0:?}")]
    FeatureWhitespace(String),
    #[error("xseq and yseq must have the same length")]
    LengthMismatch,
    #[error("sequence is too long ({len} tokens, at most {max} allowed)")]
    SequenceTooLong { len: usize, max: usize },
    #[error("too many types of labels (at most {max} including reserved labels)")]
    TooManyLabels { max: usize },
    #[error("gaussian prior and inequality modeling cannot be used together")]
    ConflictingRegularization,
    #[error("no training data")]
    NoTrainingData,
    #[error("too much heldout data ({heldout} of {total} sequences), no training data is available")]
    TooMuchHeldout { heldout: usize, total: usize },
    #[error("the model has no labels")]
    NoLabels,
    #[error("overflow in lookahead search")]
    Overflow,
    #[error("{0}")]
    InvalidParameter(String),
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),
    #[error("malformed model at line {line}: {reason}")]
    MalformedModel { line: usize, reason: String },
}

impl Error {
    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        Error::InvalidParameter(msg.into())
    }
}

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
