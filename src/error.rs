//! Error types for board construction and mutation
//!
//! Construction failures (bad names, bad parameters, bad dimensions) are kept
//! apart from collaborator failures (I/O and JSON parsing) so callers can tell
//! a malformed board from a broken file.

use thiserror::Error;

/// Errors raised while building or reconfiguring a board
#[derive(Error, Debug)]
pub enum BoardError {
    /// A gadget with this name already exists on the board
    #[error("duplicate gadget name: {0}")]
    DuplicateGadget(String),

    /// The gadget kind tag is not one the engine knows
    #[error("unknown gadget kind: {0}")]
    UnknownGadgetKind(String),

    /// A kind-specific parameter is out of range
    #[error("invalid parameter for gadget {gadget}: {reason}")]
    InvalidParameter { gadget: String, reason: String },

    /// Zero or negative extent
    #[error("invalid dimensions for gadget {gadget}: {width}x{height}")]
    InvalidDimension {
        gadget: String,
        width: i32,
        height: i32,
    },

    /// A trigger link or key binding names a gadget that does not exist
    #[error("unknown gadget: {0}")]
    UnknownGadget(String),

    /// Board, gadget or portal name is not a valid identifier
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Protocol message text is malformed
    #[error("invalid message: {0:?}")]
    InvalidMessage(String),

    /// Key event string could not be parsed
    #[error("invalid key event: {0:?}")]
    InvalidKey(String),

    /// Ball lies outside the arena or has non-finite state
    #[error("invalid ball: {0}")]
    InvalidBall(String),

    /// Engine configuration out of range
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Two gravity fields of different sizes were combined
    #[error("gravity field dimensions differ: {0} vs {1}")]
    FieldDimensionMismatch(usize, usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BoardError {
    /// True for failures caused by the board contents themselves rather
    /// than by reading or decoding them.
    pub fn is_construction(&self) -> bool {
        !matches!(self, BoardError::Io(_) | BoardError::Parse(_))
    }
}

/// Result alias for board operations
pub type BoardResult<T> = Result<T, BoardError>;
