/// Convenience result type used across fieldink.
pub type FieldinkResult<T> = Result<T, FieldinkError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Discovery never surfaces errors here: a render surface that never produces matches degrades to
/// declared-only fields and is reported through `DiscoveryOutcome` instead.
#[derive(thiserror::Error, Debug)]
pub enum FieldinkError {
    /// Invalid template, snapshot, or caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// A commit was attempted while the stroke buffer holds no ink.
    #[error("empty stroke commit: nothing has been drawn for the active field")]
    EmptyStrokeCommit,

    /// A capture operation needs an active field but the session has none.
    #[error("no active field")]
    NoActiveField,

    /// The capture surface has no pixel size yet, so no session can start.
    #[error("capture surface was never mounted")]
    SurfaceNeverMounted,

    /// A signature session is still open for this document.
    #[error("a signature session is already in progress")]
    SessionInProgress,

    /// The session already terminated.
    #[error("signature session is closed")]
    SessionClosed,

    /// A field key that is not part of the ordered field list.
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Errors while encoding artifacts.
    #[error("encode error: {0}")]
    Encode(String),

    /// Errors while decoding artifacts or payloads.
    #[error("decode error: {0}")]
    Decode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FieldinkError {
    /// Build a [`FieldinkError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FieldinkError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`FieldinkError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`FieldinkError::UnknownField`] value.
    pub fn unknown_field(key: impl Into<String>) -> Self {
        Self::UnknownField(key.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
