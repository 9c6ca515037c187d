use thiserror::Error;

/// Result type for attachment operations
pub type AttachResult<T> = Result<T, AttachError>;

/// Errors that can occur while moving attachments through the pipeline
#[derive(Error, Debug)]
pub enum AttachError {
    /// Caller bug: an upload source is missing a required capability.
    /// Never surfaced to end users and never retried.
    #[error("upload source does not provide `{capability}`")]
    ContractViolation { capability: &'static str },

    /// Expected rejection: a structurally valid upload failed a declared
    /// constraint such as the size ceiling.
    #[error("upload rejected: {reason}")]
    Invalid { reason: String },

    #[error("object not found: {id}")]
    NotFound { id: String },

    /// A url signature token did not match the recomputed value.
    #[error("invalid url signature")]
    InvalidSignature,

    #[error("storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl AttachError {
    /// Create a contract violation naming the missing capability
    pub fn contract(capability: &'static str) -> Self {
        Self::ContractViolation { capability }
    }

    /// Create a policy rejection
    pub fn invalid<S: Into<String>>(reason: S) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a backend error from a bare message, for consistency
    /// failures with no underlying error value
    pub fn backend_msg<S: Into<String>>(message: S) -> Self {
        Self::Backend {
            source: message.into().into(),
        }
    }

    /// True for the absent-object kind, which serving layers map to a
    /// missing-resource response
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
