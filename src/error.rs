use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to the caller.
    ///
    /// Internal is never a guarantee that the caller did nothing wrong,
    /// only that the code cannot tell.
    Internal,

    /// The caller provided invalid input (bad password, damaged container,
    /// unsupported option) or asked for something impossible.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Empty password, unsupported key size or algorithm name, or an
    /// otherwise unusable argument.
    InvalidParameter,
    /// Encryption was asked to seal an empty payload.
    EmptyInput,
    /// The container is too short, truncated, or its length field does
    /// not agree with the bytes present.
    MalformedContainer,
    /// The container header carries a format version this codec does not speak.
    UnsupportedVersion,
    /// The random source or the block cipher failed while sealing.
    EncryptionFailure,
    /// Padding validation failed after decryption. Usually a wrong
    /// password or cipher choice, but the format cannot tell which.
    DecryptionFailure,
    /// The armored representation is malformed or not ours.
    ArmoringInvalid,
    /// Base64 decoding of the armored body failed.
    ArmoringDecode,
    /// Input claimed to be armored veilbox data of another version.
    ArmoringFromFuture,
    /// A password could not be obtained from the configured reader.
    PasswordUnavailable,
    /// The configuration file could not be read or parsed.
    Config,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct VeilboxError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Any code consuming errors MUST
    /// handle the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl VeilboxError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    pub(crate) fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::User, ErrorKind::InvalidParameter, msg)
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::User, ErrorKind::MalformedContainer, msg)
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving
    /// the original as source. Category and kind carry over.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VeilboxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_kind_and_chain() {
        let inner = VeilboxError::malformed("container truncated");
        let outer = inner.with_context("failed to decrypt");

        assert_eq!(outer.kind, Some(ErrorKind::MalformedContainer));
        assert_eq!(outer.category, ErrorCategory::User);
        assert_eq!(outer.to_string(), "failed to decrypt");
        let source = outer.source_error().expect("source retained");
        assert_eq!(source.to_string(), "container truncated");
    }

    #[test]
    fn test_plain_error_has_no_kind() {
        let err = VeilboxError::new(ErrorCategory::Internal, "boom");
        assert_eq!(err.kind, None);
        assert_eq!(err.message(), "boom");
        assert!(err.source_error().is_none());
    }
}
