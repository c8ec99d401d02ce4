use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee that the error was not caused
    /// by the user, merely that the code cannot tell.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Interaction with the filesystem or another I/O source failed.
    Io,
    /// The operating system random source could not produce key or nonce bytes.
    KeyGeneration,
    /// NaCl secretbox (XSalsa20Poly1305) refused to seal the plaintext.
    SecretboxFailure,
    /// The ciphertext did not authenticate under the key. Covers a wrong
    /// key, corruption, truncation, tampering and undecodable armor without
    /// telling them apart.
    AuthenticationFailed,
    /// The tool was invoked with malformed arguments.
    Usage,
}

/// Coarse failure classes reported to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// A file could not be read or written.
    Io,
    /// Key generation or sealing failed.
    Encryption,
    /// The ciphertext could not be verified.
    Decryption,
    /// Malformed invocation.
    Usage,
}

impl ErrorKind {
    /// The failure class this kind belongs to.
    pub fn class(self) -> FailureClass {
        match self {
            ErrorKind::Io => FailureClass::Io,
            ErrorKind::KeyGeneration | ErrorKind::SecretboxFailure => FailureClass::Encryption,
            ErrorKind::AuthenticationFailed => FailureClass::Decryption,
            ErrorKind::Usage => FailureClass::Usage,
        }
    }
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct KeysealError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag. Consumers MUST handle the
    /// absence of a kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl KeysealError {
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

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// The failure class, if the error (or a wrapped error) carries a kind.
    pub fn class(&self) -> Option<FailureClass> {
        self.kind.map(ErrorKind::class)
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
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

    /// Renders the message followed by every source in the chain,
    /// separated by ": ".
    pub fn display_chain(&self) -> String {
        let mut out = self.msg.clone();
        let mut source = StdError::source(self);
        while let Some(err) = source {
            out.push_str(": ");
            out.push_str(&err.to_string());
            source = err.source();
        }
        out
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, KeysealError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_context_preserves_kind_and_category() {
        let err = KeysealError::with_kind(
            ErrorCategory::User,
            ErrorKind::AuthenticationFailed,
            "inner",
        )
        .with_context("outer");

        assert_eq!(err.kind, Some(ErrorKind::AuthenticationFailed));
        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.message(), "outer");
        assert_eq!(err.class(), Some(FailureClass::Decryption));
    }

    #[test]
    fn test_display_chain_includes_sources() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "no such file");
        let err = KeysealError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "failed to read from a.bin",
            io_err,
        )
        .with_context("decryption failed");

        assert_eq!(
            err.display_chain(),
            "decryption failed: failed to read from a.bin: no such file"
        );
    }

    #[test]
    fn test_kind_classes() {
        assert_eq!(ErrorKind::Io.class(), FailureClass::Io);
        assert_eq!(ErrorKind::KeyGeneration.class(), FailureClass::Encryption);
        assert_eq!(ErrorKind::SecretboxFailure.class(), FailureClass::Encryption);
        assert_eq!(ErrorKind::AuthenticationFailed.class(), FailureClass::Decryption);
        assert_eq!(ErrorKind::Usage.class(), FailureClass::Usage);
    }

    #[test]
    fn test_error_without_kind_has_no_class() {
        let err = KeysealError::new(ErrorCategory::Internal, "unexpected");
        assert_eq!(err.class(), None);
    }
}
